//! # Authentication
//!
//! The request envelope only needs an async accessor for the current bearer
//! token. Account management (sign-up, password reset) lives with the identity
//! provider and is not part of this crate.

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no authenticated session")]
    NoSession,
    #[error("token provider failed: {0}")]
    Provider(String),
}

/// Supplies the bearer token attached to every API request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the current token or fails when no session exists.
    async fn bearer_token(&self) -> Result<String, AuthError>;
}

/// In-process session holding the token handed over by the identity provider.
#[derive(Debug, Default)]
pub struct SessionTokens {
    token: RwLock<Option<String>>,
}

impl SessionTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
        debug!("Session token updated");
    }

    pub fn sign_out(&self) {
        *self.token.write() = None;
        debug!("Session cleared");
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.read().as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[async_trait]
impl TokenProvider for SessionTokens {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        match self.token.read().as_deref() {
            Some(token) if !token.is_empty() => Ok(token.to_owned()),
            _ => Err(AuthError::NoSession),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_in_session_yields_token() {
        let session = SessionTokens::with_token("abc");
        assert!(session.is_signed_in());
        assert_eq!(session.bearer_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_sign_out_clears_token() {
        let session = SessionTokens::with_token("abc");
        session.sign_out();
        assert!(!session.is_signed_in());
        assert_eq!(session.bearer_token().await, Err(AuthError::NoSession));
    }

    #[tokio::test]
    async fn test_empty_token_counts_as_no_session() {
        let session = SessionTokens::new();
        session.sign_in("");
        assert_eq!(session.bearer_token().await, Err(AuthError::NoSession));
    }
}
