//! # Cache Utilities

use reqwest::header::{ETAG, HeaderMap, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};

use super::types::Validators;
use crate::error::Result;
use crate::transport::HttpRequest;

/// Extract `ETag` / `Last-Modified` from response headers
pub fn extract_validators(headers: &HeaderMap) -> Validators {
    let header = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    Validators {
        etag: header(ETAG),
        last_modified: header(LAST_MODIFIED),
    }
}

/// Turn stored validators into `If-None-Match` / `If-Modified-Since`
pub fn apply_validators(request: &mut HttpRequest, validators: &Validators) -> Result<()> {
    if let Some(etag) = &validators.etag {
        request.set_header(IF_NONE_MATCH.as_str(), etag)?;
    }
    if let Some(last_modified) = &validators.last_modified {
        request.set_header(IF_MODIFIED_SINCE.as_str(), last_modified)?;
    }
    Ok(())
}
