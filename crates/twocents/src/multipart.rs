//! # Multipart encoding
//!
//! `multipart/form-data` bodies for uploads. Every part is checked for the
//! boundary delimiter before encoding; when a part contains it a fresh boundary
//! is drawn, and encoding gives up after a bounded number of attempts.

use bytes::{BufMut, Bytes, BytesMut};
use memchr::memmem;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::request::ContentType;

/// Boundaries drawn before giving up on a colliding payload
const MAX_BOUNDARY_ATTEMPTS: usize = 8;

#[derive(Debug, Clone)]
struct Part {
    name: String,
    filename: Option<String>,
    content_type: String,
    data: Bytes,
}

impl Part {
    fn contains(&self, delimiter: &[u8]) -> bool {
        memmem::find(&self.data, delimiter).is_some()
    }

    fn encoded_len(&self, boundary: &str) -> usize {
        // delimiter line, two header lines, blank line, data, trailing CRLF
        boundary.len()
            + self.name.len()
            + self.filename.as_ref().map_or(0, |f| f.len() + 13)
            + self.content_type.len()
            + self.data.len()
            + 96
    }
}

/// An encoded body together with the boundary it was encoded with
#[derive(Debug, Clone)]
pub struct EncodedForm {
    pub boundary: String,
    pub body: Bytes,
}

impl EncodedForm {
    pub fn content_type(&self) -> ContentType {
        ContentType::Multipart(self.boundary.clone())
    }
}

/// Builder for a `multipart/form-data` body
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field part without a filename
    pub fn text_part(
        mut self,
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: None,
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    /// Adds a field carrying the JSON encoding of `value`
    pub fn json_part<T: Serialize>(self, name: impl Into<String>, value: &T) -> Result<Self> {
        let data = serde_json::to_vec(value)?;
        Ok(self.text_part(name, "application/json", data))
    }

    /// Adds a file part
    pub fn file_part(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        mime: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: mime.into(),
            data: data.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Encodes the form with a random UUID boundary.
    pub fn encode(&self) -> Result<EncodedForm> {
        self.encode_with(|| Uuid::new_v4().to_string())
    }

    fn encode_with(&self, mut next_boundary: impl FnMut() -> String) -> Result<EncodedForm> {
        for attempt in 1..=MAX_BOUNDARY_ATTEMPTS {
            let boundary = next_boundary();
            let delimiter = format!("--{boundary}");

            if let Some(part) = self.parts.iter().find(|p| p.contains(delimiter.as_bytes())) {
                warn!(
                    attempt,
                    part = %part.name,
                    "Multipart boundary found in part content, drawing a new one"
                );
                continue;
            }

            let body = self.write_body(&boundary);
            debug!(parts = self.parts.len(), len = body.len(), "Encoded multipart body");
            return Ok(EncodedForm { boundary, body });
        }

        Err(ApiError::BoundaryCollision(MAX_BOUNDARY_ATTEMPTS))
    }

    fn write_body(&self, boundary: &str) -> Bytes {
        let capacity = self
            .parts
            .iter()
            .map(|p| p.encoded_len(boundary))
            .sum::<usize>()
            + boundary.len()
            + 6;
        let mut buf = BytesMut::with_capacity(capacity);

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(boundary.as_bytes());
            buf.put_slice(b"\r\n");

            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(part.name.as_bytes());
            buf.put_slice(b"\"");
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(filename.as_bytes());
                buf.put_slice(b"\"");
            }
            buf.put_slice(b"\r\n");

            buf.put_slice(b"Content-Type: ");
            buf.put_slice(part.content_type.as_bytes());
            buf.put_slice(b"\r\n\r\n");

            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}
