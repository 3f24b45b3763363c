//! HTTP-level error classification
//!
//! Orthogonal to fault detection: a response can carry a SOAP fault with a
//! 200 status, an HTTP error with a clean body, or both at once.

use std::fmt;

use crate::transport::TransportResponse;

/// HTTP error information for a response.
///
/// Always constructible, like [`Fault`](crate::Fault): a 2xx response yields
/// an `HttpError` whose [`is_present`](HttpError::is_present) is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    status: u16,
    body: Vec<u8>,
}

impl HttpError {
    pub(crate) fn from_transport(http: &TransportResponse) -> Self {
        Self {
            status: http.status(),
            body: http.body().to_vec(),
        }
    }

    /// Whether the status code falls outside the 2xx success range.
    pub fn is_present(&self) -> bool {
        !(200..=299).contains(&self.status)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The raw response body that accompanied the error.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP error ({})", self.status)?;
        if !self.body.is_empty() {
            write!(f, ": {}", self.body_str())?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}
