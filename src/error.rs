//! Error types for SOAP response handling

use thiserror::Error;

use crate::fault::FaultError;
use crate::http::HttpError;
use crate::multipart::MalformedMultipartError;

/// Errors signaled while classifying or navigating a SOAP response.
#[derive(Debug, Error)]
pub enum SoapError {
    /// The response body contained a SOAP fault. Takes precedence over
    /// `Http` when both conditions hold.
    #[error(transparent)]
    Fault(#[from] FaultError),

    /// The response status fell outside the 2xx range.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The body declared itself multipart but could not be split.
    #[error(transparent)]
    Multipart(#[from] MalformedMultipartError),

    /// The response body could not be parsed as XML.
    #[error("XML parsing error: {0}")]
    Parse(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SoapError>;
