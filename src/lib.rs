//! SOAP response handling
//!
//! This crate wraps an already-materialized HTTP response and classifies it:
//! it detects SOAP faults in the envelope body, flags HTTP-level errors,
//! decodes multipart MIME bodies (SOAP with attachments), and exposes the
//! parsed XML as a navigable [`Value`] tree. It performs no network I/O;
//! request dispatch and transport belong to the host application.
//!
//! ```rust
//! use soap_response::{ErrorPolicy, Response, TransportResponse};
//!
//! let http = TransportResponse::new(
//!     200,
//!     [("Content-Type", "text/xml; charset=utf-8")],
//!     r#"<e:Envelope xmlns:e="http://schemas.xmlsoap.org/soap/envelope/">
//!         <e:Body><GetVolumeResponse><CurrentVolume>35</CurrentVolume></GetVolumeResponse></e:Body>
//!     </e:Envelope>"#,
//! );
//!
//! let response = Response::with_policy(http, ErrorPolicy::Silent).unwrap();
//! assert!(response.is_success());
//! assert_eq!(
//!     response.to_array(&["get_volume_response", "current_volume"]).len(),
//!     1,
//! );
//! ```

mod config;
mod error;
mod fault;
mod http;
mod multipart;
mod response;
mod transport;
mod value;

pub use config::{raise_errors, set_raise_errors};
pub use error::{Result, SoapError};
pub use fault::{Fault, FaultError};
pub use http::HttpError;
pub use multipart::{MalformedMultipartError, MimePart};
pub use response::{ErrorPolicy, Response};
pub use transport::TransportResponse;
pub use value::Value;
