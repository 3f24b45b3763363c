//! SOAP response wrapper: classification, multipart decoding, and body access

use std::borrow::Cow;
use std::cell::OnceCell;

use tracing::debug;
use xmltree::Element;

use crate::config;
use crate::error::{Result, SoapError};
use crate::fault::{Fault, FaultError};
use crate::http::HttpError;
use crate::multipart::{self, MalformedMultipartError, MimePart};
use crate::transport::TransportResponse;
use crate::value::{snake_case, Value};

static NULL: Value = Value::Null;

/// Whether constructing a [`Response`] signals faults and HTTP errors
/// immediately, or defers classification to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Construction fails with `SoapError::Fault` or `SoapError::Http` when
    /// the response is not a clean success. A fault takes precedence over an
    /// HTTP error when both are present.
    Raise,
    /// Construction always succeeds; callers poll
    /// [`is_success`](Response::is_success) and friends.
    Silent,
}

impl ErrorPolicy {
    /// The policy selected by the process-wide flag, see
    /// [`set_raise_errors`](crate::set_raise_errors).
    pub fn global() -> Self {
        if config::raise_errors() {
            ErrorPolicy::Raise
        } else {
            ErrorPolicy::Silent
        }
    }
}

/// A classified SOAP response.
///
/// Wraps one [`TransportResponse`]. Multipart bodies are decoded at
/// construction; fault detection, HTTP error classification, and XML parsing
/// are computed on first access and cached for the object's lifetime.
///
/// Caching uses [`OnceCell`], so `Response` is not `Sync`; wrap it in
/// external synchronization before sharing across threads.
#[derive(Debug)]
pub struct Response {
    http: TransportResponse,
    boundary: Option<String>,
    parts: Vec<MimePart>,
    primary_xml: Option<String>,
    fault: OnceCell<Fault>,
    http_error: OnceCell<HttpError>,
    tree: OnceCell<std::result::Result<Value, String>>,
}

impl Response {
    /// Wraps a transport response using the process-wide error policy.
    pub fn new(http: TransportResponse) -> Result<Self> {
        Self::with_policy(http, ErrorPolicy::global())
    }

    /// Wraps a transport response with an explicit error policy.
    ///
    /// A body whose `Content-Type` declares multipart is decoded here;
    /// malformed multipart framing fails construction under either policy.
    pub fn with_policy(http: TransportResponse, policy: ErrorPolicy) -> Result<Self> {
        let content_type = http.header("Content-Type").map(str::to_string);
        let is_multipart = content_type
            .as_deref()
            .is_some_and(|value| value.starts_with("multipart"));

        let (boundary, parts, primary_xml) = if is_multipart {
            let content_type = content_type.as_deref().unwrap_or_default();
            let boundary = multipart::content_type_param(content_type, "boundary")
                .ok_or(MalformedMultipartError::MissingBoundary)?;
            let parts = multipart::split(http.body(), &boundary)?;
            let primary_xml = parts[0].body_str().into_owned();
            debug!(parts = parts.len(), "decoded multipart response body");
            (Some(boundary), parts, Some(primary_xml))
        } else {
            (None, Vec::new(), None)
        };

        let response = Self {
            http,
            boundary,
            parts,
            primary_xml,
            fault: OnceCell::new(),
            http_error: OnceCell::new(),
            tree: OnceCell::new(),
        };

        if policy == ErrorPolicy::Raise {
            if response.has_fault() {
                debug!(fault = %response.fault(), "SOAP fault in response body");
                let fault = response.fault().clone();
                return Err(FaultError {
                    fault,
                    http: response.http,
                }
                .into());
            }
            if response.has_http_error() {
                debug!(status = response.http.status(), "HTTP error response");
                return Err(response.http_error().clone().into());
            }
        }

        Ok(response)
    }

    /// The wrapped transport response.
    pub fn http(&self) -> &TransportResponse {
        &self.http
    }

    /// True iff neither a SOAP fault nor an HTTP error is present.
    pub fn is_success(&self) -> bool {
        !self.has_fault() && !self.has_http_error()
    }

    pub fn has_fault(&self) -> bool {
        self.fault().is_present()
    }

    /// Fault information, computed once. Returned even when no fault exists;
    /// check [`Fault::is_present`] for relevance.
    pub fn fault(&self) -> &Fault {
        self.fault.get_or_init(|| match self.tree() {
            Ok(tree) => Fault::from_tree(tree),
            Err(_) => Fault::absent(),
        })
    }

    pub fn has_http_error(&self) -> bool {
        self.http_error().is_present()
    }

    /// HTTP error information, computed once. Returned even for successful
    /// statuses; check [`HttpError::is_present`] for relevance.
    pub fn http_error(&self) -> &HttpError {
        self.http_error
            .get_or_init(|| HttpError::from_transport(&self.http))
    }

    /// True iff the `Content-Type` value starts with the literal `multipart`.
    pub fn is_multipart(&self) -> bool {
        self.http
            .header("Content-Type")
            .is_some_and(|value| value.starts_with("multipart"))
    }

    /// The multipart boundary, extracted once at construction.
    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    /// All decoded MIME parts, in original order. Empty unless multipart.
    pub fn parts(&self) -> &[MimePart] {
        &self.parts
    }

    /// Every decoded part after the first, which is assumed to carry the
    /// SOAP envelope. Best effort: the first part's content type is not
    /// validated.
    pub fn attachments(&self) -> &[MimePart] {
        if self.parts.is_empty() {
            &[]
        } else {
            &self.parts[1..]
        }
    }

    /// The raw transport body, untouched.
    pub fn raw(&self) -> &[u8] {
        self.http.body()
    }

    /// The response XML: the decoded first MIME part when multipart,
    /// otherwise the raw body verbatim.
    pub fn xml(&self) -> Cow<'_, str> {
        match &self.primary_xml {
            Some(xml) => Cow::Borrowed(xml.as_str()),
            None => self.http.body_str(),
        }
    }

    /// The parsed response document, keyed by the snake_cased envelope
    /// element. Parsed at most once; later calls return the cached tree.
    pub fn tree(&self) -> Result<&Value> {
        let cached = self.tree.get_or_init(|| {
            let xml = self.xml();
            Element::parse(xml.as_bytes())
                .map(|root| {
                    Value::Mapping(vec![(snake_case(&root.name), Value::from_element(&root))])
                })
                .map_err(|error| error.to_string())
        });
        cached
            .as_ref()
            .map_err(|message| SoapError::Parse(message.clone()))
    }

    /// The envelope header section, `Value::Null` when absent.
    pub fn header(&self) -> Result<&Value> {
        Ok(self
            .tree()?
            .get("envelope")
            .and_then(|envelope| envelope.get("header"))
            .unwrap_or(&NULL))
    }

    /// The envelope body section, `Value::Null` when absent.
    pub fn body(&self) -> Result<&Value> {
        Ok(self
            .tree()?
            .get("envelope")
            .and_then(|envelope| envelope.get("body"))
            .unwrap_or(&NULL))
    }

    /// Alias for [`body`](Response::body); returns the identical value.
    pub fn to_mapping(&self) -> Result<&Value> {
        self.body()
    }

    /// Shorthand for `body()[key]`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body().ok().and_then(|body| body.get(key))
    }

    /// Traverses the body along `path` and always yields a list: a missing
    /// or null step short-circuits to `[]`, a scalar or mapping result is
    /// wrapped in a one-element list, and a sequence is returned with null
    /// entries removed.
    pub fn to_array(&self, path: &[&str]) -> Vec<&Value> {
        let Ok(mut current) = self.body() else {
            return Vec::new();
        };
        for key in path {
            match current.get(key) {
                Some(next) if !next.is_null() => current = next,
                _ => return Vec::new(),
            }
        }
        match current {
            Value::Sequence(items) => items.iter().filter(|item| !item.is_null()).collect(),
            Value::Null => Vec::new(),
            single => vec![single],
        }
    }
}
