//! SOAP fault detection and detail extraction
//!
//! A fault is a protocol-level failure embedded in the envelope body, which
//! can arrive with any HTTP status. Both the SOAP 1.1 shape
//! (`faultcode`/`faultstring`/`detail`) and the SOAP 1.2 shape
//! (`Code/Value`, `Reason/Text`, `Detail`) are recognized.

use std::fmt;

use thiserror::Error;

use crate::transport::TransportResponse;
use crate::value::Value;

/// Fault information extracted from a parsed response body.
///
/// Always constructible: a clean response yields a `Fault` whose
/// [`is_present`](Fault::is_present) is false, so callers can inspect it
/// unconditionally.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    present: bool,
    code: Option<String>,
    reason: Option<String>,
    detail: Value,
}

impl Fault {
    /// The fault of a response with no fault element (or an unparseable body).
    pub(crate) fn absent() -> Self {
        Self {
            present: false,
            code: None,
            reason: None,
            detail: Value::Null,
        }
    }

    /// Inspects a parsed envelope tree for a fault element.
    pub(crate) fn from_tree(tree: &Value) -> Self {
        let fault = tree
            .get("envelope")
            .and_then(|envelope| envelope.get("body"))
            .and_then(|body| body.get("fault"));
        let Some(fault) = fault else {
            return Self::absent();
        };

        let code = fault
            .get("faultcode")
            .and_then(Value::as_str)
            .or_else(|| {
                fault
                    .get("code")
                    .and_then(|code| code.get("value"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string);
        let reason = fault
            .get("faultstring")
            .and_then(Value::as_str)
            .or_else(|| {
                fault
                    .get("reason")
                    .and_then(|reason| reason.get("text"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string);
        let detail = fault.get("detail").cloned().unwrap_or(Value::Null);

        Self {
            present: true,
            code,
            reason,
            detail,
        }
    }

    /// Whether the response body actually contained a fault element.
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// The fault code (`faultcode` or `Code/Value`).
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The human-readable reason (`faultstring` or `Reason/Text`).
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Application-specific fault detail, `Value::Null` when absent.
    pub fn detail(&self) -> &Value {
        &self.detail
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.reason) {
            (Some(code), Some(reason)) => write!(f, "({code}) {reason}"),
            (Some(code), None) => write!(f, "({code})"),
            (None, Some(reason)) => f.write_str(reason),
            (None, None) => f.write_str("unspecified fault"),
        }
    }
}

/// Signaled when construction runs under the raise policy and the response
/// body contains a fault. Carries the raw transport response for diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("SOAP fault: {fault}")]
pub struct FaultError {
    pub fault: Fault,
    pub http: TransportResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmltree::Element;

    fn tree(xml: &str) -> Value {
        let root = Element::parse(xml.as_bytes()).unwrap();
        Value::Mapping(vec![(
            crate::value::snake_case(&root.name),
            Value::from_element(&root),
        )])
    }

    const SOAP_11_FAULT: &str = r#"
        <soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
            <soap:Body>
                <soap:Fault>
                    <faultcode>soap:Server</faultcode>
                    <faultstring>Fault occurred while processing.</faultstring>
                    <detail><ErrorCode>401</ErrorCode></detail>
                </soap:Fault>
            </soap:Body>
        </soap:Envelope>"#;

    const SOAP_12_FAULT: &str = r#"
        <env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
            <env:Body>
                <env:Fault>
                    <env:Code><env:Value>env:Sender</env:Value></env:Code>
                    <env:Reason><env:Text xml:lang="en">Sender Timeout</env:Text></env:Reason>
                </env:Fault>
            </env:Body>
        </env:Envelope>"#;

    #[test]
    fn test_soap_11_fault_is_extracted() {
        let fault = Fault::from_tree(&tree(SOAP_11_FAULT));

        assert!(fault.is_present());
        assert_eq!(fault.code(), Some("soap:Server"));
        assert_eq!(fault.reason(), Some("Fault occurred while processing."));
        assert_eq!(
            fault.detail().get("error_code").and_then(Value::as_str),
            Some("401")
        );
        assert_eq!(fault.to_string(), "(soap:Server) Fault occurred while processing.");
    }

    #[test]
    fn test_soap_12_fault_is_extracted() {
        let fault = Fault::from_tree(&tree(SOAP_12_FAULT));

        assert!(fault.is_present());
        assert_eq!(fault.code(), Some("env:Sender"));
        assert_eq!(fault.reason(), Some("Sender Timeout"));
        assert!(fault.detail().is_null());
    }

    #[test]
    fn test_clean_body_has_no_fault() {
        let xml = r#"
            <soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
                <soap:Body><GetStatusResponse><Status>OK</Status></GetStatusResponse></soap:Body>
            </soap:Envelope>"#;
        let fault = Fault::from_tree(&tree(xml));

        assert!(!fault.is_present());
        assert_eq!(fault.code(), None);
        assert_eq!(fault.reason(), None);
    }

    #[test]
    fn test_fault_error_message_includes_detailed_reason() {
        let error = FaultError {
            fault: Fault::from_tree(&tree(SOAP_11_FAULT)),
            http: TransportResponse::new(500, [] as [(&str, &str); 0], SOAP_11_FAULT),
        };

        assert_eq!(
            error.to_string(),
            "SOAP fault: (soap:Server) Fault occurred while processing."
        );
    }
}
