//! MIME multipart splitting and per-part content decoding
//!
//! SOAP with attachments packs the envelope and any binary payloads into a
//! single `multipart/related` body. This module splits such a body on its
//! boundary delimiter, decodes each part according to its own
//! `Content-Transfer-Encoding`, and recurses into parts that are themselves
//! multipart.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;
use tracing::trace;

/// Errors raised when a body that declares itself multipart cannot be split.
///
/// These fail construction fast rather than silently degrading to a
/// non-multipart reading of the body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedMultipartError {
    /// `Content-Type` declared multipart but carried no boundary parameter.
    #[error("multipart Content-Type is missing a boundary parameter")]
    MissingBoundary,

    /// The boundary delimiter never appears in the body.
    #[error("multipart body contains no parts for boundary {0:?}")]
    NoParts(String),

    /// A part's content could not be decoded per its transfer encoding.
    #[error("invalid {encoding} content in multipart part: {message}")]
    InvalidEncoding { encoding: String, message: String },
}

/// One decoded MIME part.
///
/// `body` holds the content after transfer-encoding decode. When the part is
/// itself multipart, `parts` holds its decoded sub-parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    parts: Vec<MimePart>,
}

impl MimePart {
    /// Case-insensitive MIME header lookup; returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Decoded content bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decoded content as text, with invalid UTF-8 replaced.
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Nested parts, non-empty only when this part is itself multipart.
    pub fn parts(&self) -> &[MimePart] {
        &self.parts
    }
}

/// Extracts a parameter from a structured header value such as
/// `multipart/related; boundary="abc"; charset=UTF-8`.
///
/// Parameter order is irrelevant, values may be quoted, and unknown
/// parameters are skipped. Returns `None` when the parameter is absent or
/// the header is malformed.
pub(crate) fn content_type_param(header: &str, name: &str) -> Option<String> {
    let (_, parameters) = header.split_once(';')?;
    let mut rest = parameters;
    loop {
        rest = rest.trim_start_matches([' ', '\t', ';']);
        if rest.is_empty() {
            return None;
        }
        let equals = rest.find('=')?;
        let key = rest[..equals].trim();
        let after = &rest[equals + 1..];
        let (value, remainder) = if let Some(quoted) = after.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            }
        } else {
            match after.find(';') {
                Some(end) => (after[..end].trim(), &after[end + 1..]),
                None => (after.trim(), ""),
            }
        };
        if key.eq_ignore_ascii_case(name) {
            return Some(value.to_string());
        }
        rest = remainder;
    }
}

/// Splits a multipart body on its boundary and decodes every part.
///
/// Framing follows the standard rules: a delimiter is `--boundary` at the
/// start of a line, each part consists of a header block terminated by a
/// blank line followed by content, and `--boundary--` closes the body.
/// Preamble and epilogue text outside the delimiters is discarded.
pub(crate) fn split(body: &[u8], boundary: &str) -> Result<Vec<MimePart>, MalformedMultipartError> {
    let delimiter = format!("--{boundary}").into_bytes();

    // Delimiter offsets, with a flag marking the closing `--boundary--`.
    let mut marks: Vec<(usize, bool)> = Vec::new();
    let mut search_from = 0;
    while let Some(found) = find(&body[search_from..], &delimiter) {
        let at = search_from + found;
        let after = at + delimiter.len();
        if at == 0 || body[at - 1] == b'\n' {
            let terminator = body[after..].starts_with(b"--");
            marks.push((at, terminator));
            if terminator {
                break;
            }
        }
        search_from = after;
    }

    let mut parts = Vec::new();
    for window in marks.windows(2) {
        let (start, is_terminator) = window[0];
        if is_terminator {
            break;
        }
        let section_start = skip_line(body, start + delimiter.len());
        let section_end = trim_line_ending(body, window[1].0);
        if section_start <= section_end {
            parts.push(parse_part(&body[section_start..section_end])?);
        }
    }

    if parts.is_empty() {
        return Err(MalformedMultipartError::NoParts(boundary.to_string()));
    }
    trace!(parts = parts.len(), boundary, "split multipart body");
    Ok(parts)
}

/// Parses one boundary-delimited section into headers and decoded content,
/// recursing when the part is itself multipart.
fn parse_part(section: &[u8]) -> Result<MimePart, MalformedMultipartError> {
    let (header_block, content) = split_header_block(section);
    let headers = parse_headers(header_block);

    let encoding = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Transfer-Encoding"))
        .map(|(_, value)| value.trim().to_ascii_lowercase())
        .unwrap_or_default();
    let body = decode_content(&encoding, content)?;

    let content_type = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Type"))
        .map(|(_, value)| value.as_str());
    let parts = match content_type {
        Some(value) if value.starts_with("multipart") => {
            let boundary = content_type_param(value, "boundary")
                .ok_or(MalformedMultipartError::MissingBoundary)?;
            split(&body, &boundary)?
        }
        _ => Vec::new(),
    };

    Ok(MimePart { headers, body, parts })
}

/// Applies the part's `Content-Transfer-Encoding`. Identity encodings
/// (`7bit`, `8bit`, `binary`, absent) pass content through untouched.
fn decode_content(encoding: &str, content: &[u8]) -> Result<Vec<u8>, MalformedMultipartError> {
    match encoding {
        "base64" => {
            let compact: Vec<u8> = content
                .iter()
                .copied()
                .filter(|byte| !byte.is_ascii_whitespace())
                .collect();
            BASE64
                .decode(&compact)
                .map_err(|error| MalformedMultipartError::InvalidEncoding {
                    encoding: "base64".to_string(),
                    message: error.to_string(),
                })
        }
        "quoted-printable" => Ok(decode_quoted_printable(content)),
        _ => Ok(content.to_vec()),
    }
}

fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'=' {
            // Soft line break.
            if input[i + 1..].starts_with(b"\r\n") {
                i += 3;
                continue;
            }
            if input[i + 1..].starts_with(b"\n") {
                i += 2;
                continue;
            }
            if i + 2 < input.len() {
                if let (Some(high), Some(low)) = (hex_digit(input[i + 1]), hex_digit(input[i + 2])) {
                    output.push(high << 4 | low);
                    i += 3;
                    continue;
                }
            }
        }
        output.push(input[i]);
        i += 1;
    }
    output
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}

/// Splits a section at the first blank line into (header block, content).
/// A section with no blank line is all headers and empty content.
fn split_header_block(section: &[u8]) -> (&[u8], &[u8]) {
    if let Some(at) = find(section, b"\r\n\r\n") {
        (&section[..at], &section[at + 4..])
    } else if let Some(at) = find(section, b"\n\n") {
        (&section[..at], &section[at + 2..])
    } else {
        (section, &[])
    }
}

/// Parses a MIME header block, unfolding continuation lines.
fn parse_headers(block: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(block);
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in text.lines() {
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}

/// Advances past the remainder of the delimiter line (transport padding and
/// the line ending itself).
fn skip_line(body: &[u8], mut at: usize) -> usize {
    while at < body.len() && body[at] != b'\n' {
        at += 1;
    }
    (at + 1).min(body.len())
}

/// Backs up over the line ending that precedes the next delimiter.
fn trim_line_ending(body: &[u8], mut end: usize) -> usize {
    if end > 0 && body[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && body[end - 1] == b'\r' {
        end -= 1;
    }
    end
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PART_BODY: &str = "preamble to be ignored\r\n\
        --MIMEBoundary\r\n\
        Content-Type: text/xml; charset=UTF-8\r\n\
        Content-Transfer-Encoding: 8bit\r\n\
        Content-ID: <soap-envelope>\r\n\
        \r\n\
        <env>first part</env>\r\n\
        --MIMEBoundary\r\n\
        Content-Type: text/plain\r\n\
        Content-Transfer-Encoding: base64\r\n\
        \r\n\
        aGVsbG8gd29ybGQ=\r\n\
        --MIMEBoundary--\r\n";

    #[test]
    fn test_split_yields_parts_in_order() {
        let parts = split(TWO_PART_BODY.as_bytes(), "MIMEBoundary").unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].body_str(), "<env>first part</env>");
        assert_eq!(parts[0].header("Content-ID"), Some("<soap-envelope>"));
        assert_eq!(parts[1].body_str(), "hello world");
    }

    #[test]
    fn test_part_headers_are_case_insensitive() {
        let parts = split(TWO_PART_BODY.as_bytes(), "MIMEBoundary").unwrap();

        assert_eq!(
            parts[0].header("content-type"),
            Some("text/xml; charset=UTF-8")
        );
    }

    #[test]
    fn test_split_without_any_delimiter_is_an_error() {
        let result = split(b"<env>not multipart at all</env>", "MIMEBoundary");

        assert_eq!(
            result.unwrap_err(),
            MalformedMultipartError::NoParts("MIMEBoundary".to_string())
        );
    }

    #[test]
    fn test_invalid_base64_content_is_an_error() {
        let body = "--B\r\nContent-Transfer-Encoding: base64\r\n\r\n!!!not base64!!!\r\n--B--\r\n";

        match split(body.as_bytes(), "B") {
            Err(MalformedMultipartError::InvalidEncoding { encoding, .. }) => {
                assert_eq!(encoding, "base64");
            }
            other => panic!("expected InvalidEncoding, got {other:?}"),
        }
    }

    #[test]
    fn test_quoted_printable_decoding() {
        let body =
            "--B\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\nsoft=\r\nbreak =C3=A9\r\n--B--\r\n";
        let parts = split(body.as_bytes(), "B").unwrap();

        assert_eq!(parts[0].body_str(), "softbreak \u{e9}");
    }

    #[test]
    fn test_nested_multipart_parts_are_split_recursively() {
        let body = "--Outer\r\n\
            Content-Type: multipart/mixed; boundary=Inner\r\n\
            \r\n\
            --Inner\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            one\r\n\
            --Inner\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            two\r\n\
            --Inner--\r\n\
            --Outer--\r\n";

        let parts = split(body.as_bytes(), "Outer").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].parts().len(), 2);
        assert_eq!(parts[0].parts()[0].body_str(), "one");
        assert_eq!(parts[0].parts()[1].body_str(), "two");
    }

    #[test]
    fn test_nested_multipart_without_boundary_is_an_error() {
        let body = "--Outer\r\nContent-Type: multipart/mixed\r\n\r\nx\r\n--Outer--\r\n";

        assert_eq!(
            split(body.as_bytes(), "Outer").unwrap_err(),
            MalformedMultipartError::MissingBoundary
        );
    }

    #[test]
    fn test_continuation_lines_are_unfolded() {
        let body = "--B\r\n\
            Content-Type: multipart/related;\r\n\
            \tboundary=Inner\r\n\
            \r\n\
            --Inner\r\n\r\nnested\r\n--Inner--\r\n\
            --B--\r\n";
        let parts = split(body.as_bytes(), "B").unwrap();

        assert_eq!(parts[0].parts().len(), 1);
        assert_eq!(parts[0].parts()[0].body_str(), "nested");
    }

    #[test]
    fn test_boundary_param_with_quoted_value_and_reordered_params() {
        assert_eq!(
            content_type_param(
                r#"multipart/related; charset=UTF-8; boundary="abc123"; type="text/xml""#,
                "boundary"
            ),
            Some("abc123".to_string())
        );
        assert_eq!(
            content_type_param(
                r#"multipart/related; boundary="abc123"; charset=UTF-8"#,
                "boundary"
            ),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_boundary_param_with_unquoted_value() {
        assert_eq!(
            content_type_param("multipart/mixed; boundary=simple", "boundary"),
            Some("simple".to_string())
        );
    }

    #[test]
    fn test_boundary_param_tolerates_equals_inside_quoted_value() {
        assert_eq!(
            content_type_param(
                r#"multipart/related; boundary="--==_mimepart_4d416ae62fd32_201a8043814c4724"; charset=UTF-8"#,
                "boundary"
            ),
            Some("--==_mimepart_4d416ae62fd32_201a8043814c4724".to_string())
        );
    }

    #[test]
    fn test_boundary_param_absent() {
        assert_eq!(content_type_param("multipart/related; charset=UTF-8", "boundary"), None);
        assert_eq!(content_type_param("text/xml", "boundary"), None);
    }
}
