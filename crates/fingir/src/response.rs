//! Typed response coercion.
//!
//! A response body is always accumulated as text; the `ResponseType` tag
//! selects the codec applied once the request reaches Done. Each codec is a
//! pure function from the accumulated text to the typed value. The document
//! codec carries the markup verbatim behind a shallow well-formedness check;
//! full DOM construction is a pluggable concern outside this crate.

use serde::{Deserialize, Serialize};

/// The shape requested for a completed response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseType {
    /// The default, equivalent to text
    #[default]
    Default,
    /// Plain text
    Text,
    /// Parsed JSON value
    Json,
    /// Parsed markup document
    Document,
    /// Raw bytes, one per character code
    ArrayBuffer,
    /// Raw bytes wrapped as a blob
    Blob,
}

impl ResponseType {
    /// Parse from the conventional tag string; unknown tags map to the default
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "json" => Self::Json,
            "document" => Self::Document,
            "arraybuffer" => Self::ArrayBuffer,
            "blob" => Self::Blob,
            _ => Self::Default,
        }
    }

    /// The conventional tag string
    #[must_use]
    pub const fn as_tag(&self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Text => "text",
            Self::Json => "json",
            Self::Document => "document",
            Self::ArrayBuffer => "arraybuffer",
            Self::Blob => "blob",
        }
    }

    /// True for the tags whose completed value is the accumulated text itself
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::Default | Self::Text)
    }
}

/// A completed (or in-flight) response value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ResponseValue {
    /// No value; the null of the json/document/binary tags
    #[default]
    None,
    /// Text, also the in-flight accumulation for every tag
    Text(String),
    /// Parsed JSON
    Json(serde_json::Value),
    /// Parsed markup document
    Document(XmlDocument),
    /// Raw bytes
    ArrayBuffer(Vec<u8>),
    /// Raw bytes wrapped as a blob
    Blob(Vec<u8>),
}

impl ResponseValue {
    /// The initial value right after `open()` for a given tag
    #[must_use]
    pub fn initial_for(response_type: ResponseType) -> Self {
        if response_type.is_textual() {
            Self::Text(String::new())
        } else {
            Self::None
        }
    }

    /// True for the null value
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Text contents, if this is a text value
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Parsed JSON, if this is a json value
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Parsed document, if this is a document value
    #[must_use]
    pub const fn as_document(&self) -> Option<&XmlDocument> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Raw bytes, for either binary tag
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::ArrayBuffer(bytes) | Self::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Coerce accumulated text into the value dictated by the tag.
///
/// JSON and document parse failures coerce to the null value rather than an
/// error; the binary tags take one raw byte per character code.
#[must_use]
pub fn coerce(response_type: ResponseType, text: &str) -> ResponseValue {
    match response_type {
        ResponseType::Default | ResponseType::Text => ResponseValue::Text(text.to_string()),
        ResponseType::Json => serde_json::from_str(text)
            .map(ResponseValue::Json)
            .unwrap_or(ResponseValue::None),
        ResponseType::Document => XmlDocument::parse(text)
            .map(ResponseValue::Document)
            .unwrap_or(ResponseValue::None),
        ResponseType::ArrayBuffer => ResponseValue::ArrayBuffer(byte_per_char(text)),
        ResponseType::Blob => ResponseValue::Blob(byte_per_char(text)),
    }
}

/// One raw byte per character code, truncating to the low octet
#[must_use]
pub fn byte_per_char(text: &str) -> Vec<u8> {
    text.chars().map(|ch| ch as u32 as u8).collect()
}

/// True when a response content type permits markup parsing.
///
/// An absent content type permits parsing; anything mentioning `xml`
/// (case-insensitively) does too; everything else, `text/plain` included,
/// does not.
#[must_use]
pub fn is_xml_mime(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => value.to_ascii_lowercase().contains("xml"),
    }
}

/// A markup document carried verbatim.
///
/// Holds the source text and the root element name after a shallow
/// well-formedness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlDocument {
    source: String,
    root: String,
}

impl XmlDocument {
    /// Parse markup, returning `None` unless it looks like an element tree
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if !trimmed.starts_with('<') || !trimmed.ends_with('>') {
            return None;
        }
        let root = root_name(trimmed)?;
        Some(Self {
            source: trimmed.to_string(),
            root,
        })
    }

    /// The root element name
    #[must_use]
    pub fn root_name(&self) -> &str {
        &self.root
    }

    /// The markup source
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Count occurrences of an element tag anywhere in the document
    #[must_use]
    pub fn count_elements(&self, tag: &str) -> usize {
        let open = format!("<{tag}");
        self.source.match_indices(&open).count()
    }
}

/// First element name in the markup, skipping declarations and comments
fn root_name(markup: &str) -> Option<String> {
    let mut rest = markup;
    loop {
        let open = rest.find('<')?;
        let after = &rest[open + 1..];
        if after.starts_with('?') || after.starts_with('!') {
            let close = after.find('>')?;
            rest = &after[close + 1..];
            continue;
        }
        let name: String = after
            .chars()
            .take_while(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | ':'))
            .collect();
        return if name.is_empty() { None } else { Some(name) };
    }
}

/// The standard reason phrase for an HTTP status code, or `""` when unknown
#[must_use]
pub const fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod response_type_tests {
        use super::*;

        #[test]
        fn test_from_tag() {
            assert_eq!(ResponseType::from_tag(""), ResponseType::Default);
            assert_eq!(ResponseType::from_tag("text"), ResponseType::Text);
            assert_eq!(ResponseType::from_tag("json"), ResponseType::Json);
            assert_eq!(ResponseType::from_tag("document"), ResponseType::Document);
            assert_eq!(
                ResponseType::from_tag("arraybuffer"),
                ResponseType::ArrayBuffer
            );
            assert_eq!(ResponseType::from_tag("blob"), ResponseType::Blob);
            assert_eq!(ResponseType::from_tag("unknown"), ResponseType::Default);
        }

        #[test]
        fn test_as_tag_round_trip() {
            for ty in [
                ResponseType::Text,
                ResponseType::Json,
                ResponseType::Document,
                ResponseType::ArrayBuffer,
                ResponseType::Blob,
            ] {
                assert_eq!(ResponseType::from_tag(ty.as_tag()), ty);
            }
        }

        #[test]
        fn test_initial_values() {
            assert_eq!(
                ResponseValue::initial_for(ResponseType::Default),
                ResponseValue::Text(String::new())
            );
            assert_eq!(
                ResponseValue::initial_for(ResponseType::Text),
                ResponseValue::Text(String::new())
            );
            assert!(ResponseValue::initial_for(ResponseType::Json).is_none());
            assert!(ResponseValue::initial_for(ResponseType::Document).is_none());
            assert!(ResponseValue::initial_for(ResponseType::ArrayBuffer).is_none());
            assert!(ResponseValue::initial_for(ResponseType::Blob).is_none());
        }
    }

    mod coerce_tests {
        use super::*;

        #[test]
        fn test_text_passthrough() {
            let value = coerce(ResponseType::Default, "hello");
            assert_eq!(value.as_text(), Some("hello"));
        }

        #[test]
        fn test_json_parses() {
            let value = coerce(ResponseType::Json, r#"{"foo":true}"#);
            let json = value.as_json().unwrap();
            assert_eq!(json["foo"], true);
        }

        #[test]
        fn test_json_parse_failure_is_null() {
            let value = coerce(ResponseType::Json, "not json");
            assert!(value.is_none());
        }

        #[test]
        fn test_arraybuffer_bytes() {
            let value = coerce(ResponseType::ArrayBuffer, "a test buffer");
            assert_eq!(value.as_bytes(), Some(b"a test buffer".as_ref()));
        }

        #[test]
        fn test_binary_truncates_to_octet() {
            let value = coerce(ResponseType::Blob, "\u{ff}");
            assert_eq!(value.as_bytes(), Some([0xff].as_ref()));
        }

        #[test]
        fn test_document() {
            let value = coerce(ResponseType::Document, "<div><h1>Hola!</h1></div>");
            assert_eq!(value.as_document().unwrap().root_name(), "div");
        }

        #[test]
        fn test_document_failure_is_null() {
            assert!(coerce(ResponseType::Document, "plain words").is_none());
        }
    }

    mod xml_document_tests {
        use super::*;

        #[test]
        fn test_parse_simple() {
            let doc = XmlDocument::parse("<div><h1>Hola!</h1></div>").unwrap();
            assert_eq!(doc.root_name(), "div");
            assert_eq!(doc.count_elements("h1"), 1);
        }

        #[test]
        fn test_parse_with_declaration() {
            let doc = XmlDocument::parse("<?xml version=\"1.0\"?><root/>").unwrap();
            assert_eq!(doc.root_name(), "root");
        }

        #[test]
        fn test_rejects_plain_text() {
            assert!(XmlDocument::parse("hello").is_none());
            assert!(XmlDocument::parse("").is_none());
        }

        #[test]
        fn test_mime_sniffing() {
            assert!(is_xml_mime(None));
            assert!(is_xml_mime(Some("application/xml")));
            assert!(is_xml_mime(Some("text/xml")));
            assert!(is_xml_mime(Some("application/text+xml")));
            assert!(!is_xml_mime(Some("text/plain")));
            assert!(!is_xml_mime(Some("text/html")));
        }
    }

    mod reason_phrase_tests {
        use super::*;

        #[test]
        fn test_common_codes() {
            assert_eq!(reason_phrase(200), "OK");
            assert_eq!(reason_phrase(201), "Created");
            assert_eq!(reason_phrase(204), "No Content");
            assert_eq!(reason_phrase(403), "Forbidden");
            assert_eq!(reason_phrase(404), "Not Found");
            assert_eq!(reason_phrase(500), "Internal Server Error");
        }

        #[test]
        fn test_unknown_code() {
            assert_eq!(reason_phrase(599), "");
        }
    }
}
