//! Request and response header stores.
//!
//! Request headers are insertion-ordered with case-sensitive key storage but
//! case-insensitive merging: setting a header whose name differs only in case
//! from an existing entry appends `","` plus the new value to the entry stored
//! under the first-used casing. Response headers are insertion-ordered too and
//! suppress `Set-Cookie`/`Set-Cookie2` from every accessor.

use serde::{Deserialize, Serialize};

/// Header names a caller may never set on a request.
///
/// Checked case-insensitively; `Proxy-` and `Sec-` prefixed names are rejected
/// as well.
const UNSAFE_HEADERS: &[&str] = &[
    "accept-charset",
    "accept-encoding",
    "connection",
    "content-length",
    "cookie",
    "cookie2",
    "content-transfer-encoding",
    "date",
    "expect",
    "host",
    "keep-alive",
    "referer",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "user-agent",
    "via",
];

/// Check whether a request header name is forbidden
#[must_use]
pub fn is_unsafe_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    UNSAFE_HEADERS.contains(&lower.as_str())
        || lower.starts_with("proxy-")
        || lower.starts_with("sec-")
}

/// Check whether a header is a cookie-setting header (never surfaced)
#[must_use]
pub fn is_cookie_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("set-cookie") || name.eq_ignore_ascii_case("set-cookie2")
}

/// Ordered request-header map with the comma-append merge rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeaders {
    entries: Vec<(String, String)>,
}

impl RequestHeaders {
    /// Create an empty header map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a header into the map.
    ///
    /// A repeated name (compared case-insensitively) appends `","` plus the
    /// value to the existing entry; the first-used key casing is kept.
    pub(crate) fn append(&mut self, name: &str, value: &str) {
        if let Some((_, existing)) = self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            existing.push(',');
            existing.push_str(value);
        } else {
            self.entries.push((name.to_string(), value.to_string()));
        }
    }

    /// Case-insensitive lookup
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The stored key casing for a name, if present
    #[must_use]
    pub fn stored_name(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(key, _)| key.as_str())
    }

    /// Check for a header by name, case-insensitively
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Mutable access to a header value, case-insensitively
    pub(crate) fn value_mut(&mut self, name: &str) -> Option<&mut String> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of stored headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no headers are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Ordered response-header map with cookie suppression
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeaders {
    entries: Vec<(String, String)>,
}

impl ResponseHeaders {
    /// Create an empty header map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from name/value pairs, keeping insertion order
    #[must_use]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            entries: pairs
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
        }
    }

    /// Case-insensitive lookup.
    ///
    /// Cookie-setting headers are stored but this accessor still returns them;
    /// the request-level accessor applies the suppression rule.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Serialize to the `"Name: value\r\n"` wire form.
    ///
    /// Cookie-setting headers are omitted; insertion order is preserved; the
    /// output ends with the final `\r\n` and nothing else.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.entries {
            if is_cookie_header(name) {
                continue;
            }
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out
    }

    /// Iterate entries in insertion order, including cookie headers
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of stored headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no headers are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn set_entries(&mut self, entries: Vec<(String, String)>) {
        self.entries = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod unsafe_header_tests {
        use super::*;

        #[test]
        fn test_forbidden_names() {
            for name in [
                "Accept-Charset",
                "Accept-Encoding",
                "Connection",
                "Content-Length",
                "Cookie",
                "Cookie2",
                "Content-Transfer-Encoding",
                "Date",
                "Expect",
                "Host",
                "Keep-Alive",
                "Referer",
                "TE",
                "Trailer",
                "Transfer-Encoding",
                "Upgrade",
                "User-Agent",
                "Via",
            ] {
                assert!(is_unsafe_header(name), "{name} should be rejected");
            }
        }

        #[test]
        fn test_forbidden_prefixes() {
            assert!(is_unsafe_header("Proxy-Oops"));
            assert!(is_unsafe_header("Sec-Oops"));
            assert!(is_unsafe_header("proxy-connection"));
        }

        #[test]
        fn test_case_insensitive() {
            assert!(is_unsafe_header("cookie"));
            assert!(is_unsafe_header("COOKIE"));
        }

        #[test]
        fn test_safe_names() {
            assert!(!is_unsafe_header("X-Fake"));
            assert!(!is_unsafe_header("Content-Type"));
            assert!(!is_unsafe_header("Authorization"));
        }
    }

    mod request_headers_tests {
        use super::*;

        #[test]
        fn test_append_new() {
            let mut headers = RequestHeaders::new();
            headers.append("X-Fake", "Yeah!");
            assert_eq!(headers.get("X-Fake"), Some("Yeah!"));
            assert_eq!(headers.len(), 1);
        }

        #[test]
        fn test_append_same_name_joins_with_comma() {
            let mut headers = RequestHeaders::new();
            headers.append("X-Fake", "Oh");
            headers.append("X-Fake", "yeah!");
            assert_eq!(headers.get("X-Fake"), Some("Oh,yeah!"));
            assert_eq!(headers.len(), 1);
        }

        #[test]
        fn test_append_differs_only_in_case() {
            let mut headers = RequestHeaders::new();
            headers.append("x-fake", "a");
            headers.append("X-FAKE", "b");
            assert_eq!(headers.len(), 1);
            assert_eq!(headers.get("X-Fake"), Some("a,b"));
            assert_eq!(headers.stored_name("X-Fake"), Some("x-fake"));
        }

        #[test]
        fn test_case_insensitive_get() {
            let mut headers = RequestHeaders::new();
            headers.append("Content-Type", "text/html");
            assert_eq!(headers.get("content-type"), Some("text/html"));
        }

        #[test]
        fn test_insertion_order() {
            let mut headers = RequestHeaders::new();
            headers.append("A", "1");
            headers.append("B", "2");
            let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
            assert_eq!(names, vec!["A", "B"]);
        }
    }

    mod response_headers_tests {
        use super::*;

        #[test]
        fn test_from_pairs_get() {
            let headers = ResponseHeaders::from_pairs(&[("Content-Type", "text/html")]);
            assert_eq!(headers.get("content-type"), Some("text/html"));
            assert_eq!(headers.get("X-Other"), None);
        }

        #[test]
        fn test_to_wire_order_and_terminator() {
            let headers = ResponseHeaders::from_pairs(&[
                ("Content-Type", "text/html"),
                ("Content-Length", "32"),
            ]);
            assert_eq!(
                headers.to_wire(),
                "Content-Type: text/html\r\nContent-Length: 32\r\n"
            );
        }

        #[test]
        fn test_to_wire_skips_cookies() {
            let headers = ResponseHeaders::from_pairs(&[
                ("Content-Type", "text/html"),
                ("Set-Cookie2", "There"),
                ("Content-Length", "32"),
            ]);
            assert_eq!(
                headers.to_wire(),
                "Content-Type: text/html\r\nContent-Length: 32\r\n"
            );
        }

        #[test]
        fn test_to_wire_only_cookies() {
            let headers =
                ResponseHeaders::from_pairs(&[("Set-Cookie", "Hey"), ("Set-Cookie2", "There")]);
            assert_eq!(headers.to_wire(), "");
        }
    }
}
