//! Request filters for routing opens to a real transport.
//!
//! A filter is a predicate over the request details captured by `open`.
//! Filters are registered process-wide on the registry, evaluated in order,
//! and the first match selects delegation. Convenience constructors cover the
//! common URL/method shapes; arbitrary predicates are always available.

use crate::request::RequestDetails;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pattern for matching request URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Any => true,
        }
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) | Self::Prefix(s) | Self::Contains(s) | Self::Regex(s) => {
                write!(f, "{}", s)
            }
            Self::Any => write!(f, "*"),
        }
    }
}

/// A predicate over request details; first registered match wins
#[derive(Clone)]
pub struct RequestFilter {
    predicate: Arc<dyn Fn(&RequestDetails) -> bool + Send + Sync>,
}

impl RequestFilter {
    /// Build a filter from an arbitrary predicate
    pub fn new(predicate: impl Fn(&RequestDetails) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Match requests whose URL fits a pattern
    #[must_use]
    pub fn url(pattern: UrlPattern) -> Self {
        Self::new(move |details| pattern.matches(&details.url))
    }

    /// Match requests with a method, case-insensitively
    #[must_use]
    pub fn method(method: &str) -> Self {
        let method = method.to_string();
        Self::new(move |details| details.method.eq_ignore_ascii_case(&method))
    }

    /// Match requests with both a method and a URL pattern
    #[must_use]
    pub fn method_and_url(method: &str, pattern: UrlPattern) -> Self {
        let method = method.to_string();
        Self::new(move |details| {
            details.method.eq_ignore_ascii_case(&method) && pattern.matches(&details.url)
        })
    }

    /// Evaluate the predicate
    #[must_use]
    pub fn matches(&self, details: &RequestDetails) -> bool {
        (self.predicate)(details)
    }
}

impl std::fmt::Debug for RequestFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestFilter").finish_non_exhaustive()
    }
}
