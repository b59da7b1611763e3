//! Provider URL scheme matching.
//!
//! Providers advertise the URLs they can embed as glob-style schemes such as
//! `http://*.flickr.com/photos/*`. A [`SchemeMatcher`] compiles one of these
//! into an anchored regular expression in which every literal character is
//! escaped and each `*` matches one or more characters, non-greedily.

use regex::Regex;

use crate::error::{OEmbedError, Result};

/// A compiled, anchored provider scheme.
///
/// # Example
///
/// ```
/// use oembed_links::scheme::SchemeMatcher;
///
/// let matcher = SchemeMatcher::compile("http://example.*/*").unwrap();
/// assert!(matcher.is_match("http://example.com/x"));
/// assert!(matcher.is_match("http://example.org/y/z"));
/// assert!(!matcher.is_match("http://other.com/x"));
/// ```
#[derive(Debug, Clone)]
pub struct SchemeMatcher {
    scheme: String,
    regex: Regex,
}

impl SchemeMatcher {
    /// Compile a glob scheme.
    pub fn compile(scheme: &str) -> Result<Self> {
        let body = scheme
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".+?");

        let regex = Regex::new(&format!("^{}$", body)).map_err(|e| {
            OEmbedError::configuration(format!("Invalid scheme '{}': {}", scheme, e))
        })?;

        Ok(Self {
            scheme: scheme.to_string(),
            regex,
        })
    }

    /// The glob this matcher was compiled from.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The anchored pattern used for matching.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the whole URL matches this scheme.
    pub fn is_match(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}
