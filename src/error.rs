//! Error types for oEmbed operations.
//!
//! This module defines [`OEmbedError`], the error type returned by
//! registration, fetching, formatting and rendering, and a [`Result`] alias.
//!
//! # Error Handling Strategy
//!
//! - Configuration problems surface synchronously from the call that
//!   detected them and are never retried
//! - Fetcher and formatter failures abort the whole transform; there is no
//!   per-URL isolation
//! - "No provider", "no tier fired" and empty metadata are not errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for oEmbed operations.
#[derive(Debug, Error)]
pub enum OEmbedError {
    /// Invalid registration, processor tag, or configuration shape.
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    /// Configuration file not found at the given location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse a configuration document.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Template reference could not be resolved to an existing file.
    #[error("Template not found: {path}")]
    TemplateNotFound { path: String },

    /// A template engine failed to render.
    #[error("Failed to render template {path}: {message}")]
    Template { path: String, message: String },

    /// A predicate name that does not end in `?`.
    #[error("No such predicate: {name}")]
    UnknownPredicate { name: String },

    /// No fetcher has been registered.
    #[error("No fetcher registered")]
    NoFetcher,

    /// No formatter is registered for a provider's format tag.
    #[error("No formatter registered for format '{format}'")]
    UnknownFormatter { format: String },

    /// The fetcher collaborator failed.
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// The formatter collaborator failed to decode a body.
    #[error("Failed to decode {format} response: {message}")]
    Format { format: String, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OEmbedError {
    /// Shorthand for a [`OEmbedError::Configuration`] error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias for oEmbed operations.
pub type Result<T> = std::result::Result<T, OEmbedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_displays_message() {
        let err = OEmbedError::configuration("No schemes were provided for vimeo");
        assert!(err.to_string().contains("No schemes were provided for vimeo"));
    }

    #[test]
    fn config_parse_error_displays_path_and_message() {
        let err = OEmbedError::ConfigParse {
            path: PathBuf::from("/oembed_links.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/oembed_links.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn template_not_found_displays_path() {
        let err = OEmbedError::TemplateNotFound {
            path: "does.not.exist".into(),
        };
        assert!(err.to_string().contains("does.not.exist"));
    }

    #[test]
    fn fetch_error_displays_url_and_message() {
        let err = OEmbedError::Fetch {
            url: "http://provider/oembed?url=x".into(),
            message: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("http://provider/oembed?url=x"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn unknown_formatter_displays_format() {
        let err = OEmbedError::UnknownFormatter {
            format: "yaml".into(),
        };
        assert!(err.to_string().contains("yaml"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: OEmbedError = io_err.into();
        assert!(matches!(err, OEmbedError::Io(_)));
    }

    #[test]
    fn anyhow_error_is_transparent() {
        let err: OEmbedError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
