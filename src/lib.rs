//! oembed-links - Replace links to embeddable media with their oEmbed content.
//!
//! Text is scanned for URLs; every URL a registered provider claims is sent
//! to that provider's oEmbed endpoint, and the decoded metadata is rendered
//! in place of the link, either by default (`html`, else `url`) or by
//! caller-supplied rules and templates.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface
//! - [`config`] - Declarative YAML provider configuration
//! - [`error`] - Error types and result aliases
//! - [`fetch`] - Fetching provider responses
//! - [`format`] - Decoding provider responses into metadata
//! - [`registry`] - Provider registry and query URL construction
//! - [`response`] - Per-URL tiered rendering rules
//! - [`scheme`] - Glob URL schemes
//! - [`template`] - Template resolution and engines
//! - [`transform`] - URL extraction and the transform pipeline
//!
//! # Example
//!
//! ```
//! use oembed_links::format::JsonFormatter;
//! use oembed_links::fetch::Fetcher;
//! use oembed_links::OEmbed;
//!
//! struct Canned;
//!
//! impl Fetcher for Canned {
//!     fn name(&self) -> &str {
//!         "canned"
//!     }
//!
//!     fn fetch(&self, _url: &str) -> anyhow::Result<String> {
//!         Ok(r#"{"html": "<iframe></iframe>"}"#.to_string())
//!     }
//! }
//!
//! let mut oembed = OEmbed::new();
//! oembed.register_fetcher(Canned);
//! oembed.register_formatter(JsonFormatter);
//! oembed
//!     .register_provider("vimeo", "http://vimeo.com/api/oembed.{format}", "json", &["http://vimeo.com/*"])
//!     .unwrap();
//!
//! let html = oembed.transform("Look: http://vimeo.com/1", false, &[]).unwrap();
//! assert_eq!(html, "Look: <iframe></iframe>");
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod registry;
pub mod response;
pub mod scheme;
pub mod template;
pub mod transform;

pub use error::{OEmbedError, Result};
pub use response::{RenderOptions, Response};
pub use transform::OEmbed;
