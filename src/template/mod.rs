//! Template resolution and rendering.
//!
//! Rendering options on a [`Response`](crate::response::Response) may name a
//! template. The [`TemplateResolver`] turns that reference into a file (or
//! hands it to a host-supplied [`TemplateLookup`]), picks an engine and
//! renders it with three bindings:
//!
//! - `url` - the URL being embedded
//! - `data` - the decoded oEmbed metadata
//! - `response` - the response object itself
//!
//! # Engine Selection
//!
//! 1. The processor named on the [`TemplateReference`], if any
//! 2. The resolver's forced processor, if set
//! 3. The file extension: `haml` → Haml, `erubis` → Erubis
//! 4. Otherwise Erb (or Erubis when `prefer_erubis` is set)
//!
//! # Example
//!
//! ```
//! use oembed_links::template::{TemplateProcessor, TemplateResolver};
//!
//! let mut resolver = TemplateResolver::new();
//! resolver.set_root(Some("templates"));
//! resolver.set_processor(Some("haml")).unwrap();
//! assert_eq!(resolver.processor(), Some(TemplateProcessor::Haml));
//! assert!(resolver.set_processor(Some("liquid")).is_err());
//! ```

pub mod erb;
pub(crate) mod expr;
pub mod haml;
pub mod resolver;

pub use erb::ErbEngine;
pub use haml::HamlEngine;
pub use resolver::{TemplateLookup, TemplateResolver, DEFAULT_EXTENSIONS};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OEmbedError;
use crate::format::Metadata;
use crate::response::Response;

/// The closed set of template processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateProcessor {
    /// Plain embedded expressions (`<%= data["html"] %>`).
    Erb,
    /// Embedded expressions with `<%== %>` HTML escaping.
    Erubis,
    /// Indentation-based markup (`%div.embed= data.html`).
    Haml,
}

impl TemplateProcessor {
    /// Tag used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateProcessor::Erb => "erb",
            TemplateProcessor::Erubis => "erubis",
            TemplateProcessor::Haml => "haml",
        }
    }

    /// The engine implementing this processor.
    pub fn engine(&self) -> &'static dyn TemplateEngine {
        static ERB: ErbEngine = ErbEngine::erb();
        static ERUBIS: ErbEngine = ErbEngine::erubis();
        static HAML: HamlEngine = HamlEngine;

        match self {
            TemplateProcessor::Erb => &ERB,
            TemplateProcessor::Erubis => &ERUBIS,
            TemplateProcessor::Haml => &HAML,
        }
    }
}

impl fmt::Display for TemplateProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateProcessor {
    type Err = OEmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches(':') {
            "erb" => Ok(TemplateProcessor::Erb),
            "erubis" => Ok(TemplateProcessor::Erubis),
            "haml" => Ok(TemplateProcessor::Haml),
            other => Err(OEmbedError::configuration(format!(
                "Unsupported processor type: {}",
                other
            ))),
        }
    }
}

/// A template named by a caller, optionally pinned to a processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateReference {
    /// Path or name, relative to the template root when one is set.
    pub path: String,
    /// Processor overriding every other selection rule.
    pub processor: Option<TemplateProcessor>,
}

impl TemplateReference {
    /// Reference a template by path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            processor: None,
        }
    }

    /// Pin this reference to a processor.
    pub fn with_processor(mut self, processor: TemplateProcessor) -> Self {
        self.processor = Some(processor);
        self
    }
}

impl From<&str> for TemplateReference {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for TemplateReference {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// The values a template can see.
#[derive(Clone, Copy)]
pub struct Bindings<'a> {
    /// The URL being embedded.
    pub url: &'a str,
    /// Decoded oEmbed metadata.
    pub data: &'a Metadata,
    /// The response being rendered.
    pub response: &'a Response<'a>,
}

/// A template engine that renders source text with [`Bindings`].
///
/// Engines are stateless: nothing is compiled or cached between renders.
pub trait TemplateEngine: Send + Sync {
    /// Engine name, for logging.
    fn name(&self) -> &'static str;

    /// Render `source` with the given bindings.
    fn render(&self, source: &str, bindings: &Bindings<'_>) -> anyhow::Result<String>;
}
