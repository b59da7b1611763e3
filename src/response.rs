//! Per-URL rendering decisions.
//!
//! A [`Response`] is built for every candidate URL in a transform and handed
//! to the caller's handler, which asks it to render under one of several
//! conditions ("tiers"). Tiers are tried in the order the handler calls
//! them, and gate each other:
//!
//! | Tier       | Fires when                                      | Blocked by                  |
//! |------------|-------------------------------------------------|-----------------------------|
//! | `from`     | the response came from the named provider       | an earlier `from`           |
//! | `matches`  | the pattern matches the original URL            | `from`, `matches`           |
//! | `of_type`  | `data["type"]` equals the given name            | `from`, `matches`, `of_type`|
//! | `any`      | always                                          | anything rendered           |
//! | `none`     | no provider matched (metadata is empty)         | anything rendered           |
//!
//! A higher tier fired after a lower one replaces its content, so the final
//! content always comes from the highest tier that fired.
//!
//! # Example
//!
//! ```
//! use oembed_links::format::Metadata;
//! use oembed_links::response::{RenderOptions, Response};
//! use oembed_links::template::TemplateResolver;
//!
//! let templates = TemplateResolver::new();
//! let mut data = Metadata::new();
//! data.insert("type".into(), "video".into());
//! data.insert("html".into(), "<embed/>".into());
//!
//! let mut response = Response::new(Some("vimeo".into()), "http://vimeo.com/1", data, &templates);
//! response.of_type("video", RenderOptions::with(|_| "a video".to_string())).unwrap();
//! response.any(RenderOptions::default()).unwrap();
//! assert_eq!(response.content(), Some("a video"));
//! ```

use std::fmt;

use regex::Regex;
use tracing::debug;

use crate::error::{OEmbedError, Result};
use crate::format::{value_to_text, Metadata};
use crate::template::{TemplateReference, TemplateResolver};

/// The condition under which a response rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// No provider matched the URL.
    Unmatched,
    /// The response's provider was named explicitly.
    Provider,
    /// A pattern matched the URL.
    Regex,
    /// `data["type"]` matched.
    Type,
    /// Catch-all.
    Any,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Unmatched => "none",
            Tier::Provider => "provider",
            Tier::Regex => "regex",
            Tier::Type => "type",
            Tier::Any => "any",
        };
        f.write_str(name)
    }
}

/// What to render when a tier fires.
#[derive(Default)]
pub enum RenderOptions<'f> {
    /// `data["html"]`, else `data["url"]`.
    #[default]
    Default,
    /// Render a template; the output is right-trimmed.
    Template(TemplateReference),
    /// Call a function with the metadata; the output is used verbatim.
    With(Box<dyn FnOnce(&Metadata) -> String + 'f>),
}

impl<'f> RenderOptions<'f> {
    /// Render the given template.
    pub fn template(reference: impl Into<TemplateReference>) -> Self {
        Self::Template(reference.into())
    }

    /// Render with an inline function.
    pub fn with(render: impl FnOnce(&Metadata) -> String + 'f) -> Self {
        Self::With(Box::new(render))
    }
}

impl fmt::Debug for RenderOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Template(reference) => f.debug_tuple("Template").field(reference).finish(),
            Self::With(_) => f.write_str("With(..)"),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct RenderState {
    has_rendered: bool,
    via_provider: bool,
    via_regex: bool,
    via_type: bool,
    fired: Option<Tier>,
    content: Option<String>,
}

/// A candidate URL, its provider and decoded metadata, and what has been
/// rendered for it so far.
#[derive(Debug)]
pub struct Response<'r> {
    provider: Option<String>,
    url: String,
    data: Metadata,
    state: RenderState,
    templates: &'r TemplateResolver,
}

impl<'r> Response<'r> {
    pub fn new(
        provider: Option<String>,
        url: &str,
        data: Metadata,
        templates: &'r TemplateResolver,
    ) -> Self {
        Self {
            provider,
            url: url.to_string(),
            data,
            state: RenderState::default(),
            templates,
        }
    }

    /// A response for a URL no provider claimed.
    pub fn unmatched(url: &str, templates: &'r TemplateResolver) -> Self {
        Self::new(None, url, Metadata::new(), templates)
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn data(&self) -> &Metadata {
        &self.data
    }

    /// Render if no provider matched this URL and nothing has rendered.
    pub fn none(&mut self, options: RenderOptions<'_>) -> Result<Option<&str>> {
        if self.data.is_empty() && !self.state.has_rendered {
            return self.fire(Tier::Unmatched, options);
        }
        Ok(None)
    }

    /// Render if this response came from `provider`.
    ///
    /// An unmatched response has the empty provider name.
    pub fn from(&mut self, provider: &str, options: RenderOptions<'_>) -> Result<Option<&str>> {
        if !self.state.via_provider && self.provider.as_deref().unwrap_or("") == provider {
            return self.fire(Tier::Provider, options);
        }
        Ok(None)
    }

    /// Render if `pattern` matches the original URL.
    pub fn matches(&mut self, pattern: &Regex, options: RenderOptions<'_>) -> Result<Option<&str>> {
        if !self.state.via_provider && !self.state.via_regex && pattern.is_match(&self.url) {
            return self.fire(Tier::Regex, options);
        }
        Ok(None)
    }

    /// Render if `data["type"]` equals `type_name`.
    ///
    /// Missing or mismatched types are a silent no-op.
    pub fn of_type(&mut self, type_name: &str, options: RenderOptions<'_>) -> Result<Option<&str>> {
        let gated = self.state.via_provider || self.state.via_regex || self.state.via_type;
        let matches = self
            .data
            .get("type")
            .is_some_and(|t| !t.is_null() && value_to_text(t) == type_name);

        if !gated && matches {
            return self.fire(Tier::Type, options);
        }
        Ok(None)
    }

    /// Type tier addressed by predicate name, e.g. `"video?"`.
    ///
    /// Names that do not end in `?` are rejected.
    pub fn predicate(&mut self, name: &str, options: RenderOptions<'_>) -> Result<Option<&str>> {
        let Some(type_name) = name.strip_suffix('?') else {
            return Err(OEmbedError::UnknownPredicate {
                name: name.to_string(),
            });
        };
        self.of_type(type_name, options)
    }

    /// Render if nothing has rendered yet.
    pub fn any(&mut self, options: RenderOptions<'_>) -> Result<Option<&str>> {
        if !self.state.has_rendered {
            return self.fire(Tier::Any, options);
        }
        Ok(None)
    }

    pub fn has_rendered(&self) -> bool {
        self.state.has_rendered
    }

    /// The tier whose content currently stands.
    pub fn fired_tier(&self) -> Option<Tier> {
        self.state.fired
    }

    /// Content produced by the tier that fired, if it produced any.
    pub fn content(&self) -> Option<&str> {
        self.state.content.as_deref()
    }

    /// Rendered content, or the default representation when nothing rendered.
    pub fn rendered_content(&self) -> Option<String> {
        if self.state.has_rendered {
            self.state.content.clone()
        } else {
            self.string_representation()
        }
    }

    /// `data["html"]`, else `data["url"]`, regardless of render state.
    pub fn string_representation(&self) -> Option<String> {
        ["html", "url"]
            .iter()
            .filter_map(|key| self.data.get(*key))
            .find(|value| !value.is_null())
            .map(value_to_text)
    }

    fn fire(&mut self, tier: Tier, options: RenderOptions<'_>) -> Result<Option<&str>> {
        let content = self.render(options)?;
        debug!("Rendered {} via {} tier", self.url, tier);

        let state = &mut self.state;
        state.has_rendered = true;
        match tier {
            Tier::Provider => state.via_provider = true,
            Tier::Regex => state.via_regex = true,
            Tier::Type => state.via_type = true,
            Tier::Unmatched | Tier::Any => {}
        }
        state.fired = Some(tier);
        state.content = content;

        Ok(self.state.content.as_deref())
    }

    fn render(&self, options: RenderOptions<'_>) -> Result<Option<String>> {
        match options {
            RenderOptions::Default => Ok(self.string_representation()),
            RenderOptions::Template(reference) => self
                .templates
                .render(&reference, &self.url, &self.data, self)
                .map(Some),
            RenderOptions::With(render) => Ok(Some(render(&self.data))),
        }
    }
}
