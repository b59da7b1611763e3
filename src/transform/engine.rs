//! The transform pipeline and the registries it draws on.

use std::fmt;
use std::ops::Range;
use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::config::{load_config_file, GlobalConfig, ProviderSection, ProvidersConfig};
use crate::error::{OEmbedError, Result};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::format::{Formatter, JsonFormatter, Metadata, XmlFormatter};
use crate::registry::ProviderRegistry;
use crate::response::Response;
use crate::template::TemplateResolver;
use crate::transform::extract::extract_candidate_urls;

/// How rendered content replaces a candidate URL in the output text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Substitution {
    /// Replace every literal occurrence of the URL in the output, including
    /// occurrences already touched by earlier substitutions.
    #[default]
    Global,
    /// Replace only the span each candidate was extracted from.
    Span,
}

/// Handler invoked for every candidate URL when transforming with rules.
pub type Handler<'h> = dyn FnMut(&mut Response<'_>, &str) -> Result<()> + 'h;

/// Provider, fetcher, formatter and template configuration, plus the
/// transform pipeline that uses them.
///
/// Configure it once, then share it: [`OEmbed::transform`] only needs `&self`.
///
/// # Example
///
/// ```no_run
/// use oembed_links::response::RenderOptions;
/// use oembed_links::transform::OEmbed;
///
/// let mut oembed = OEmbed::with_defaults();
/// oembed
///     .register_provider(
///         "vimeo",
///         "http://vimeo.com/api/oembed.{format}",
///         "json",
///         &["http://vimeo.com/*"],
///     )
///     .unwrap();
///
/// let html = oembed
///     .transform_with("Watch http://vimeo.com/1", false, &[], |response, _url| {
///         response.of_type("video", RenderOptions::template("videos/embed"))?;
///         response.any(RenderOptions::default())?;
///         Ok(())
///     })
///     .unwrap();
/// println!("{html}");
/// ```
pub struct OEmbed {
    registry: ProviderRegistry,
    fetchers: IndexMap<String, Box<dyn Fetcher>>,
    formatters: IndexMap<String, Box<dyn Formatter>>,
    config: GlobalConfig,
    templates: TemplateResolver,
    substitution: Substitution,
}

impl fmt::Debug for OEmbed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OEmbed")
            .field("registry", &self.registry)
            .field("fetchers", &self.fetchers.keys().collect::<Vec<_>>())
            .field("formatters", &self.formatters.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .field("templates", &self.templates)
            .field("substitution", &self.substitution)
            .finish()
    }
}

impl Default for OEmbed {
    fn default() -> Self {
        Self::new()
    }
}

impl OEmbed {
    /// An empty context: no providers, fetchers or formatters.
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            fetchers: IndexMap::new(),
            formatters: IndexMap::new(),
            config: GlobalConfig::default(),
            templates: TemplateResolver::new(),
            substitution: Substitution::default(),
        }
    }

    /// A context with the JSON and XML formatters and the HTTP fetcher.
    pub fn with_defaults() -> Self {
        let mut oembed = Self::new();
        oembed.load_default_libs();
        oembed
    }

    /// Register the built-in formatters and fetcher.
    pub fn load_default_libs(&mut self) {
        self.register_formatter(JsonFormatter);
        self.register_formatter(XmlFormatter);
        self.register_fetcher(HttpFetcher::new());
    }

    /// Register global settings and a set of providers.
    ///
    /// Providers are registered in the order of `providers`; each must have
    /// a section in `provider_config` with at least one scheme.
    pub fn register(
        &mut self,
        config: GlobalConfig,
        providers: &IndexMap<String, String>,
        provider_config: &IndexMap<String, ProviderSection>,
    ) -> Result<()> {
        self.config = config;

        for (name, endpoint) in providers {
            let section = provider_config.get(name).ok_or_else(|| {
                OEmbedError::configuration(format!("No schemes were provided for {}", name))
            })?;
            self.register_provider(name, endpoint, &section.format, &section.schemes.to_vec())?;
        }
        Ok(())
    }

    /// Register everything in a configuration document, including its
    /// template settings.
    pub fn register_config(&mut self, config: &ProvidersConfig) -> Result<()> {
        self.register(
            config.config.clone(),
            &config.providers,
            &config.provider_config,
        )?;
        if let Some(templates) = &config.templates {
            self.templates.configure(templates);
        }
        Ok(())
    }

    /// Load and register a YAML configuration file.
    pub fn register_yaml_file(&mut self, path: &Path) -> Result<()> {
        debug!("Loading provider configuration from {}", path.display());
        let config = load_config_file(path)?;
        self.register_config(&config)
    }

    /// Register (or extend) a single provider.
    pub fn register_provider<S: AsRef<str>>(
        &mut self,
        name: &str,
        endpoint: &str,
        format: &str,
        schemes: &[S],
    ) -> Result<()> {
        self.registry.register(name, endpoint, format, schemes)?;
        Ok(())
    }

    /// Register a fetcher under its name, replacing any previous one.
    pub fn register_fetcher(&mut self, fetcher: impl Fetcher + 'static) {
        trace!("Registering fetcher {}", fetcher.name());
        self.fetchers.insert(fetcher.name().to_string(), Box::new(fetcher));
    }

    /// Register a formatter under its format tag, replacing any previous one.
    pub fn register_formatter(&mut self, formatter: impl Formatter + 'static) {
        trace!("Registering formatter {}", formatter.name());
        self.formatters
            .insert(formatter.name().to_string(), Box::new(formatter));
    }

    /// Forget every provider, fetcher and formatter.
    pub fn clear_registrations(&mut self) {
        self.registry.clear();
        self.fetchers.clear();
        self.formatters.clear();
    }

    /// Global settings from the last registration.
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn templates(&self) -> &TemplateResolver {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateResolver {
        &mut self.templates
    }

    pub fn substitution(&self) -> Substitution {
        self.substitution
    }

    pub fn set_substitution(&mut self, substitution: Substitution) {
        self.substitution = substitution;
    }

    /// Fetch and decode the metadata `provider` has for `url`.
    ///
    /// `extra_params` are appended to the query URL in order.
    pub fn get_url_for_provider(
        &self,
        url: &str,
        provider: &str,
        extra_params: &[(&str, &str)],
    ) -> Result<Metadata> {
        let query = self.registry.build_query_url(url, provider, extra_params)?;
        let format = self
            .registry
            .get(provider)
            .map(|entry| entry.format.as_str())
            .unwrap_or_default();

        let fetcher = self.fetcher()?;
        let formatter = self
            .formatters
            .get(format)
            .ok_or_else(|| OEmbedError::UnknownFormatter {
                format: format.to_string(),
            })?;

        debug!("Fetching {} with {}", query, fetcher.name());
        let body = fetcher.fetch(&query).map_err(|e| OEmbedError::Fetch {
            url: query.clone(),
            message: format!("{e:#}"),
        })?;

        trace!("Decoding {} bytes as {}", body.len(), formatter.name());
        formatter.format(&body).map_err(|e| OEmbedError::Format {
            format: format.to_string(),
            message: format!("{e:#}"),
        })
    }

    /// Replace every URL a provider claims with its default representation
    /// (`data["html"]`, else `data["url"]`).
    ///
    /// URLs no provider claims are left untouched.
    pub fn transform(&self, text: &str, strict: bool, extra_params: &[(&str, &str)]) -> Result<String> {
        self.run(text, strict, extra_params, None)
    }

    /// Transform with a handler that decides how each URL renders.
    ///
    /// The handler is called for every candidate URL, matched or not. A URL
    /// is replaced only when one of the response's tiers fired and produced
    /// content; otherwise it stays as written.
    pub fn transform_with<F>(
        &self,
        text: &str,
        strict: bool,
        extra_params: &[(&str, &str)],
        mut handler: F,
    ) -> Result<String>
    where
        F: FnMut(&mut Response<'_>, &str) -> Result<()>,
    {
        self.run(text, strict, extra_params, Some(&mut handler))
    }

    fn fetcher(&self) -> Result<&dyn Fetcher> {
        self.fetchers
            .get(&self.config.method)
            .or_else(|| self.fetchers.values().next())
            .map(|fetcher| fetcher.as_ref())
            .ok_or(OEmbedError::NoFetcher)
    }

    fn run(
        &self,
        text: &str,
        strict: bool,
        extra_params: &[(&str, &str)],
        mut handler: Option<&mut Handler<'_>>,
    ) -> Result<String> {
        let mut output = text.to_string();
        let mut spans: Vec<(Range<usize>, String)> = Vec::new();

        for (range, url) in extract_candidate_urls(text, strict).spans() {
            let mut response = match self.registry.resolve_provider(url) {
                Some((provider, _)) => {
                    debug!("{} is handled by {}", url, provider.name);
                    let data = self.get_url_for_provider(url, &provider.name, extra_params)?;
                    Response::new(Some(provider.name.clone()), url, data, &self.templates)
                }
                None if handler.is_some() => Response::unmatched(url, &self.templates),
                None => {
                    trace!("No provider for {}", url);
                    continue;
                }
            };

            let replacement = match handler.as_mut() {
                None => response.string_representation(),
                Some(handler) => {
                    handler(&mut response, url)?;
                    if response.has_rendered() {
                        response.content().map(str::to_string)
                    } else {
                        None
                    }
                }
            };

            let Some(replacement) = replacement else {
                continue;
            };
            match self.substitution {
                Substitution::Global => output = output.replace(url, &replacement),
                Substitution::Span => spans.push((range, replacement)),
            }
        }

        if self.substitution == Substitution::Span {
            output = splice(text, spans);
        }
        Ok(output)
    }
}

fn splice(text: &str, spans: Vec<(Range<usize>, String)>) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for (range, replacement) in spans {
        output.push_str(&text[last..range.start]);
        output.push_str(&replacement);
        last = range.end;
    }
    output.push_str(&text[last..]);
    output
}
