//! Provider resolution from URLs.
//!
//! Resolution scans every registered scheme in registration order across all
//! providers (first match wins). A provider registered later never shadows a
//! scheme registered earlier, even when it is more specific.

use indexmap::IndexMap;
use regex::{NoExpand, Regex};
use std::sync::LazyLock;
use url::form_urlencoded;

use crate::error::{OEmbedError, Result};
use crate::registry::provider::ProviderEntry;
use crate::scheme::SchemeMatcher;

static FORMAT_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{format\}").unwrap());

/// A scheme in the global match list, tagged with its provider.
#[derive(Debug, Clone)]
struct RegisteredScheme {
    provider: String,
    matcher: SchemeMatcher,
}

/// Registry of oEmbed providers and their URL schemes.
///
/// # Example
///
/// ```
/// use oembed_links::registry::ProviderRegistry;
///
/// let mut registry = ProviderRegistry::new();
/// registry
///     .register("vimeo", "http://vimeo.com/api/oembed.{format}", "json", &["http://vimeo.com/*"])
///     .unwrap();
///
/// let (provider, _) = registry.resolve_provider("http://vimeo.com/123").unwrap();
/// assert_eq!(provider.name, "vimeo");
/// assert_eq!(provider.endpoint, "http://vimeo.com/api/oembed.json");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: IndexMap<String, ProviderEntry>,
    schemes: Vec<RegisteredScheme>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a provider.
    ///
    /// The endpoint's `{format}` placeholder is replaced by `format`,
    /// case-insensitively. Schemes are appended to the global match list, so
    /// re-registering a provider adds to its schemes rather than replacing them.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when `schemes` is empty, the endpoint is empty,
    /// or a scheme cannot be compiled.
    pub fn register<S: AsRef<str>>(
        &mut self,
        provider: &str,
        endpoint: &str,
        format: &str,
        schemes: &[S],
    ) -> Result<&ProviderEntry> {
        if schemes.is_empty() {
            return Err(OEmbedError::configuration(format!(
                "No schemes were provided for {}",
                provider
            )));
        }
        if endpoint.trim().is_empty() {
            return Err(OEmbedError::configuration(format!(
                "No endpoint was provided for {}",
                provider
            )));
        }

        let compiled = schemes
            .iter()
            .map(|s| SchemeMatcher::compile(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let endpoint = FORMAT_PLACEHOLDER
            .replace_all(endpoint, NoExpand(format))
            .into_owned();

        tracing::debug!(
            "Registering provider {} ({}) with {} scheme(s)",
            provider,
            endpoint,
            compiled.len()
        );

        for matcher in &compiled {
            self.schemes.push(RegisteredScheme {
                provider: provider.to_string(),
                matcher: matcher.clone(),
            });
        }

        let entry = self
            .providers
            .entry(provider.to_string())
            .or_insert_with(|| ProviderEntry {
                name: provider.to_string(),
                endpoint: String::new(),
                format: String::new(),
                schemes: Vec::new(),
            });
        entry.endpoint = endpoint;
        entry.format = format.to_string();
        entry.schemes.extend(compiled);

        Ok(entry)
    }

    /// Find the provider for a URL.
    ///
    /// Returns the provider owning the earliest-registered scheme that matches
    /// the whole URL, along with that scheme.
    pub fn resolve_provider(&self, url: &str) -> Option<(&ProviderEntry, &SchemeMatcher)> {
        let registered = self.schemes.iter().find(|s| s.matcher.is_match(url))?;
        let provider = self.providers.get(&registered.provider)?;
        tracing::trace!(
            "{} matched scheme {} of provider {}",
            url,
            registered.matcher.scheme(),
            provider.name
        );
        Some((provider, &registered.matcher))
    }

    /// Get a provider by name.
    pub fn get(&self, provider: &str) -> Option<&ProviderEntry> {
        self.providers.get(provider)
    }

    /// Provider names in registration order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Build the query URL used to ask `provider` about `url`.
    ///
    /// Appends `url=<encoded url>` (with `?` or `&` depending on whether the
    /// endpoint already has a query string), then each extra parameter in the
    /// order supplied.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the provider is not registered.
    pub fn build_query_url<K: AsRef<str>, V: AsRef<str>>(
        &self,
        url: &str,
        provider: &str,
        extra_params: &[(K, V)],
    ) -> Result<String> {
        let entry = self.providers.get(provider).ok_or_else(|| {
            OEmbedError::configuration(format!("Unknown provider: {}", provider))
        })?;

        let mut query = entry.endpoint.clone();
        query.push(if query.contains('?') { '&' } else { '?' });
        query.push_str("url=");
        query.push_str(&encode(url));

        for (key, value) in extra_params {
            query.push('&');
            query.push_str(&encode(key.as_ref()));
            query.push('=');
            query.push_str(&encode(value.as_ref()));
        }

        Ok(query)
    }

    /// Remove every provider and scheme.
    pub fn clear(&mut self) {
        self.providers.clear();
        self.schemes.clear();
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry
            .register(
                "test1",
                "http://test1.net/oembed.{format}",
                "json",
                &["http://test1.net/*"],
            )
            .unwrap();
        registry
            .register(
                "test2",
                "http://test2.net/oembed?type={FORMAT}",
                "xml",
                &["http://test2.net/*", "http://*.test2.net/*"],
            )
            .unwrap();
        registry
    }

    #[test]
    fn register_requires_schemes() {
        let mut registry = ProviderRegistry::new();
        let empty: [&str; 0] = [];
        let result = registry.register("fake", "http://fake", "json", &empty);
        assert!(matches!(result, Err(OEmbedError::Configuration { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn register_requires_endpoint() {
        let mut registry = ProviderRegistry::new();
        let result = registry.register("fake", "", "json", &["http://fake/*"]);
        assert!(matches!(result, Err(OEmbedError::Configuration { .. })));
    }

    #[test]
    fn format_placeholder_is_replaced_case_insensitively() {
        let registry = registry();
        assert_eq!(
            registry.get("test1").unwrap().endpoint,
            "http://test1.net/oembed.json"
        );
        assert_eq!(
            registry.get("test2").unwrap().endpoint,
            "http://test2.net/oembed?type=xml"
        );
    }

    #[test]
    fn resolves_provider_by_scheme() {
        let registry = registry();
        let (provider, matcher) = registry.resolve_provider("http://a.test2.net/v").unwrap();
        assert_eq!(provider.name, "test2");
        assert_eq!(matcher.scheme(), "http://*.test2.net/*");
    }

    #[test]
    fn unmatched_url_resolves_to_none() {
        let registry = registry();
        assert!(registry
            .resolve_provider("http://not.a.valid.url.host/fake")
            .is_none());
    }

    #[test]
    fn earliest_registered_scheme_wins_across_providers() {
        let mut registry = ProviderRegistry::new();
        registry
            .register("broad", "http://broad/oembed", "json", &["http://*.com/*"])
            .unwrap();
        registry
            .register("narrow", "http://narrow/oembed", "json", &["http://vids.com/*"])
            .unwrap();

        let (provider, _) = registry.resolve_provider("http://vids.com/1").unwrap();
        assert_eq!(provider.name, "broad");
    }

    #[test]
    fn reregistration_overwrites_endpoint_and_appends_schemes() {
        let mut registry = registry();
        registry
            .register("test1", "http://new.net/oembed", "xml", &["http://new.net/*"])
            .unwrap();

        let entry = registry.get("test1").unwrap();
        assert_eq!(entry.endpoint, "http://new.net/oembed");
        assert_eq!(entry.format, "xml");
        assert_eq!(entry.schemes.len(), 2);
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.resolve_provider("http://test1.net/x").unwrap().0.name,
            "test1"
        );
    }

    #[test]
    fn query_url_uses_question_mark_without_query() {
        let registry = registry();
        let empty: [(&str, &str); 0] = [];
        let query = registry
            .build_query_url("http://test1.net/foo bar", "test1", &empty)
            .unwrap();
        assert_eq!(
            query,
            "http://test1.net/oembed.json?url=http%3A%2F%2Ftest1.net%2Ffoo+bar"
        );
    }

    #[test]
    fn query_url_uses_ampersand_with_existing_query() {
        let registry = registry();
        let query = registry
            .build_query_url(
                "http://test2.net/v",
                "test2",
                &[("maxwidth", "320"), ("maxheight", "200")],
            )
            .unwrap();
        assert_eq!(
            query,
            "http://test2.net/oembed?type=xml&url=http%3A%2F%2Ftest2.net%2Fv&maxwidth=320&maxheight=200"
        );
    }

    #[test]
    fn query_url_encodes_extra_params() {
        let registry = registry();
        let query = registry
            .build_query_url("http://test1.net/x", "test1", &[("a b", "c&d")])
            .unwrap();
        assert!(query.ends_with("&a+b=c%26d"));
    }

    #[test]
    fn query_url_for_unknown_provider_fails() {
        let registry = registry();
        let empty: [(&str, &str); 0] = [];
        assert!(registry.build_query_url("http://x", "nope", &empty).is_err());
    }

    #[test]
    fn clear_removes_everything() {
        let mut registry = registry();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.resolve_provider("http://test1.net/foo").is_none());
    }

    #[test]
    fn provider_names_keep_registration_order() {
        let registry = registry();
        assert_eq!(registry.provider_names(), vec!["test1", "test2"]);
    }
}
