//! Fetching raw provider responses.
//!
//! A [`Fetcher`] performs a single blocking GET against a provider's query
//! URL and returns the body. Fetchers are registered by name; the global
//! `method` configuration picks one, falling back to the first registered.

pub mod http;

pub use http::HttpFetcher;

/// Retrieves the raw body behind a provider query URL.
///
/// No timeout or retry contract is defined here; any error aborts the
/// transform that triggered the fetch. Wrap a fetcher to add either.
pub trait Fetcher: Send + Sync {
    /// Name used by the `method` configuration key.
    fn name(&self) -> &str;

    /// Fetch the body at `url`.
    fn fetch(&self, url: &str) -> anyhow::Result<String>;
}
