//! Registered provider definitions.

use crate::scheme::SchemeMatcher;

/// A provider registered with the [`ProviderRegistry`](super::ProviderRegistry).
#[derive(Debug, Clone)]
pub struct ProviderEntry {
    /// Provider name, e.g. `vimeo`.
    pub name: String,
    /// Query endpoint with `{format}` already substituted.
    pub endpoint: String,
    /// Format tag used to pick a formatter (`json`, `xml`, ...).
    pub format: String,
    /// Compiled schemes in registration order.
    pub schemes: Vec<SchemeMatcher>,
}
