//! Provider registry.
//!
//! Stores, per provider, the query endpoint, the response format tag and the
//! ordered list of URL schemes it can embed.
//!
//! # Resolution Order
//!
//! Schemes are matched in the order they were registered, across all
//! providers. The first scheme that matches the whole URL decides the
//! provider.

pub mod provider;
pub mod resolver;

// Re-exports
pub use provider::ProviderEntry;
pub use resolver::ProviderRegistry;
