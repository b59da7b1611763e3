//! Declarative provider configuration.
//!
//! - Schema definitions in [`schema`]
//! - File loading and validation in [`loader`]
//!
//! # Example
//!
//! ```
//! use oembed_links::config::ProvidersConfig;
//!
//! let config = ProvidersConfig::from_yaml_str(
//!     r#"
//! providers:
//!   vimeo: "http://vimeo.com/api/oembed.{format}"
//! vimeo:
//!   format: json
//!   schemes: ["http://vimeo.com/*"]
//! "#,
//! )
//! .unwrap();
//! assert_eq!(config.config.method, "http");
//! assert_eq!(config.provider_config["vimeo"].format, "json");
//! ```

pub mod loader;
pub mod schema;

pub use loader::{load_config_file, parse_config, validate};
pub use schema::{GlobalConfig, ProviderSection, ProvidersConfig, Schemes, TemplateConfig};
