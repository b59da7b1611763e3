//! Configuration schema definitions.
//!
//! These structs map to the YAML provider configuration:
//!
//! ```yaml
//! config:
//!   method: http
//! providers:
//!   vimeo: "http://vimeo.com/api/oembed.{format}"
//! vimeo:
//!   format: json
//!   schemes:
//!     - "http://vimeo.com/*"
//! templates:
//!   root: app/views/oembed
//!   processor: haml
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::template::TemplateProcessor;

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Global settings
    #[serde(default)]
    pub config: GlobalConfig,

    /// Provider name to query endpoint template, in registration order
    #[serde(default)]
    pub providers: IndexMap<String, String>,

    /// Template settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<TemplateConfig>,

    /// Per-provider sections, keyed by provider name at the top level
    #[serde(flatten)]
    pub provider_config: IndexMap<String, ProviderSection>,
}

/// Global settings (`config:` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Name of the fetcher used to retrieve provider responses
    pub method: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
        }
    }
}

fn default_method() -> String {
    "http".to_string()
}

/// A provider's format and URL schemes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSection {
    /// Response format tag
    #[serde(default = "default_format")]
    pub format: String,

    /// Glob patterns for URLs this provider embeds
    #[serde(default)]
    pub schemes: Schemes,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            format: default_format(),
            schemes: Schemes::default(),
        }
    }
}

fn default_format() -> String {
    "json".to_string()
}

/// One scheme or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schemes {
    One(String),
    Many(Vec<String>),
}

impl Default for Schemes {
    fn default() -> Self {
        Schemes::Many(Vec::new())
    }
}

impl Schemes {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Schemes::One(s) => vec![s.clone()],
            Schemes::Many(v) => v.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Schemes::One(s) => s.is_empty(),
            Schemes::Many(v) => v.is_empty(),
        }
    }
}

impl From<Vec<String>> for Schemes {
    fn from(schemes: Vec<String>) -> Self {
        Schemes::Many(schemes)
    }
}

/// Template settings (`templates:` section).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory template references are resolved against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Processor forced for every template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<TemplateProcessor>,

    /// Extension fallback list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIMEO: &str = r#"
config:
  method: http
providers:
  vimeo: "http://vimeo.com/api/oembed.{format}"
  hulu: "http://www.hulu.com/api/oembed.{format}"
vimeo:
  format: json
  schemes:
    - "http://vimeo.com/*"
hulu:
  format: xml
  schemes: "http://www.hulu.com/watch/*"
"#;

    #[test]
    fn parses_three_sections() {
        let config: ProvidersConfig = serde_yaml::from_str(VIMEO).unwrap();
        assert_eq!(config.config.method, "http");
        assert_eq!(
            config.providers.keys().collect::<Vec<_>>(),
            vec!["vimeo", "hulu"]
        );
        assert_eq!(config.provider_config["vimeo"].format, "json");
        assert_eq!(
            config.provider_config["vimeo"].schemes.to_vec(),
            vec!["http://vimeo.com/*"]
        );
    }

    #[test]
    fn single_scheme_string_is_accepted() {
        let config: ProvidersConfig = serde_yaml::from_str(VIMEO).unwrap();
        assert_eq!(
            config.provider_config["hulu"].schemes,
            Schemes::One("http://www.hulu.com/watch/*".to_string())
        );
    }

    #[test]
    fn defaults_apply() {
        let yaml = "providers:\n  p: \"http://p/oembed\"\np:\n  schemes: [\"http://p/*\"]\n";
        let config: ProvidersConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.config, GlobalConfig::default());
        assert_eq!(config.provider_config["p"].format, "json");
        assert!(config.templates.is_none());
    }

    #[test]
    fn template_section() {
        let yaml = "templates:\n  root: /srv/t\n  processor: haml\n";
        let config: ProvidersConfig = serde_yaml::from_str(yaml).unwrap();
        let templates = config.templates.unwrap();
        assert_eq!(templates.root, Some(PathBuf::from("/srv/t")));
        assert_eq!(templates.processor, Some(TemplateProcessor::Haml));
    }

    #[test]
    fn unknown_processor_fails() {
        let yaml = "templates:\n  processor: liquid\n";
        assert!(serde_yaml::from_str::<ProvidersConfig>(yaml).is_err());
    }
}
