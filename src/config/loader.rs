//! Configuration file loading.
//!
//! Some documents key every entry with a symbol-style name
//! (`:config:`, `:method:`); leading colons are stripped from mapping keys
//! before the document is deserialized.

use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::config::schema::ProvidersConfig;
use crate::error::{OEmbedError, Result};

/// Load and validate a provider configuration file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParse` if the YAML is invalid.
/// Returns `Configuration` if a provider has no schemes.
pub fn load_config_file(path: &Path) -> Result<ProvidersConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OEmbedError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            OEmbedError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse and validate YAML content.
///
/// `source_path` is only used for error reporting.
pub fn parse_config(content: &str, source_path: &Path) -> Result<ProvidersConfig> {
    let parse_error = |e: serde_yaml::Error| OEmbedError::ConfigParse {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    };

    let value: Value = serde_yaml::from_str(content).map_err(parse_error)?;
    let value = match strip_symbol_keys(value) {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    };
    let config: ProvidersConfig = serde_yaml::from_value(value).map_err(parse_error)?;

    validate(&config)?;
    Ok(config)
}

impl ProvidersConfig {
    /// Parse a configuration document held in memory.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        parse_config(content, Path::new("<string>"))
    }
}

/// Check that every listed provider has a section with at least one scheme.
pub fn validate(config: &ProvidersConfig) -> Result<()> {
    for name in config.providers.keys() {
        let has_schemes = config
            .provider_config
            .get(name)
            .is_some_and(|section| !section.schemes.is_empty());
        if !has_schemes {
            return Err(OEmbedError::configuration(format!(
                "No schemes were provided for {}",
                name
            )));
        }
    }
    Ok(())
}

fn strip_symbol_keys(value: Value) -> Value {
    match value {
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .into_iter()
                .map(|(key, value)| {
                    let key = match key {
                        Value::String(s) => match s.strip_prefix(':') {
                            Some(stripped) => Value::String(stripped.to_string()),
                            None => Value::String(s),
                        },
                        other => other,
                    };
                    (key, strip_symbol_keys(value))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(strip_symbol_keys).collect()),
        other => other,
    }
}
