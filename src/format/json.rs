//! JSON provider responses.

use anyhow::{bail, Context, Result};
use serde_json::Value;

use super::{Formatter, Metadata};

/// Decodes `json` provider responses.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format tag this formatter registers under.
    pub const NAME: &'static str = "json";
}

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn format(&self, body: &str) -> Result<Metadata> {
        match serde_json::from_str(body).context("Invalid JSON")? {
            Value::Object(map) => Ok(map),
            other => bail!("Expected a JSON object, got {}", kind(&other)),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
