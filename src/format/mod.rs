//! Decoding provider responses into metadata.
//!
//! A [`Formatter`] turns a raw response body into a flat [`Metadata`]
//! mapping. Formatters are registered by the format tag providers are
//! configured with (`json`, `xml`, or any custom tag).

pub mod json;
pub mod xml;

pub use json::JsonFormatter;
pub use xml::XmlFormatter;

use serde_json::{Number, Value};

/// Decoded oEmbed data, keyed by attribute name (`type`, `html`, `url`, ...).
pub type Metadata = serde_json::Map<String, Value>;

/// Decodes a raw provider body.
pub trait Formatter: Send + Sync {
    /// Format tag this formatter handles.
    fn name(&self) -> &str;

    /// Decode `body` into metadata.
    fn format(&self, body: &str) -> anyhow::Result<Metadata>;
}

/// Convert a text leaf into a JSON scalar.
///
/// All-digit text becomes an integer and `digits.digits` becomes a float;
/// anything else (including integers too large for `i64`) stays a string.
pub fn coerce_scalar(text: &str) -> Value {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if all_digits(text) {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Number(n.into());
        }
    } else if let Some((whole, frac)) = text.split_once('.') {
        if all_digits(whole) && all_digits(frac) {
            if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
                return Value::Number(n);
            }
        }
    }

    Value::String(text.to_string())
}

/// Render a metadata value as display text.
///
/// Strings are used verbatim, `null` is empty, and other values use their
/// JSON representation.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
