//! Mutation acknowledgements.
//!
//! Services disagree on how they report a mutation outcome (`ok` vs
//! `success`, `message` vs `error`, camelCase vs snake_case field names, or a
//! bare scalar such as a transaction hash). Everything is folded into one
//! [`Ack`] here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
    pub message: String,
}

impl Default for Ack {
    fn default() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[must_use]
pub fn normalize_ack(raw: &Value, context: &str) -> Ack {
    let Value::Object(fields) = raw else {
        return Ack {
            ok: true,
            message: format!("{context}: backend returned non-object ack"),
        };
    };

    let ok_field = fields.get("ok");
    let success_field = fields.get("success");
    let ok = ok_field
        .and_then(Value::as_bool)
        .or_else(|| success_field.and_then(Value::as_bool))
        .or_else(|| ok_field.map(truthy))
        .or_else(|| success_field.map(truthy))
        .unwrap_or(true);

    let message = fields
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| fields.get("error").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    Ack { ok, message }
}

/// Find the ack under the first alias present in `data`.
///
/// A response with none of the aliases counts as success. That keeps older
/// service versions working, but it can hide a failed mutation whose response
/// shape we did not anticipate, so it is logged.
#[must_use]
pub fn extract_ack_from_response(data: &Value, aliases: &[&str], context: &str) -> Ack {
    match aliases.iter().find_map(|alias| data.get(*alias)) {
        Some(raw) => normalize_ack(raw, context),
        None => {
            warn!(context, ?aliases, "no acknowledgement field in response, assuming success");
            Ack::default()
        }
    }
}
