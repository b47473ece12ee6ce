//! Response reconciliation
//!
//! Every operation answers with a `ResultEnvelope`. This module turns decoded
//! property values, batched-read results and errors into envelope payloads,
//! and coerces caller-supplied JSON into a value for a write.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

use crate::error::{GatewayError, GatewayResult};

use super::schema::PropertyType;
use super::stack::ReadAccessResult;
use super::types::PropertyValue;

/// Uniform response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    pub message: String,
    /// Always present on the wire, `null` when there is no payload
    pub data: Option<Value>,
}

impl ResultEnvelope {
    pub fn success(message: impl Into<String>, data: impl Into<Option<Value>>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: data.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Failed envelope carrying whatever request context is available
    pub fn failure_with(message: impl Into<String>, data: impl Into<Option<Value>>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: data.into(),
        }
    }
}

impl From<&GatewayError> for ResultEnvelope {
    fn from(error: &GatewayError) -> Self {
        Self::failure(error.user_message())
    }
}

/// Replace non-finite floats with their textual markers
pub fn normalize_float(value: f64) -> Value {
    if value.is_nan() {
        Value::String("NaN".to_string())
    } else if value.is_infinite() {
        Value::String(if value > 0.0 { "Inf" } else { "-Inf" }.to_string())
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Encode a decoded value as JSON
pub fn encode_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Null => Value::Null,
        PropertyValue::Boolean(b) => Value::Bool(*b),
        PropertyValue::Unsigned(n) => json!(n),
        PropertyValue::Signed(n) => json!(n),
        // shortest decimal form of the single-precision value, not its f64 widening
        PropertyValue::Real(r) => match r.to_string().parse::<f64>() {
            Ok(widened) if r.is_finite() => normalize_float(widened),
            _ => normalize_float(f64::from(*r)),
        },
        PropertyValue::Double(d) => normalize_float(*d),
        PropertyValue::OctetString(bytes) => {
            Value::String(bytes.iter().map(|b| format!("{:02x}", b)).collect())
        }
        PropertyValue::CharacterString(s) => Value::String(s.clone()),
        PropertyValue::BitString(bits) => Value::Array(bits.iter().map(|bit| json!(u8::from(*bit))).collect()),
        PropertyValue::Enumerated(n) => json!(n),
        PropertyValue::Date(date) => Value::String(date.format("%Y-%m-%d").to_string()),
        PropertyValue::Time(time) => Value::String(time.format("%H:%M:%S%.f").to_string()),
        PropertyValue::ObjectIdentifier(object) => Value::String(object.to_string()),
        PropertyValue::Array(items) | PropertyValue::List(items) => {
            Value::Array(items.iter().map(encode_value).collect())
        }
        PropertyValue::Sequence(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, field)| (name.clone(), encode_value(field)))
                .collect::<Map<_, _>>(),
        ),
    }
}

/// Encode one batched-read result, embedding a per-item error in place
pub fn encode_item(item: &ReadAccessResult) -> Value {
    let mut entry = Map::new();
    entry.insert("object".to_string(), Value::String(item.object.to_string()));
    entry.insert("property".to_string(), Value::String(item.property.to_string()));
    match &item.result {
        Ok(value) => entry.insert("value".to_string(), encode_value(value)),
        Err(error) => entry.insert("error".to_string(), Value::String(error.to_string())),
    };
    Value::Object(entry)
}

/// Encode a batched read, preserving request order
pub fn encode_batch(items: &[ReadAccessResult]) -> Value {
    Value::Array(items.iter().map(encode_item).collect())
}

/// Turn a caller-supplied JSON value into a value to write
///
/// The string `"null"` (or a JSON null) releases the command at `priority`
/// and is refused without one. Other values are coerced to the declared type
/// of the property, or inferred from the JSON when no type is declared.
pub fn coerce_write_value(
    value: &Value,
    declared: Option<PropertyType>,
    priority: Option<u8>,
) -> GatewayResult<PropertyValue> {
    if value.is_null() || value.as_str() == Some("null") {
        return match priority {
            Some(_) => Ok(PropertyValue::Null),
            None => Err(GatewayError::PriorityRequiredForRelease),
        };
    }

    let declared = match declared {
        None | Some(PropertyType::Any) => return infer(value),
        Some(declared) => declared,
    };

    let coerced = match declared {
        PropertyType::Real => as_f64(value).map(|f| PropertyValue::Real(f as f32)),
        PropertyType::Double => as_f64(value).map(PropertyValue::Double),
        PropertyType::Unsigned => as_u64(value).map(PropertyValue::Unsigned),
        PropertyType::Signed => as_i64(value).map(PropertyValue::Signed),
        PropertyType::Boolean => as_bool(value).map(PropertyValue::Boolean),
        PropertyType::Enumerated => as_enumerated(value).map(PropertyValue::Enumerated),
        PropertyType::CharacterString => match value {
            Value::String(s) => Some(PropertyValue::CharacterString(s.clone())),
            Value::Number(n) => Some(PropertyValue::CharacterString(n.to_string())),
            Value::Bool(b) => Some(PropertyValue::CharacterString(b.to_string())),
            _ => None,
        },
        other => {
            return Err(GatewayError::Validation(format!(
                "writing {:?} values is not supported",
                other
            )));
        }
    };

    coerced.ok_or_else(|| GatewayError::Validation(format!("value {} cannot be written as {:?}", value, declared)))
}

fn infer(value: &Value) -> GatewayResult<PropertyValue> {
    match value {
        Value::Bool(b) => Ok(PropertyValue::Boolean(*b)),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(PropertyValue::Unsigned(u))
            } else if let Some(i) = n.as_i64() {
                Ok(PropertyValue::Signed(i))
            } else {
                Ok(PropertyValue::Real(n.as_f64().unwrap_or_default() as f32))
            }
        }
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(PropertyValue::Real(f as f32)),
            _ => Ok(PropertyValue::CharacterString(s.clone())),
        },
        other => Err(GatewayError::Validation(format!("value {} cannot be written", other))),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(_) => as_u64(value).filter(|n| *n <= 1).map(|n| n == 1),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "active" | "on" => Some(true),
            "false" | "0" | "inactive" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_enumerated(value: &Value) -> Option<u32> {
    match value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "inactive" | "off" => Some(0),
            "active" | "on" => Some(1),
            other => other.parse().ok(),
        },
        _ => as_u64(value).and_then(|n| u32::try_from(n).ok()),
    }
}
