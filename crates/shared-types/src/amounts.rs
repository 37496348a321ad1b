//! # Hex Amounts
//!
//! Serde helpers for `U256` amounts in the `{"_hex": "0x.."}` object form.
//!
//! Deserialization also accepts a bare hex string, a decimal string or a JSON
//! number, because channel state blobs arrive from callers in all three forms.

use crate::errors::TypeError;
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

#[derive(Serialize)]
struct HexObject<'a> {
    #[serde(rename = "_hex")]
    hex: &'a str,
}

/// Lowercase `0x`-prefixed hex without leading zeros (`0x0` for zero).
pub fn amount_to_hex(amount: &U256) -> String {
    format!("{:#x}", amount)
}

/// Amount as a JSON `{"_hex": "0x.."}` object.
pub fn amount_to_json(amount: &U256) -> Value {
    json!({ "_hex": amount_to_hex(amount) })
}

/// Parse an amount from any accepted JSON form.
pub fn amount_from_json(value: &Value) -> Result<U256, TypeError> {
    match value {
        Value::Object(map) => match map.get("_hex") {
            Some(Value::String(s)) => parse_amount(s),
            _ => Err(TypeError::InvalidAmount(value.to_string())),
        },
        Value::String(s) => parse_amount(s),
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| TypeError::InvalidAmount(n.to_string())),
        other => Err(TypeError::InvalidAmount(other.to_string())),
    }
}

/// Parse `0x`-prefixed hex or a decimal string.
pub fn parse_amount(s: &str) -> Result<U256, TypeError> {
    let trimmed = s.trim();
    if let Some(body) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if body.is_empty() {
            return Ok(U256::zero());
        }
        U256::from_str_radix(body, 16).map_err(|_| TypeError::InvalidAmount(s.to_string()))
    } else {
        U256::from_dec_str(trimmed).map_err(|_| TypeError::InvalidAmount(s.to_string()))
    }
}

/// `#[serde(with = "shared_types::hex_amount")]` for `U256` fields.
pub mod hex_amount {
    use super::*;

    /// Serialize as `{"_hex": "0x.."}`.
    pub fn serialize<S: Serializer>(amount: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        HexObject {
            hex: &amount_to_hex(amount),
        }
        .serialize(serializer)
    }

    /// Deserialize from any accepted form.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let value = Value::deserialize(deserializer)?;
        amount_from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "shared_types::hex_amount_vec")]` for `Vec<U256>` fields.
pub mod hex_amount_vec {
    use super::*;

    /// Serialize each element as `{"_hex": "0x.."}`.
    pub fn serialize<S: Serializer>(amounts: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
        let values: Vec<Value> = amounts.iter().map(amount_to_json).collect();
        values.serialize(serializer)
    }

    /// Deserialize each element from any accepted form.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<U256>, D::Error> {
        let values = Vec::<Value>::deserialize(deserializer)?;
        values
            .iter()
            .map(amount_from_json)
            .collect::<Result<_, _>>()
            .map_err(serde::de::Error::custom)
    }
}
