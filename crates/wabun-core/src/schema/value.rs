//! Index-native metadata values.
//!
//! The vector index stores flat scalar metadata only. Typed schemas in the
//! sibling modules encode into [`MetadataMap`] at the index boundary and
//! decode back out of it; nothing above the boundary handles raw maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat metadata as stored by the vector index.
pub type MetadataMap = BTreeMap<String, MetadataValue>;

/// A single scalar metadata value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer (timestamps, importance, sequence positions).
    Int(i64),
    /// Floating point (versions).
    Float(f64),
    /// Text, including JSON-encoded lists.
    Text(String),
}

impl MetadataValue {
    /// Text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric content as `f64`, for integers and floats.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Whether this value is an integer or a float.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Equality that treats `Int(3)` and `Float(3.0)` as equal.
    pub fn loosely_eq(&self, other: &Self) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => self == other,
        }
    }

    /// Convert a JSON scalar. Arrays, objects and null have no metadata form.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for MetadataValue {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for MetadataValue {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u8> for MetadataValue {
    fn from(n: u8) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u32> for MetadataValue {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for MetadataValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_serde_keeps_scalar_shapes() {
        let mut map = MetadataMap::new();
        let _ = map.insert("importance".into(), MetadataValue::Int(4));
        let _ = map.insert("version".into(), MetadataValue::Float(1.5));
        let _ = map.insert("role".into(), MetadataValue::from("Requester"));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"importance":4,"role":"Requester","version":1.5}"#);
        let back: MetadataMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn loose_numeric_equality() {
        assert!(MetadataValue::Int(3).loosely_eq(&MetadataValue::Float(3.0)));
        assert!(!MetadataValue::Int(3).loosely_eq(&MetadataValue::Int(4)));
        assert!(!MetadataValue::from("3").loosely_eq(&MetadataValue::Int(3)));
    }

    #[test]
    fn from_json_scalars_only() {
        assert_eq!(
            MetadataValue::from_json(&serde_json::json!(5)),
            Some(MetadataValue::Int(5))
        );
        assert_eq!(
            MetadataValue::from_json(&serde_json::json!(1.25)),
            Some(MetadataValue::Float(1.25))
        );
        assert_eq!(MetadataValue::from_json(&serde_json::json!(null)), None);
        assert_eq!(MetadataValue::from_json(&serde_json::json!([1])), None);
    }
}
