use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Dynamic value carried between nodes and stored in provenance records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Arrays, native or JSON, fan out when a record is forked.
    pub fn is_iterable(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Json(serde_json::Value::Array(_)))
    }

    /// Elements of an iterable value; JSON elements stay `Value::Json`.
    /// Empty for anything else.
    pub fn elements(&self) -> Vec<Value> {
        match self {
            Value::Array(items) => items.clone(),
            Value::Json(serde_json::Value::Array(items)) => items.iter().cloned().map(Value::Json).collect(),
            _ => Vec::new(),
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Json(j) => write!(f, "{}", j),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(map) => {
                // Sorted so the rendering is stable across runs.
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                f.write_str("{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", key, map[key])?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_drops_fraction_for_integral_numbers() {
        assert_eq!(Value::from(11).to_string(), "11");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
    }

    #[test]
    fn display_nests_arrays_and_quotes_strings() {
        let v = Value::Array(vec![Value::from("x"), Value::Array(vec![Value::from(1), Value::Null])]);
        assert_eq!(v.to_string(), r#"["x", [1, null]]"#);
    }

    #[test]
    fn arrays_and_json_arrays_are_iterable() {
        assert!(Value::Array(vec![]).is_iterable());
        assert!(Value::Json(serde_json::json!([1, 2])).is_iterable());
        assert!(!Value::Json(serde_json::json!({"a": [1]})).is_iterable());
        assert!(!Value::from("abc").is_iterable());
        assert!(!Value::Object(HashMap::new()).is_iterable());
    }

    #[test]
    fn json_array_elements_stay_json() {
        let v = Value::Json(serde_json::json!([1, "x"]));
        assert_eq!(v.elements(), vec![Value::Json(serde_json::json!(1)), Value::Json(serde_json::json!("x"))]);
        assert!(Value::from(3).elements().is_empty());
    }
}
