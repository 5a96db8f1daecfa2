//! Values flowing through ports and the declared port data types

use serde::{Deserialize, Serialize};

/// Declared data type of a port, as written in a node type's port template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDataType {
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "float32[]")]
    Float32Array,
    #[serde(rename = "uint32[]")]
    UInt32Array,
    #[serde(rename = "string")]
    Text,
}

impl PortDataType {
    /// Whether the type carries a whole array per frame rather than a scalar.
    /// Any array-typed port on a node type switches its compiled expression
    /// to the vectorized evaluation path.
    pub fn is_array(&self) -> bool {
        matches!(self, PortDataType::Float32Array | PortDataType::UInt32Array)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PortDataType::Float32 => "float32",
            PortDataType::Float32Array => "float32[]",
            PortDataType::UInt32Array => "uint32[]",
            PortDataType::Text => "string",
        }
    }
}

/// A value held on a port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    UIntArray(Vec<u32>),
    FloatArray(Vec<f32>),
    Float(f32),
    Text(String),
}

impl Value {
    /// Scalar view of the value, if it has one.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Number of elements when broadcast over an iteration; scalars count as 1.
    pub fn broadcast_len(&self) -> usize {
        match self {
            Value::Float(_) | Value::Text(_) => 1,
            Value::FloatArray(v) => v.len(),
            Value::UIntArray(v) => v.len(),
        }
    }

    /// Element at `index % len`, coerced to f32. Modulo wrap is what lets a
    /// length-1 input broadcast against a length-N input.
    pub fn element_wrapped(&self, index: usize) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            Value::FloatArray(v) if !v.is_empty() => Some(v[index % v.len()]),
            Value::UIntArray(v) if !v.is_empty() => Some(v[index % v.len()] as f32),
            _ => None,
        }
    }

    /// Parses text typed into an inline editor back into a value of the
    /// port's declared type. `None` means the text did not parse; the caller
    /// keeps the previous value.
    pub fn parse_typed(text: &str, data_type: PortDataType) -> Option<Value> {
        match data_type {
            PortDataType::Float32 | PortDataType::Float32Array => {
                text.trim().parse::<f32>().ok().map(Value::Float)
            }
            PortDataType::UInt32Array => text
                .trim()
                .parse::<u32>()
                .ok()
                .map(|v| Value::UIntArray(vec![v])),
            PortDataType::Text => Some(Value::Text(text.to_string())),
        }
    }

    /// Reshapes a value to the declared type of the port it lands on. Used
    /// when loading a document, where JSON cannot distinguish `[1, 2]` as
    /// float or uint.
    pub fn coerce_to(self, data_type: PortDataType) -> Value {
        match (self, data_type) {
            (Value::UIntArray(v), PortDataType::Float32Array) => {
                Value::FloatArray(v.into_iter().map(|x| x as f32).collect())
            }
            (Value::FloatArray(v), PortDataType::UInt32Array) => {
                Value::UIntArray(v.into_iter().map(|x| x as u32).collect())
            }
            (v, _) => v,
        }
    }

    /// Display form shown in editors and previews.
    pub fn display(&self) -> String {
        match self {
            Value::Float(v) => format!("{}", v),
            Value::Text(s) => s.clone(),
            Value::FloatArray(v) => format!("[{} floats]", v.len()),
            Value::UIntArray(v) => format!("[{} uints]", v.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typed_float() {
        assert_eq!(
            Value::parse_typed("3.5", PortDataType::Float32),
            Some(Value::Float(3.5))
        );
        assert_eq!(Value::parse_typed("abc", PortDataType::Float32), None);
    }

    #[test]
    fn test_element_wrapped_broadcast() {
        let v = Value::FloatArray(vec![1.0, 2.0, 3.0]);
        assert_eq!(v.element_wrapped(4), Some(2.0));
        let s = Value::Float(7.0);
        assert_eq!(s.element_wrapped(100), Some(7.0));
    }

    #[test]
    fn test_value_json_round_trip() {
        let v = Value::Float(5.0);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
