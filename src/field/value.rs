use std::fmt;

use chrono::NaiveDateTime;

use super::text::{format_float, printable_bytes};

/// A decoded field value.
///
/// Leaves decode to a scalar, strings or bytes; composites reduce their children to a single
/// scalar; vectors decode to a [`Value::List`]. Plain field sets without a value of their own
/// report [`Value::None`], and any field whose decoding failed reports [`Value::Invalid`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The field has no value of its own
    None,
    /// Decoding failed; the reason was reported to the diagnostics sink
    Invalid,
    /// A single bit
    Bool(bool),
    /// An unsigned integer
    UInt(u64),
    /// A signed integer
    Int(i64),
    /// A floating point number, usually from a fixed-point composite
    Float(f64),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Decoded text
    Text(String),
    /// A calendar timestamp
    DateTime(NaiveDateTime),
    /// The values of a vector's items, in order
    List(Vec<Value>),
}

impl Value {
    /// The value as an unsigned integer, for non-negative integers and bits
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            Value::Bool(v) => Some(u64::from(*v)),
            _ => None,
        }
    }

    /// The value as a signed integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// The value as a float, for any numeric value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::UInt(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::UInt(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// The value as text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The value as raw bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// The value as a timestamp
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// The items of a list value
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true for the decode failure sentinel
    pub fn is_invalid(&self) -> bool {
        matches!(self, Value::Invalid)
    }

    /// Returns true if the field carries a usable value
    pub fn has_value(&self) -> bool {
        !matches!(self, Value::None | Value::Invalid)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Invalid => write!(f, "(invalid)"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Bytes(v) => write!(f, "{}", printable_bytes(v, usize::MAX)),
            Value::Text(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Value::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(Value::UInt(7).as_u64(), Some(7));
        assert_eq!(Value::Int(-1).as_u64(), None);
        assert_eq!(Value::Int(-1).as_i64(), Some(-1));
        assert_eq!(Value::Bool(true).as_u64(), Some(1));
        assert_eq!(Value::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::Text("abc".into()).as_str(), Some("abc"));
        assert!(Value::Invalid.is_invalid());
        assert!(!Value::None.has_value());
        assert!(Value::UInt(0).has_value());
    }

    #[test]
    fn display() {
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(
            Value::List(vec![Value::UInt(1), Value::UInt(2)]).to_string(),
            "[1, 2]"
        );
        assert_eq!(Value::Bytes(vec![b'a', 0]).to_string(), "\"a\\0\"");
    }
}
