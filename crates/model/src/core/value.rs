use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format used whenever a timestamp has to be rendered as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A single dynamically typed cell as read from the source table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
    Null,
}

impl Value {
    /// Collapses binary payloads into text and leaves every other value untouched.
    ///
    /// Text columns, decimals and JSON all arrive from MySQL as raw bytes, so this
    /// is what turns them into something the destination can store as a string.
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn normalize(self) -> Value {
        match self {
            Value::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Value::String(text),
                Err(err) => Value::String(String::from_utf8_lossy(err.as_bytes()).into_owned()),
            },
            other => other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v as i128),
            Value::Uint(v) => Some(*v as i128),
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i128),
            Value::String(v) => v.trim().parse::<i128>().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Uint(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::String(v) => v.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Int(v) => Some(*v != 0),
            Value::Uint(v) => Some(*v != 0),
            Value::Float(v) => Some(*v != 0.0),
            Value::String(v) => match v.trim().to_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Textual rendering used when a value lands in a character column.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Int(v) => Some(v.to_string()),
            Value::Uint(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::String(v) => Some(v.clone()),
            Value::Timestamp(v) => Some(v.format(TIMESTAMP_FORMAT).to_string()),
            Value::Bytes(v) => Some(String::from_utf8_lossy(v).into_owned()),
            Value::Null => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Uint(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::String(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::Bytes(_) => "binary",
            Value::Null => "null",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Timestamp(v) => write!(f, "'{}'", v.format(TIMESTAMP_FORMAT)),
            Value::Bytes(v) => {
                write!(f, "0x")?;
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Null => write!(f, "NULL"),
        }
    }
}
