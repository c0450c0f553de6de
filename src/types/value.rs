use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::types::error::DatabaseError;

const TAG_NULL: u8 = 0;
const TAG_INTEGER: u8 = 1;
const TAG_REAL: u8 = 2;
const TAG_TEXT: u8 = 3;
const TAG_BLOB: u8 = 4;

/// Declared column type. NULL is a value, never a declared type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum DataType {
    Integer,
    Real,
    Text,
    Blob,
    /// Numeric affinity: numeric-looking text becomes a number, anything
    /// else is stored as given.
    Numeric,
    /// No declared type; every value is stored as given.
    Any,
}

impl DataType {
    /// Resolve a declared SQL type name using SQLite's affinity rules.
    pub fn from_declared(type_name: &str) -> Self {
        let upper = type_name.to_ascii_uppercase();
        if upper.contains("INT") {
            DataType::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            DataType::Text
        } else if upper.is_empty() {
            DataType::Any
        } else if upper.contains("BLOB") {
            DataType::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            DataType::Real
        } else {
            DataType::Numeric
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "INTEGER",
            DataType::Real => "REAL",
            DataType::Text => "TEXT",
            DataType::Blob => "BLOB",
            DataType::Numeric => "NUMERIC",
            DataType::Any => "ANY",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(DataType::Integer),
            Value::Real(_) => Some(DataType::Real),
            Value::Text(_) => Some(DataType::Text),
            Value::Blob(_) => Some(DataType::Blob),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Conform a value to a declared column type. Integers widen into real
    /// columns, numeric columns parse numeric text, untyped columns take
    /// anything. Every other cross-type value is rejected.
    pub fn coerce_to(self, data_type: DataType) -> Result<Value, Value> {
        match (self, data_type) {
            (Value::Null, _) => Ok(Value::Null),
            (value, DataType::Any) => Ok(value),
            (Value::Text(text), DataType::Numeric) => Ok(Self::parse_numeric(text)),
            (value, DataType::Numeric) => Ok(value),
            (Value::Integer(i), DataType::Real) => Ok(Value::Real(i as f64)),
            (value, target) if value.data_type() == Some(target) => Ok(value),
            (value, _) => Err(value),
        }
    }

    fn parse_numeric(text: String) -> Value {
        let trimmed = text.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        match trimmed.parse::<f64>() {
            Ok(r) if r.is_finite() => Value::Real(r),
            _ => Value::Text(text),
        }
    }

    /// SQL equality: NULL never matches, numbers compare across
    /// integer/real.
    pub fn sql_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => false,
            _ => self.partial_cmp(other) == Some(Ordering::Equal),
        }
    }

    /// The row id this value names, if it is an exact integer.
    pub fn as_row_id(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(r) if r.fract() == 0.0 && *r >= i64::MIN as f64 && *r < i64::MAX as f64 => {
                Some(*r as i64)
            }
            _ => None,
        }
    }

    pub fn serialized_size(&self) -> usize {
        match self {
            Value::Null => 1,
            Value::Integer(_) | Value::Real(_) => 1 + 8,
            Value::Text(s) => 1 + 4 + s.len(),
            Value::Blob(b) => 1 + 4 + b.len(),
        }
    }

    pub fn write_to(&self, buffer: &mut Vec<u8>) {
        match self {
            Value::Null => buffer.push(TAG_NULL),
            Value::Integer(i) => {
                buffer.push(TAG_INTEGER);
                buffer.extend_from_slice(&i.to_le_bytes());
            }
            Value::Real(r) => {
                buffer.push(TAG_REAL);
                buffer.extend_from_slice(&r.to_le_bytes());
            }
            Value::Text(s) => {
                buffer.push(TAG_TEXT);
                buffer.extend_from_slice(&(s.len() as u32).to_le_bytes());
                buffer.extend_from_slice(s.as_bytes());
            }
            Value::Blob(b) => {
                buffer.push(TAG_BLOB);
                buffer.extend_from_slice(&(b.len() as u32).to_le_bytes());
                buffer.extend_from_slice(b);
            }
        }
    }

    /// Decode one value from the front of `bytes`, returning it with the
    /// number of bytes consumed.
    pub fn read_from(bytes: &[u8]) -> Result<(Value, usize), DatabaseError> {
        let Some(&tag) = bytes.first() else {
            return Err(DatabaseError::corruption("empty value bytes"));
        };
        let body = &bytes[1..];
        match tag {
            TAG_NULL => Ok((Value::Null, 1)),
            TAG_INTEGER => {
                let raw = fixed_8(body, "integer")?;
                Ok((Value::Integer(i64::from_le_bytes(raw)), 9))
            }
            TAG_REAL => {
                let raw = fixed_8(body, "real")?;
                Ok((Value::Real(f64::from_le_bytes(raw)), 9))
            }
            TAG_TEXT => {
                let data = length_prefixed(body, "text")?;
                let text = String::from_utf8(data.to_vec())
                    .map_err(|_| DatabaseError::corruption("invalid UTF-8 in text value"))?;
                Ok((Value::Text(text), 5 + data.len()))
            }
            TAG_BLOB => {
                let data = length_prefixed(body, "blob")?;
                Ok((Value::Blob(data.to_vec()), 5 + data.len()))
            }
            other => Err(DatabaseError::corruption(format!(
                "unknown value type tag {}",
                other
            ))),
        }
    }
}

fn fixed_8(bytes: &[u8], what: &str) -> Result<[u8; 8], DatabaseError> {
    if bytes.len() < 8 {
        return Err(DatabaseError::corruption(format!("truncated {} value", what)));
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    Ok(raw)
}

fn length_prefixed<'a>(bytes: &'a [u8], what: &str) -> Result<&'a [u8], DatabaseError> {
    if bytes.len() < 4 {
        return Err(DatabaseError::corruption(format!("truncated {} length", what)));
    }
    let length = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    bytes
        .get(4..4 + length)
        .ok_or_else(|| DatabaseError::corruption(format!("truncated {} data", what)))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => write!(f, "X'{}'", hex::encode_upper(b)),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Real(b)) => (*a as f64).partial_cmp(b),
            (Value::Real(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.partial_cmp(b),
            _ => None, // Mixed types
        }
    }
}
