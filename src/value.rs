//! Value types - what flows in and out of a pair table
//!
//! - `Scalar`: a hashable SQLite scalar (integer, text, blob). Keys are always
//!   scalars, and so is every stored value column.
//! - `Value`: a decoded value, either a scalar or a structured JSON document.

use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde_json::Value as JsonValue;
use std::fmt;

/// A single SQLite scalar.
///
/// `REAL` columns are read back as their text rendering so that every scalar
/// stays `Eq + Hash` and can key the lookup cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Integer(i64),
    Text(String),
    Blob(Vec<u8>),
}

impl Scalar {
    /// Infer a scalar from command-line style input: integers stay integers,
    /// everything else is text.
    pub fn infer(input: &str) -> Self {
        input
            .parse::<i64>()
            .map(Scalar::Integer)
            .unwrap_or_else(|_| Scalar::Text(input.to_string()))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of the scalar as SQLite would hand them to a decoder.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Scalar::Integer(i) => i.to_string().into_bytes(),
            Scalar::Text(s) => s.as_bytes().to_vec(),
            Scalar::Blob(b) => b.clone(),
        }
    }

    /// Identity of the scalar as a table column sees it: text holding a
    /// canonical base-10 integer (`"42"`, not `"042"` or `" 42"`) is the
    /// same entry as that integer under SQLite type affinity.
    pub fn cache_key(&self) -> Scalar {
        match self {
            Scalar::Text(s) => match s.parse::<i64>() {
                Ok(i) if i.to_string() == *s => Scalar::Integer(i),
                _ => self.clone(),
            },
            other => other.clone(),
        }
    }

    /// Numeric reading of the scalar; text must hold a base-10 integer.
    pub fn to_integer(&self) -> Result<i64> {
        match self {
            Scalar::Integer(i) => Ok(*i),
            Scalar::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::Codec(format!("not an integer: {:?}", s))),
            Scalar::Blob(b) => std::str::from_utf8(b)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| Error::Codec(format!("not an integer: blob of {} bytes", b.len()))),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Blob(b) => {
                f.write_str("x'")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                f.write_str("'")
            }
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(value.into())
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Integer(value.into())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<&String> for Scalar {
    fn from(value: &String) -> Self {
        Scalar::Text(value.clone())
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(value: Vec<u8>) -> Self {
        Scalar::Blob(value)
    }
}

impl From<&[u8]> for Scalar {
    fn from(value: &[u8]) -> Self {
        Scalar::Blob(value.to_vec())
    }
}

impl ToSql for Scalar {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Scalar::Integer(i) => ToSqlOutput::from(*i),
            Scalar::Text(s) => ToSqlOutput::from(s.as_str()),
            Scalar::Blob(b) => ToSqlOutput::from(b.as_slice()),
        })
    }
}

impl FromSql for Scalar {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(Scalar::Integer(i)),
            ValueRef::Real(f) => Ok(Scalar::Text(f.to_string())),
            ValueRef::Text(t) => std::str::from_utf8(t)
                .map(|s| Scalar::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Blob(b) => Ok(Scalar::Blob(b.to_vec())),
            ValueRef::Null => Err(FromSqlError::InvalidType),
        }
    }
}

/// A decoded value as returned by `get_value` and accepted by `set_key_value`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Json(JsonValue),
}

impl Value {
    /// The scalar form, if this is not a structured document.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Value::Json(j) => Some(j),
            Value::Scalar(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(Scalar::as_i64)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{}", s),
            Value::Json(j) => write!(f, "{}", j),
        }
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        Value::Json(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Scalar(value.into())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Scalar(value.into())
    }
}

/// How `get_key` reports the key it found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyFormat {
    /// Convert the key to `Scalar::Integer`
    #[default]
    Integer,
    /// Return the key exactly as stored
    Raw,
}

impl KeyFormat {
    pub fn apply(&self, key: Scalar) -> Result<Scalar> {
        match self {
            KeyFormat::Integer => key.to_integer().map(Scalar::Integer),
            KeyFormat::Raw => Ok(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_merges_integer_text() {
        assert_eq!(Scalar::from("1").cache_key(), Scalar::Integer(1));
        assert_eq!(Scalar::from("-15").cache_key(), Scalar::Integer(-15));
        assert_eq!(Scalar::Integer(7).cache_key(), Scalar::Integer(7));
        assert_eq!(Scalar::from("01").cache_key(), Scalar::from("01"));
        assert_eq!(Scalar::from("+5").cache_key(), Scalar::from("+5"));
        assert_eq!(Scalar::from(" 5").cache_key(), Scalar::from(" 5"));
        assert_eq!(Scalar::from("abc").cache_key(), Scalar::from("abc"));
        assert_eq!(Scalar::from(vec![0x31u8]).cache_key(), Scalar::Blob(vec![0x31]));
    }

    #[test]
    fn test_infer() {
        assert_eq!(Scalar::infer("42"), Scalar::Integer(42));
        assert_eq!(Scalar::infer("-7"), Scalar::Integer(-7));
        assert_eq!(Scalar::infer("4x2"), Scalar::Text("4x2".into()));
        assert_eq!(Scalar::infer(""), Scalar::Text(String::new()));
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(Scalar::Text(" 12 ".into()).to_integer().unwrap(), 12);
        assert_eq!(Scalar::Blob(b"99".to_vec()).to_integer().unwrap(), 99);
        assert!(Scalar::Text("abc".into()).to_integer().is_err());
    }

    #[test]
    fn test_key_format() {
        let key = Scalar::Text("17".into());
        assert_eq!(KeyFormat::Integer.apply(key.clone()).unwrap(), Scalar::Integer(17));
        assert_eq!(KeyFormat::Raw.apply(key.clone()).unwrap(), key);
    }

    #[test]
    fn test_display() {
        assert_eq!(Scalar::Integer(5).to_string(), "5");
        assert_eq!(Scalar::Blob(vec![0xde, 0xad]).to_string(), "x'dead'");
        assert_eq!(Value::from("hi").to_string(), "hi");
    }

    #[test]
    fn test_sql_round_trip() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for scalar in [Scalar::Integer(3), Scalar::from("three"), Scalar::from(vec![3u8, 0, 3])] {
            let back: Scalar = conn.query_row("SELECT ?1", [&scalar], |row| row.get(0)).unwrap();
            assert_eq!(back, scalar);
        }
        let null: Option<Scalar> = conn.query_row("SELECT NULL", [], |row| row.get(0)).unwrap();
        assert_eq!(null, None);
    }
}
