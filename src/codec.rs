//! Value codecs
//!
//! Every stored value goes through one of four fixed representations:
//! - `Raw`: stored and returned as-is
//! - `Integer`: stored as-is, read back as an integer
//! - `Json`: serialized to JSON text
//! - `JsonDeflate`: JSON text compressed with raw DEFLATE, stored as a blob
//!
//! JSON decoding keeps integers that do not fit in 64 bits as JSON strings
//! so they never round through a float.

use crate::value::{Scalar, Value};
use crate::{Error, Result};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::{Read, Write};
use std::str::FromStr;

/// Encoding applied to a value on its way in and out of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Codec {
    #[default]
    Raw,
    Integer,
    Json,
    JsonDeflate,
}

impl Codec {
    /// Get the string representation of the codec
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Raw => "raw",
            Codec::Integer => "integer",
            Codec::Json => "json",
            Codec::JsonDeflate => "json-deflate",
        }
    }

    /// Get all codecs
    pub fn all() -> &'static [Codec] {
        &[Codec::Raw, Codec::Integer, Codec::Json, Codec::JsonDeflate]
    }

    /// Whether the stored column holds the caller's scalar unchanged, which
    /// is what makes a `value → key` cache entry valid for it.
    pub fn stores_verbatim(&self) -> bool {
        matches!(self, Codec::Raw | Codec::Integer)
    }

    /// Encode a value into the scalar written to the value column.
    pub fn encode(&self, value: &Value) -> Result<Scalar> {
        match self {
            Codec::Raw => Ok(self.scalar(value)?.clone()),
            Codec::Integer => Ok(Scalar::Integer(self.scalar(value)?.to_integer()?)),
            Codec::Json => Ok(Scalar::Text(to_json_text(value)?)),
            Codec::JsonDeflate => {
                let text = to_json_text(value)?;
                Ok(Scalar::Blob(deflate(text.as_bytes())?))
            }
        }
    }

    /// The value a later `decode` of `encode(value)` yields, without the
    /// storage round trip. This is what a cache must hold for the pair.
    pub fn normalize(&self, value: Value) -> Result<Value> {
        match self {
            Codec::Raw => {
                self.scalar(&value)?;
                Ok(value)
            }
            Codec::Integer => Ok(Value::Scalar(Scalar::Integer(self.scalar(&value)?.to_integer()?))),
            Codec::Json | Codec::JsonDeflate => parse_json(to_json_text(&value)?.as_bytes()),
        }
    }

    fn scalar<'v>(&self, value: &'v Value) -> Result<&'v Scalar> {
        match value {
            Value::Scalar(scalar) => Ok(scalar),
            Value::Json(_) => Err(Error::Codec(format!(
                "{} codec cannot store a JSON document",
                self
            ))),
        }
    }

    /// Decode a stored scalar back into a value.
    pub fn decode(&self, stored: Scalar) -> Result<Value> {
        match self {
            Codec::Raw => Ok(Value::Scalar(stored)),
            Codec::Integer => Ok(Value::Scalar(Scalar::Integer(stored.to_integer()?))),
            Codec::Json => parse_json(&stored.to_bytes()),
            Codec::JsonDeflate => parse_json(&inflate(&stored.to_bytes())?),
        }
    }
}

impl FromStr for Codec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "raw" | "s" | "text" => Ok(Codec::Raw),
            "integer" | "int" | "i" => Ok(Codec::Integer),
            "json" | "j" => Ok(Codec::Json),
            "json-deflate" | "jsondeflate" | "jz" | "deflate" => Ok(Codec::JsonDeflate),
            _ => Err(Error::Codec(format!("Unknown codec: {}", s))),
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn to_json_text(value: &Value) -> Result<String> {
    let json = match value {
        Value::Json(json) => return Ok(serde_json::to_string(json)?),
        Value::Scalar(Scalar::Integer(i)) => JsonValue::from(*i),
        Value::Scalar(Scalar::Text(s)) => JsonValue::from(s.as_str()),
        Value::Scalar(Scalar::Blob(_)) => {
            return Err(Error::Codec("a blob has no JSON representation".to_string()));
        }
    };
    Ok(serde_json::to_string(&json)?)
}

fn parse_json(bytes: &[u8]) -> Result<Value> {
    let json: JsonValue = serde_json::from_slice(bytes)?;
    Ok(Value::Json(preserve_big_integers(json)))
}

/// Replace integer literals outside the i64/u64 range by their decimal text.
fn preserve_big_integers(json: JsonValue) -> JsonValue {
    match json {
        JsonValue::Number(n) if !n.is_i64() && !n.is_u64() => {
            let text = n.to_string();
            if is_integer_literal(&text) {
                JsonValue::String(text)
            } else {
                JsonValue::Number(n)
            }
        }
        JsonValue::Array(items) => {
            JsonValue::Array(items.into_iter().map(preserve_big_integers).collect())
        }
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| (k, preserve_big_integers(v)))
                .collect(),
        ),
        other => other,
    }
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn deflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

fn inflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Codec(format!("inflate failed: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_codec_tags() {
        assert_eq!("s".parse::<Codec>().unwrap(), Codec::Raw);
        assert_eq!("i".parse::<Codec>().unwrap(), Codec::Integer);
        assert_eq!("j".parse::<Codec>().unwrap(), Codec::Json);
        assert_eq!("jz".parse::<Codec>().unwrap(), Codec::JsonDeflate);
        assert_eq!("JSON-DEFLATE".parse::<Codec>().unwrap(), Codec::JsonDeflate);
        assert!("zip".parse::<Codec>().is_err());
        for codec in Codec::all() {
            assert_eq!(codec.as_str().parse::<Codec>().unwrap(), *codec);
        }
    }

    #[test]
    fn test_raw_rejects_documents() {
        assert!(Codec::Raw.encode(&Value::Json(json!({"a": 1}))).is_err());
        assert_eq!(
            Codec::Raw.encode(&Value::from("plain")).unwrap(),
            Scalar::Text("plain".into())
        );
    }

    #[test]
    fn test_integer_encode_parses_text() {
        assert_eq!(Codec::Integer.encode(&Value::from("42")).unwrap(), Scalar::Integer(42));
        assert!(matches!(
            Codec::Integer.encode(&Value::from("forty")),
            Err(Error::Codec(_))
        ));
    }

    #[test]
    fn test_normalize_matches_decoded_form() {
        for (codec, value) in [
            (Codec::Raw, Value::from("doc")),
            (Codec::Integer, Value::from("42")),
            (Codec::Json, Value::from("doc")),
            (Codec::Json, Value::from(7)),
            (Codec::JsonDeflate, Value::Json(json!({"a": [1, 2], "b": null}))),
        ] {
            let stored = codec.encode(&value).unwrap();
            assert_eq!(codec.normalize(value).unwrap(), codec.decode(stored).unwrap());
        }
        assert_eq!(
            Codec::Json.normalize(Value::from("doc")).unwrap(),
            Value::Json(json!("doc"))
        );
        assert!(Codec::Raw.normalize(Value::Json(json!(1))).is_err());
    }

    #[test]
    fn test_integer_decode() {
        let decoded = Codec::Integer.decode(Scalar::Text("42".into())).unwrap();
        assert_eq!(decoded, Value::Scalar(Scalar::Integer(42)));
        assert!(Codec::Integer.decode(Scalar::Text("forty".into())).is_err());
    }

    #[test]
    fn test_json_scalars() {
        assert_eq!(
            Codec::Json.encode(&Value::from("hi")).unwrap(),
            Scalar::Text("\"hi\"".into())
        );
        assert_eq!(Codec::Json.encode(&Value::from(7)).unwrap(), Scalar::Text("7".into()));
        assert!(Codec::Json.encode(&Value::from(vec![1u8])).is_err());
    }

    #[test]
    fn test_deflate_stores_blob() {
        let doc = json!({"name": "pairs", "tags": ["a", "b"], "n": 3});
        let stored = Codec::JsonDeflate.encode(&Value::Json(doc.clone())).unwrap();
        assert!(matches!(stored, Scalar::Blob(_)));
        assert_eq!(Codec::JsonDeflate.decode(stored).unwrap(), Value::Json(doc));
    }

    #[test]
    fn test_big_integers_become_strings() {
        let stored = Scalar::Text(
            r#"{"big": 123456789012345678901234567890, "max": 18446744073709551615, "min": -9223372036854775808, "neg": -99999999999999999999, "f": 1.5}"#
                .into(),
        );
        let decoded = Codec::Json.decode(stored).unwrap();
        let doc = decoded.as_json().unwrap();
        assert_eq!(doc["big"], json!("123456789012345678901234567890"));
        assert_eq!(doc["neg"], json!("-99999999999999999999"));
        assert_eq!(doc["max"].as_u64(), Some(u64::MAX));
        assert_eq!(doc["min"].as_i64(), Some(i64::MIN));
        assert!(doc["f"].is_number());
    }

    #[test]
    fn test_corrupt_deflate_is_codec_error() {
        let err = Codec::JsonDeflate
            .decode(Scalar::Blob(vec![0xff, 0xff, 0xff]))
            .unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }
}
