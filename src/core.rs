// SPDX-License-Identifier: MIT

//! Core types shared across the crate.
//!
//! Provides the byte-string newtype used on every CBOR wire path, the
//! validity window attached to manifests and signatures, and the small set
//! of [`ciborium::Value`] helpers the decoders are built from.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ciborium::Value;
use derive_more::{AsRef, Constructor, Deref, From};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::error::CoreError;

/// Time as seconds since the UNIX epoch. On the wire it rides CBOR tag 1.
pub type Time = i64;

/// CBOR tag number for an epoch-based date/time (RFC 8949 §3.4.2).
pub const TIME_CBOR_TAG: u64 = 1;

/// CBOR tag number for a URI (RFC 8949 §3.4.5.3).
pub const URI_CBOR_TAG: u64 = 32;

/// An owned byte string.
///
/// A bare `Vec<u8>` round-trips through serde as an array of integers, not a
/// CBOR byte string, so every bstr in this crate goes through this newtype.
/// In human-readable formats (JSON) it renders as base64, which is also how
/// embedded tags appear in inspection output.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, From, AsRef, Deref)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<&[u8]> for Bytes {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&BASE64.encode(&self.0))
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

struct BytesVisitor;

impl<'de> Visitor<'de> for BytesVisitor {
    type Value = Bytes;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a byte string or a base64 string")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(Bytes(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        BASE64
            .decode(v)
            .map(Bytes)
            .map_err(|e| E::custom(format!("invalid base64: {e}")))
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut out = Vec::new();
        while let Some(byte) = seq.next_element::<u8>()? {
            out.push(byte);
        }
        Ok(Bytes(out))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_str(BytesVisitor)
        } else {
            deserializer.deserialize_byte_buf(BytesVisitor)
        }
    }
}

/// Validity window for a manifest or a signature.
///
/// The end of the window is mandatory; the start is not.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Constructor, From,
)]
pub struct ValidityMap {
    #[serde(rename = "not-before")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub not_before: Option<Time>,
    #[serde(rename = "not-after")]
    pub not_after: Time,
}

impl ValidityMap {
    pub(crate) fn to_cbor_value(&self) -> Value {
        let mut map = Vec::with_capacity(2);
        if let Some(not_before) = self.not_before {
            map.push((int(0), time(not_before)));
        }
        map.push((int(1), time(self.not_after)));
        Value::Map(map)
    }

    pub(crate) fn from_cbor_value(value: &Value) -> Result<Self, CoreError> {
        let map = as_map(value)?;
        let not_before = match map_get(map, 0) {
            Some(v) => Some(as_time(v)?),
            None => None,
        };
        let not_after = map_get(map, 1).ok_or(CoreError::MissingMandatoryField("NotAfter", 1))?;
        Ok(Self {
            not_before,
            not_after: as_time(not_after)?,
        })
    }
}

/// Decode a single CBOR item, classifying truncation separately from
/// syntactically broken input.
pub(crate) fn read_value(buf: &[u8]) -> Result<Value, CoreError> {
    match ciborium::from_reader::<Value, _>(buf) {
        Ok(value) => Ok(value),
        Err(ciborium::de::Error::Io(_)) => Err(CoreError::UnexpectedEof),
        Err(ciborium::de::Error::Syntax(offset)) => Err(CoreError::MalformedCbor(format!(
            "syntax error at offset {offset}"
        ))),
        Err(ciborium::de::Error::Semantic(_, msg)) => Err(CoreError::MalformedCbor(msg)),
        Err(err) => Err(CoreError::MalformedCbor(err.to_string())),
    }
}

pub(crate) fn write_value(value: &Value) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| CoreError::MalformedCbor(e.to_string()))?;
    Ok(buf)
}

/// CBOR major type of an already-decoded item.
pub(crate) fn major_type(value: &Value) -> u8 {
    match value {
        Value::Integer(n) => {
            if i128::from(*n) >= 0 {
                0
            } else {
                1
            }
        }
        Value::Bytes(_) => 2,
        Value::Text(_) => 3,
        Value::Array(_) => 4,
        Value::Map(_) => 5,
        Value::Tag(..) => 6,
        _ => 7,
    }
}

pub(crate) fn as_map(value: &Value) -> Result<&Vec<(Value, Value)>, CoreError> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(CoreError::UnexpectedType {
            expected: 5,
            found: major_type(other),
        }),
    }
}

/// Look up an integer-keyed entry in a CBOR map.
pub(crate) fn map_get(map: &[(Value, Value)], key: u64) -> Option<&Value> {
    map.iter().find_map(|(k, v)| match k {
        Value::Integer(n) if i128::from(*n) == i128::from(key) => Some(v),
        _ => None,
    })
}

pub(crate) fn int(n: i64) -> Value {
    Value::Integer(n.into())
}

pub(crate) fn text(s: &str) -> Value {
    Value::Text(s.to_owned())
}

pub(crate) fn uri(s: &str) -> Value {
    Value::Tag(URI_CBOR_TAG, Box::new(text(s)))
}

pub(crate) fn time(t: Time) -> Value {
    Value::Tag(TIME_CBOR_TAG, Box::new(int(t)))
}

pub(crate) fn as_i64(value: &Value) -> Result<i64, CoreError> {
    match value {
        Value::Integer(n) => i64::try_from(i128::from(*n))
            .map_err(|_| CoreError::MalformedCbor("integer out of range".to_owned())),
        other => Err(CoreError::UnexpectedType {
            expected: 0,
            found: major_type(other),
        }),
    }
}

pub(crate) fn as_text(value: &Value) -> Result<&str, CoreError> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(CoreError::UnexpectedType {
            expected: 3,
            found: major_type(other),
        }),
    }
}

pub(crate) fn as_bytes(value: &Value) -> Result<&[u8], CoreError> {
    match value {
        Value::Bytes(b) => Ok(b),
        other => Err(CoreError::UnexpectedType {
            expected: 2,
            found: major_type(other),
        }),
    }
}

/// Text, with an optional URI tag (32) stripped.
pub(crate) fn as_uri(value: &Value) -> Result<&str, CoreError> {
    match value {
        Value::Tag(URI_CBOR_TAG, inner) => as_text(inner),
        other => as_text(other),
    }
}

/// Epoch time, with an optional time tag (1) stripped.
pub(crate) fn as_time(value: &Value) -> Result<Time, CoreError> {
    match value {
        Value::Tag(TIME_CBOR_TAG, inner) => as_i64(inner),
        other => as_i64(other),
    }
}

/// Generic rendering of a decoded CBOR item into JSON for inspection
/// output. Byte strings become base64, integer map keys become strings,
/// and embedded tags are made explicit.
pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Integer(n) => match i64::try_from(i128::from(*n)) {
            Ok(i) => Json::Number(i.into()),
            Err(_) => Json::String(i128::from(*n).to_string()),
        },
        Value::Bytes(b) => Json::String(BASE64.encode(b)),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bool(b) => Json::Bool(*b),
        Value::Null => Json::Null,
        Value::Float(x) => serde_json::Number::from_f64(*x)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(x.to_string())),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => {
            let mut object = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                object.insert(json_key(k), value_to_json(v));
            }
            Json::Object(object)
        }
        Value::Tag(tag, inner) => {
            let mut object = serde_json::Map::with_capacity(2);
            object.insert("tag".to_owned(), Json::Number((*tag).into()));
            object.insert("value".to_owned(), value_to_json(inner));
            Json::Object(object)
        }
        other => Json::String(format!("{other:?}")),
    }
}

fn json_key(key: &Value) -> String {
    match key {
        Value::Text(s) => s.clone(),
        Value::Integer(n) => i128::from(*n).to_string(),
        Value::Bytes(b) => BASE64.encode(b),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_cbor_round_trip_is_a_byte_string() {
        let value = Bytes(vec![0x01, 0x02, 0x03]);
        let mut buf = Vec::new();
        ciborium::into_writer(&value, &mut buf).unwrap();
        // 0x43 = major type 2 (byte string), length 3
        assert_eq!(buf, vec![0x43, 0x01, 0x02, 0x03]);

        let back: Bytes = ciborium::from_reader(buf.as_slice()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn bytes_json_round_trip_is_base64() {
        let value = Bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"3q2+7w==\"");

        let back: Bytes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn read_value_reports_truncation_as_eof() {
        // map of one entry whose value string is one byte short
        let truncated = [0xa1, 0x01, 0x65, b'h', b'e', b'l', b'l'];
        assert_eq!(read_value(&truncated), Err(CoreError::UnexpectedEof));
    }

    #[test]
    fn as_map_names_the_found_major_type() {
        let value = read_value(b"\x63abc").unwrap();
        let err = as_map(&value).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected map (CBOR Major Type 5), found Major Type 3"
        );
    }

    #[test]
    fn validity_map_cbor_round_trip() {
        let validity = ValidityMap::new(Some(10), 1000);
        let encoded = validity.to_cbor_value();
        let back = ValidityMap::from_cbor_value(&encoded).unwrap();
        assert_eq!(back, validity);
    }

    #[test]
    fn validity_map_requires_not_after() {
        let value = Value::Map(vec![(int(0), time(10))]);
        let err = ValidityMap::from_cbor_value(&value).unwrap_err();
        assert_eq!(err.to_string(), "missing mandatory field \"NotAfter\" (1)");
    }

    #[test]
    fn value_to_json_renders_bytes_and_integer_keys() {
        let value = Value::Map(vec![(int(1), Value::Bytes(vec![0xff]))]);
        let json = value_to_json(&value);
        assert_eq!(json, serde_json::json!({"1": "/w=="}));
    }
}
