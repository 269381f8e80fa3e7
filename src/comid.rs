// SPDX-License-Identifier: MIT

//! CoMID (Concise Module Identifier) artifact codec.
//!
//! The manifest core never interprets module identity semantics; a CoMID is
//! carried as an opaque CBOR map. Decoding checks the top-level shape and
//! validation checks only the mandatory top-level fields, reporting the
//! first one missing.

use ciborium::Value;

use crate::core::{self, Bytes};
use crate::error::{ComidError, CoreError};

/// CBOR tag number for a CoMID.
pub const COMID_CBOR_TAG: u64 = 506;

/// Mandatory top-level fields, in the order they are checked.
const MANDATORY_FIELDS: &[(&str, u64)] = &[("TagIdentity", 1), ("Triples", 4)];

/// A decoded, otherwise opaque CoMID payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Comid {
    value: Value,
    raw: Bytes,
}

impl Comid {
    /// Decode from CBOR. The payload must be a map; an enclosing CBOR tag
    /// 506 is accepted and stripped.
    pub fn from_cbor(buf: &[u8]) -> Result<Self, ComidError> {
        let (value, raw) = untag_map(core::read_value(buf)?, buf)?;
        Ok(Self { value, raw })
    }

    /// Check the mandatory fields in declared order; the first one missing
    /// is the error.
    pub fn valid(&self) -> Result<(), ComidError> {
        let map = core::as_map(&self.value)?;
        for (name, key) in MANDATORY_FIELDS {
            if core::map_get(map, *key).is_none() {
                return Err(ComidError::MissingMandatoryField(name, *key));
            }
        }
        Ok(())
    }

    /// The untagged CBOR map bytes, as carried inside a manifest tag entry.
    pub fn to_cbor(&self) -> &[u8] {
        &self.raw
    }

    /// Generic JSON rendering for inspection output.
    pub fn to_json(&self) -> serde_json::Value {
        core::value_to_json(&self.value)
    }
}

fn untag_map(value: Value, buf: &[u8]) -> Result<(Value, Bytes), ComidError> {
    match value {
        Value::Tag(COMID_CBOR_TAG, inner) => {
            core::as_map(&inner)?;
            let raw = core::write_value(&inner)?;
            Ok((*inner, Bytes(raw)))
        }
        Value::Tag(tag, _) => Err(ComidError::Core(CoreError::MalformedCbor(format!(
            "unexpected CBOR tag {tag}"
        )))),
        value @ Value::Map(_) => Ok((value, Bytes::from(buf))),
        other => Err(ComidError::Core(CoreError::UnexpectedType {
            expected: 5,
            found: core::major_type(&other),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{cbor, comid_map, comid_missing_triples};

    #[test]
    fn decode_and_validate_minimal_comid() {
        let buf = cbor(&comid_map());
        let comid = Comid::from_cbor(&buf).unwrap();
        comid.valid().unwrap();
        assert_eq!(comid.to_cbor(), buf.as_slice());
    }

    #[test]
    fn tagged_input_is_accepted_and_stripped() {
        let tagged = cbor(&Value::Tag(COMID_CBOR_TAG, Box::new(comid_map())));
        let untagged = cbor(&comid_map());
        let comid = Comid::from_cbor(&tagged).unwrap();
        assert_eq!(comid.to_cbor(), untagged.as_slice());
    }

    #[test]
    fn first_missing_mandatory_field_wins() {
        let buf = cbor(&Value::Map(vec![]));
        let comid = Comid::from_cbor(&buf).unwrap();
        let err = comid.valid().unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing mandatory field \"TagIdentity\" (1)"
        );
    }

    #[test]
    fn missing_triples_is_reported_after_tag_identity() {
        let buf = cbor(&comid_missing_triples());
        let comid = Comid::from_cbor(&buf).unwrap();
        let err = comid.valid().unwrap_err();
        assert_eq!(err.to_string(), "missing mandatory field \"Triples\" (4)");
    }

    #[test]
    fn non_map_input_names_the_major_type() {
        let err = Comid::from_cbor(b"\x63abc").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected map (CBOR Major Type 5), found Major Type 3"
        );
    }

    #[test]
    fn truncated_input_is_eof() {
        let mut buf = cbor(&comid_map());
        buf.pop();
        let err = Comid::from_cbor(&buf).unwrap_err();
        assert_eq!(err, ComidError::Core(CoreError::UnexpectedEof));
    }
}
