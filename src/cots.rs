// SPDX-License-Identifier: MIT

//! CoTS (Concise Trust Anchor Store) artifact codec.
//!
//! Trust-anchor contents are out of scope for the manifest core; a store is
//! carried opaque, with only its environments and key material required to
//! be present.

use ciborium::Value;

use crate::core::{self, Bytes};
use crate::error::{CoreError, CotsError};

/// CBOR tag number for a concise trust-anchor store.
pub const COTS_CBOR_TAG: u64 = 507;

const MANDATORY_FIELDS: &[(&str, u64)] = &[("Environments", 3), ("Keys", 7)];

/// A decoded, otherwise opaque trust-anchor store payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Cots {
    value: Value,
    raw: Bytes,
}

impl Cots {
    /// Decode from CBOR. The payload must be a map; an enclosing CBOR tag
    /// 507 is accepted and stripped.
    pub fn from_cbor(buf: &[u8]) -> Result<Self, CotsError> {
        let (value, raw) = match core::read_value(buf)? {
            Value::Tag(COTS_CBOR_TAG, inner) => {
                core::as_map(&inner)?;
                let raw = core::write_value(&inner)?;
                (*inner, Bytes(raw))
            }
            Value::Tag(tag, _) => {
                return Err(CotsError::Core(CoreError::MalformedCbor(format!(
                    "unexpected CBOR tag {tag}"
                ))))
            }
            value @ Value::Map(_) => (value, Bytes::from(buf)),
            other => {
                return Err(CotsError::Core(CoreError::UnexpectedType {
                    expected: 5,
                    found: core::major_type(&other),
                }))
            }
        };
        Ok(Self { value, raw })
    }

    pub fn valid(&self) -> Result<(), CotsError> {
        let map = core::as_map(&self.value)?;
        for (name, key) in MANDATORY_FIELDS {
            if core::map_get(map, *key).is_none() {
                return Err(CotsError::MissingMandatoryField(name, *key));
            }
        }
        Ok(())
    }

    pub fn to_cbor(&self) -> &[u8] {
        &self.raw
    }

    pub fn to_json(&self) -> serde_json::Value {
        core::value_to_json(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{cbor, cots_map};

    #[test]
    fn decode_and_validate_minimal_store() {
        let buf = cbor(&cots_map());
        let cots = Cots::from_cbor(&buf).unwrap();
        cots.valid().unwrap();
    }

    #[test]
    fn environments_are_checked_first() {
        let buf = cbor(&Value::Map(vec![]));
        let cots = Cots::from_cbor(&buf).unwrap();
        let err = cots.valid().unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing mandatory field \"Environments\" (3)"
        );
    }

    #[test]
    fn keys_are_required() {
        let buf = cbor(&Value::Map(vec![(
            core::int(3),
            Value::Array(vec![Value::Map(vec![])]),
        )]));
        let cots = Cots::from_cbor(&buf).unwrap();
        let err = cots.valid().unwrap_err();
        assert_eq!(err.to_string(), "missing mandatory field \"Keys\" (7)");
    }
}
