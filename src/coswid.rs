// SPDX-License-Identifier: MIT

//! CoSWID (Concise Software Identity) artifact codec.
//!
//! Same contract as the CoMID codec: opaque map payload, shape check on
//! decode, first-missing-mandatory-field on validation.

use ciborium::Value;

use crate::core::{self, Bytes};
use crate::error::{CoreError, CoswidError};

/// CBOR tag number for a CoSWID.
pub const COSWID_CBOR_TAG: u64 = 505;

const MANDATORY_FIELDS: &[(&str, u64)] = &[
    ("TagId", 0),
    ("TagVersion", 12),
    ("SoftwareName", 1),
    ("Entity", 2),
];

/// A decoded, otherwise opaque CoSWID payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Coswid {
    value: Value,
    raw: Bytes,
}

impl Coswid {
    /// Decode from CBOR. The payload must be a map; an enclosing CBOR tag
    /// 505 is accepted and stripped.
    pub fn from_cbor(buf: &[u8]) -> Result<Self, CoswidError> {
        let (value, raw) = match core::read_value(buf)? {
            Value::Tag(COSWID_CBOR_TAG, inner) => {
                core::as_map(&inner)?;
                let raw = core::write_value(&inner)?;
                (*inner, Bytes(raw))
            }
            Value::Tag(tag, _) => {
                return Err(CoswidError::Core(CoreError::MalformedCbor(format!(
                    "unexpected CBOR tag {tag}"
                ))))
            }
            value @ Value::Map(_) => (value, Bytes::from(buf)),
            other => {
                return Err(CoswidError::Core(CoreError::UnexpectedType {
                    expected: 5,
                    found: core::major_type(&other),
                }))
            }
        };
        Ok(Self { value, raw })
    }

    pub fn valid(&self) -> Result<(), CoswidError> {
        let map = core::as_map(&self.value)?;
        for (name, key) in MANDATORY_FIELDS {
            if core::map_get(map, *key).is_none() {
                return Err(CoswidError::MissingMandatoryField(name, *key));
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
