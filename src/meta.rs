// SPDX-License-Identifier: MIT

//! Signer metadata attached to a manifest before signing.
//!
//! A meta document arrives as JSON, is validated once, and is consumed by a
//! single signing operation: its CBOR form rides the protected header of
//! the signing envelope.

use ciborium::Value;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

use crate::core::{self, ValidityMap};
use crate::error::MetaError;

/// Identity of the signing entity. The name is mandatory and must be
/// non-empty; the URI is not.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Constructor)]
pub struct CorimSigner {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub uri: Option<String>,
}

/// Signer identity plus an optional signature validity window.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Constructor)]
pub struct Meta {
    pub signer: CorimSigner,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub validity: Option<ValidityMap>,
}

impl Meta {
    /// Decode a meta document from JSON.
    pub fn from_json(buf: &[u8]) -> Result<Self, MetaError> {
        serde_json::from_slice(buf).map_err(|e| MetaError::Json(e.to_string()))
    }

    /// A non-empty signer name is a hard precondition for signing.
    pub fn valid(&self) -> Result<(), MetaError> {
        if self.signer.name.is_empty() {
            return Err(MetaError::EmptySignerName);
        }
        Ok(())
    }

    /// corim-meta-map: `{0: signer-map, ?1: validity-map}`, with the signer
    /// map as `{0: name, ?1: uri}`.
    pub(crate) fn to_cbor_value(&self) -> Value {
        let mut signer = vec![(core::int(0), core::text(&self.signer.name))];
        if let Some(uri) = &self.signer.uri {
            signer.push((core::int(1), core::uri(uri)));
        }

        let mut map = vec![(core::int(0), Value::Map(signer))];
        if let Some(validity) = &self.validity {
            map.push((core::int(1), validity.to_cbor_value()));
        }
        Value::Map(map)
    }

    pub(crate) fn from_cbor_value(value: &Value) -> Result<Self, MetaError> {
        let map = core::as_map(value)?;

        let signer_value = core::map_get(map, 0)
            .ok_or(crate::error::CoreError::MissingMandatoryField("Signer", 0))?;
        let signer_map = core::as_map(signer_value)?;
        let name = core::map_get(signer_map, 0)
            .ok_or(crate::error::CoreError::MissingMandatoryField(
                "SignerName",
                0,
            ))
            .and_then(core::as_text)?
            .to_owned();
        let uri = match core::map_get(signer_map, 1) {
            Some(v) => Some(core::as_uri(v)?.to_owned()),
            None => None,
        };

        let validity = match core::map_get(map, 1) {
            Some(v) => Some(ValidityMap::from_cbor_value(v)?),
            None => None,
        };

        Ok(Self {
            signer: CorimSigner { name, uri },
            validity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_minimal() {
        let meta = Meta::from_json(br#"{"signer": {"name": "ACME Ltd."}}"#).unwrap();
        assert_eq!(meta.signer.name, "ACME Ltd.");
        assert!(meta.signer.uri.is_none());
        meta.valid().unwrap();
    }

    #[test]
    fn from_json_full() {
        let meta = Meta::from_json(
            br#"{
                "signer": {"name": "ACME Ltd.", "uri": "https://acme.example"},
                "validity": {"not-before": 10, "not-after": 20}
            }"#,
        )
        .unwrap();
        assert_eq!(meta.signer.uri.as_deref(), Some("https://acme.example"));
        assert_eq!(meta.validity, Some(ValidityMap::new(Some(10), 20)));
    }

    #[test]
    fn empty_signer_name_is_invalid() {
        let meta = Meta::from_json(br#"{"signer": {"name": ""}}"#).unwrap();
        let err = meta.valid().unwrap_err();
        assert_eq!(err.to_string(), "invalid signer: empty name");
    }

    #[test]
    fn bad_json_is_reported() {
        let err = Meta::from_json(b"{").unwrap_err();
        assert!(matches!(err, MetaError::Json(_)));
    }

    #[test]
    fn cbor_value_round_trip() {
        let meta = Meta::new(
            CorimSigner::new("Example Signer".to_owned(), Some("https://e.example".into())),
            Some(ValidityMap::new(None, 1000)),
        );
        let back = Meta::from_cbor_value(&meta.to_cbor_value()).unwrap();
        assert_eq!(back, meta);
    }
}
