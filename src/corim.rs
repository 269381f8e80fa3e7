// SPDX-License-Identifier: MIT

//! The CoRIM manifest container.
//!
//! An [`UnsignedCorim`] starts life as a JSON template with zero tags, is
//! grown by `add_*` operations that each run the artifact codec's
//! validation first, must pass [`UnsignedCorim::valid`] before being
//! encoded, and round-trips through CBOR as a map with integer keys:
//!
//! ```text
//! corim-map = {
//!   0: id
//!   1: [ + bstr ]          ; tag entries, insertion order preserved
//!   ? 2: [ + locator-map ]
//!   ? 3: profile
//!   ? 4: validity-map
//!   ? 5: [ + entity-map ]
//! }
//! ```
//!
//! [`Corim`] is the top-level type choice: the same input bytes may carry a
//! COSE_Sign1 envelope or a bare manifest map, and there is no top-level
//! discriminator to look at before decoding. [`Corim::from_bytes`] is the
//! deliberate ordered-fallback decoder: it attempts the signed form first
//! and falls back to the unsigned form, surfacing the unsigned error when
//! both fail.

use ciborium::Value;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

use crate::comid::Comid;
use crate::core::{self, ValidityMap};
use crate::cose::SignedCorim;
use crate::coswid::Coswid;
use crate::cots::Cots;
use crate::error::{CoreError, CorimError};
use crate::tags::{Tag, COMID_TAG, COSWID_TAG, COTS_TAG, MIN_TAG_LEN};

/// CBOR tag number for an unsigned corim-map.
pub const CORIM_MAP_CBOR_TAG: u64 = 501;

/// Reference to another manifest this one depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Constructor)]
pub struct LocatorMap {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub thumbprint: Option<String>,
}

/// Role an entity plays with respect to the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorimRole {
    #[serde(rename = "manifestCreator")]
    ManifestCreator,
    #[serde(rename = "manifestSigner")]
    ManifestSigner,
}

impl CorimRole {
    fn code(self) -> i64 {
        match self {
            Self::ManifestCreator => 1,
            Self::ManifestSigner => 2,
        }
    }

    fn from_code(code: i64) -> Result<Self, CoreError> {
        match code {
            1 => Ok(Self::ManifestCreator),
            2 => Ok(Self::ManifestSigner),
            other => Err(CoreError::MalformedCbor(format!("unknown role {other}"))),
        }
    }
}

/// Entity attributed on the manifest (creator, signer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Constructor)]
pub struct CorimEntity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub regid: Option<String>,
    pub roles: Vec<CorimRole>,
}

/// The unsigned manifest: template-carried metadata plus the ordered
/// sequence of embedded tag entries.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedCorim {
    #[serde(rename = "corim-id")]
    #[serde(default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(rename = "dependent-rims")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub dependent_rims: Option<Vec<LocatorMap>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(rename = "validity")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub rim_validity: Option<ValidityMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub entities: Option<Vec<CorimEntity>>,
}

impl UnsignedCorim {
    /// Build the manifest skeleton from a JSON template. The result carries
    /// no tags yet.
    pub fn from_template(buf: &[u8]) -> Result<Self, CorimError> {
        serde_json::from_slice(buf).map_err(|e| CorimError::Template(e.to_string()))
    }

    /// Append a CoMID. The artifact is validated first; a failed add leaves
    /// the manifest untouched.
    pub fn add_comid(&mut self, comid: &Comid) -> crate::Result<&mut Self> {
        comid.valid()?;
        self.tags.push(Tag::new(COMID_TAG, comid.to_cbor()));
        Ok(self)
    }

    /// Append a CoSWID; same contract as [`UnsignedCorim::add_comid`].
    pub fn add_coswid(&mut self, coswid: &Coswid) -> crate::Result<&mut Self> {
        coswid.valid()?;
        self.tags.push(Tag::new(COSWID_TAG, coswid.to_cbor()));
        Ok(self)
    }

    /// Append a trust-anchor store; same contract as
    /// [`UnsignedCorim::add_comid`].
    pub fn add_cots(&mut self, cots: &Cots) -> crate::Result<&mut Self> {
        cots.valid()?;
        self.tags.push(Tag::new(COTS_TAG, cots.to_cbor()));
        Ok(self)
    }

    /// Structural check required before encoding for output or signing.
    /// Decode for inspection does not go through here.
    pub fn valid(&self) -> Result<(), CorimError> {
        if self.id.is_empty() {
            return Err(CorimError::EmptyId);
        }
        if self.tags.is_empty() {
            return Err(CorimError::NoTags);
        }
        for (index, tag) in self.tags.iter().enumerate() {
            if tag.len() < MIN_TAG_LEN {
                return Err(CorimError::TagTooShort(index, tag.len()));
            }
        }
        Ok(())
    }

    pub(crate) fn to_cbor_value(&self) -> Value {
        let mut map = vec![(core::int(0), core::text(&self.id))];

        let tags = self
            .tags
            .iter()
            .map(|tag| Value::Bytes(tag.as_bytes().to_vec()))
            .collect();
        map.push((core::int(1), Value::Array(tags)));

        if let Some(locators) = &self.dependent_rims {
            let locators = locators
                .iter()
                .map(|locator| {
                    let mut entry = vec![(core::int(0), core::uri(&locator.href))];
                    if let Some(thumbprint) = &locator.thumbprint {
                        entry.push((core::int(1), core::text(thumbprint)));
                    }
                    Value::Map(entry)
                })
                .collect();
            map.push((core::int(2), Value::Array(locators)));
        }

        if let Some(profile) = &self.profile {
            map.push((core::int(3), core::uri(profile)));
        }

        if let Some(validity) = &self.rim_validity {
            map.push((core::int(4), validity.to_cbor_value()));
        }

        if let Some(entities) = &self.entities {
            let entities = entities
                .iter()
                .map(|entity| {
                    let mut entry = vec![(core::int(0), core::text(&entity.name))];
                    if let Some(regid) = &entity.regid {
                        entry.push((core::int(1), core::uri(regid)));
                    }
                    let roles = entity
                        .roles
                        .iter()
                        .map(|role| core::int(role.code()))
                        .collect();
                    entry.push((core::int(2), Value::Array(roles)));
                    Value::Map(entry)
                })
                .collect();
            map.push((core::int(5), Value::Array(entities)));
        }

        Value::Map(map)
    }

    /// Encode as a bare corim-map. Callers that wrap the output in a CBOR
    /// tag (the signing envelope does) tag the value themselves.
    pub fn to_cbor(&self) -> Result<Vec<u8>, CorimError> {
        Ok(core::write_value(&self.to_cbor_value())?)
    }

    /// Decode from CBOR. Accepts the corim-map bare or wrapped in CBOR tag
    /// 501. The tag list must be present; its entries are stored raw, so a
    /// manifest with malformed entries still decodes for inspection.
    pub fn from_cbor(buf: &[u8]) -> Result<Self, CorimError> {
        // The major type is taken from the initial byte so that input with
        // the wrong framing is reported by its type even when the item is
        // also truncated.
        match buf.first().map(|b| b >> 5) {
            None => return Err(CoreError::UnexpectedEof.into()),
            Some(5) | Some(6) => {}
            Some(found) => {
                return Err(CoreError::UnexpectedType { expected: 5, found }.into());
            }
        }

        let value = match core::read_value(buf)? {
            Value::Tag(CORIM_MAP_CBOR_TAG, inner) => *inner,
            value => value,
        };
        Self::from_cbor_value(&value)
    }

    pub(crate) fn from_cbor_value(value: &Value) -> Result<Self, CorimError> {
        let map = core::as_map(value)?;

        let id = match core::map_get(map, 0) {
            Some(v) => core::as_text(v)?.to_owned(),
            None => String::new(),
        };

        let tags_value = core::map_get(map, 1)
            .ok_or(CoreError::MissingMandatoryField("Tags", 1))?;
        let tags = match tags_value {
            Value::Array(entries) => entries
                .iter()
                .map(|entry| Ok(Tag::from_bytes(core::as_bytes(entry)?.to_vec())))
                .collect::<Result<Vec<_>, CoreError>>()?,
            other => {
                return Err(CoreError::UnexpectedType {
                    expected: 4,
                    found: core::major_type(other),
                }
                .into())
            }
        };

        let dependent_rims = match core::map_get(map, 2) {
            Some(Value::Array(entries)) => {
                let mut locators = Vec::with_capacity(entries.len());
                for entry in entries {
                    let entry = core::as_map(entry)?;
                    let href = core::map_get(entry, 0)
                        .ok_or(CoreError::MissingMandatoryField("Href", 0))
                        .and_then(core::as_uri)?
                        .to_owned();
                    let thumbprint = match core::map_get(entry, 1) {
                        Some(v) => Some(core::as_text(v)?.to_owned()),
                        None => None,
                    };
                    locators.push(LocatorMap { href, thumbprint });
                }
                Some(locators)
            }
            Some(other) => {
                return Err(CoreError::UnexpectedType {
                    expected: 4,
                    found: core::major_type(other),
                }
                .into())
            }
            None => None,
        };

        let profile = match core::map_get(map, 3) {
            Some(v) => Some(core::as_uri(v)?.to_owned()),
            None => None,
        };

        let rim_validity = match core::map_get(map, 4) {
            Some(v) => Some(ValidityMap::from_cbor_value(v)?),
            None => None,
        };

        let entities = match core::map_get(map, 5) {
            Some(Value::Array(entries)) => {
                let mut out = Vec::with_capacity(entries.len());
                for entry in entries {
                    let entry = core::as_map(entry)?;
                    let name = core::map_get(entry, 0)
                        .ok_or(CoreError::MissingMandatoryField("EntityName", 0))
                        .and_then(core::as_text)?
                        .to_owned();
                    let regid = match core::map_get(entry, 1) {
                        Some(v) => Some(core::as_uri(v)?.to_owned()),
                        None => None,
                    };
                    let roles = match core::map_get(entry, 2) {
                        Some(Value::Array(codes)) => codes
                            .iter()
                            .map(|code| CorimRole::from_code(core::as_i64(code)?))
                            .collect::<Result<Vec<_>, CoreError>>()?,
                        Some(other) => {
                            return Err(CoreError::UnexpectedType {
                                expected: 4,
                                found: core::major_type(other),
                            }
                            .into())
                        }
                        None => return Err(CoreError::MissingMandatoryField("Roles", 2).into()),
                    };
                    out.push(CorimEntity { name, regid, roles });
                }
                Some(out)
            }
            Some(other) => {
                return Err(CoreError::UnexpectedType {
                    expected: 4,
                    found: core::major_type(other),
                }
                .into())
            }
            None => None,
        };

        Ok(Self {
            id,
            tags,
            dependent_rims,
            profile,
            rim_validity,
            entities,
        })
    }
}

/// Top-level type choice: a manifest is either wrapped in a COSE_Sign1
/// envelope or stored as a bare corim-map.
#[derive(Debug)]
pub enum Corim {
    Signed(SignedCorim),
    Unsigned(UnsignedCorim),
}

impl Corim {
    /// Ordered-fallback decode over bytes of unknown framing: the richer
    /// signed form is attempted first, then the unsigned map. When both
    /// fail, the unsigned error is surfaced, marked as a dual-mode failure.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, CorimError> {
        match SignedCorim::from_cose(buf) {
            Ok(signed) => Ok(Self::Signed(signed)),
            Err(cose_err) => {
                log::debug!("input is not a COSE_Sign1 envelope ({cose_err}); trying unsigned");
                match UnsignedCorim::from_cbor(buf) {
                    Ok(unsigned) => Ok(Self::Unsigned(unsigned)),
                    Err(err) => Err(CorimError::SignedOrUnsigned(Box::new(err))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{cbor, comid_fixture, coswid_fixture, TEMPLATE_JSON};

    #[test]
    fn template_parses_with_zero_tags() {
        let corim = UnsignedCorim::from_template(TEMPLATE_JSON.as_bytes()).unwrap();
        assert_eq!(corim.id, "5c57e8f4-46cd-421b-91c9-08cf93e13cfc");
        assert!(corim.tags.is_empty());
        assert_eq!(
            corim.profile.as_deref(),
            Some("http://example.com/example-profile")
        );
        let entities = corim.entities.as_ref().unwrap();
        assert_eq!(entities[0].roles, vec![CorimRole::ManifestCreator]);
    }

    #[test]
    fn bad_template_is_reported() {
        let err = UnsignedCorim::from_template(b"{").unwrap_err();
        assert!(matches!(err, CorimError::Template(_)));
    }

    #[test]
    fn add_appends_in_order() {
        let mut corim = UnsignedCorim::from_template(TEMPLATE_JSON.as_bytes()).unwrap();
        corim.add_comid(&comid_fixture()).unwrap();
        corim.add_coswid(&coswid_fixture()).unwrap();

        assert_eq!(corim.tags.len(), 2);
        assert_eq!(corim.tags[0].kind(), crate::tags::ArtifactKind::Comid);
        assert_eq!(corim.tags[1].kind(), crate::tags::ArtifactKind::Coswid);
        corim.valid().unwrap();
    }

    #[test]
    fn failed_add_leaves_manifest_untouched() {
        let mut corim = UnsignedCorim::from_template(TEMPLATE_JSON.as_bytes()).unwrap();
        corim.add_comid(&comid_fixture()).unwrap();

        let invalid = Comid::from_cbor(&cbor(&Value::Map(vec![]))).unwrap();
        let before = corim.tags.len();
        assert!(corim.add_comid(&invalid).is_err());
        assert_eq!(corim.tags.len(), before);
    }

    #[test]
    fn valid_requires_id_and_tags() {
        let mut corim = UnsignedCorim::default();
        assert_eq!(corim.valid().unwrap_err().to_string(), "empty id");

        corim.id = "corim-001".to_owned();
        assert_eq!(corim.valid().unwrap_err().to_string(), "no tags");

        corim.tags.push(Tag::from_bytes(vec![0xd9]));
        assert_eq!(
            corim.valid().unwrap_err().to_string(),
            "tag at index 0 is too short (1 bytes)"
        );
    }

    #[test]
    fn cbor_round_trip_preserves_tags_and_order() {
        let mut corim = UnsignedCorim::from_template(TEMPLATE_JSON.as_bytes()).unwrap();
        corim.add_comid(&comid_fixture()).unwrap();
        corim.add_coswid(&coswid_fixture()).unwrap();

        let buf = corim.to_cbor().unwrap();
        let back = UnsignedCorim::from_cbor(&buf).unwrap();
        assert_eq!(back, corim);
    }

    #[test]
    fn tagged_and_bare_maps_both_decode() {
        let mut corim = UnsignedCorim::from_template(TEMPLATE_JSON.as_bytes()).unwrap();
        corim.add_comid(&comid_fixture()).unwrap();

        let bare = corim.to_cbor().unwrap();
        let tagged = cbor(&Value::Tag(
            CORIM_MAP_CBOR_TAG,
            Box::new(corim.to_cbor_value()),
        ));

        assert_eq!(UnsignedCorim::from_cbor(&bare).unwrap(), corim);
        assert_eq!(UnsignedCorim::from_cbor(&tagged).unwrap(), corim);
    }

    #[test]
    fn from_cbor_names_wrong_major_type() {
        let err = UnsignedCorim::from_cbor(b"hello!").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected map (CBOR Major Type 5), found Major Type 3"
        );
    }

    #[test]
    fn from_cbor_requires_the_tag_list() {
        let buf = cbor(&Value::Map(vec![(
            core::int(0),
            core::text("corim-001"),
        )]));
        let err = UnsignedCorim::from_cbor(&buf).unwrap_err();
        assert_eq!(err.to_string(), "missing mandatory field \"Tags\" (1)");
    }

    #[test]
    fn dispatcher_falls_back_to_unsigned() {
        let mut corim = UnsignedCorim::from_template(TEMPLATE_JSON.as_bytes()).unwrap();
        corim.add_comid(&comid_fixture()).unwrap();
        let buf = corim.to_cbor().unwrap();

        match Corim::from_bytes(&buf).unwrap() {
            Corim::Unsigned(unsigned) => assert_eq!(unsigned, corim),
            Corim::Signed(_) => panic!("expected the unsigned view"),
        }
    }

    #[test]
    fn dispatcher_reports_dual_mode_failure() {
        let err = Corim::from_bytes(b"hello!").unwrap_err();
        assert_eq!(
            err.to_string(),
            "neither a signed nor an unsigned CoRIM: \
             expected map (CBOR Major Type 5), found Major Type 3"
        );
    }
}
