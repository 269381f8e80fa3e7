// SPDX-License-Identifier: MIT

//! Tag registry: the fixed-width CBOR tag prefixes that classify the
//! artifacts embedded in a manifest, and the raw tag entries themselves.
//!
//! A manifest stores each embedded artifact as an opaque byte string whose
//! first three bytes are the CBOR tag prefix of the artifact kind. The
//! registry maps prefixes to kinds; classification is total and an
//! unrecognized prefix is reported as [`ArtifactKind::Unknown`], never
//! dropped.

use std::fmt;

use derive_more::From;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::Bytes;

/// Width of a tag identifier prefix in bytes.
pub const TAG_ID_LEN: usize = 3;

/// Shortest well-formed tag entry: identifier plus one payload byte.
pub const MIN_TAG_LEN: usize = TAG_ID_LEN + 1;

/// Fixed-width binary prefix identifying an artifact kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, From)]
pub struct TagIdentifier(pub [u8; TAG_ID_LEN]);

impl TagIdentifier {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for TagIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Prefix for a CoMID tag (CBOR tag 506).
pub const COMID_TAG: TagIdentifier = TagIdentifier([0xd9, 0x01, 0xfa]);

/// Prefix for a CoSWID tag (CBOR tag 505).
pub const COSWID_TAG: TagIdentifier = TagIdentifier([0xd9, 0x01, 0xf9]);

/// Prefix for a CoTS tag (CBOR tag 507).
pub const COTS_TAG: TagIdentifier = TagIdentifier([0xd9, 0x01, 0xfb]);

/// The artifact kinds a manifest can embed.
///
/// The set is closed; extending it means adding a variant here and a row to
/// the registry table below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArtifactKind {
    Comid,
    Coswid,
    Cots,
    Unknown,
}

/// Identifier-to-kind table consulted by [`ArtifactKind::classify`].
const REGISTRY: &[(TagIdentifier, ArtifactKind)] = &[
    (COMID_TAG, ArtifactKind::Comid),
    (COSWID_TAG, ArtifactKind::Coswid),
    (COTS_TAG, ArtifactKind::Cots),
];

impl ArtifactKind {
    /// Classify an identifier. Total: unrecognized identifiers classify as
    /// [`ArtifactKind::Unknown`] rather than erroring.
    pub fn classify(identifier: TagIdentifier) -> Self {
        REGISTRY
            .iter()
            .find_map(|(id, kind)| (*id == identifier).then_some(*kind))
            .unwrap_or(ArtifactKind::Unknown)
    }

    /// The registered identifier for this kind, if it has one.
    pub fn identifier(&self) -> Option<TagIdentifier> {
        REGISTRY
            .iter()
            .find_map(|(id, kind)| (kind == self).then_some(*id))
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Comid => "CoMID",
            Self::Coswid => "CoSWID",
            Self::Cots => "CoTS",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One embedded artifact: an identifier prefix followed by its CBOR payload.
///
/// Stored raw so that a manifest holding a malformed entry can still be
/// decoded and inspected; splitting into identifier and payload happens
/// lazily and is where the minimum-length check lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag(Bytes);

impl Tag {
    /// Compose a tag entry from an identifier and a validated payload.
    pub fn new(identifier: TagIdentifier, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(TAG_ID_LEN + payload.len());
        bytes.extend_from_slice(identifier.as_bytes());
        bytes.extend_from_slice(payload);
        Self(Bytes(bytes))
    }

    /// Wrap raw bytes as decoded from a manifest. No length check is made
    /// here; see [`Tag::split`].
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into identifier and payload, or `None` for entries shorter
    /// than [`MIN_TAG_LEN`].
    pub fn split(&self) -> Option<(TagIdentifier, &[u8])> {
        if self.len() < MIN_TAG_LEN {
            return None;
        }
        let bytes = self.as_bytes();
        let mut identifier = [0u8; TAG_ID_LEN];
        identifier.copy_from_slice(&bytes[..TAG_ID_LEN]);
        Some((TagIdentifier(identifier), &bytes[TAG_ID_LEN..]))
    }

    /// Kind of this entry per the registry; short entries are `Unknown`.
    pub fn kind(&self) -> ArtifactKind {
        self.split()
            .map(|(id, _)| ArtifactKind::classify(id))
            .unwrap_or(ArtifactKind::Unknown)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Bytes::deserialize(deserializer).map(Self)
    }
}
