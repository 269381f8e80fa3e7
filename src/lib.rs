// SPDX-License-Identifier: MIT

//! # corim-kit
//!
//! Assembly, signing, verification and inspection of Concise Reference
//! Integrity Manifests (CoRIM).
//!
//! A manifest aggregates tagged endorsement artifacts (CoMID, CoSWID and
//! CoTS payloads, carried opaque) under a common metadata envelope, and is
//! optionally wrapped in a COSE_Sign1 signature envelope with certificate
//! material. CBOR is the wire format throughout; templates, signer metadata
//! and key material arrive as JSON documents.
//!
//! The three workflows:
//!
//! * **create**: [`UnsignedCorim::from_template`], then `add_*` for each
//!   artifact (every add validates first and failed adds change nothing),
//!   then [`UnsignedCorim::valid`] and [`UnsignedCorim::to_cbor`].
//! * **sign / verify**: [`SignedCorim::new`] over a [`Meta`] and a valid
//!   manifest, optional certificate chain, [`SignedCorim::sign`] with a
//!   JWK-derived [`SigningKey`]; [`SignedCorim::from_cose`] and
//!   [`SignedCorim::verify`] on the way back.
//! * **display**: [`display()`] does an ordered-fallback decode (signed
//!   first, then unsigned) and tolerant expansion of the embedded tags.
//!
//! File and network access stay with the caller: every operation here maps
//! complete byte buffers to complete byte buffers.

/// CoMID artifact codec.
pub mod comid;

/// Core types and CBOR helpers used across the crate.
pub mod core;

/// The manifest container and the signed/unsigned type choice.
pub mod corim;

/// The COSE_Sign1 signing envelope.
pub mod cose;

/// CoSWID artifact codec.
pub mod coswid;

/// CoTS (trust-anchor store) artifact codec.
pub mod cots;

/// Inspection rendering.
pub mod display;

/// Per-module errors and the aggregate [`Error`] type.
pub mod error;

/// JWK key material and the ECDSA algorithms.
pub mod keys;

/// Signer metadata.
pub mod meta;

/// Crate-wide [`Result`].
pub mod result;

/// Tag registry and raw tag entries.
pub mod tags;


pub use crate::comid::Comid;
pub use crate::core::{Bytes, Time, ValidityMap};
pub use crate::corim::{Corim, CorimEntity, CorimRole, LocatorMap, UnsignedCorim};
pub use crate::cose::{CertChain, SignedCorim, CORIM_CONTENT_TYPE};
pub use crate::coswid::Coswid;
pub use crate::cots::Cots;
pub use crate::display::{display, display_to_string};
pub use crate::error::Error;
pub use crate::keys::{CoseAlgorithm, EcCurve, SigningKey, VerifyingKey};
pub use crate::meta::{CorimSigner, Meta};
pub use crate::result::Result;
pub use crate::tags::{ArtifactKind, Tag, TagIdentifier, COMID_TAG, COSWID_TAG, COTS_TAG};
