// SPDX-License-Identifier: MIT

//! The COSE_Sign1 signing envelope.
//!
//! ```text
//! COSE-Sign1-corim = [
//!   protected: bstr .cbor protected-corim-header-map
//!   unprotected: unprotected-corim-header-map
//!   payload: bstr .cbor tagged-unsigned-corim-map
//!   signature: bstr
//! ]
//! ```
//!
//! The protected header carries the algorithm, the content type and the
//! corim-meta map; an optional certificate chain rides the unprotected
//! `x5chain` parameter. Verification always recomputes the signature input
//! from the protected and payload byte strings exactly as decoded, never
//! from a re-encode.

use ciborium::Value;
use openssl::x509::X509;

use crate::core::{self, Bytes};
use crate::corim::{UnsignedCorim, CORIM_MAP_CBOR_TAG};
use crate::error::{CertError, CoseError, Error};
use crate::keys::{CoseAlgorithm, SigningKey, VerifyingKey};
use crate::meta::Meta;

/// CBOR tag number for COSE_Sign1 (RFC 9052).
pub const COSE_SIGN1_CBOR_TAG: u64 = 18;

/// Content type carried in the protected header.
pub const CORIM_CONTENT_TYPE: &str = "application/rim+cbor";

const HDR_ALG: u64 = 1;
const HDR_CONTENT_TYPE: u64 = 3;
const HDR_CORIM_META: u64 = 8;
const HDR_X5CHAIN: u64 = 33;

/// Certificate material embedded alongside a signature: one leaf, zero or
/// more intermediates, all DER. Intermediates are only meaningful behind a
/// leaf; the attach operations enforce that.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CertChain {
    pub leaf: Bytes,
    pub intermediates: Vec<Bytes>,
}

/// A manifest bound to signer metadata, as signed or to be signed.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedCorim {
    pub meta: Meta,
    pub unsigned_corim: UnsignedCorim,
    pub chain: Option<CertChain>,
    pub signature: Bytes,
    /// Algorithm declared by a decoded envelope.
    alg: Option<i64>,
    /// Exact protected-header and payload byte strings of a decoded
    /// envelope; the signature was computed over these.
    protected: Bytes,
    payload: Bytes,
}

impl SignedCorim {
    pub fn new(meta: Meta, unsigned_corim: UnsignedCorim) -> Self {
        Self {
            meta,
            unsigned_corim,
            chain: None,
            signature: Bytes::default(),
            alg: None,
            protected: Bytes::default(),
            payload: Bytes::default(),
        }
    }

    /// Algorithm declared in the protected header of a decoded envelope.
    pub fn algorithm(&self) -> Option<i64> {
        self.alg
    }

    /// Attach the signing (leaf) certificate. The DER must parse.
    pub fn add_signing_cert(&mut self, der: &[u8]) -> Result<&mut Self, CertError> {
        X509::from_der(der).map_err(|e| CertError::Leaf(e.to_string()))?;
        let chain = self.chain.get_or_insert_with(CertChain::default);
        chain.leaf = Bytes::from(der);
        Ok(self)
    }

    /// Attach intermediate certificates. A signing certificate must already
    /// be attached, and every entry must parse independently.
    pub fn add_intermediate_certs(&mut self, ders: &[Vec<u8>]) -> Result<&mut Self, CertError> {
        let chain = match &mut self.chain {
            Some(chain) if !chain.leaf.is_empty() => chain,
            _ => return Err(CertError::IntermediatesWithoutLeaf),
        };
        for (index, der) in ders.iter().enumerate() {
            X509::from_der(der).map_err(|e| CertError::Intermediate(index, e.to_string()))?;
            chain.intermediates.push(Bytes::from(der.as_slice()));
        }
        Ok(self)
    }

    /// Sign the (meta, manifest) pair, producing the serialized envelope.
    ///
    /// Preconditions are checked in order and any failure aborts with no
    /// partial output: meta validity, manifest validity, then the whole
    /// certificate chain including leaf/key consistency. The key itself is
    /// not retained; only the algorithm its curve implies and the resulting
    /// signature are.
    pub fn sign(&mut self, key: &SigningKey) -> crate::Result<Vec<u8>> {
        self.meta.valid().map_err(Error::from)?;
        self.unsigned_corim.valid().map_err(Error::from)?;
        if let Some(chain) = &self.chain {
            validate_chain(chain, key)?;
        }

        let alg = key.algorithm();
        let protected_map = Value::Map(vec![
            (core::int(HDR_ALG as i64), core::int(alg.value())),
            (
                core::int(HDR_CONTENT_TYPE as i64),
                core::text(CORIM_CONTENT_TYPE),
            ),
            (core::int(HDR_CORIM_META as i64), self.meta.to_cbor_value()),
        ]);
        let protected = core::write_value(&protected_map).map_err(Error::from)?;

        let payload_value = Value::Tag(
            CORIM_MAP_CBOR_TAG,
            Box::new(self.unsigned_corim.to_cbor_value()),
        );
        let payload = core::write_value(&payload_value).map_err(Error::from)?;

        let to_be_signed = sig_structure(&protected, &payload).map_err(Error::from)?;
        let signature = key.sign(&to_be_signed).map_err(Error::from)?;

        let envelope = Value::Tag(
            COSE_SIGN1_CBOR_TAG,
            Box::new(Value::Array(vec![
                Value::Bytes(protected.clone()),
                unprotected_header(&self.chain),
                Value::Bytes(payload.clone()),
                Value::Bytes(signature.clone()),
            ])),
        );
        let buf = core::write_value(&envelope).map_err(Error::from)?;

        self.alg = Some(alg.value());
        self.protected = Bytes(protected);
        self.payload = Bytes(payload);
        self.signature = Bytes(signature);
        Ok(buf)
    }

    /// Best-effort decode of a serialized envelope. Callers use the failure
    /// as a discriminator between signed and unsigned framing, so every
    /// structural defect is reported, none panics.
    pub fn from_cose(buf: &[u8]) -> Result<Self, CoseError> {
        let value = match core::read_value(buf)? {
            Value::Tag(COSE_SIGN1_CBOR_TAG, inner) => *inner,
            Value::Tag(tag, _) => {
                return Err(CoseError::MalformedEnvelope(format!(
                    "unexpected CBOR tag {tag}"
                )))
            }
            value => value,
        };

        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(CoseError::MalformedEnvelope(format!(
                    "expected array (CBOR Major Type 4), found Major Type {}",
                    core::major_type(&other)
                )))
            }
        };
        if items.len() != 4 {
            return Err(CoseError::MalformedEnvelope(format!(
                "COSE_Sign1 must have 4 elements, found {}",
                items.len()
            )));
        }

        let protected_bytes = core::as_bytes(&items[0])
            .map_err(|e| CoseError::MalformedEnvelope(format!("protected header: {e}")))?;
        let protected_value = core::read_value(protected_bytes)
            .map_err(|e| CoseError::MalformedEnvelope(format!("protected header: {e}")))?;
        let protected_map = core::as_map(&protected_value)
            .map_err(|e| CoseError::MalformedEnvelope(format!("protected header: {e}")))?;

        let alg = core::map_get(protected_map, HDR_ALG)
            .ok_or_else(|| {
                CoseError::MalformedEnvelope(
                    "missing mandatory header parameter \"Alg\" (1)".to_owned(),
                )
            })
            .and_then(|v| {
                core::as_i64(v)
                    .map_err(|e| CoseError::MalformedEnvelope(format!("algorithm: {e}")))
            })?;

        let meta = core::map_get(protected_map, HDR_CORIM_META)
            .ok_or_else(|| {
                CoseError::MalformedEnvelope(
                    "missing mandatory header parameter \"CorimMeta\" (8)".to_owned(),
                )
            })
            .and_then(|v| {
                Meta::from_cbor_value(v)
                    .map_err(|e| CoseError::MalformedEnvelope(format!("corim-meta: {e}")))
            })?;

        let unprotected_map = core::as_map(&items[1])
            .map_err(|e| CoseError::MalformedEnvelope(format!("unprotected header: {e}")))?;
        let chain = match core::map_get(unprotected_map, HDR_X5CHAIN) {
            Some(value) => Some(decode_x5chain(value)?),
            None => None,
        };

        let payload_bytes = core::as_bytes(&items[2])
            .map_err(|e| CoseError::MalformedEnvelope(format!("payload: {e}")))?;
        let unsigned_corim = UnsignedCorim::from_cbor(payload_bytes)
            .map_err(|e| CoseError::MalformedEnvelope(format!("payload: {e}")))?;

        let signature = core::as_bytes(&items[3])
            .map_err(|e| CoseError::MalformedEnvelope(format!("signature: {e}")))?;

        Ok(Self {
            meta,
            unsigned_corim,
            chain,
            signature: Bytes::from(signature),
            alg: Some(alg),
            protected: Bytes::from(protected_bytes),
            payload: Bytes::from(payload_bytes),
        })
    }

    /// Check the embedded signature against a trusted key.
    pub fn verify(&self, key: &VerifyingKey) -> Result<(), CoseError> {
        let declared = self.alg.ok_or_else(|| {
            CoseError::MalformedEnvelope("envelope carries no algorithm".to_owned())
        })?;
        let alg = CoseAlgorithm::from_value(declared)
            .ok_or(CoseError::UnsupportedAlgorithm(declared))?;

        let to_be_signed = sig_structure(&self.protected, &self.payload)?;
        if key.verify(alg, &self.signature, &to_be_signed)? {
            Ok(())
        } else {
            Err(CoseError::SignatureMismatch)
        }
    }
}

/// Sig_structure for COSE_Sign1 with no external data (RFC 9052 §4.4).
fn sig_structure(protected: &[u8], payload: &[u8]) -> Result<Vec<u8>, crate::error::CoreError> {
    core::write_value(&Value::Array(vec![
        core::text("Signature1"),
        Value::Bytes(protected.to_vec()),
        Value::Bytes(Vec::new()),
        Value::Bytes(payload.to_vec()),
    ]))
}

fn unprotected_header(chain: &Option<CertChain>) -> Value {
    let Some(chain) = chain else {
        return Value::Map(Vec::new());
    };

    let x5chain = if chain.intermediates.is_empty() {
        Value::Bytes(chain.leaf.0.clone())
    } else {
        let mut certs = Vec::with_capacity(1 + chain.intermediates.len());
        certs.push(Value::Bytes(chain.leaf.0.clone()));
        certs.extend(
            chain
                .intermediates
                .iter()
                .map(|der| Value::Bytes(der.0.clone())),
        );
        Value::Array(certs)
    };
    Value::Map(vec![(core::int(HDR_X5CHAIN as i64), x5chain)])
}

fn decode_x5chain(value: &Value) -> Result<CertChain, CoseError> {
    match value {
        Value::Bytes(leaf) => Ok(CertChain {
            leaf: Bytes(leaf.clone()),
            intermediates: Vec::new(),
        }),
        Value::Array(certs) if !certs.is_empty() => {
            let mut chain = CertChain::default();
            for (index, cert) in certs.iter().enumerate() {
                let der = core::as_bytes(cert)
                    .map(Bytes::from)
                    .map_err(|e| CoseError::MalformedEnvelope(format!("x5chain: {e}")))?;
                if index == 0 {
                    chain.leaf = der;
                } else {
                    chain.intermediates.push(der);
                }
            }
            Ok(chain)
        }
        other => Err(CoseError::MalformedEnvelope(format!(
            "x5chain: expected byte string or array, found Major Type {}",
            core::major_type(other)
        ))),
    }
}

fn validate_chain(chain: &CertChain, key: &SigningKey) -> crate::Result<()> {
    if chain.leaf.is_empty() {
        if chain.intermediates.is_empty() {
            return Ok(());
        }
        return Err(CertError::IntermediatesWithoutLeaf.into());
    }

    let leaf =
        X509::from_der(&chain.leaf).map_err(|e| Error::from(CertError::Leaf(e.to_string())))?;
    let leaf_key = leaf
        .public_key()
        .map_err(|e| Error::from(CertError::Leaf(e.to_string())))?;
    let key_pkey = key.public_pkey().map_err(Error::from)?;
    if !leaf_key.public_eq(&key_pkey) {
        return Err(CertError::KeyMismatch.into());
    }

    for (index, der) in chain.intermediates.iter().enumerate() {
        X509::from_der(der)
            .map_err(|e| Error::from(CertError::Intermediate(index, e.to_string())))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetaError;
    use crate::keys::EcCurve;
    use crate::test::{
        corim_fixture, generated_jwk, jwk_with_cert, meta_fixture, self_signed_cert,
    };

    fn signing_key(curve: EcCurve) -> SigningKey {
        let (private_jwk, _) = generated_jwk(curve);
        SigningKey::from_jwk(private_jwk.as_bytes()).unwrap()
    }

    #[test]
    fn sign_then_verify_round_trip() {
        let key = signing_key(EcCurve::P256);
        let mut signed = SignedCorim::new(meta_fixture(), corim_fixture());
        let buf = signed.sign(&key).unwrap();

        let decoded = SignedCorim::from_cose(&buf).unwrap();
        assert_eq!(decoded.meta, signed.meta);
        assert_eq!(decoded.unsigned_corim, signed.unsigned_corim);
        assert_eq!(decoded.algorithm(), Some(CoseAlgorithm::ES256.value()));

        decoded.verify(&key.verifying_key().unwrap()).unwrap();
    }

    #[test]
    fn verify_rejects_a_different_key() {
        let key = signing_key(EcCurve::P256);
        let mut signed = SignedCorim::new(meta_fixture(), corim_fixture());
        let buf = signed.sign(&key).unwrap();

        let other = signing_key(EcCurve::P256);
        let err = SignedCorim::from_cose(&buf)
            .unwrap()
            .verify(&other.verifying_key().unwrap())
            .unwrap_err();
        assert!(matches!(err, CoseError::SignatureMismatch));
    }

    #[test]
    fn verify_rejects_a_flipped_signature_bit() {
        let key = signing_key(EcCurve::P384);
        let mut signed = SignedCorim::new(meta_fixture(), corim_fixture());
        let buf = signed.sign(&key).unwrap();

        let mut decoded = SignedCorim::from_cose(&buf).unwrap();
        decoded.signature.0[0] ^= 0x01;
        let err = decoded.verify(&key.verifying_key().unwrap()).unwrap_err();
        assert!(matches!(err, CoseError::SignatureMismatch));
    }

    #[test]
    fn verify_rejects_an_unknown_algorithm() {
        let meta = meta_fixture();
        let protected = core::write_value(&Value::Map(vec![
            (core::int(1), core::int(-8)), // EdDSA: declared but not implemented
            (core::int(3), core::text(CORIM_CONTENT_TYPE)),
            (core::int(8), meta.to_cbor_value()),
        ]))
        .unwrap();
        let payload = core::write_value(&Value::Tag(
            CORIM_MAP_CBOR_TAG,
            Box::new(corim_fixture().to_cbor_value()),
        ))
        .unwrap();
        let envelope = core::write_value(&Value::Tag(
            COSE_SIGN1_CBOR_TAG,
            Box::new(Value::Array(vec![
                Value::Bytes(protected),
                Value::Map(Vec::new()),
                Value::Bytes(payload),
                Value::Bytes(vec![0u8; 64]),
            ])),
        ))
        .unwrap();

        let key = signing_key(EcCurve::P256);
        let err = SignedCorim::from_cose(&envelope)
            .unwrap()
            .verify(&key.verifying_key().unwrap())
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported algorithm -8");
    }

    #[test]
    fn intermediates_require_a_signing_cert() {
        let key = signing_key(EcCurve::P256);
        let (_, cert) = jwk_with_cert(EcCurve::P256);

        let mut signed = SignedCorim::new(meta_fixture(), corim_fixture());
        let err = signed.add_intermediate_certs(&[cert]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot add intermediate certificates without a signing certificate"
        );

        // The same precondition holds on a hand-assembled chain at sign time.
        let mut signed = SignedCorim::new(meta_fixture(), corim_fixture());
        signed.chain = Some(CertChain {
            leaf: Bytes::default(),
            intermediates: vec![Bytes(vec![0x30, 0x03])],
        });
        let err = signed.sign(&key).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot add intermediate certificates without a signing certificate"
        );
    }

    #[test]
    fn invalid_leaf_der_is_rejected() {
        let mut signed = SignedCorim::new(meta_fixture(), corim_fixture());
        let err = signed
            .add_signing_cert(&[0x30, 0x03, 0x02, 0x01, 0x01])
            .unwrap_err();
        assert!(matches!(err, CertError::Leaf(_)));
    }

    #[test]
    fn chain_rides_the_unprotected_header() {
        let (private_jwk, cert) = jwk_with_cert(EcCurve::P256);
        let key = SigningKey::from_jwk(private_jwk.as_bytes()).unwrap();

        let mut signed = SignedCorim::new(meta_fixture(), corim_fixture());
        signed.add_signing_cert(&cert).unwrap();
        signed.add_intermediate_certs(&[cert.clone()]).unwrap();
        let buf = signed.sign(&key).unwrap();

        let decoded = SignedCorim::from_cose(&buf).unwrap();
        let chain = decoded.chain.as_ref().unwrap();
        assert_eq!(chain.leaf.0, cert);
        assert_eq!(chain.intermediates.len(), 1);
        decoded.verify(&key.verifying_key().unwrap()).unwrap();
    }

    #[test]
    fn leaf_must_match_the_signing_key() {
        let key = signing_key(EcCurve::P256);
        let stranger = signing_key(EcCurve::P256);
        let cert = self_signed_cert(&stranger);

        let mut signed = SignedCorim::new(meta_fixture(), corim_fixture());
        signed.add_signing_cert(&cert).unwrap();
        let err = signed.sign(&key).unwrap_err();
        assert_eq!(
            err.to_string(),
            "signing certificate public key does not match the signing key"
        );
    }

    #[test]
    fn sign_checks_meta_first() {
        let key = signing_key(EcCurve::P256);
        let mut meta = meta_fixture();
        meta.signer.name.clear();

        let mut signed = SignedCorim::new(meta, corim_fixture());
        let err = signed.sign(&key).unwrap_err();
        assert!(matches!(
            err,
            Error::Meta(MetaError::EmptySignerName)
        ));
    }

    #[test]
    fn sign_rejects_an_empty_manifest() {
        let key = signing_key(EcCurve::P256);
        let mut corim = corim_fixture();
        corim.tags.clear();

        let mut signed = SignedCorim::new(meta_fixture(), corim);
        let err = signed.sign(&key).unwrap_err();
        assert_eq!(err.to_string(), "no tags");
    }
}
