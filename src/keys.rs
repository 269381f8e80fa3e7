// SPDX-License-Identifier: MIT

//! Signing-key material.
//!
//! Keys arrive as JWK documents and are held as openssl EC keys. Only the
//! NIST curves the COSE spec pairs with the ECDSA algorithms are accepted:
//! P-256 with ES256, P-384 with ES384 and P-521 with ES512. Signatures are
//! the raw `r || s` concatenation COSE expects, each component padded to the
//! curve coordinate width.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine as _;
use openssl::{
    bn::{BigNum, BigNumContext},
    ec::{EcGroup, EcKey, EcPoint},
    ecdsa::EcdsaSig,
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private, Public},
    sign::{Signer, Verifier},
};
use serde::Deserialize;

use crate::error::KeyError;

/// COSE signature algorithm identifiers implemented by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum CoseAlgorithm {
    /// ECDSA w/ SHA-256
    ES256 = -7,
    /// ECDSA w/ SHA-384
    ES384 = -35,
    /// ECDSA w/ SHA-512
    ES512 = -36,
}

impl CoseAlgorithm {
    pub fn value(self) -> i64 {
        self as i64
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            -7 => Some(Self::ES256),
            -35 => Some(Self::ES384),
            -36 => Some(Self::ES512),
            _ => None,
        }
    }

    fn digest(self) -> MessageDigest {
        match self {
            Self::ES256 => MessageDigest::sha256(),
            Self::ES384 => MessageDigest::sha384(),
            Self::ES512 => MessageDigest::sha512(),
        }
    }
}

impl fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
        };
        f.write_str(name)
    }
}

/// The elliptic curves paired with the supported algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    fn from_jwk_name(name: &str) -> Option<Self> {
        match name {
            "P-256" => Some(Self::P256),
            "P-384" => Some(Self::P384),
            "P-521" => Some(Self::P521),
            _ => None,
        }
    }

    pub(crate) fn jwk_name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    pub(crate) fn nid(self) -> Nid {
        match self {
            Self::P256 => Nid::X9_62_PRIME256V1,
            Self::P384 => Nid::SECP384R1,
            Self::P521 => Nid::SECP521R1,
        }
    }

    /// Signature algorithm implied by the curve.
    pub fn algorithm(self) -> CoseAlgorithm {
        match self {
            Self::P256 => CoseAlgorithm::ES256,
            Self::P384 => CoseAlgorithm::ES384,
            Self::P521 => CoseAlgorithm::ES512,
        }
    }

    /// Width of one signature component in bytes.
    pub(crate) fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

#[derive(Deserialize)]
struct Jwk {
    #[serde(default)]
    kty: String,
    #[serde(default)]
    crv: String,
    x: Option<String>,
    y: Option<String>,
    d: Option<String>,
}

impl Jwk {
    fn parse(buf: &[u8]) -> Result<Self, KeyError> {
        let jwk: Jwk = serde_json::from_slice(buf).map_err(|e| KeyError::Json(e.to_string()))?;
        if jwk.kty != "EC" {
            return Err(KeyError::InvalidKeyType(jwk.kty));
        }
        Ok(jwk)
    }

    fn curve(&self) -> Result<EcCurve, KeyError> {
        EcCurve::from_jwk_name(&self.crv)
            .ok_or_else(|| KeyError::UnsupportedCurve(self.crv.clone()))
    }

    fn component(&self, name: &'static str) -> Result<BigNum, KeyError> {
        let encoded = match name {
            "x" => &self.x,
            "y" => &self.y,
            _ => &self.d,
        };
        let encoded = encoded.as_ref().ok_or(KeyError::MissingComponent(name))?;
        let bytes = BASE64URL
            .decode(encoded)
            .map_err(|e| KeyError::Encoding(e.to_string()))?;
        Ok(BigNum::from_slice(&bytes)?)
    }
}

/// A private signing key. Holds the key handle only for the duration of
/// the owning operation; the signing envelope never retains it.
pub struct SigningKey {
    curve: EcCurve,
    pkey: PKey<Private>,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Parse an EC private key from a JWK document. The private scalar `d`
    /// is required; the public point is taken from `x`/`y` when present and
    /// derived from the scalar otherwise.
    pub fn from_jwk(buf: &[u8]) -> Result<Self, KeyError> {
        let jwk = Jwk::parse(buf)?;
        let curve = jwk.curve()?;
        let group = EcGroup::from_curve_name(curve.nid())?;
        let mut ctx = BigNumContext::new()?;

        let d = jwk.component("d")?;
        let mut point = EcPoint::new(&group)?;
        if jwk.x.is_some() || jwk.y.is_some() {
            let x = jwk.component("x")?;
            let y = jwk.component("y")?;
            point.set_affine_coordinates_gfp(&group, &x, &y, &mut ctx)?;
        } else {
            point.mul_generator(&group, &d, &ctx)?;
        }

        let ec_key = EcKey::from_private_components(&group, &d, &point)?;
        ec_key.check_key()?;

        Ok(Self {
            curve,
            pkey: PKey::from_ec_key(ec_key)?,
        })
    }

    /// Signature algorithm implied by this key's curve.
    pub fn algorithm(&self) -> CoseAlgorithm {
        self.curve.algorithm()
    }

    /// ECDSA-sign `data`, returning the fixed-width `r || s` form.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        let mut signer = Signer::new(self.algorithm().digest(), &self.pkey)?;
        signer.update(data)?;
        let der = signer.sign_to_vec()?;

        let sig = EcdsaSig::from_der(&der)?;
        let width = self.curve.coordinate_len() as i32;
        let mut out = sig.r().to_vec_padded(width)?;
        out.append(&mut sig.s().to_vec_padded(width)?);
        Ok(out)
    }

    /// The public half of this key.
    pub fn verifying_key(&self) -> Result<VerifyingKey, KeyError> {
        let ec_key = self.pkey.ec_key()?;
        let public = EcKey::from_public_key(ec_key.group(), ec_key.public_key())?;
        Ok(VerifyingKey {
            curve: self.curve,
            pkey: PKey::from_ec_key(public)?,
        })
    }

    pub(crate) fn public_pkey(&self) -> Result<PKey<Public>, KeyError> {
        Ok(self.verifying_key()?.pkey)
    }
}

/// A public verification key.
pub struct VerifyingKey {
    curve: EcCurve,
    pkey: PKey<Public>,
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyingKey")
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

impl VerifyingKey {
    /// Parse an EC public key from a JWK document; `x` and `y` are required.
    pub fn from_jwk(buf: &[u8]) -> Result<Self, KeyError> {
        let jwk = Jwk::parse(buf)?;
        let curve = jwk.curve()?;
        let group = EcGroup::from_curve_name(curve.nid())?;
        let mut ctx = BigNumContext::new()?;

        let x = jwk.component("x")?;
        let y = jwk.component("y")?;
        let mut point = EcPoint::new(&group)?;
        point.set_affine_coordinates_gfp(&group, &x, &y, &mut ctx)?;

        let ec_key = EcKey::from_public_key(&group, &point)?;
        ec_key.check_key()?;

        Ok(Self {
            curve,
            pkey: PKey::from_ec_key(ec_key)?,
        })
    }

    /// Check a raw `r || s` signature over `data`. Returns `Ok(false)` for
    /// a well-formed but non-matching signature; errors are reserved for
    /// broken key material.
    pub fn verify(&self, alg: CoseAlgorithm, sig: &[u8], data: &[u8]) -> Result<bool, KeyError> {
        let width = self.curve.coordinate_len();
        if sig.len() != 2 * width {
            return Ok(false);
        }

        let ecdsa_sig = EcdsaSig::from_private_components(
            BigNum::from_slice(&sig[..width])?,
            BigNum::from_slice(&sig[width..])?,
        )?;

        let mut verifier = Verifier::new(alg.digest(), &self.pkey)?;
        verifier.update(data)?;
        Ok(verifier.verify(&ecdsa_sig.to_der()?)?)
    }
}
