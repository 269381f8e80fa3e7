// SPDX-License-Identifier: MIT

#[derive(Debug, PartialEq, Eq)]
pub enum KeyError {
    /// The JWK document could not be decoded.
    Json(String),
    /// The JWK `kty` is not a supported asymmetric key type.
    InvalidKeyType(String),
    /// The JWK `crv` names a curve this crate does not sign with.
    UnsupportedCurve(String),
    /// A required JWK component (`x`, `y` or `d`) is absent.
    MissingComponent(&'static str),
    /// A JWK component is not valid base64url.
    Encoding(String),
    /// The underlying crypto library rejected the key material.
    Crypto(String),
}

impl std::error::Error for KeyError {}

impl std::fmt::Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "invalid JSON key: {msg}"),
            Self::InvalidKeyType(kty) => write!(f, "invalid key type \"{kty}\""),
            Self::UnsupportedCurve(crv) => write!(f, "unsupported EC curve \"{crv}\""),
            Self::MissingComponent(name) => write!(f, "key missing component \"{name}\""),
            Self::Encoding(msg) => write!(f, "invalid base64url in key component: {msg}"),
            Self::Crypto(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<openssl::error::ErrorStack> for KeyError {
    fn from(value: openssl::error::ErrorStack) -> Self {
        Self::Crypto(value.to_string())
    }
}
