// SPDX-License-Identifier: MIT

use crate::error::{CoreError, KeyError};

#[derive(Debug)]
pub enum CoseError {
    Core(CoreError),
    /// The COSE_Sign1 structure could not be decoded.
    MalformedEnvelope(String),
    /// The declared signature algorithm is not implemented.
    UnsupportedAlgorithm(i64),
    /// The signature does not verify over the protected header and payload.
    SignatureMismatch,
    Key(KeyError),
}

impl std::error::Error for CoseError {}

impl std::fmt::Display for CoseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core(err) => write!(f, "{err}"),
            Self::MalformedEnvelope(msg) => write!(f, "malformed COSE_Sign1 envelope: {msg}"),
            Self::UnsupportedAlgorithm(alg) => write!(f, "unsupported algorithm {alg}"),
            Self::SignatureMismatch => write!(f, "signature mismatch"),
            Self::Key(err) => write!(f, "{err}"),
        }
    }
}

impl From<CoreError> for CoseError {
    fn from(value: CoreError) -> Self {
        Self::Core(value)
    }
}

impl From<KeyError> for CoseError {
    fn from(value: KeyError) -> Self {
        Self::Key(value)
    }
}
