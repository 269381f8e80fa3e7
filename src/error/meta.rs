// SPDX-License-Identifier: MIT

use crate::error::CoreError;

#[derive(Debug, PartialEq, Eq)]
pub enum MetaError {
    Core(CoreError),
    /// The JSON meta document could not be decoded.
    Json(String),
    /// The signer name is unset or empty.
    EmptySignerName,
}

impl std::error::Error for MetaError {}

impl std::fmt::Display for MetaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core(err) => write!(f, "{err}"),
            Self::Json(msg) => write!(f, "invalid JSON meta: {msg}"),
            Self::EmptySignerName => write!(f, "invalid signer: empty name"),
        }
    }
}

impl From<CoreError> for MetaError {
    fn from(value: CoreError) -> Self {
        Self::Core(value)
    }
}
