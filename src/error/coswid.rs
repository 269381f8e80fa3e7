// SPDX-License-Identifier: MIT

use crate::error::CoreError;

#[derive(Debug, PartialEq, Eq)]
pub enum CoswidError {
    Core(CoreError),
    /// A mandatory CoSWID field is absent; only the first is ever reported.
    MissingMandatoryField(&'static str, u64),
}

impl std::error::Error for CoswidError {}

impl std::fmt::Display for CoswidError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core(err) => write!(f, "{err}"),
            Self::MissingMandatoryField(name, key) => {
                write!(f, "missing mandatory field \"{name}\" ({key})")
            }
        }
    }
}

impl From<CoreError> for CoswidError {
    fn from(value: CoreError) -> Self {
        Self::Core(value)
    }
}
