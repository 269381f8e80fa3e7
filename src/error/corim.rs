// SPDX-License-Identifier: MIT

use crate::error::CoreError;

#[derive(Debug)]
pub enum CorimError {
    Core(CoreError),
    /// The JSON template could not be decoded.
    Template(String),
    /// The manifest id is unset or empty.
    EmptyId,
    /// The manifest carries no tags.
    NoTags,
    /// A stored tag is shorter than the tag identifier plus one payload byte.
    TagTooShort(usize, usize),
    /// Neither the signed nor the unsigned decode attempt succeeded; carries
    /// the error from the second (unsigned) attempt.
    SignedOrUnsigned(Box<CorimError>),
}

impl std::error::Error for CorimError {}

impl std::fmt::Display for CorimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core(err) => write!(f, "{err}"),
            Self::Template(msg) => write!(f, "invalid JSON template: {msg}"),
            Self::EmptyId => write!(f, "empty id"),
            Self::NoTags => write!(f, "no tags"),
            Self::TagTooShort(index, len) => {
                write!(f, "tag at index {index} is too short ({len} bytes)")
            }
            Self::SignedOrUnsigned(err) => {
                write!(f, "neither a signed nor an unsigned CoRIM: {err}")
            }
        }
    }
}

impl From<CoreError> for CorimError {
    fn from(value: CoreError) -> Self {
        Self::Core(value)
    }
}
