// SPDX-License-Identifier: MIT

/// Errors shared by every CBOR decode path in the crate.
#[derive(Debug, PartialEq, Eq)]
pub enum CoreError {
    /// Input ended before a complete CBOR item was read.
    UnexpectedEof,
    /// Input is not syntactically valid CBOR.
    MalformedCbor(String),
    /// The top-level item has the wrong CBOR major type.
    UnexpectedType { expected: u8, found: u8 },
    /// A mandatory map key is absent. Carries the field name and its key.
    MissingMandatoryField(&'static str, u64),
}

impl std::error::Error for CoreError {}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected EOF"),
            Self::MalformedCbor(msg) => write!(f, "malformed CBOR: {msg}"),
            Self::UnexpectedType { expected, found } => {
                let name = match expected {
                    2 => "byte string",
                    3 => "text string",
                    4 => "array",
                    5 => "map",
                    _ => "item",
                };
                write!(
                    f,
                    "expected {name} (CBOR Major Type {expected}), found Major Type {found}"
                )
            }
            Self::MissingMandatoryField(name, key) => {
                write!(f, "missing mandatory field \"{name}\" ({key})")
            }
        }
    }
}
