// SPDX-License-Identifier: MIT

#[derive(Debug, PartialEq, Eq)]
pub enum CertError {
    /// The signing certificate is not a valid DER certificate.
    Leaf(String),
    /// An intermediate certificate is not a valid DER certificate.
    Intermediate(usize, String),
    /// Intermediates were supplied but no signing certificate is attached.
    IntermediatesWithoutLeaf,
    /// The signing certificate's public key does not belong to the signing key.
    KeyMismatch,
}

impl std::error::Error for CertError {}

impl std::fmt::Display for CertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf(msg) => write!(f, "invalid signing certificate: {msg}"),
            Self::Intermediate(index, msg) => {
                write!(f, "invalid intermediate certificate at index {index}: {msg}")
            }
            Self::IntermediatesWithoutLeaf => write!(
                f,
                "cannot add intermediate certificates without a signing certificate"
            ),
            Self::KeyMismatch => write!(
                f,
                "signing certificate public key does not match the signing key"
            ),
        }
    }
}
