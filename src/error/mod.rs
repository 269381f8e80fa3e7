// SPDX-License-Identifier: MIT

mod cert;
mod comid;
mod core;
mod corim;
mod cose;
mod coswid;
mod cots;
mod key;
mod meta;

pub use self::cert::*;
pub use self::comid::*;
pub use self::core::*;
pub use self::corim::*;
pub use self::cose::*;
pub use self::coswid::*;
pub use self::cots::*;
pub use self::key::*;
pub use self::meta::*;

use derive_more::From;

/// Top-level error, aggregating the per-module error types.
#[derive(Debug, From)]
pub enum Error {
    Core(CoreError),
    Corim(CorimError),
    Comid(ComidError),
    Coswid(CoswidError),
    Cots(CotsError),
    Meta(MetaError),
    Key(KeyError),
    Cert(CertError),
    Cose(CoseError),
    Custom(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core(err) => write!(f, "{err}"),
            Self::Corim(err) => write!(f, "{err}"),
            Self::Comid(err) => write!(f, "{err}"),
            Self::Coswid(err) => write!(f, "{err}"),
            Self::Cots(err) => write!(f, "{err}"),
            Self::Meta(err) => write!(f, "{err}"),
            Self::Key(err) => write!(f, "{err}"),
            Self::Cert(err) => write!(f, "{err}"),
            Self::Cose(err) => write!(f, "{err}"),
            Self::Custom(msg) => write!(f, "{msg}"),
        }
    }
}
