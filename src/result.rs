// SPDX-License-Identifier: MIT

use crate::error::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;
