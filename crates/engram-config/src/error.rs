// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error types.

use thiserror::Error;

/// A configuration loading or validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parsing or figment extraction failed.
    #[error("configuration parse error: {0}")]
    Parse(String),

    /// A semantic constraint on the deserialized values was violated.
    #[error("invalid configuration: {message}")]
    Validation { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
