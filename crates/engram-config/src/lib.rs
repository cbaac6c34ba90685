// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Engram memory engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides. Every threshold and weight the engine consults is an
//! explicit configuration value with a documented default, never a hidden
//! constant inside the decision code.
//!
//! # Usage
//!
//! ```no_run
//! use engram_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! assert!(config.dedup.duplicate_threshold > config.dedup.merge_threshold);
//! ```

pub mod error;
pub mod loader;
pub mod model;
pub mod validation;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{CompressionConfig, DedupConfig, EngramConfig, SelectionConfig, SelectionWeights};
pub use validation::validate_config;

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<EngramConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![err.into()]),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<EngramConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![err.into()]),
    }
}
