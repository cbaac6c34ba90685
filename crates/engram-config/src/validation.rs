// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as threshold ordering and weight normalization.

use crate::error::ConfigError;
use crate::model::EngramConfig;

/// Tolerance for the selection weight sum check.
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &EngramConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let dedup = &config.dedup;
    for (name, value) in [
        ("dedup.duplicate_threshold", dedup.duplicate_threshold),
        ("dedup.merge_threshold", dedup.merge_threshold),
        ("dedup.related_threshold", dedup.related_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be in [0, 1], got {value}"),
            });
        }
    }

    if dedup.duplicate_threshold <= dedup.merge_threshold {
        errors.push(ConfigError::Validation {
            message: format!(
                "dedup.duplicate_threshold ({}) must be greater than dedup.merge_threshold ({})",
                dedup.duplicate_threshold, dedup.merge_threshold
            ),
        });
    }

    if dedup.merge_threshold <= dedup.related_threshold {
        errors.push(ConfigError::Validation {
            message: format!(
                "dedup.merge_threshold ({}) must be greater than dedup.related_threshold ({})",
                dedup.merge_threshold, dedup.related_threshold
            ),
        });
    }

    if dedup.max_embed_chars == 0 {
        errors.push(ConfigError::Validation {
            message: "dedup.max_embed_chars must be positive".to_string(),
        });
    }

    if dedup.added_context_ratio < 1.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "dedup.added_context_ratio must be at least 1.0, got {}",
                dedup.added_context_ratio
            ),
        });
    }

    let selection = &config.selection;
    let weight_sum = selection.weights.total();
    if (weight_sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
        errors.push(ConfigError::Validation {
            message: format!("selection.weights must sum to 1.0, got {weight_sum}"),
        });
    }

    if selection.threshold_floor > selection.threshold_ceiling {
        errors.push(ConfigError::Validation {
            message: format!(
                "selection.threshold_floor ({}) must not exceed selection.threshold_ceiling ({})",
                selection.threshold_floor, selection.threshold_ceiling
            ),
        });
    }

    if selection.recency_decay_days <= 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "selection.recency_decay_days must be positive, got {}",
                selection.recency_decay_days
            ),
        });
    }

    if selection.token_budget == 0 {
        errors.push(ConfigError::Validation {
            message: "selection.token_budget must be positive".to_string(),
        });
    }

    let compression = &config.compression;
    if !(compression.budget_ratio > 0.0 && compression.budget_ratio <= 1.0) {
        errors.push(ConfigError::Validation {
            message: format!(
                "compression.budget_ratio must be in (0, 1], got {}",
                compression.budget_ratio
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
