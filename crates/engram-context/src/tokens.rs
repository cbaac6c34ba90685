// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token estimation shared by selection and compression.

/// Average characters per model token used throughout the engine.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the model token count of a text as `ceil(chars / 4)`.
///
/// Deliberately cheap and deterministic; the reserved budget buffer
/// absorbs the estimation error.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}
