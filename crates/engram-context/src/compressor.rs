// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic compression: reduce a passage to its highest-value sentences
//! under a token budget, as opposed to blind truncation.
//!
//! Sentences are scored by surface heuristics (length, question words,
//! code markers, query keywords, proper nouns), greedily selected in
//! descending score order, then restored to their original relative order
//! so the compressed passage still reads coherently. If sentence-level
//! compression cannot produce output, a character-based truncation with
//! sentence-boundary preference is the fallback.

use std::collections::BTreeSet;

use engram_config::CompressionConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tokens::{CHARS_PER_TOKEN, estimate_tokens};

/// Base bonus for a sentence long enough to carry substance.
const LENGTH_BONUS: f64 = 0.2;
const LONG_SENTENCE_CHARS: usize = 50;

/// Bonus for containing a question word.
const QUESTION_BONUS: f64 = 0.2;

/// Bonus for looking like code.
const CODE_BONUS: f64 = 0.3;

/// Maximum bonus from query keyword coverage, scaled by the fraction hit.
const KEYWORD_BONUS: f64 = 0.3;

/// Per-token bonus for capitalized proper-noun tokens, with a cap.
const PROPER_NOUN_BONUS: f64 = 0.05;
const PROPER_NOUN_CAP: f64 = 0.15;

/// Sentences scoring above this are reported as important.
const IMPORTANT_SENTENCE_THRESHOLD: f64 = 0.8;

const QUESTION_WORDS: [&str; 6] = ["what", "how", "why", "when", "where", "who"];
const CODE_MARKERS: [&str; 4] = ["```", "function", "const", "import"];

/// How a context snippet was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionTechnique {
    /// Selection alone fit the budget; nothing was compressed.
    SelectiveOnly,
    /// Sentence-level compression ran.
    SemanticCompression,
    /// Compression failed internally; character truncation was used.
    FallbackTruncation,
    /// Nothing was selected at all.
    Empty,
}

impl CompressionTechnique {
    /// Stable wire string for persistence and telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionTechnique::SelectiveOnly => "selective-only",
            CompressionTechnique::SemanticCompression => "semantic-compression",
            CompressionTechnique::FallbackTruncation => "fallback-truncation",
            CompressionTechnique::Empty => "empty",
        }
    }
}

/// A token-budgeted context snippet, ready for prompt assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedContext {
    pub content: String,
    pub original_tokens: usize,
    pub compressed_tokens: usize,
    /// `compressed_tokens / original_tokens`; 1.0 when nothing was cut.
    pub compression_ratio: f64,
    /// Entities surviving in the output, extracted heuristically.
    pub preserved_entities: Vec<String>,
    /// Retained sentences with the highest heuristic scores.
    pub important_sentences: Vec<String>,
    pub technique: CompressionTechnique,
}

impl CompressedContext {
    /// An empty context: nothing selected, nothing compressed.
    pub fn empty() -> Self {
        Self {
            content: String::new(),
            original_tokens: 0,
            compressed_tokens: 0,
            compression_ratio: 1.0,
            preserved_entities: Vec::new(),
            important_sentences: Vec::new(),
            technique: CompressionTechnique::Empty,
        }
    }
}

/// Sentence-level greedy compression under a token budget.
pub struct SemanticCompressor {
    config: CompressionConfig,
}

impl SemanticCompressor {
    /// Creates a compressor with the given settings.
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Compress `content` to at most `target_tokens`, biased toward
    /// sentences relevant to `query_context`.
    ///
    /// The caller is expected to have already reduced the budget by the
    /// reserved buffer; the output token estimate never exceeds
    /// `target_tokens`.
    pub fn compress(
        &self,
        content: &str,
        query_context: &str,
        target_tokens: usize,
    ) -> CompressedContext {
        match self.compress_inner(content, query_context, target_tokens) {
            Some(context) => context,
            None => {
                warn!(target_tokens, "sentence compression produced no output, truncating");
                self.fallback_truncate(content, target_tokens)
            }
        }
    }

    fn compress_inner(
        &self,
        content: &str,
        query_context: &str,
        target_tokens: usize,
    ) -> Option<CompressedContext> {
        let sentences = split_sentences(content, self.config.min_sentence_chars);
        if sentences.is_empty() {
            return None;
        }

        let keywords = keywords(query_context);
        let scores: Vec<f64> = sentences
            .iter()
            .map(|s| sentence_score(s, &keywords))
            .collect();

        // Greedy pick in descending score order (ties keep source order),
        // accounting for the join separator so the estimate of the final
        // output stays within the target.
        let mut order: Vec<usize> = (0..sentences.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut picked: Vec<usize> = Vec::new();
        let mut used_chars = 0usize;
        for idx in order {
            let sentence_chars = sentences[idx].chars().count();
            let extra = if picked.is_empty() {
                sentence_chars
            } else {
                sentence_chars + 1
            };
            if (used_chars + extra).div_ceil(CHARS_PER_TOKEN) <= target_tokens {
                used_chars += extra;
                picked.push(idx);
            }
        }
        if picked.is_empty() {
            return None;
        }

        // Restore original relative order before joining.
        picked.sort_unstable();
        let content_out = picked
            .iter()
            .map(|&i| sentences[i].as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let important_sentences = picked
            .iter()
            .filter(|&&i| scores[i] > IMPORTANT_SENTENCE_THRESHOLD)
            .map(|&i| sentences[i].clone())
            .collect();

        let original_tokens = estimate_tokens(content);
        let compressed_tokens = estimate_tokens(&content_out);
        Some(CompressedContext {
            preserved_entities: extract_entities(&content_out),
            important_sentences,
            compression_ratio: ratio(compressed_tokens, original_tokens),
            content: content_out,
            original_tokens,
            compressed_tokens,
            technique: CompressionTechnique::SemanticCompression,
        })
    }

    /// Character-based truncation: cut at the token budget, preferring the
    /// nearest preceding sentence boundary when it is not too far back.
    fn fallback_truncate(&self, content: &str, target_tokens: usize) -> CompressedContext {
        let original_tokens = estimate_tokens(content);
        let limit_chars = target_tokens.saturating_mul(CHARS_PER_TOKEN);
        let chars: Vec<char> = content.chars().collect();

        let truncated: String = if chars.len() <= limit_chars {
            content.to_string()
        } else {
            let boundary = chars[..limit_chars]
                .iter()
                .rposition(|c| matches!(c, '.' | '!' | '?'));
            match boundary {
                // Keep the boundary cut only if it preserves at least 80%
                // of the target length.
                Some(pos) if pos + 1 >= limit_chars * 4 / 5 => {
                    chars[..=pos].iter().collect()
                }
                _ => {
                    let mut hard: String =
                        chars[..limit_chars.saturating_sub(1)].iter().collect();
                    hard.push('…');
                    hard
                }
            }
        };

        let compressed_tokens = estimate_tokens(&truncated);
        CompressedContext {
            preserved_entities: extract_entities(&truncated),
            important_sentences: Vec::new(),
            compression_ratio: ratio(compressed_tokens, original_tokens),
            content: truncated,
            original_tokens,
            compressed_tokens,
            technique: CompressionTechnique::FallbackTruncation,
        }
    }
}

fn ratio(compressed: usize, original: usize) -> f64 {
    if original == 0 {
        1.0
    } else {
        compressed as f64 / original as f64
    }
}

/// Split on sentence terminators, keeping the terminator with its
/// sentence and discarding fragments below the minimum length.
fn split_sentences(content: &str, min_chars: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut push = |buf: &mut String, sentences: &mut Vec<String>| {
        let trimmed = buf.trim();
        if trimmed.chars().count() >= min_chars {
            sentences.push(trimmed.to_string());
        }
        buf.clear();
    };

    for c in content.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            push(&mut current, &mut sentences);
        }
    }
    push(&mut current, &mut sentences);
    sentences
}

/// Heuristic value of one sentence, capped at 1.0.
fn sentence_score(text: &str, query_keywords: &BTreeSet<String>) -> f64 {
    let mut score = 0.0;
    let lower = text.to_lowercase();

    if text.chars().count() >= LONG_SENTENCE_CHARS {
        score += LENGTH_BONUS;
    }

    if lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| QUESTION_WORDS.contains(&token))
    {
        score += QUESTION_BONUS;
    }

    if CODE_MARKERS.iter().any(|marker| lower.contains(marker)) {
        score += CODE_BONUS;
    }

    if !query_keywords.is_empty() {
        let hits = query_keywords
            .iter()
            .filter(|keyword| lower.contains(keyword.as_str()))
            .count();
        score += KEYWORD_BONUS * hits as f64 / query_keywords.len() as f64;
    }

    let proper_nouns = text
        .split_whitespace()
        .skip(1) // sentence-initial capitalization is not a signal
        .filter(|token| token.chars().next().is_some_and(char::is_uppercase))
        .count();
    score += (PROPER_NOUN_BONUS * proper_nouns as f64).min(PROPER_NOUN_CAP);

    score.min(1.0)
}

/// Lowercased query keywords of at least three characters.
fn keywords(query: &str) -> BTreeSet<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 3)
        .map(str::to_string)
        .collect()
}

/// Lightweight entity extraction: runs of capitalized words and
/// email-like tokens, deduplicated in order of appearance.
fn extract_entities(text: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    let mut flush = |run: &mut Vec<&str>, entities: &mut Vec<String>| {
        if !run.is_empty() {
            let entity = run.join(" ");
            if !entities.contains(&entity) {
                entities.push(entity);
            }
            run.clear();
        }
    };

    for raw in text.split_whitespace() {
        let token = raw
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '@' && c != '.')
            .trim_end_matches('.');
        if token.is_empty() {
            flush(&mut run, &mut entities);
            continue;
        }
        if looks_like_email(token) {
            flush(&mut run, &mut entities);
            if !entities.contains(&token.to_string()) {
                entities.push(token.to_string());
            }
        } else if token.chars().next().is_some_and(char::is_uppercase)
            && token.chars().count() >= 2
        {
            run.push(token);
        } else {
            flush(&mut run, &mut entities);
        }
    }
    flush(&mut run, &mut entities);
    entities
}

fn looks_like_email(token: &str) -> bool {
    token
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
}
