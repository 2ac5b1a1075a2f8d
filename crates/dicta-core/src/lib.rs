//! Dictionary layer for a predictive keyboard: probability values, n-gram
//! contexts, the `Dictionary` capability and its read-only, dynamic and
//! decorating implementations.

pub mod dict;
pub mod locale;
pub mod ngram;
pub mod personalization;
pub mod probability;
pub mod settings;
pub mod unicode;

/// Longest word, in code points, a dynamic dictionary accepts.
pub const DICTIONARY_MAX_WORD_LENGTH: usize = 48;
