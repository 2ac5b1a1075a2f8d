//! Dictionaries and their shared capability.
//!
//! `BinaryDictionary` is the trie engine every other dictionary builds on.
//! `ReadOnlyBinaryDictionary` serves shipped main dictionaries,
//! `ExpandableBinaryDictionary` backs the dynamic ones (user history, apps,
//! contacts, user-added words) and `KoreanDictionary` decorates any of them.

mod apps;
mod binary;
pub mod clock;
mod contacts;
mod expandable;
pub mod files;
pub mod forgetting;
mod format;
mod header;
mod korean;
pub mod names;
mod read_only;
#[cfg(test)]
mod tests;
mod user;
mod user_history;

pub use apps::AppsBinaryDictionary;
pub use binary::{BinaryDictionary, DictionaryDump, WordProperty};
pub use contacts::ContactsBinaryDictionary;
pub use expandable::{
    DictWriter, DictionaryConfig, DictionaryContent, DictionaryStats, ExpandableBinaryDictionary,
    LoadState, RecreateHandle,
};
pub use format::pack;
pub use header::DictionaryHeader;
pub use korean::KoreanDictionary;
pub use read_only::ReadOnlyBinaryDictionary;
pub use user::UserBinaryDictionary;
pub use user_history::UserHistoryDictionary;

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::locale::Locale;
use crate::ngram::NgramContext;
use crate::probability::NOT_A_PROBABILITY;

/// Auto-commit threshold for the first word of a batch (gesture) input.
pub const CONFIDENCE_TO_AUTO_COMMIT: i32 = 1_000_000;

/// Error type for dictionary files and their lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected DCTX)")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("checksum mismatch (expected {expected:#010x}, found {actual:#010x})")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("missing header attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("range {offset}+{length} is outside a file of {file_len} bytes")]
    OutOfRange {
        offset: u64,
        length: u64,
        file_len: u64,
    },

    #[error("serialization error: {0}")]
    Serialize(bincode::Error),

    #[error("deserialization error: {0}")]
    Deserialize(bincode::Error),

    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DictError {
    /// True when the bytes were read but are not a usable dictionary, as
    /// opposed to the file being unreadable. Callers rebuild on format errors.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            DictError::InvalidHeader
                | DictError::InvalidMagic
                | DictError::UnsupportedVersion(_)
                | DictError::ChecksumMismatch { .. }
                | DictError::MissingAttribute(_)
                | DictError::OutOfRange { .. }
                | DictError::Deserialize(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DictionaryType {
    Main,
    Contacts,
    Apps,
    UserHistory,
    User,
}

impl DictionaryType {
    /// Query order used when collecting suggestions.
    pub const ALL: [DictionaryType; 5] = [
        DictionaryType::Main,
        DictionaryType::Contacts,
        DictionaryType::Apps,
        DictionaryType::UserHistory,
        DictionaryType::User,
    ];

    pub const DYNAMIC: [DictionaryType; 4] = [
        DictionaryType::Contacts,
        DictionaryType::Apps,
        DictionaryType::UserHistory,
        DictionaryType::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DictionaryType::Main => "main",
            DictionaryType::Contacts => "contacts",
            DictionaryType::Apps => "apps",
            DictionaryType::UserHistory => "history",
            DictionaryType::User => "user",
        }
    }
}

impl fmt::Display for DictionaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DictionaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DictionaryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown dictionary type '{s}'"))
    }
}

/// The word being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposedData {
    pub typed_word: String,
    /// Gesture input: the word was produced by a decoder, not key by key.
    pub is_batch_mode: bool,
}

impl ComposedData {
    pub fn typed(word: impl Into<String>) -> Self {
        Self {
            typed_word: word.into(),
            is_batch_mode: false,
        }
    }

    pub fn batch(word: impl Into<String>) -> Self {
        Self {
            typed_word: word.into(),
            is_batch_mode: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestionOptions {
    pub block_offensive_words: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SuggestionKind {
    /// Exact (case-insensitive) match of the typed word.
    Correction,
    Completion,
    /// Next-word prediction from the n-gram context, nothing typed yet.
    Prediction,
    Shortcut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedWordInfo {
    pub word: String,
    pub score: i32,
    pub kind: SuggestionKind,
    pub source: DictionaryType,
    pub auto_commit_confidence: i32,
}

impl SuggestedWordInfo {
    pub fn new(word: impl Into<String>, score: i32, kind: SuggestionKind, source: DictionaryType) -> Self {
        Self {
            word: word.into(),
            score,
            kind,
            source,
            auto_commit_confidence: 0,
        }
    }

    pub fn code_point_count(&self) -> usize {
        self.word.chars().count()
    }
}

/// Capability shared by every dictionary. Read methods must never block
/// for long: implementations degrade to "no result" under contention.
pub trait Dictionary: Send + Sync {
    fn dict_type(&self) -> DictionaryType;

    fn locale(&self) -> &Locale;

    /// `None` means "no answer" (closed, contended or not loaded), which
    /// callers treat the same as an empty list.
    fn get_suggestions(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        options: &SuggestionOptions,
        session_id: usize,
        weight_for_locale: f32,
    ) -> Option<Vec<SuggestedWordInfo>>;

    fn is_in_dictionary(&self, word: &str) -> bool;

    fn get_frequency(&self, _word: &str) -> i32 {
        NOT_A_PROBABILITY
    }

    /// Highest frequency among entries equal to `word` ignoring case.
    fn get_max_frequency_of_exact_matches(&self, _word: &str) -> i32 {
        NOT_A_PROBABILITY
    }

    /// Whether the dictionary vouches for `word` being a real word.
    fn is_valid_word(&self, word: &str) -> bool {
        self.is_in_dictionary(word)
    }

    fn same(&self, a: &str, b: &str) -> bool {
        a == b
    }

    fn should_auto_commit(&self, _candidate: &SuggestedWordInfo) -> bool {
        false
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn is_user_specific(&self) -> bool {
        false
    }

    fn on_finish_input(&self) {}

    fn close(&self) {}
}
