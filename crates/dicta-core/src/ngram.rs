//! Previous-word contexts used as n-gram lookup keys.
//!
//! An `NgramContext` holds up to `max_prev_word_count` words, most recent
//! first. Each slot is a literal word, the beginning-of-sentence marker, or
//! `Empty` ("no usable context", e.g. after a comma).

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::probability::WeightedString;

pub const MAX_PREV_WORD_COUNT_FOR_N_GRAM: usize = 3;
pub const BEGINNING_OF_SENTENCE_TAG: &str = "<S>";
pub const CONTEXT_SEPARATOR: &str = " ";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WordInfo {
    Empty,
    BeginningOfSentence,
    Word(String),
}

impl WordInfo {
    pub fn word(word: impl Into<String>) -> Self {
        WordInfo::Word(word.into())
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, WordInfo::Empty)
    }

    pub fn is_beginning_of_sentence(&self) -> bool {
        matches!(self, WordInfo::BeginningOfSentence)
    }

    pub fn as_word(&self) -> Option<&str> {
        match self {
            WordInfo::Word(w) => Some(w),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NgramContext {
    prev_words: Vec<WordInfo>,
    max_prev_word_count: usize,
}

impl NgramContext {
    /// Context carrying no information about the previous word.
    pub fn empty() -> Self {
        Self::from_words(vec![WordInfo::Empty])
    }

    pub fn beginning_of_sentence() -> Self {
        Self::from_words(vec![WordInfo::BeginningOfSentence])
    }

    pub fn empty_with_max(max_prev_word_count: usize) -> Self {
        Self::with_max(max_prev_word_count, vec![WordInfo::Empty])
    }

    /// `prev_words` is ordered most recent first and truncated to
    /// `MAX_PREV_WORD_COUNT_FOR_N_GRAM`.
    pub fn from_words(prev_words: Vec<WordInfo>) -> Self {
        Self::with_max(MAX_PREV_WORD_COUNT_FOR_N_GRAM, prev_words)
    }

    pub fn with_max(max_prev_word_count: usize, mut prev_words: Vec<WordInfo>) -> Self {
        let max = max_prev_word_count.max(1);
        prev_words.truncate(max);
        Self {
            prev_words,
            max_prev_word_count: max,
        }
    }

    /// Context after committing `word_info`: it becomes the most recent word
    /// and the oldest word is dropped once the maximum is exceeded.
    pub fn next_ngram_context(&self, word_info: WordInfo) -> Self {
        let count = self.max_prev_word_count.min(self.prev_words.len() + 1);
        let mut prev_words = Vec::with_capacity(count);
        prev_words.push(word_info);
        prev_words.extend(self.prev_words.iter().take(count - 1).cloned());
        Self {
            prev_words,
            max_prev_word_count: self.max_prev_word_count,
        }
    }

    /// Replaces `from` with `to` when it directly follows a beginning of
    /// sentence marker. Returns whether a replacement happened.
    pub fn change_word_if_after_beginning_of_sentence(&mut self, from: &str, to: &str) -> bool {
        let mut after_beginning = false;
        for info in self.prev_words.iter_mut().rev() {
            if after_beginning && info.as_word() == Some(from) {
                *info = WordInfo::word(to);
                return true;
            }
            after_beginning = info.is_beginning_of_sentence();
        }
        false
    }

    pub fn is_valid(&self) -> bool {
        self.prev_words.first().is_some_and(WordInfo::is_valid)
    }

    pub fn is_beginning_of_sentence_context(&self) -> bool {
        self.prev_words
            .first()
            .is_some_and(WordInfo::is_beginning_of_sentence)
    }

    /// `n` is 1-indexed.
    pub fn nth_prev_word(&self, n: usize) -> Option<&str> {
        if n == 0 {
            return None;
        }
        self.prev_words.get(n - 1).and_then(WordInfo::as_word)
    }

    /// `n` is 1-indexed.
    pub fn is_nth_prev_word_beginning_of_sentence(&self, n: usize) -> bool {
        n > 0
            && self
                .prev_words
                .get(n - 1)
                .is_some_and(WordInfo::is_beginning_of_sentence)
    }

    pub fn prev_word_count(&self) -> usize {
        self.prev_words.len()
    }

    pub fn max_prev_word_count(&self) -> usize {
        self.max_prev_word_count
    }

    pub fn words(&self) -> &[WordInfo] {
        &self.prev_words
    }

    /// The leading run of valid words, most recent first. This is the part of
    /// the context a dictionary can key n-grams on.
    pub fn valid_prefix(&self) -> &[WordInfo] {
        let end = self
            .prev_words
            .iter()
            .position(|w| !w.is_valid())
            .unwrap_or(self.prev_words.len());
        &self.prev_words[..end]
    }

    /// Oldest-first terms with beginning of sentence rendered as `<S>`.
    pub fn extract_prev_words_context_array(&self) -> Vec<String> {
        self.prev_words
            .iter()
            .rev()
            .filter_map(|info| match info {
                WordInfo::Empty => None,
                WordInfo::BeginningOfSentence => Some(BEGINNING_OF_SENTENCE_TAG.to_string()),
                WordInfo::Word(w) if w.is_empty() => None,
                WordInfo::Word(w) => Some(w.clone()),
            })
            .collect()
    }

    pub fn extract_prev_words_context(&self) -> String {
        self.extract_prev_words_context_array()
            .join(CONTEXT_SEPARATOR)
    }

    fn significant_len(&self) -> usize {
        self.prev_words
            .iter()
            .rposition(WordInfo::is_valid)
            .map_or(0, |i| i + 1)
    }
}

impl Default for NgramContext {
    fn default() -> Self {
        Self::empty()
    }
}

/// Trailing `Empty` slots carry no information and are ignored.
impl PartialEq for NgramContext {
    fn eq(&self, other: &Self) -> bool {
        let len = self.significant_len();
        len == other.significant_len() && self.prev_words[..len] == other.prev_words[..len]
    }
}

impl Eq for NgramContext {}

impl Hash for NgramContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prev_words[..self.significant_len()].hash(state);
    }
}

impl fmt::Display for NgramContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, info) in self.prev_words.iter().enumerate() {
            match info {
                WordInfo::Empty => write!(f, "PrevWord[{i}]: Empty. ")?,
                WordInfo::BeginningOfSentence => {
                    write!(f, "PrevWord[{i}]: , isBeginningOfSentence: true. ")?
                }
                WordInfo::Word(w) => {
                    write!(f, "PrevWord[{i}]: {w}, isBeginningOfSentence: false. ")?
                }
            }
        }
        Ok(())
    }
}

/// One n-gram edge as produced by a dictionary dump.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NgramProperty {
    pub target_word: WeightedString,
    pub ngram_context: NgramContext,
}

impl NgramProperty {
    pub fn new(target_word: WeightedString, ngram_context: NgramContext) -> Self {
        Self {
            target_word,
            ngram_context,
        }
    }
}
