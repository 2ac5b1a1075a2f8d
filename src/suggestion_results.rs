//! Bounded, ordered merge of suggestions from every dictionary.

use std::cmp::Ordering;

use dicta_core::dict::{DictionaryType, SuggestedWordInfo};

/// Suggestions ordered by score (highest first), then shorter words, then
/// word order. Holds at most `capacity` entries.
///
/// A word reported by several dictionaries is kept once with its highest
/// score. When a main-dictionary word and a learned word differ only in case,
/// they merge into the main dictionary's spelling.
#[derive(Debug, Clone)]
pub struct SuggestionResults {
    capacity: usize,
    items: Vec<SuggestedWordInfo>,
    pub is_beginning_of_sentence: bool,
    pub is_prediction: bool,
}

fn compare(a: &SuggestedWordInfo, b: &SuggestedWordInfo) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.code_point_count().cmp(&b.code_point_count()))
        .then_with(|| a.word.cmp(&b.word))
}

fn from_main(info: &SuggestedWordInfo) -> bool {
    info.source == DictionaryType::Main
}

impl SuggestionResults {
    pub fn new(capacity: usize, is_beginning_of_sentence: bool, is_prediction: bool) -> Self {
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
            is_beginning_of_sentence,
            is_prediction,
        }
    }

    pub fn add(&mut self, info: SuggestedWordInfo) {
        if let Some(index) = self.items.iter().position(|s| s.word == info.word) {
            self.merge_at(index, info);
        } else if let Some(index) = self.items.iter().position(|s| {
            from_main(s) != from_main(&info) && s.word.to_lowercase() == info.word.to_lowercase()
        }) {
            self.merge_at(index, info);
        } else {
            let at = self
                .items
                .binary_search_by(|s| compare(s, &info))
                .unwrap_or_else(|i| i);
            if at < self.capacity {
                self.items.insert(at, info);
                self.items.truncate(self.capacity);
            }
        }
    }

    pub fn add_all(&mut self, infos: impl IntoIterator<Item = SuggestedWordInfo>) {
        for info in infos {
            self.add(info);
        }
    }

    /// The main dictionary's entry stays canonical; otherwise the higher
    /// score brings its own spelling and kind.
    fn merge_at(&mut self, index: usize, incoming: SuggestedWordInfo) {
        let existing = self.items.remove(index);
        let score = existing.score.max(incoming.score);
        let mut merged = if from_main(&existing) {
            existing
        } else if from_main(&incoming) || incoming.score > existing.score {
            incoming
        } else {
            existing
        };
        merged.score = score;
        let at = self
            .items
            .binary_search_by(|s| compare(s, &merged))
            .unwrap_or_else(|i| i);
        self.items.insert(at, merged);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&SuggestedWordInfo> {
        self.items.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SuggestedWordInfo> {
        self.items.iter()
    }

    pub fn words(&self) -> Vec<&str> {
        self.items.iter().map(|s| s.word.as_str()).collect()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.items.iter().any(|s| s.word == word)
    }

    pub fn into_vec(self) -> Vec<SuggestedWordInfo> {
        self.items
    }
}
