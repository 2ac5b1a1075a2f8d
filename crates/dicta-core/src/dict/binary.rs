//! In-process trie engine.
//!
//! Words live in a `BTreeMap` keyed by their lower-cased form so that a
//! prefix walk is a range scan; each key holds every case variant
//! ("us", "US"). N-grams are keyed by the valid prefix of the context
//! (most recent word first) and map target words to probabilities.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::forgetting;
use super::format::{self, HEADER_SIZE};
use super::header::{DictionaryHeader, MAX_BIGRAM_COUNT_KEY, MAX_UNIGRAM_COUNT_KEY};
use super::{
    clock, ComposedData, DictError, DictionaryType, SuggestedWordInfo, SuggestionKind,
    SuggestionOptions, CONFIDENCE_TO_AUTO_COMMIT,
};
use crate::ngram::{NgramContext, NgramProperty, WordInfo, MAX_PREV_WORD_COUNT_FOR_N_GRAM};
use crate::probability::{ProbabilityInfo, WeightedString, MAX_PROBABILITY, NOT_A_PROBABILITY};
use crate::settings::settings;
use crate::DICTIONARY_MAX_WORD_LENGTH;

pub const UNIGRAM_COUNT_QUERY: &str = "UNIGRAM_COUNT";
pub const BIGRAM_COUNT_QUERY: &str = "BIGRAM_COUNT";
pub const MAX_UNIGRAM_COUNT_QUERY: &str = "MAX_UNIGRAM_COUNT";
pub const MAX_BIGRAM_COUNT_QUERY: &str = "MAX_BIGRAM_COUNT";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WordEntry {
    word: String,
    probability: ProbabilityInfo,
    shortcuts: Vec<WeightedString>,
    is_not_a_word: bool,
    is_possibly_offensive: bool,
}

/// A unigram as reported by a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordProperty {
    pub word: String,
    pub probability_info: ProbabilityInfo,
    pub shortcuts: Vec<WeightedString>,
    pub is_not_a_word: bool,
    pub is_possibly_offensive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DictionaryDump {
    pub words: Vec<WordProperty>,
    pub ngrams: Vec<NgramProperty>,
}

/// Flat serialization format for bincode.
#[derive(Serialize, Deserialize)]
struct DictionaryData {
    header: BTreeMap<String, String>,
    unigrams: Vec<WordEntry>,
    ngrams: Vec<NgramRecord>,
}

#[derive(Serialize, Deserialize)]
struct NgramRecord {
    prev_words: Vec<WordInfo>,
    target: String,
    probability: ProbabilityInfo,
}

/// Per-session scratch space; never shared between session ids.
#[derive(Debug, Default)]
struct TraverseSession {
    candidates: Vec<SuggestedWordInfo>,
}

#[derive(Debug)]
pub struct BinaryDictionary {
    header: DictionaryHeader,
    words: BTreeMap<String, Vec<WordEntry>>,
    ngrams: HashMap<Vec<WordInfo>, HashMap<String, ProbabilityInfo>>,
    updates_since_gc: usize,
    sessions: Mutex<HashMap<usize, Arc<Mutex<TraverseSession>>>>,
}

fn fold(word: &str) -> String {
    word.to_lowercase()
}

fn is_acceptable_word(word: &str) -> bool {
    !word.is_empty() && word.chars().count() <= DICTIONARY_MAX_WORD_LENGTH
}

/// Context key for n-gram storage: the valid prefix, capped at the n-gram order.
fn ngram_key(ngram_context: &NgramContext) -> Option<Vec<WordInfo>> {
    let prefix = ngram_context.valid_prefix();
    if prefix.is_empty() {
        return None;
    }
    let order = prefix.len().min(MAX_PREV_WORD_COUNT_FOR_N_GRAM);
    Some(prefix[..order].to_vec())
}

impl BinaryDictionary {
    /// Empty dictionary that lives only in memory until flushed.
    pub fn create_on_memory(header: DictionaryHeader) -> Self {
        Self {
            header,
            words: BTreeMap::new(),
            ngrams: HashMap::new(),
            updates_since_gc: 0,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open a dictionary stored at `offset..offset + length` of `path`.
    pub fn open(path: &Path, offset: u64, length: u64) -> Result<Self, DictError> {
        let file = File::open(path)?;
        // SAFETY: The file is opened read-only and the mapping is immutable.
        let mmap = unsafe { Mmap::map(&file)? };
        let file_len = mmap.len() as u64;
        let end = offset.checked_add(length).filter(|end| *end <= file_len);
        let Some(end) = end else {
            return Err(DictError::OutOfRange {
                offset,
                length,
                file_len,
            });
        };
        let dict = Self::from_bytes(&mmap[offset as usize..end as usize])?;
        debug!(
            path = %path.display(),
            offset,
            length,
            words = dict.unigram_count(),
            "opened dictionary"
        );
        Ok(dict)
    }

    /// Open a file holding exactly one dictionary.
    pub fn open_file(path: &Path) -> Result<Self, DictError> {
        let length = fs::metadata(path)?.len();
        Self::open(path, 0, length)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DictError> {
        if data.len() < HEADER_SIZE {
            return Err(DictError::InvalidHeader);
        }
        let data: DictionaryData = format::decode(data)?;
        let header = DictionaryHeader::from_attributes(data.header)?;
        let mut dict = Self::create_on_memory(header);
        for entry in data.unigrams {
            dict.words.entry(fold(&entry.word)).or_default().push(entry);
        }
        for record in data.ngrams {
            dict.ngrams
                .entry(record.prev_words)
                .or_default()
                .insert(record.target, record.probability);
        }
        Ok(dict)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DictError> {
        let unigrams = self.words.values().flatten().cloned().collect();
        let ngrams = self
            .ngrams
            .iter()
            .flat_map(|(prev, targets)| {
                targets.iter().map(move |(target, probability)| NgramRecord {
                    prev_words: prev.clone(),
                    target: target.clone(),
                    probability: *probability,
                })
            })
            .collect();
        format::encode(&DictionaryData {
            header: self.header.clone().into_attributes(),
            unigrams,
            ngrams,
        })
    }

    /// Atomic write: write to .tmp then rename.
    pub fn flush(&self, path: &Path) -> Result<(), DictError> {
        let bytes = self.to_bytes()?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "flushed dictionary");
        Ok(())
    }

    pub fn flush_with_gc(&mut self, path: &Path) -> Result<(), DictError> {
        self.run_gc(clock::current_time());
        self.flush(path)
    }

    pub fn header(&self) -> &DictionaryHeader {
        &self.header
    }

    fn uses_forgetting_curve(&self) -> bool {
        self.header.uses_forgetting_curve()
    }

    fn effective(&self, info: &ProbabilityInfo, now: i32) -> i32 {
        if self.uses_forgetting_curve() {
            forgetting::decayed_probability(info, now)
        } else {
            info.probability
        }
    }

    fn exact_entry(&self, word: &str) -> Option<&WordEntry> {
        self.words.get(&fold(word))?.iter().find(|e| e.word == word)
    }

    pub fn unigram_count(&self) -> usize {
        self.words.values().map(Vec::len).sum()
    }

    pub fn ngram_count(&self) -> usize {
        self.ngrams.values().map(HashMap::len).sum()
    }

    fn max_unigram_count(&self) -> usize {
        self.header
            .max_count(MAX_UNIGRAM_COUNT_KEY)
            .unwrap_or(settings().gc.max_unigrams)
    }

    fn max_ngram_count(&self) -> usize {
        self.header
            .max_count(MAX_BIGRAM_COUNT_KEY)
            .unwrap_or(settings().gc.max_ngrams)
    }

    /// Numeric properties for diagnostics; `None` for unknown queries.
    pub fn property(&self, query: &str) -> Option<usize> {
        match query {
            UNIGRAM_COUNT_QUERY => Some(self.unigram_count()),
            BIGRAM_COUNT_QUERY => Some(self.ngram_count()),
            MAX_UNIGRAM_COUNT_QUERY => Some(self.max_unigram_count()),
            MAX_BIGRAM_COUNT_QUERY => Some(self.max_ngram_count()),
            _ => None,
        }
    }

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    /// Probability of `word` (exact case), or `NOT_A_PROBABILITY`.
    pub fn get_frequency(&self, word: &str) -> i32 {
        self.exact_entry(word)
            .filter(|e| !e.is_not_a_word)
            .map_or(NOT_A_PROBABILITY, |e| {
                self.effective(&e.probability, clock::current_time())
            })
    }

    pub fn get_max_frequency_of_exact_matches(&self, word: &str) -> i32 {
        let now = clock::current_time();
        self.words
            .get(&fold(word))
            .into_iter()
            .flatten()
            .filter(|e| !e.is_not_a_word)
            .map(|e| self.effective(&e.probability, now))
            .max()
            .unwrap_or(NOT_A_PROBABILITY)
    }

    pub fn is_in_dictionary(&self, word: &str) -> bool {
        self.get_frequency(word) != NOT_A_PROBABILITY
    }

    /// Best probability of `word` following `ngram_context`, trying the
    /// longest available order first.
    pub fn get_ngram_probability(&self, ngram_context: &NgramContext, word: &str) -> i32 {
        self.ngram_probability_at(ngram_context.valid_prefix(), word, clock::current_time())
            .unwrap_or(NOT_A_PROBABILITY)
    }

    fn ngram_probability_at(&self, prefix: &[WordInfo], word: &str, now: i32) -> Option<i32> {
        let max_order = prefix.len().min(MAX_PREV_WORD_COUNT_FOR_N_GRAM);
        (1..=max_order).rev().find_map(|order| {
            let info = self.ngrams.get(&prefix[..order])?.get(word)?;
            Some(self.effective(info, now))
        })
    }

    fn session(&self, session_id: usize) -> Arc<Mutex<TraverseSession>> {
        Arc::clone(self.sessions.lock().entry(session_id).or_default())
    }

    /// Completions of the typed word (or next-word predictions when nothing
    /// is typed), best first.
    pub fn get_suggestions(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        options: &SuggestionOptions,
        session_id: usize,
        weight_for_locale: f32,
        source: DictionaryType,
    ) -> Vec<SuggestedWordInfo> {
        let now = clock::current_time();
        let s = settings();
        let prefix = ngram_context.valid_prefix();
        let session = self.session(session_id);
        let mut session = session.lock();
        let candidates = &mut session.candidates;
        candidates.clear();

        let weigh = |score: i32| ((score as f32) * weight_for_locale).round() as i32;
        let usable = |entry: &WordEntry| {
            !entry.is_not_a_word && !(options.block_offensive_words && entry.is_possibly_offensive)
        };

        if composed.typed_word.is_empty() {
            let max_order = prefix.len().min(MAX_PREV_WORD_COUNT_FOR_N_GRAM);
            for order in (1..=max_order).rev() {
                let Some(targets) = self.ngrams.get(&prefix[..order]) else {
                    continue;
                };
                for (target, info) in targets {
                    if candidates.iter().any(|c| &c.word == target) {
                        continue;
                    }
                    if self.exact_entry(target).is_some_and(|e| !usable(e)) {
                        continue;
                    }
                    let score = self.effective(info, now);
                    candidates.push(SuggestedWordInfo::new(
                        target.clone(),
                        weigh(score),
                        SuggestionKind::Prediction,
                        source,
                    ));
                }
            }
        } else {
            let folded = fold(&composed.typed_word);
            for (key, entries) in self.words.range(folded.clone()..) {
                if !key.starts_with(&folded) {
                    break;
                }
                let is_exact = *key == folded;
                for entry in entries {
                    if is_exact {
                        for shortcut in &entry.shortcuts {
                            candidates.push(SuggestedWordInfo::new(
                                shortcut.word.clone(),
                                weigh(shortcut.probability()),
                                SuggestionKind::Shortcut,
                                source,
                            ));
                        }
                    }
                    if !usable(entry) {
                        continue;
                    }
                    let unigram = self.effective(&entry.probability, now);
                    let ngram = self
                        .ngram_probability_at(prefix, &entry.word, now)
                        .unwrap_or(0);
                    let score = unigram + (ngram as f32 * s.suggestions.ngram_weight) as i32;
                    let kind = if is_exact {
                        SuggestionKind::Correction
                    } else {
                        SuggestionKind::Completion
                    };
                    candidates.push(SuggestedWordInfo::new(
                        entry.word.clone(),
                        weigh(score),
                        kind,
                        source,
                    ));
                }
            }
        }

        candidates.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.word.cmp(&b.word)));
        candidates.truncate(s.suggestions.max_results);
        if composed.is_batch_mode {
            if let Some(confidence) = auto_commit_confidence(candidates) {
                candidates[0].auto_commit_confidence = confidence;
            }
        }
        candidates.clone()
    }

    pub fn should_auto_commit(&self, candidate: &SuggestedWordInfo) -> bool {
        candidate.auto_commit_confidence > CONFIDENCE_TO_AUTO_COMMIT
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    /// Inserts or updates a word. Returns false for empty or over-long words.
    #[allow(clippy::too_many_arguments)]
    pub fn add_unigram_entry(
        &mut self,
        word: &str,
        probability: i32,
        shortcut: Option<(&str, i32)>,
        is_not_a_word: bool,
        is_possibly_offensive: bool,
        timestamp: i32,
    ) -> bool {
        if !is_acceptable_word(word) {
            return false;
        }
        let probability = probability.clamp(0, MAX_PROBABILITY);
        let info = if self.uses_forgetting_curve() {
            let ts = if timestamp < 0 {
                clock::current_time()
            } else {
                timestamp
            };
            ProbabilityInfo::with_history(probability, ts, 1, 1)
        } else {
            ProbabilityInfo::new(probability)
        };
        let bucket = self.words.entry(fold(word)).or_default();
        let entry = match bucket.iter().position(|e| e.word == word) {
            Some(i) => &mut bucket[i],
            None => {
                bucket.push(WordEntry {
                    word: word.to_string(),
                    probability: info,
                    shortcuts: Vec::new(),
                    is_not_a_word,
                    is_possibly_offensive,
                });
                let last = bucket.len() - 1;
                &mut bucket[last]
            }
        };
        entry.probability = info;
        entry.is_not_a_word = is_not_a_word;
        entry.is_possibly_offensive = is_possibly_offensive;
        if let Some((target, freq)) = shortcut {
            let target_info = ProbabilityInfo::new(freq.clamp(0, MAX_PROBABILITY));
            match entry.shortcuts.iter_mut().find(|s| s.word == target) {
                Some(existing) => existing.probability_info = target_info,
                None => entry.shortcuts.push(WeightedString::new(target, target_info)),
            }
        }
        self.updates_since_gc += 1;
        true
    }

    /// Removes the exact word and every n-gram edge pointing at it.
    pub fn remove_unigram_entry(&mut self, word: &str) -> bool {
        let key = fold(word);
        let Some(bucket) = self.words.get_mut(&key) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|e| e.word != word);
        let removed = bucket.len() < before;
        if bucket.is_empty() {
            self.words.remove(&key);
        }
        if removed {
            for targets in self.ngrams.values_mut() {
                targets.remove(word);
            }
            self.ngrams.retain(|_, targets| !targets.is_empty());
            self.updates_since_gc += 1;
        }
        removed
    }

    pub fn add_ngram_entry(
        &mut self,
        ngram_context: &NgramContext,
        word: &str,
        probability: i32,
        timestamp: i32,
    ) -> bool {
        if !is_acceptable_word(word) {
            return false;
        }
        let Some(key) = ngram_key(ngram_context) else {
            return false;
        };
        let probability = probability.clamp(0, MAX_PROBABILITY);
        let info = if self.uses_forgetting_curve() {
            let ts = if timestamp < 0 {
                clock::current_time()
            } else {
                timestamp
            };
            ProbabilityInfo::with_history(probability, ts, 1, 1)
        } else {
            ProbabilityInfo::new(probability)
        };
        self.ngrams
            .entry(key)
            .or_default()
            .insert(word.to_string(), info);
        self.updates_since_gc += 1;
        true
    }

    pub fn remove_ngram_entry(&mut self, ngram_context: &NgramContext, word: &str) -> bool {
        let Some(key) = ngram_key(ngram_context) else {
            return false;
        };
        let Some(targets) = self.ngrams.get_mut(&key) else {
            return false;
        };
        let removed = targets.remove(word).is_some();
        if targets.is_empty() {
            self.ngrams.remove(&key);
        }
        removed
    }

    /// Records `count` occurrences of `word` after `ngram_context`: the
    /// unigram and every n-gram order present in the context.
    pub fn update_entries_for_word(
        &mut self,
        ngram_context: &NgramContext,
        word: &str,
        is_valid: bool,
        count: i32,
        timestamp: i32,
    ) -> bool {
        if !is_acceptable_word(word) {
            return false;
        }
        let forgetting = self.uses_forgetting_curve();
        let timestamp = if timestamp < 0 {
            clock::current_time()
        } else {
            timestamp
        };
        let apply = |current: Option<&ProbabilityInfo>| {
            let updated = forgetting::record_occurrences(current, is_valid, count, timestamp);
            if forgetting {
                updated
            } else {
                ProbabilityInfo::new(updated.probability)
            }
        };

        let bucket = self.words.entry(fold(word)).or_default();
        match bucket.iter_mut().find(|e| e.word == word) {
            Some(entry) => {
                entry.probability = apply(Some(&entry.probability));
                entry.is_not_a_word = false;
            }
            None => bucket.push(WordEntry {
                word: word.to_string(),
                probability: apply(None),
                shortcuts: Vec::new(),
                is_not_a_word: false,
                is_possibly_offensive: false,
            }),
        }

        let prefix = ngram_context.valid_prefix();
        let max_order = prefix.len().min(MAX_PREV_WORD_COUNT_FOR_N_GRAM);
        for order in 1..=max_order {
            let targets = self.ngrams.entry(prefix[..order].to_vec()).or_default();
            let updated = apply(targets.get(word));
            targets.insert(word.to_string(), updated);
        }
        self.updates_since_gc += 1;
        true
    }

    /// Hard limits always trigger GC; the update-count trigger only applies
    /// when the caller does not mind blocking.
    pub fn needs_to_run_gc(&self, minds_block_by_gc: bool) -> bool {
        if self.unigram_count() > self.max_unigram_count()
            || self.ngram_count() > self.max_ngram_count()
        {
            return true;
        }
        !minds_block_by_gc && self.updates_since_gc >= settings().gc.updates_before_gc
    }

    /// Drops decayed entries, then evicts the weakest entries above capacity.
    pub fn run_gc(&mut self, now: i32) {
        let before = (self.unigram_count(), self.ngram_count());
        if self.uses_forgetting_curve() {
            for bucket in self.words.values_mut() {
                bucket.retain(|e| !forgetting::should_discard(&e.probability, now));
            }
            self.words.retain(|_, bucket| !bucket.is_empty());
            for targets in self.ngrams.values_mut() {
                targets.retain(|_, info| !forgetting::should_discard(info, now));
            }
            self.ngrams.retain(|_, targets| !targets.is_empty());
        }
        self.evict_words(now);
        self.evict_ngrams(now);
        self.updates_since_gc = 0;
        debug!(
            unigrams_before = before.0,
            unigrams_after = self.unigram_count(),
            ngrams_before = before.1,
            ngrams_after = self.ngram_count(),
            "dictionary gc"
        );
    }

    fn evict_words(&mut self, now: i32) {
        let max = self.max_unigram_count();
        let count = self.unigram_count();
        if count <= max {
            return;
        }
        let mut all: Vec<(String, String, i32)> = Vec::with_capacity(count);
        for (key, bucket) in &self.words {
            for e in bucket {
                all.push((key.clone(), e.word.clone(), self.effective(&e.probability, now)));
            }
        }
        let to_remove = count - max;
        // Partition so the lowest-score `to_remove` entries are in all[..to_remove].
        all.select_nth_unstable_by(to_remove - 1, |a, b| a.2.cmp(&b.2));
        for (key, word, _) in &all[..to_remove] {
            if let Some(bucket) = self.words.get_mut(key) {
                bucket.retain(|e| &e.word != word);
                if bucket.is_empty() {
                    self.words.remove(key);
                }
            }
        }
    }

    fn evict_ngrams(&mut self, now: i32) {
        let max = self.max_ngram_count();
        let count = self.ngram_count();
        if count <= max {
            return;
        }
        let mut all: Vec<(Vec<WordInfo>, String, i32)> = Vec::with_capacity(count);
        for (prev, targets) in &self.ngrams {
            for (target, info) in targets {
                all.push((prev.clone(), target.clone(), self.effective(info, now)));
            }
        }
        let to_remove = count - max;
        all.select_nth_unstable_by(to_remove - 1, |a, b| a.2.cmp(&b.2));
        for (prev, target, _) in &all[..to_remove] {
            if let Some(targets) = self.ngrams.get_mut(prev) {
                targets.remove(target);
                if targets.is_empty() {
                    self.ngrams.remove(prev);
                }
            }
        }
    }

    // -------------------------------------------------------------------
    // Dump
    // -------------------------------------------------------------------

    /// Every word and n-gram with probabilities as seen at `now`, sorted.
    pub fn dump_all(&self, now: i32) -> DictionaryDump {
        let decayed = |info: &ProbabilityInfo| ProbabilityInfo {
            probability: self.effective(info, now),
            ..*info
        };
        let words = self
            .words
            .values()
            .flatten()
            .map(|e| WordProperty {
                word: e.word.clone(),
                probability_info: decayed(&e.probability),
                shortcuts: e.shortcuts.clone(),
                is_not_a_word: e.is_not_a_word,
                is_possibly_offensive: e.is_possibly_offensive,
            })
            .collect();
        let mut ngrams: Vec<NgramProperty> = self
            .ngrams
            .iter()
            .flat_map(|(prev, targets)| {
                targets.iter().map(move |(target, info)| {
                    NgramProperty::new(
                        WeightedString::new(target.clone(), decayed(info)),
                        NgramContext::from_words(prev.clone()),
                    )
                })
            })
            .collect();
        ngrams.sort_by(|a, b| {
            a.ngram_context
                .extract_prev_words_context()
                .cmp(&b.ngram_context.extract_prev_words_context())
                .then_with(|| a.target_word.word.cmp(&b.target_word.word))
        });
        DictionaryDump { words, ngrams }
    }
}

/// Confidence that the top batch candidate is what the user meant, in
/// millionths of the margin over the runner-up (times two).
fn auto_commit_confidence(candidates: &[SuggestedWordInfo]) -> Option<i32> {
    let top = candidates.first()?;
    if top.score <= 0 {
        return None;
    }
    let second = candidates.get(1).map_or(0, |c| c.score.max(0));
    let margin = i64::from(top.score - second);
    Some((margin * 2_000_000 / i64::from(top.score)) as i32)
}
