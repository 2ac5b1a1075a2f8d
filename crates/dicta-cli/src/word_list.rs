//! Plain-text word lists compiled into main dictionaries.
//!
//! One entry per line, tab separated:
//!
//! ```text
//! # comment
//! hello	180
//! omw	120	shortcut=on my way:200
//! darn	0	offensive
//! <S> hello world	90
//! ```
//!
//! A first column containing spaces is an n-gram: previous words oldest
//! first, then the target. `<S>` marks the beginning of a sentence.

use dicta_core::dict::{BinaryDictionary, DictionaryHeader};
use dicta_core::ngram::{NgramContext, WordInfo, BEGINNING_OF_SENTENCE_TAG};
use dicta_core::probability::NOT_A_VALID_TIMESTAMP;

#[derive(Debug, thiserror::Error)]
pub enum WordListError {
    #[error("line {line}: expected <word>\\t<frequency>")]
    MissingFrequency { line: usize },
    #[error("line {line}: invalid frequency {value:?}")]
    InvalidFrequency { line: usize, value: String },
    #[error("line {line}: unknown attribute {value:?}")]
    UnknownAttribute { line: usize, value: String },
    #[error("line {line}: the sentence marker cannot be an n-gram target")]
    MarkerAsTarget { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub target: String,
    pub frequency: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordListEntry {
    Unigram {
        word: String,
        frequency: i32,
        shortcut: Option<Shortcut>,
        is_not_a_word: bool,
        is_possibly_offensive: bool,
    },
    Ngram {
        /// Most recent first.
        prev_words: Vec<WordInfo>,
        word: String,
        frequency: i32,
    },
}

fn parse_frequency(line: usize, value: &str) -> Result<i32, WordListError> {
    value
        .trim()
        .parse()
        .map_err(|_| WordListError::InvalidFrequency {
            line,
            value: value.to_string(),
        })
}

pub fn parse_word_list(text: &str) -> Result<Vec<WordListEntry>, WordListError> {
    let mut entries = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() || raw.starts_with('#') {
            continue;
        }
        let mut columns = raw.split('\t');
        let key = columns.next().unwrap_or_default().trim();
        let frequency = match columns.next() {
            Some(value) => parse_frequency(line, value)?,
            None => return Err(WordListError::MissingFrequency { line }),
        };

        let terms: Vec<&str> = key.split(' ').filter(|t| !t.is_empty()).collect();
        if let [prev @ .., target] = terms.as_slice() {
            if prev.is_empty() {
                // Plain unigram, handled below.
            } else if *target == BEGINNING_OF_SENTENCE_TAG {
                return Err(WordListError::MarkerAsTarget { line });
            } else {
                let prev_words = prev
                    .iter()
                    .rev()
                    .map(|t| {
                        if *t == BEGINNING_OF_SENTENCE_TAG {
                            WordInfo::BeginningOfSentence
                        } else {
                            WordInfo::word(*t)
                        }
                    })
                    .collect();
                entries.push(WordListEntry::Ngram {
                    prev_words,
                    word: target.to_string(),
                    frequency,
                });
                continue;
            }
        }

        let mut shortcut = None;
        let mut is_not_a_word = false;
        let mut is_possibly_offensive = false;
        for attribute in columns.map(str::trim).filter(|a| !a.is_empty()) {
            match attribute {
                "not_a_word" => is_not_a_word = true,
                "offensive" => is_possibly_offensive = true,
                _ => {
                    let Some((target, freq)) = attribute
                        .strip_prefix("shortcut=")
                        .and_then(|s| s.rsplit_once(':'))
                    else {
                        return Err(WordListError::UnknownAttribute {
                            line,
                            value: attribute.to_string(),
                        });
                    };
                    shortcut = Some(Shortcut {
                        target: target.to_string(),
                        frequency: parse_frequency(line, freq)?,
                    });
                }
            }
        }
        entries.push(WordListEntry::Unigram {
            word: key.to_string(),
            frequency,
            shortcut,
            is_not_a_word,
            is_possibly_offensive,
        });
    }
    Ok(entries)
}

/// Builds an in-memory dictionary. Returns it with the number of entries
/// the engine rejected (empty or over-long words).
pub fn build_dictionary(
    header: DictionaryHeader,
    entries: &[WordListEntry],
) -> (BinaryDictionary, usize) {
    let mut dict = BinaryDictionary::create_on_memory(header);
    let mut rejected = 0;
    for entry in entries {
        let added = match entry {
            WordListEntry::Unigram {
                word,
                frequency,
                shortcut,
                is_not_a_word,
                is_possibly_offensive,
            } => dict.add_unigram_entry(
                word,
                *frequency,
                shortcut.as_ref().map(|s| (s.target.as_str(), s.frequency)),
                *is_not_a_word,
                *is_possibly_offensive,
                NOT_A_VALID_TIMESTAMP,
            ),
            WordListEntry::Ngram {
                prev_words,
                word,
                frequency,
            } => dict.add_ngram_entry(
                &NgramContext::from_words(prev_words.clone()),
                word,
                *frequency,
                NOT_A_VALID_TIMESTAMP,
            ),
        };
        if !added {
            rejected += 1;
        }
    }
    (dict, rejected)
}
