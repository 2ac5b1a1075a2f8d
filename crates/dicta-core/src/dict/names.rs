//! Sources of display names (installed apps, contacts) and the shared
//! tokenizer that turns them into dictionary entries.

use parking_lot::Mutex;
use tracing::debug;

use super::expandable::{DictWriter, RecreateHandle};
use crate::ngram::{NgramContext, WordInfo};
use crate::probability::NOT_A_VALID_TIMESTAMP;
use crate::unicode::{code_point_count, split_on_whitespace};
use crate::DICTIONARY_MAX_WORD_LENGTH;

/// A platform provider of names with change notification.
pub trait NameSource: Send + Sync {
    fn names(&self) -> Vec<String>;

    /// The handle is marked when the names change.
    fn register_for_updates(&self, handle: &RecreateHandle);

    fn unregister(&self, handle: &RecreateHandle);
}

#[derive(Default)]
pub struct InMemoryNameSource {
    names: Mutex<Vec<String>>,
    listeners: Mutex<Vec<RecreateHandle>>,
}

impl InMemoryNameSource {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: Mutex::new(names.into_iter().map(Into::into).collect()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Replaces the names and notifies every registered dictionary.
    pub fn set_names(&self, names: impl IntoIterator<Item = impl Into<String>>) {
        *self.names.lock() = names.into_iter().map(Into::into).collect();
        for listener in self.listeners.lock().iter() {
            listener.mark_needs_recreate();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl NameSource for InMemoryNameSource {
    fn names(&self) -> Vec<String> {
        self.names.lock().clone()
    }

    fn register_for_updates(&self, handle: &RecreateHandle) {
        let mut listeners = self.listeners.lock();
        if !listeners.iter().any(|l| l.same(handle)) {
            listeners.push(handle.clone());
        }
    }

    fn unregister(&self, handle: &RecreateHandle) {
        self.listeners.lock().retain(|l| !l.same(handle));
    }
}

/// Adds each name's tokens as unigrams and chains consecutive tokens as
/// bigrams. Single letters and over-long tokens are skipped and do not break
/// the chain. The context starts over for every name.
pub(crate) fn add_names_locked(
    writer: &mut DictWriter<'_>,
    names: &[String],
    frequency: i32,
    bigram_frequency: i32,
) {
    let mut added = 0usize;
    for name in names {
        let mut ngram_context = NgramContext::empty();
        for token in split_on_whitespace(name) {
            let len = code_point_count(token);
            if len <= 1 || len > DICTIONARY_MAX_WORD_LENGTH {
                continue;
            }
            writer.add_unigram_locked(token, frequency, None, false, false, NOT_A_VALID_TIMESTAMP);
            if ngram_context.is_valid() {
                writer.add_ngram_entry_locked(
                    &ngram_context,
                    token,
                    bigram_frequency,
                    NOT_A_VALID_TIMESTAMP,
                );
            }
            ngram_context = ngram_context.next_ngram_context(WordInfo::word(token));
            added += 1;
        }
    }
    debug!(names = names.len(), tokens = added, "added names");
}
