use std::path::Path;

use parking_lot::RwLock;
use tracing::debug;

use super::{
    BinaryDictionary, ComposedData, DictError, Dictionary, DictionaryType, SuggestedWordInfo,
    SuggestionOptions,
};
use crate::locale::Locale;
use crate::ngram::NgramContext;
use crate::probability::NOT_A_PROBABILITY;

/// Read-only wrapper for shipped dictionaries.
///
/// Reads never wait: if the lock is held for writing (only `close` does
/// that) they answer "nothing". Once closed, the dictionary stays closed.
pub struct ReadOnlyBinaryDictionary {
    dict_type: DictionaryType,
    locale: Locale,
    inner: RwLock<Option<BinaryDictionary>>,
}

impl ReadOnlyBinaryDictionary {
    pub fn open(
        path: &Path,
        offset: u64,
        length: u64,
        dict_type: DictionaryType,
    ) -> Result<Self, DictError> {
        let dict = BinaryDictionary::open(path, offset, length)?;
        Ok(Self::from_binary(dict, dict_type))
    }

    pub fn from_binary(dict: BinaryDictionary, dict_type: DictionaryType) -> Self {
        Self {
            dict_type,
            locale: dict.header().locale(),
            inner: RwLock::new(Some(dict)),
        }
    }

    fn with_dict<R>(&self, default: R, f: impl FnOnce(&BinaryDictionary) -> R) -> R {
        match self.inner.try_read() {
            Some(guard) => guard.as_ref().map_or(default, f),
            None => default,
        }
    }
}

impl Dictionary for ReadOnlyBinaryDictionary {
    fn dict_type(&self) -> DictionaryType {
        self.dict_type
    }

    fn locale(&self) -> &Locale {
        &self.locale
    }

    fn get_suggestions(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        options: &SuggestionOptions,
        session_id: usize,
        weight_for_locale: f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        let guard = self.inner.try_read()?;
        let dict = guard.as_ref()?;
        Some(dict.get_suggestions(
            composed,
            ngram_context,
            options,
            session_id,
            weight_for_locale,
            self.dict_type,
        ))
    }

    fn is_in_dictionary(&self, word: &str) -> bool {
        self.with_dict(false, |d| d.is_in_dictionary(word))
    }

    fn get_frequency(&self, word: &str) -> i32 {
        self.with_dict(NOT_A_PROBABILITY, |d| d.get_frequency(word))
    }

    fn get_max_frequency_of_exact_matches(&self, word: &str) -> i32 {
        self.with_dict(NOT_A_PROBABILITY, |d| {
            d.get_max_frequency_of_exact_matches(word)
        })
    }

    fn should_auto_commit(&self, candidate: &SuggestedWordInfo) -> bool {
        self.with_dict(false, |d| d.should_auto_commit(candidate))
    }

    fn is_initialized(&self) -> bool {
        self.inner.try_read().is_some_and(|g| g.is_some())
    }

    fn close(&self) {
        // Waits for in-flight readers, then releases the engine for good.
        let mut guard = self.inner.write();
        if guard.take().is_some() {
            debug!(dict_type = %self.dict_type, locale = %self.locale, "closed read-only dictionary");
        }
    }
}
