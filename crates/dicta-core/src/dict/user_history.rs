//! Learned typing history with forgetting-curve decay.

use super::expandable::{DictionaryConfig, DictionaryContent};
use super::header::{
    ATTRIBUTE_VALUE_TRUE, DICTIONARY_DATE_KEY, HAS_HISTORICAL_INFO_KEY, MAX_BIGRAM_COUNT_KEY,
    MAX_UNIGRAM_COUNT_KEY, USES_FORGETTING_CURVE_KEY,
};
use super::{clock, DictionaryHeader, DictionaryType, ExpandableBinaryDictionary};
use crate::locale::Locale;
use crate::ngram::NgramContext;
use crate::settings::settings;
use crate::DICTIONARY_MAX_WORD_LENGTH;

/// A ranking signal only: never a spelling authority, seeded with nothing.
pub struct UserHistoryDictionary;

impl UserHistoryDictionary {
    pub const NAME: &'static str = "UserHistoryDictionary";

    pub fn create(
        locale: &Locale,
        account: Option<&str>,
        name_prefix: &str,
        config: &DictionaryConfig,
    ) -> ExpandableBinaryDictionary {
        let dict_name =
            ExpandableBinaryDictionary::dict_name(name_prefix, Self::NAME, locale, account);
        ExpandableBinaryDictionary::new(Box::new(Self), dict_name, locale, config)
    }

    /// Records one occurrence of `word` after `ngram_context`.
    pub fn add_to_dictionary(
        dict: &ExpandableBinaryDictionary,
        ngram_context: &NgramContext,
        word: &str,
        is_valid: bool,
        timestamp: i32,
    ) {
        if word.chars().count() > DICTIONARY_MAX_WORD_LENGTH {
            return;
        }
        dict.update_entries_for_word(ngram_context, word, is_valid, 1, timestamp);
    }
}

impl DictionaryContent for UserHistoryDictionary {
    fn dict_type(&self) -> DictionaryType {
        DictionaryType::UserHistory
    }

    fn header(&self, dict_name: &str, locale: &Locale) -> DictionaryHeader {
        let gc = &settings().gc;
        DictionaryHeader::new(dict_name, locale, "1")
            .with_attribute(DICTIONARY_DATE_KEY, clock::current_time().to_string())
            .with_attribute(USES_FORGETTING_CURVE_KEY, ATTRIBUTE_VALUE_TRUE)
            .with_attribute(HAS_HISTORICAL_INFO_KEY, ATTRIBUTE_VALUE_TRUE)
            .with_attribute(MAX_UNIGRAM_COUNT_KEY, gc.max_unigrams.to_string())
            .with_attribute(MAX_BIGRAM_COUNT_KEY, gc.max_ngrams.to_string())
    }

    fn vouches_for_words(&self) -> bool {
        false
    }

    fn is_user_specific(&self) -> bool {
        true
    }
}
