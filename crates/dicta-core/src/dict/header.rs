use std::collections::BTreeMap;

use super::DictError;
use crate::locale::Locale;

pub const DICTIONARY_ID_KEY: &str = "dictionary";
pub const DICTIONARY_LOCALE_KEY: &str = "locale";
pub const DICTIONARY_VERSION_KEY: &str = "version";
pub const DICTIONARY_DESCRIPTION_KEY: &str = "description";
pub const DICTIONARY_DATE_KEY: &str = "date";
pub const HAS_HISTORICAL_INFO_KEY: &str = "HAS_HISTORICAL_INFO";
pub const USES_FORGETTING_CURVE_KEY: &str = "USES_FORGETTING_CURVE";
pub const MAX_UNIGRAM_COUNT_KEY: &str = "MAX_UNIGRAM_ENTRY_COUNT";
pub const MAX_BIGRAM_COUNT_KEY: &str = "MAX_BIGRAM_ENTRY_COUNT";
pub const ATTRIBUTE_VALUE_TRUE: &str = "1";

/// String attributes written when a dictionary file is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionaryHeader {
    attributes: BTreeMap<String, String>,
}

impl DictionaryHeader {
    pub fn new(id: &str, locale: &Locale, version: &str) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(DICTIONARY_ID_KEY.to_string(), id.to_string());
        attributes.insert(DICTIONARY_LOCALE_KEY.to_string(), locale.to_string());
        attributes.insert(DICTIONARY_VERSION_KEY.to_string(), version.to_string());
        Self { attributes }
    }

    /// Validates that the identifying attributes are present.
    pub fn from_attributes(attributes: BTreeMap<String, String>) -> Result<Self, DictError> {
        for key in [DICTIONARY_ID_KEY, DICTIONARY_LOCALE_KEY, DICTIONARY_VERSION_KEY] {
            if !attributes.contains_key(key) {
                return Err(DictError::MissingAttribute(key));
            }
        }
        Ok(Self { attributes })
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub(crate) fn into_attributes(self) -> BTreeMap<String, String> {
        self.attributes
    }

    pub fn id(&self) -> &str {
        self.attribute(DICTIONARY_ID_KEY).unwrap_or_default()
    }

    pub fn locale(&self) -> Locale {
        Locale::new(self.attribute(DICTIONARY_LOCALE_KEY).unwrap_or_default())
    }

    pub fn version(&self) -> &str {
        self.attribute(DICTIONARY_VERSION_KEY).unwrap_or_default()
    }

    pub fn description(&self) -> Option<&str> {
        self.attribute(DICTIONARY_DESCRIPTION_KEY)
    }

    pub fn date(&self) -> Option<i64> {
        self.attribute(DICTIONARY_DATE_KEY)?.parse().ok()
    }

    pub fn has_historical_info(&self) -> bool {
        self.attribute(HAS_HISTORICAL_INFO_KEY) == Some(ATTRIBUTE_VALUE_TRUE)
    }

    pub fn uses_forgetting_curve(&self) -> bool {
        self.attribute(USES_FORGETTING_CURVE_KEY) == Some(ATTRIBUTE_VALUE_TRUE)
    }

    pub(crate) fn max_count(&self, key: &str) -> Option<usize> {
        self.attribute(key)?.parse().ok()
    }
}
