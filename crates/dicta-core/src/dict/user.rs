use super::expandable::{DictionaryConfig, DictionaryContent};
use super::{DictionaryType, ExpandableBinaryDictionary};
use crate::locale::Locale;

/// Words the user explicitly added. Starts empty and counts as a spelling
/// authority.
pub struct UserBinaryDictionary;

impl UserBinaryDictionary {
    pub const NAME: &'static str = "user";

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
}

impl DictionaryContent for UserBinaryDictionary {
    fn dict_type(&self) -> DictionaryType {
        DictionaryType::User
    }

    fn is_user_specific(&self) -> bool {
        true
    }
}
