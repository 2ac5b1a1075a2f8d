use std::sync::Arc;

use super::expandable::{DictWriter, DictionaryConfig, DictionaryContent, RecreateHandle};
use super::names::{add_names_locked, NameSource};
use super::{DictionaryType, ExpandableBinaryDictionary};
use crate::locale::Locale;
use crate::settings::settings;

/// Contact display names, optionally partitioned by account.
pub struct ContactsBinaryDictionary {
    source: Arc<dyn NameSource>,
}

impl ContactsBinaryDictionary {
    pub const NAME: &'static str = "contacts";

    pub fn create(
        source: Arc<dyn NameSource>,
        locale: &Locale,
        account: Option<&str>,
        name_prefix: &str,
        config: &DictionaryConfig,
    ) -> ExpandableBinaryDictionary {
        let dict_name =
            ExpandableBinaryDictionary::dict_name(name_prefix, Self::NAME, locale, account);
        ExpandableBinaryDictionary::new(Box::new(Self { source }), dict_name, locale, config)
    }
}

impl DictionaryContent for ContactsBinaryDictionary {
    fn dict_type(&self) -> DictionaryType {
        DictionaryType::Contacts
    }

    fn load_initial_contents(&self, writer: &mut DictWriter<'_>) {
        let names = &settings().names;
        add_names_locked(
            writer,
            &self.source.names(),
            names.contacts_frequency,
            names.contacts_bigram_frequency,
        );
    }

    fn is_user_specific(&self) -> bool {
        true
    }

    fn attach(&self, handle: &RecreateHandle) {
        self.source.register_for_updates(handle);
    }

    fn detach(&self, handle: &RecreateHandle) {
        self.source.unregister(handle);
    }
}
