use std::sync::Arc;

use super::expandable::{DictWriter, DictionaryConfig, DictionaryContent, RecreateHandle};
use super::names::{add_names_locked, NameSource};
use super::{DictionaryType, ExpandableBinaryDictionary};
use crate::locale::Locale;
use crate::settings::settings;

/// Installed application labels. Rebuilt from scratch whenever the app list
/// changes.
pub struct AppsBinaryDictionary {
    source: Arc<dyn NameSource>,
}

impl AppsBinaryDictionary {
    pub const NAME: &'static str = "apps";

    pub fn create(
        source: Arc<dyn NameSource>,
        locale: &Locale,
        name_prefix: &str,
        config: &DictionaryConfig,
    ) -> ExpandableBinaryDictionary {
        let dict_name = ExpandableBinaryDictionary::dict_name(name_prefix, Self::NAME, locale, None);
        ExpandableBinaryDictionary::new(Box::new(Self { source }), dict_name, locale, config)
    }
}

impl DictionaryContent for AppsBinaryDictionary {
    fn dict_type(&self) -> DictionaryType {
        DictionaryType::Apps
    }

    fn load_initial_contents(&self, writer: &mut DictWriter<'_>) {
        let names = &settings().names;
        add_names_locked(
            writer,
            &self.source.names(),
            names.apps_frequency,
            names.apps_bigram_frequency,
        );
    }

    fn attach(&self, handle: &RecreateHandle) {
        self.source.register_for_updates(handle);
    }

    fn detach(&self, handle: &RecreateHandle) {
        self.source.unregister(handle);
    }
}
