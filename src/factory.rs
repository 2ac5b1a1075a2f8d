//! Creation of the dictionaries a facilitator serves.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dicta_core::dict::names::NameSource;
use dicta_core::dict::{
    AppsBinaryDictionary, ContactsBinaryDictionary, Dictionary, DictionaryConfig, DictionaryType,
    ExpandableBinaryDictionary, KoreanDictionary, ReadOnlyBinaryDictionary, UserBinaryDictionary,
};
use dicta_core::locale::Locale;
use dicta_core::personalization::PersonalizationHelper;
use tracing::{debug, warn};

/// Supplies dictionaries per locale. `None` means the dictionary is not
/// available, which the facilitator tolerates for every type.
pub trait DictionaryFactory: Send + Sync {
    /// Called off the IME thread; may take a while.
    fn create_main_dictionary(&self, locale: &Locale) -> Option<Arc<dyn Dictionary>>;

    fn create_sub_dictionary(
        &self,
        dict_type: DictionaryType,
        locale: &Locale,
        account: Option<&str>,
        name_prefix: &str,
    ) -> Option<Arc<ExpandableBinaryDictionary>>;

    /// Directory holding per-locale blacklist files. `None` keeps blacklists
    /// in memory only.
    fn blacklist_dir(&self) -> Option<PathBuf> {
        None
    }
}

/// Main dictionaries from `main_<locale>.dict` files, dynamic dictionaries
/// under the configured files directory.
pub struct FileDictionaryFactory {
    main_dir: PathBuf,
    personalization: Arc<PersonalizationHelper>,
    apps: Option<Arc<dyn NameSource>>,
    contacts: Option<Arc<dyn NameSource>>,
}

impl FileDictionaryFactory {
    pub fn new(main_dir: impl Into<PathBuf>, personalization: Arc<PersonalizationHelper>) -> Self {
        Self {
            main_dir: main_dir.into(),
            personalization,
            apps: None,
            contacts: None,
        }
    }

    pub fn with_apps(mut self, source: Arc<dyn NameSource>) -> Self {
        self.apps = Some(source);
        self
    }

    pub fn with_contacts(mut self, source: Arc<dyn NameSource>) -> Self {
        self.contacts = Some(source);
        self
    }

    fn config(&self) -> &DictionaryConfig {
        self.personalization.config()
    }

    /// File for `locale`, falling back to the bare language.
    pub fn main_dictionary_file(&self, locale: &Locale) -> Option<PathBuf> {
        let exact = main_file_name(&self.main_dir, locale.as_str());
        if exact.is_file() {
            return Some(exact);
        }
        let language = main_file_name(&self.main_dir, locale.language());
        language.is_file().then_some(language)
    }
}

fn main_file_name(dir: &Path, tag: &str) -> PathBuf {
    dir.join(format!("main_{tag}.dict"))
}

impl DictionaryFactory for FileDictionaryFactory {
    fn create_main_dictionary(&self, locale: &Locale) -> Option<Arc<dyn Dictionary>> {
        let Some(path) = self.main_dictionary_file(locale) else {
            debug!(locale = %locale, "no main dictionary");
            return None;
        };
        let length = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(file = %path.display(), "cannot stat main dictionary: {e}");
                return None;
            }
        };
        let dict = match ReadOnlyBinaryDictionary::open(&path, 0, length, DictionaryType::Main) {
            Ok(dict) => dict,
            Err(e) => {
                warn!(file = %path.display(), "failed to open main dictionary: {e}");
                return None;
            }
        };
        debug!(locale = %locale, file = %path.display(), "opened main dictionary");
        let dict: Arc<dyn Dictionary> = Arc::new(dict);
        if locale.language() == "ko" {
            Some(Arc::new(KoreanDictionary::new(dict)))
        } else {
            Some(dict)
        }
    }

    fn create_sub_dictionary(
        &self,
        dict_type: DictionaryType,
        locale: &Locale,
        account: Option<&str>,
        name_prefix: &str,
    ) -> Option<Arc<ExpandableBinaryDictionary>> {
        let config = self.config();
        let dict = match dict_type {
            DictionaryType::Main => return None,
            DictionaryType::UserHistory => {
                return Some(
                    self.personalization
                        .get_user_history_dictionary(locale, account, name_prefix),
                )
            }
            DictionaryType::User => {
                UserBinaryDictionary::create(locale, account, name_prefix, config)
            }
            DictionaryType::Apps => AppsBinaryDictionary::create(
                Arc::clone(self.apps.as_ref()?),
                locale,
                name_prefix,
                config,
            ),
            DictionaryType::Contacts => ContactsBinaryDictionary::create(
                Arc::clone(self.contacts.as_ref()?),
                locale,
                account,
                name_prefix,
                config,
            ),
        };
        dict.reload_dictionary_if_required();
        Some(Arc::new(dict))
    }

    fn blacklist_dir(&self) -> Option<PathBuf> {
        Some(self.config().files_dir.join("blacklists"))
    }
}
