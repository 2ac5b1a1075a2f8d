mod learning;
mod suggestions;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dicta_core::dict::{
    BinaryDictionary, DictionaryConfig, DictionaryHeader, ExpandableBinaryDictionary,
};
use dicta_core::locale::Locale;
use dicta_core::ngram::NgramContext;
use dicta_core::personalization::PersonalizationHelper;
use dicta_core::probability::NOT_A_VALID_TIMESTAMP;
use tempfile::TempDir;

use crate::{DictionaryFacilitator, FileDictionaryFactory, ResetOptions};

pub(super) const EN: &[(&str, i32)] = &[
    ("hello", 180),
    ("help", 150),
    ("helmet", 90),
    ("the", 250),
    ("they", 200),
    ("there", 190),
    ("Paris", 160),
    ("world", 170),
    ("darn", 0),
];

pub(super) const DE: &[(&str, i32)] = &[("hallo", 180), ("danke", 170), ("der", 240)];

/// Main dictionary file for `tag`, optionally with one shortcut entry.
pub(super) fn write_main(
    dir: &Path,
    tag: &str,
    words: &[(&str, i32)],
    shortcut: Option<(&str, &str)>,
) {
    let header = DictionaryHeader::new(&format!("main:{tag}"), &Locale::new(tag), "1");
    let mut dict = BinaryDictionary::create_on_memory(header);
    for &(word, freq) in words {
        dict.add_unigram_entry(word, freq, None, false, false, NOT_A_VALID_TIMESTAMP);
    }
    if let Some((word, target)) = shortcut {
        dict.add_unigram_entry(
            word,
            120,
            Some((target, 200)),
            false,
            false,
            NOT_A_VALID_TIMESTAMP,
        );
    }
    dict.flush(&dir.join(format!("main_{tag}.dict"))).unwrap();
}

pub(super) struct Fixture {
    pub facilitator: DictionaryFacilitator,
    pub helper: Arc<PersonalizationHelper>,
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let main_dir = dir.path().join("main");
        write_main(&main_dir, "en", EN, Some(("omw", "on my way")));
        write_main(&main_dir, "de", DE, None);
        let helper = Arc::new(PersonalizationHelper::new(DictionaryConfig::new(
            dir.path().join("files"),
        )));
        let factory = FileDictionaryFactory::new(main_dir, Arc::clone(&helper));
        Self {
            facilitator: DictionaryFacilitator::new(Arc::new(factory)),
            helper,
            dir,
        }
    }

    pub fn options(locales: &[&str]) -> ResetOptions {
        ResetOptions {
            locales: locales.iter().map(|l| Locale::new(*l)).collect(),
            use_personalization: true,
            ..ResetOptions::new(Locale::root())
        }
    }

    /// Resets with personalization on and waits for the main dictionaries.
    pub fn reset(&self, locales: &[&str]) {
        self.facilitator
            .reset_dictionaries(&Self::options(locales), None);
        self.facilitator
            .wait_for_loading_main_dictionaries(Duration::from_secs(5))
            .unwrap();
        self.facilitator.wait_for_pending_tasks();
    }

    pub fn learn(&self, text: &str, ngram_context: &NgramContext, was_auto_capitalized: bool) {
        self.facilitator.add_to_user_history(
            text,
            was_auto_capitalized,
            ngram_context,
            NOT_A_VALID_TIMESTAMP,
            true,
        );
        self.facilitator.wait_for_pending_tasks();
    }

    /// The history dictionary the facilitator writes to for `locale`.
    pub fn history(&self, locale: &str) -> Arc<ExpandableBinaryDictionary> {
        let dict = self
            .helper
            .get_user_history_dictionary(&Locale::new(locale), None, "");
        dict.wait_for_pending_tasks();
        dict
    }
}
