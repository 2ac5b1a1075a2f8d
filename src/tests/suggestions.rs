use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use dicta_core::dict::names::InMemoryNameSource;
use dicta_core::dict::{
    ComposedData, Dictionary, DictionaryConfig, DictionaryType, ExpandableBinaryDictionary,
    SuggestedWordInfo, SuggestionKind, SuggestionOptions,
};
use dicta_core::locale::Locale;
use dicta_core::ngram::{NgramContext, WordInfo};
use dicta_core::personalization::PersonalizationHelper;
use parking_lot::Mutex;

use super::{write_main, Fixture, DE, EN};
use crate::{
    DictionaryFacilitator, DictionaryFactory, FileDictionaryFactory, InputStyle, ResetOptions,
    SuggestionResults,
};

fn suggest(
    fixture: &Fixture,
    composed: &ComposedData,
    ngram_context: &NgramContext,
) -> SuggestionResults {
    fixture.facilitator.get_suggestion_results(
        composed,
        ngram_context,
        &SuggestionOptions::default(),
        0,
        InputStyle::Typing,
    )
}

#[test]
fn test_completions_from_main_dictionary() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    let results = suggest(&fixture, &ComposedData::typed("hel"), &NgramContext::empty());
    assert_eq!(results.words(), vec!["hello", "help", "helmet"]);
    assert!(!results.is_prediction);
}

#[test]
fn test_learned_word_merges_with_main_entry() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.learn("helmet", &NgramContext::empty(), false);

    let results = suggest(&fixture, &ComposedData::typed("helm"), &NgramContext::empty());
    assert_eq!(results.words(), vec!["helmet"]);
    let helmet = results.first().unwrap();
    assert_eq!(helmet.source, DictionaryType::Main);
    assert_eq!(helmet.score, 90);
}

#[test]
fn test_history_predicts_next_word() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.learn("hello world", &NgramContext::empty(), false);

    let context = NgramContext::from_words(vec![WordInfo::word("hello")]);
    let results = fixture.facilitator.get_suggestion_results(
        &ComposedData::typed(""),
        &context,
        &SuggestionOptions::default(),
        0,
        InputStyle::Prediction,
    );
    assert!(results.is_prediction);
    let first = results.first().unwrap();
    assert_eq!(first.word, "world");
    assert_eq!(first.kind, SuggestionKind::Prediction);
    assert_eq!(first.source, DictionaryType::UserHistory);
}

#[test]
fn test_blacklisted_words_are_hidden() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.facilitator.remove_word("help");
    let results = suggest(&fixture, &ComposedData::typed("hel"), &NgramContext::empty());
    assert_eq!(results.words(), vec!["hello", "helmet"]);
}

#[test]
fn test_shortcuts_are_dropped_for_gestures() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    let typed = suggest(&fixture, &ComposedData::typed("omw"), &NgramContext::empty());
    assert!(typed.contains("on my way"));

    let gesture = suggest(&fixture, &ComposedData::batch("omw"), &NgramContext::empty());
    assert!(!gesture.contains("on my way"));
    assert!(gesture.contains("omw"));
}

#[test]
fn test_secondary_locale_is_weighted_by_confidence() {
    let fixture = Fixture::new();
    fixture.reset(&["en", "de"]);
    for _ in 0..2 {
        fixture.facilitator.adjust_confidences("hallo", false);
    }
    fixture.facilitator.wait_for_pending_tasks();
    assert_eq!(
        fixture.facilitator.locales_and_confidences().as_deref(),
        Some("en 0, de 3")
    );

    let results = suggest(&fixture, &ComposedData::typed("h"), &NgramContext::empty());
    let words = results.words();
    assert_eq!(words[0], "hallo");
    // 180 * (1 - 0.15 * 2)
    let hello = results.iter().find(|s| s.word == "hello").unwrap();
    assert_eq!(hello.score, 126);
}

#[test]
fn test_no_dictionaries_no_suggestions() {
    let fixture = Fixture::new();
    let results = suggest(&fixture, &ComposedData::typed("hel"), &NgramContext::empty());
    assert!(results.is_empty());
    fixture.reset(&["fr"]);
    let results = suggest(&fixture, &ComposedData::typed("hel"), &NgramContext::empty());
    assert!(results.is_empty());
}

/// File-backed dictionaries, except that the contacts dictionary is kept
/// for the test and `broken` locales get a main dictionary that panics.
struct InstrumentedFactory {
    inner: FileDictionaryFactory,
    contacts: Mutex<Option<Arc<ExpandableBinaryDictionary>>>,
    broken: Vec<Locale>,
}

impl InstrumentedFactory {
    fn new(dir: &std::path::Path, broken: &[&str]) -> Self {
        let main_dir = dir.join("main");
        write_main(&main_dir, "en", EN, None);
        write_main(&main_dir, "de", DE, None);
        let helper = Arc::new(PersonalizationHelper::new(DictionaryConfig::new(
            dir.join("files"),
        )));
        let contacts = Arc::new(InMemoryNameSource::new(["Helena Smith"]));
        Self {
            inner: FileDictionaryFactory::new(main_dir, helper).with_contacts(contacts),
            contacts: Mutex::new(None),
            broken: broken.iter().map(|l| Locale::new(*l)).collect(),
        }
    }
}

impl DictionaryFactory for InstrumentedFactory {
    fn create_main_dictionary(&self, locale: &Locale) -> Option<Arc<dyn Dictionary>> {
        if self.broken.contains(locale) {
            return Some(Arc::new(PanickingDictionary(locale.clone())));
        }
        self.inner.create_main_dictionary(locale)
    }

    fn create_sub_dictionary(
        &self,
        dict_type: DictionaryType,
        locale: &Locale,
        account: Option<&str>,
        name_prefix: &str,
    ) -> Option<Arc<ExpandableBinaryDictionary>> {
        let dict = self
            .inner
            .create_sub_dictionary(dict_type, locale, account, name_prefix)?;
        if dict_type == DictionaryType::Contacts {
            *self.contacts.lock() = Some(Arc::clone(&dict));
        }
        Some(dict)
    }
}

struct PanickingDictionary(Locale);

impl Dictionary for PanickingDictionary {
    fn dict_type(&self) -> DictionaryType {
        DictionaryType::Main
    }

    fn locale(&self) -> &Locale {
        &self.0
    }

    fn get_suggestions(
        &self,
        _composed: &ComposedData,
        _ngram_context: &NgramContext,
        _options: &SuggestionOptions,
        _session_id: usize,
        _weight_for_locale: f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        panic!("corrupt dictionary")
    }

    fn is_in_dictionary(&self, _word: &str) -> bool {
        false
    }
}

fn facilitator_for(factory: Arc<InstrumentedFactory>, locales: &[&str]) -> DictionaryFacilitator {
    let facilitator = DictionaryFacilitator::new(factory);
    let options = ResetOptions {
        locales: locales.iter().map(|l| Locale::new(*l)).collect(),
        use_contacts: true,
        ..ResetOptions::new(Locale::root())
    };
    facilitator.reset_dictionaries(&options, None);
    facilitator
        .wait_for_loading_main_dictionaries(Duration::from_secs(5))
        .unwrap();
    facilitator.wait_for_pending_tasks();
    facilitator
}

#[test]
fn test_busy_contacts_do_not_block_main_suggestions() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(InstrumentedFactory::new(dir.path(), &[]));
    let facilitator = facilitator_for(Arc::clone(&factory), &["en"]);
    let contacts = factory.contacts.lock().clone().unwrap();
    contacts.wait_for_pending_tasks();

    // Hold the contacts write lock on its worker until released.
    let (started_tx, started) = mpsc::channel();
    let (release, release_rx) = mpsc::channel::<()>();
    contacts.update_locked(move |_| {
        let _ = started_tx.send(());
        let _ = release_rx.recv();
    });
    started.recv().unwrap();

    let results = facilitator.get_suggestion_results(
        &ComposedData::typed("hel"),
        &NgramContext::empty(),
        &SuggestionOptions::default(),
        0,
        InputStyle::Typing,
    );
    assert_eq!(results.words(), vec!["hello", "help", "helmet"]);

    release.send(()).unwrap();
    contacts.wait_for_pending_tasks();
}

#[test]
fn test_panicking_main_locale_keeps_other_locales() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(InstrumentedFactory::new(dir.path(), &["en"]));
    let facilitator = facilitator_for(factory, &["en", "de"]);

    let results = facilitator.get_suggestion_results(
        &ComposedData::typed("hal"),
        &NgramContext::empty(),
        &SuggestionOptions::default(),
        0,
        InputStyle::Typing,
    );
    assert_eq!(results.words(), vec!["hallo"]);
}
