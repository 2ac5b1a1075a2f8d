//! The IME's single entry point to its dictionaries.
//!
//! A facilitator holds one `DictionaryGroup` per enabled locale. Readers take
//! a snapshot of the group list, so a reset builds the new list completely
//! and swaps it in with one store; the previous dictionaries are closed only
//! after the swap. Learning and main-dictionary loading run on a background
//! worker and never block the caller.

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dicta_core::dict::{
    ComposedData, Dictionary, DictionaryStats, DictionaryType, SuggestedWordInfo,
    SuggestionOptions, UserHistoryDictionary,
};
use dicta_core::locale::Locale;
use dicta_core::ngram::{NgramContext, WordInfo};
use dicta_core::probability::{NOT_A_PROBABILITY, NOT_A_VALID_TIMESTAMP};
use dicta_core::settings::settings;
use dicta_core::unicode::{
    capitalize_first_and_downcase_rest, code_point_count, decapitalize, split_on_whitespace,
};
use lru::LruCache;
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::async_worker::AsyncWorker;
use crate::factory::DictionaryFactory;
use crate::group::{DictionaryGroup, SubDicts, MAX_CONFIDENCE};
use crate::suggestion_results::SuggestionResults;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Loading is still in progress; this says nothing about whether a
    /// dictionary exists.
    #[error("main dictionaries not loaded within {0:?}")]
    Timeout(Duration),
}

/// Notified from the background worker when main dictionaries finish
/// loading.
pub trait DictionaryInitializationListener: Send + Sync {
    fn on_update_main_dictionary_availability(&self, is_main_dictionary_available: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputStyle {
    #[default]
    Typing,
    /// Next-word prediction after a commit.
    Prediction,
}

/// Why a word is being unlearned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventType {
    NotSet,
    Backspace,
    Rejection,
    Revert,
}

/// What `reset_dictionaries` should serve.
#[derive(Debug, Clone)]
pub struct ResetOptions {
    /// The first locale is the main locale; duplicates are ignored.
    pub locales: Vec<Locale>,
    pub use_contacts: bool,
    pub use_apps: bool,
    pub use_personalization: bool,
    pub force_reload: bool,
    pub account: Option<String>,
    pub name_prefix: String,
}

impl ResetOptions {
    pub fn new(locale: Locale) -> Self {
        Self {
            locales: vec![locale],
            use_contacts: false,
            use_apps: false,
            use_personalization: false,
            force_reload: false,
            account: None,
            name_prefix: String::new(),
        }
    }

    fn sub_dictionary_types(&self) -> Vec<DictionaryType> {
        let mut types = vec![DictionaryType::User];
        if self.use_apps {
            types.push(DictionaryType::Apps);
        }
        if self.use_personalization {
            types.push(DictionaryType::UserHistory);
        }
        if self.use_contacts {
            types.push(DictionaryType::Contacts);
        }
        types
    }
}

// ---------------------------------------------------------------------------
// Load latch
// ---------------------------------------------------------------------------

struct LoadLatch {
    loaded: Mutex<bool>,
    cond: Condvar,
}

impl LoadLatch {
    fn new(loaded: bool) -> Self {
        Self {
            loaded: Mutex::new(loaded),
            cond: Condvar::new(),
        }
    }

    fn release(&self) {
        *self.loaded.lock() = true;
        self.cond.notify_all();
    }

    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut loaded = self.loaded.lock();
        while !*loaded {
            if self.cond.wait_until(&mut loaded, deadline).timed_out() {
                return *loaded;
            }
        }
        true
    }
}

/// Releases the latch even when the load job is dropped unrun.
struct ReleaseOnDrop(Arc<LoadLatch>);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.release();
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

type Groups = Arc<Vec<Arc<DictionaryGroup>>>;

struct Inner {
    factory: Arc<dyn DictionaryFactory>,
    groups: RwLock<Groups>,
    swap_lock: Mutex<()>,
    latch: Mutex<Arc<LoadLatch>>,
    spelling_cache: Mutex<Option<LruCache<String, bool>>>,
    /// Word rewritten at the start of a sentence, replaced in the following
    /// contexts as long as it keeps appearing there.
    changed_word: Mutex<Option<(String, String)>>,
    add_to_personal_dictionary: AtomicBool,
}

fn currently_preferred(groups: &[Arc<DictionaryGroup>]) -> &Arc<DictionaryGroup> {
    let mut preferred = &groups[0];
    for group in &groups[1..] {
        if group.confidence() > preferred.confidence() {
            preferred = group;
        }
    }
    preferred
}

/// The preferred group, if no other locale competes with it.
fn clearly_preferred(groups: &[Arc<DictionaryGroup>]) -> Option<&Arc<DictionaryGroup>> {
    if groups.len() == 1 {
        return groups.first();
    }
    let preferred = currently_preferred(groups);
    if preferred.confidence() < MAX_CONFIDENCE {
        return None;
    }
    let contested = groups
        .iter()
        .any(|g| !Arc::ptr_eq(g, preferred) && g.confidence() > 0);
    (!contested).then_some(preferred)
}

fn suggestions_for_group(
    group: &DictionaryGroup,
    groups: &[Arc<DictionaryGroup>],
    composed: &ComposedData,
    ngram_context: &NgramContext,
    options: &SuggestionOptions,
    session_id: usize,
) -> Vec<SuggestedWordInfo> {
    let weight = group.weight_for_locale(groups, composed.is_batch_mode);
    let mut out = Vec::new();
    for dict_type in DictionaryType::ALL {
        let Some(dict) = group.dict(dict_type) else {
            continue;
        };
        let Some(suggestions) =
            dict.get_suggestions(composed, ngram_context, options, session_id, weight)
        else {
            continue;
        };
        // Gesture decoding can produce words the dictionary only holds as
        // prefixes or n-gram targets.
        let check_for_garbage = composed.is_batch_mode
            && matches!(dict_type, DictionaryType::Main | DictionaryType::UserHistory);
        for info in suggestions {
            if groups.iter().any(|g| g.is_blacklisted(&info.word)) {
                continue;
            }
            if check_for_garbage
                && info.code_point_count() > 2
                && info.source == dict_type
                && !dict.is_in_dictionary(&info.word)
            {
                continue;
            }
            out.push(info);
        }
    }
    out
}

impl Inner {
    fn groups(&self) -> Groups {
        Arc::clone(&self.groups.read())
    }

    fn group_for(&self, locale: &Locale) -> Option<Arc<DictionaryGroup>> {
        self.groups().iter().find(|g| g.locale() == locale).cloned()
    }

    fn has_at_least_one_initialized_main_dictionary(&self) -> bool {
        self.groups()
            .iter()
            .any(|g| g.main_dict().is_some_and(|m| m.is_initialized()))
    }

    fn has_at_least_one_uninitialized_main_dictionary(&self) -> bool {
        self.groups()
            .iter()
            .any(|g| !g.main_dict().is_some_and(|m| m.is_initialized()))
    }

    fn is_valid_word_anywhere(&self, word: &str) -> bool {
        self.groups().iter().any(|g| g.is_valid_word(word))
    }

    fn is_valid_spelling_word(&self, word: &str) -> bool {
        if let Some(cache) = self.spelling_cache.lock().as_mut() {
            if let Some(&valid) = cache.get(word) {
                return valid;
            }
        }
        let valid = self.is_valid_word_anywhere(word);
        if let Some(cache) = self.spelling_cache.lock().as_mut() {
            cache.put(word.to_string(), valid);
        }
        valid
    }

    /// Drops cached answers for every casing of `word` the IME may ask about.
    fn evict_spelling_of(&self, word: &str) {
        if let Some(cache) = self.spelling_cache.lock().as_mut() {
            for form in [
                word.to_string(),
                word.to_lowercase(),
                capitalize_first_and_downcase_rest(word),
            ] {
                cache.pop(&form);
            }
        }
    }

    fn evict_spelling_cache(&self) {
        if let Some(cache) = self.spelling_cache.lock().as_mut() {
            cache.clear();
        }
    }

    fn adjust_confidences(&self, word: &str, was_auto_capitalized: bool) {
        let groups = self.groups();
        if groups.len() == 1 || word.contains(' ') {
            return;
        }
        let decapitalized = decapitalize(word);
        for group in groups.iter() {
            if group.is_valid_word(word)
                || (was_auto_capitalized && group.is_valid_word(&decapitalized))
            {
                group.increase_confidence();
            } else {
                group.decrease_confidence();
            }
        }
    }

    fn add_to_user_history(
        &self,
        suggestion: &str,
        was_auto_capitalized: bool,
        ngram_context: &NgramContext,
        timestamp: i32,
        block_potentially_offensive: bool,
    ) {
        let words = split_on_whitespace(suggestion);
        if words.len() == 1 {
            self.adjust_confidences(suggestion, was_auto_capitalized);
        }
        let groups = self.groups();
        if self.add_to_personal_dictionary.load(Ordering::SeqCst)
            && groups[0].has_dict(DictionaryType::UserHistory)
            && !was_auto_capitalized
            && words.len() == 1
        {
            self.add_to_personal_dictionary_if_invalid_but_in_history(suggestion, &groups);
        }

        let preferred = currently_preferred(&groups);
        let mut ngram_context = ngram_context.clone();
        for (i, word) in words.iter().enumerate() {
            let auto_capitalized = i == 0 && was_auto_capitalized;
            self.add_word_to_user_history(
                preferred,
                &ngram_context,
                word,
                auto_capitalized,
                timestamp,
                block_potentially_offensive,
            );
            ngram_context = ngram_context.next_ngram_context(WordInfo::word(*word));

            // Typing a blacklisted word in the locale being used brings it back.
            for group in groups
                .iter()
                .filter(|g| g.confidence() == preferred.confidence())
            {
                group.remove_from_blacklist(word);
            }
            self.evict_spelling_of(word);
        }
    }

    fn add_word_to_user_history(
        &self,
        group: &DictionaryGroup,
        ngram_context: &NgramContext,
        word: &str,
        was_auto_capitalized: bool,
        timestamp: i32,
        block_potentially_offensive: bool,
    ) {
        let Some(history) = group.sub_dict(DictionaryType::UserHistory) else {
            return;
        };
        let main = group.main_dict();
        let main_frequency = main
            .as_ref()
            .map_or(NOT_A_PROBABILITY, |m| m.get_frequency(word));
        if main_frequency == 0 && block_potentially_offensive {
            return;
        }

        let mut ngram_context = ngram_context.clone();
        let mut changed_word = self.changed_word.lock();
        if let Some((from, to)) = changed_word.as_ref() {
            if !ngram_context.change_word_if_after_beginning_of_sentence(from, to) {
                *changed_word = None;
            }
        }

        let word_to_use = if was_auto_capitalized || ngram_context.is_beginning_of_sentence_context()
        {
            let decapitalized = decapitalize(word);
            if group.is_valid_word(word) && !group.is_valid_word(&decapitalized) {
                word.to_string()
            } else {
                *changed_word = Some((word.to_string(), decapitalized.clone()));
                decapitalized
            }
        } else {
            let lowercase = word.to_lowercase();
            let lowercase_frequency = main
                .as_ref()
                .map_or(NOT_A_PROBABILITY, |m| m.get_frequency(&lowercase));
            if main_frequency < lowercase_frequency
                && lowercase_frequency >= settings().facilitator.capitalized_form_max_probability
            {
                lowercase
            } else {
                word.to_string()
            }
        };
        drop(changed_word);

        let is_valid = main_frequency > 0;
        UserHistoryDictionary::add_to_dictionary(
            &history,
            &ngram_context,
            &word_to_use,
            is_valid,
            timestamp,
        );
    }

    fn add_to_personal_dictionary_if_invalid_but_in_history(
        &self,
        word: &str,
        groups: &[Arc<DictionaryGroup>],
    ) {
        if code_point_count(word) <= 1 {
            return;
        }
        let Some(group) = clearly_preferred(groups) else {
            return;
        };
        let (Some(user), Some(history)) = (
            group.sub_dict(DictionaryType::User),
            group.sub_dict(DictionaryType::UserHistory),
        ) else {
            return;
        };
        if group.is_valid_word(word) || user.is_in_dictionary(word) {
            return;
        }
        let facilitator = &settings().facilitator;
        if history.get_frequency(word) > facilitator.personal_dict_promotion_frequency {
            info!(locale = %group.locale(), "promoting frequently typed word to user dictionary");
            user.add_unigram_entry(
                word,
                facilitator.personal_dict_frequency,
                None,
                false,
                false,
                NOT_A_VALID_TIMESTAMP,
            );
        }
    }

    fn unlearn_from_user_history(&self, word: &str, event: InputEventType) {
        if event != InputEventType::Backspace {
            let groups = self.groups();
            let preferred = currently_preferred(&groups);
            if let Some(history) = preferred.sub_dict(DictionaryType::UserHistory) {
                history.remove_unigram_entry_dynamically(word);
            }
        }
        self.evict_spelling_of(word);
    }
}

// ---------------------------------------------------------------------------
// DictionaryFacilitator
// ---------------------------------------------------------------------------

pub struct DictionaryFacilitator {
    inner: Arc<Inner>,
    worker: AsyncWorker,
}

impl DictionaryFacilitator {
    pub fn new(factory: Arc<dyn DictionaryFactory>) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory,
                groups: RwLock::new(Arc::new(vec![Arc::new(DictionaryGroup::empty())])),
                swap_lock: Mutex::new(()),
                latch: Mutex::new(Arc::new(LoadLatch::new(true))),
                spelling_cache: Mutex::new(None),
                changed_word: Mutex::new(None),
                add_to_personal_dictionary: AtomicBool::new(false),
            }),
            worker: AsyncWorker::new(),
        }
    }

    /// Caches `is_valid_spelling_word` answers. A capacity of zero disables
    /// the cache.
    pub fn set_valid_spelling_word_cache(&self, capacity: usize) {
        *self.inner.spelling_cache.lock() = NonZeroUsize::new(capacity).map(LruCache::new);
    }

    pub fn set_add_to_personal_dictionary(&self, enabled: bool) {
        self.inner
            .add_to_personal_dictionary
            .store(enabled, Ordering::SeqCst);
    }

    // ---------------------------------------------------------------------
    // Locales
    // ---------------------------------------------------------------------

    pub fn is_for_locale(&self, locale: &Locale) -> bool {
        self.inner.groups()[0].locale() == locale
    }

    pub fn is_active(&self) -> bool {
        !self.inner.groups()[0].locale().language().is_empty()
    }

    pub fn main_locale(&self) -> Locale {
        self.inner.groups()[0].locale().clone()
    }

    /// Locale of the group the user currently seems to type in.
    pub fn current_locale(&self) -> Locale {
        currently_preferred(&self.inner.groups()).locale().clone()
    }

    pub fn uses_same_settings(
        &self,
        locales: &[Locale],
        use_contacts: bool,
        use_apps: bool,
        use_personalization: bool,
    ) -> bool {
        let groups = self.inner.groups();
        let first = &groups[0];
        first.has_dict(DictionaryType::Contacts) == use_contacts
            && first.has_dict(DictionaryType::Apps) == use_apps
            && first.has_dict(DictionaryType::UserHistory) == use_personalization
            && locales.len() == groups.len()
            && locales
                .iter()
                .all(|l| groups.iter().any(|g| g.locale() == l))
    }

    /// `"en_US 3, de 0"`, or `None` with a single locale.
    pub fn locales_and_confidences(&self) -> Option<String> {
        let groups = self.inner.groups();
        if groups.len() < 2 {
            return None;
        }
        Some(
            groups
                .iter()
                .map(|g| format!("{} {}", g.locale(), g.confidence()))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Rebuilds the served dictionaries. Dictionaries matching the new
    /// configuration are reused unless `force_reload` is set. Missing main
    /// dictionaries load in the background; `listener` hears about them
    /// immediately and again once loading finishes.
    pub fn reset_dictionaries(
        &self,
        options: &ResetOptions,
        listener: Option<Arc<dyn DictionaryInitializationListener>>,
    ) {
        let mut locales: Vec<Locale> = Vec::with_capacity(options.locales.len());
        for locale in &options.locales {
            if !locales.contains(locale) {
                locales.push(locale.clone());
            }
        }
        if locales.is_empty() {
            warn!("reset without a locale ignored");
            return;
        }
        let sub_types = options.sub_dictionary_types();
        let blacklist_dir = self.inner.factory.blacklist_dir();

        let _swap = self.inner.swap_lock.lock();
        let old_groups = self.inner.groups();
        let mut new_groups = Vec::with_capacity(locales.len());
        for locale in &locales {
            let old = old_groups
                .iter()
                .find(|g| g.locale() == locale)
                .filter(|_| !options.force_reload);
            let main = old.and_then(|g| g.main_dict());
            let mut sub_dicts = SubDicts::new();
            for &dict_type in &sub_types {
                let dict = match old.and_then(|g| g.sub_dict(dict_type)) {
                    Some(dict) => Some(dict),
                    None => self.inner.factory.create_sub_dictionary(
                        dict_type,
                        locale,
                        options.account.as_deref(),
                        &options.name_prefix,
                    ),
                };
                if let Some(dict) = dict {
                    sub_dicts.insert(dict_type, dict);
                }
            }
            new_groups.push(Arc::new(DictionaryGroup::new(
                locale.clone(),
                main,
                sub_dicts,
                blacklist_dir.as_deref(),
            )));
        }

        *self.inner.groups.write() = Arc::new(new_groups);
        info!(
            locales = ?locales,
            contacts = options.use_contacts,
            apps = options.use_apps,
            personalization = options.use_personalization,
            "dictionaries reset"
        );

        if self.inner.has_at_least_one_uninitialized_main_dictionary() {
            self.reload_uninitialized_main_dictionaries(locales, listener.clone());
        }
        if let Some(listener) = &listener {
            listener.on_update_main_dictionary_availability(
                self.inner.has_at_least_one_initialized_main_dictionary(),
            );
        }

        let new_groups = self.inner.groups();
        for old in old_groups.iter() {
            for dict_type in DictionaryType::ALL {
                let Some(dict) = old.dict(dict_type) else {
                    continue;
                };
                // Shared instances (history from the personalization cache)
                // may have been handed to the new groups.
                if !new_groups.iter().any(|g| g.holds(dict_type, &dict)) {
                    old.close_dict(dict_type);
                }
            }
        }
        self.inner.evict_spelling_cache();
    }

    fn reload_uninitialized_main_dictionaries(
        &self,
        locales: Vec<Locale>,
        listener: Option<Arc<dyn DictionaryInitializationListener>>,
    ) {
        let latch = Arc::new(LoadLatch::new(false));
        *self.inner.latch.lock() = Arc::clone(&latch);
        let release = ReleaseOnDrop(latch);
        let inner = Arc::clone(&self.inner);
        self.worker.submit(move || {
            let _release = release;
            for locale in &locales {
                let Some(group) = inner.group_for(locale) else {
                    continue;
                };
                if group.main_dict().is_some_and(|m| m.is_initialized()) {
                    continue;
                }
                let main = inner.factory.create_main_dictionary(locale);
                debug!(locale = %locale, loaded = main.is_some(), "main dictionary load finished");
                group.set_main_dict(main);
            }
            let available = inner.has_at_least_one_initialized_main_dictionary();
            info!(available, "main dictionary availability changed");
            if let Some(listener) = listener {
                listener.on_update_main_dictionary_availability(available);
            }
        });
    }

    pub fn has_at_least_one_initialized_main_dictionary(&self) -> bool {
        self.inner.has_at_least_one_initialized_main_dictionary()
    }

    pub fn has_at_least_one_uninitialized_main_dictionary(&self) -> bool {
        self.inner.has_at_least_one_uninitialized_main_dictionary()
    }

    /// Waits for the last requested main-dictionary load. A timeout means
    /// "not ready yet", not "no dictionary".
    pub fn wait_for_loading_main_dictionaries(&self, timeout: Duration) -> Result<(), LoadError> {
        let latch = Arc::clone(&self.inner.latch.lock());
        if latch.wait(timeout) {
            Ok(())
        } else {
            Err(LoadError::Timeout(timeout))
        }
    }

    /// Waits until queued learning has reached the dynamic dictionaries and
    /// they have applied it.
    pub fn wait_for_pending_tasks(&self) {
        self.worker.wait_for_pending();
        for group in self.inner.groups().iter() {
            for dict_type in DictionaryType::DYNAMIC {
                if let Some(dict) = group.sub_dict(dict_type) {
                    dict.wait_for_pending_tasks();
                }
            }
        }
    }

    /// Flushes dynamic dictionaries at the end of an input session.
    pub fn on_finish_input(&self) {
        for group in self.inner.groups().iter() {
            for dict_type in DictionaryType::ALL {
                if let Some(dict) = group.dict(dict_type) {
                    dict.on_finish_input();
                }
            }
        }
    }

    /// Releases every dictionary; the facilitator becomes inactive until the
    /// next reset. Pending learning is dropped.
    pub fn close_dictionaries(&self) {
        self.on_finish_input();
        let old_groups = {
            let _swap = self.inner.swap_lock.lock();
            let empty = Arc::new(vec![Arc::new(DictionaryGroup::empty())]);
            std::mem::replace(&mut *self.inner.groups.write(), empty)
        };
        self.worker.invalidate();
        for group in old_groups.iter() {
            for dict_type in DictionaryType::ALL {
                group.close_dict(dict_type);
            }
        }
        self.inner.evict_spelling_cache();
        debug!("dictionaries closed");
    }

    // ---------------------------------------------------------------------
    // Suggestions and validity
    // ---------------------------------------------------------------------

    /// Secondary locales are queried on scoped threads while the main locale
    /// is queried on the caller's. A failing dictionary, or a locale whose
    /// lookup panics, only loses its own suggestions.
    pub fn get_suggestion_results(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        options: &SuggestionOptions,
        session_id: usize,
        input_style: InputStyle,
    ) -> SuggestionResults {
        let groups = self.inner.groups();
        let mut results = SuggestionResults::new(
            settings().suggestions.max_results,
            ngram_context.is_beginning_of_sentence_context(),
            input_style == InputStyle::Prediction,
        );
        let all: &[Arc<DictionaryGroup>] = &groups;
        let Some((first, rest)) = all.split_first() else {
            return results;
        };
        thread::scope(|scope| {
            let handles: Vec<_> = rest
                .iter()
                .map(|group| {
                    scope.spawn(move || {
                        suggestions_for_group(
                            group,
                            all,
                            composed,
                            ngram_context,
                            options,
                            session_id,
                        )
                    })
                })
                .collect();
            let primary = panic::catch_unwind(AssertUnwindSafe(|| {
                suggestions_for_group(first, all, composed, ngram_context, options, session_id)
            }));
            match primary {
                Ok(suggestions) => results.add_all(suggestions),
                Err(_) => warn!("suggestion lookup for the main locale panicked"),
            }
            for handle in handles {
                match handle.join() {
                    Ok(suggestions) => results.add_all(suggestions),
                    Err(_) => warn!("suggestion lookup for a secondary locale panicked"),
                }
            }
        });
        results
    }

    pub fn is_valid_spelling_word(&self, word: &str) -> bool {
        self.inner.is_valid_spelling_word(word)
    }

    /// Validity in the main locale only.
    pub fn is_valid_suggestion_word(&self, word: &str) -> bool {
        self.inner.groups()[0].is_valid_word(word)
    }

    pub fn get_max_frequency_of_exact_matches(&self, word: &str) -> i32 {
        let groups = self.inner.groups();
        let mut max = NOT_A_PROBABILITY;
        for group in groups.iter() {
            for dict_type in DictionaryType::ALL {
                if let Some(dict) = group.dict(dict_type) {
                    max = max.max(dict.get_max_frequency_of_exact_matches(word));
                }
            }
        }
        max
    }

    // ---------------------------------------------------------------------
    // Learning
    // ---------------------------------------------------------------------

    /// Learns a committed suggestion. Multi-word suggestions are learned
    /// word by word, each in the context of the previous one.
    pub fn add_to_user_history(
        &self,
        suggestion: &str,
        was_auto_capitalized: bool,
        ngram_context: &NgramContext,
        timestamp: i32,
        block_potentially_offensive: bool,
    ) {
        let inner = Arc::clone(&self.inner);
        let suggestion = suggestion.to_string();
        let ngram_context = ngram_context.clone();
        self.worker.submit(move || {
            inner.add_to_user_history(
                &suggestion,
                was_auto_capitalized,
                &ngram_context,
                timestamp,
                block_potentially_offensive,
            );
        });
    }

    pub fn unlearn_from_user_history(&self, word: &str, event: InputEventType) {
        let inner = Arc::clone(&self.inner);
        let word = word.to_string();
        self.worker
            .submit(move || inner.unlearn_from_user_history(&word, event));
    }

    /// Moves locale confidence towards the groups that know `word`.
    pub fn adjust_confidences(&self, word: &str, was_auto_capitalized: bool) {
        let inner = Arc::clone(&self.inner);
        let word = word.to_string();
        self.worker
            .submit(move || inner.adjust_confidences(&word, was_auto_capitalized));
    }

    /// Removes the word from learned data in every locale, blacklisting it
    /// where it cannot be deleted.
    pub fn remove_word(&self, word: &str) {
        for group in self.inner.groups().iter() {
            group.remove_word(word);
        }
        self.inner.evict_spelling_cache();
    }

    pub fn clear_user_history_dictionary(&self) {
        for group in self.inner.groups().iter() {
            if let Some(history) = group.sub_dict(DictionaryType::UserHistory) {
                history.clear();
            }
        }
        self.inner.evict_spelling_cache();
    }

    // ---------------------------------------------------------------------
    // Debug
    // ---------------------------------------------------------------------

    /// Logs every entry of a dynamic dictionary of the main locale.
    pub fn dump_dictionary_for_debug(&self, dict_name: &str) {
        let dict = dict_name
            .parse::<DictionaryType>()
            .ok()
            .and_then(|t| self.inner.groups()[0].sub_dict(t));
        match dict {
            Some(dict) => dict.dump_all_words_for_debug(),
            None => error!(dict_name, "cannot dump dictionary: not present"),
        }
    }

    pub fn get_dictionary_stats(&self) -> Vec<DictionaryStats> {
        let groups = self.inner.groups();
        DictionaryType::DYNAMIC
            .into_iter()
            .flat_map(|t| groups.iter().filter_map(move |g| g.sub_dict(t)))
            .map(|dict| dict.get_dictionary_stats())
            .collect()
    }

    pub fn dump(&self) -> String {
        self.get_dictionary_stats()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
