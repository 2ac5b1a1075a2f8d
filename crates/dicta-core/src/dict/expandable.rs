//! File-backed dynamic dictionaries.
//!
//! Every `ExpandableBinaryDictionary` owns one background thread. Loads,
//! mutations, GC and flushes are queued to it in submission order, so a
//! caller on the input thread never waits on file I/O. Reads take a timed
//! read lock and answer "nothing" when a writer holds it for too long.
//!
//! Mutations that must be atomic go through a [`DictWriter`], which only
//! exists while the write lock is held.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::files;
use super::{
    clock, BinaryDictionary, ComposedData, Dictionary, DictionaryDump, DictionaryHeader,
    DictionaryType, SuggestedWordInfo, SuggestionOptions,
};
use crate::locale::Locale;
use crate::ngram::NgramContext;
use crate::probability::NOT_A_PROBABILITY;
use crate::settings::settings;
use crate::DICTIONARY_MAX_WORD_LENGTH;

/// Where dynamic dictionary files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryConfig {
    pub files_dir: PathBuf,
}

impl DictionaryConfig {
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    LoadingAsync,
    Loaded,
}

/// Shared "needs recreate" flag. Name sources hold a clone and set it when
/// their data changes; the dictionary rebuilds on next access.
#[derive(Debug, Clone, Default)]
pub struct RecreateHandle(Arc<AtomicBool>);

impl RecreateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_needs_recreate(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn needs_recreate(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    /// Identity comparison.
    pub fn same(&self, other: &RecreateHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Write access to a dynamic dictionary. Only constructed while the
/// dictionary's write lock is held, so a sequence of calls on one writer is
/// a single critical section.
pub struct DictWriter<'a> {
    dict: &'a mut BinaryDictionary,
}

impl<'a> DictWriter<'a> {
    pub(crate) fn new(dict: &'a mut BinaryDictionary) -> Self {
        Self { dict }
    }

    pub fn add_unigram_locked(
        &mut self,
        word: &str,
        probability: i32,
        shortcut: Option<(&str, i32)>,
        is_not_a_word: bool,
        is_possibly_offensive: bool,
        timestamp: i32,
    ) -> bool {
        self.dict.add_unigram_entry(
            word,
            probability,
            shortcut,
            is_not_a_word,
            is_possibly_offensive,
            timestamp,
        )
    }

    pub fn add_ngram_entry_locked(
        &mut self,
        ngram_context: &NgramContext,
        word: &str,
        probability: i32,
        timestamp: i32,
    ) -> bool {
        self.dict
            .add_ngram_entry(ngram_context, word, probability, timestamp)
    }

    pub fn update_entries_for_word_locked(
        &mut self,
        ngram_context: &NgramContext,
        word: &str,
        is_valid: bool,
        count: i32,
        timestamp: i32,
    ) -> bool {
        self.dict
            .update_entries_for_word(ngram_context, word, is_valid, count, timestamp)
    }

    pub fn remove_unigram_locked(&mut self, word: &str) -> bool {
        self.dict.remove_unigram_entry(word)
    }

    pub fn remove_ngram_entry_locked(&mut self, ngram_context: &NgramContext, word: &str) -> bool {
        self.dict.remove_ngram_entry(ngram_context, word)
    }

    /// With `minds_block_by_gc` only hard capacity limits trigger GC.
    pub fn run_gc_if_required_locked(&mut self, minds_block_by_gc: bool) {
        if self.dict.needs_to_run_gc(minds_block_by_gc) {
            self.dict.run_gc(clock::current_time());
        }
    }

    pub fn dictionary(&self) -> &BinaryDictionary {
        self.dict
    }
}

/// What a dynamic dictionary contains and how it is seeded.
pub trait DictionaryContent: Send + Sync + 'static {
    fn dict_type(&self) -> DictionaryType;

    fn header(&self, dict_name: &str, locale: &Locale) -> DictionaryHeader {
        DictionaryHeader::new(dict_name, locale, "1")
            .with_attribute(super::header::DICTIONARY_DATE_KEY, clock::current_time().to_string())
    }

    /// Seeds a freshly created dictionary.
    fn load_initial_contents(&self, _writer: &mut DictWriter<'_>) {}

    /// Whether entries count as real words for spelling purposes.
    fn vouches_for_words(&self) -> bool {
        true
    }

    fn is_user_specific(&self) -> bool {
        false
    }

    /// Subscribe to change notifications of the underlying source.
    fn attach(&self, _handle: &RecreateHandle) {}

    fn detach(&self, _handle: &RecreateHandle) {}
}

#[derive(Debug, Clone, Serialize)]
pub struct DictionaryStats {
    pub locale: String,
    pub dict_type: DictionaryType,
    pub dict_name: String,
    pub word_count: usize,
    pub ngram_count: usize,
    pub file: Option<PathBuf>,
    pub file_size: u64,
}

impl fmt::Display for DictionaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}): {} words, {} n-grams",
            self.dict_name, self.dict_type, self.locale, self.word_count, self.ngram_count
        )?;
        if let Some(file) = &self.file {
            write!(f, ", {} bytes at {}", self.file_size, file.display())?;
        }
        Ok(())
    }
}

enum Message {
    Run(Box<dyn FnOnce(&Shared) + Send>),
    Barrier(mpsc::Sender<()>),
}

struct Shared {
    dict_name: String,
    locale: Locale,
    file: PathBuf,
    content: Box<dyn DictionaryContent>,
    binary: RwLock<Option<BinaryDictionary>>,
    state: Mutex<LoadState>,
    recreate: RecreateHandle,
}

impl Shared {
    fn reload(&self) {
        self.content.attach(&self.recreate);
        let recreate = self.recreate.take();
        let mut guard = self.binary.write();
        let existing = if recreate {
            None
        } else {
            self.open_existing()
        };
        *guard = Some(match existing {
            Some(dict) => dict,
            None => self.create_new(),
        });
        drop(guard);
        *self.state.lock() = LoadState::Loaded;
    }

    fn open_existing(&self) -> Option<BinaryDictionary> {
        match BinaryDictionary::open_file(&self.file) {
            Ok(dict) => {
                debug!(dict = %self.dict_name, words = dict.unigram_count(), "loaded dictionary file");
                Some(dict)
            }
            Err(super::DictError::Io(e)) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) if e.is_format_error() => {
                warn!(dict = %self.dict_name, file = %self.file.display(), "discarding unreadable dictionary: {e}");
                if let Err(e) = fs::remove_file(&self.file) {
                    warn!(file = %self.file.display(), "failed to delete dictionary file: {e}");
                }
                None
            }
            Err(e) => {
                warn!(dict = %self.dict_name, "failed to open dictionary, recreating: {e}");
                None
            }
        }
    }

    fn create_new(&self) -> BinaryDictionary {
        let mut dict =
            BinaryDictionary::create_on_memory(self.content.header(&self.dict_name, &self.locale));
        {
            let mut writer = DictWriter::new(&mut dict);
            self.content.load_initial_contents(&mut writer);
            writer.run_gc_if_required_locked(false);
        }
        if let Err(e) = dict.flush(&self.file) {
            warn!(dict = %self.dict_name, "failed to write new dictionary: {e}");
        }
        debug!(dict = %self.dict_name, words = dict.unigram_count(), "created dictionary");
        dict
    }

    fn with_writer(&self, f: impl FnOnce(&mut DictWriter<'_>)) {
        let mut guard = self.binary.write();
        match guard.as_mut() {
            Some(dict) => f(&mut DictWriter::new(dict)),
            None => debug!(dict = %self.dict_name, "dictionary not loaded, dropping update"),
        }
    }

    fn flush(&self, with_gc: bool) {
        let mut guard = self.binary.write();
        let Some(dict) = guard.as_mut() else { return };
        let result = if with_gc {
            dict.flush_with_gc(&self.file)
        } else {
            dict.flush(&self.file)
        };
        if let Err(e) = result {
            warn!(dict = %self.dict_name, "flush failed: {e}");
        }
    }

    fn read(&self) -> Option<RwLockReadGuard<'_, Option<BinaryDictionary>>> {
        let timeout = Duration::from_millis(settings().suggestions.read_timeout_ms);
        let guard = self.binary.try_read_for(timeout);
        if guard.is_none() {
            warn!(dict = %self.dict_name, "read lock timed out");
        }
        guard
    }
}

pub struct ExpandableBinaryDictionary {
    shared: Arc<Shared>,
    tx: Option<mpsc::Sender<Message>>,
    handle: Option<JoinHandle<()>>,
}

impl ExpandableBinaryDictionary {
    /// `{name_prefix}{name}.{locale}[.{account}]`, which is also the file stem.
    pub fn dict_name(name_prefix: &str, name: &str, locale: &Locale, account: Option<&str>) -> String {
        match account {
            Some(account) => format!("{name_prefix}{name}.{locale}.{account}"),
            None => format!("{name_prefix}{name}.{locale}"),
        }
    }

    pub fn new(
        content: Box<dyn DictionaryContent>,
        dict_name: String,
        locale: &Locale,
        config: &DictionaryConfig,
    ) -> Self {
        let file = files::dict_file_path(&config.files_dir, &dict_name);
        let shared = Arc::new(Shared {
            dict_name,
            locale: locale.clone(),
            file,
            content,
            binary: RwLock::new(None),
            state: Mutex::new(LoadState::Unloaded),
            recreate: RecreateHandle::new(),
        });
        shared.content.attach(&shared.recreate);

        let (tx, rx) = mpsc::channel::<Message>();
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("dicta-dictionary".into())
            .spawn(move || {
                for message in rx {
                    match message {
                        Message::Run(task) => task(&worker_shared),
                        Message::Barrier(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            })
            .expect("failed to spawn dictionary worker");

        Self {
            shared,
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    fn submit(&self, task: impl FnOnce(&Shared) + Send + 'static) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Message::Run(Box::new(task)));
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.dict_name
    }

    pub fn file(&self) -> &Path {
        &self.shared.file
    }

    pub fn load_state(&self) -> LoadState {
        *self.shared.state.lock()
    }

    pub fn recreate_handle(&self) -> RecreateHandle {
        self.shared.recreate.clone()
    }

    /// Queues a (re)load when nothing is loaded yet or a recreate was
    /// requested. Returns immediately.
    pub fn reload_dictionary_if_required(&self) {
        {
            let mut state = self.shared.state.lock();
            match *state {
                LoadState::LoadingAsync => return,
                LoadState::Loaded if !self.shared.recreate.needs_recreate() => return,
                _ => *state = LoadState::LoadingAsync,
            }
        }
        self.submit(Shared::reload);
    }

    /// Blocks until every task queued so far has run.
    pub fn wait_for_pending_tasks(&self) {
        let Some(tx) = &self.tx else { return };
        let (done_tx, done_rx) = mpsc::channel();
        if tx.send(Message::Barrier(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }

    pub fn add_unigram_entry(
        &self,
        word: &str,
        probability: i32,
        shortcut: Option<(&str, i32)>,
        is_not_a_word: bool,
        is_possibly_offensive: bool,
        timestamp: i32,
    ) {
        if word.chars().count() > DICTIONARY_MAX_WORD_LENGTH {
            return;
        }
        self.reload_dictionary_if_required();
        let word = word.to_string();
        let shortcut = shortcut.map(|(target, freq)| (target.to_string(), freq));
        self.submit(move |shared| {
            shared.with_writer(|w| {
                w.add_unigram_locked(
                    &word,
                    probability,
                    shortcut.as_ref().map(|(t, f)| (t.as_str(), *f)),
                    is_not_a_word,
                    is_possibly_offensive,
                    timestamp,
                );
                w.run_gc_if_required_locked(true);
            })
        });
    }

    pub fn remove_unigram_entry_dynamically(&self, word: &str) {
        self.reload_dictionary_if_required();
        let word = word.to_string();
        self.submit(move |shared| {
            shared.with_writer(|w| {
                if !w.remove_unigram_locked(&word) {
                    debug!(dict = %shared.dict_name, "no entry to remove");
                }
            })
        });
    }

    pub fn add_ngram_entry(
        &self,
        ngram_context: &NgramContext,
        word: &str,
        probability: i32,
        timestamp: i32,
    ) {
        if word.chars().count() > DICTIONARY_MAX_WORD_LENGTH {
            return;
        }
        self.reload_dictionary_if_required();
        let ngram_context = ngram_context.clone();
        let word = word.to_string();
        self.submit(move |shared| {
            shared.with_writer(|w| {
                w.add_ngram_entry_locked(&ngram_context, &word, probability, timestamp);
                w.run_gc_if_required_locked(true);
            })
        });
    }

    pub fn remove_ngram_entry_dynamically(&self, ngram_context: &NgramContext, word: &str) {
        self.reload_dictionary_if_required();
        let ngram_context = ngram_context.clone();
        let word = word.to_string();
        self.submit(move |shared| {
            shared.with_writer(|w| {
                w.remove_ngram_entry_locked(&ngram_context, &word);
            })
        });
    }

    /// Records `count` occurrences of `word` after `ngram_context`.
    pub fn update_entries_for_word(
        &self,
        ngram_context: &NgramContext,
        word: &str,
        is_valid: bool,
        count: i32,
        timestamp: i32,
    ) {
        if word.chars().count() > DICTIONARY_MAX_WORD_LENGTH {
            return;
        }
        self.reload_dictionary_if_required();
        let ngram_context = ngram_context.clone();
        let word = word.to_string();
        self.submit(move |shared| {
            shared.with_writer(|w| {
                w.update_entries_for_word_locked(&ngram_context, &word, is_valid, count, timestamp);
                w.run_gc_if_required_locked(true);
            })
        });
    }

    /// Runs `f` as one critical section on the worker.
    pub fn update_locked(&self, f: impl FnOnce(&mut DictWriter<'_>) + Send + 'static) {
        self.reload_dictionary_if_required();
        self.submit(move |shared| shared.with_writer(f));
    }

    /// Drops all content: the file is deleted and an empty in-memory
    /// dictionary takes its place.
    pub fn clear(&self) {
        self.submit(|shared| {
            let mut guard = shared.binary.write();
            if let Err(e) = fs::remove_file(&shared.file) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(file = %shared.file.display(), "failed to delete dictionary file: {e}");
                }
            }
            *guard = Some(BinaryDictionary::create_on_memory(
                shared.content.header(&shared.dict_name, &shared.locale),
            ));
            drop(guard);
            *shared.state.lock() = LoadState::Loaded;
            debug!(dict = %shared.dict_name, "cleared dictionary");
        });
    }

    pub fn flush(&self) {
        self.submit(|shared| shared.flush(false));
    }

    pub fn flush_with_gc(&self) {
        self.submit(|shared| shared.flush(true));
    }

    /// Everything in the dictionary, or `None` if not loaded or contended.
    pub fn dump_all(&self) -> Option<DictionaryDump> {
        let guard = self.shared.read()?;
        Some(guard.as_ref()?.dump_all(clock::current_time()))
    }

    /// Logs every word and n-gram at info level.
    pub fn dump_all_words_for_debug(&self) {
        self.reload_dictionary_if_required();
        self.submit(|shared| {
            let guard = shared.binary.read();
            let Some(dict) = guard.as_ref() else { return };
            let dump = dict.dump_all(clock::current_time());
            info!(dict = %shared.dict_name, words = dump.words.len(), ngrams = dump.ngrams.len(), "dictionary dump");
            for word in &dump.words {
                info!(
                    dict = %shared.dict_name,
                    word = %word.word,
                    probability = word.probability_info.probability,
                    timestamp = word.probability_info.timestamp,
                    count = word.probability_info.count,
                    "unigram"
                );
            }
            for ngram in &dump.ngrams {
                info!(
                    dict = %shared.dict_name,
                    context = %ngram.ngram_context.extract_prev_words_context(),
                    word = %ngram.target_word.word,
                    probability = ngram.target_word.probability(),
                    "ngram"
                );
            }
        });
    }

    pub fn get_dictionary_stats(&self) -> DictionaryStats {
        let guard = self.shared.binary.read();
        let (word_count, ngram_count) = guard
            .as_ref()
            .map_or((0, 0), |d| (d.unigram_count(), d.ngram_count()));
        let file_size = fs::metadata(&self.shared.file).map_or(0, |m| m.len());
        DictionaryStats {
            locale: self.shared.locale.to_string(),
            dict_type: self.shared.content.dict_type(),
            dict_name: self.shared.dict_name.clone(),
            word_count,
            ngram_count,
            file: self.shared.file.exists().then(|| self.shared.file.clone()),
            file_size,
        }
    }
}

impl Dictionary for ExpandableBinaryDictionary {
    fn dict_type(&self) -> DictionaryType {
        self.shared.content.dict_type()
    }

    fn locale(&self) -> &Locale {
        &self.shared.locale
    }

    fn get_suggestions(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        options: &SuggestionOptions,
        session_id: usize,
        weight_for_locale: f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        self.reload_dictionary_if_required();
        let guard = self.shared.read()?;
        let dict = guard.as_ref()?;
        Some(dict.get_suggestions(
            composed,
            ngram_context,
            options,
            session_id,
            weight_for_locale,
            self.dict_type(),
        ))
    }

    fn is_in_dictionary(&self, word: &str) -> bool {
        self.reload_dictionary_if_required();
        self.shared
            .read()
            .is_some_and(|g| g.as_ref().is_some_and(|d| d.is_in_dictionary(word)))
    }

    fn get_frequency(&self, word: &str) -> i32 {
        self.shared
            .read()
            .and_then(|g| g.as_ref().map(|d| d.get_frequency(word)))
            .unwrap_or(NOT_A_PROBABILITY)
    }

    fn get_max_frequency_of_exact_matches(&self, word: &str) -> i32 {
        self.shared
            .read()
            .and_then(|g| g.as_ref().map(|d| d.get_max_frequency_of_exact_matches(word)))
            .unwrap_or(NOT_A_PROBABILITY)
    }

    fn is_valid_word(&self, word: &str) -> bool {
        self.shared.content.vouches_for_words() && self.is_in_dictionary(word)
    }

    fn should_auto_commit(&self, candidate: &SuggestedWordInfo) -> bool {
        self.shared
            .read()
            .is_some_and(|g| g.as_ref().is_some_and(|d| d.should_auto_commit(candidate)))
    }

    fn is_initialized(&self) -> bool {
        self.load_state() == LoadState::Loaded
    }

    fn is_user_specific(&self) -> bool {
        self.shared.content.is_user_specific()
    }

    fn on_finish_input(&self) {
        self.flush();
    }

    /// Flushes, then releases the in-memory dictionary. A later access
    /// reloads from the file.
    fn close(&self) {
        // Marked before the task runs so a mutation queued behind it
        // schedules its own reload.
        *self.shared.state.lock() = LoadState::Unloaded;
        self.submit(|shared| {
            shared.flush(false);
            *shared.binary.write() = None;
            // Loaded here only if a reload queued before the close ran first.
            let mut state = shared.state.lock();
            if *state == LoadState::Loaded {
                *state = LoadState::Unloaded;
            }
            drop(state);
            shared.content.detach(&shared.recreate);
            debug!(dict = %shared.dict_name, "closed dictionary");
        });
    }
}

impl Drop for ExpandableBinaryDictionary {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
