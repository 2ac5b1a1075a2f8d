//! Dictionaries that serve one locale, plus that locale's confidence and
//! blacklist.

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use dicta_core::dict::{Dictionary, DictionaryType, ExpandableBinaryDictionary};
use dicta_core::locale::Locale;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

/// Confidence at which a locale counts as what the user is typing.
pub(crate) const MAX_CONFIDENCE: i32 = 2;

const TYPING_WEIGHT_STEP: f32 = 0.15;
const GESTURE_WEIGHT_STEP: f32 = 0.05;

pub(crate) type SubDicts = HashMap<DictionaryType, Arc<ExpandableBinaryDictionary>>;

pub(crate) struct DictionaryGroup {
    locale: Locale,
    main: RwLock<Option<Arc<dyn Dictionary>>>,
    sub_dicts: RwLock<SubDicts>,
    confidence: AtomicI32,
    blacklist: Mutex<HashSet<String>>,
    blacklist_file: Option<PathBuf>,
}

fn same_dictionary(a: &Arc<dyn Dictionary>, b: &Arc<dyn Dictionary>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

fn load_blacklist(file: &Path) -> HashSet<String> {
    match fs::read_to_string(file) {
        Ok(content) => content
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
        Err(e) => {
            warn!(file = %file.display(), "failed to read blacklist: {e}");
            HashSet::new()
        }
    }
}

impl DictionaryGroup {
    pub fn new(
        locale: Locale,
        main: Option<Arc<dyn Dictionary>>,
        sub_dicts: SubDicts,
        blacklist_dir: Option<&Path>,
    ) -> Self {
        let blacklist_file = blacklist_dir.and_then(|dir| {
            let file = dir.join(format!("{}.txt", locale.to_language_tag()));
            if file.is_dir() {
                if let Err(e) = fs::remove_dir_all(&file) {
                    warn!(file = %file.display(), "cannot clear directory in place of blacklist: {e}");
                }
            }
            match fs::create_dir_all(dir) {
                Ok(()) => Some(file),
                Err(e) => {
                    warn!(dir = %dir.display(), "blacklist directory unavailable: {e}");
                    None
                }
            }
        });
        let blacklist = blacklist_file
            .as_deref()
            .map(load_blacklist)
            .unwrap_or_default();
        Self {
            locale,
            main: RwLock::new(main),
            sub_dicts: RwLock::new(sub_dicts),
            confidence: AtomicI32::new(1),
            blacklist: Mutex::new(blacklist),
            blacklist_file,
        }
    }

    /// Placeholder held while no locale is active.
    pub fn empty() -> Self {
        Self::new(Locale::root(), None, SubDicts::new(), None)
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    // ---------------------------------------------------------------------
    // Dictionaries
    // ---------------------------------------------------------------------

    pub fn main_dict(&self) -> Option<Arc<dyn Dictionary>> {
        self.main.read().clone()
    }

    /// Replaces the main dictionary, closing the previous one.
    pub fn set_main_dict(&self, new_main: Option<Arc<dyn Dictionary>>) {
        let old = std::mem::replace(&mut *self.main.write(), new_main.clone());
        if let Some(old) = old {
            if !new_main.is_some_and(|new| same_dictionary(&old, &new)) {
                old.close();
            }
        }
    }

    pub fn sub_dict(&self, dict_type: DictionaryType) -> Option<Arc<ExpandableBinaryDictionary>> {
        self.sub_dicts.read().get(&dict_type).cloned()
    }

    pub fn dict(&self, dict_type: DictionaryType) -> Option<Arc<dyn Dictionary>> {
        match dict_type {
            DictionaryType::Main => self.main_dict(),
            _ => self
                .sub_dict(dict_type)
                .map(|d| d as Arc<dyn Dictionary>),
        }
    }

    /// Whether this group serves exactly `dict` as its `dict_type`.
    pub fn holds(&self, dict_type: DictionaryType, dict: &Arc<dyn Dictionary>) -> bool {
        self.dict(dict_type)
            .is_some_and(|own| same_dictionary(&own, dict))
    }

    pub fn has_dict(&self, dict_type: DictionaryType) -> bool {
        match dict_type {
            DictionaryType::Main => self.main.read().is_some(),
            _ => self.sub_dicts.read().contains_key(&dict_type),
        }
    }

    /// Closes and forgets a sub dictionary. The main dictionary is closed but
    /// stays referenced, as its readers degrade on their own.
    pub fn close_dict(&self, dict_type: DictionaryType) {
        let dict = match dict_type {
            DictionaryType::Main => self.main_dict(),
            _ => self
                .sub_dicts
                .write()
                .remove(&dict_type)
                .map(|d| d as Arc<dyn Dictionary>),
        };
        if let Some(dict) = dict {
            dict.close();
        }
    }

    pub fn is_valid_word(&self, word: &str) -> bool {
        if word.is_empty() || self.is_blacklisted(word) {
            return false;
        }
        DictionaryType::ALL
            .into_iter()
            .filter_map(|t| self.dict(t))
            .any(|d| d.is_valid_word(word))
    }

    /// Removes `word` from the learnable dictionaries; words the group
    /// cannot delete for good are blacklisted instead.
    pub fn remove_word(&self, word: &str) {
        for dict_type in [DictionaryType::UserHistory, DictionaryType::User] {
            if let Some(dict) = self.sub_dict(dict_type) {
                dict.remove_unigram_entry_dynamically(word);
            }
        }

        // Name dictionaries come back on the next rebuild.
        for dict_type in [DictionaryType::Contacts, DictionaryType::Apps] {
            if let Some(dict) = self.sub_dict(dict_type) {
                if dict.is_in_dictionary(word) {
                    dict.remove_unigram_entry_dynamically(word);
                    self.add_to_blacklist(word);
                    return;
                }
            }
        }

        let Some(main) = self.main_dict() else { return };
        if main.is_valid_word(word) {
            self.add_to_blacklist(word);
            return;
        }
        let lowercase = word.to_lowercase();
        if main.is_valid_word(&lowercase) {
            self.add_to_blacklist(&lowercase);
        }
    }

    // ---------------------------------------------------------------------
    // Confidence for multilingual typing
    // ---------------------------------------------------------------------

    pub fn confidence(&self) -> i32 {
        self.confidence.load(Ordering::SeqCst)
    }

    /// Unbounded, so the most recently confirmed locale stays ahead.
    pub fn increase_confidence(&self) {
        self.confidence.fetch_add(1, Ordering::SeqCst);
    }

    /// Drops to `MAX_CONFIDENCE` first, so one foreign word does not change
    /// weights.
    pub fn decrease_confidence(&self) {
        let _ = self
            .confidence
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                Some(if c > MAX_CONFIDENCE {
                    MAX_CONFIDENCE
                } else {
                    (c - 1).max(0)
                })
            });
    }

    pub fn weight_for_locale(&self, groups: &[Arc<DictionaryGroup>], is_gesturing: bool) -> f32 {
        let step = if is_gesturing {
            GESTURE_WEIGHT_STEP
        } else {
            TYPING_WEIGHT_STEP
        };
        self.weight_for_locale_with_step(groups, step)
    }

    fn weight_for_locale_with_step(&self, groups: &[Arc<DictionaryGroup>], step: f32) -> f32 {
        if groups.len() == 1 {
            return 1.0;
        }
        let confidence = self.confidence();
        if confidence < MAX_CONFIDENCE {
            return 1.0 - step * (MAX_CONFIDENCE - confidence) as f32;
        }
        let contested = groups
            .iter()
            .any(|g| !std::ptr::eq(g.as_ref(), self) && g.confidence() >= confidence);
        if contested {
            1.0 - step / 2.0
        } else {
            1.0
        }
    }

    // ---------------------------------------------------------------------
    // Blacklist
    // ---------------------------------------------------------------------

    pub fn is_blacklisted(&self, word: &str) -> bool {
        self.blacklist.lock().contains(word)
    }

    pub fn add_to_blacklist(&self, word: &str) {
        let mut blacklist = self.blacklist.lock();
        if !blacklist.insert(word.to_string()) {
            return;
        }
        debug!(locale = %self.locale, "blacklisted word");
        let Some(file) = &self.blacklist_file else { return };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .and_then(|mut f| writeln!(f, "{word}"));
        if let Err(e) = result {
            warn!(file = %file.display(), "failed to append to blacklist: {e}");
        }
    }

    pub fn remove_from_blacklist(&self, word: &str) {
        let mut blacklist = self.blacklist.lock();
        if !blacklist.remove(word) {
            return;
        }
        let Some(file) = &self.blacklist_file else { return };
        let mut lines: Vec<&str> = blacklist.iter().map(String::as_str).collect();
        lines.sort_unstable();
        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        if let Err(e) = fs::write(file, content) {
            warn!(file = %file.display(), "failed to rewrite blacklist: {e}");
        }
    }
}
