//! Shared cache of user history dictionaries.
//!
//! One `UserHistoryDictionary` per `{prefix}{locale}[.{account}]`, so two
//! facilitators for the same locale never open the same file twice. Recently
//! used dictionaries are held strongly in an LRU; evicted ones stay reachable
//! through a weak map for as long as somebody else holds them.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::dict::files::{delete_filtered_files, is_dict_file_of};
use crate::dict::{DictionaryConfig, ExpandableBinaryDictionary, UserHistoryDictionary};
use crate::locale::Locale;
use crate::settings::settings;

struct Cache {
    strong: LruCache<String, Arc<ExpandableBinaryDictionary>>,
    weak: HashMap<String, Weak<ExpandableBinaryDictionary>>,
}

pub struct PersonalizationHelper {
    config: DictionaryConfig,
    cache: Mutex<Cache>,
}

fn cache_key(locale: &Locale, account: Option<&str>, name_prefix: &str) -> String {
    match account {
        Some(account) => format!("{name_prefix}{locale}.{account}"),
        None => format!("{name_prefix}{locale}"),
    }
}

impl PersonalizationHelper {
    pub fn new(config: DictionaryConfig) -> Self {
        let capacity = NonZeroUsize::new(settings().personalization.cache_capacity)
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            cache: Mutex::new(Cache {
                strong: LruCache::new(capacity),
                weak: HashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &DictionaryConfig {
        &self.config
    }

    /// The cached dictionary for this locale and account, or a new one.
    /// Either way a reload is queued if needed.
    pub fn get_user_history_dictionary(
        &self,
        locale: &Locale,
        account: Option<&str>,
        name_prefix: &str,
    ) -> Arc<ExpandableBinaryDictionary> {
        let key = cache_key(locale, account, name_prefix);
        let dict = {
            let mut cache = self.cache.lock();
            if let Some(dict) = cache.strong.get(&key) {
                Arc::clone(dict)
            } else if let Some(dict) = cache.weak.get(&key).and_then(Weak::upgrade) {
                cache.strong.push(key, Arc::clone(&dict));
                dict
            } else {
                debug!(key = %key, "creating user history dictionary");
                let dict = Arc::new(UserHistoryDictionary::create(
                    locale,
                    account,
                    name_prefix,
                    &self.config,
                ));
                cache.weak.insert(key.clone(), Arc::downgrade(&dict));
                cache.strong.push(key, Arc::clone(&dict));
                dict
            }
        };
        dict.reload_dictionary_if_required();
        dict
    }

    /// Releases the cache's own references. Dictionaries still used
    /// elsewhere remain shared.
    pub fn on_low_memory(&self) {
        let mut cache = self.cache.lock();
        let released = cache.strong.len();
        cache.strong.clear();
        cache.weak.retain(|_, dict| dict.strong_count() > 0);
        info!(released, "released cached user history dictionaries");
    }

    fn live_dictionaries(&self) -> Vec<Arc<ExpandableBinaryDictionary>> {
        let cache = self.cache.lock();
        let mut dicts: Vec<Arc<ExpandableBinaryDictionary>> =
            cache.strong.iter().map(|(_, d)| Arc::clone(d)).collect();
        for dict in cache.weak.values().filter_map(Weak::upgrade) {
            if !dicts.iter().any(|d| Arc::ptr_eq(d, &dict)) {
                dicts.push(dict);
            }
        }
        dicts
    }

    /// Clears every live history dictionary, deletes all history files and
    /// empties the cache. In-memory state is cleared before the files go.
    pub fn remove_all_user_history_dictionaries(&self) {
        let dicts = self.live_dictionaries();
        for dict in &dicts {
            dict.clear();
        }
        for dict in &dicts {
            dict.wait_for_pending_tasks();
        }
        match delete_filtered_files(&self.config.files_dir, |name| {
            is_dict_file_of(name, UserHistoryDictionary::NAME)
        }) {
            Ok(deleted) => info!(deleted, "removed user history dictionaries"),
            Err(e) => warn!("failed to delete user history files: {e}"),
        }
        let mut cache = self.cache.lock();
        cache.strong.clear();
        cache.weak.clear();
    }

    /// Flushes every live dictionary and empties the cache.
    pub fn shutdown(&self) {
        let dicts = self.live_dictionaries();
        for dict in &dicts {
            dict.flush();
        }
        for dict in &dicts {
            dict.wait_for_pending_tasks();
        }
        let mut cache = self.cache.lock();
        cache.strong.clear();
        cache.weak.clear();
        debug!(flushed = dicts.len(), "personalization cache shut down");
    }
}
