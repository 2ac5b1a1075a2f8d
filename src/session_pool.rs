//! Bounded pool of session ids for concurrent readers of a shared
//! dictionary set.
//!
//! Every reader acquires a permit, borrows a distinct session id, queries,
//! and hands the id back. Teardown takes every permit first, so nothing is
//! mid-query when the dictionaries are closed.

use std::sync::Arc;
use std::time::Duration;

use dicta_core::dict::{ComposedData, SuggestionOptions};
use dicta_core::ngram::NgramContext;
use dicta_core::settings::settings;
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::facilitator::{DictionaryFacilitator, InputStyle};
use crate::suggestion_results::SuggestionResults;

struct PoolState {
    free: Vec<usize>,
    closed: bool,
}

pub struct SessionPool {
    size: usize,
    state: Mutex<PoolState>,
    returned: Condvar,
}

/// A borrowed session id, returned to the pool on drop.
pub struct SessionGuard<'a> {
    pool: &'a SessionPool,
    id: usize,
}

impl SessionGuard<'_> {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.pool.state.lock().free.push(self.id);
        self.pool.returned.notify_all();
    }
}

impl SessionPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            state: Mutex::new(PoolState {
                free: (0..size).rev().collect(),
                closed: false,
            }),
            returned: Condvar::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Blocks until an id is free. `None` once the pool is closed.
    pub fn acquire(&self) -> Option<SessionGuard<'_>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(id) = state.free.pop() {
                return Some(SessionGuard { pool: self, id });
            }
            self.returned.wait(&mut state);
        }
    }

    /// Like `acquire`, giving up after `timeout`.
    pub fn try_acquire_for(&self, timeout: Duration) -> Option<SessionGuard<'_>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(id) = state.free.pop() {
                return Some(SessionGuard { pool: self, id });
            }
            if self.returned.wait_for(&mut state, timeout).timed_out() {
                return None;
            }
        }
    }

    /// Refuses new readers and waits until every id is back.
    pub fn close_all(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        while state.free.len() < self.size {
            self.returned.wait(&mut state);
        }
        debug!(sessions = self.size, "session pool drained");
    }

    /// Reopens a drained pool.
    pub fn reopen(&self) {
        self.state.lock().closed = false;
    }
}

/// Spell-checker style consumer of a facilitator shared with the IME.
pub struct SpellChecker {
    facilitator: Arc<DictionaryFacilitator>,
    pool: SessionPool,
}

impl SpellChecker {
    pub fn new(facilitator: Arc<DictionaryFacilitator>) -> Self {
        Self {
            facilitator,
            pool: SessionPool::new(settings().spellcheck.max_sessions),
        }
    }

    pub fn has_dictionary(&self) -> bool {
        self.facilitator.has_at_least_one_initialized_main_dictionary()
    }

    /// `None` while the checker is closed.
    pub fn is_valid_word(&self, word: &str) -> Option<bool> {
        let _session = self.pool.acquire()?;
        Some(self.facilitator.is_valid_spelling_word(word))
    }

    pub fn get_suggestions(
        &self,
        typed_word: &str,
        ngram_context: &NgramContext,
    ) -> Option<SuggestionResults> {
        let session = self.pool.acquire()?;
        Some(self.facilitator.get_suggestion_results(
            &ComposedData::typed(typed_word),
            ngram_context,
            &SuggestionOptions::default(),
            session.id(),
            InputStyle::Typing,
        ))
    }

    /// Waits for in-flight queries, then releases the dictionaries.
    pub fn close(&self) {
        self.pool.close_all();
        self.facilitator.close_dictionaries();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn ids_are_distinct_while_borrowed() {
        let pool = SessionPool::new(3);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();
        let ids: HashSet<_> = [a.id(), b.id(), c.id()].into_iter().collect();
        assert_eq!(ids.len(), 3);
        assert!(pool.try_acquire_for(Duration::from_millis(20)).is_none());
        drop(b);
        assert!(pool.try_acquire_for(Duration::from_millis(20)).is_some());
    }

    #[test]
    fn close_waits_for_readers() {
        let pool = Arc::new(SessionPool::new(2));
        let guard_pool = Arc::clone(&pool);
        let finished = Arc::new(AtomicBool::new(false));
        let reader_finished = Arc::clone(&finished);
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let reader = thread::spawn(move || {
            let _session = guard_pool.acquire().unwrap();
            started_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
            reader_finished.store(true, Ordering::SeqCst);
        });
        started_rx.recv().unwrap();
        pool.close_all();
        assert!(finished.load(Ordering::SeqCst));
        assert!(pool.acquire().is_none());
        reader.join().unwrap();

        pool.reopen();
        assert!(pool.acquire().is_some());
    }
}
