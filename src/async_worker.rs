use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::debug;

type Job = Box<dyn FnOnce() + Send>;

// ---------------------------------------------------------------------------
// Work types
// ---------------------------------------------------------------------------

enum Work {
    Run { job: Job, generation: u64 },
    Barrier(mpsc::Sender<()>),
}

// ---------------------------------------------------------------------------
// AsyncWorker
// ---------------------------------------------------------------------------

/// Background thread for learning and dictionary loading, so IME-facing
/// calls return immediately. Jobs run in submission order. Jobs submitted
/// before the last `invalidate()` are dropped unrun.
pub(crate) struct AsyncWorker {
    tx: Mutex<Option<mpsc::Sender<Work>>>,
    generation: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl AsyncWorker {
    pub fn new() -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel::<Work>();
        let handle = {
            let generation = Arc::clone(&generation);
            thread::Builder::new()
                .name("dicta-facilitator".into())
                .spawn(move || worker(rx, generation))
                .expect("failed to spawn facilitator worker")
        };
        Self {
            tx: Mutex::new(Some(tx)),
            generation,
            handle: Some(handle),
        }
    }

    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        let generation = self.generation.load(Ordering::SeqCst);
        if let Some(tx) = self.tx.lock().as_ref() {
            let _ = tx.send(Work::Run {
                job: Box::new(job),
                generation,
            });
        }
    }

    /// Drops every job queued so far.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Blocks until every job submitted before this call has finished or
    /// been dropped.
    pub fn wait_for_pending(&self) {
        let (done_tx, done_rx) = mpsc::channel();
        let sent = self
            .tx
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.send(Work::Barrier(done_tx)).is_ok());
        if sent {
            let _ = done_rx.recv();
        }
    }
}

impl Drop for AsyncWorker {
    fn drop(&mut self) {
        self.tx.lock().take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ---------------------------------------------------------------------------
// Worker thread
// ---------------------------------------------------------------------------

fn worker(rx: mpsc::Receiver<Work>, generation: Arc<AtomicU64>) {
    while let Ok(work) = rx.recv() {
        match work {
            Work::Run {
                job,
                generation: submitted,
            } => {
                // Stale: dropping the job releases whatever it owns.
                if submitted != generation.load(Ordering::SeqCst) {
                    debug!(submitted, "dropping stale job");
                    continue;
                }
                job();
            }
            Work::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn jobs_run_in_order() {
        let worker = AsyncWorker::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let log = Arc::clone(&log);
            worker.submit(move || log.lock().push(i));
        }
        worker.wait_for_pending();
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn invalidated_jobs_are_dropped() {
        let worker = AsyncWorker::new();
        let gate = Arc::new(Mutex::new(()));
        let ran = Arc::new(AtomicUsize::new(0));

        // Hold the worker inside the first job while more are queued.
        let held = gate.lock();
        {
            let gate = Arc::clone(&gate);
            worker.submit(move || drop(gate.lock()));
        }
        {
            let ran = Arc::clone(&ran);
            worker.submit(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        worker.invalidate();
        drop(held);
        {
            let ran = Arc::clone(&ran);
            worker.submit(move || {
                ran.fetch_add(10, Ordering::SeqCst);
            });
        }
        worker.wait_for_pending();
        assert_eq!(ran.load(Ordering::SeqCst), 10);
    }
}
