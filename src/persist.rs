//! Fire-and-forget snapshot writer.
//!
//! Every mutation hands the full task list to `Persister::persist`, which
//! encodes it on the caller's thread and writes it from a background thread.
//! The caller never waits and never sees a write error; failures are logged
//! and counted.
//!
//! Writes that overlap are last-write-wins at the store: an early write that
//! finishes late can clobber a newer snapshot. Enabling `ordered_writes`
//! routes every write through a `WriteGate`, which drops any snapshot older
//! than the last one committed.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, error};

use crate::error::PersistenceError;
use crate::storage::KeyValueStore;
use crate::task::Task;

/// Tracks the newest committed write sequence.
#[derive(Debug, Default)]
pub struct WriteGate {
    committed: Mutex<u64>,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `write` unless a write with a sequence `>= seq` already committed.
    ///
    /// Returns `Ok(false)` when the write was dropped as stale. The lock is held
    /// across the write so check and commit cannot interleave.
    pub fn commit<F>(&self, seq: u64, write: F) -> io::Result<bool>
    where
        F: FnOnce() -> io::Result<()>,
    {
        let mut committed = self.committed.lock().unwrap_or_else(|e| e.into_inner());
        if seq <= *committed {
            return Ok(false);
        }
        write()?;
        *committed = seq;
        Ok(true)
    }

    #[cfg(test)]
    fn committed(&self) -> u64 {
        *self.committed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Background writer for task list snapshots under one key.
pub struct Persister<S: KeyValueStore + 'static> {
    store: Arc<S>,
    key: String,
    next_seq: u64,
    gate: Option<Arc<WriteGate>>,
    pending: Vec<JoinHandle<()>>,
    failures: Arc<AtomicUsize>,
}

impl<S: KeyValueStore + 'static> Persister<S> {
    pub fn new(store: Arc<S>, key: impl Into<String>, ordered_writes: bool) -> Self {
        Persister {
            store,
            key: key.into(),
            next_seq: 0,
            gate: ordered_writes.then(|| Arc::new(WriteGate::new())),
            pending: Vec::new(),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[cfg(test)]
    fn is_ordered(&self) -> bool {
        self.gate.is_some()
    }

    /// Sequence number given to the most recent snapshot, 0 if none yet.
    pub fn last_sequence(&self) -> u64 {
        self.next_seq
    }

    /// Number of snapshots that failed to encode or write.
    pub fn failed_writes(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Queue a snapshot of `tasks` and return its sequence number.
    pub fn persist(&mut self, tasks: &[Task]) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.pending.retain(|h| !h.is_finished());

        let blob = match serde_json::to_string(tasks) {
            Ok(blob) => blob,
            Err(source) => {
                let err = PersistenceError::Encode { key: self.key.clone(), source };
                error!("Error saving tasks (seq {seq}): {err}");
                self.failures.fetch_add(1, Ordering::SeqCst);
                return seq;
            }
        };

        let job = WriteJob {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            blob,
            seq,
            gate: self.gate.clone(),
            failures: Arc::clone(&self.failures),
        };

        let spawned = thread::Builder::new()
            .name(format!("tl-persist-{seq}"))
            .spawn({
                let job = job.clone();
                move || job.run()
            });
        match spawned {
            Ok(handle) => self.pending.push(handle),
            Err(e) => {
                debug!("Could not spawn writer thread ({e}), writing inline");
                job.run();
            }
        }
        seq
    }

    /// Block until every queued snapshot has been written or dropped.
    pub fn flush(&mut self) {
        for handle in self.pending.drain(..) {
            if handle.join().is_err() {
                error!("Snapshot writer thread panicked");
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

impl<S: KeyValueStore + 'static> Drop for Persister<S> {
    fn drop(&mut self) {
        self.flush();
    }
}

struct WriteJob<S: KeyValueStore + 'static> {
    store: Arc<S>,
    key: String,
    blob: String,
    seq: u64,
    gate: Option<Arc<WriteGate>>,
    failures: Arc<AtomicUsize>,
}

impl<S: KeyValueStore + 'static> Clone for WriteJob<S> {
    fn clone(&self) -> Self {
        WriteJob {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            blob: self.blob.clone(),
            seq: self.seq,
            gate: self.gate.clone(),
            failures: Arc::clone(&self.failures),
        }
    }
}

impl<S: KeyValueStore + 'static> WriteJob<S> {
    fn run(self) {
        let write = || self.store.set(&self.key, &self.blob);
        let result = match &self.gate {
            Some(gate) => gate.commit(self.seq, write),
            None => write().map(|_| true),
        };
        match result {
            Ok(true) => debug!(
                "Saved {} bytes under '{}' (seq {})",
                self.blob.len(),
                self.key,
                self.seq
            ),
            Ok(false) => debug!("Dropped stale snapshot seq {} for '{}'", self.seq, self.key),
            Err(source) => {
                let err = PersistenceError::Write { key: self.key.clone(), source };
                error!("Error saving tasks (seq {}): {err}", self.seq);
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
