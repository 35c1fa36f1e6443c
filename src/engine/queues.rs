//! Thread-safe work queues shared by the worker pools
//!
//! Three independent FIFOs, each behind its own mutex: pending URL pairs,
//! failed URL pairs, and failed jobs. Locks are held only for the queue
//! operation itself, never across I/O, and no operation takes two locks at
//! the same time.

use crate::transfer::BoxedJob;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A source/target reference pair awaiting expansion.
///
/// `target` may be empty, in which case expansion falls back to the
/// configured default registry and namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPair {
    pub source: String,
    pub target: String,
}

impl UrlPair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// The engine's shared queue state
#[derive(Default)]
pub struct WorkQueues {
    url_pairs: Mutex<VecDeque<UrlPair>>,
    failed_pairs: Mutex<VecDeque<UrlPair>>,
    failed_jobs: Mutex<VecDeque<BoxedJob>>,
}

impl WorkQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the next pending pair; `None` is the rule-worker exit signal.
    pub fn pop_pair(&self) -> Option<UrlPair> {
        self.url_pairs.lock().unwrap().pop_front()
    }

    pub fn push_pair(&self, pair: UrlPair) {
        self.url_pairs.lock().unwrap().push_back(pair);
    }

    pub fn push_pairs(&self, pairs: Vec<UrlPair>) {
        let mut queue = self.url_pairs.lock().unwrap();
        for pair in pairs {
            queue.push_back(pair);
        }
    }

    pub fn push_failed_pair(&self, pair: UrlPair) {
        self.failed_pairs.lock().unwrap().push_back(pair);
    }

    pub fn push_failed_job(&self, job: BoxedJob) {
        self.failed_jobs.lock().unwrap().push_back(job);
    }

    /// Move every failed pair back into the pending queue, returning how
    /// many were requeued. The two locks are taken one after the other.
    pub fn requeue_failed_pairs(&self) -> usize {
        let drained: Vec<UrlPair> = {
            let mut failed = self.failed_pairs.lock().unwrap();
            failed.drain(..).collect()
        };
        let count = drained.len();
        if count > 0 {
            self.push_pairs(drained);
        }
        count
    }

    /// Take every failed job out of the queue for a retry round.
    pub fn drain_failed_jobs(&self) -> Vec<BoxedJob> {
        self.failed_jobs.lock().unwrap().drain(..).collect()
    }

    pub fn pending_pair_count(&self) -> usize {
        self.url_pairs.lock().unwrap().len()
    }

    pub fn failed_pair_count(&self) -> usize {
        self.failed_pairs.lock().unwrap().len()
    }

    pub fn failed_job_count(&self) -> usize {
        self.failed_jobs.lock().unwrap().len()
    }

    /// Snapshot of remaining failed jobs as (source, target) URLs.
    pub fn failed_job_urls(&self) -> Vec<(String, String)> {
        self.failed_jobs
            .lock()
            .unwrap()
            .iter()
            .map(|job| (job.source_url(), job.target_url()))
            .collect()
    }

    /// Snapshot of remaining failed pairs as (source, target) strings.
    pub fn failed_pair_urls(&self) -> Vec<(String, String)> {
        self.failed_pairs
            .lock()
            .unwrap()
            .iter()
            .map(|pair| (pair.source.clone(), pair.target.clone()))
            .collect()
    }
}
