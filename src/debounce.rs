//! Trailing-edge debouncer keyed by object.
//!
//! Each key has at most one pending job. Scheduling again replaces the job and
//! pushes its deadline back, so only the last request in a burst ever fires.
//! Every job carries a generation number that is unique for the debouncer's
//! lifetime; callers can log it to tell replaced jobs apart.
//!
//! The debouncer owns no timer. The runtime sleeps until [`Debouncer::next_deadline`]
//! and then drains [`Debouncer::take_due`]. Time is `tokio::time::Instant` so
//! tests can pause and advance the clock.

#[cfg(test)]
#[path = "debounce_test.rs"]
mod debounce_test;

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Pending<P> {
    due: Instant,
    generation: u64,
    payload: P,
}

/// A job whose quiet period has elapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct DueJob<K, P> {
    pub key: K,
    pub generation: u64,
    pub payload: P,
}

/// Pending jobs keyed by `K`, each carrying a payload `P`.
#[derive(Debug)]
pub struct Debouncer<K, P> {
    delay: Duration,
    pending: HashMap<K, Pending<P>>,
    next_generation: u64,
}

impl<K, P> Debouncer<K, P>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: HashMap::new(), next_generation: 0 }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule (or reschedule) the job for `key`, due `delay` after `now`.
    /// Returns the new job's generation.
    pub fn schedule(&mut self, key: K, payload: P, now: Instant) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.pending.insert(key, Pending { due: now + self.delay, generation, payload });
        generation
    }

    /// Drop the pending job for `key`. Returns whether one existed.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    /// Drop every pending job. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Generation of the job pending for `key`, if any.
    #[must_use]
    pub fn generation(&self, key: &K) -> Option<u64> {
        self.pending.get(key).map(|p| p.generation)
    }

    /// Payload of the job pending for `key`, if any.
    #[must_use]
    pub fn payload(&self, key: &K) -> Option<&P> {
        self.pending.get(key).map(|p| &p.payload)
    }

    /// Earliest deadline among pending jobs.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.due).min()
    }

    /// Remove and return every job due at or before `now`, oldest deadline first.
    pub fn take_due(&mut self, now: Instant) -> Vec<DueJob<K, P>> {
        let due_keys: Vec<K> = self.pending.iter().filter(|(_, p)| p.due <= now).map(|(k, _)| k.clone()).collect();

        let mut jobs: Vec<(Instant, DueJob<K, P>)> = due_keys
            .into_iter()
            .filter_map(|key| {
                let p = self.pending.remove(&key)?;
                Some((p.due, DueJob { key, generation: p.generation, payload: p.payload }))
            })
            .collect();
        jobs.sort_by_key(|(due, job)| (*due, job.generation));
        jobs.into_iter().map(|(_, job)| job).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
