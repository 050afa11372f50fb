//! Compiled template cache with per-key compile-once semantics.
//!
//! Warm reads only touch a `DashMap` shard. On a miss the caller takes the
//! per-key async mutex, checks again, and compiles; concurrent callers for
//! the same key wait for that compile and receive the same `Arc`. Different
//! keys never contend.
//!
//! # Invalidation races
//!
//! Every key carries a generation counter and the cache carries an epoch.
//! `invalidate` bumps the key's generation, `clear` bumps the epoch. A compile
//! records both before it starts and stores its result only if neither moved,
//! so a compile that overlaps an invalidation hands its value to its own
//! caller but never resurrects the stale entry. The check and the store run
//! under the entry's shard lock, which `invalidate` must take to remove:
//!
//! ```text
//! render A: miss ── lock ── read source ───────────── compile ── gen changed, skip store
//! watcher :                       invalidate(k) (gen += 1)
//! render B:                                                       miss ── recompile
//! ```
//!
//! `invalidate` also appends the key to a bounded invalidation log. A compile
//! remembers the log position before it starts and, before storing, looks for
//! keys its value depends on ([`Dependent`]). A page compiled while one of its
//! components was invalidated is therefore not stored either. When the log has
//! already dropped that position the result is not stored.
//!
//! # Cancellation
//!
//! Dropping a `get_or_compile` future while it compiles releases the per-key
//! lock and stores nothing; the next waiter re-checks and compiles itself.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::engine::CompiledTemplate;
use super::key::TemplateKey;

/// Invalidations remembered for compiles that are still running.
const INVALIDATION_LOG_CAPACITY: usize = 1024;

/// Values that can tell which other templates they were built from.
pub trait Dependent {
    fn depends_on(&self, _key: &TemplateKey) -> bool {
        false
    }
}

impl Dependent for CompiledTemplate {
    fn depends_on(&self, key: &TemplateKey) -> bool {
        CompiledTemplate::depends_on(self, key)
    }
}

/// Sequence-numbered record of recent invalidations.
#[derive(Default)]
struct InvalidationLog {
    next: u64,
    recent: VecDeque<(u64, TemplateKey)>,
}

impl InvalidationLog {
    fn record(&mut self, key: &TemplateKey) {
        if self.recent.len() == INVALIDATION_LOG_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back((self.next, key.clone()));
        self.next += 1;
    }

    /// Keys invalidated at or after `mark`, or `None` if some were dropped.
    fn since(&self, mark: u64) -> Option<impl Iterator<Item = &TemplateKey>> {
        let oldest = self.recent.front().map_or(self.next, |(seq, _)| *seq);
        if oldest > mark {
            return None;
        }
        Some(self.recent.iter().filter(move |(seq, _)| *seq >= mark).map(|(_, key)| key))
    }
}

struct CacheEntry<T> {
    value: Arc<T>,
    epoch: u64,
}

/// Per-key coordination state. Slots outlive entries so the generation
/// survives invalidation.
#[derive(Default)]
struct KeySlot {
    lock: Mutex<()>,
    generation: AtomicU64,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub compiles: u64,
}

impl CacheStats {
    /// Hit rate as a percentage of lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Concurrent map from [`TemplateKey`] to a shared compiled value.
pub struct TemplateCache<T = CompiledTemplate> {
    entries: DashMap<TemplateKey, CacheEntry<T>>,
    slots: DashMap<TemplateKey, Arc<KeySlot>>,
    invalidations: std::sync::Mutex<InvalidationLog>,
    epoch: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    compiles: AtomicU64,
}

impl<T> Default for TemplateCache<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            slots: DashMap::new(),
            invalidations: std::sync::Mutex::new(InvalidationLog::default()),
            epoch: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            compiles: AtomicU64::new(0),
        }
    }
}

impl<T> std::fmt::Debug for TemplateCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("entries", &self.entries.len())
            .field("epoch", &self.epoch.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T: Dependent> TemplateCache<T> {
    /// Return the cached value for `key`, compiling it with `compile` on a miss.
    ///
    /// `compile` runs at most once at a time per key. Its error is returned
    /// as-is and nothing is cached.
    pub async fn get_or_compile<F, Fut, E>(&self, key: &TemplateKey, compile: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(template = %key, "Template cache hit");
            return Ok(value);
        }

        let slot = self.slot(key);
        let _guard = slot.lock.lock().await;

        // Another caller may have finished compiling while we waited
        if let Some(value) = self.lookup(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(template = %key, "Template cache hit after wait");
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let generation = slot.generation.load(Ordering::Acquire);
        let epoch = self.epoch.load(Ordering::Acquire);
        let mark = self.invalidation_log().next;
        tracing::debug!(template = %key, "Template cache miss, compiling");

        let value = Arc::new(compile().await?);
        self.compiles.fetch_add(1, Ordering::Relaxed);

        // Holding the shard lock orders this store before any concurrent removal
        let entry = self.entries.entry(key.clone());
        let current = slot.generation.load(Ordering::Acquire) == generation
            && self.epoch.load(Ordering::Acquire) == epoch
            && self.dependencies_unchanged(&value, mark);
        if current {
            entry.insert(CacheEntry {
                value: Arc::clone(&value),
                epoch,
            });
        } else {
            drop(entry);
            tracing::debug!(template = %key, "Invalidated during compile, result not stored");
        }

        Ok(value)
    }

    /// Invalidate every entry built from `key`, e.g. pages that pulled it in
    /// through include, extends or import. Returns the keys that were dropped.
    pub fn invalidate_dependents(&self, key: &TemplateKey) -> Vec<TemplateKey> {
        let dependents: Vec<TemplateKey> = self
            .entries
            .iter()
            .filter(|entry| entry.value().value.depends_on(key))
            .map(|entry| entry.key().clone())
            .collect();

        for dependent in &dependents {
            self.invalidate(dependent);
        }
        dependents
    }

    fn dependencies_unchanged(&self, value: &T, mark: u64) -> bool {
        match self.invalidation_log().since(mark) {
            Some(mut invalidated) => !invalidated.any(|key| value.depends_on(key)),
            None => false,
        }
    }
}

impl<T> TemplateCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the entry for `key`. No-op when absent.
    pub fn invalidate(&self, key: &TemplateKey) {
        self.invalidation_log().record(key);
        if let Some(slot) = self.slots.get(key) {
            slot.generation.fetch_add(1, Ordering::AcqRel);
        }
        if self.entries.remove(key).is_some() {
            tracing::debug!(template = %key, "Invalidated cached template");
        }
    }

    /// Drop every entry.
    ///
    /// The epoch is bumped first, so entries still being removed already read
    /// as misses and in-flight compiles do not store their results.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        tracing::debug!("Cleared template cache");
    }

    /// Whether a current entry exists for `key`.
    pub fn contains(&self, key: &TemplateKey) -> bool {
        self.lookup(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, key: &TemplateKey) -> Option<Arc<T>> {
        let epoch = self.epoch.load(Ordering::Acquire);
        self.entries
            .get(key)
            .filter(|entry| entry.epoch == epoch)
            .map(|entry| Arc::clone(&entry.value))
    }

    fn slot(&self, key: &TemplateKey) -> Arc<KeySlot> {
        Arc::clone(self.slots.entry(key.clone()).or_default().value())
    }

    /// Never held while taking a shard lock.
    fn invalidation_log(&self) -> std::sync::MutexGuard<'_, InvalidationLog> {
        self.invalidations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
