//! Session handle cache.
//!
//! Generation handles are expensive to construct (each one loads its
//! conversation window from history), so they are cached per
//! (application, mode) key. The cache is a bounded map with LRU capacity
//! eviction plus write-age and idle-age expiry, swept on access.
//! Construction is single-flight: concurrent `get` calls for one key
//! share a single build instead of racing.
//!
//! Eviction only ever drops the cached handle. Persisted chat history is
//! untouched and the next `get` reseeds a replacement transparently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use forge_core::{AppId, CacheSettings, GenMode};
use forge_store::ChatHistoryService;

use crate::backend::SessionHandle;

type CacheKey = (AppId, GenMode);

struct CacheEntry {
    cell: Arc<OnceCell<Arc<SessionHandle>>>,
    created_at: Instant,
    last_access: Instant,
}

impl CacheEntry {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            cell: Arc::new(OnceCell::new()),
            created_at: now,
            last_access: now,
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Handle constructions actually performed.
    pub loads: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded cache of session handles with single-flight construction.
pub struct SessionCache {
    history: ChatHistoryService,
    context_window: usize,
    capacity: usize,
    write_ttl: Duration,
    idle_ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    evictions: AtomicU64,
}

impl SessionCache {
    /// Create a cache with explicit tuning.
    pub fn new(
        history: ChatHistoryService,
        context_window: usize,
        capacity: usize,
        write_ttl: Duration,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            history,
            context_window,
            capacity,
            write_ttl,
            idle_ttl,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a cache from configuration.
    pub fn from_settings(
        history: ChatHistoryService,
        context_window: usize,
        settings: &CacheSettings,
    ) -> Self {
        Self::new(
            history,
            context_window,
            settings.capacity,
            settings.write_ttl(),
            settings.idle_ttl(),
        )
    }

    /// Get or construct the handle for a key.
    ///
    /// On a miss exactly one construction runs even under concurrent
    /// callers; the rest await the same cell. Construction loads the
    /// recent conversation window; a history read failure is logged and
    /// an empty context used instead.
    pub async fn get(&self, app_id: AppId, mode: GenMode) -> Arc<SessionHandle> {
        let key = (app_id, mode);
        let cell = {
            let mut entries = self.entries.lock();
            self.sweep_expired(&mut entries);
            if let Some(entry) = entries.get_mut(&key) {
                entry.last_access = Instant::now();
                self.hits.fetch_add(1, Ordering::Relaxed);
                entry.cell.clone()
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.make_room(&mut entries);
                entries
                    .entry(key)
                    .or_insert_with(CacheEntry::new)
                    .cell
                    .clone()
            }
        };

        cell.get_or_init(|| self.build_handle(app_id, mode)).await.clone()
    }

    async fn build_handle(&self, app_id: AppId, mode: GenMode) -> Arc<SessionHandle> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let seed = match self.history.context(app_id, self.context_window).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(app_id, %mode, error = %e, "failed to load chat context, starting empty");
                Vec::new()
            }
        };
        debug!(app_id, %mode, seeded = seed.len(), "constructed session handle");
        Arc::new(SessionHandle::new(app_id, mode, seed, self.context_window))
    }

    /// Drop entries past their write or idle age. Caller holds the map lock.
    fn sweep_expired(&self, entries: &mut HashMap<CacheKey, CacheEntry>) {
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.created_at.elapsed() < self.write_ttl && entry.last_access.elapsed() < self.idle_ttl
        });
        let expired = before - entries.len();
        if expired > 0 {
            self.evictions.fetch_add(expired as u64, Ordering::Relaxed);
            debug!(expired, "expired session handles");
        }
    }

    /// Make room for one insert by evicting the least recently used
    /// entries. Caller holds the map lock.
    fn make_room(&self, entries: &mut HashMap<CacheKey, CacheEntry>) {
        while entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| *key);
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(?key, "evicted least recently used session handle");
                }
                None => break,
            }
        }
    }

    /// Drop the handle for one key, if cached.
    pub fn evict(&self, app_id: AppId, mode: GenMode) -> bool {
        let removed = self.entries.lock().remove(&(app_id, mode)).is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Drop every cached handle of an application, across all modes.
    pub fn evict_app(&self, app_id: AppId) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(id, _), _| *id != app_id);
        let removed = before - entries.len();
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Drop everything.
    pub fn evict_all(&self) {
        let mut entries = self.entries.lock();
        self.evictions.fetch_add(entries.len() as u64, Ordering::Relaxed);
        entries.clear();
    }

    /// Eagerly build handles for every mode of an application.
    pub async fn warm(&self, app_id: AppId) {
        for mode in GenMode::all() {
            self.get(app_id, *mode).await;
        }
        debug!(app_id, "warmed session cache");
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.lock().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::MessageRole;
    use forge_store::MemoryStore;

    fn history() -> ChatHistoryService {
        ChatHistoryService::new(Arc::new(MemoryStore::new()))
    }

    fn cache(history: ChatHistoryService, capacity: usize) -> SessionCache {
        SessionCache::new(
            history,
            20,
            capacity,
            Duration::from_secs(1800),
            Duration::from_secs(600),
        )
    }

    #[tokio::test]
    async fn test_hit_after_miss() {
        let cache = cache(history(), 10);

        let first = cache.get(1, GenMode::Html).await;
        let second = cache.get(1, GenMode::Html).await;
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.loads, 1);
    }

    #[tokio::test]
    async fn test_modes_are_separate_keys() {
        let cache = cache(history(), 10);
        let html = cache.get(1, GenMode::Html).await;
        let multi = cache.get(1, GenMode::MultiFile).await;
        assert!(!Arc::ptr_eq(&html, &multi));
        assert_eq!(cache.stats().size, 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache = cache(history(), 2);
        cache.get(1, GenMode::Html).await;
        cache.get(2, GenMode::Html).await;
        // Touch app 1 so app 2 is the LRU entry
        cache.get(1, GenMode::Html).await;
        cache.get(3, GenMode::Html).await;

        let stats = cache.stats();
        assert!(stats.size <= 2);
        assert!(stats.evictions >= 1);
    }

    #[tokio::test]
    async fn test_idle_expiry() {
        let history = history();
        let cache = SessionCache::new(
            history,
            20,
            10,
            Duration::from_secs(1800),
            Duration::from_millis(20),
        );
        cache.get(1, GenMode::Html).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.get(2, GenMode::Html).await;

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn test_single_flight_construction() {
        let cache = Arc::new(cache(history(), 10));

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move { cache.get(7, GenMode::MultiFile).await }));
        }
        let handles: Vec<_> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        // Exactly one construction, every caller got the same handle
        assert_eq!(cache.stats().loads, 1);
        for handle in &handles {
            assert!(Arc::ptr_eq(handle, &handles[0]));
        }
    }

    #[tokio::test]
    async fn test_eviction_then_get_reseeds_from_history() {
        let store = Arc::new(MemoryStore::new());
        let history = ChatHistoryService::new(store.clone());
        for i in 0..3 {
            history
                .add_message(5, 1, MessageRole::User, format!("m{}", i), None)
                .await
                .unwrap();
        }

        let cache = SessionCache::new(
            history.clone(),
            20,
            10,
            Duration::from_secs(1800),
            Duration::from_secs(600),
        );
        let before = cache.get(5, GenMode::Html).await;
        assert_eq!(before.context().len(), 3);

        assert!(cache.evict(5, GenMode::Html));

        // History gained a message while the handle was evicted
        history
            .add_message(5, 1, MessageRole::User, "m3", None)
            .await
            .unwrap();

        let after = cache.get(5, GenMode::Html).await;
        let expected = history.context(5, 20).await.unwrap();
        let seeded: Vec<_> = after.context().iter().map(|m| m.id).collect();
        let persisted: Vec<_> = expected.iter().map(|m| m.id).collect();
        assert_eq!(seeded, persisted);
        assert_eq!(cache.stats().loads, 2);
    }

    #[tokio::test]
    async fn test_warm_builds_every_mode() {
        let cache = cache(history(), 10);
        cache.warm(9).await;
        assert_eq!(cache.stats().size, GenMode::all().len());
        assert_eq!(cache.stats().loads, GenMode::all().len() as u64);
    }
}
