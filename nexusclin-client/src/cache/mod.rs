//! Key-addressed query cache with single-flight reads and optimistic
//! mutations.
//!
//! Entries carry the decoded-agnostic JSON payload plus staleness metadata.
//! Reads are single-flight per key: while a fetch is in flight, concurrent
//! readers of the same key join it instead of issuing duplicate network
//! calls. Failed fetches keep the prior data visible (stale-while-error).
//!
//! Every direct write (optimistic patch, rollback restore, invalidation,
//! clear) bumps a per-key generation; a fetch that completes after such a
//! write is discarded instead of clobbering the newer value.

mod key;
mod mutation;

pub use key::{QueryKey, ResourceKind};
pub use mutation::{CacheSnapshot, Mutation};

use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Fresh,
    Stale,
    Fetching,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Option<Value>,
    pub fetched_at: Option<Instant>,
    pub status: EntryStatus,
    pub last_error: Option<ApiError>,
    pub generation: u64,
}

impl CacheEntry {
    fn empty(generation: u64) -> CacheEntry {
        CacheEntry {
            data: None,
            fetched_at: None,
            status: EntryStatus::Stale,
            last_error: None,
            generation,
        }
    }
}

/// Options for a cached read.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// How long a fetched value counts as fresh.
    pub stale_time: Duration,
    /// A disabled read is a no-op: no network, no state change.
    pub enabled: bool,
}

impl FetchOptions {
    pub fn stale(stale_time: Duration) -> FetchOptions {
        FetchOptions {
            stale_time,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> FetchOptions {
        self.enabled = enabled;
        self
    }
}

/// Default staleness windows per resource family.
pub mod stale_time {
    use std::time::Duration;

    pub const AGENDAS: Duration = Duration::from_secs(30);
    pub const USERS: Duration = Duration::from_secs(30);
    pub const EXPORTS: Duration = Duration::from_secs(30);
    pub const ATENDIMENTOS: Duration = Duration::from_secs(30);
    pub const EVOLUCOES: Duration = Duration::from_secs(30);
    pub const TENANTS: Duration = Duration::from_secs(60);
    pub const AUDIT: Duration = Duration::from_secs(60);
    pub const DASHBOARD: Duration = Duration::from_secs(60);
}

struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    in_flight: HashMap<QueryKey, watch::Receiver<()>>,
    /// Latest generation issued per key; fetches tagged behind it are
    /// discarded on arrival.
    issued: HashMap<QueryKey, u64>,
}

/// Process-wide resource cache. Explicitly injectable: created once at
/// startup, shared by reference, cleared on logout.
///
/// The mutex is only held synchronously - never across an await point - so
/// the single-threaded event loop cannot deadlock on it.
pub struct QueryCache {
    inner: Mutex<CacheState>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

enum ReadPlan {
    Join(watch::Receiver<()>),
    Fetch { generation: u64, done: watch::Sender<()> },
}

impl QueryCache {
    pub fn new() -> QueryCache {
        QueryCache {
            inner: Mutex::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                issued: HashMap::new(),
            }),
        }
    }

    /// Cached read with the single-flight guarantee.
    ///
    /// Returns `Ok(None)` only for a disabled read. On fetch failure the
    /// entry keeps its previous data and the error is surfaced to every
    /// joined reader; there is no implicit retry.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        options: FetchOptions,
        fetcher: F,
    ) -> Result<Option<T>, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if !options.enabled {
            return Ok(None);
        }

        let plan = {
            let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = state.entries.get(&key) {
                let fresh = entry.status == EntryStatus::Fresh
                    && entry
                        .fetched_at
                        .map(|at| at.elapsed() < options.stale_time)
                        .unwrap_or(false);
                if fresh {
                    if let Some(data) = &entry.data {
                        tracing::debug!(%key, "cache hit");
                        return decode(data).map(Some);
                    }
                }
            }
            if let Some(rx) = state.in_flight.get(&key) {
                tracing::debug!(%key, "joining in-flight fetch");
                ReadPlan::Join(rx.clone())
            } else {
                let generation = next_generation(&mut state.issued, &key);
                let (done, rx) = watch::channel(());
                state.in_flight.insert(key.clone(), rx);
                state
                    .entries
                    .entry(key.clone())
                    .or_insert_with(|| CacheEntry::empty(generation))
                    .status = EntryStatus::Fetching;
                ReadPlan::Fetch { generation, done }
            }
        };

        match plan {
            ReadPlan::Join(rx) => self.join(key, rx).await,
            ReadPlan::Fetch { generation, done } => {
                let result = fetcher().await;
                let outcome = self.complete_fetch(&key, generation, result);
                let _ = done.send(());
                outcome
            }
        }
    }

    /// Wait for the in-flight fetch on `key` and report its outcome.
    async fn join<T: DeserializeOwned>(
        &self,
        key: QueryKey,
        mut rx: watch::Receiver<()>,
    ) -> Result<Option<T>, ApiError> {
        let aborted = rx.changed().await.is_err();
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if aborted {
            // The fetching future was dropped mid-flight; unblock the key.
            state.in_flight.remove(&key);
            if let Some(entry) = state.entries.get_mut(&key) {
                if entry.status == EntryStatus::Fetching {
                    entry.status = EntryStatus::Stale;
                }
            }
        }
        match state.entries.get(&key) {
            Some(entry) => {
                if entry.status == EntryStatus::Error {
                    Err(entry
                        .last_error
                        .clone()
                        .unwrap_or_else(|| ApiError::Transport("fetch failed".to_string())))
                } else if let Some(data) = &entry.data {
                    decode(data).map(Some)
                } else {
                    Err(ApiError::Transport("fetch aborted".to_string()))
                }
            }
            None => Err(ApiError::Transport("fetch aborted".to_string())),
        }
    }

    /// Record a finished fetch, unless a direct write superseded it.
    fn complete_fetch<T: Serialize>(
        &self,
        key: &QueryKey,
        generation: u64,
        result: Result<T, ApiError>,
    ) -> Result<Option<T>, ApiError> {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.in_flight.remove(key);
        let latest = state.issued.get(key).copied().unwrap_or(0);
        let superseded = generation < latest;

        match result {
            Ok(value) => {
                if superseded {
                    tracing::debug!(%key, "discarding superseded fetch result");
                } else {
                    let data = serde_json::to_value(&value)
                        .map_err(|e| ApiError::Decode(e.to_string()))?;
                    state.entries.insert(
                        key.clone(),
                        CacheEntry {
                            data: Some(data),
                            fetched_at: Some(Instant::now()),
                            status: EntryStatus::Fresh,
                            last_error: None,
                            generation,
                        },
                    );
                }
                Ok(Some(value))
            }
            Err(error) => {
                if !superseded {
                    let entry = state
                        .entries
                        .entry(key.clone())
                        .or_insert_with(|| CacheEntry::empty(generation));
                    // prior data stays visible; only the status flips
                    entry.status = EntryStatus::Error;
                    entry.last_error = Some(error.clone());
                }
                Err(error)
            }
        }
    }

    /// Decode the current entry for `key` without touching its state.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state
            .entries
            .get(key)
            .and_then(|entry| entry.data.as_ref())
            .and_then(|data| serde_json::from_value(data.clone()).ok())
    }

    pub fn status(&self, key: &QueryKey) -> Option<EntryStatus> {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.entries.get(key).map(|entry| entry.status)
    }

    /// Direct write: replace the entry's data, marking it fresh as of now.
    /// Supersedes any fetch still in flight for the key.
    pub fn set<T: Serialize>(&self, key: &QueryKey, value: &T) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(%key, %err, "refusing to cache unencodable value");
                return;
            }
        };
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let generation = next_generation(&mut state.issued, key);
        state.entries.insert(
            key.clone(),
            CacheEntry {
                data: Some(data),
                fetched_at: Some(Instant::now()),
                status: EntryStatus::Fresh,
                last_error: None,
                generation,
            },
        );
    }

    /// Decode, transform, and re-store the entry's data. No-op when the
    /// entry is absent or does not decode as `T`.
    pub fn modify<T, F>(&self, key: &QueryKey, apply: F)
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        if let Some(mut value) = self.peek::<T>(key) {
            apply(&mut value);
            self.set(key, &value);
        }
    }

    /// Capture the named entries whole - including absence - for exact
    /// rollback.
    pub fn snapshot(&self, keys: &[QueryKey]) -> CacheSnapshot {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        CacheSnapshot::capture(
            keys.iter()
                .map(|key| (key.clone(), state.entries.get(key).cloned())),
        )
    }

    /// Restore a snapshot verbatim: each captured entry is put back whole
    /// (absent entries are removed again). Never a field-level merge.
    pub fn restore(&self, snapshot: CacheSnapshot) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for (key, entry) in snapshot.into_entries() {
            let generation = next_generation(&mut state.issued, &key);
            match entry {
                Some(mut entry) => {
                    entry.generation = generation;
                    state.entries.insert(key, entry);
                }
                None => {
                    state.entries.remove(&key);
                }
            }
        }
    }

    /// Mark the entry stale so the next read re-fetches.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        next_generation(&mut state.issued, key);
        if let Some(entry) = state.entries.get_mut(key) {
            if entry.status != EntryStatus::Fetching {
                entry.status = EntryStatus::Stale;
            }
        }
    }

    /// Mark every entry matching the prefix stale.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let matching: Vec<QueryKey> = state
            .entries
            .keys()
            .filter(|key| prefix.is_prefix_of(key))
            .cloned()
            .collect();
        for key in matching {
            next_generation(&mut state.issued, &key);
            if let Some(entry) = state.entries.get_mut(&key) {
                if entry.status != EntryStatus::Fetching {
                    entry.status = EntryStatus::Stale;
                }
            }
        }
    }

    /// Evict everything unconditionally (logout). In-flight fetches are
    /// superseded so their late results cannot repopulate the cache.
    pub fn clear(&self) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let in_flight: Vec<QueryKey> = state.in_flight.keys().cloned().collect();
        for key in in_flight {
            next_generation(&mut state.issued, &key);
        }
        state.entries.clear();
    }

    pub fn len(&self) -> usize {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn next_generation(issued: &mut HashMap<QueryKey, u64>, key: &QueryKey) -> u64 {
    let counter = issued.entry(key.clone()).or_insert(0);
    *counter += 1;
    *counter
}

fn decode<T: DeserializeOwned>(data: &Value) -> Result<T, ApiError> {
    serde_json::from_value(data.clone()).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn key() -> QueryKey {
        QueryKey::agendas()
    }

    fn opts() -> FetchOptions {
        FetchOptions::stale(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn fresh_entry_skips_the_network() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let got: Option<Vec<i64>> = cache
                .fetch(key(), opts(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(got, Some(vec![1, 2, 3]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_fetch() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let fetcher = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(vec![42i64])
            }
        };

        let (a, b) = tokio::join!(
            cache.fetch::<Vec<i64>, _, _>(key(), opts(), fetcher(calls.clone())),
            cache.fetch::<Vec<i64>, _, _>(key(), opts(), fetcher(calls.clone())),
        );
        assert_eq!(a.unwrap(), Some(vec![42]));
        assert_eq!(b.unwrap(), Some(vec![42]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn joined_readers_see_the_shared_failure() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let fetcher = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err::<Vec<i64>, _>(ApiError::Transport("boom".to_string()))
            }
        };

        let (a, b) = tokio::join!(
            cache.fetch::<Vec<i64>, _, _>(key(), opts(), fetcher(calls.clone())),
            cache.fetch::<Vec<i64>, _, _>(key(), opts(), fetcher(calls.clone())),
        );
        assert!(a.is_err());
        assert!(b.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_read_is_a_no_op() {
        let cache = QueryCache::new();
        let got: Option<Vec<i64>> = cache
            .fetch(key(), opts().enabled(false), || async {
                panic!("fetcher must not run")
            })
            .await
            .unwrap();
        assert_eq!(got, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_prior_data_visible() {
        let cache = QueryCache::new();
        let got: Option<Vec<i64>> = cache
            .fetch(key(), opts(), || async { Ok(vec![7]) })
            .await
            .unwrap();
        assert_eq!(got, Some(vec![7]));

        cache.invalidate(&key());
        let err = cache
            .fetch::<Vec<i64>, _, _>(key(), opts(), || async {
                Err(ApiError::Transport("down".to_string()))
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Transport("down".to_string()));

        // stale-while-error: the old payload is still there
        assert_eq!(cache.peek::<Vec<i64>>(&key()), Some(vec![7]));
        assert_eq!(cache.status(&key()), Some(EntryStatus::Error));
    }

    #[tokio::test]
    async fn invalidate_triggers_refetch() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let _: Option<Vec<i64>> = cache
                .fetch(key(), opts(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1])
                })
                .await
                .unwrap();
            cache.invalidate(&key());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_prefix_only_touches_matching_keys() {
        use nexusclin_core::{Competencia, ExportKind};

        let cache = QueryCache::new();
        let bpa = QueryKey::exports(
            ExportKind::Bpa,
            Some(&Competencia::parse("202501").unwrap()),
        );
        let apac = QueryKey::exports(
            ExportKind::Apac,
            Some(&Competencia::parse("202501").unwrap()),
        );
        cache.set(&bpa, &vec![1i64]);
        cache.set(&apac, &vec![2i64]);

        cache.invalidate_prefix(&QueryKey::exports_prefix(ExportKind::Bpa));
        assert_eq!(cache.status(&bpa), Some(EntryStatus::Stale));
        assert_eq!(cache.status(&apac), Some(EntryStatus::Fresh));
    }

    #[tokio::test]
    async fn superseded_fetch_result_is_discarded() {
        let cache = Arc::new(QueryCache::new());
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let slow = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move {
                cache
                    .fetch::<Vec<i64>, _, _>(key(), opts(), || async move {
                        release_rx.await.ok();
                        Ok(vec![1])
                    })
                    .await
            }
        });

        // Let the slow fetch register as in-flight, then win the race with
        // a direct write.
        tokio::task::yield_now().await;
        cache.set(&key(), &vec![99i64]);

        release_tx.send(()).unwrap();
        let fetched = slow.await.unwrap().unwrap();

        // The caller still gets its value, but the cache keeps the newer one.
        assert_eq!(fetched, Some(vec![1]));
        assert_eq!(cache.peek::<Vec<i64>>(&key()), Some(vec![99]));
    }

    #[tokio::test]
    async fn clear_supersedes_in_flight_fetches() {
        let cache = Arc::new(QueryCache::new());
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let slow = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move {
                cache
                    .fetch::<Vec<i64>, _, _>(key(), opts(), || async move {
                        release_rx.await.ok();
                        Ok(vec![1])
                    })
                    .await
            }
        });

        tokio::task::yield_now().await;
        cache.clear();
        release_tx.send(()).unwrap();
        slow.await.unwrap().unwrap();

        // Logout evicted the key; the straggler must not repopulate it.
        assert_eq!(cache.peek::<Vec<i64>>(&key()), None);
    }

    #[tokio::test]
    async fn stale_time_zero_always_refetches() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let calls = calls.clone();
            let _: Option<Vec<i64>> = cache
                .fetch(key(), FetchOptions::stale(Duration::ZERO), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1])
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
