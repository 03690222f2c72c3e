//! Query cache — keyed, de-duplicated reads.
//!
//! Each [`ResourceKey`] maps to one entry holding the last good value, a
//! fetch status, and the last error. At most one fetch per key is in flight:
//! concurrent readers attach to it and all observe the same outcome.
//!
//! Fetches run on their own task, so a reader that goes away (dropped future
//! or cancelled token) never leaves an entry stuck in `Fetching`.
//!
//! The fetched body is checked against the reader's type inside the fetch
//! task, so a success response of the wrong shape settles the entry as
//! `Failed` and the previous value stays.
//!
//! Invalidation racing an in-flight fetch: callers attached before the
//! invalidation still receive that fetch's result, which may be stale. The
//! result is not written back. A read started after the invalidation queues a
//! fresh fetch behind the stale one, so fetches per key stay serialized.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use mlstudio_core::error::{ClientError, Result};
use mlstudio_core::resource::ResourceKey;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::gateway::decode;

type SharedFetch = Shared<BoxFuture<'static, Result<Value>>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchStatus {
    #[default]
    Idle,
    Fetching,
    Ready,
    Failed,
}

/// Point-in-time view of one cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    pub value: Option<Value>,
    pub status: FetchStatus,
    pub last_error: Option<ClientError>,
}

struct InFlight {
    id: u64,
    generation: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheEntry {
    value: Option<Value>,
    status: FetchStatus,
    last_error: Option<ClientError>,
    in_flight: Option<InFlight>,
    /// Bumped by every invalidation; fetches started under an older
    /// generation do not write back.
    generation: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: Mutex<HashMap<ResourceKey, CacheEntry>>,
    next_fetch_id: AtomicU64,
}

impl CacheInner {
    fn entries(&self) -> MutexGuard<'_, HashMap<ResourceKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self, key: &ResourceKey, fetch_id: u64, generation: u64, result: &Result<Value>) {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };

        if entry.in_flight.as_ref().is_some_and(|f| f.id == fetch_id) {
            entry.in_flight = None;
        }

        if entry.generation != generation {
            debug!(key = %key, "Discarding result of fetch invalidated mid-flight");
            return;
        }

        match result {
            Ok(value) => {
                entry.value = Some(value.clone());
                entry.status = FetchStatus::Ready;
                entry.last_error = None;
            }
            Err(e) => {
                entry.status = FetchStatus::Failed;
                entry.last_error = Some(e.clone());
            }
        }
    }
}

/// Cloning yields another handle to the same cache.
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `key`, fetching only when no ready value is cached.
    pub async fn get<T, F, Fut>(&self, key: &ResourceKey, fetcher: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        decode(self.load(key, fetcher, check_shape::<T>, false).await?)
    }

    /// Fetch `key` even if a ready value is cached. Still joins an in-flight
    /// fetch instead of starting a second one.
    pub async fn refetch<T, F, Fut>(&self, key: &ResourceKey, fetcher: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        decode(self.load(key, fetcher, check_shape::<T>, true).await?)
    }

    /// Like [`get`](Self::get), for a consumer that may be torn down.
    ///
    /// Returns `None` if `token` is cancelled before the read resolves; the
    /// fetch itself still completes and updates the cache.
    pub async fn get_cancellable<T, F, Fut>(
        &self,
        key: &ResourceKey,
        fetcher: F,
        token: &CancellationToken,
    ) -> Option<Result<T>>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        if token.is_cancelled() {
            return None;
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(key = %key, "Consumer went away before the read resolved");
                None
            }
            result = self.get(key, fetcher) => {
                (!token.is_cancelled()).then_some(result)
            }
        }
    }

    fn load<F, Fut>(&self, key: &ResourceKey, fetcher: F, check: ShapeCheck, force: bool) -> Lookup
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let mut entries = self.inner.entries();
        let entry = entries.entry(key.clone()).or_default();

        let mut stale = None;
        if let Some(in_flight) = &entry.in_flight {
            if in_flight.generation == entry.generation {
                debug!(key = %key, "Attaching to in-flight fetch");
                return Lookup::Fetch(in_flight.fetch.clone());
            }
            debug!(key = %key, "Queueing fresh fetch behind invalidated one");
            stale = Some(in_flight.fetch.clone());
        }

        if !force
            && entry.status == FetchStatus::Ready
            && let Some(value) = &entry.value
        {
            debug!(key = %key, "Cache hit");
            return Lookup::Value(value.clone());
        }

        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let generation = entry.generation;
        debug!(key = %key, fetch_id = id, "Starting fetch");

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let request = fetcher();
        let handle = tokio::spawn(async move {
            if let Some(stale) = stale {
                let _ = stale.await;
            }
            let result = request.await.and_then(|value| check(&value).map(|()| value));
            inner.complete(&task_key, id, generation, &result);
            result
        });

        let fetch = async move {
            handle
                .await
                .unwrap_or_else(|e| Err(ClientError::Network(format!("fetch task failed: {e}"))))
        }
        .boxed()
        .shared();

        entry.status = FetchStatus::Fetching;
        entry.in_flight = Some(InFlight {
            id,
            generation,
            fetch: fetch.clone(),
        });

        Lookup::Fetch(fetch)
    }

    /// Drop the cached value and mark `key` idle. The next read fetches.
    ///
    /// Idempotent; unknown keys are a no-op.
    pub fn invalidate(&self, key: &ResourceKey) {
        let mut entries = self.inner.entries();
        if let Some(entry) = entries.get_mut(key) {
            entry.value = None;
            entry.status = FetchStatus::Idle;
            entry.last_error = None;
            entry.generation += 1;
            debug!(key = %key, "Invalidated");
        }
    }

    pub fn invalidate_all<'a>(&self, keys: impl IntoIterator<Item = &'a ResourceKey>) {
        for key in keys {
            self.invalidate(key);
        }
    }

    /// Invalidate every entry.
    pub fn clear(&self) {
        let mut entries = self.inner.entries();
        for entry in entries.values_mut() {
            entry.value = None;
            entry.status = FetchStatus::Idle;
            entry.last_error = None;
            entry.generation += 1;
        }
        debug!(entries = entries.len(), "Cache cleared");
    }

    pub fn snapshot(&self, key: &ResourceKey) -> Option<CacheSnapshot> {
        self.inner.entries().get(key).map(|entry| CacheSnapshot {
            value: entry.value.clone(),
            status: entry.status,
            last_error: entry.last_error.clone(),
        })
    }

    /// Status of `key`; `Idle` for keys never read.
    pub fn status(&self, key: &ResourceKey) -> FetchStatus {
        self.inner
            .entries()
            .get(key)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }
}

type ShapeCheck = fn(&Value) -> Result<()>;

fn check_shape<T: DeserializeOwned>(value: &Value) -> Result<()> {
    serde::Deserialize::deserialize(value)
        .map(|_: T| ())
        .map_err(|e: serde_json::Error| ClientError::Decode(e.to_string()))
}

/// What a read resolves to: a cached value, or a fetch to await.
enum Lookup {
    Value(Value),
    Fetch(SharedFetch),
}

impl std::future::IntoFuture for Lookup {
    type Output = Result<Value>;
    type IntoFuture = BoxFuture<'static, Result<Value>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Value(value) => futures::future::ready(Ok(value)).boxed(),
            Self::Fetch(fetch) => fetch.boxed(),
        }
    }
}
