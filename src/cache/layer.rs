//! Cache layer that orchestrates caching logic with network fetching.

use chrono::Utc;
use futures::FutureExt;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::store::{self, CacheStore};
use super::traits::CacheResult;
use crate::error::FetchError;

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the views and the network client. It serves
/// fresh entries straight from the store, coalesces concurrent requests for
/// the same key into one network call, and records results (or errors, next
/// to the last good data) back into the store.
pub struct CacheLayer {
  store: Arc<CacheStore>,
}

impl CacheLayer {
  /// Create a new cache layer over the given store.
  pub fn new(store: CacheStore) -> Self {
    Self {
      store: Arc::new(store),
    }
  }

  pub fn store(&self) -> &CacheStore {
    &self.store
  }

  /// Fetch with a cache-first strategy.
  ///
  /// 1. Entry fresh - return it without touching the network
  /// 2. Request for this key already in flight - await that one
  /// 3. Otherwise start a request and store its result
  pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<CacheResult<T>, FetchError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    if let Some(entry) = self.store.get::<T>(key)? {
      if entry.is_fresh(Utc::now()) {
        if let Some(data) = entry.data {
          debug!(key = %key, "Cache hit");
          return Ok(CacheResult::from_cache(data, entry.fetched_at));
        }
      }
    }

    self.fetch_network(key, fetcher).await
  }

  /// Skip the freshness check, still coalescing with any in-flight request.
  pub async fn refetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<CacheResult<T>, FetchError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    self.fetch_network(key, fetcher).await
  }

  async fn fetch_network<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<CacheResult<T>, FetchError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    let encode_key = key.clone();
    let ticket = self.store.join_or_start(key, move || {
      let fut = fetcher();
      async move {
        let data = fut.await?;
        store::encode(&encode_key, &data)
      }
      .boxed()
      .shared()
    });

    if ticket.started {
      debug!(key = %key, "Fetching from network");
    }

    let result = ticket.fetch.await;
    self.store.settle(key, ticket.id, &result);

    match result {
      Ok(value) => Ok(CacheResult::from_network(store::decode(key, value)?)),
      Err(err) => {
        warn!(key = %key, error = %err, "Fetch failed");
        Err(err)
      }
    }
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheSource, EntryStatus, KeyBuilder};
  use chrono::Duration;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration as StdDuration;

  fn key(offset: u32) -> QueryKey {
    KeyBuilder::new("games-browse")
      .param("offset", offset)
      .build()
      .unwrap()
  }

  fn counting_fetch(
    calls: &Arc<AtomicU32>,
    value: u32,
    delay_ms: u64,
  ) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<u32, FetchError>> {
    let calls = Arc::clone(calls);
    move || {
      calls.fetch_add(1, Ordering::SeqCst);
      async move {
        tokio::time::sleep(StdDuration::from_millis(delay_ms)).await;
        Ok(value)
      }
      .boxed()
    }
  }

  #[tokio::test]
  async fn test_second_fetch_is_served_from_cache() {
    let layer = CacheLayer::new(CacheStore::default());
    let calls = Arc::new(AtomicU32::new(0));

    let first = layer.fetch(&key(0), counting_fetch(&calls, 7, 0)).await.unwrap();
    let second = layer.fetch(&key(0), counting_fetch(&calls, 8, 0)).await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_fetches_are_coalesced() {
    let layer = CacheLayer::new(CacheStore::default());
    let calls = Arc::new(AtomicU32::new(0));
    let k = key(0);

    let (a, b) = tokio::join!(
      layer.fetch(&k, counting_fetch(&calls, 1, 30)),
      layer.fetch(&k, counting_fetch(&calls, 2, 30)),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.unwrap().data, 1);
    assert_eq!(b.unwrap().data, 1);
  }

  #[tokio::test]
  async fn test_different_keys_fetch_independently() {
    let layer = CacheLayer::new(CacheStore::default());
    let calls = Arc::new(AtomicU32::new(0));

    let (k0, k20) = (key(0), key(20));
    let (a, b) = tokio::join!(
      layer.fetch(&k0, counting_fetch(&calls, 1, 10)),
      layer.fetch(&k20, counting_fetch(&calls, 2, 10)),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(a.unwrap().data, 1);
    assert_eq!(b.unwrap().data, 2);
  }

  #[tokio::test]
  async fn test_stale_entry_is_refetched() {
    let layer = CacheLayer::new(CacheStore::new(Duration::zero()));
    let calls = Arc::new(AtomicU32::new(0));
    let k = key(0);

    layer.fetch(&k, counting_fetch(&calls, 1, 0)).await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(5)).await;
    let again = layer.fetch(&k, counting_fetch(&calls, 2, 0)).await.unwrap();

    assert_eq!(again.data, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_error_propagates_and_keeps_previous_data() {
    let layer = CacheLayer::new(CacheStore::new(Duration::zero()));
    let k = key(0);

    layer.fetch(&k, || async { Ok::<_, FetchError>(5u32) }).await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(5)).await;

    let err = layer
      .fetch::<u32, _, _>(&k, || async { Err(FetchError::Forbidden("nope".to_string())) })
      .await
      .unwrap_err();
    assert!(err.is_forbidden());

    let entry = layer.store().get::<u32>(&k).unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Error);
    assert_eq!(entry.data, Some(5));
  }

  #[tokio::test]
  async fn test_cancelled_response_does_not_overwrite() {
    let layer = CacheLayer::new(CacheStore::default());
    let calls = Arc::new(AtomicU32::new(0));
    let k = key(0);
    layer.store().set(&k, &1u32).unwrap();

    let pending = {
      let layer = layer.clone();
      let k = k.clone();
      let fetch = counting_fetch(&calls, 99, 30);
      tokio::spawn(async move { layer.refetch(&k, fetch).await })
    };
    tokio::time::sleep(StdDuration::from_millis(5)).await;
    assert!(layer.store().cancel(&k));

    // The superseded caller still gets its response...
    assert_eq!(pending.await.unwrap().unwrap().data, 99);
    // ...but the store keeps the current value.
    let entry = layer.store().get::<u32>(&k).unwrap().unwrap();
    assert_eq!(entry.data, Some(1));
  }

  #[tokio::test]
  async fn test_retyped_key_after_cancel_shares_the_request() {
    let layer = CacheLayer::new(CacheStore::default());
    let calls = Arc::new(AtomicU32::new(0));
    let k = key(0);

    let superseded = {
      let layer = layer.clone();
      let k = k.clone();
      let fetch = counting_fetch(&calls, 4, 30);
      tokio::spawn(async move { layer.fetch(&k, fetch).await })
    };
    tokio::time::sleep(StdDuration::from_millis(5)).await;
    assert!(layer.store().cancel(&k));

    // The same key is wanted again while the first request is on the wire
    let again = layer.fetch(&k, counting_fetch(&calls, 5, 0)).await.unwrap();
    assert_eq!(again.data, 4);
    assert_eq!(superseded.await.unwrap().unwrap().data, 4);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(layer.store().get::<u32>(&k).unwrap().unwrap().data, Some(4));
  }
}
