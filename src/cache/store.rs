//! Session-owned in-memory cache store.
//!
//! Entries are kept as serialized JSON, keyed by [`QueryKey`]. The store is
//! created per session and dropped (or [`CacheStore::clear`]ed) on logout.
//! There is no eviction beyond staleness.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, Shared};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

use super::key::QueryKey;
use crate::error::FetchError;

/// Shared handle on an in-flight network request.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<Value, FetchError>>>;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
  /// A fetch is in flight; `data` may still hold the previous result
  Pending,
  /// `data` holds the last successful result
  Ready,
  /// The last fetch failed; `data` may still hold the last good result
  Error,
}

/// A cached value together with its freshness metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  pub data: Option<T>,
  pub status: EntryStatus,
  pub error: Option<FetchError>,
  pub stale_at: DateTime<Utc>,
  pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> CacheEntry<T> {
  pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
    now > self.stale_at
  }

  /// Ready and not yet past its stale time.
  pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
    self.status == EntryStatus::Ready && self.data.is_some() && !self.is_stale(now)
  }
}

struct InFlight {
  id: u64,
  fetch: SharedFetch,
  /// Set by `cancel`: the response is not written unless a new read rejoins
  discard: bool,
}

struct Slot {
  entry: CacheEntry<Value>,
  /// Cleared on settle or detach; a settle whose id no longer matches is dropped
  in_flight: Option<InFlight>,
}

impl Slot {
  fn empty(now: DateTime<Utc>) -> Self {
    Self {
      entry: CacheEntry {
        data: None,
        status: EntryStatus::Pending,
        error: None,
        stale_at: now,
        fetched_at: None,
      },
      in_flight: None,
    }
  }
}

/// Handle returned by [`CacheStore::join_or_start`].
pub(crate) struct FetchTicket {
  pub id: u64,
  pub fetch: SharedFetch,
  /// True when this call started the request, false when it joined one
  pub started: bool,
}

/// In-memory cache store shared by every query of one session.
pub struct CacheStore {
  stale_time: Duration,
  slots: Mutex<HashMap<QueryKey, Slot>>,
  next_fetch_id: Mutex<u64>,
}

impl CacheStore {
  pub fn new(stale_time: Duration) -> Self {
    Self {
      stale_time,
      slots: Mutex::new(HashMap::new()),
      next_fetch_id: Mutex::new(0),
    }
  }

  pub fn stale_time(&self) -> Duration {
    self.stale_time
  }

  fn slots(&self) -> MutexGuard<'_, HashMap<QueryKey, Slot>> {
    // A panic while holding the lock leaves plain data behind; keep using it.
    self.slots.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Read the entry for `key`, decoded as `T`.
  pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<CacheEntry<T>>, FetchError> {
    let slots = self.slots();
    let Some(slot) = slots.get(key) else {
      return Ok(None);
    };
    let entry = &slot.entry;
    let data = match &entry.data {
      Some(value) => Some(decode::<T>(key, value.clone())?),
      None => None,
    };
    Ok(Some(CacheEntry {
      data,
      status: entry.status,
      error: entry.error.clone(),
      stale_at: entry.stale_at,
      fetched_at: entry.fetched_at,
    }))
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    self.slots().contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.slots().len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots().is_empty()
  }

  /// Whether a network request for `key` is currently in flight.
  pub fn is_fetching(&self, key: &QueryKey) -> bool {
    self
      .slots()
      .get(key)
      .map(|s| s.in_flight.is_some())
      .unwrap_or(false)
  }

  /// Store `data` as a fresh, ready entry.
  pub fn set<T: Serialize>(&self, key: &QueryKey, data: &T) -> Result<(), FetchError> {
    let value = encode(key, data)?;
    let now = Utc::now();
    let mut slots = self.slots();
    let slot = slots.entry(key.clone()).or_insert_with(|| Slot::empty(now));
    slot.entry.data = Some(value);
    slot.entry.status = EntryStatus::Ready;
    slot.entry.error = None;
    slot.entry.fetched_at = Some(now);
    slot.entry.stale_at = now + self.stale_time;
    Ok(())
  }

  /// Decode, mutate and re-encode the data under `key` in place.
  ///
  /// Returns `None` when no data is cached for `key`; nothing is created.
  pub fn update<T, R, F>(&self, key: &QueryKey, f: F) -> Result<Option<R>, FetchError>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut T) -> R,
  {
    let mut slots = self.slots();
    let Some(slot) = slots.get_mut(key) else {
      return Ok(None);
    };
    let Some(value) = slot.entry.data.take() else {
      return Ok(None);
    };

    let mut data = match decode::<T>(key, value.clone()) {
      Ok(data) => data,
      Err(e) => {
        slot.entry.data = Some(value);
        return Err(e);
      }
    };
    let result = f(&mut data);
    match encode(key, &data) {
      Ok(encoded) => slot.entry.data = Some(encoded),
      Err(e) => {
        slot.entry.data = Some(value);
        return Err(e);
      }
    }
    Ok(Some(result))
  }

  /// Force the entry to be refetched on next access.
  pub fn mark_stale(&self, key: &QueryKey) -> bool {
    let now = Utc::now();
    match self.slots().get_mut(key) {
      Some(slot) => {
        slot.entry.stale_at = now - Duration::milliseconds(1);
        true
      }
      None => false,
    }
  }

  /// Mark every entry of `entity` stale, except `keep`. Returns how many were touched.
  pub fn invalidate_entity(&self, entity: &str, keep: Option<&QueryKey>) -> usize {
    let expired = Utc::now() - Duration::milliseconds(1);
    let mut touched = 0;
    for (key, slot) in self.slots().iter_mut() {
      if key.entity() == entity && Some(key) != keep {
        slot.entry.stale_at = expired;
        touched += 1;
      }
    }
    debug!(entity, touched, "Invalidated cache entries");
    touched
  }

  /// Discard the response of the request in flight for `key`.
  ///
  /// The request itself keeps running and stays joinable: callers already
  /// awaiting it still receive its result, and a later read of the same key
  /// joins it instead of issuing a second request (which also revokes the
  /// discard). Returns whether a request was cancelled.
  pub fn cancel(&self, key: &QueryKey) -> bool {
    let mut slots = self.slots();
    let Some(slot) = slots.get_mut(key) else {
      return false;
    };
    match &mut slot.in_flight {
      Some(in_flight) if !in_flight.discard => in_flight.discard = true,
      _ => return false,
    }
    if slot.entry.data.is_some() {
      slot.entry.status = EntryStatus::Ready;
    }
    debug!(key = %key, "Cancelled in-flight fetch");
    true
  }

  /// Forget the request in flight for `key` for good.
  ///
  /// Used before a local patch: a response issued before the write is
  /// outdated, so it is neither stored nor joined by later reads.
  pub(crate) fn detach(&self, key: &QueryKey) -> bool {
    let mut slots = self.slots();
    let Some(slot) = slots.get_mut(key) else {
      return false;
    };
    if slot.in_flight.take().is_none() {
      return false;
    }
    if slot.entry.data.is_some() {
      slot.entry.status = EntryStatus::Ready;
    } else {
      slots.remove(key);
    }
    debug!(key = %key, "Detached in-flight fetch");
    true
  }

  pub fn remove(&self, key: &QueryKey) -> bool {
    self.slots().remove(key).is_some()
  }

  /// Tear down every entry (logout / session end).
  pub fn clear(&self) {
    let mut slots = self.slots();
    debug!(entries = slots.len(), "Clearing cache store");
    slots.clear();
  }

  /// Join the in-flight request for `key`, or start one with `start`.
  ///
  /// At most one request per key is in flight at any time.
  pub(crate) fn join_or_start<F>(&self, key: &QueryKey, start: F) -> FetchTicket
  where
    F: FnOnce() -> SharedFetch,
  {
    let now = Utc::now();
    let mut slots = self.slots();
    let slot = slots.entry(key.clone()).or_insert_with(|| Slot::empty(now));

    if let Some(in_flight) = &mut slot.in_flight {
      trace!(key = %key, "Joining in-flight fetch");
      if in_flight.discard {
        in_flight.discard = false;
        slot.entry.status = EntryStatus::Pending;
      }
      return FetchTicket {
        id: in_flight.id,
        fetch: in_flight.fetch.clone(),
        started: false,
      };
    }

    let id = self.next_id();
    let fetch = start();
    slot.in_flight = Some(InFlight {
      id,
      fetch: fetch.clone(),
      discard: false,
    });
    slot.entry.status = EntryStatus::Pending;
    FetchTicket {
      id,
      fetch,
      started: true,
    }
  }

  /// Record the outcome of request `id`. Only the first caller for a
  /// still-current request writes; returns whether the store was updated.
  pub(crate) fn settle(&self, key: &QueryKey, id: u64, result: &Result<Value, FetchError>) -> bool {
    let now = Utc::now();
    let mut slots = self.slots();
    let Some(slot) = slots.get_mut(key) else {
      return false;
    };
    let discard = match &slot.in_flight {
      Some(in_flight) if in_flight.id == id => in_flight.discard,
      _ => return false,
    };
    slot.in_flight = None;
    if discard {
      if slot.entry.data.is_none() {
        slots.remove(key);
      }
      return false;
    }

    match result {
      Ok(value) => {
        slot.entry.data = Some(value.clone());
        slot.entry.status = EntryStatus::Ready;
        slot.entry.error = None;
        slot.entry.fetched_at = Some(now);
        slot.entry.stale_at = now + self.stale_time;
      }
      Err(err) => {
        // Keep last-known-good data next to the error.
        slot.entry.status = EntryStatus::Error;
        slot.entry.error = Some(err.clone());
      }
    }
    true
  }

  fn next_id(&self) -> u64 {
    let mut next = self.next_fetch_id.lock().unwrap_or_else(|e| e.into_inner());
    *next += 1;
    *next
  }
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new(Duration::minutes(5))
  }
}

pub(crate) fn encode<T: Serialize>(key: &QueryKey, data: &T) -> Result<Value, FetchError> {
  serde_json::to_value(data)
    .map_err(|e| FetchError::MalformedResponse(format!("failed to encode {}: {}", key, e)))
}

pub(crate) fn decode<T: DeserializeOwned>(key: &QueryKey, value: Value) -> Result<T, FetchError> {
  serde_json::from_value(value)
    .map_err(|e| FetchError::MalformedResponse(format!("cached {} has unexpected shape: {}", key, e)))
}
