//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for list items that can be patched in place inside cached results.
///
/// Implementors must provide a stable identity so that deletes, updates and
/// optimistic placeholders can be matched against cached items.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Unique identifier for this item (e.g. session id, user id)
  fn cache_key(&self) -> String;

  /// Entity type name, used in log output (e.g. "game_session")
  fn entity_type() -> &'static str;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was fetched from the network (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from a fresh cache entry.
  pub fn from_cache(data: T, cached_at: Option<DateTime<Utc>>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network (possibly shared with a coalesced caller)
  Network,
  /// Served from a cache entry that had not yet gone stale
  Cache,
}
