//! Session-scoped query cache.
//!
//! This module provides a resource-agnostic caching mechanism that:
//! - Derives canonical keys from an entity name plus request parameters
//! - Serves fresh entries without a network round trip
//! - Coalesces concurrent requests for the same key
//! - Patches cached lists in place after mutations instead of refetching

mod key;
mod layer;
mod store;
mod sync;
mod traits;

pub use key::{derive_key, KeyBuilder, KeyError, QueryKey};
pub use layer::CacheLayer;
pub use store::{CacheEntry, CacheStore, EntryStatus};
pub use sync::{apply_mutation, MutationIntent, Patchable, SyncOutcome, SyncPolicy};
pub use traits::{CacheResult, CacheSource, Cacheable};
