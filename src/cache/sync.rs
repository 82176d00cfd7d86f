//! Local patching of cached list results after mutations.
//!
//! A successful (or optimistic) mutation is applied to the cached result it
//! affects instead of refetching it. Other cached pages/filters of the same
//! entity are only marked stale; they are corrected when next read. Another
//! session's writes therefore become visible after at most one stale time.

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::key::QueryKey;
use super::store::CacheStore;
use super::traits::Cacheable;
use crate::error::FetchError;
use crate::pagination::{CursorPage, InfinitePages, Page};

/// A user mutation to reflect in cached data. Consumed once.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationIntent<T> {
  /// Prepend a new (possibly placeholder) item
  Create { item: T },
  /// Swap an optimistic placeholder for the server's canonical record
  Confirm { placeholder_id: String, canonical: T },
  /// Replace the matching item's fields in place
  Update { item: T },
  /// Remove the matching item
  Delete { id: String },
}

impl<T> MutationIntent<T> {
  pub fn kind(&self) -> &'static str {
    match self {
      MutationIntent::Create { .. } => "create",
      MutationIntent::Confirm { .. } => "confirm",
      MutationIntent::Update { .. } => "update",
      MutationIntent::Delete { .. } => "delete",
    }
  }
}

/// What to do when the target key has no cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
  /// Leave it alone; the next read fetches fresh data anyway
  #[default]
  Lazy,
  /// The caller needs the updated view now and will refetch
  Eager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
  /// The cached data was changed
  Applied,
  /// Nothing to change (entry absent under the lazy policy, or item not found)
  NoOp,
  /// Entry absent and the caller asked for an up-to-date view
  RequiresRefetch,
}

/// A cached container whose items can be patched by a [`MutationIntent`].
pub trait Patchable<T: Cacheable> {
  /// Apply `intent`; returns whether anything changed.
  fn apply(&mut self, intent: &MutationIntent<T>) -> bool;
}

/// Flat list access used by the shared patch logic.
trait ItemList<T> {
  fn items_mut(&mut self) -> &mut Vec<T>;
  /// Called after `delta` items were added to (or removed from) the list.
  fn resized(&mut self, delta: i64);
}

impl<T> ItemList<T> for Vec<T> {
  fn items_mut(&mut self) -> &mut Vec<T> {
    self
  }

  fn resized(&mut self, _delta: i64) {}
}

impl<T> ItemList<T> for Page<T> {
  fn items_mut(&mut self) -> &mut Vec<T> {
    &mut self.items
  }

  fn resized(&mut self, delta: i64) {
    self.total_count = shift(self.total_count, delta);
    // The last item now belongs to the next page on the server
    self.items.truncate(self.page_size as usize);
  }
}

impl<T> ItemList<T> for CursorPage<T> {
  fn items_mut(&mut self) -> &mut Vec<T> {
    &mut self.items
  }

  fn resized(&mut self, delta: i64) {
    self.total_count = shift(self.total_count, delta);
    self.next_offset = self.next_offset.map(|next| shift_offset(next, delta));
  }
}

fn shift(count: u64, delta: i64) -> u64 {
  if delta < 0 {
    count.saturating_sub(delta.unsigned_abs())
  } else {
    count.saturating_add(delta as u64)
  }
}

/// Move a server cursor past rows inserted or removed before it.
fn shift_offset(offset: u32, delta: i64) -> u32 {
  let shifted = shift(u64::from(offset), delta);
  u32::try_from(shifted).unwrap_or(u32::MAX)
}

fn position<T: Cacheable>(items: &[T], id: &str) -> Option<usize> {
  items.iter().position(|item| item.cache_key() == id)
}

fn patch_list<T: Cacheable, L: ItemList<T>>(list: &mut L, intent: &MutationIntent<T>) -> bool {
  match intent {
    MutationIntent::Create { item } => {
      let items = list.items_mut();
      if position(items, &item.cache_key()).is_some() {
        return false;
      }
      items.insert(0, item.clone());
      list.resized(1);
      true
    }
    MutationIntent::Confirm {
      placeholder_id,
      canonical,
    } => {
      let items = list.items_mut();
      let placeholder = position(items, placeholder_id);
      let existing = position(items, &canonical.cache_key());
      match (placeholder, existing) {
        // The canonical record already arrived (e.g. via a refetch).
        (Some(p), Some(e)) if p != e => {
          items.remove(p);
          list.resized(-1);
          true
        }
        (Some(p), _) => {
          items[p] = canonical.clone();
          true
        }
        (None, Some(e)) => {
          items[e] = canonical.clone();
          true
        }
        (None, None) => {
          items.insert(0, canonical.clone());
          list.resized(1);
          true
        }
      }
    }
    MutationIntent::Update { item } => {
      let items = list.items_mut();
      match position(items, &item.cache_key()) {
        Some(idx) => {
          items[idx] = item.clone();
          true
        }
        None => false,
      }
    }
    MutationIntent::Delete { id } => {
      let items = list.items_mut();
      match position(items, id) {
        Some(idx) => {
          items.remove(idx);
          list.resized(-1);
          true
        }
        None => false,
      }
    }
  }
}

impl<T: Cacheable> Patchable<T> for Vec<T> {
  fn apply(&mut self, intent: &MutationIntent<T>) -> bool {
    patch_list(self, intent)
  }
}

impl<T: Cacheable> Patchable<T> for Page<T> {
  fn apply(&mut self, intent: &MutationIntent<T>) -> bool {
    patch_list(self, intent)
  }
}

impl<T: Cacheable> Patchable<T> for CursorPage<T> {
  fn apply(&mut self, intent: &MutationIntent<T>) -> bool {
    patch_list(self, intent)
  }
}

fn page_of<T: Cacheable>(pages: &[CursorPage<T>], id: &str) -> Option<usize> {
  pages.iter().position(|p| position(&p.items, id).is_some())
}

fn replace_item<T: Cacheable>(items: &mut [T], id: &str, with: &T) {
  if let Some(idx) = position(items, id) {
    items[idx] = with.clone();
  }
}

fn remove_item<T: Cacheable>(items: &mut Vec<T>, id: &str) {
  if let Some(idx) = position(items, id) {
    items.remove(idx);
  }
}

impl<T: Cacheable> Patchable<T> for InfinitePages<T> {
  fn apply(&mut self, intent: &MutationIntent<T>) -> bool {
    // (items added or removed, index of the page they were added to or removed from)
    let (delta, from_page): (i64, usize) = match intent {
      MutationIntent::Create { item } => {
        if page_of(&self.pages, &item.cache_key()).is_some() {
          return false;
        }
        let Some(first) = self.pages.first_mut() else {
          return false;
        };
        first.items.insert(0, item.clone());
        (1, 0)
      }
      MutationIntent::Confirm {
        placeholder_id,
        canonical,
      } => {
        let canonical_id = canonical.cache_key();
        match (
          page_of(&self.pages, placeholder_id),
          page_of(&self.pages, &canonical_id),
        ) {
          (Some(p), Some(_)) if *placeholder_id != canonical_id => {
            remove_item(&mut self.pages[p].items, placeholder_id);
            (-1, p)
          }
          (Some(p), _) => {
            replace_item(&mut self.pages[p].items, placeholder_id, canonical);
            (0, p)
          }
          (None, Some(e)) => {
            replace_item(&mut self.pages[e].items, &canonical_id, canonical);
            (0, e)
          }
          (None, None) => {
            let Some(first) = self.pages.first_mut() else {
              return false;
            };
            first.items.insert(0, canonical.clone());
            (1, 0)
          }
        }
      }
      MutationIntent::Update { item } => {
        let id = item.cache_key();
        let Some(p) = page_of(&self.pages, &id) else {
          return false;
        };
        replace_item(&mut self.pages[p].items, &id, item);
        (0, p)
      }
      MutationIntent::Delete { id } => {
        let Some(p) = page_of(&self.pages, id) else {
          return false;
        };
        remove_item(&mut self.pages[p].items, id);
        (-1, p)
      }
    };

    // Every page carries the list-wide total. Cursors of the touched page and
    // the pages after it point past the changed row.
    if delta != 0 {
      for (idx, page) in self.pages.iter_mut().enumerate() {
        page.total_count = shift(page.total_count, delta);
        if idx >= from_page {
          page.next_offset = page.next_offset.map(|next| shift_offset(next, delta));
        }
      }
    }
    true
  }
}

/// Apply `intent` to the data cached under `key`.
///
/// Any request in flight for `key` is detached first so that a response
/// issued before the mutation cannot overwrite the patched entry. Entries of
/// the same entity under other keys are marked stale. An absent entry is never
/// fabricated.
pub fn apply_mutation<D, T>(
  store: &CacheStore,
  key: &QueryKey,
  intent: &MutationIntent<T>,
  policy: SyncPolicy,
) -> Result<SyncOutcome, FetchError>
where
  D: Patchable<T> + Serialize + DeserializeOwned,
  T: Cacheable,
{
  store.detach(key);
  let changed = store.update::<D, _, _>(key, |data| data.apply(intent))?;

  let outcome = match (changed, policy) {
    (Some(true), _) => SyncOutcome::Applied,
    (Some(false), _) => SyncOutcome::NoOp,
    (None, SyncPolicy::Lazy) => SyncOutcome::NoOp,
    (None, SyncPolicy::Eager) => SyncOutcome::RequiresRefetch,
  };

  store.invalidate_entity(key.entity(), Some(key));

  debug!(
    key = %key,
    entity = T::entity_type(),
    kind = intent.kind(),
    ?outcome,
    "Applied mutation to cache"
  );
  Ok(outcome)
}
