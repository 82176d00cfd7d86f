//! "Load more" variant of [`Query`](super::Query) for cursor-paginated lists.

use std::future::Future;
use tokio::sync::mpsc;

use super::BoxFuture;
use crate::cache::{Cacheable, MutationIntent, Patchable};
use crate::error::FetchError;
use crate::pagination::{CursorPage, InfinitePages};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfiniteStatus {
  Idle,
  /// Fetching from the start (first load or refetch)
  LoadingFirst,
  /// Fetching the page at the forwarded `next_offset`
  LoadingMore,
  Ready,
  Errored(FetchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Load {
  First,
  More,
}

type PageFetcherFn<T> = Box<dyn Fn(u32) -> BoxFuture<CursorPage<T>> + Send + Sync>;

/// Accumulating query over a cursor-paginated endpoint.
///
/// The offset for the next page is the server-provided `next_offset` of the
/// last loaded page; once it is `None` the list is exhausted and further
/// `fetch_next_page` calls do nothing.
pub struct InfiniteQuery<T> {
  pages: InfinitePages<T>,
  status: InfiniteStatus,
  fetcher: PageFetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<(Load, Result<CursorPage<T>, FetchError>)>>,
}

impl<T: Send + 'static> InfiniteQuery<T> {
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CursorPage<T>, FetchError>> + Send + 'static,
  {
    Self {
      pages: InfinitePages::default(),
      status: InfiniteStatus::Idle,
      fetcher: Box::new(move |offset| Box::pin(fetcher(offset))),
      receiver: None,
    }
  }

  pub fn status(&self) -> &InfiniteStatus {
    &self.status
  }

  pub fn pages(&self) -> &InfinitePages<T> {
    &self.pages
  }

  pub fn items(&self) -> impl Iterator<Item = &T> {
    self.pages.items()
  }

  pub fn is_loading(&self) -> bool {
    matches!(
      self.status,
      InfiniteStatus::LoadingFirst | InfiniteStatus::LoadingMore
    )
  }

  pub fn error(&self) -> Option<&FetchError> {
    match &self.status {
      InfiniteStatus::Errored(e) => Some(e),
      _ => None,
    }
  }

  /// Whether the server reported more pages after the last loaded one.
  pub fn has_next_page(&self) -> bool {
    self.pages.has_next_page()
  }

  /// Load the first page if nothing is loaded or loading yet.
  pub fn fetch(&mut self) {
    if self.is_loading() || !self.pages.is_empty() {
      return;
    }
    self.start(0, Load::First);
  }

  /// Reload from the first page; loaded pages stay visible until it arrives.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start(0, Load::First);
  }

  /// Request the page at the last `next_offset`. No-op while loading or once exhausted.
  pub fn fetch_next_page(&mut self) {
    if self.is_loading() {
      return;
    }
    if self.pages.is_empty() {
      self.start(0, Load::First);
      return;
    }
    if let Some(offset) = self.pages.next_offset() {
      self.start(offset, Load::More);
    }
  }

  /// Poll for a pending page. Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok((load, Ok(page))) => {
        match load {
          Load::First => self.pages = InfinitePages { pages: vec![page] },
          Load::More => self.pages.push(page),
        }
        self.status = InfiniteStatus::Ready;
        self.receiver = None;
        true
      }
      Ok((_, Err(error))) => {
        self.status = InfiniteStatus::Errored(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.status =
          InfiniteStatus::Errored(FetchError::NetworkError("Query was cancelled".to_string()));
        self.receiver = None;
        true
      }
    }
  }

  fn start(&mut self, offset: u32, load: Load) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.status = match load {
      Load::First => InfiniteStatus::LoadingFirst,
      Load::More => InfiniteStatus::LoadingMore,
    };

    let future = (self.fetcher)(offset);
    tokio::spawn(async move {
      let result = future.await;
      let _ = tx.send((load, result));
    });
  }
}

impl<T: Cacheable> InfiniteQuery<T> {
  /// Patch the loaded pages in place (optimistic create, confirm, delete).
  pub fn apply(&mut self, intent: &MutationIntent<T>) -> bool {
    self.pages.apply(intent)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  /// Serves `total` numbers in pages of `size`, recording requested offsets.
  fn numbers(
    total: u32,
    size: u32,
    seen: Arc<std::sync::Mutex<Vec<u32>>>,
  ) -> impl Fn(u32) -> futures::future::Ready<Result<CursorPage<u32>, FetchError>> {
    move |offset| {
      seen.lock().unwrap().push(offset);
      let end = (offset + size).min(total);
      let next = if end < total { Some(end) } else { None };
      futures::future::ready(Ok(CursorPage {
        items: (offset..end).collect(),
        total_count: u64::from(total),
        has_more: next.is_some(),
        next_offset: next,
      }))
    }
  }

  async fn settle<T: Send + 'static>(query: &mut InfiniteQuery<T>) {
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
  }

  #[tokio::test]
  async fn test_forwards_next_offset_until_exhausted() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut query = InfiniteQuery::new(numbers(5, 2, seen.clone()));

    query.fetch();
    settle(&mut query).await;
    query.fetch_next_page();
    settle(&mut query).await;
    query.fetch_next_page();
    settle(&mut query).await;

    assert!(!query.has_next_page());
    assert_eq!(query.items().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);

    // Exhausted: no further request, and not an error.
    query.fetch_next_page();
    settle(&mut query).await;
    assert_eq!(*seen.lock().unwrap(), vec![0, 2, 4]);
    assert_eq!(query.status(), &InfiniteStatus::Ready);
  }

  #[tokio::test]
  async fn test_refetch_replaces_pages() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut query = InfiniteQuery::new(numbers(5, 2, seen));

    query.fetch();
    settle(&mut query).await;
    query.fetch_next_page();
    settle(&mut query).await;
    assert_eq!(query.pages().pages.len(), 2);

    query.refetch();
    assert_eq!(query.status(), &InfiniteStatus::LoadingFirst);
    assert_eq!(query.items().count(), 4);
    settle(&mut query).await;
    assert_eq!(query.pages().pages.len(), 1);
  }

  #[tokio::test]
  async fn test_next_page_while_loading_is_noop() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let mut query = InfiniteQuery::new(move |offset| {
      counter.fetch_add(1, Ordering::SeqCst);
      async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok::<_, FetchError>(CursorPage {
          items: vec![offset],
          total_count: 10,
          has_more: true,
          next_offset: Some(offset + 1),
        })
      }
    });

    query.fetch();
    query.fetch_next_page();
    query.fetch();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_error_keeps_loaded_pages() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let mut query = InfiniteQuery::new(move |offset| {
      let n = counter.fetch_add(1, Ordering::SeqCst);
      async move {
        if n == 0 {
          Ok(CursorPage {
            items: vec![offset],
            total_count: 2,
            has_more: true,
            next_offset: Some(1),
          })
        } else {
          Err(FetchError::ServerError {
            status: 500,
            message: "boom".to_string(),
          })
        }
      }
    });

    query.fetch();
    settle(&mut query).await;
    query.fetch_next_page();
    settle(&mut query).await;

    assert!(query.error().is_some());
    assert_eq!(query.items().copied().collect::<Vec<_>>(), vec![0]);
  }
}
