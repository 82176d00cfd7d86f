//! Async query abstraction for data fetching in list and detail views.
//!
//! Inspired by TanStack Query, this module provides a `Query<P, T>` type that
//! encapsulates async data fetching for a set of parameters, loading states,
//! and error handling.
//!
//! # Example
//!
//! ```ignore
//! let client = cached_client.clone();
//! let mut query = Query::new(BrowseParams::default(), move |params| {
//!     let client = client.clone();
//!     async move { client.get::<Browse>(params).await }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading { previous } => render_spinner_over(previous),
//!     QueryState::Ready(data) => render_data(data),
//!     QueryState::Errored { error, .. } => render_error(error),
//!     QueryState::Idle => {}
//! }
//! ```

mod infinite;
mod mutation;

pub use infinite::{InfiniteQuery, InfiniteStatus};
pub use mutation::Mutation;

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::error::FetchError;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is fetching; `previous` is what was on screen before (if kept)
  Loading { previous: Option<T> },
  /// Query completed successfully
  Ready(T),
  /// Query failed; `previous` is the last known good data (if any)
  Errored {
    error: FetchError,
    previous: Option<T>,
  },
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading { .. })
  }

  pub fn is_ready(&self) -> bool {
    matches!(self, QueryState::Ready(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Errored { .. })
  }

  /// Data to display: the result when ready, otherwise whatever was kept.
  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Ready(data) => Some(data),
      QueryState::Loading { previous } | QueryState::Errored { previous, .. } => previous.as_ref(),
      QueryState::Idle => None,
    }
  }

  pub fn error(&self) -> Option<&FetchError> {
    match self {
      QueryState::Errored { error, .. } => Some(error),
      _ => None,
    }
  }

  fn into_data(self) -> Option<T> {
    match self {
      QueryState::Ready(data) => Some(data),
      QueryState::Loading { previous } | QueryState::Errored { previous, .. } => previous,
      QueryState::Idle => None,
    }
  }
}

/// A boxed future that returns a Result<T, FetchError>
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send>>;

/// A factory function that creates futures for fetching data for a set of params
type FetcherFn<P, T> = Box<dyn Fn(P) -> BoxFuture<T> + Send + Sync>;

/// Async query for data fetching with state management.
///
/// Query<P, T> encapsulates:
/// - The current request parameters (filters, page, ...)
/// - The fetching logic (via a closure over those parameters)
/// - Idle/loading/ready/errored states
/// - Async result handling via channels
/// - Optional stale time tracking for cache invalidation
///
/// Every new request replaces the result channel, so a response for
/// superseded parameters is never applied.
pub struct Query<P, T> {
  state: QueryState<T>,
  params: P,
  fetcher: FetcherFn<P, T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, FetchError>>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<P: Clone + Send + 'static, T: Send + 'static> Query<P, T> {
  /// Create a new query for `params` with the given fetcher function.
  ///
  /// The fetcher is called with the current params each time a request
  /// is started.
  pub fn new<F, Fut>(params: P, fetcher: F) -> Self
  where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      params,
      fetcher: Box::new(move |p| Box::pin(fetcher(p))),
      receiver: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60), // Default 1 minute
    }
  }

  /// Set the stale time for this query.
  ///
  /// After this duration, the data is considered stale and `is_stale()` returns true.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn params(&self) -> &P {
    &self.params
  }

  /// Data to display, including data kept while reloading or after an error.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if the query succeeded.
  pub fn is_ready(&self) -> bool {
    self.state.is_ready()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error if the query failed.
  pub fn error(&self) -> Option<&FetchError> {
    self.state.error()
  }

  /// Check if the data is stale (older than stale_time).
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Ready(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch(true);
  }

  /// Force a refetch, even if already loading or data exists.
  ///
  /// The data on screen stays visible until the new result arrives.
  pub fn refetch(&mut self) {
    // Cancel any pending fetch by dropping the receiver
    self.receiver = None;
    self.start_fetch(true);
  }

  /// Retry after a failure. No-op unless the query is errored.
  pub fn retry(&mut self) {
    if self.state.is_error() {
      self.start_fetch(true);
    }
  }

  /// Move to other params within the same filter set (e.g. another page).
  ///
  /// The current data stays visible while the new page loads.
  pub fn set_page(&mut self, params: P) {
    self.params = params;
    self.receiver = None;
    self.start_fetch(true);
  }

  /// Switch to a different filter set.
  ///
  /// Previous data is discarded immediately so that results for the old
  /// filters are never shown under the new ones.
  pub fn set_filters(&mut self, params: P) {
    self.params = params;
    self.receiver = None;
    self.start_fetch(false);
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Ready(data);
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.fail(error);
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.fail(FetchError::NetworkError("Query was cancelled".to_string()));
        true
      }
    }
  }

  fn fail(&mut self, error: FetchError) {
    let previous = std::mem::replace(&mut self.state, QueryState::Idle).into_data();
    self.state = QueryState::Errored { error, previous };
    self.receiver = None;
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self, keep_previous: bool) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    let current = std::mem::replace(&mut self.state, QueryState::Idle);
    let previous = if keep_previous {
      current.into_data()
    } else {
      None
    };
    self.state = QueryState::Loading { previous };

    let future = (self.fetcher)(self.params.clone());
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.
// If you need to share a query, wrap it in Arc<Mutex<Query<P, T>>>.

impl<P: std::fmt::Debug, T: std::fmt::Debug> std::fmt::Debug for Query<P, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("params", &self.params)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new((), |_| async { Ok::<_, FetchError>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    // Wait for the result
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_ready());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<(), i32> =
      Query::new((), |_| async { Err(FetchError::NotFound("game 9".to_string())) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert!(query.error().unwrap().is_not_found());
  }

  #[tokio::test]
  async fn test_query_stale() {
    let mut query =
      Query::new((), |_| async { Ok::<_, FetchError>(42) }).with_stale_time(Duration::ZERO);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    // With zero stale time, should immediately be stale
    assert!(query.is_stale());
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let mut query = Query::new((), move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
      async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<_, FetchError>(42)
      }
    });

    query.fetch();
    assert!(query.is_loading());

    // Second fetch should be no-op
    query.fetch();
    assert!(query.is_loading());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new((), move |_| {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, FetchError>(counter.fetch_add(1, Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Refetch should cancel the first and start a new one
    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    // Only the second fetch should have completed and been received
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_page_change_keeps_previous_data() {
    let mut query = Query::new(1u32, |page| async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok::<_, FetchError>(format!("page {}", page))
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(40)).await;
    query.poll();
    assert_eq!(query.data().map(String::as_str), Some("page 1"));

    query.set_page(2);
    assert!(query.is_loading());
    assert_eq!(query.data().map(String::as_str), Some("page 1"));

    tokio::time::sleep(Duration::from_millis(40)).await;
    query.poll();
    assert_eq!(query.data().map(String::as_str), Some("page 2"));
  }

  #[tokio::test]
  async fn test_filter_change_discards_previous_data() {
    let mut query = Query::new("rpg".to_string(), |genre| async move {
      Ok::<_, FetchError>(format!("{} games", genre))
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(query.data().is_some());

    query.set_filters("racing".to_string());
    assert!(query.is_loading());
    assert_eq!(query.data(), None);
  }

  #[tokio::test]
  async fn test_superseded_response_is_ignored() {
    let mut query = Query::new("slow".to_string(), |filter| async move {
      let delay = if filter == "slow" { 60 } else { 5 };
      tokio::time::sleep(Duration::from_millis(delay)).await;
      Ok::<_, FetchError>(filter)
    });

    query.fetch();
    query.set_filters("fast".to_string());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(query.poll());
    assert_eq!(query.data().map(String::as_str), Some("fast"));

    // The slow response for the old filter lands later and must not be applied.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(!query.poll());
    assert_eq!(query.data().map(String::as_str), Some("fast"));
  }

  #[tokio::test]
  async fn test_error_keeps_last_good_data_and_retry_recovers() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let mut query = Query::new((), move |_| {
      let n = counter.fetch_add(1, Ordering::SeqCst);
      async move {
        if n == 1 {
          Err(FetchError::NetworkError("offline".to_string()))
        } else {
          Ok(n)
        }
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&0));

    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(query.is_error());
    assert_eq!(query.data(), Some(&0));

    query.retry();
    assert!(query.is_loading());
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(query.is_ready());
    assert_eq!(query.data(), Some(&2));
  }
}
