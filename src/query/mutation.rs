//! One-shot counterpart of [`Query`](super::Query) for writes.

use std::future::Future;
use tokio::sync::mpsc;

use crate::error::FetchError;

/// A write started from the UI and polled on tick.
///
/// Only one write runs at a time; `run` is ignored while one is pending so
/// a repeated key press does not send the same mutation twice. The `tag`
/// identifies what the write was for (e.g. which item) when it completes.
pub struct Mutation<K, T> {
  pending: Option<K>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, FetchError>>>,
}

impl<K, T> Default for Mutation<K, T> {
  fn default() -> Self {
    Self {
      pending: None,
      receiver: None,
    }
  }
}

impl<K: Clone, T: Send + 'static> Mutation<K, T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_pending(&self) -> bool {
    self.receiver.is_some()
  }

  /// Tag of the write in flight, if any.
  pub fn pending(&self) -> Option<&K> {
    self.pending.as_ref()
  }

  /// Spawn `future` unless a write is already in flight. Returns whether it started.
  pub fn run<Fut>(&mut self, tag: K, future: Fut) -> bool
  where
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.pending = Some(tag);
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
    true
  }

  /// Take the result once the write has finished.
  pub fn poll(&mut self) -> Option<(K, Result<T, FetchError>)> {
    let receiver = self.receiver.as_mut()?;
    let result = match receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return None,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        Err(FetchError::NetworkError("Mutation was cancelled".to_string()))
      }
    };
    self.receiver = None;
    let tag = self.pending.take()?;
    Some((tag, result))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  async fn settle<K: Clone, T: Send + 'static>(
    mutation: &mut Mutation<K, T>,
  ) -> (K, Result<T, FetchError>) {
    for _ in 0..100 {
      if let Some(done) = mutation.poll() {
        return done;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("mutation did not finish");
  }

  #[tokio::test]
  async fn test_result_is_returned_with_tag() {
    let mut mutation = Mutation::new();
    assert!(mutation.run(7_i64, async { Ok("done") }));
    assert!(mutation.is_pending());
    assert_eq!(mutation.pending(), Some(&7));

    let (tag, result) = settle(&mut mutation).await;
    assert_eq!(tag, 7);
    assert_eq!(result, Ok("done"));
    assert!(!mutation.is_pending());
    assert!(mutation.poll().is_none());
  }

  #[tokio::test]
  async fn test_second_run_is_ignored_while_pending() {
    let mut mutation: Mutation<i64, u32> = Mutation::new();
    assert!(mutation.run(1, async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok(1)
    }));
    assert!(!mutation.run(2, async { Ok(2) }));

    let (tag, result) = settle(&mut mutation).await;
    assert_eq!(tag, 1);
    assert_eq!(result, Ok(1));
  }

  #[tokio::test]
  async fn test_error_is_delivered() {
    let mut mutation: Mutation<(), ()> = Mutation::new();
    mutation.run((), async { Err(FetchError::Forbidden("admin only".to_string())) });

    let (_, result) = settle(&mut mutation).await;
    assert!(result.unwrap_err().is_forbidden());
  }
}
