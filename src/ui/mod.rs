pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use checkpointer::api::CachedClient;
use checkpointer::config::Config;
use checkpointer::error::FetchError;
use ratatui::widgets::ListState;
use std::sync::Arc;

/// What every view needs: the session's cached client and the config
#[derive(Clone)]
pub struct Context {
  pub client: CachedClient,
  pub config: Arc<Config>,
}

/// Log a failed cache call (invalidate, cancel) that the view can carry on without.
pub fn warn_on_cache_error<T>(action: &str, result: Result<T, FetchError>) -> Option<T> {
  match result {
    Ok(value) => Some(value),
    Err(error) => {
      tracing::warn!(action, error = %error, "Cache call failed");
      None
    }
  }
}

/// Keep the selection inside the list after its length changed
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}

/// Cycle through `options`: none → first → ... → last → none
pub fn cycle_option<T: Clone + PartialEq>(options: &[T], current: Option<&T>) -> Option<T> {
  match current.and_then(|c| options.iter().position(|o| o == c)) {
    None => options.first().cloned(),
    Some(i) => options.get(i + 1).cloned(),
  }
}
