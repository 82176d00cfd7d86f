use checkpointer::error::FetchError;
use ratatui::prelude::Color;
use std::time::{Duration, Instant};

const FLASH_TTL: Duration = Duration::from_secs(4);

/// Short-lived status message after a mutation (shown in the footer)
#[derive(Debug, Clone)]
pub struct Flash {
  pub message: String,
  pub color: Color,
  shown_at: Instant,
}

impl Flash {
  pub fn info(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      color: Color::Green,
      shown_at: Instant::now(),
    }
  }

  pub fn warn(message: impl Into<String>) -> Self {
    Self {
      color: Color::Yellow,
      ..Self::info(message)
    }
  }

  pub fn error(action: &str, error: &FetchError) -> Self {
    let message = if error.is_forbidden() {
      format!("{} failed: admin access required", action)
    } else {
      format!("{} failed: {}", action, error)
    };
    Self {
      message,
      color: Color::Red,
      shown_at: Instant::now(),
    }
  }

  pub fn is_expired(&self) -> bool {
    self.shown_at.elapsed() > FLASH_TTL
  }
}

/// Drop the flash once it has been shown long enough
pub fn expire(flash: &mut Option<Flash>) {
  if flash.as_ref().is_some_and(Flash::is_expired) {
    *flash = None;
  }
}
