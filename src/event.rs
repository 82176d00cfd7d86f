use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh and query polling
  Tick,
}

/// Event handler that produces events from terminal input and a tick timer.
///
/// A tick is sent whenever no input arrived within the tick rate; views poll
/// their queries on it.
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn terminal event reader
    tokio::spawn(async move {
      loop {
        if event::poll(tick_rate).unwrap_or(false) {
          if let Ok(evt) = event::read() {
            // Presses only; some terminals also report releases
            if let CrosstermEvent::Key(key) = evt {
              if key.kind == KeyEventKind::Press && tx.send(Event::Key(key)).is_err() {
                break;
              }
            }
          }
        } else {
          // Tick
          if tx.send(Event::Tick).is_err() {
            break;
          }
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
