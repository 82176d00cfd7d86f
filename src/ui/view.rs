use crate::ui::components::Flash;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Trait for components that provide shortcuts
pub trait ShortcutProvider {
  fn shortcuts(&self) -> Vec<ShortcutInfo>;
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, edit, etc.) and return
/// actions for the App to execute: App → View → Components.
///
/// Views load data through `Query`/`InfiniteQuery` and run writes through
/// `Mutation`, polling all of them in `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect);

  fn breadcrumb_label(&self) -> String;

  /// Extra context for the header (active filters, current page, ...)
  fn context(&self) -> Option<String> {
    None
  }

  /// Called on each tick to allow views to poll async queries
  fn tick(&mut self) {}

  /// Whether a text overlay owns the keyboard (global keys are suppressed)
  fn is_capturing_input(&self) -> bool {
    false
  }

  /// Status message to show in the footer
  fn flash(&self) -> Option<&Flash> {
    None
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
