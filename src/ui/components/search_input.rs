use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::ui::view::{ShortcutInfo, ShortcutProvider};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Text changed while typing
  Changed(String),
  /// Enter pressed; the overlay closes and the text is applied
  Submitted(String),
  /// Esc pressed; the overlay closes and the previous text is kept
  Cancelled,
}

/// Search overlay opened with `/`.
///
/// Reopening it starts from the last submitted text so a filter can be
/// refined instead of retyped.
#[derive(Debug, Clone)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
  applied: String,
  title: &'static str,
}

impl Default for SearchInput {
  fn default() -> Self {
    Self::new(" Search ")
  }
}

impl SearchInput {
  pub fn new(title: &'static str) -> Self {
    Self {
      input: TextInput::new(),
      active: false,
      applied: String::new(),
      title,
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Last submitted text
  pub fn applied(&self) -> &str {
    &self.applied
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.set_value(&self.applied);
  }

  /// Forget the applied text (filters were reset elsewhere)
  pub fn reset(&mut self) {
    self.applied.clear();
    self.input.clear();
    self.active = false;
  }

  /// Handle a key event
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        self.active = false;
        self.applied = value.trim().to_string();
        KeyResult::Event(SearchEvent::Submitted(self.applied.clone()))
      }
      InputResult::Cancelled => {
        self.active = false;
        KeyResult::Event(SearchEvent::Cancelled)
      }
      InputResult::Consumed => KeyResult::Event(SearchEvent::Changed(self.input.value().to_string())),
      // Swallow everything else so view keys don't fire while typing
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3_u16.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(self.title);

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let (before, after) = self.input.split_at_cursor();
    let input_line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);
  }
}

impl ShortcutProvider for SearchInput {
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.active {
      vec![
        ShortcutInfo::new("Enter", "apply").with_priority(1),
        ShortcutInfo::new("Esc", "cancel").with_priority(2),
      ]
    } else {
      vec![ShortcutInfo::new("/", "search").with_priority(20)]
    }
  }
}
