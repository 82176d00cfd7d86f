use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Command, CommandLine};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_SUGGESTIONS: usize = 8;

/// Events emitted by command input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// Command submitted, resolved to a command name where possible
  Submitted(CommandLine),
  Cancelled,
}

/// Command input component with autocomplete
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected_suggestion: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  fn close(&mut self) {
    self.active = false;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(self.input.value())
  }

  /// Handle a key event
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.close();
        return KeyResult::Event(CommandEvent::Cancelled);
      }
      KeyCode::Enter => {
        let line = self.resolve_command();
        self.close();
        return KeyResult::Event(CommandEvent::Submitted(line));
      }
      KeyCode::Tab | KeyCode::Down => {
        let count = self.suggestions().len().min(MAX_SUGGESTIONS);
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + 1) % count;
        }
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        let count = self.suggestions().len().min(MAX_SUGGESTIONS);
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + count - 1) % count;
        }
        return KeyResult::Handled;
      }
      _ => {}
    }

    if let InputResult::Consumed = self.input.handle_key(key) {
      self.selected_suggestion = 0;
    }
    KeyResult::Handled
  }

  /// The selected suggestion's name, keeping whatever argument was typed
  fn resolve_command(&self) -> CommandLine {
    let typed = CommandLine::parse(self.input.value());
    match self.suggestions().get(self.selected_suggestion) {
      Some(cmd) => CommandLine {
        name: cmd.name.to_string(),
        arg: typed.arg,
      },
      None => typed,
    }
  }

  /// Render the command overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let shown = suggestions.len().min(MAX_SUGGESTIONS) as u16;

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = (3 + shown).min(area.height);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let (before, after) = self.input.split_at_cursor();
    let input_line = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if suggestions.is_empty() || chunks[1].height == 0 {
      return;
    }

    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|cmd| {
        let usage = match cmd.argument {
          Some(arg) => format!("{} {}", cmd.name, arg),
          None => cmd.name.to_string(),
        };
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<14}", usage), Style::default().fg(Color::Cyan)),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected_suggestion));

    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn submit(text: &str) -> CommandLine {
    let mut input = CommandInput::new();
    input.handle_key(key(KeyCode::Char(':')));
    for c in text.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
    match input.handle_key(key(KeyCode::Enter)) {
      KeyResult::Event(CommandEvent::Submitted(line)) => line,
      other => panic!("expected submission, got {:?}", other),
    }
  }

  #[test]
  fn test_alias_resolves_to_name() {
    assert_eq!(submit("w").name, "wishlist");
  }

  #[test]
  fn test_argument_is_kept() {
    let line = submit("g 12");
    assert_eq!(line.name, "game");
    assert_eq!(line.arg.as_deref(), Some("12"));
  }

  #[test]
  fn test_unknown_command_passes_through() {
    let line = submit("zzz");
    assert_eq!(line.name, "zzz");
  }

  #[test]
  fn test_tab_cycles_suggestions() {
    let mut input = CommandInput::new();
    input.handle_key(key(KeyCode::Char(':')));
    input.handle_key(key(KeyCode::Tab));
    let line = match input.handle_key(key(KeyCode::Enter)) {
      KeyResult::Event(CommandEvent::Submitted(line)) => line,
      other => panic!("expected submission, got {:?}", other),
    };
    assert_eq!(line.name, commands::COMMANDS[1].name);
  }

  #[test]
  fn test_escape_cancels() {
    let mut input = CommandInput::new();
    input.handle_key(key(KeyCode::Char(':')));
    assert_eq!(
      input.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(CommandEvent::Cancelled)
    );
    assert!(!input.is_active());
  }
}
