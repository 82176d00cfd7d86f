use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Result of handling a key event in an input component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
  /// Key was handled, continue input mode
  Consumed,
  /// Enter pressed, here's the submitted value
  Submitted(String),
  /// Escape pressed, input cancelled
  Cancelled,
  /// Key not handled, pass to next handler
  NotHandled,
}

/// Single-line text input.
///
/// The cursor counts characters, not bytes, so titles with accents or CJK
/// characters can be edited safely.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  buffer: String,
  cursor: usize,
}

impl TextInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn value(&self) -> &str {
    &self.buffer
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
  }

  /// Replace the contents and put the cursor at the end
  pub fn set_value(&mut self, value: &str) {
    self.buffer = value.to_string();
    self.cursor = self.char_len();
  }

  fn char_len(&self) -> usize {
    self.buffer.chars().count()
  }

  /// Byte offset of the `n`th character
  fn byte_at(&self, n: usize) -> usize {
    self
      .buffer
      .char_indices()
      .nth(n)
      .map(|(i, _)| i)
      .unwrap_or(self.buffer.len())
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Esc => InputResult::Cancelled,
      KeyCode::Enter => InputResult::Submitted(self.buffer.clone()),
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          let at = self.byte_at(self.cursor);
          self.buffer.remove(at);
        }
        InputResult::Consumed
      }
      KeyCode::Delete => {
        if self.cursor < self.char_len() {
          let at = self.byte_at(self.cursor);
          self.buffer.remove(at);
        }
        InputResult::Consumed
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        InputResult::Consumed
      }
      KeyCode::Right => {
        self.cursor = (self.cursor + 1).min(self.char_len());
        InputResult::Consumed
      }
      KeyCode::Home => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::End => {
        self.cursor = self.char_len();
        InputResult::Consumed
      }
      KeyCode::Char('a') if ctrl => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('e') if ctrl => {
        self.cursor = self.char_len();
        InputResult::Consumed
      }
      KeyCode::Char('u') if ctrl => {
        // Clear line before cursor
        let at = self.byte_at(self.cursor);
        self.buffer.replace_range(..at, "");
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('w') if ctrl => {
        // Delete word before cursor
        let at = self.byte_at(self.cursor);
        let before = &self.buffer[..at];
        let start = before.trim_end().rfind(' ').map(|i| i + 1).unwrap_or(0);
        let removed = self.buffer[start..at].chars().count();
        self.buffer.replace_range(start..at, "");
        self.cursor -= removed;
        InputResult::Consumed
      }
      KeyCode::Char(_) if ctrl => InputResult::NotHandled,
      KeyCode::Char(c) => {
        let at = self.byte_at(self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
        InputResult::Consumed
      }
      _ => InputResult::NotHandled,
    }
  }

  /// Text before and after the cursor, for rendering a cursor in between
  pub fn split_at_cursor(&self) -> (&str, &str) {
    self.buffer.split_at(self.byte_at(self.cursor))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl_key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::CONTROL)
  }

  fn typed(text: &str) -> TextInput {
    let mut input = TextInput::new();
    for c in text.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
    input
  }

  #[test]
  fn test_submit_and_cancel() {
    let mut input = typed("zelda");
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      InputResult::Submitted("zelda".to_string())
    );
    assert_eq!(input.handle_key(key(KeyCode::Esc)), InputResult::Cancelled);
  }

  #[test]
  fn test_edit_in_middle() {
    let mut input = typed("ac");
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Char('b')));
    assert_eq!(input.value(), "abc");
    assert_eq!(input.split_at_cursor(), ("ab", "c"));
  }

  #[test]
  fn test_multibyte_characters() {
    let mut input = typed("Pokémon");
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "Pokmon");

    input.handle_key(key(KeyCode::Char('é')));
    input.handle_key(key(KeyCode::Delete));
    assert_eq!(input.value(), "Pokéon");
  }

  #[test]
  fn test_ctrl_u_clears_before_cursor() {
    let mut input = typed("hello world");
    for _ in 0..5 {
      input.handle_key(key(KeyCode::Left));
    }
    input.handle_key(ctrl_key(KeyCode::Char('u')));
    assert_eq!(input.value(), "world");
    assert_eq!(input.split_at_cursor(), ("", "world"));
  }

  #[test]
  fn test_ctrl_w_deletes_word() {
    let mut input = typed("final fantasy");
    input.handle_key(ctrl_key(KeyCode::Char('w')));
    assert_eq!(input.value(), "final ");
  }

  #[test]
  fn test_set_value_moves_cursor_to_end() {
    let mut input = TextInput::new();
    input.set_value("hades");
    input.handle_key(key(KeyCode::Char('2')));
    assert_eq!(input.value(), "hades2");
  }
}
