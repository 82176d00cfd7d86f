use checkpointer::error::FetchError;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Paragraph, Wrap};

/// Message shown in place of a list or detail that failed to load
pub fn error_message(error: &FetchError) -> (String, Color) {
  match error {
    FetchError::Forbidden(_) => (
      "Access denied. This view requires an admin account.".to_string(),
      Color::Red,
    ),
    FetchError::NotFound(_) => ("Not found.".to_string(), Color::Yellow),
    FetchError::NetworkError(msg) => (
      format!("Could not reach the server: {}\n\nPress 'r' to retry.", msg),
      Color::Red,
    ),
    other => (format!("Error: {}\n\nPress 'r' to retry.", other), Color::Red),
  }
}

pub fn draw_error(frame: &mut Frame, area: Rect, block: Block, error: &FetchError) {
  let (message, color) = error_message(error);
  let paragraph = Paragraph::new(message)
    .block(block)
    .wrap(Wrap { trim: true })
    .style(Style::default().fg(color));
  frame.render_widget(paragraph, area);
}

/// Dimmed placeholder text inside a block (loading, empty list, ...)
pub fn draw_placeholder(frame: &mut Frame, area: Rect, block: Block, text: &str) {
  let paragraph = Paragraph::new(text.to_string())
    .block(block)
    .style(Style::default().fg(Color::DarkGray));
  frame.render_widget(paragraph, area);
}

/// The standard bordered block used by list and detail views
pub fn view_block(title: String) -> Block<'static> {
  Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(ratatui::widgets::Borders::ALL)
    .border_style(Style::default().fg(Color::Blue))
}
