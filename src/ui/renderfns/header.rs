use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with title, view context, and the view's shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  context: Option<&str>,
  shortcuts: &[ShortcutInfo],
) {
  let mut spans = vec![
    Span::styled(" checkpointer ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
  ];

  if let Some(context) = context {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", context),
      Style::default().fg(Color::Yellow).bold(),
    ));
  }
  spans.push(Span::raw(" "));

  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);
  for shortcut in sorted {
    // Keys and brackets highlighted, descriptions dimmed
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host part of the API URL, used as the title when none is configured
pub fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_domain() {
    assert_eq!(
      extract_domain("https://checkpointer.example"),
      "checkpointer.example"
    );
    assert_eq!(
      extract_domain("https://games.example.com/api/v1"),
      "games.example.com"
    );
    assert_eq!(extract_domain("http://localhost:3000"), "localhost:3000");
  }
}
