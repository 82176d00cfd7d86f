use checkpointer::pagination::{PageControls, PageItem, PageWindow};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// "41-45 of 45" plus the page-number sequence, current page highlighted
pub fn page_bar_line(window: &PageWindow, total_count: u64) -> Line<'static> {
  let mut spans = vec![Span::styled(
    format!(
      " {}-{} of {} ",
      window.range_start, window.range_end, total_count
    ),
    Style::default().fg(Color::DarkGray),
  )];

  if let PageControls::Shown(items) = &window.controls {
    spans.push(Span::styled(" ‹ ", Style::default().fg(Color::Cyan)));
    for item in items {
      match item {
        PageItem::Page(n) if *n == window.current_page => spans.push(Span::styled(
          format!("[{}]", n),
          Style::default().fg(Color::Yellow).bold(),
        )),
        PageItem::Page(n) => spans.push(Span::raw(format!(" {} ", n))),
        PageItem::Ellipsis => {
          spans.push(Span::styled(" … ", Style::default().fg(Color::DarkGray)))
        }
      }
    }
    spans.push(Span::styled(" › ", Style::default().fg(Color::Cyan)));
  }

  Line::from(spans)
}

pub fn draw_page_bar(frame: &mut Frame, area: Rect, window: &PageWindow, total_count: u64) {
  let paragraph = Paragraph::new(page_bar_line(window, total_count)).alignment(Alignment::Center);
  frame.render_widget(paragraph, area);
}
