use crate::ui::renderfns::{draw_error, draw_page_bar, draw_placeholder, format_date, truncate, view_block};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::{ensure_valid_selection, warn_on_cache_error, Context};
use checkpointer::api::resources::AuditLogs;
use checkpointer::api::types::AuditLogEntry;
use checkpointer::api::PageParams;
use checkpointer::pagination::{page_offset, Page};
use checkpointer::query::Query;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState, Paragraph, Wrap};

/// Read-only admin audit trail
pub struct AuditLogView {
  ctx: Context,
  query: Query<PageParams, Page<AuditLogEntry>>,
  list_state: ListState,
  show_details: bool,
}

impl AuditLogView {
  pub fn new(ctx: Context) -> Self {
    let client = ctx.client.clone();
    let mut query = Query::new(PageParams::first(ctx.config.admin.page_size), move |page| {
      let client = client.clone();
      async move { client.get::<AuditLogs>(page).await }
    });
    query.fetch();

    Self {
      ctx,
      query,
      list_state: ListState::default(),
      show_details: false,
    }
  }

  fn entries(&self) -> &[AuditLogEntry] {
    self
      .query
      .data()
      .map(|p| p.items.as_slice())
      .unwrap_or(&[])
  }

  fn go_to_page(&mut self, delta: i64) {
    let Some(page) = self.query.data().and_then(|p| p.window().step(delta)) else {
      return;
    };
    let limit = self.query.params().limit;
    self.query.set_page(PageParams {
      limit,
      offset: page_offset(page, limit),
    });
    self.list_state.select(Some(0));
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.entries().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.data() {
      _ if self.query.is_loading() => " Audit log (loading...) ".to_string(),
      Some(page) => format!(" Audit log ({}) ", page.total_count),
      None => " Audit log ".to_string(),
    };
    let block = view_block(title);

    if let Some(error) = self.query.error() {
      if len == 0 || error.is_forbidden() {
        draw_error(frame, area, block, error);
        return;
      }
    }
    if len == 0 {
      draw_placeholder(frame, area, block, "No admin actions recorded.");
      return;
    }

    let items: Vec<ListItem> = self
      .entries()
      .iter()
      .map(|entry| {
        let admin = entry
          .admin_username
          .clone()
          .unwrap_or_else(|| format!("admin {}", entry.admin_id));
        let target = match (&entry.target_type, entry.target_id) {
          (Some(kind), Some(id)) => format!("{} {}", kind, id),
          (Some(kind), None) => kind.clone(),
          (None, Some(id)) => id.to_string(),
          (None, None) => String::new(),
        };
        ListItem::new(Line::from(vec![
          Span::styled(format_date(&entry.created_at), Style::default().fg(Color::DarkGray)),
          Span::raw("  "),
          Span::styled(format!("{:<16}", truncate(&admin, 16)), Style::default().fg(Color::Cyan)),
          Span::styled(format!("{:<22}", truncate(&entry.action, 22)), Style::default().fg(Color::Yellow)),
          Span::raw(target),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_details(&self, frame: &mut Frame, area: Rect) {
    let block = view_block(" Details ".to_string());
    let selected = self
      .list_state
      .selected()
      .and_then(|idx| self.entries().get(idx));
    let text = match selected.and_then(|e| e.details.as_ref()) {
      Some(details) => serde_json::to_string_pretty(details).unwrap_or_else(|_| details.to_string()),
      None => "No details recorded for this action.".to_string(),
    };
    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: false }), area);
  }
}

impl View for AuditLogView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => self.go_to_page(1),
      KeyCode::Char('p') | KeyCode::Left => self.go_to_page(-1),
      KeyCode::Enter => self.show_details = !self.show_details,
      KeyCode::Char('r') => {
        warn_on_cache_error(
          "invalidate",
          self.ctx.client.invalidate::<AuditLogs>(self.query.params()),
        );
        self.query.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let rows = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(area);
    if self.show_details {
      let cols = Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[0]);
      self.render_list(frame, cols[0]);
      self.render_details(frame, cols[1]);
    } else {
      self.render_list(frame, rows[0]);
    }
    if let Some(page) = self.query.data() {
      draw_page_bar(frame, rows[1], &page.window(), page.total_count);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Audit log".to_string()
  }

  fn context(&self) -> Option<String> {
    self
      .query
      .data()
      .map(|p| format!("page {}/{}", p.current_page(), p.total_pages().max(1)))
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("n/p", "page").with_priority(40),
      ShortcutInfo::new("Enter", "details").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(80),
    ]
  }
}
