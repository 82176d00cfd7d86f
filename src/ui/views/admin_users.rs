use crate::ui::components::{expire, Flash};
use crate::ui::renderfns::{draw_error, draw_page_bar, draw_placeholder, truncate, view_block};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::{ensure_valid_selection, warn_on_cache_error, Context};
use checkpointer::api::resources::{AdminStats, AdminUsers};
use checkpointer::api::types::{self, AdminUser, UserRole};
use checkpointer::api::PageParams;
use checkpointer::cache::SyncOutcome;
use checkpointer::pagination::{page_offset, Page};
use checkpointer::query::{Mutation, Query};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState, Paragraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserChange {
  Role(UserRole),
  Suspended(bool),
}

/// Admin user management; requires an admin token
pub struct AdminUsersView {
  ctx: Context,
  query: Query<PageParams, Page<AdminUser>>,
  stats: Query<(), types::AdminStats>,
  change_op: Mutation<UserChange, (AdminUser, SyncOutcome)>,
  list_state: ListState,
  flash: Option<Flash>,
}

impl AdminUsersView {
  pub fn new(ctx: Context) -> Self {
    let client = ctx.client.clone();
    let mut query = Query::new(
      PageParams::first(ctx.config.admin.page_size),
      move |page| {
        let client = client.clone();
        async move { client.get::<AdminUsers>(page).await }
      },
    );
    query.fetch();

    let client = ctx.client.clone();
    let mut stats = Query::new((), move |_| {
      let client = client.clone();
      async move { client.get::<AdminStats>(()).await }
    });
    stats.fetch();

    Self {
      ctx,
      query,
      stats,
      change_op: Mutation::new(),
      list_state: ListState::default(),
      flash: None,
    }
  }

  fn users(&self) -> &[AdminUser] {
    self
      .query
      .data()
      .map(|p| p.items.as_slice())
      .unwrap_or(&[])
  }

  fn selected(&self) -> Option<&AdminUser> {
    self
      .list_state
      .selected()
      .and_then(|idx| self.users().get(idx))
  }

  fn change_selected(&mut self, change: impl FnOnce(&AdminUser) -> UserChange) {
    let Some(user) = self.selected() else {
      return;
    };
    let user_id = user.id;
    let change = change(user);
    let page = *self.query.params();
    let client = self.ctx.client.clone();

    self.change_op.run(change, async move {
      match change {
        UserChange::Role(role) => client.set_user_role(page, user_id, role).await,
        UserChange::Suspended(suspended) => client.suspend_user(page, user_id, suspended).await,
      }
    });
  }

  fn poll_change(&mut self) {
    let Some((change, result)) = self.change_op.poll() else {
      return;
    };
    match result {
      Ok((user, outcome)) => {
        let message = match change {
          UserChange::Role(role) => format!("{} is now {}", user.username, role.as_str()),
          UserChange::Suspended(true) => format!("Suspended {}", user.username),
          UserChange::Suspended(false) => format!("Reinstated {}", user.username),
        };
        self.flash = Some(Flash::info(message));
        if outcome == SyncOutcome::RequiresRefetch {
          warn_on_cache_error(
            "invalidate",
            self.ctx.client.invalidate::<AdminUsers>(self.query.params()),
          );
        }
        self.query.refetch();
        self.stats.refetch();
      }
      Err(e) => self.flash = Some(Flash::error("User update", &e)),
    }
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

  fn refresh(&mut self) {
    warn_on_cache_error(
      "invalidate",
      self.ctx.client.invalidate::<AdminUsers>(self.query.params()),
    );
    warn_on_cache_error("invalidate", self.ctx.client.invalidate::<AdminStats>(&()));
    self.query.refetch();
    self.stats.refetch();
  }

  fn render_stats(&self, frame: &mut Frame, area: Rect) {
    let line = match self.stats.data() {
      Some(s) => Line::from(vec![
        Span::styled(" Users ", Style::default().fg(Color::DarkGray)),
        Span::raw(s.total_users.to_string()),
        Span::styled("  Suspended ", Style::default().fg(Color::DarkGray)),
        Span::raw(s.suspended_users.to_string()),
        Span::styled("  Games ", Style::default().fg(Color::DarkGray)),
        Span::raw(s.total_games.to_string()),
        Span::styled("  Reviews ", Style::default().fg(Color::DarkGray)),
        Span::raw(s.total_reviews.to_string()),
        Span::styled("  Sessions ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{} ({} active)", s.total_sessions, s.active_sessions)),
      ]),
      None => Line::raw(""),
    };
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.users().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.data() {
      _ if self.query.is_loading() => " Users (loading...) ".to_string(),
      Some(page) => format!(" Users ({}) ", page.total_count),
      None => " Users ".to_string(),
    };
    let block = view_block(title);

    // Forbidden replaces the list even if a previous page was shown
    if let Some(error) = self.query.error() {
      if len == 0 || error.is_forbidden() {
        draw_error(frame, area, block, error);
        return;
      }
    }
    if len == 0 {
      draw_placeholder(frame, area, block, "No users.");
      return;
    }

    let pending = self.change_op.is_pending();
    let items: Vec<ListItem> = self
      .users()
      .iter()
      .map(|user| {
        let role_color = match user.role {
          UserRole::Admin => Color::Magenta,
          UserRole::User => Color::White,
        };
        let state = if user.suspended {
          Span::styled("suspended", Style::default().fg(Color::Red))
        } else {
          Span::styled("active", Style::default().fg(Color::Green))
        };
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:>6}", user.id), Style::default().fg(Color::DarkGray)),
          Span::raw("  "),
          Span::styled(format!("{:<20}", truncate(&user.username, 20)), Style::default().fg(Color::Cyan)),
          Span::raw(format!(
            "{:<32}",
            truncate(user.email.as_deref().unwrap_or(""), 32)
          )),
          Span::styled(format!("{:<7}", user.role.as_str()), Style::default().fg(role_color)),
          state,
        ]))
      })
      .collect();

    let highlight = if pending {
      Style::default().bg(Color::DarkGray).fg(Color::Gray)
    } else {
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
    };
    let list = List::new(items)
      .block(block)
      .highlight_style(highlight)
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for AdminUsersView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => self.go_to_page(1),
      KeyCode::Char('p') | KeyCode::Left => self.go_to_page(-1),
      KeyCode::Char('s') => self.change_selected(|u| UserChange::Suspended(!u.suspended)),
      KeyCode::Char('R') => self.change_selected(|u| UserChange::Role(u.role.toggled())),
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::vertical([
      Constraint::Length(1),
      Constraint::Min(3),
      Constraint::Length(1),
    ])
    .split(area);

    self.render_stats(frame, chunks[0]);
    self.render_list(frame, chunks[1]);
    if let Some(page) = self.query.data() {
      draw_page_bar(frame, chunks[2], &page.window(), page.total_count);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Users".to_string()
  }

  fn context(&self) -> Option<String> {
    self
      .query
      .data()
      .map(|p| format!("page {}/{}", p.current_page(), p.total_pages().max(1)))
  }

  fn tick(&mut self) {
    self.query.poll();
    self.stats.poll();
    self.poll_change();
    expire(&mut self.flash);
  }

  fn flash(&self) -> Option<&Flash> {
    self.flash.as_ref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("n/p", "page").with_priority(40),
      ShortcutInfo::new("s", "suspend").with_priority(50),
      ShortcutInfo::new("R", "role").with_priority(60),
      ShortcutInfo::new("r", "refresh").with_priority(80),
    ]
  }
}
