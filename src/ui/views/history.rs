use crate::ui::components::{expire, Flash};
use crate::ui::renderfns::{
  draw_error, draw_placeholder, format_date, format_duration, truncate, view_block,
};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::GameDetailView;
use crate::ui::{ensure_valid_selection, warn_on_cache_error, Context};
use checkpointer::api::resources::{CurrentSession, SessionHistory};
use checkpointer::api::types::{GameSession, SessionDraft};
use checkpointer::api::{HistoryParams, PageParams};
use checkpointer::cache::MutationIntent;
use checkpointer::error::FetchError;
use checkpointer::query::{InfiniteQuery, InfiniteStatus, Mutation, Query};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState, Paragraph};

/// Current session plus the play history, loaded page by page
pub struct HistoryView {
  ctx: Context,
  user_id: Option<i64>,
  current: Query<(), Option<GameSession>>,
  history: InfiniteQuery<GameSession>,
  /// Tagged with the placeholder id shown while the session is logged
  end_op: Mutation<i64, GameSession>,
  list_state: ListState,
  flash: Option<Flash>,
}

impl HistoryView {
  pub fn new(ctx: Context) -> Self {
    let user_id = ctx.config.user_id;
    let limit = ctx.config.history.page_size;

    let client = ctx.client.clone();
    let mut current = Query::new((), move |_| {
      let client = client.clone();
      async move { client.get::<CurrentSession>(()).await }
    });
    current.fetch();

    let client = ctx.client.clone();
    let mut history = InfiniteQuery::new(move |offset| {
      let client = client.clone();
      async move {
        match user_id {
          Some(user_id) => {
            let params = HistoryParams {
              user_id,
              page: PageParams { limit, offset },
            };
            client.get::<SessionHistory>(params).await
          }
          None => Err(FetchError::InvalidParams("no user_id configured".to_string())),
        }
      }
    });
    if user_id.is_some() {
      history.fetch();
    }

    Self {
      ctx,
      user_id,
      current,
      history,
      end_op: Mutation::new(),
      list_state: ListState::default(),
      flash: None,
    }
  }

  fn first_page(&self, user_id: i64) -> HistoryParams {
    HistoryParams {
      user_id,
      page: PageParams::first(self.ctx.config.history.page_size),
    }
  }

  /// End the running session and log it, showing it in the history at once.
  fn end_current(&mut self) {
    let Some(user_id) = self.user_id else {
      self.flash = Some(Flash::info("Set user_id in the config to log sessions"));
      return;
    };
    let Some(session) = self.current.data().cloned().flatten() else {
      return;
    };
    if self.end_op.is_pending() {
      return;
    }

    let draft = SessionDraft {
      game_id: session.game_id,
      started_at: session.started_at,
      ended_at: Utc::now(),
    };
    let placeholder = GameSession::placeholder(user_id, &draft, session.game.clone());
    self.history.apply(&MutationIntent::Create {
      item: placeholder.clone(),
    });
    self.list_state.select(Some(0));

    let client = self.ctx.client.clone();
    let params = self.first_page(user_id);
    self.end_op.run(placeholder.id, async move {
      client.end_session().await?;
      client.log_session(params, &placeholder, &draft).await
    });
  }

  fn poll_end(&mut self) {
    let Some((placeholder_id, result)) = self.end_op.poll() else {
      return;
    };
    let placeholder_id = placeholder_id.to_string();
    match result {
      Ok(canonical) => {
        let minutes = canonical.duration_minutes.unwrap_or_default();
        self.history.apply(&MutationIntent::Confirm {
          placeholder_id,
          canonical,
        });
        self.flash = Some(Flash::info(format!(
          "Logged {} of play",
          format_duration(minutes)
        )));
      }
      Err(e) => {
        self
          .history
          .apply(&MutationIntent::<GameSession>::Delete { id: placeholder_id });
        self.flash = Some(Flash::error("End session", &e));
      }
    }
    // The cached current session was cleared (or is still running)
    self.current.refetch();
  }

  fn refresh(&mut self) {
    let client = &self.ctx.client;
    warn_on_cache_error("invalidate", client.invalidate::<CurrentSession>(&()));
    if let Some(user_id) = self.user_id {
      // Later pages shifted too; none of them may be served from the cache
      warn_on_cache_error(
        "invalidate",
        client.invalidate_entity::<SessionHistory>(&self.first_page(user_id)),
      );
      self.history.refetch();
    }
    self.current.refetch();
  }

  fn sessions(&self) -> Vec<&GameSession> {
    self.history.items().collect()
  }

  fn render_current(&self, frame: &mut Frame, area: Rect) {
    let block = view_block(" Now playing ".to_string());
    let line = match self.current.data() {
      Some(Some(session)) => {
        let name = session
          .game
          .as_ref()
          .map(|g| g.name.clone())
          .unwrap_or_else(|| format!("Game {}", session.game_id));
        let minutes = (Utc::now() - session.started_at).num_minutes().max(0) as u32;
        Line::from(vec![
          Span::styled(name, Style::default().fg(Color::Cyan).bold()),
          Span::raw(format!("  for {}", format_duration(minutes))),
          Span::styled("  (e to end)", Style::default().fg(Color::DarkGray)),
        ])
      }
      Some(None) => Line::styled("No session running", Style::default().fg(Color::DarkGray)),
      None => match self.current.error() {
        Some(e) => Line::styled(e.to_string(), Style::default().fg(Color::Red)),
        None => Line::styled("Loading...", Style::default().fg(Color::DarkGray)),
      },
    };
    frame.render_widget(Paragraph::new(line).block(block), area);
  }

  fn render_history(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.history.items().count();
    ensure_valid_selection(&mut self.list_state, len);

    let total = self.history.pages().total_count();
    let title = match self.history.status() {
      InfiniteStatus::LoadingFirst => " History (loading...) ".to_string(),
      InfiniteStatus::LoadingMore => format!(" History ({} of {}, loading more...) ", len, total),
      _ => format!(" History ({} of {}) ", len, total),
    };
    let block = view_block(title);

    if self.user_id.is_none() {
      draw_placeholder(
        frame,
        area,
        block,
        "Set user_id in the config file to see your play history.",
      );
      return;
    }

    if len == 0 {
      match self.history.error() {
        Some(error) => draw_error(frame, area, block, error),
        None if self.history.is_loading() => draw_placeholder(frame, area, block, "Loading..."),
        None => draw_placeholder(frame, area, block, "No sessions logged yet."),
      }
      return;
    }

    let mut items: Vec<ListItem> = self
      .sessions()
      .into_iter()
      .map(|session| {
        let name = session
          .game
          .as_ref()
          .map(|g| g.name.clone())
          .unwrap_or_else(|| format!("Game {}", session.game_id));
        let duration = session
          .duration_minutes
          .map(format_duration)
          .unwrap_or_else(|| "-".to_string());
        let name_style = if session.is_placeholder() {
          Style::default().fg(Color::DarkGray).italic()
        } else {
          Style::default()
        };
        ListItem::new(Line::from(vec![
          Span::styled(
            format_date(&session.started_at),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw("  "),
          Span::styled(format!("{:>8}", duration), Style::default().fg(Color::Yellow)),
          Span::raw("  "),
          Span::styled(truncate(&name, 50), name_style),
        ]))
      })
      .collect();

    if self.history.has_next_page() {
      items.push(ListItem::new(Line::styled(
        "  ... press m to load more",
        Style::default().fg(Color::DarkGray),
      )));
    } else if let Some(error) = self.history.error() {
      items.push(ListItem::new(Line::styled(
        format!("  {}", error),
        Style::default().fg(Color::Red),
      )));
    }

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
}

impl View for HistoryView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('m') => self.history.fetch_next_page(),
      KeyCode::Char('e') => self.end_current(),
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Enter => {
        let selected = self
          .list_state
          .selected()
          .and_then(|idx| self.sessions().get(idx).map(|s| (s.game_id, s.game.clone())));
        if let Some((game_id, game)) = selected {
          return ViewAction::Push(Box::new(GameDetailView::new(self.ctx.clone(), game_id, game)));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::vertical([Constraint::Length(3), Constraint::Min(3)]).split(area);
    self.render_current(frame, chunks[0]);
    self.render_history(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "History".to_string()
  }

  fn context(&self) -> Option<String> {
    self.user_id.map(|id| format!("user {}", id))
  }

  fn tick(&mut self) {
    self.current.poll();
    self.history.poll();
    self.poll_end();
    expire(&mut self.flash);
  }

  fn flash(&self) -> Option<&Flash> {
    self.flash.as_ref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("m", "load more").with_priority(40),
      ShortcutInfo::new("e", "end session").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(80),
    ]
  }
}
