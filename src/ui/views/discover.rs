use crate::ui::renderfns::{draw_error, draw_placeholder, format_rating, rating_color, truncate, view_block};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::GameDetailView;
use crate::ui::{ensure_valid_selection, warn_on_cache_error, Context};
use checkpointer::api::resources::{TopRated, Trending};
use checkpointer::api::types::GameSummary;
use checkpointer::query::Query;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState};

const LIST_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
  TopRated,
  Trending,
}

/// Top rated and trending games side by side
pub struct DiscoverView {
  ctx: Context,
  top_rated: Query<u32, Vec<GameSummary>>,
  trending: Query<u32, Vec<GameSummary>>,
  focus: Column,
  top_state: ListState,
  trending_state: ListState,
}

impl DiscoverView {
  pub fn new(ctx: Context) -> Self {
    let client = ctx.client.clone();
    let mut top_rated = Query::new(LIST_LIMIT, move |limit| {
      let client = client.clone();
      async move { client.get::<TopRated>(limit).await }
    });

    let client = ctx.client.clone();
    let mut trending = Query::new(LIST_LIMIT, move |limit| {
      let client = client.clone();
      async move { client.get::<Trending>(limit).await }
    });

    top_rated.fetch();
    trending.fetch();

    Self {
      ctx,
      top_rated,
      trending,
      focus: Column::TopRated,
      top_state: ListState::default(),
      trending_state: ListState::default(),
    }
  }

  fn focused_state(&mut self) -> &mut ListState {
    match self.focus {
      Column::TopRated => &mut self.top_state,
      Column::Trending => &mut self.trending_state,
    }
  }

  fn selected(&self) -> Option<&GameSummary> {
    let (query, state) = match self.focus {
      Column::TopRated => (&self.top_rated, &self.top_state),
      Column::Trending => (&self.trending, &self.trending_state),
    };
    state.selected().and_then(|idx| query.data()?.get(idx))
  }

  fn render_column(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    query: &Query<u32, Vec<GameSummary>>,
    state: &mut ListState,
    focused: bool,
  ) {
    let games = query.data().map(|v| v.as_slice()).unwrap_or(&[]);
    ensure_valid_selection(state, games.len());

    let border = if focused { Color::Yellow } else { Color::Blue };
    let block = view_block(format!(" {} ", title)).border_style(Style::default().fg(border));

    if games.is_empty() {
      match query.error() {
        Some(error) => draw_error(frame, area, block, error),
        None if query.is_loading() => draw_placeholder(frame, area, block, "Loading..."),
        None => draw_placeholder(frame, area, block, "Nothing here yet."),
      }
      return;
    }

    let width = area.width.saturating_sub(12) as usize;
    let items: Vec<ListItem> = games
      .iter()
      .enumerate()
      .map(|(i, game)| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:>2}. ", i + 1), Style::default().fg(Color::DarkGray)),
          Span::styled(
            format_rating(game.rating),
            Style::default().fg(rating_color(game.rating)),
          ),
          Span::raw("  "),
          Span::raw(truncate(&game.name, width)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol(if focused { "> " } else { "  " });

    frame.render_stateful_widget(list, area, state);
  }
}

impl View for DiscoverView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.focused_state().select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.focused_state().select_previous(),
      KeyCode::Char('h') | KeyCode::Left => self.focus = Column::TopRated,
      KeyCode::Char('l') | KeyCode::Right => self.focus = Column::Trending,
      KeyCode::Tab => {
        self.focus = match self.focus {
          Column::TopRated => Column::Trending,
          Column::Trending => Column::TopRated,
        }
      }
      KeyCode::Char('r') => {
        warn_on_cache_error("invalidate", self.ctx.client.invalidate::<TopRated>(&LIST_LIMIT));
        warn_on_cache_error("invalidate", self.ctx.client.invalidate::<Trending>(&LIST_LIMIT));
        self.top_rated.refetch();
        self.trending.refetch();
      }
      KeyCode::Enter => {
        if let Some(game) = self.selected().cloned() {
          return ViewAction::Push(Box::new(GameDetailView::new(
            self.ctx.clone(),
            game.id,
            Some(game),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let cols =
      Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).split(area);
    Self::render_column(
      frame,
      cols[0],
      "Top rated",
      &self.top_rated,
      &mut self.top_state,
      self.focus == Column::TopRated,
    );
    Self::render_column(
      frame,
      cols[1],
      "Trending",
      &self.trending,
      &mut self.trending_state,
      self.focus == Column::Trending,
    );
  }

  fn breadcrumb_label(&self) -> String {
    "Discover".to_string()
  }

  fn tick(&mut self) {
    self.top_rated.poll();
    self.trending.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("h/l", "column").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(80),
    ]
  }
}
