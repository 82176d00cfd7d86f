use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::renderfns::{
  draw_error, draw_page_bar, draw_placeholder, format_rating, rating_color, truncate, view_block,
};
use crate::ui::view::{ShortcutInfo, ShortcutProvider, View, ViewAction};
use crate::ui::views::GameDetailView;
use crate::ui::{cycle_option, ensure_valid_selection, warn_on_cache_error, Context};
use checkpointer::api::resources::Browse;
use checkpointer::api::types::{BrowseResult, GameSummary, Genre};
use checkpointer::api::BrowseParams;
use checkpointer::pagination::page_offset;
use checkpointer::query::{Query, QueryState};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState};
use tracing::debug;

/// Paginated, filterable catalog
pub struct BrowseView {
  ctx: Context,
  query: Query<BrowseParams, BrowseResult>,
  list_state: ListState,
  search: SearchInput,
  // Facets from the last loaded page; a filter change clears the data
  years: Vec<i32>,
  genres: Vec<String>,
}

impl BrowseView {
  pub fn new(ctx: Context) -> Self {
    let params = BrowseParams {
      limit: ctx.config.browse.page_size,
      ..BrowseParams::default()
    };

    let client = ctx.client.clone();
    let mut query = Query::new(params, move |params| {
      let client = client.clone();
      async move { client.get::<Browse>(params).await }
    });
    query.fetch();

    Self {
      ctx,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(" Filter catalog "),
      years: Vec::new(),
      genres: Vec::new(),
    }
  }

  fn games(&self) -> &[GameSummary] {
    self
      .query
      .data()
      .map(|r| r.page.items.as_slice())
      .unwrap_or(&[])
  }

  /// Apply new params: a page move keeps the old page on screen, a filter change does not.
  fn apply(&mut self, params: BrowseParams) {
    if params == *self.query.params() {
      return;
    }
    if params.same_filters(self.query.params()) {
      self.query.set_page(params);
    } else {
      debug!(q = ?params.text(), sort = params.sort_by.as_str(), "Browse filters changed");
      self.query.set_filters(BrowseParams { offset: 0, ..params });
    }
    self.list_state.select(Some(0));
  }

  fn update_filters(&mut self, f: impl FnOnce(&mut BrowseParams)) {
    let mut params = self.query.params().clone();
    f(&mut params);
    self.apply(params);
  }

  fn go_to_page(&mut self, delta: i64) {
    let Some(result) = self.query.data() else {
      return;
    };
    if let Some(page) = result.page.window().step(delta) {
      let mut params = self.query.params().clone();
      params.offset = page_offset(page, params.limit);
      self.apply(params);
    }
  }

  fn refresh(&mut self) {
    // Marking the entry stale makes the read go to the network
    warn_on_cache_error("invalidate", self.ctx.client.invalidate::<Browse>(self.query.params()));
    self.query.refetch();
  }

  fn title(&self) -> String {
    let result = self.query.data();
    match self.query.state() {
      QueryState::Loading { .. } => " Catalog (loading...) ".to_string(),
      _ => match result {
        Some(r) => format!(" Catalog ({} games) ", r.page.total_count),
        None => " Catalog ".to_string(),
      },
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.games().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = view_block(self.title());

    if let Some(error) = self.query.error() {
      if len == 0 {
        draw_error(frame, area, block, error);
        return;
      }
    }

    if len == 0 {
      let text = if self.query.is_loading() {
        "Loading catalog..."
      } else {
        "No games match these filters. Press 'c' to clear them."
      };
      draw_placeholder(frame, area, block, text);
      return;
    }

    let name_width = area.width.saturating_sub(20) as usize;
    let items: Vec<ListItem> = self
      .games()
      .iter()
      .map(|game| {
        let year = game
          .release_year
          .map(|y| y.to_string())
          .unwrap_or_default();
        ListItem::new(Line::from(vec![
          Span::styled(
            format_rating(game.rating),
            Style::default().fg(rating_color(game.rating)),
          ),
          Span::raw("  "),
          Span::raw(format!(
            "{:<width$}",
            truncate(&game.name, name_width),
            width = name_width
          )),
          Span::styled(year, Style::default().fg(Color::DarkGray)),
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
}

impl View for BrowseView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Submitted(text)) => {
        self.update_filters(|p| p.q = (!text.is_empty()).then_some(text));
        return ViewAction::None;
      }
      KeyResult::Event(_) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => self.go_to_page(1),
      KeyCode::Char('p') | KeyCode::Left => self.go_to_page(-1),
      KeyCode::Char('s') => self.update_filters(|p| p.sort_by = p.sort_by.next()),
      KeyCode::Char('o') => self.update_filters(|p| p.sort_order = p.sort_order.toggled()),
      KeyCode::Char('y') => {
        let year = cycle_option(&self.years, self.query.params().year.as_ref());
        self.update_filters(|p| p.year = year);
      }
      KeyCode::Char('f') => {
        let genre = cycle_option(&self.genres, self.query.params().genre.as_ref());
        self.update_filters(|p| p.genre = genre);
      }
      KeyCode::Char('c') => {
        self.search.reset();
        let limit = self.query.params().limit;
        self.apply(BrowseParams {
          limit,
          ..BrowseParams::default()
        });
      }
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Enter => {
        let selected = self
          .list_state
          .selected()
          .and_then(|idx| self.games().get(idx))
          .cloned();
        if let Some(game) = selected {
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
    let chunks = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(area);
    self.render_list(frame, chunks[0]);

    if let Some(result) = self.query.data() {
      draw_page_bar(frame, chunks[1], &result.page.window(), result.page.total_count);
    }

    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Catalog".to_string()
  }

  fn context(&self) -> Option<String> {
    let p = self.query.params();
    let mut parts = vec![format!("{} {}", p.sort_by.as_str(), p.sort_order.as_str())];
    if let Some(q) = p.text() {
      parts.push(format!("\"{}\"", q));
    }
    if let Some(year) = p.year {
      parts.push(year.to_string());
    }
    if let Some(genre) = &p.genre {
      parts.push(genre.clone());
    }
    Some(parts.join(" · "))
  }

  fn tick(&mut self) {
    if self.query.poll() {
      if let Some(result) = self.query.data() {
        self.years = result.years.clone();
        self.genres = result.genres.iter().map(|g: &Genre| g.name.clone()).collect();
      }
    }
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = self.search.shortcuts();
    if !self.search.is_active() {
      shortcuts.extend([
        ShortcutInfo::new(":", "command").with_priority(10),
        ShortcutInfo::new("n/p", "page").with_priority(40),
        ShortcutInfo::new("s/o", "sort").with_priority(50),
        ShortcutInfo::new("y/f", "year/genre").with_priority(60),
        ShortcutInfo::new("c", "clear").with_priority(70),
        ShortcutInfo::new("r", "refresh").with_priority(80),
      ]);
    }
    shortcuts
  }
}
