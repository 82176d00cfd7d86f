use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::renderfns::{draw_error, draw_placeholder, format_rating, rating_color, truncate, view_block};
use crate::ui::view::{ShortcutInfo, ShortcutProvider, View, ViewAction};
use crate::ui::views::GameDetailView;
use crate::ui::{ensure_valid_selection, warn_on_cache_error, Context};
use checkpointer::api::resources::Search;
use checkpointer::api::types::{GameSummary, SearchResults};
use checkpointer::query::Query;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState};

/// Search-as-you-type over game titles.
///
/// Every keystroke switches the query's text; repeated texts are served from
/// the cache and a blank text never reaches the network.
pub struct SearchView {
  ctx: Context,
  query: Query<String, SearchResults>,
  list_state: ListState,
  search: SearchInput,
}

impl SearchView {
  pub fn new(ctx: Context) -> Self {
    let client = ctx.client.clone();
    let query = Query::new(String::new(), move |q| {
      let client = client.clone();
      async move { client.get::<Search>(q).await }
    });

    let mut search = SearchInput::new(" Search titles ");
    search.activate();

    Self {
      ctx,
      query,
      list_state: ListState::default(),
      search,
    }
  }

  fn games(&self) -> &[GameSummary] {
    self
      .query
      .data()
      .map(|r| r.games.as_slice())
      .unwrap_or(&[])
  }

  fn set_text(&mut self, text: String) {
    if text.trim() != self.query.params().trim() {
      // The previous text's response is no longer wanted
      warn_on_cache_error("cancel", self.ctx.client.cancel::<Search>(self.query.params()));
      self.query.set_filters(text);
      self.list_state.select(Some(0));
    }
  }

  fn render_results(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.games().len();
    ensure_valid_selection(&mut self.list_state, len);

    let text = self.query.params().trim().to_string();
    let title = if self.query.is_loading() {
      format!(" Results for \"{}\" (searching...) ", text)
    } else if text.is_empty() {
      " Search ".to_string()
    } else {
      format!(" Results for \"{}\" ({}) ", text, len)
    };
    let block = view_block(title);

    if len == 0 {
      match self.query.error() {
        Some(error) => draw_error(frame, area, block, error),
        None if text.is_empty() => {
          draw_placeholder(frame, area, block, "Press / and type a title to search.")
        }
        None if self.query.is_loading() => draw_placeholder(frame, area, block, "Searching..."),
        None => draw_placeholder(frame, area, block, "No games found."),
      }
      return;
    }

    let width = area.width.saturating_sub(14) as usize;
    let items: Vec<ListItem> = self
      .games()
      .iter()
      .map(|game| {
        ListItem::new(Line::from(vec![
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
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for SearchView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(text)) | KeyResult::Event(SearchEvent::Submitted(text)) => {
        self.set_text(text);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Cancelled) => {
        let applied = self.search.applied().to_string();
        self.set_text(applied);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
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
    self.render_results(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Search".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = self.search.shortcuts();
    if !self.search.is_active() {
      shortcuts.push(ShortcutInfo::new(":", "command").with_priority(10));
    }
    shortcuts
  }
}
