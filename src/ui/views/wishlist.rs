use crate::ui::components::{expire, Flash};
use crate::ui::renderfns::{
  draw_error, draw_placeholder, format_date, format_rating, rating_color, truncate, view_block,
};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::GameDetailView;
use crate::ui::{ensure_valid_selection, warn_on_cache_error, Context};
use checkpointer::api::resources::Wishlist;
use checkpointer::api::types::WishlistEntry;
use checkpointer::cache::SyncOutcome;
use checkpointer::query::{Mutation, Query};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState};

pub struct WishlistView {
  ctx: Context,
  query: Query<(), Vec<WishlistEntry>>,
  remove_op: Mutation<i64, SyncOutcome>,
  list_state: ListState,
  flash: Option<Flash>,
}

impl WishlistView {
  pub fn new(ctx: Context) -> Self {
    let client = ctx.client.clone();
    let mut query = Query::new((), move |_| {
      let client = client.clone();
      async move { client.get::<Wishlist>(()).await }
    });
    query.fetch();

    Self {
      ctx,
      query,
      remove_op: Mutation::new(),
      list_state: ListState::default(),
      flash: None,
    }
  }

  fn entries(&self) -> &[WishlistEntry] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&WishlistEntry> {
    self
      .list_state
      .selected()
      .and_then(|idx| self.entries().get(idx))
  }

  fn remove_selected(&mut self) {
    let Some(game_id) = self.selected().map(|e| e.game_id) else {
      return;
    };
    let client = self.ctx.client.clone();
    self
      .remove_op
      .run(game_id, async move { client.remove_from_wishlist(game_id).await });
  }

  fn poll_remove(&mut self) {
    let Some((game_id, result)) = self.remove_op.poll() else {
      return;
    };
    match result {
      Ok(outcome) => {
        if outcome == SyncOutcome::RequiresRefetch {
          warn_on_cache_error("invalidate", self.ctx.client.invalidate::<Wishlist>(&()));
        }
        let name = self
          .entries()
          .iter()
          .find(|e| e.game_id == game_id)
          .and_then(|e| e.game.as_ref())
          .map(|g| g.name.clone())
          .unwrap_or_else(|| format!("Game {}", game_id));
        self.flash = Some(Flash::info(format!("Removed {} from wishlist", name)));
        // Served from the patched cache entry
        self.query.refetch();
      }
      Err(e) => self.flash = Some(Flash::error("Remove from wishlist", &e)),
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.entries().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = if self.query.is_loading() {
      " Wishlist (loading...) ".to_string()
    } else {
      format!(" Wishlist ({}) ", len)
    };
    let block = view_block(title);

    if len == 0 {
      match self.query.error() {
        Some(error) => draw_error(frame, area, block, error),
        None if self.query.is_loading() => draw_placeholder(frame, area, block, "Loading..."),
        None => draw_placeholder(
          frame,
          area,
          block,
          "Your wishlist is empty. Press w on a game to add it.",
        ),
      }
      return;
    }

    let pending = self.remove_op.pending().copied();
    let items: Vec<ListItem> = self
      .entries()
      .iter()
      .map(|entry| {
        let (name, rating) = match &entry.game {
          Some(game) => (game.name.clone(), game.rating),
          None => (format!("Game {}", entry.game_id), None),
        };
        let added = entry.added_at.as_ref().map(format_date).unwrap_or_default();
        let name_style = if pending == Some(entry.game_id) {
          Style::default().fg(Color::DarkGray).crossed_out()
        } else {
          Style::default()
        };
        ListItem::new(Line::from(vec![
          Span::styled(format_rating(rating), Style::default().fg(rating_color(rating))),
          Span::raw("  "),
          Span::styled(format!("{:<50}", truncate(&name, 50)), name_style),
          Span::styled(added, Style::default().fg(Color::DarkGray)),
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

impl View for WishlistView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('d') | KeyCode::Delete => self.remove_selected(),
      KeyCode::Char('r') => {
        warn_on_cache_error("invalidate", self.ctx.client.invalidate::<Wishlist>(&()));
        self.query.refetch();
      }
      KeyCode::Enter => {
        if let Some(entry) = self.selected() {
          let view = GameDetailView::new(self.ctx.clone(), entry.game_id, entry.game.clone());
          return ViewAction::Push(Box::new(view));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Wishlist".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.poll_remove();
    expire(&mut self.flash);
  }

  fn flash(&self) -> Option<&Flash> {
    self.flash.as_ref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("d", "remove").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(80),
    ]
  }
}
