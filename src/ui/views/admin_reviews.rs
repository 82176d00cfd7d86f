use crate::ui::components::{expire, Flash};
use crate::ui::renderfns::{
  draw_error, draw_page_bar, draw_placeholder, format_rating, rating_color, truncate, view_block,
};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::{ensure_valid_selection, warn_on_cache_error, Context};
use checkpointer::api::resources::AdminReviews;
use checkpointer::api::types::AdminReview;
use checkpointer::api::PageParams;
use checkpointer::cache::SyncOutcome;
use checkpointer::pagination::{page_offset, Page};
use checkpointer::query::{Mutation, Query};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState};

/// Review moderation; requires an admin token
pub struct AdminReviewsView {
  ctx: Context,
  query: Query<PageParams, Page<AdminReview>>,
  delete_op: Mutation<i64, SyncOutcome>,
  list_state: ListState,
  flash: Option<Flash>,
}

impl AdminReviewsView {
  pub fn new(ctx: Context) -> Self {
    let client = ctx.client.clone();
    let mut query = Query::new(PageParams::first(ctx.config.admin.page_size), move |page| {
      let client = client.clone();
      async move { client.get::<AdminReviews>(page).await }
    });
    query.fetch();

    Self {
      ctx,
      query,
      delete_op: Mutation::new(),
      list_state: ListState::default(),
      flash: None,
    }
  }

  fn reviews(&self) -> &[AdminReview] {
    self
      .query
      .data()
      .map(|p| p.items.as_slice())
      .unwrap_or(&[])
  }

  fn delete_selected(&mut self) {
    let Some(review_id) = self
      .list_state
      .selected()
      .and_then(|idx| self.reviews().get(idx))
      .map(|r| r.id)
    else {
      return;
    };
    let page = *self.query.params();
    let client = self.ctx.client.clone();
    self
      .delete_op
      .run(review_id, async move { client.delete_review(page, review_id).await });
  }

  fn poll_delete(&mut self) {
    let Some((review_id, result)) = self.delete_op.poll() else {
      return;
    };
    match result {
      Ok(outcome) => {
        self.flash = Some(Flash::info(format!("Deleted review {}", review_id)));
        if outcome == SyncOutcome::RequiresRefetch {
          warn_on_cache_error(
            "invalidate",
            self.ctx.client.invalidate::<AdminReviews>(self.query.params()),
          );
        }
        // The current page was patched; a now-empty last page steps back
        let step_back = self
          .query
          .data()
          .is_some_and(|p| p.items.len() == 1 && p.offset > 0 && p.items[0].id == review_id);
        if step_back {
          self.go_to_page(-1);
        } else {
          self.query.refetch();
        }
      }
      Err(e) => self.flash = Some(Flash::error("Delete review", &e)),
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

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.reviews().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.data() {
      _ if self.query.is_loading() => " Reviews (loading...) ".to_string(),
      Some(page) => format!(" Reviews ({}) ", page.total_count),
      None => " Reviews ".to_string(),
    };
    let block = view_block(title);

    if let Some(error) = self.query.error() {
      if len == 0 || error.is_forbidden() {
        draw_error(frame, area, block, error);
        return;
      }
    }
    if len == 0 {
      draw_placeholder(frame, area, block, "No reviews to moderate.");
      return;
    }

    let pending = self.delete_op.pending().copied();
    let width = area.width.saturating_sub(50) as usize;
    let items: Vec<ListItem> = self
      .reviews()
      .iter()
      .map(|review| {
        let author = review.username.as_deref().unwrap_or("?");
        let game = review
          .game_name
          .clone()
          .unwrap_or_else(|| format!("Game {}", review.game_id));
        let content = review.content.as_deref().unwrap_or("").replace('\n', " ");
        let content_style = if pending == Some(review.id) {
          Style::default().fg(Color::DarkGray).crossed_out()
        } else {
          Style::default()
        };
        ListItem::new(Line::from(vec![
          Span::styled(
            format_rating(review.rating),
            Style::default().fg(rating_color(review.rating)),
          ),
          Span::raw("  "),
          Span::styled(format!("{:<16}", truncate(author, 16)), Style::default().fg(Color::Cyan)),
          Span::styled(format!("{:<24}", truncate(&game, 24)), Style::default().fg(Color::Yellow)),
          Span::styled(truncate(&content, width), content_style),
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

impl View for AdminReviewsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => self.go_to_page(1),
      KeyCode::Char('p') | KeyCode::Left => self.go_to_page(-1),
      KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
      KeyCode::Char('r') => {
        warn_on_cache_error(
          "invalidate",
          self.ctx.client.invalidate::<AdminReviews>(self.query.params()),
        );
        self.query.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(area);
    self.render_list(frame, chunks[0]);
    if let Some(page) = self.query.data() {
      draw_page_bar(frame, chunks[1], &page.window(), page.total_count);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Reviews".to_string()
  }

  fn context(&self) -> Option<String> {
    self
      .query
      .data()
      .map(|p| format!("page {}/{}", p.current_page(), p.total_pages().max(1)))
  }

  fn tick(&mut self) {
    self.query.poll();
    self.poll_delete();
    expire(&mut self.flash);
  }

  fn flash(&self) -> Option<&Flash> {
    self.flash.as_ref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("n/p", "page").with_priority(40),
      ShortcutInfo::new("d", "delete").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(80),
    ]
  }
}
