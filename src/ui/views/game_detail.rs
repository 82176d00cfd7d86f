use crate::ui::components::{expire, Flash};
use crate::ui::renderfns::{draw_error, format_rating, rating_color, view_block};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::{warn_on_cache_error, Context};
use checkpointer::api::resources::{ActivePlayers, GameDetail, WishlistCheck, WishlistCount};
use checkpointer::api::types::{self, ActivePlayer, GameSession, GameSummary, WishlistStatus};
use checkpointer::cache::SyncOutcome;
use checkpointer::query::{Mutation, Query};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};

/// One game with its wishlist state and who is playing it right now
pub struct GameDetailView {
  ctx: Context,
  game_id: i64,
  /// Row the view was opened from, shown until the detail arrives
  summary: Option<GameSummary>,
  detail: Query<i64, types::GameDetail>,
  wishlisted: Query<i64, WishlistStatus>,
  wish_count: Query<i64, types::WishlistCount>,
  players: Query<i64, Vec<ActivePlayer>>,
  wishlist_op: Mutation<bool, SyncOutcome>,
  session_op: Mutation<i64, GameSession>,
  flash: Option<Flash>,
}

impl GameDetailView {
  pub fn new(ctx: Context, game_id: i64, summary: Option<GameSummary>) -> Self {
    let client = ctx.client.clone();
    let mut detail = Query::new(game_id, move |id| {
      let client = client.clone();
      async move { client.get::<GameDetail>(id).await }
    });

    let client = ctx.client.clone();
    let mut wishlisted = Query::new(game_id, move |id| {
      let client = client.clone();
      async move { client.get::<WishlistCheck>(id).await }
    });

    let client = ctx.client.clone();
    let mut wish_count = Query::new(game_id, move |id| {
      let client = client.clone();
      async move { client.get::<WishlistCount>(id).await }
    });

    let client = ctx.client.clone();
    let mut players = Query::new(game_id, move |id| {
      let client = client.clone();
      async move { client.get::<ActivePlayers>(id).await }
    });

    detail.fetch();
    wishlisted.fetch();
    wish_count.fetch();
    players.fetch();

    Self {
      ctx,
      game_id,
      summary,
      detail,
      wishlisted,
      wish_count,
      players,
      wishlist_op: Mutation::new(),
      session_op: Mutation::new(),
      flash: None,
    }
  }

  fn name(&self) -> String {
    self
      .detail
      .data()
      .map(|d| d.game.name.clone())
      .or_else(|| self.summary.as_ref().map(|s| s.name.clone()))
      .unwrap_or_else(|| format!("Game {}", self.game_id))
  }

  fn toggle_wishlist(&mut self) {
    // Unknown until the check has loaded
    let Some(in_wishlist) = self.wishlisted.data().map(|s| s.in_wishlist) else {
      return;
    };
    let client = self.ctx.client.clone();

    if in_wishlist {
      let game_id = self.game_id;
      self.wishlist_op.run(false, async move {
        client.remove_from_wishlist(game_id).await
      });
    } else {
      let Some(summary) = self
        .detail
        .data()
        .map(|d| d.game.summary())
        .or_else(|| self.summary.clone())
      else {
        return;
      };
      self
        .wishlist_op
        .run(true, async move { client.add_to_wishlist(&summary).await });
    }
  }

  fn start_session(&mut self) {
    let client = self.ctx.client.clone();
    let game_id = self.game_id;
    self
      .session_op
      .run(game_id, async move { client.start_session(game_id).await });
  }

  fn refresh(&mut self) {
    let client = &self.ctx.client;
    warn_on_cache_error("invalidate", client.invalidate::<GameDetail>(&self.game_id));
    warn_on_cache_error("invalidate", client.invalidate::<WishlistCheck>(&self.game_id));
    warn_on_cache_error("invalidate", client.invalidate::<WishlistCount>(&self.game_id));
    warn_on_cache_error("invalidate", client.invalidate::<ActivePlayers>(&self.game_id));
    self.detail.refetch();
    self.wishlisted.refetch();
    self.wish_count.refetch();
    self.players.refetch();
  }

  fn poll_mutations(&mut self) {
    if let Some((added, result)) = self.wishlist_op.poll() {
      match result {
        Ok(_) => {
          let verb = if added { "Added to" } else { "Removed from" };
          self.flash = Some(Flash::info(format!("{} wishlist", verb)));
          // The check entry was patched; the count was marked stale
          self.wishlisted.refetch();
          self.wish_count.refetch();
        }
        Err(e) => self.flash = Some(Flash::error("Wishlist update", &e)),
      }
    }

    if let Some((_, result)) = self.session_op.poll() {
      match result {
        Ok(_) => {
          self.flash = Some(Flash::info(format!("Started playing {}", self.name())));
          self.players.refetch();
        }
        Err(e) => self.flash = Some(Flash::error("Start session", &e)),
      }
    }
  }

  fn status_lines(&self) -> Vec<Line<'static>> {
    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));
    let mut lines = Vec::new();

    if let Some(detail) = self.detail.data() {
      let game = &detail.game;
      let ratings = game
        .rating_count
        .map(|n| format!(" ({} ratings)", n))
        .unwrap_or_default();
      lines.push(Line::from(vec![
        label("Rating: "),
        Span::styled(
          format_rating(game.rating).trim().to_string(),
          Style::default().fg(rating_color(game.rating)),
        ),
        Span::raw(ratings),
        Span::raw("   "),
        label("Released: "),
        Span::raw(
          game
            .release_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string()),
        ),
      ]));

      let genres: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
      let platforms: Vec<&str> = detail
        .platforms
        .iter()
        .map(|p| p.abbreviation.as_deref().unwrap_or(&p.name))
        .collect();
      lines.push(Line::from(vec![label("Genres: "), Span::raw(genres.join(", "))]));
      lines.push(Line::from(vec![
        label("Platforms: "),
        Span::raw(platforms.join(", ")),
      ]));
    }

    let wishlist = match (self.wishlisted.data(), self.wishlist_op.is_pending()) {
      (_, true) => Span::styled("updating...", Style::default().fg(Color::DarkGray)),
      (Some(s), false) if s.in_wishlist => {
        Span::styled("★ in your wishlist", Style::default().fg(Color::Yellow))
      }
      (Some(_), false) => Span::raw("☆ not in your wishlist"),
      (None, false) => Span::styled("-", Style::default().fg(Color::DarkGray)),
    };
    let count = self
      .wish_count
      .data()
      .map(|c| format!("  ({} wishlisted)", c.count))
      .unwrap_or_default();
    lines.push(Line::from(vec![label("Wishlist: "), wishlist, Span::raw(count)]));

    let playing = match self.players.data() {
      Some(players) if players.is_empty() => "nobody right now".to_string(),
      Some(players) => players
        .iter()
        .map(|p| p.username.as_str())
        .collect::<Vec<_>>()
        .join(", "),
      None => "-".to_string(),
    };
    lines.push(Line::from(vec![label("Playing now: "), Span::raw(playing)]));

    lines
  }
}

impl View for GameDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('w') => self.toggle_wishlist(),
      KeyCode::Char('p') => self.start_session(),
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = if self.detail.is_loading() {
      format!(" {} (loading...) ", self.name())
    } else {
      format!(" {} ", self.name())
    };
    let block = view_block(title);

    if let Some(error) = self.detail.error() {
      if self.detail.data().is_none() {
        draw_error(frame, area, block, error);
        return;
      }
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let status = self.status_lines();
    let chunks = Layout::vertical([
      Constraint::Length(status.len() as u16),
      Constraint::Length(1),
      Constraint::Min(1),
    ])
    .split(inner);

    frame.render_widget(Paragraph::new(status), chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let mut body = Vec::new();
    if let Some(detail) = self.detail.data() {
      if let Some(summary) = &detail.game.summary {
        body.push(Line::raw(summary.clone()));
      }
      if let Some(storyline) = &detail.game.storyline {
        body.push(Line::raw(""));
        body.push(Line::raw(storyline.clone()));
      }
      if !detail.keywords.is_empty() {
        let keywords: Vec<&str> = detail.keywords.iter().map(|k| k.name.as_str()).collect();
        body.push(Line::raw(""));
        body.push(Line::styled(
          keywords.join(" · "),
          Style::default().fg(Color::DarkGray),
        ));
      }
    } else {
      body.push(Line::styled(
        "Loading game details...",
        Style::default().fg(Color::DarkGray),
      ));
    }
    frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: true }), chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    self.name()
  }

  fn tick(&mut self) {
    self.detail.poll();
    self.wishlisted.poll();
    self.wish_count.poll();
    self.players.poll();
    self.poll_mutations();
    expire(&mut self.flash);
  }

  fn flash(&self) -> Option<&Flash> {
    self.flash.as_ref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("w", "wishlist").with_priority(40),
      ShortcutInfo::new("p", "play").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(80),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
