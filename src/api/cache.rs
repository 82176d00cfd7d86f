//! Caching implementations for Checkpointer types.

use crate::cache::{Cacheable, KeyBuilder, KeyError, QueryKey};

use super::types::{
  ActivePlayer, AdminReview, AdminUser, AuditLogEntry, GameSession, GameSummary, WishlistEntry,
};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for GameSummary {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "game"
  }
}

impl Cacheable for GameSession {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "game_session"
  }
}

impl Cacheable for ActivePlayer {
  fn cache_key(&self) -> String {
    self.user_id.to_string()
  }

  fn entity_type() -> &'static str {
    "active_player"
  }
}

impl Cacheable for WishlistEntry {
  // One entry per game, so the game id is the identity.
  fn cache_key(&self) -> String {
    self.game_id.to_string()
  }

  fn entity_type() -> &'static str {
    "wishlist_entry"
  }
}

impl Cacheable for AdminUser {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "admin_user"
  }
}

impl Cacheable for AdminReview {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "admin_review"
  }
}

impl Cacheable for AuditLogEntry {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "audit_log"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// Sort field accepted by the browse endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
  #[default]
  Rating,
  Year,
  Name,
}

impl SortBy {
  pub fn as_str(self) -> &'static str {
    match self {
      SortBy::Rating => "rating",
      SortBy::Year => "year",
      SortBy::Name => "name",
    }
  }

  pub fn next(self) -> Self {
    match self {
      SortBy::Rating => SortBy::Year,
      SortBy::Year => SortBy::Name,
      SortBy::Name => SortBy::Rating,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortOrder {
  pub fn as_str(self) -> &'static str {
    match self {
      SortOrder::Asc => "asc",
      SortOrder::Desc => "desc",
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      SortOrder::Asc => SortOrder::Desc,
      SortOrder::Desc => SortOrder::Asc,
    }
  }
}

/// Catalog browse filters. `limit`/`offset` select the page; the rest is the filter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseParams {
  pub q: Option<String>,
  pub sort_by: SortBy,
  pub sort_order: SortOrder,
  pub year: Option<i32>,
  pub genre: Option<String>,
  pub platform: Option<String>,
  pub limit: u32,
  pub offset: u32,
}

impl Default for BrowseParams {
  fn default() -> Self {
    Self {
      q: None,
      sort_by: SortBy::default(),
      sort_order: SortOrder::default(),
      year: None,
      genre: None,
      platform: None,
      limit: 24,
      offset: 0,
    }
  }
}

impl BrowseParams {
  /// Whether `other` differs only in its page position.
  pub fn same_filters(&self, other: &BrowseParams) -> bool {
    self.text() == other.text()
      && self.sort_by == other.sort_by
      && self.sort_order == other.sort_order
      && self.year == other.year
      && self.genre == other.genre
      && self.platform == other.platform
      && self.limit == other.limit
  }

  /// Free-text filter with surrounding whitespace removed; blank counts as absent.
  pub fn text(&self) -> Option<String> {
    self
      .q
      .as_deref()
      .map(str::trim)
      .filter(|q| !q.is_empty())
      .map(str::to_string)
  }

  /// Query-string pairs in the server's parameter names; absent filters are omitted.
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(q) = self.text() {
      pairs.push(("q", q));
    }
    pairs.push(("sortBy", self.sort_by.as_str().to_string()));
    pairs.push(("sortOrder", self.sort_order.as_str().to_string()));
    if let Some(year) = self.year {
      pairs.push(("year", year.to_string()));
    }
    if let Some(genre) = &self.genre {
      pairs.push(("genre", genre.clone()));
    }
    if let Some(platform) = &self.platform {
      pairs.push(("platform", platform.clone()));
    }
    pairs.push(("limit", self.limit.to_string()));
    pairs.push(("offset", self.offset.to_string()));
    pairs
  }
}

/// `limit`/`offset` window for admin listings and session history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
  pub limit: u32,
  pub offset: u32,
}

impl PageParams {
  pub fn first(limit: u32) -> Self {
    Self { limit, offset: 0 }
  }
}

/// Query key types for Checkpointer API calls.
#[derive(Clone, Debug)]
pub enum ApiQueryKey {
  Browse(BrowseParams),
  Search { q: String },
  GameDetail { id: i64 },
  TopRated { limit: u32 },
  Trending { limit: u32 },
  CurrentSession,
  UserSessions { user_id: i64 },
  SessionHistory { user_id: i64, page: PageParams },
  ActivePlayers { game_id: i64 },
  Wishlist,
  WishlistCheck { game_id: i64 },
  WishlistCount { game_id: i64 },
  AdminStats,
  AdminUsers(PageParams),
  AdminReviews(PageParams),
  AuditLogs(PageParams),
}

impl ApiQueryKey {
  /// Entity name; mutations stale every key sharing it.
  pub fn entity(&self) -> &'static str {
    match self {
      Self::Browse(_) => "games-browse",
      Self::Search { .. } => "games-search",
      Self::GameDetail { .. } => "game",
      Self::TopRated { .. } => "games-top-rated",
      Self::Trending { .. } => "games-trending",
      Self::CurrentSession => "session-current",
      Self::UserSessions { .. } => "sessions-user",
      Self::SessionHistory { .. } => "play-history",
      Self::ActivePlayers { .. } => "active-players",
      Self::Wishlist => "wishlist",
      Self::WishlistCheck { .. } => "wishlist-check",
      Self::WishlistCount { .. } => "wishlist-count",
      Self::AdminStats => "admin-stats",
      Self::AdminUsers(_) => "admin-users",
      Self::AdminReviews(_) => "admin-reviews",
      Self::AuditLogs(_) => "admin-audit-logs",
    }
  }

  pub fn to_key(&self) -> Result<QueryKey, KeyError> {
    let builder = KeyBuilder::new(self.entity());
    let builder = match self {
      Self::Browse(p) => builder
        .param("q", p.text())
        .param("sortBy", p.sort_by.as_str())
        .param("sortOrder", p.sort_order.as_str())
        .param("year", p.year)
        .param("genre", p.genre.clone())
        .param("platform", p.platform.clone())
        .param("limit", p.limit)
        .param("offset", p.offset),
      Self::Search { q } => builder.param("q", normalize_query(q)),
      Self::GameDetail { id } => builder.param("id", *id),
      Self::TopRated { limit } | Self::Trending { limit } => builder.param("limit", *limit),
      Self::CurrentSession | Self::Wishlist | Self::AdminStats => builder,
      Self::UserSessions { user_id } => builder.param("userId", *user_id),
      Self::SessionHistory { user_id, page } => builder
        .param("userId", *user_id)
        .param("limit", page.limit)
        .param("offset", page.offset),
      Self::ActivePlayers { game_id }
      | Self::WishlistCheck { game_id }
      | Self::WishlistCount { game_id } => builder.param("gameId", *game_id),
      Self::AdminUsers(page) | Self::AdminReviews(page) | Self::AuditLogs(page) => builder
        .param("limit", page.limit)
        .param("offset", page.offset),
    };
    builder.build()
  }
}

/// Free text as it is sent: surrounding whitespace is never part of a request.
fn normalize_query(q: &str) -> String {
  q.trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_absent_filters_match_defaults() {
    let a = ApiQueryKey::Browse(BrowseParams::default()).to_key().unwrap();
    let b = ApiQueryKey::Browse(BrowseParams {
      genre: None,
      ..BrowseParams::default()
    })
    .to_key()
    .unwrap();
    assert_eq!(a, b);
    assert!(!a.canonical().contains("genre"));
  }

  #[test]
  fn test_offset_produces_distinct_key() {
    let first = ApiQueryKey::Browse(BrowseParams::default()).to_key().unwrap();
    let second = ApiQueryKey::Browse(BrowseParams {
      offset: 24,
      ..BrowseParams::default()
    })
    .to_key()
    .unwrap();
    assert_ne!(first, second);
    assert_eq!(first.entity(), second.entity());
  }

  #[test]
  fn test_search_key_ignores_padding_but_not_case() {
    let padded = ApiQueryKey::Search { q: " Zelda ".to_string() }.to_key().unwrap();
    let exact = ApiQueryKey::Search { q: "Zelda".to_string() }.to_key().unwrap();
    let lower = ApiQueryKey::Search { q: "zelda".to_string() }.to_key().unwrap();
    assert_eq!(padded, exact);
    assert_ne!(exact, lower);
  }

  #[test]
  fn test_admin_listings_do_not_collide() {
    let page = PageParams::first(20);
    let users = ApiQueryKey::AdminUsers(page).to_key().unwrap();
    let reviews = ApiQueryKey::AdminReviews(page).to_key().unwrap();
    assert_ne!(users, reviews);
  }

  #[test]
  fn test_same_filters_ignores_offset() {
    let a = BrowseParams::default();
    let b = BrowseParams {
      offset: 48,
      ..BrowseParams::default()
    };
    let c = BrowseParams {
      sort_by: SortBy::Name,
      ..BrowseParams::default()
    };
    assert!(a.same_filters(&b));
    assert!(!a.same_filters(&c));
  }

  #[test]
  fn test_query_pairs_skip_blank_text() {
    let params = BrowseParams {
      q: Some("   ".to_string()),
      year: Some(1998),
      ..BrowseParams::default()
    };
    let pairs = params.query_pairs();
    assert!(pairs.iter().all(|(name, _)| *name != "q"));
    assert!(pairs.contains(&("year", "1998".to_string())));
    assert!(pairs.contains(&("sortBy", "rating".to_string())));
  }
}
