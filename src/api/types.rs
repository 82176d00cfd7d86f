use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::pagination::Page;

/// Game as it appears in lists and grids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub slug: Option<String>,
  #[serde(default)]
  pub cover_url: Option<String>,
  #[serde(default)]
  pub rating: Option<f64>,
  #[serde(default)]
  pub release_year: Option<i32>,
}

/// Full game record from the detail endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub slug: Option<String>,
  #[serde(default)]
  pub summary: Option<String>,
  #[serde(default)]
  pub storyline: Option<String>,
  #[serde(default)]
  pub cover_url: Option<String>,
  #[serde(default)]
  pub rating: Option<f64>,
  #[serde(default)]
  pub rating_count: Option<u32>,
  #[serde(default)]
  pub release_year: Option<i32>,
}

impl Game {
  /// The list-row view of this game
  pub fn summary(&self) -> GameSummary {
    GameSummary {
      id: self.id,
      name: self.name.clone(),
      slug: self.slug.clone(),
      cover_url: self.cover_url.clone(),
      rating: self.rating,
      release_year: self.release_year,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
  pub id: i64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
  pub id: i64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameImage {
  pub url: String,
  #[serde(default)]
  pub image_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLink {
  pub url: String,
  #[serde(default)]
  pub category: Option<String>,
}

/// Game detail with its related collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDetail {
  pub game: Game,
  pub genres: Vec<Genre>,
  pub platforms: Vec<Platform>,
  pub keywords: Vec<Keyword>,
  pub images: Vec<GameImage>,
  pub links: Vec<GameLink>,
}

/// One page of the catalog plus the facets available for filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowseResult {
  pub page: Page<GameSummary>,
  pub years: Vec<i32>,
  pub genres: Vec<Genre>,
  pub platforms: Vec<Platform>,
  pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResults {
  pub games: Vec<GameSummary>,
}

/// A play session, either running or finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
  pub id: i64,
  pub user_id: i64,
  pub game_id: i64,
  #[serde(default)]
  pub game: Option<GameSummary>,
  pub started_at: DateTime<Utc>,
  #[serde(default)]
  pub ended_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub duration_minutes: Option<u32>,
}

/// Placeholder ids are negative so they never clash with server ids.
static NEXT_PLACEHOLDER: AtomicI64 = AtomicI64::new(-1);

impl GameSession {
  /// Local stand-in for a session that has not been confirmed by the server yet.
  pub fn placeholder(user_id: i64, draft: &SessionDraft, game: Option<GameSummary>) -> Self {
    Self {
      id: NEXT_PLACEHOLDER.fetch_sub(1, Ordering::Relaxed),
      user_id,
      game_id: draft.game_id,
      game,
      started_at: draft.started_at,
      ended_at: Some(draft.ended_at),
      duration_minutes: Some(draft.duration_minutes()),
    }
  }

  pub fn is_placeholder(&self) -> bool {
    self.id < 0
  }

  pub fn is_active(&self) -> bool {
    self.ended_at.is_none()
  }
}

/// Body for logging a finished session to history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDraft {
  pub game_id: i64,
  pub started_at: DateTime<Utc>,
  pub ended_at: DateTime<Utc>,
}

impl SessionDraft {
  pub fn duration_minutes(&self) -> u32 {
    let minutes = (self.ended_at - self.started_at).num_minutes().max(0);
    u32::try_from(minutes).unwrap_or(u32::MAX)
  }
}

/// Someone currently playing a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePlayer {
  pub user_id: i64,
  pub username: String,
  #[serde(default)]
  pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
  pub game_id: i64,
  #[serde(default)]
  pub game: Option<GameSummary>,
  #[serde(default)]
  pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistStatus {
  pub in_wishlist: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistCount {
  pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
  #[serde(default)]
  pub total_users: u64,
  #[serde(default)]
  pub total_games: u64,
  #[serde(default)]
  pub total_reviews: u64,
  #[serde(default)]
  pub total_sessions: u64,
  #[serde(default)]
  pub active_sessions: u64,
  #[serde(default)]
  pub suspended_users: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
  User,
  Admin,
}

impl UserRole {
  pub fn toggled(self) -> Self {
    match self {
      UserRole::User => UserRole::Admin,
      UserRole::Admin => UserRole::User,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      UserRole::User => "user",
      UserRole::Admin => "admin",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
  pub id: i64,
  pub username: String,
  #[serde(default)]
  pub email: Option<String>,
  pub role: UserRole,
  #[serde(default)]
  pub suspended: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReview {
  pub id: i64,
  pub user_id: i64,
  #[serde(default)]
  pub username: Option<String>,
  pub game_id: i64,
  #[serde(default)]
  pub game_name: Option<String>,
  #[serde(default)]
  pub rating: Option<f64>,
  #[serde(default)]
  pub content: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
  pub id: i64,
  pub admin_id: i64,
  #[serde(default)]
  pub admin_username: Option<String>,
  pub action: String,
  #[serde(default)]
  pub target_type: Option<String>,
  #[serde(default)]
  pub target_id: Option<i64>,
  #[serde(default)]
  pub details: Option<serde_json::Value>,
  pub created_at: DateTime<Utc>,
}

/// Success body of a mutating endpoint: either `{ message }` or the
/// updated resource itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ack {
  Message { message: String },
  Resource(serde_json::Value),
}

impl Ack {
  pub fn message(&self) -> Option<&str> {
    match self {
      Ack::Message { message } => Some(message),
      Ack::Resource(_) => None,
    }
  }
}
