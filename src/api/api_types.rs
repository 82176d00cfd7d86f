//! Serde-deserializable types matching Checkpointer API responses.
//!
//! These envelopes are separate from domain types so the adapters can check
//! the response shape (page sizes, counts, cursors) before anything reaches
//! the cache. A payload that deserializes but violates those invariants is
//! reported as [`FetchError::MalformedResponse`].

use serde::Deserialize;

use crate::error::FetchError;
use crate::pagination::{CursorPage, Page};

use super::cache::{BrowseParams, PageParams};
use super::types::{
  ActivePlayer, AdminReview, AdminUser, AuditLogEntry, BrowseResult, Game, GameDetail, GameImage,
  GameLink, GameSession, GameSummary, Genre, Keyword, Platform, WishlistEntry,
};

/// `{ "error": "..." }` body sent with every failure status
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub error: String,
}

// ============================================================================
// Games
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPagination {
  pub limit: u32,
  pub offset: u32,
  #[serde(default)]
  pub has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBrowseResponse {
  pub games: Vec<GameSummary>,
  pub total_count: u64,
  #[serde(default)]
  pub years: Vec<i32>,
  #[serde(default)]
  pub genres: Vec<Genre>,
  #[serde(default)]
  pub platforms: Vec<Platform>,
  pub pagination: ApiPagination,
}

#[derive(Debug, Deserialize)]
pub struct ApiGamesResponse {
  pub games: Vec<GameSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ApiGameDetailResponse {
  pub game: Game,
  #[serde(default)]
  pub genres: Vec<Genre>,
  #[serde(default)]
  pub platforms: Vec<Platform>,
  #[serde(default)]
  pub keywords: Vec<Keyword>,
  #[serde(default)]
  pub images: Vec<GameImage>,
  #[serde(default)]
  pub links: Vec<GameLink>,
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiCurrentSessionResponse {
  pub session: Option<GameSession>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSessionResponse {
  pub session: GameSession,
}

#[derive(Debug, Deserialize)]
pub struct ApiSessionsResponse {
  pub sessions: Vec<GameSession>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHistoryResponse {
  pub sessions: Vec<GameSession>,
  pub total_count: u64,
  #[serde(default)]
  pub has_more: bool,
  #[serde(default)]
  pub next_offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ApiActivePlayersResponse {
  pub players: Vec<ActivePlayer>,
}

// ============================================================================
// Wishlist
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiWishlistResponse {
  pub items: Vec<WishlistEntry>,
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUsersResponse {
  pub users: Vec<AdminUser>,
  pub total_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApiUserResponse {
  pub user: AdminUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReviewsResponse {
  pub reviews: Vec<AdminReview>,
  pub total_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAuditLogsResponse {
  pub logs: Vec<AuditLogEntry>,
  pub total_count: u64,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

fn malformed(what: &str, detail: String) -> FetchError {
  FetchError::MalformedResponse(format!("{}: {}", what, detail))
}

/// Check the invariants every page of a list must hold.
fn check_page(what: &str, len: usize, total_count: u64, limit: u32, offset: u32) -> Result<(), FetchError> {
  if len > limit as usize {
    return Err(malformed(
      what,
      format!("{} items returned for a limit of {}", len, limit),
    ));
  }
  if u64::from(offset) + len as u64 > total_count {
    return Err(malformed(
      what,
      format!(
        "totalCount {} is less than the {} items seen up to offset {}",
        total_count, len, offset
      ),
    ));
  }
  Ok(())
}

fn into_page<T>(what: &str, items: Vec<T>, total_count: u64, page: PageParams) -> Result<Page<T>, FetchError> {
  check_page(what, items.len(), total_count, page.limit, page.offset)?;
  Ok(Page {
    items,
    total_count,
    page_size: page.limit,
    offset: page.offset,
  })
}

impl ApiBrowseResponse {
  pub fn into_result(self, requested: &BrowseParams) -> Result<BrowseResult, FetchError> {
    let limit = self.pagination.limit.min(requested.limit);
    let page = into_page(
      "browse",
      self.games,
      self.total_count,
      PageParams {
        limit,
        offset: self.pagination.offset,
      },
    )?;
    Ok(BrowseResult {
      page,
      years: self.years,
      genres: self.genres,
      platforms: self.platforms,
      has_more: self.pagination.has_more,
    })
  }
}

impl ApiGamesResponse {
  /// Top-rated and trending lists must respect the requested limit.
  pub fn into_limited(self, what: &str, limit: u32) -> Result<Vec<GameSummary>, FetchError> {
    if self.games.len() > limit as usize {
      return Err(malformed(
        what,
        format!("{} games returned for a limit of {}", self.games.len(), limit),
      ));
    }
    Ok(self.games)
  }
}

impl From<ApiGameDetailResponse> for GameDetail {
  fn from(response: ApiGameDetailResponse) -> Self {
    GameDetail {
      game: response.game,
      genres: response.genres,
      platforms: response.platforms,
      keywords: response.keywords,
      images: response.images,
      links: response.links,
    }
  }
}

impl ApiHistoryResponse {
  pub fn into_cursor_page(self, page: PageParams) -> Result<CursorPage<GameSession>, FetchError> {
    check_page(
      "session history",
      self.sessions.len(),
      self.total_count,
      page.limit,
      page.offset,
    )?;

    let next_offset = if self.has_more { self.next_offset } else { None };
    match next_offset {
      Some(next) if next <= page.offset => {
        return Err(malformed(
          "session history",
          format!("nextOffset {} does not advance past {}", next, page.offset),
        ));
      }
      None if self.has_more => {
        return Err(malformed(
          "session history",
          "hasMore without a nextOffset".to_string(),
        ));
      }
      _ => {}
    }

    Ok(CursorPage {
      items: self.sessions,
      total_count: self.total_count,
      has_more: next_offset.is_some(),
      next_offset,
    })
  }
}

impl ApiUsersResponse {
  pub fn into_page(self, page: PageParams) -> Result<Page<AdminUser>, FetchError> {
    into_page("admin users", self.users, self.total_count, page)
  }
}

impl ApiReviewsResponse {
  pub fn into_page(self, page: PageParams) -> Result<Page<AdminReview>, FetchError> {
    into_page("admin reviews", self.reviews, self.total_count, page)
  }
}

impl ApiAuditLogsResponse {
  pub fn into_page(self, page: PageParams) -> Result<Page<AuditLogEntry>, FetchError> {
    into_page("audit logs", self.logs, self.total_count, page)
  }
}
