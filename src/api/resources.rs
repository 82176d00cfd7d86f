//! One [`Resource`] per cacheable endpoint: how its key is derived and how
//! it is fetched.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{de::DeserializeOwned, Serialize};

use crate::cache::QueryKey;
use crate::error::FetchError;
use crate::pagination::{CursorPage, Page};

use super::cache::{ApiQueryKey, BrowseParams, PageParams};
use super::client::ApiClient;
use super::types::{self, ActivePlayer, AdminReview, AdminUser, AuditLogEntry, GameSession, GameSummary};

/// A fetchable, cacheable endpoint.
pub trait Resource {
  type Params: Clone + Send + Sync + 'static;
  type Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

  fn key(params: &Self::Params) -> Result<QueryKey, FetchError>;

  fn fetch(client: ApiClient, params: Self::Params) -> BoxFuture<'static, Result<Self::Output, FetchError>>;
}

/// Catalog page with filters
pub struct Browse;

impl Resource for Browse {
  type Params = BrowseParams;
  type Output = types::BrowseResult;

  fn key(params: &BrowseParams) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::Browse(params.clone()).to_key()?)
  }

  fn fetch(client: ApiClient, params: BrowseParams) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.browse_games(&params).await }.boxed()
  }
}

pub struct Search;

impl Resource for Search {
  type Params = String;
  type Output = types::SearchResults;

  fn key(q: &String) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::Search { q: q.clone() }.to_key()?)
  }

  fn fetch(client: ApiClient, q: String) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.search_games(&q).await }.boxed()
  }
}

pub struct GameDetail;

impl Resource for GameDetail {
  type Params = i64;
  type Output = types::GameDetail;

  fn key(id: &i64) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::GameDetail { id: *id }.to_key()?)
  }

  fn fetch(client: ApiClient, id: i64) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.get_game(id).await }.boxed()
  }
}

pub struct TopRated;

impl Resource for TopRated {
  type Params = u32;
  type Output = Vec<GameSummary>;

  fn key(limit: &u32) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::TopRated { limit: *limit }.to_key()?)
  }

  fn fetch(client: ApiClient, limit: u32) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.top_rated(limit).await }.boxed()
  }
}

pub struct Trending;

impl Resource for Trending {
  type Params = u32;
  type Output = Vec<GameSummary>;

  fn key(limit: &u32) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::Trending { limit: *limit }.to_key()?)
  }

  fn fetch(client: ApiClient, limit: u32) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.trending(limit).await }.boxed()
  }
}

pub struct CurrentSession;

impl Resource for CurrentSession {
  type Params = ();
  type Output = Option<GameSession>;

  fn key(_: &()) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::CurrentSession.to_key()?)
  }

  fn fetch(client: ApiClient, _: ()) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.current_session().await }.boxed()
  }
}

pub struct UserSessions;

impl Resource for UserSessions {
  type Params = i64;
  type Output = Vec<GameSession>;

  fn key(user_id: &i64) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::UserSessions { user_id: *user_id }.to_key()?)
  }

  fn fetch(client: ApiClient, user_id: i64) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.user_sessions(user_id).await }.boxed()
  }
}

/// Parameters of one session-history cursor page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryParams {
  pub user_id: i64,
  pub page: PageParams,
}

pub struct SessionHistory;

impl Resource for SessionHistory {
  type Params = HistoryParams;
  type Output = CursorPage<GameSession>;

  fn key(params: &HistoryParams) -> Result<QueryKey, FetchError> {
    Ok(
      ApiQueryKey::SessionHistory {
        user_id: params.user_id,
        page: params.page,
      }
      .to_key()?,
    )
  }

  fn fetch(client: ApiClient, params: HistoryParams) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.session_history(params.user_id, params.page).await }.boxed()
  }
}

pub struct ActivePlayers;

impl Resource for ActivePlayers {
  type Params = i64;
  type Output = Vec<ActivePlayer>;

  fn key(game_id: &i64) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::ActivePlayers { game_id: *game_id }.to_key()?)
  }

  fn fetch(client: ApiClient, game_id: i64) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.active_players(game_id).await }.boxed()
  }
}

pub struct Wishlist;

impl Resource for Wishlist {
  type Params = ();
  type Output = Vec<types::WishlistEntry>;

  fn key(_: &()) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::Wishlist.to_key()?)
  }

  fn fetch(client: ApiClient, _: ()) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.wishlist().await }.boxed()
  }
}

pub struct WishlistCheck;

impl Resource for WishlistCheck {
  type Params = i64;
  type Output = types::WishlistStatus;

  fn key(game_id: &i64) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::WishlistCheck { game_id: *game_id }.to_key()?)
  }

  fn fetch(client: ApiClient, game_id: i64) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.wishlist_check(game_id).await }.boxed()
  }
}

pub struct WishlistCount;

impl Resource for WishlistCount {
  type Params = i64;
  type Output = types::WishlistCount;

  fn key(game_id: &i64) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::WishlistCount { game_id: *game_id }.to_key()?)
  }

  fn fetch(client: ApiClient, game_id: i64) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.wishlist_count(game_id).await }.boxed()
  }
}

pub struct AdminStats;

impl Resource for AdminStats {
  type Params = ();
  type Output = types::AdminStats;

  fn key(_: &()) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::AdminStats.to_key()?)
  }

  fn fetch(client: ApiClient, _: ()) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.admin_stats().await }.boxed()
  }
}

pub struct AdminUsers;

impl Resource for AdminUsers {
  type Params = PageParams;
  type Output = Page<AdminUser>;

  fn key(page: &PageParams) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::AdminUsers(*page).to_key()?)
  }

  fn fetch(client: ApiClient, page: PageParams) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.admin_users(page).await }.boxed()
  }
}

pub struct AdminReviews;

impl Resource for AdminReviews {
  type Params = PageParams;
  type Output = Page<AdminReview>;

  fn key(page: &PageParams) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::AdminReviews(*page).to_key()?)
  }

  fn fetch(client: ApiClient, page: PageParams) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.admin_reviews(page).await }.boxed()
  }
}

pub struct AuditLogs;

impl Resource for AuditLogs {
  type Params = PageParams;
  type Output = Page<AuditLogEntry>;

  fn key(page: &PageParams) -> Result<QueryKey, FetchError> {
    Ok(ApiQueryKey::AuditLogs(*page).to_key()?)
  }

  fn fetch(client: ApiClient, page: PageParams) -> BoxFuture<'static, Result<Self::Output, FetchError>> {
    async move { client.audit_logs(page).await }.boxed()
  }
}
