//! Cached Checkpointer client that wraps ApiClient with transparent caching.

use chrono::Utc;
use tracing::debug;

use crate::cache::{apply_mutation, CacheLayer, CacheStore, MutationIntent, SyncOutcome, SyncPolicy};
use crate::config::Config;
use crate::error::FetchError;
use crate::pagination::{CursorPage, Page};

use super::cache::PageParams;
use super::client::ApiClient;
use super::resources::{
  self, ActivePlayers, AdminReviews, AdminUsers, CurrentSession, HistoryParams, Resource,
  SessionHistory, UserSessions, Wishlist, WishlistCheck, WishlistCount,
};
use super::types::{
  Ack, AdminReview, AdminUser, GameSession, GameSummary, SessionDraft, UserRole, WishlistEntry,
  WishlistStatus,
};

/// Checkpointer client with transparent caching support.
///
/// Reads go through the session's [`CacheStore`]: fresh entries are served
/// without a request and concurrent reads of one key share a request.
/// Mutations hit the API and then patch the affected cached result in place.
#[derive(Clone)]
pub struct CachedClient {
  inner: ApiClient,
  cache: CacheLayer,
  policy: SyncPolicy,
}

impl CachedClient {
  /// Create a new cached client with a store using the configured stale time.
  pub fn new(config: &Config) -> Result<Self, FetchError> {
    let inner = ApiClient::new(config)?;
    let store = CacheStore::new(config.cache.stale_time());
    Ok(Self::with_store(inner, store))
  }

  pub fn with_store(inner: ApiClient, store: CacheStore) -> Self {
    Self {
      inner,
      cache: CacheLayer::new(store),
      policy: SyncPolicy::default(),
    }
  }

  /// Policy applied when a mutation targets a result that is not cached.
  pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn api(&self) -> &ApiClient {
    &self.inner
  }

  pub fn store(&self) -> &CacheStore {
    self.cache.store()
  }

  /// Read a resource, cache first.
  pub async fn get<R: Resource>(&self, params: R::Params) -> Result<R::Output, FetchError> {
    let key = R::key(&params)?;
    let inner = self.inner.clone();
    let result = self.cache.fetch(&key, move || R::fetch(inner, params)).await?;
    Ok(result.data)
  }

  /// Read a resource from the network even if the cached entry is fresh.
  pub async fn refresh<R: Resource>(&self, params: R::Params) -> Result<R::Output, FetchError> {
    let key = R::key(&params)?;
    let inner = self.inner.clone();
    let result = self.cache.refetch(&key, move || R::fetch(inner, params)).await?;
    Ok(result.data)
  }

  /// Mark a cached result stale so the next read refetches it.
  pub fn invalidate<R: Resource>(&self, params: &R::Params) -> Result<bool, FetchError> {
    Ok(self.store().mark_stale(&R::key(params)?))
  }

  /// Mark every cached result of this resource stale, whatever its params
  /// (all pages, all filters). Returns how many entries were touched.
  pub fn invalidate_entity<R: Resource>(&self, params: &R::Params) -> Result<usize, FetchError> {
    let key = R::key(params)?;
    Ok(self.store().invalidate_entity(key.entity(), None))
  }

  /// Discard the response of any request in flight for these params.
  pub fn cancel<R: Resource>(&self, params: &R::Params) -> Result<bool, FetchError> {
    Ok(self.store().cancel(&R::key(params)?))
  }

  /// Drop every cached entry (logout).
  pub fn clear(&self) {
    self.store().clear();
  }

  // ==========================================================================
  // Wishlist
  // ==========================================================================

  pub async fn add_to_wishlist(&self, game: &GameSummary) -> Result<SyncOutcome, FetchError> {
    self.inner.add_to_wishlist(game.id).await?;

    let entry = WishlistEntry {
      game_id: game.id,
      game: Some(game.clone()),
      added_at: Some(Utc::now()),
    };
    let outcome = apply_mutation::<Vec<WishlistEntry>, _>(
      self.store(),
      &Wishlist::key(&())?,
      &MutationIntent::Create { item: entry },
      self.policy,
    )?;
    self.set_wishlist_flags(game.id, true)?;
    Ok(outcome)
  }

  pub async fn remove_from_wishlist(&self, game_id: i64) -> Result<SyncOutcome, FetchError> {
    self.inner.remove_from_wishlist(game_id).await?;

    let outcome = apply_mutation::<Vec<WishlistEntry>, WishlistEntry>(
      self.store(),
      &Wishlist::key(&())?,
      &MutationIntent::Delete {
        id: game_id.to_string(),
      },
      self.policy,
    )?;
    self.set_wishlist_flags(game_id, false)?;
    Ok(outcome)
  }

  /// Keep the per-game check and count in step with a wishlist change.
  fn set_wishlist_flags(&self, game_id: i64, in_wishlist: bool) -> Result<(), FetchError> {
    let store = self.store();
    let check_key = WishlistCheck::key(&game_id)?;
    store.detach(&check_key);
    store.update::<WishlistStatus, _, _>(&check_key, |status| {
      status.in_wishlist = in_wishlist;
    })?;

    // Other users affect the count too, so it is refetched rather than patched.
    store.mark_stale(&WishlistCount::key(&game_id)?);
    Ok(())
  }

  // ==========================================================================
  // Sessions
  // ==========================================================================

  pub async fn start_session(&self, game_id: i64) -> Result<GameSession, FetchError> {
    let session = self.inner.start_session(game_id).await?;
    self.set_current_session(Some(session.clone()))?;
    self.store().mark_stale(&ActivePlayers::key(&game_id)?);
    debug!(session_id = session.id, game_id, "Started session");
    Ok(session)
  }

  pub async fn end_session(&self) -> Result<Ack, FetchError> {
    let ended = self
      .store()
      .get::<Option<GameSession>>(&CurrentSession::key(&())?)?
      .and_then(|entry| entry.data)
      .flatten();
    let ack = self.inner.end_session().await?;
    self.set_current_session(None)?;
    if let Some(session) = ended {
      self.store().mark_stale(&ActivePlayers::key(&session.game_id)?);
    }
    Ok(ack)
  }

  fn set_current_session(&self, session: Option<GameSession>) -> Result<(), FetchError> {
    let key = CurrentSession::key(&())?;
    self.store().detach(&key);
    self
      .store()
      .update::<Option<GameSession>, _, _>(&key, |current| *current = session)?;
    Ok(())
  }

  /// Log a finished session with an optimistic history entry.
  ///
  /// `placeholder` is prepended to the cached history page right away, then
  /// swapped for the server's record on success or removed on failure.
  pub async fn log_session(
    &self,
    history: HistoryParams,
    placeholder: &GameSession,
    draft: &SessionDraft,
  ) -> Result<GameSession, FetchError> {
    let key = SessionHistory::key(&history)?;
    let placeholder_id = placeholder.id.to_string();

    apply_mutation::<CursorPage<GameSession>, _>(
      self.store(),
      &key,
      &MutationIntent::Create {
        item: placeholder.clone(),
      },
      self.policy,
    )?;

    match self.inner.log_session(draft).await {
      Ok(canonical) => {
        apply_mutation::<CursorPage<GameSession>, _>(
          self.store(),
          &key,
          &MutationIntent::Confirm {
            placeholder_id,
            canonical: canonical.clone(),
          },
          self.policy,
        )?;
        self.store().mark_stale(&UserSessions::key(&history.user_id)?);
        Ok(canonical)
      }
      Err(err) => {
        debug!(error = %err, "Rolling back optimistic session");
        apply_mutation::<CursorPage<GameSession>, GameSession>(
          self.store(),
          &key,
          &MutationIntent::Delete { id: placeholder_id },
          self.policy,
        )?;
        Err(err)
      }
    }
  }

  // ==========================================================================
  // Admin
  // ==========================================================================

  /// Change a user's role and patch it into the cached users page.
  pub async fn set_user_role(
    &self,
    page: PageParams,
    user_id: i64,
    role: UserRole,
  ) -> Result<(AdminUser, SyncOutcome), FetchError> {
    let user = self.inner.set_user_role(user_id, role).await?;
    let outcome = self.patch_user(page, &user)?;
    Ok((user, outcome))
  }

  pub async fn suspend_user(
    &self,
    page: PageParams,
    user_id: i64,
    suspended: bool,
  ) -> Result<(AdminUser, SyncOutcome), FetchError> {
    let user = self.inner.suspend_user(user_id, suspended).await?;
    let outcome = self.patch_user(page, &user)?;
    Ok((user, outcome))
  }

  fn patch_user(&self, page: PageParams, user: &AdminUser) -> Result<SyncOutcome, FetchError> {
    let outcome = apply_mutation::<Page<AdminUser>, _>(
      self.store(),
      &AdminUsers::key(&page)?,
      &MutationIntent::Update { item: user.clone() },
      self.policy,
    )?;
    self.store().mark_stale(&resources::AdminStats::key(&())?);
    Ok(outcome)
  }

  /// Delete a review and remove it from the cached reviews page.
  pub async fn delete_review(&self, page: PageParams, review_id: i64) -> Result<SyncOutcome, FetchError> {
    self.inner.delete_review(review_id).await?;
    let outcome = apply_mutation::<Page<AdminReview>, AdminReview>(
      self.store(),
      &AdminReviews::key(&page)?,
      &MutationIntent::Delete {
        id: review_id.to_string(),
      },
      self.policy,
    )?;
    self.store().mark_stale(&resources::AdminStats::key(&())?);
    Ok(outcome)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::cache::BrowseParams;
  use crate::api::resources::{Browse, GameDetail, Search};
  use httpmock::prelude::*;
  use serde_json::{json, Value};

  fn client(server: &MockServer) -> CachedClient {
    let api = ApiClient::with_options(&server.base_url(), None, None).unwrap();
    CachedClient::with_store(api, CacheStore::default())
  }

  fn review(id: i64) -> Value {
    json!({ "id": id, "userId": 1, "gameId": 2, "content": format!("review {}", id) })
  }

  fn session(id: i64, started: &str) -> Value {
    json!({ "id": id, "userId": 7, "gameId": 3, "startedAt": started, "endedAt": started })
  }

  fn history() -> HistoryParams {
    HistoryParams {
      user_id: 7,
      page: PageParams::first(10),
    }
  }

  fn draft() -> SessionDraft {
    SessionDraft {
      game_id: 3,
      started_at: "2024-03-01T18:00:00Z".parse().unwrap(),
      ended_at: "2024-03-01T19:30:00Z".parse().unwrap(),
    }
  }

  async fn mock_history(server: &MockServer) -> httpmock::Mock<'_> {
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/game-sessions/user/7/history");
        then.status(200).json_body(json!({
          "sessions": [session(10, "2024-02-01T10:00:00Z"), session(9, "2024-01-01T10:00:00Z")],
          "totalCount": 2,
          "hasMore": false,
          "nextOffset": null
        }));
      })
      .await
  }

  #[tokio::test]
  async fn test_fresh_entry_is_served_without_request() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/browse");
        then.status(200).json_body(json!({
          "games": [{ "id": 1, "name": "Ico" }],
          "totalCount": 1,
          "pagination": { "limit": 24, "offset": 0, "hasMore": false }
        }));
      })
      .await;

    let cached = client(&server);
    let first = cached.get::<Browse>(BrowseParams::default()).await.unwrap();
    let second = cached.get::<Browse>(BrowseParams::default()).await.unwrap();

    mock.assert_calls_async(1).await;
    assert_eq!(first, second);
  }

  #[tokio::test]
  async fn test_refresh_bypasses_fresh_entry() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/8");
        then.status(200).json_body(json!({ "game": { "id": 8, "name": "Rez" } }));
      })
      .await;

    let cached = client(&server);
    cached.get::<GameDetail>(8).await.unwrap();
    let refreshed = cached.refresh::<GameDetail>(8).await.unwrap();

    mock.assert_calls_async(2).await;
    assert_eq!(refreshed.game.name, "Rez");
  }

  #[tokio::test]
  async fn test_invalidated_entry_is_refetched() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/8");
        then.status(200).json_body(json!({ "game": { "id": 8, "name": "Rez" } }));
      })
      .await;

    let cached = client(&server);
    cached.get::<GameDetail>(8).await.unwrap();
    assert!(cached.invalidate::<GameDetail>(&8).unwrap());
    assert!(!cached.cancel::<GameDetail>(&8).unwrap());
    cached.get::<GameDetail>(8).await.unwrap();

    mock.assert_calls_async(2).await;
  }

  #[tokio::test]
  async fn test_invalidating_history_stales_every_page() {
    let server = MockServer::start_async().await;
    let first_page = server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/api/game-sessions/user/7/history")
          .query_param("offset", "0");
        then.status(200).json_body(json!({
          "sessions": [session(10, "2024-02-01T10:00:00Z")],
          "totalCount": 2,
          "hasMore": true,
          "nextOffset": 1
        }));
      })
      .await;
    let second_page = server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/api/game-sessions/user/7/history")
          .query_param("offset", "1");
        then.status(200).json_body(json!({
          "sessions": [session(9, "2024-01-01T10:00:00Z")],
          "totalCount": 2,
          "hasMore": false,
          "nextOffset": null
        }));
      })
      .await;

    let cached = client(&server);
    let next = HistoryParams {
      user_id: 7,
      page: PageParams {
        limit: 10,
        offset: 1,
      },
    };
    cached.get::<SessionHistory>(history()).await.unwrap();
    cached.get::<SessionHistory>(next).await.unwrap();

    assert_eq!(cached.invalidate_entity::<SessionHistory>(&history()).unwrap(), 2);
    cached.get::<SessionHistory>(history()).await.unwrap();
    cached.get::<SessionHistory>(next).await.unwrap();

    first_page.assert_calls_async(2).await;
    second_page.assert_calls_async(2).await;
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_request() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/5");
        then
          .status(200)
          .delay(std::time::Duration::from_millis(50))
          .json_body(json!({ "game": { "id": 5, "name": "Okami" } }));
      })
      .await;

    let cached = client(&server);
    let (a, b) = tokio::join!(
      cached.get::<GameDetail>(5),
      cached.get::<GameDetail>(5)
    );

    mock.assert_calls_async(1).await;
    assert_eq!(a.unwrap().game.name, "Okami");
    assert_eq!(b.unwrap().game.name, "Okami");
  }

  #[tokio::test]
  async fn test_blank_search_never_hits_network() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/search");
        then.status(200).json_body(json!({ "games": [] }));
      })
      .await;

    let result = client(&server).get::<Search>("  ".to_string()).await.unwrap();
    assert!(result.games.is_empty());
    mock.assert_calls_async(0).await;
  }

  #[tokio::test]
  async fn test_search_texts_differing_in_case_are_cached_apart() {
    let server = MockServer::start_async().await;
    let upper = server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/search").query_param("q", "Zelda");
        then.status(200).json_body(json!({ "games": [{ "id": 1, "name": "Zelda" }] }));
      })
      .await;
    let lower = server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/search").query_param("q", "zelda");
        then.status(200).json_body(json!({ "games": [] }));
      })
      .await;

    let cached = client(&server);
    let first = cached.get::<Search>(" Zelda".to_string()).await.unwrap();
    let second = cached.get::<Search>("zelda".to_string()).await.unwrap();

    upper.assert_calls_async(1).await;
    lower.assert_calls_async(1).await;
    assert_eq!(first.games.len(), 1);
    assert!(second.games.is_empty());
  }

  #[tokio::test]
  async fn test_delete_review_patches_cached_page() {
    let server = MockServer::start_async().await;
    let list = server
      .mock_async(|when, then| {
        when.method(GET).path("/api/admin/reviews");
        then.status(200).json_body(json!({
          "reviews": [review(1), review(2), review(3)],
          "totalCount": 3
        }));
      })
      .await;
    let delete = server
      .mock_async(|when, then| {
        when.method(DELETE).path("/api/admin/reviews/2");
        then.status(200).json_body(json!({ "message": "Review deleted" }));
      })
      .await;

    let cached = client(&server);
    let page = PageParams::first(20);
    cached.get::<AdminReviews>(page).await.unwrap();

    let outcome = cached.delete_review(page, 2).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Applied);

    let after = cached.get::<AdminReviews>(page).await.unwrap();
    delete.assert_async().await;
    list.assert_calls_async(1).await;
    let ids: Vec<i64> = after.items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(after.total_count, 2);
  }

  #[tokio::test]
  async fn test_eager_policy_reports_refetch_for_uncached_page() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(DELETE).path("/api/admin/reviews/4");
        then.status(200).json_body(json!({ "message": "Review deleted" }));
      })
      .await;

    let cached = client(&server).with_policy(SyncPolicy::Eager);
    let outcome = cached.delete_review(PageParams::first(20), 4).await.unwrap();
    assert_eq!(outcome, SyncOutcome::RequiresRefetch);
    assert!(cached.store().is_empty());
  }

  #[tokio::test]
  async fn test_logged_session_replaces_placeholder_once() {
    let server = MockServer::start_async().await;
    let list = mock_history(&server).await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/api/game-sessions/history");
        then.status(201).json_body(json!({ "session": session(11, "2024-03-01T18:00:00Z") }));
      })
      .await;

    let cached = client(&server);
    cached.get::<SessionHistory>(history()).await.unwrap();

    let placeholder = GameSession::placeholder(7, &draft(), None);
    let canonical = cached.log_session(history(), &placeholder, &draft()).await.unwrap();
    assert_eq!(canonical.id, 11);

    let page = cached.get::<SessionHistory>(history()).await.unwrap();
    list.assert_calls_async(1).await;
    let ids: Vec<i64> = page.items.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![11, 10, 9]);
    assert_eq!(page.total_count, 3);
  }

  #[tokio::test]
  async fn test_failed_log_rolls_back_placeholder() {
    let server = MockServer::start_async().await;
    mock_history(&server).await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/api/game-sessions/history");
        then.status(500).json_body(json!({ "error": "could not save" }));
      })
      .await;

    let cached = client(&server);
    let before = cached.get::<SessionHistory>(history()).await.unwrap();

    let placeholder = GameSession::placeholder(7, &draft(), None);
    let err = cached
      .log_session(history(), &placeholder, &draft())
      .await
      .unwrap_err();
    assert_eq!(
      err,
      FetchError::ServerError {
        status: 500,
        message: "could not save".to_string()
      }
    );

    let after = cached.get::<SessionHistory>(history()).await.unwrap();
    assert_eq!(after, before);
  }

  #[tokio::test]
  async fn test_wishlist_remove_updates_list_and_check() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/want-to-play");
        then.status(200).json_body(json!({
          "items": [{ "gameId": 1 }, { "gameId": 2 }]
        }));
      })
      .await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/want-to-play/check/2");
        then.status(200).json_body(json!({ "inWishlist": true }));
      })
      .await;
    server
      .mock_async(|when, then| {
        when.method(DELETE).path("/api/want-to-play/2");
        then.status(200).json_body(json!({ "message": "Removed" }));
      })
      .await;

    let cached = client(&server);
    cached.get::<Wishlist>(()).await.unwrap();
    cached.get::<WishlistCheck>(2).await.unwrap();

    cached.remove_from_wishlist(2).await.unwrap();

    let list = cached.get::<Wishlist>(()).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].game_id, 1);
    assert!(!cached.get::<WishlistCheck>(2).await.unwrap().in_wishlist);
  }

  #[tokio::test]
  async fn test_wishlist_add_answered_with_resource_still_patches() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/want-to-play");
        then.status(200).json_body(json!({ "items": [{ "gameId": 1 }] }));
      })
      .await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/api/want-to-play/4");
        then
          .status(201)
          .json_body(json!({ "gameId": 4, "addedAt": "2024-03-01T18:00:00Z" }));
      })
      .await;

    let cached = client(&server);
    cached.get::<Wishlist>(()).await.unwrap();

    let game: GameSummary = serde_json::from_value(json!({ "id": 4, "name": "Ico" })).unwrap();
    let outcome = cached.add_to_wishlist(&game).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Applied);

    let list = cached.get::<Wishlist>(()).await.unwrap();
    let ids: Vec<i64> = list.iter().map(|entry| entry.game_id).collect();
    assert_eq!(ids, vec![4, 1]);
  }

  #[tokio::test]
  async fn test_forbidden_propagates_through_cache() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/admin/users");
        then.status(403).json_body(json!({ "error": "Admin access required" }));
      })
      .await;

    let err = client(&server)
      .get::<AdminUsers>(PageParams::first(20))
      .await
      .unwrap_err();
    assert!(err.is_forbidden());
  }
}
