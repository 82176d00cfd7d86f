use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::FetchError;
use crate::pagination::{CursorPage, Page};

use super::api_types::{
  ApiActivePlayersResponse, ApiAuditLogsResponse, ApiBrowseResponse, ApiCurrentSessionResponse,
  ApiErrorBody, ApiGameDetailResponse, ApiGamesResponse, ApiHistoryResponse, ApiReviewsResponse,
  ApiSessionResponse, ApiSessionsResponse, ApiUserResponse, ApiUsersResponse, ApiWishlistResponse,
};
use super::cache::{BrowseParams, PageParams};
use super::types::{
  Ack, ActivePlayer, AdminReview, AdminStats, AdminUser, AuditLogEntry, BrowseResult, GameDetail,
  GameSession, GameSummary, SearchResults, SessionDraft, UserRole, WishlistCount, WishlistEntry,
  WishlistStatus,
};

/// Checkpointer REST API client.
///
/// Every method issues exactly one HTTP request (blank searches issue none)
/// and maps failures onto [`FetchError`].
#[derive(Clone, Debug)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
  token: Option<String>,
}

impl ApiClient {
  pub fn new(config: &Config) -> Result<Self, FetchError> {
    Self::with_options(
      &config.api.url,
      Config::get_api_token(),
      config.api.request_timeout(),
    )
  }

  pub fn with_options(
    base_url: &str,
    token: Option<String>,
    timeout: Option<Duration>,
  ) -> Result<Self, FetchError> {
    let mut base = Url::parse(base_url)?;
    // Endpoint paths are joined relative to the base so a path prefix survives.
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let mut builder = reqwest::Client::builder().user_agent(Self::user_agent());
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let http = builder.build()?;

    Ok(Self { http, base, token })
  }

  pub fn user_agent() -> &'static str {
    concat!("checkpointer/", env!("CARGO_PKG_VERSION"))
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn url(&self, path: &str) -> Result<Url, FetchError> {
    Ok(self.base.join(path.trim_start_matches('/'))?)
  }

  async fn request<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<Value>,
  ) -> Result<T, FetchError> {
    let mut url = self.url(path)?;
    if !query.is_empty() {
      let mut pairs = url.query_pairs_mut();
      for (name, value) in query {
        pairs.append_pair(name, value);
      }
    }

    debug!(%method, %url, "API request");
    let mut req = self.http.request(method, url);
    if let Some(token) = &self.token {
      req = req.bearer_auth(token);
    }
    if let Some(body) = body {
      req = req.json(&body);
    }

    let resp = req
      .send()
      .await
      .map_err(|e| FetchError::NetworkError(e.to_string()))?;
    Self::handle(resp).await
  }

  async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, FetchError> {
    let status = resp.status();
    let path = resp.url().path().to_string();
    let bytes = resp
      .bytes()
      .await
      .map_err(|e| FetchError::NetworkError(e.to_string()))?;

    if !status.is_success() {
      let err = error_for_status(status, &bytes);
      warn!(%path, status = status.as_u16(), error = %err, "API request failed");
      return Err(err);
    }

    // 204 and other empty successes decode as `null`
    let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    serde_json::from_slice(body)
      .map_err(|e| FetchError::MalformedResponse(format!("{}: {}", path, e)))
  }

  async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, FetchError> {
    self.request(Method::GET, path, query, None).await
  }

  // ==========================================================================
  // Games
  // ==========================================================================

  /// Browse the catalog with filters, sorting and an offset window
  pub async fn browse_games(&self, params: &BrowseParams) -> Result<BrowseResult, FetchError> {
    let response: ApiBrowseResponse = self.get("api/games/browse", &params.query_pairs()).await?;
    response.into_result(params)
  }

  /// Free-text search. A blank query resolves to no games without a request.
  pub async fn search_games(&self, q: &str) -> Result<SearchResults, FetchError> {
    let q = q.trim();
    if q.is_empty() {
      return Ok(SearchResults::default());
    }

    let response: ApiGamesResponse = self.get("api/games/search", &[("q", q.to_string())]).await?;
    Ok(SearchResults {
      games: response.games,
    })
  }

  pub async fn get_game(&self, id: i64) -> Result<GameDetail, FetchError> {
    let response: ApiGameDetailResponse = self.get(&format!("api/games/{}", id), &[]).await?;
    Ok(response.into())
  }

  pub async fn top_rated(&self, limit: u32) -> Result<Vec<GameSummary>, FetchError> {
    let response: ApiGamesResponse = self
      .get("api/games/top-rated", &[("limit", limit.to_string())])
      .await?;
    response.into_limited("top rated", limit)
  }

  pub async fn trending(&self, limit: u32) -> Result<Vec<GameSummary>, FetchError> {
    let response: ApiGamesResponse = self
      .get("api/games/trending", &[("limit", limit.to_string())])
      .await?;
    response.into_limited("trending", limit)
  }

  // ==========================================================================
  // Sessions
  // ==========================================================================

  /// The signed-in user's running session, if any
  pub async fn current_session(&self) -> Result<Option<GameSession>, FetchError> {
    let response: ApiCurrentSessionResponse = self.get("api/game-sessions/current", &[]).await?;
    Ok(response.session)
  }

  pub async fn start_session(&self, game_id: i64) -> Result<GameSession, FetchError> {
    let response: ApiSessionResponse = self
      .request(
        Method::POST,
        "api/game-sessions/current",
        &[],
        Some(json!({ "gameId": game_id })),
      )
      .await?;
    Ok(response.session)
  }

  pub async fn end_session(&self) -> Result<Ack, FetchError> {
    self
      .request(Method::DELETE, "api/game-sessions/current", &[], None)
      .await
  }

  pub async fn user_sessions(&self, user_id: i64) -> Result<Vec<GameSession>, FetchError> {
    let response: ApiSessionsResponse = self
      .get(&format!("api/game-sessions/user/{}", user_id), &[])
      .await?;
    Ok(response.sessions)
  }

  /// One cursor page of finished sessions, newest first
  pub async fn session_history(
    &self,
    user_id: i64,
    page: PageParams,
  ) -> Result<CursorPage<GameSession>, FetchError> {
    let response: ApiHistoryResponse = self
      .get(
        &format!("api/game-sessions/user/{}/history", user_id),
        &[
          ("offset", page.offset.to_string()),
          ("limit", page.limit.to_string()),
        ],
      )
      .await?;
    response.into_cursor_page(page)
  }

  /// Record a finished session; returns the server's canonical record
  pub async fn log_session(&self, draft: &SessionDraft) -> Result<GameSession, FetchError> {
    let body =
      serde_json::to_value(draft).map_err(|e| FetchError::InvalidParams(e.to_string()))?;
    let response: ApiSessionResponse = self
      .request(Method::POST, "api/game-sessions/history", &[], Some(body))
      .await?;
    Ok(response.session)
  }

  pub async fn active_players(&self, game_id: i64) -> Result<Vec<ActivePlayer>, FetchError> {
    let response: ApiActivePlayersResponse = self
      .get(
        &format!("api/game-sessions/game/{}/active-players", game_id),
        &[],
      )
      .await?;
    Ok(response.players)
  }

  // ==========================================================================
  // Wishlist
  // ==========================================================================

  pub async fn wishlist(&self) -> Result<Vec<WishlistEntry>, FetchError> {
    let response: ApiWishlistResponse = self.get("api/want-to-play", &[]).await?;
    Ok(response.items)
  }

  pub async fn wishlist_check(&self, game_id: i64) -> Result<WishlistStatus, FetchError> {
    self
      .get(&format!("api/want-to-play/check/{}", game_id), &[])
      .await
  }

  pub async fn wishlist_count(&self, game_id: i64) -> Result<WishlistCount, FetchError> {
    self
      .get(&format!("api/want-to-play/game/{}/count", game_id), &[])
      .await
  }

  pub async fn add_to_wishlist(&self, game_id: i64) -> Result<Ack, FetchError> {
    self
      .request(
        Method::POST,
        &format!("api/want-to-play/{}", game_id),
        &[],
        None,
      )
      .await
  }

  pub async fn remove_from_wishlist(&self, game_id: i64) -> Result<Ack, FetchError> {
    self
      .request(
        Method::DELETE,
        &format!("api/want-to-play/{}", game_id),
        &[],
        None,
      )
      .await
  }

  // ==========================================================================
  // Admin (403 without an elevated role)
  // ==========================================================================

  pub async fn admin_stats(&self) -> Result<AdminStats, FetchError> {
    self.get("api/admin/stats", &[]).await
  }

  pub async fn admin_users(&self, page: PageParams) -> Result<Page<AdminUser>, FetchError> {
    let response: ApiUsersResponse = self.get("api/admin/users", &page_query(page)).await?;
    response.into_page(page)
  }

  pub async fn set_user_role(&self, user_id: i64, role: UserRole) -> Result<AdminUser, FetchError> {
    let response: ApiUserResponse = self
      .request(
        Method::PATCH,
        &format!("api/admin/users/{}/role", user_id),
        &[],
        Some(json!({ "role": role.as_str() })),
      )
      .await?;
    Ok(response.user)
  }

  pub async fn suspend_user(&self, user_id: i64, suspended: bool) -> Result<AdminUser, FetchError> {
    let response: ApiUserResponse = self
      .request(
        Method::PATCH,
        &format!("api/admin/users/{}/suspend", user_id),
        &[],
        Some(json!({ "suspended": suspended })),
      )
      .await?;
    Ok(response.user)
  }

  pub async fn admin_reviews(&self, page: PageParams) -> Result<Page<AdminReview>, FetchError> {
    let response: ApiReviewsResponse = self.get("api/admin/reviews", &page_query(page)).await?;
    response.into_page(page)
  }

  pub async fn delete_review(&self, review_id: i64) -> Result<Ack, FetchError> {
    self
      .request(
        Method::DELETE,
        &format!("api/admin/reviews/{}", review_id),
        &[],
        None,
      )
      .await
  }

  pub async fn audit_logs(&self, page: PageParams) -> Result<Page<AuditLogEntry>, FetchError> {
    let response: ApiAuditLogsResponse = self.get("api/admin/audit-logs", &page_query(page)).await?;
    response.into_page(page)
  }
}

fn page_query(page: PageParams) -> Vec<(&'static str, String)> {
  vec![
    ("limit", page.limit.to_string()),
    ("offset", page.offset.to_string()),
  ]
}

/// Map a non-2xx status onto the error taxonomy, taking the message from the
/// `{ "error": ... }` body when there is one.
pub(crate) fn error_for_status(status: StatusCode, body: &[u8]) -> FetchError {
  let message = serde_json::from_slice::<ApiErrorBody>(body)
    .map(|b| b.error)
    .unwrap_or_else(|_| {
      status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
    });

  match status {
    StatusCode::NOT_FOUND => FetchError::NotFound(message),
    StatusCode::FORBIDDEN => FetchError::Forbidden(message),
    _ => FetchError::ServerError {
      status: status.as_u16(),
      message,
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::cache::{SortBy, SortOrder};
  use httpmock::prelude::*;
  use serde_json::json;

  fn client(server: &MockServer) -> ApiClient {
    ApiClient::with_options(&server.base_url(), Some("secret".to_string()), None).unwrap()
  }

  fn game(id: i64) -> Value {
    json!({ "id": id, "name": format!("Game {}", id), "rating": 88.5 })
  }

  #[tokio::test]
  async fn test_browse_sends_filters_and_converts_page() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/api/games/browse")
          .query_param("q", "zelda")
          .query_param("sortBy", "name")
          .query_param("sortOrder", "asc")
          .query_param("genre", "rpg")
          .query_param("limit", "20")
          .query_param("offset", "40")
          .header("authorization", "Bearer secret");
        then.status(200).json_body(json!({
          "games": [game(1), game(2)],
          "totalCount": 45,
          "years": [1998],
          "genres": [{ "id": 3, "name": "rpg" }],
          "platforms": [{ "id": 4, "name": "Nintendo 64", "abbreviation": "N64" }],
          "pagination": { "limit": 20, "offset": 40, "hasMore": false }
        }));
      })
      .await;

    let params = BrowseParams {
      q: Some(" zelda ".to_string()),
      sort_by: SortBy::Name,
      sort_order: SortOrder::Asc,
      genre: Some("rpg".to_string()),
      limit: 20,
      offset: 40,
      ..BrowseParams::default()
    };
    let result = client(&server).browse_games(&params).await.unwrap();

    mock.assert_async().await;
    let window = result.page.window();
    assert_eq!((window.range_start, window.range_end), (41, 45));
    assert_eq!(result.platforms[0].abbreviation.as_deref(), Some("N64"));
  }

  #[tokio::test]
  async fn test_blank_search_makes_no_request() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/search");
        then.status(200).json_body(json!({ "games": [game(1)] }));
      })
      .await;

    let api = client(&server);
    assert!(api.search_games("").await.unwrap().games.is_empty());
    assert!(api.search_games("   \t").await.unwrap().games.is_empty());
    mock.assert_calls_async(0).await;
  }

  #[tokio::test]
  async fn test_search_issues_one_request() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/search").query_param("q", "mario");
        then.status(200).json_body(json!({ "games": [game(7)] }));
      })
      .await;

    let result = client(&server).search_games("mario").await.unwrap();
    mock.assert_calls_async(1).await;
    assert_eq!(result.games[0].id, 7);
  }

  #[tokio::test]
  async fn test_missing_game_is_not_found() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/999");
        then.status(404).json_body(json!({ "error": "Game not found" }));
      })
      .await;

    let err = client(&server).get_game(999).await.unwrap_err();
    assert_eq!(err, FetchError::NotFound("Game not found".to_string()));
  }

  #[tokio::test]
  async fn test_admin_forbidden_is_distinct() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/admin/users");
        then.status(403).json_body(json!({ "error": "Admin access required" }));
      })
      .await;

    let err = client(&server)
      .admin_users(PageParams::first(20))
      .await
      .unwrap_err();
    assert!(err.is_forbidden());
    assert_eq!(err.to_string(), "forbidden: Admin access required");
  }

  #[tokio::test]
  async fn test_other_status_is_server_error_with_body_message() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/admin/stats");
        then.status(500).json_body(json!({ "error": "database unavailable" }));
      })
      .await;

    let err = client(&server).admin_stats().await.unwrap_err();
    assert_eq!(
      err,
      FetchError::ServerError {
        status: 500,
        message: "database unavailable".to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_mutation_accepts_message_resource_or_empty_body() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(DELETE).path("/api/admin/reviews/1");
        then.status(200).json_body(json!({ "message": "Review deleted" }));
      })
      .await;
    server
      .mock_async(|when, then| {
        when.method(DELETE).path("/api/admin/reviews/2");
        then
          .status(200)
          .json_body(json!({ "id": 2, "userId": 1, "gameId": 5, "content": "gone" }));
      })
      .await;
    server
      .mock_async(|when, then| {
        when.method(DELETE).path("/api/admin/reviews/3");
        then.status(204);
      })
      .await;

    let api = client(&server);
    let message = api.delete_review(1).await.unwrap();
    assert_eq!(message.message(), Some("Review deleted"));

    let resource = api.delete_review(2).await.unwrap();
    assert_eq!(resource.message(), None);
    assert!(matches!(resource, Ack::Resource(ref value) if value["id"] == 2));

    assert_eq!(api.delete_review(3).await.unwrap(), Ack::Resource(Value::Null));
  }

  #[tokio::test]
  async fn test_error_without_json_body_uses_reason() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(DELETE).path("/api/admin/reviews/3");
        then.status(502).body("<html>bad gateway</html>");
      })
      .await;

    let err = client(&server).delete_review(3).await.unwrap_err();
    assert_eq!(
      err,
      FetchError::ServerError {
        status: 502,
        message: "Bad Gateway".to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_wrong_shape_is_malformed() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/games/top-rated");
        then.status(200).json_body(json!({ "items": [] }));
      })
      .await;

    let err = client(&server).top_rated(10).await.unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse(_)));
    assert!(err.is_server_side());
  }

  #[tokio::test]
  async fn test_unreachable_server_is_network_error() {
    // Nothing listens on the discard port.
    let api = ApiClient::with_options("http://127.0.0.1:9", None, Some(Duration::from_secs(2))).unwrap();
    let err = api.current_session().await.unwrap_err();
    assert!(matches!(err, FetchError::NetworkError(_)));
  }

  #[tokio::test]
  async fn test_history_forwards_cursor() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/api/game-sessions/user/7/history")
          .query_param("offset", "0")
          .query_param("limit", "2");
        then.status(200).json_body(json!({
          "sessions": [
            { "id": 1, "userId": 7, "gameId": 3, "startedAt": "2024-01-01T10:00:00Z", "endedAt": "2024-01-01T11:00:00Z" },
            { "id": 2, "userId": 7, "gameId": 4, "startedAt": "2024-01-02T10:00:00Z", "endedAt": "2024-01-02T10:30:00Z" }
          ],
          "totalCount": 5,
          "hasMore": true,
          "nextOffset": 2
        }));
      })
      .await;

    let page = client(&server)
      .session_history(7, PageParams::first(2))
      .await
      .unwrap();
    assert_eq!(page.next_offset, Some(2));
    assert_eq!(page.items.len(), 2);
  }

  #[tokio::test]
  async fn test_log_session_posts_draft() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when
          .method(POST)
          .path("/api/game-sessions/history")
          .json_body_includes(r#"{ "gameId": 3 }"#);
        then.status(201).json_body(json!({
          "session": { "id": 55, "userId": 7, "gameId": 3, "startedAt": "2024-01-01T10:00:00Z", "endedAt": "2024-01-01T11:00:00Z", "durationMinutes": 60 }
        }));
      })
      .await;

    let draft = SessionDraft {
      game_id: 3,
      started_at: "2024-01-01T10:00:00Z".parse().unwrap(),
      ended_at: "2024-01-01T11:00:00Z".parse().unwrap(),
    };
    let session = client(&server).log_session(&draft).await.unwrap();
    mock.assert_async().await;
    assert_eq!(session.id, 55);
    assert_eq!(session.duration_minutes, Some(60));
  }

  #[tokio::test]
  async fn test_set_role_patches_user() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when
          .method(PATCH)
          .path("/api/admin/users/4/role")
          .json_body(json!({ "role": "admin" }));
        then.status(200).json_body(json!({
          "user": { "id": 4, "username": "kim", "role": "admin", "suspended": false }
        }));
      })
      .await;

    let user = client(&server).set_user_role(4, UserRole::Admin).await.unwrap();
    mock.assert_async().await;
    assert_eq!(user.role, UserRole::Admin);
  }

  #[test]
  fn test_base_path_prefix_is_kept() {
    let api = ApiClient::with_options("https://host.example/app", None, None).unwrap();
    assert_eq!(
      api.url("api/games/1").unwrap().as_str(),
      "https://host.example/app/api/games/1"
    );
  }
}
