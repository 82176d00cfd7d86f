//! Error taxonomy shared by the adapters, the cache, and the query state machines.

use thiserror::Error;

use crate::cache::KeyError;

/// Typed failure of a fetch or mutation.
///
/// Cloneable so that every caller coalesced onto one in-flight request
/// receives the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// The server answered 404.
  #[error("not found: {0}")]
  NotFound(String),
  /// The server answered 403; admin views render an access-denied state.
  #[error("forbidden: {0}")]
  Forbidden(String),
  /// Any other non-2xx answer.
  #[error("server error ({status}): {message}")]
  ServerError { status: u16, message: String },
  /// The request never produced an HTTP response.
  #[error("network error: {0}")]
  NetworkError(String),
  /// The request could not be constructed on the client side.
  #[error("invalid parameters: {0}")]
  InvalidParams(String),
  /// A 2xx response whose body failed shape validation.
  #[error("malformed response: {0}")]
  MalformedResponse(String),
}

impl FetchError {
  pub fn is_forbidden(&self) -> bool {
    matches!(self, FetchError::Forbidden(_))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, FetchError::NotFound(_))
  }

  /// Server-side failures, including payloads that did not validate.
  pub fn is_server_side(&self) -> bool {
    matches!(
      self,
      FetchError::ServerError { .. } | FetchError::MalformedResponse(_)
    )
  }
}

impl From<KeyError> for FetchError {
  fn from(err: KeyError) -> Self {
    FetchError::InvalidParams(err.to_string())
  }
}

impl From<reqwest::Error> for FetchError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      FetchError::MalformedResponse(err.to_string())
    } else {
      FetchError::NetworkError(err.to_string())
    }
  }
}

impl From<url::ParseError> for FetchError {
  fn from(err: url::ParseError) -> Self {
    FetchError::InvalidParams(format!("bad url: {}", err))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_forbidden_is_distinct() {
    let err = FetchError::Forbidden("admin only".to_string());
    assert!(err.is_forbidden());
    assert!(!err.is_server_side());
    assert!(!FetchError::NotFound("x".to_string()).is_forbidden());
  }

  #[test]
  fn test_malformed_counts_as_server_side() {
    assert!(FetchError::MalformedResponse("missing games".to_string()).is_server_side());
    assert!(FetchError::ServerError {
      status: 500,
      message: "boom".to_string()
    }
    .is_server_side());
  }

  #[test]
  fn test_key_error_maps_to_invalid_params() {
    let err: FetchError = KeyError::EmptyEntity.into();
    assert!(matches!(err, FetchError::InvalidParams(_)));
  }
}
