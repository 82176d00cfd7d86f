//! Canonical cache keys for parameterized requests.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
  #[error("entity name must not be empty")]
  EmptyEntity,
  #[error("parameter `{name}` is {reason}")]
  InvalidParams { name: String, reason: &'static str },
}

/// Identity of a cached request: an entity name plus its canonical parameters.
///
/// Two keys built from the same entity and the same parameter values compare
/// equal regardless of the order in which the parameters were supplied.
/// Parameters whose value is `null` are treated as absent.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
  entity: String,
  canonical: String,
}

impl QueryKey {
  /// Entity name the key was derived for (e.g. "games-browse").
  pub fn entity(&self) -> &str {
    &self.entity
  }

  /// Canonical encoding: `entity` followed by the sorted parameter object.
  pub fn canonical(&self) -> &str {
    &self.canonical
  }

  /// SHA256 of the canonical encoding, for stable fixed-length identifiers in logs.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.canonical.as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl fmt::Debug for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "QueryKey({})", self.canonical)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.canonical)
  }
}

/// Derive a key from an entity name and a set of parameters.
///
/// Values must be primitives (string, number, bool) or flat arrays of
/// primitives. Parameters are sorted by name before encoding; JSON encoding
/// keeps `"2020"` and `2020` distinct.
pub fn derive_key<I, K>(entity: &str, params: I) -> Result<QueryKey, KeyError>
where
  I: IntoIterator<Item = (K, Value)>,
  K: Into<String>,
{
  if entity.trim().is_empty() {
    return Err(KeyError::EmptyEntity);
  }

  let mut sorted = BTreeMap::new();
  for (name, value) in params {
    let name = name.into();
    if value.is_null() {
      continue;
    }
    check_param(&name, &value)?;
    sorted.insert(name, value);
  }

  let canonical = if sorted.is_empty() {
    entity.to_string()
  } else {
    let encoded = serde_json::to_string(&sorted).map_err(|_| KeyError::InvalidParams {
      name: entity.to_string(),
      reason: "not encodable",
    })?;
    format!("{}:{}", entity, encoded)
  };

  Ok(QueryKey {
    entity: entity.to_string(),
    canonical,
  })
}

fn check_param(name: &str, value: &Value) -> Result<(), KeyError> {
  match value {
    Value::Object(_) => Err(KeyError::InvalidParams {
      name: name.to_string(),
      reason: "an object",
    }),
    Value::Array(items) => {
      if items
        .iter()
        .any(|v| matches!(v, Value::Array(_) | Value::Object(_)))
      {
        Err(KeyError::InvalidParams {
          name: name.to_string(),
          reason: "a nested array",
        })
      } else {
        Ok(())
      }
    }
    _ => Ok(()),
  }
}

/// Incremental builder over [`derive_key`].
///
/// ```ignore
/// let key = KeyBuilder::new("games-browse")
///   .param("q", Some("zelda"))
///   .param("limit", 20)
///   .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct KeyBuilder {
  entity: String,
  params: Vec<(String, Value)>,
}

impl KeyBuilder {
  pub fn new(entity: impl Into<String>) -> Self {
    Self {
      entity: entity.into(),
      params: Vec::new(),
    }
  }

  pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
    self.params.push((name.to_string(), value.into()));
    self
  }

  pub fn build(self) -> Result<QueryKey, KeyError> {
    derive_key(&self.entity, self.params)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_order_independent() {
    let a = derive_key(
      "games-browse",
      vec![("q", json!("zelda")), ("limit", json!(20)), ("offset", json!(0))],
    )
    .unwrap();
    let b = derive_key(
      "games-browse",
      vec![("offset", json!(0)), ("q", json!("zelda")), ("limit", json!(20))],
    )
    .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_deterministic() {
    let build = || {
      KeyBuilder::new("play-history")
        .param("userId", 7)
        .param("limit", 10)
        .build()
        .unwrap()
    };
    assert_eq!(build(), build());
    assert_eq!(build().canonical(), r#"play-history:{"limit":10,"userId":7}"#);
  }

  #[test]
  fn test_offset_changes_key() {
    let first = KeyBuilder::new("games-browse").param("offset", 0).build().unwrap();
    let second = KeyBuilder::new("games-browse").param("offset", 20).build().unwrap();
    assert_ne!(first, second);
  }

  #[test]
  fn test_absent_optional_params_are_ignored() {
    let with_none = KeyBuilder::new("games-browse")
      .param("q", None::<String>)
      .param("limit", 20)
      .build()
      .unwrap();
    let without = KeyBuilder::new("games-browse").param("limit", 20).build().unwrap();
    assert_eq!(with_none, without);
  }

  #[test]
  fn test_string_and_number_do_not_collide() {
    let text = KeyBuilder::new("games-browse").param("year", "2020").build().unwrap();
    let number = KeyBuilder::new("games-browse").param("year", 2020).build().unwrap();
    assert_ne!(text, number);
  }

  #[test]
  fn test_entity_separates_keys() {
    let games = KeyBuilder::new("games-top-rated").param("limit", 10).build().unwrap();
    let trending = KeyBuilder::new("games-trending").param("limit", 10).build().unwrap();
    assert_ne!(games, trending);
    assert_eq!(games.entity(), "games-top-rated");
  }

  #[test]
  fn test_flat_array_allowed() {
    let key = derive_key("games", vec![("ids", json!([1, 2, 3]))]);
    assert!(key.is_ok());
  }

  #[test]
  fn test_rejects_objects_and_nested_arrays() {
    let err = derive_key("games", vec![("filter", json!({"a": 1}))]).unwrap_err();
    assert!(matches!(err, KeyError::InvalidParams { ref name, .. } if name == "filter"));

    let err = derive_key("games", vec![("ids", json!([[1], [2]]))]).unwrap_err();
    assert!(matches!(err, KeyError::InvalidParams { .. }));
  }

  #[test]
  fn test_rejects_empty_entity() {
    let params: Vec<(String, Value)> = Vec::new();
    assert_eq!(derive_key("  ", params).unwrap_err(), KeyError::EmptyEntity);
  }
}
