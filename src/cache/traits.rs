//! Core traits and types for the fallback layer.

use serde::{de::DeserializeOwned, Serialize};

/// Trait for records that can flow through the fallback layer and the
/// session overlay.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique numeric identifier within its entity kind
  fn id(&self) -> u64;

  /// Entity kind name, used in logs and not-found errors (e.g. "job")
  fn kind() -> &'static str;

  /// Position in a shared total order, if the entity has one.
  fn rank(&self) -> Option<i64> {
    None
  }
}

/// Result of a read or write, with the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: DataSource,
}

impl<T> Fetched<T> {
  /// Data returned by the remote service.
  pub fn from_remote(data: T) -> Self {
    Self {
      data,
      source: DataSource::Remote,
    }
  }

  /// Data served from the local store after the remote call failed.
  pub fn from_fallback(data: T) -> Self {
    Self {
      data,
      source: DataSource::LocalFallback,
    }
  }

  /// Data served from the local store without trying the remote service.
  pub fn local_only(data: T) -> Self {
    Self {
      data,
      source: DataSource::LocalOnly,
    }
  }

  pub fn is_authoritative(&self) -> bool {
    self.source == DataSource::Remote
  }

  /// Drop the provenance, as callers that don't care about freshness do.
  pub fn into_data(self) -> T {
    self.data
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
    Fetched {
      data: f(self.data),
      source: self.source,
    }
  }

  pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Fetched<U>, E> {
    Ok(Fetched {
      data: f(self.data)?,
      source: self.source,
    })
  }
}

/// Indicates which path answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
  /// Authoritative answer from the remote service
  Remote,
  /// Remote call failed; served from the local store
  LocalFallback,
  /// Remote disabled by policy; served from the local store
  LocalOnly,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fetched_keeps_source_through_map() {
    let fetched = Fetched::from_fallback(vec![1, 2, 3]).map(|v| v.len());
    assert_eq!(fetched.data, 3);
    assert_eq!(fetched.source, DataSource::LocalFallback);
    assert!(!fetched.is_authoritative());

    let failed: Result<Fetched<u8>, &str> = Fetched::from_remote(1).try_map(|_| Err("nope"));
    assert_eq!(failed, Err("nope"));
    assert!(Fetched::from_remote(()).is_authoritative());
  }
}
