//! Error types surfaced by the data-access layer.

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors from the local SQLite mirror.
#[derive(Debug, Error)]
pub enum StoreError {
  /// A SQL statement failed.
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  /// A stored row could not be (de)serialized.
  #[error("corrupt row: {0}")]
  Corrupt(#[from] serde_json::Error),

  /// The connection mutex was poisoned by a panicking holder.
  #[error("store lock poisoned")]
  LockPoisoned,

  /// The database file or its directory could not be created.
  #[error("failed to open store at {path}: {source}")]
  Open {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

/// Errors returned by entity service operations.
///
/// Network failures only appear here under `FetchPolicy::NetworkOnly`;
/// the default policy absorbs them and answers from the local store.
#[derive(Debug, Error)]
pub enum AccessError {
  /// A non-numeric identifier was supplied where an id is required.
  #[error("invalid id: {0:?}")]
  InvalidId(String),

  /// Neither the remote service nor the local store has the record.
  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: u64 },

  /// Input rejected before it reached any store.
  #[error("validation failed: {0}")]
  Validation(String),

  /// A uniqueness constraint would be broken by the write.
  #[error("conflict: {0}")]
  Conflict(String),

  /// The remote call failed and the policy forbids falling back.
  #[error(transparent)]
  Network(#[from] RemoteError),

  /// The local store failed.
  #[error(transparent)]
  Store(#[from] StoreError),

  /// A request body or overlay merge could not be (de)serialized.
  #[error("serialization failed: {0}")]
  Serde(#[from] serde_json::Error),
}

impl AccessError {
  pub fn not_found(entity: &'static str, id: u64) -> Self {
    Self::NotFound { entity, id }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}
