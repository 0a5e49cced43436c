//! Fallback layer that decides between the remote service and the local store.

use std::future::Future;
use tracing::{debug, warn};

use crate::error::AccessError;
use crate::remote::RemoteError;

use super::traits::Fetched;

/// Which paths an operation may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
  /// Try the remote service; on any failure answer from the local store.
  #[default]
  NetworkFirst,
  /// Never call the remote service.
  LocalOnly,
  /// Call the remote service and surface its failures.
  NetworkOnly,
}

/// Runs a remote attempt and a local alternative according to a policy.
///
/// Reads and writes go through the same path: the remote result wins when
/// there is one, and the local closure is only evaluated when it is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackLayer {
  policy: FetchPolicy,
}

impl FallbackLayer {
  pub fn new(policy: FetchPolicy) -> Self {
    Self { policy }
  }

  pub fn policy(&self) -> FetchPolicy {
    self.policy
  }

  /// Resolve a read.
  ///
  /// 1. `LocalOnly` - run `local` immediately
  /// 2. Otherwise await `remote`; success is returned unmodified
  /// 3. On failure, `NetworkOnly` surfaces the error
  /// 4. `NetworkFirst` runs `local` and tags the result as a fallback
  ///
  /// No timeout is applied: the fallback only runs once the remote call settles.
  pub async fn resolve<T, F, Fut, L>(
    &self,
    op: &'static str,
    remote: F,
    local: L,
  ) -> Result<Fetched<T>, AccessError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
    L: FnOnce() -> Result<T, AccessError>,
  {
    self.run(op, Side::Read, remote, local).await
  }

  /// Resolve a write.
  ///
  /// Same as [`resolve`](Self::resolve), except that a 2xx reply whose body
  /// cannot be decoded is surfaced as a network error. The service has
  /// already applied the write, so it must not be applied locally too.
  pub async fn mutate<T, F, Fut, L>(
    &self,
    op: &'static str,
    remote: F,
    local: L,
  ) -> Result<Fetched<T>, AccessError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
    L: FnOnce() -> Result<T, AccessError>,
  {
    self.run(op, Side::Write, remote, local).await
  }

  async fn run<T, F, Fut, L>(
    &self,
    op: &'static str,
    side: Side,
    remote: F,
    local: L,
  ) -> Result<Fetched<T>, AccessError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
    L: FnOnce() -> Result<T, AccessError>,
  {
    if self.policy == FetchPolicy::LocalOnly {
      return local().map(Fetched::local_only);
    }

    match remote().await {
      Ok(data) => Ok(Fetched::from_remote(data)),
      Err(error) if self.policy == FetchPolicy::NetworkOnly => {
        warn!(op, %error, "remote call failed");
        Err(AccessError::Network(error))
      }
      Err(error) if side == Side::Write && error.was_delivered() => {
        warn!(op, %error, "remote accepted the write but the reply did not decode");
        Err(AccessError::Network(error))
      }
      Err(error) => {
        debug!(op, %error, status = ?error.status(), "remote call failed, using local store");
        local().map(Fetched::from_fallback)
      }
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
  Read,
  Write,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::DataSource;
  use crate::remote::RemoteStatusError;
  use std::cell::Cell;

  fn down() -> RemoteError {
    RemoteStatusError::new(503, serde_json::Value::Null).into()
  }

  #[tokio::test]
  async fn test_remote_success_skips_local() {
    let local_ran = Cell::new(false);
    let layer = FallbackLayer::default();

    let result = layer
      .resolve(
        "test",
        || async { Ok::<_, RemoteError>(1) },
        || {
          local_ran.set(true);
          Ok(2)
        },
      )
      .await
      .unwrap();

    assert_eq!(result.data, 1);
    assert_eq!(result.source, DataSource::Remote);
    assert!(!local_ran.get());
  }

  #[tokio::test]
  async fn test_remote_failure_falls_back_silently() {
    let layer = FallbackLayer::new(FetchPolicy::NetworkFirst);

    let result = layer
      .resolve("test", || async { Err::<i32, _>(down()) }, || Ok(2))
      .await
      .unwrap();

    assert_eq!(result.data, 2);
    assert_eq!(result.source, DataSource::LocalFallback);
  }

  #[tokio::test]
  async fn test_local_errors_surface_after_fallback() {
    let layer = FallbackLayer::default();

    let err = layer
      .resolve(
        "test",
        || async { Err::<i32, _>(down()) },
        || Err(AccessError::not_found("job", 9)),
      )
      .await
      .unwrap_err();

    assert!(err.is_not_found());
  }

  #[tokio::test]
  async fn test_network_only_surfaces_remote_error() {
    let layer = FallbackLayer::new(FetchPolicy::NetworkOnly);

    let err = layer
      .resolve("test", || async { Err::<i32, _>(down()) }, || Ok(2))
      .await
      .unwrap_err();

    assert!(matches!(err, AccessError::Network(e) if e.status() == Some(503)));
  }

  #[tokio::test]
  async fn test_local_only_never_calls_remote() {
    let remote_ran = Cell::new(false);
    let layer = FallbackLayer::new(FetchPolicy::LocalOnly);

    let result = layer
      .resolve(
        "test",
        || {
          remote_ran.set(true);
          async { Ok::<_, RemoteError>(1) }
        },
        || Ok(2),
      )
      .await
      .unwrap();

    assert_eq!(result.data, 2);
    assert_eq!(result.source, DataSource::LocalOnly);
    assert!(!remote_ran.get());
  }

  #[tokio::test]
  async fn test_undecodable_write_reply_is_not_replayed_locally() {
    let local_ran = Cell::new(false);
    let layer = FallbackLayer::new(FetchPolicy::NetworkFirst);

    let err = layer
      .mutate(
        "test",
        || async { Err::<i32, _>(RemoteError::Codec("invalid type".to_string())) },
        || {
          local_ran.set(true);
          Ok(2)
        },
      )
      .await
      .unwrap_err();

    assert!(matches!(err, AccessError::Network(RemoteError::Codec(_))));
    assert!(!local_ran.get());
  }

  #[tokio::test]
  async fn test_undecodable_read_reply_still_falls_back() {
    let layer = FallbackLayer::new(FetchPolicy::NetworkFirst);

    let result = layer
      .resolve(
        "test",
        || async { Err::<i32, _>(RemoteError::Codec("invalid type".to_string())) },
        || Ok(2),
      )
      .await
      .unwrap();

    assert_eq!(result.source, DataSource::LocalFallback);
  }

  #[tokio::test]
  async fn test_failed_write_falls_back() {
    let layer = FallbackLayer::new(FetchPolicy::NetworkFirst);

    let result = layer
      .mutate("test", || async { Err::<i32, _>(down()) }, || Ok(2))
      .await
      .unwrap();

    assert_eq!(result.data, 2);
    assert_eq!(result.source, DataSource::LocalFallback);
  }
}
