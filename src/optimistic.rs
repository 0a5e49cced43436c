//! Optimistic mutations over a caller-owned collection.

use std::fmt::Display;
use std::future::Future;
use tracing::warn;

use crate::cache::Record;

/// Set a field on the matching item right away, then run `write`.
///
/// If `write` fails the field is put back to the value it held before the
/// call. There is no retry. The write's result is handed back as-is; when
/// no item has `id` nothing is changed locally but the write still runs.
pub async fn optimistic_update<T, V, R, E, F, Fut>(
  items: &mut [T],
  id: u64,
  field: F,
  next: V,
  write: impl FnOnce() -> Fut,
) -> Result<R, E>
where
  T: Record,
  F: Fn(&mut T) -> &mut V,
  Fut: Future<Output = Result<R, E>>,
  E: Display,
{
  let previous = items
    .iter_mut()
    .find(|item| item.id() == id)
    .map(|item| std::mem::replace(field(item), next));

  let result = write().await;

  if let (Err(error), Some(previous)) = (&result, previous) {
    if let Some(item) = items.iter_mut().find(|item| item.id() == id) {
      *field(item) = previous;
    }
    warn!(kind = T::kind(), id, %error, "optimistic update rolled back");
  }

  result
}
