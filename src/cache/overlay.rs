//! Session overlay: in-memory, never-persisted edits layered over reads.
//!
//! A patch is a shallow map of wire field names to JSON values, optionally
//! marked as a tombstone. Patches are applied on top of whatever path
//! answered a read, and are never sent to the remote service.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::traits::Record;

/// Wire name of the rank field a patch may override.
pub const RANK_FIELD: &str = "order";

/// Field-level override for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
  pub fields: Map<String, Value>,
  /// Exclude the record from every read
  pub deleted: bool,
}

/// Overlay for one entity kind.
#[derive(Debug, Default)]
pub struct SessionOverlay {
  patches: RwLock<HashMap<u64, SessionPatch>>,
}

impl SessionOverlay {
  pub fn new() -> Self {
    Self::default()
  }

  // The map holds plain data, so a poisoned lock is still consistent.
  fn read(&self) -> RwLockReadGuard<'_, HashMap<u64, SessionPatch>> {
    self.patches.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, HashMap<u64, SessionPatch>> {
    self.patches.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// Merge `fields` into the record's patch; later writes win per field.
  pub fn patch(&self, id: u64, fields: Map<String, Value>) {
    self.write().entry(id).or_default().fields.extend(fields);
  }

  /// Set a single field.
  pub fn set(&self, id: u64, field: &str, value: impl Into<Value>) {
    self
      .write()
      .entry(id)
      .or_default()
      .fields
      .insert(field.to_string(), value.into());
  }

  /// Soft-delete: hide the record from every subsequent read.
  pub fn tombstone(&self, id: u64) {
    self.write().entry(id).or_default().deleted = true;
  }

  pub fn get(&self, id: u64) -> Option<SessionPatch> {
    self.read().get(&id).cloned()
  }

  /// Drop one record's patch.
  pub fn clear(&self, id: u64) -> Option<SessionPatch> {
    self.write().remove(&id)
  }

  /// Drop every patch.
  pub fn reset(&self) {
    self.write().clear();
  }

  pub fn is_empty(&self) -> bool {
    self.read().is_empty()
  }

  /// Apply the overlay to a read result.
  ///
  /// Tombstoned rows are removed, the rest are shallow-merged with their
  /// patch, and the result is stable-sorted by effective rank: patched rank,
  /// else the row's own rank, else its input position. A rank set in the
  /// session beats a stored rank of the same value.
  pub fn apply<T: Record>(&self, rows: Vec<T>) -> Result<Vec<T>, serde_json::Error> {
    let patches = self.read();
    let mut ranked = Vec::with_capacity(rows.len());

    for (position, row) in rows.into_iter().enumerate() {
      let patch = patches.get(&row.id());
      if patch.is_some_and(|p| p.deleted) {
        continue;
      }

      let patched_rank = patch.and_then(|p| p.fields.get(RANK_FIELD)).and_then(Value::as_i64);
      let rank = patched_rank
        .or_else(|| row.rank())
        .unwrap_or(position as i64);

      let row = match patch {
        Some(p) => merge(row, &p.fields)?,
        None => row,
      };
      // On equal rank a session-patched rank sorts first.
      ranked.push(((rank, patched_rank.is_none()), row));
    }

    ranked.sort_by_key(|(key, _)| *key);

    Ok(ranked.into_iter().map(|(_, row)| row).collect())
  }

  /// Apply the overlay to a single record; `None` when it is tombstoned.
  pub fn apply_one<T: Record>(&self, row: T) -> Result<Option<T>, serde_json::Error> {
    match self.get(row.id()) {
      Some(patch) if patch.deleted => Ok(None),
      Some(patch) => merge(row, &patch.fields).map(Some),
      None => Ok(Some(row)),
    }
  }
}

/// Shallow merge: top-level patch fields replace the record's fields.
fn merge<T: Record>(row: T, fields: &Map<String, Value>) -> Result<T, serde_json::Error> {
  if fields.is_empty() {
    return Ok(row);
  }

  let mut value = serde_json::to_value(&row)?;
  if let Value::Object(map) = &mut value {
    for (key, field) in fields {
      map.insert(key.clone(), field.clone());
    }
  }
  serde_json::from_value(value)
}

/// Overlays for every entity kind that supports session edits.
///
/// Owned by the caller and shared by reference with the entity services;
/// it lives as long as the caller keeps it.
#[derive(Debug, Default)]
pub struct Overlays {
  pub jobs: SessionOverlay,
  pub candidates: SessionOverlay,
}

impl Overlays {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reset(&self) {
    self.jobs.reset();
    self.candidates.reset();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use serde::{Deserialize, Serialize};
  use serde_json::json;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Row {
    id: u64,
    title: String,
    order: Option<u32>,
  }

  impl Record for Row {
    fn id(&self) -> u64 {
      self.id
    }

    fn kind() -> &'static str {
      "row"
    }

    fn rank(&self) -> Option<i64> {
      self.order.map(i64::from)
    }
  }

  fn row(id: u64, order: Option<u32>) -> Row {
    Row {
      id,
      title: format!("row {}", id),
      order,
    }
  }

  fn ids(rows: &[Row]) -> Vec<u64> {
    rows.iter().map(|r| r.id).collect()
  }

  #[test]
  fn test_patched_rank_moves_row_ahead() {
    let overlay = SessionOverlay::new();
    let rows: Vec<Row> = (0..5).map(|i| row(i + 1, Some(i as u32))).collect();

    // Row 4 has rank 3; patching it to 0 puts it ahead of ranks 0, 1 and 2.
    overlay.set(4, RANK_FIELD, 0);
    let merged = overlay.apply(rows).unwrap();

    assert_eq!(ids(&merged), vec![4, 1, 2, 3, 5]);
    assert_eq!(merged[0].order, Some(0));
  }

  #[test]
  fn test_tombstone_hides_row_until_reset() {
    let overlay = SessionOverlay::new();
    overlay.tombstone(2);

    for _ in 0..3 {
      let merged = overlay
        .apply(vec![row(1, Some(0)), row(2, Some(1)), row(3, Some(2))])
        .unwrap();
      assert_eq!(ids(&merged), vec![1, 3]);
    }
    assert_eq!(overlay.apply_one(row(2, Some(1))).unwrap(), None);

    overlay.reset();
    assert!(overlay.is_empty());
    assert_eq!(overlay.apply_one(row(2, Some(1))).unwrap(), Some(row(2, Some(1))));
  }

  #[test]
  fn test_patch_fields_win_and_accumulate() {
    let overlay = SessionOverlay::new();
    overlay.set(1, "title", "Renamed");
    let mut more = Map::new();
    more.insert("order".to_string(), json!(9));
    overlay.patch(1, more);

    let merged = overlay.apply_one(row(1, Some(0))).unwrap().unwrap();
    assert_eq!(merged.title, "Renamed");
    assert_eq!(merged.order, Some(9));
    assert_eq!(overlay.get(1).unwrap().fields.len(), 2);
  }

  #[test]
  fn test_unranked_rows_fall_back_to_position() {
    let overlay = SessionOverlay::new();
    overlay.set(3, "title", "touched");

    let merged = overlay
      .apply(vec![row(5, None), row(3, None), row(8, None)])
      .unwrap();
    assert_eq!(ids(&merged), vec![5, 3, 8]);
    assert_eq!(merged[1].title, "touched");
  }

  #[test]
  fn test_bad_patch_type_is_an_error() {
    let overlay = SessionOverlay::new();
    overlay.set(1, "title", 12);
    assert!(overlay.apply_one(row(1, None)).is_err());
  }

  #[test]
  fn test_overlays_reset_clears_every_kind() {
    let overlays = Overlays::new();
    overlays.jobs.tombstone(1);
    overlays.candidates.set(1, "name", "x");

    overlays.reset();
    assert!(overlays.jobs.is_empty());
    assert!(overlays.candidates.is_empty());
    assert!(overlays.jobs.clear(1).is_none());
  }
}
