//! Entity services for the hiring pipeline.
//!
//! Every operation goes network-first through the [`FallbackLayer`] and
//! mirrors its semantics against the [`LocalStore`] when the remote call
//! fails. Job and candidate reads then pass through the caller's session
//! overlay.

mod assessments;
mod candidates;
mod jobs;
mod submissions;
pub mod types;

pub use assessments::AssessmentService;
pub use candidates::CandidateService;
pub use jobs::{slugify, JobService};
pub use submissions::SubmissionService;

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::cache::{FallbackLayer, FetchPolicy, Overlays, Record, SessionOverlay};
use crate::db::LocalStore;
use crate::error::AccessError;
use crate::query::Page;
use crate::remote::{decode, Gateway, RemoteError, RemoteRequest};

/// All entity services, sharing one gateway, store and overlay.
pub struct Services<G> {
  pub jobs: JobService<G>,
  pub candidates: CandidateService<G>,
  pub assessments: AssessmentService<G>,
  pub submissions: SubmissionService<G>,
  overlays: Arc<Overlays>,
}

impl<G: Gateway> Services<G> {
  pub fn new(
    gateway: Arc<G>,
    store: Arc<LocalStore>,
    overlays: Arc<Overlays>,
    policy: FetchPolicy,
  ) -> Self {
    let layer = FallbackLayer::new(policy);
    Self {
      jobs: JobService::new(gateway.clone(), store.clone(), overlays.clone(), layer),
      candidates: CandidateService::new(gateway.clone(), store.clone(), overlays.clone(), layer),
      assessments: AssessmentService::new(gateway.clone(), store.clone(), layer),
      submissions: SubmissionService::new(gateway, store, layer),
      overlays,
    }
  }

  /// Session edits shared by the job and candidate services.
  pub fn overlays(&self) -> &Overlays {
    &self.overlays
  }
}

/// Send a request and decode its body.
pub(crate) async fn fetch<G, T>(gateway: &G, request: RemoteRequest) -> Result<T, RemoteError>
where
  G: Gateway,
  T: DeserializeOwned,
{
  decode(gateway.send(request).await?)
}

/// Apply a session overlay to a list page. Rows hidden by a tombstone are
/// also taken off the total.
pub(crate) fn overlay_page<T: Record>(
  overlay: &SessionOverlay,
  page: Page<T>,
) -> Result<Page<T>, AccessError> {
  let before = page.items.len();
  let items = overlay.apply(page.items)?;
  let removed = before - items.len();

  Ok(Page {
    total: page.total.saturating_sub(removed),
    items,
    page: page.page,
    page_size: page.page_size,
  })
}

/// Apply a session overlay to a single record; tombstoned means not found.
pub(crate) fn overlay_one<T: Record>(overlay: &SessionOverlay, row: T) -> Result<T, AccessError> {
  let id = row.id();
  overlay
    .apply_one(row)?
    .ok_or_else(|| AccessError::not_found(T::kind(), id))
}

/// Trimmed required text field.
pub(crate) fn required(field: &str, value: &str) -> Result<String, AccessError> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(AccessError::Validation(format!("{} is required", field)));
  }
  Ok(trimmed.to_string())
}
