//! Assessment documents, one per job, always written whole.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::fetch;
use super::types::{AssessmentDocument, IntoId};
use crate::cache::{FallbackLayer, Fetched};
use crate::db::LocalStore;
use crate::error::AccessError;
use crate::remote::{Gateway, RemoteRequest};

pub struct AssessmentService<G> {
  gateway: Arc<G>,
  store: Arc<LocalStore>,
  layer: FallbackLayer,
}

impl<G: Gateway> AssessmentService<G> {
  pub fn new(gateway: Arc<G>, store: Arc<LocalStore>, layer: FallbackLayer) -> Self {
    Self {
      gateway,
      store,
      layer,
    }
  }

  pub async fn get(&self, job_id: impl IntoId) -> Result<Fetched<AssessmentDocument>, AccessError> {
    let job_id = job_id.into_id()?;

    self
      .layer
      .resolve(
        "assessments.get",
        || fetch(self.gateway.as_ref(), RemoteRequest::get(format!("/assessments/{}", job_id))),
        || {
          self
            .store
            .assessment(job_id)?
            .ok_or_else(|| AccessError::not_found("assessment", job_id))
        },
      )
      .await
  }

  /// Replace the document for its job. Invalid documents never leave the process.
  pub async fn put(&self, doc: AssessmentDocument) -> Result<Fetched<AssessmentDocument>, AccessError> {
    doc.validate().map_err(AccessError::Validation)?;
    let body = serde_json::to_value(&doc)?;
    let path = format!("/assessments/{}", doc.job_id);

    self
      .layer
      .mutate(
        "assessments.put",
        || fetch(self.gateway.as_ref(), RemoteRequest::put(path, body)),
        || {
          let mut doc = doc;
          doc.updated_at = Some(Utc::now());
          self.store.put_assessment(&doc)?;
          debug!(job_id = doc.job_id, questions = doc.question_count(), "stored assessment locally");
          Ok(doc)
        },
      )
      .await
  }
}
