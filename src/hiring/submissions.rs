//! Assessment submissions. Append-only; a submit never fails for lack of network.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::fetch;
use super::types::{IntoId, NewSubmission, SubmitReceipt, Submission};
use crate::cache::{FallbackLayer, Fetched};
use crate::db::LocalStore;
use crate::error::AccessError;
use crate::remote::{Gateway, OkResponse, RemoteRequest, SubmitBody};

pub struct SubmissionService<G> {
  gateway: Arc<G>,
  store: Arc<LocalStore>,
  layer: FallbackLayer,
}

impl<G: Gateway> SubmissionService<G> {
  pub fn new(gateway: Arc<G>, store: Arc<LocalStore>, layer: FallbackLayer) -> Self {
    Self {
      gateway,
      store,
      layer,
    }
  }

  /// Submit answers for a job's assessment.
  ///
  /// When the remote service is unreachable the submission is kept locally
  /// and acknowledged with `local: true`.
  pub async fn submit(
    &self,
    job_id: impl IntoId,
    input: NewSubmission,
  ) -> Result<Fetched<SubmitReceipt>, AccessError> {
    let job_id = job_id.into_id()?;
    let body = serde_json::to_value(SubmitBody {
      candidate_id: input.candidate_id,
      answers: input.answers.clone(),
    })?;

    self
      .layer
      .mutate(
        "submissions.submit",
        || async move {
          let request = RemoteRequest::post(format!("/assessments/{}/submit", job_id), body);
          fetch::<G, OkResponse>(self.gateway.as_ref(), request)
            .await
            .map(|ack| SubmitReceipt {
              ok: ack.ok,
              local: false,
              id: None,
            })
        },
        || {
          let saved = self.store.append_submission(Submission {
            id: 0,
            job_id,
            candidate_id: input.candidate_id,
            submitted_at: Utc::now(),
            answers: input.answers,
            local_only: true,
          })?;
          info!(id = saved.id, job_id, "submission kept locally");
          Ok(SubmitReceipt {
            ok: true,
            local: true,
            id: Some(saved.id),
          })
        },
      )
      .await
  }

  /// Submissions recorded in the local store for a job. The remote service
  /// has no listing endpoint, so this never leaves the process.
  pub fn for_job(&self, job_id: impl IntoId) -> Result<Fetched<Vec<Submission>>, AccessError> {
    let job_id = job_id.into_id()?;
    Ok(Fetched::local_only(self.store.submissions_for_job(job_id)?))
  }
}
