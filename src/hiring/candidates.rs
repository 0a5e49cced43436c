//! Candidate service: pipeline membership, stage transitions and history.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::types::{
  Candidate, CandidatePatch, IntoId, JobStatus, NewCandidate, Stage, TimelineEntry,
};
use super::{fetch, overlay_one, overlay_page, required};
use crate::cache::{FallbackLayer, Fetched, Overlays};
use crate::db::LocalStore;
use crate::error::AccessError;
use crate::query::{CandidateQuery, Page};
use crate::remote::{Gateway, ItemsResponse, RemoteRequest};

/// Author label for entries written without one.
const SYSTEM_AUTHOR: &str = "system";

pub struct CandidateService<G> {
  gateway: Arc<G>,
  store: Arc<LocalStore>,
  overlays: Arc<Overlays>,
  layer: FallbackLayer,
}

impl<G: Gateway> CandidateService<G> {
  pub fn new(
    gateway: Arc<G>,
    store: Arc<LocalStore>,
    overlays: Arc<Overlays>,
    layer: FallbackLayer,
  ) -> Self {
    Self {
      gateway,
      store,
      overlays,
      layer,
    }
  }

  #[instrument(skip(self), level = "debug")]
  pub async fn list(&self, query: &CandidateQuery) -> Result<Fetched<Page<Candidate>>, AccessError> {
    let request = RemoteRequest::get("/candidates").with_query(query.to_params());

    let fetched = self
      .layer
      .resolve(
        "candidates.list",
        || fetch(self.gateway.as_ref(), request),
        || Ok(query.apply(self.store.candidates()?)),
      )
      .await?;

    fetched.try_map(|page| overlay_page(&self.overlays.candidates, page))
  }

  pub async fn get(&self, id: impl IntoId) -> Result<Fetched<Candidate>, AccessError> {
    let id = id.into_id()?;

    let fetched = self
      .layer
      .resolve(
        "candidates.get",
        || fetch(self.gateway.as_ref(), RemoteRequest::get(format!("/candidates/{}", id))),
        || self.load(id),
      )
      .await?;

    fetched.try_map(|candidate| overlay_one(&self.overlays.candidates, candidate))
  }

  fn load(&self, id: u64) -> Result<Candidate, AccessError> {
    self
      .store
      .candidate(id)?
      .ok_or_else(|| AccessError::not_found("candidate", id))
  }

  /// Stage history, oldest first.
  pub async fn timeline(&self, id: impl IntoId) -> Result<Fetched<Vec<TimelineEntry>>, AccessError> {
    let id = id.into_id()?;

    self
      .layer
      .resolve(
        "candidates.timeline",
        || async move {
          let request = RemoteRequest::get(format!("/candidates/{}/timeline", id));
          fetch::<G, ItemsResponse<TimelineEntry>>(self.gateway.as_ref(), request)
            .await
            .map(|response| response.items)
        },
        || {
          self.load(id)?;
          Ok(self.store.timeline(id)?)
        },
      )
      .await
  }

  #[instrument(skip(self, input), fields(email = %input.email), level = "debug")]
  pub async fn create(&self, mut input: NewCandidate) -> Result<Fetched<Candidate>, AccessError> {
    input.name = required("name", &input.name)?;
    input.email = required("email", &input.email)?;
    let body = serde_json::to_value(&input)?;

    self
      .layer
      .mutate(
        "candidates.create",
        || fetch(self.gateway.as_ref(), RemoteRequest::post("/candidates", body)),
        || self.create_local(input),
      )
      .await
  }

  fn create_local(&self, input: NewCandidate) -> Result<Candidate, AccessError> {
    let job_id = match input.job_id {
      Some(job_id) => job_id,
      None => self.default_job()?,
    };
    let stage = input.stage.as_deref().map(Stage::coerce).unwrap_or_default();
    let now = Utc::now();

    let candidate = Candidate {
      id: 0,
      name: input.name,
      email: input.email,
      stage,
      job_id,
      phone: input.phone,
      location: input.location,
      created_at: now,
    };
    let opening = TimelineEntry {
      id: 0,
      candidate_id: 0,
      stage,
      ts: now,
      by: SYSTEM_AUTHOR.to_string(),
      note: Some("Application received".to_string()),
    };

    let (candidate, _) = self.store.insert_candidate(candidate, opening)?;
    debug!(id = candidate.id, job_id, "created candidate locally");
    Ok(candidate)
  }

  /// First active job by rank, else the first job by rank.
  fn default_job(&self) -> Result<u64, AccessError> {
    let jobs = self.store.jobs()?;
    jobs
      .iter()
      .find(|j| j.status == JobStatus::Active)
      .or_else(|| jobs.first())
      .map(|j| j.id)
      .ok_or_else(|| AccessError::Validation("no job to assign the candidate to".to_string()))
  }

  pub async fn update(
    &self,
    id: impl IntoId,
    patch: CandidatePatch,
  ) -> Result<Fetched<Candidate>, AccessError> {
    let id = id.into_id()?;
    if let Some(name) = &patch.name {
      required("name", name)?;
    }
    if let Some(email) = &patch.email {
      required("email", email)?;
    }
    let body = serde_json::to_value(&patch)?;

    self
      .layer
      .mutate(
        "candidates.update",
        || {
          fetch(
            self.gateway.as_ref(),
            RemoteRequest::patch(format!("/candidates/{}", id), body),
          )
        },
        || self.update_local(id, patch),
      )
      .await
  }

  /// Apply a patch to the stored candidate.
  ///
  /// A stage equal to the stored one is dropped. A changed stage appends
  /// exactly one timeline entry in the same transaction as the write.
  fn update_local(&self, id: u64, patch: CandidatePatch) -> Result<Candidate, AccessError> {
    let stored = self.load(id)?;
    let mut candidate = stored.clone();

    if let Some(name) = patch.name {
      candidate.name = name.trim().to_string();
    }
    if let Some(email) = patch.email {
      candidate.email = email.trim().to_string();
    }
    if let Some(job_id) = patch.job_id {
      candidate.job_id = job_id;
    }
    if let Some(phone) = patch.phone {
      candidate.phone = Some(phone);
    }
    if let Some(location) = patch.location {
      candidate.location = Some(location);
    }

    let transition = patch.stage.filter(|stage| *stage != stored.stage);
    if let Some(stage) = transition {
      candidate.stage = stage;
    }

    if candidate == stored {
      debug!(id, "candidate patch changed nothing");
      return Ok(candidate);
    }

    match transition {
      Some(stage) => {
        let entry = TimelineEntry {
          id: 0,
          candidate_id: id,
          stage,
          ts: Utc::now(),
          by: patch.by.unwrap_or_else(|| SYSTEM_AUTHOR.to_string()),
          note: patch.note,
        };
        self.store.record_transition(&candidate, entry)?;
        debug!(id, from = %stored.stage, to = %stage, "recorded stage transition");
      }
      None => self.store.put_candidate(&candidate)?,
    }

    Ok(candidate)
  }

  /// Move a candidate to `stage`, crediting `by` in the timeline.
  pub async fn transition(
    &self,
    id: impl IntoId,
    stage: Stage,
    by: &str,
  ) -> Result<Fetched<Candidate>, AccessError> {
    let patch = CandidatePatch {
      by: Some(by.to_string()),
      ..CandidatePatch::stage(stage)
    };
    self.update(id, patch).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{DataSource, FetchPolicy};
  use crate::hiring::types::{Job, NewJob};
  use crate::hiring::Services;
  use crate::test_support::{memory_store, seeded_store, services, SimulatedRemote, StubGateway};
  use pretty_assertions::assert_eq;
  use serde_json::json;

  fn pick_at(store: &LocalStore, stage: Stage) -> Candidate {
    store
      .candidates()
      .unwrap()
      .into_iter()
      .find(|c| c.stage == stage)
      .unwrap()
  }

  #[tokio::test]
  async fn test_list_parity_between_remote_and_fallback() {
    let store = seeded_store(13);
    let remote = Arc::new(SimulatedRemote::new(Vec::new(), store.candidates().unwrap()));
    let svc = Services::new(remote.clone(), store, Arc::new(Overlays::new()), FetchPolicy::NetworkFirst);

    for search in ["", "ada", " HOPPER ", "example.com", "nobody"] {
      for stage in [None, Some(Stage::Applied), Some(Stage::Tech), Some(Stage::Rejected)] {
        for job_id in [None, Some(1), Some(4)] {
          for (page, size) in [(1, 10), (2, 7), (5, 3), (40, 10)] {
            let query = CandidateQuery::new()
              .with_search(search)
              .with_stage(stage)
              .with_job(job_id)
              .with_page(page, size);

            remote.set_online(true);
            let online = svc.candidates.list(&query).await.unwrap();
            remote.set_online(false);
            let offline = svc.candidates.list(&query).await.unwrap();

            assert_eq!(online.source, DataSource::Remote);
            assert_eq!(offline.source, DataSource::LocalFallback);
            assert_eq!(online.data, offline.data, "query {:?}", query);
          }
        }
      }
    }
  }

  #[tokio::test]
  async fn test_same_stage_patch_writes_no_history() {
    let store = seeded_store(5);
    let svc = services(StubGateway::offline(), store.clone());
    let candidate = pick_at(&store, Stage::Screen);
    let before = store.timeline(candidate.id).unwrap().len();

    let result = svc
      .candidates
      .transition(candidate.id, Stage::Screen, "recruiter")
      .await
      .unwrap();

    assert_eq!(result.data.stage, Stage::Screen);
    assert_eq!(store.timeline(candidate.id).unwrap().len(), before);
  }

  #[tokio::test]
  async fn test_stage_change_appends_one_entry() {
    let store = seeded_store(5);
    let svc = services(StubGateway::offline(), store.clone());
    let candidate = pick_at(&store, Stage::Screen);
    let before = store.timeline(candidate.id).unwrap();

    let patch = CandidatePatch {
      by: Some("recruiter".to_string()),
      note: Some("strong take-home".to_string()),
      ..CandidatePatch::stage(Stage::Tech)
    };
    let moved = svc.candidates.update(candidate.id, patch).await.unwrap();
    assert_eq!(moved.data.stage, Stage::Tech);

    let after = store.timeline(candidate.id).unwrap();
    assert_eq!(after.len(), before.len() + 1);
    let last = after.last().unwrap();
    assert_eq!(last.stage, Stage::Tech);
    assert_eq!(last.by, "recruiter");
    assert_eq!(last.note.as_deref(), Some("strong take-home"));
    assert_eq!(store.candidate(candidate.id).unwrap().unwrap().stage, Stage::Tech);
  }

  #[tokio::test]
  async fn test_field_patch_without_stage_keeps_history() {
    let store = seeded_store(5);
    let svc = services(StubGateway::offline(), store.clone());
    let candidate = pick_at(&store, Stage::Applied);
    let before = store.timeline(candidate.id).unwrap().len();

    let patch = CandidatePatch {
      phone: Some("+1-555-0100".to_string()),
      stage: Some(Stage::Applied),
      ..CandidatePatch::default()
    };
    svc.candidates.update(candidate.id, patch).await.unwrap();

    let stored = store.candidate(candidate.id).unwrap().unwrap();
    assert_eq!(stored.phone.as_deref(), Some("+1-555-0100"));
    assert_eq!(store.timeline(candidate.id).unwrap().len(), before);
  }

  #[tokio::test]
  async fn test_create_assigns_first_active_job_and_opens_timeline() {
    let store = memory_store();
    let svc = services(StubGateway::offline(), store.clone());
    let archived = svc.jobs.create(NewJob::titled("Old Role")).await.unwrap().data;
    svc.jobs.archive(archived.id).await.unwrap();
    let open: Job = svc.jobs.create(NewJob::titled("Open Role")).await.unwrap().data;

    let created = svc
      .candidates
      .create(NewCandidate {
        name: " Ada Lovelace ".to_string(),
        email: "ada@example.com".to_string(),
        stage: Some("interviewing".to_string()),
        ..NewCandidate::default()
      })
      .await
      .unwrap();

    assert_eq!(created.source, DataSource::LocalFallback);
    assert_eq!(created.data.job_id, open.id);
    assert_eq!(created.data.name, "Ada Lovelace");
    assert_eq!(created.data.stage, Stage::Applied);

    let history = store.timeline(created.data.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].stage, Stage::Applied);
  }

  #[tokio::test]
  async fn test_create_without_jobs_is_rejected() {
    let svc = services(StubGateway::offline(), memory_store());
    let err = svc
      .candidates
      .create(NewCandidate {
        name: "Grace".to_string(),
        email: "grace@example.com".to_string(),
        ..NewCandidate::default()
      })
      .await
      .unwrap_err();
    assert!(matches!(err, AccessError::Validation(_)));
  }

  #[tokio::test]
  async fn test_remote_stage_is_coerced() {
    let gateway = StubGateway::scripted([Ok(json!({
      "id": 9,
      "name": "Alan",
      "email": "alan@example.com",
      "stage": "phone-screen",
      "jobId": 1,
    }))]);
    let svc = services(gateway, memory_store());

    let fetched = svc.candidates.get(9u64).await.unwrap();
    assert!(fetched.is_authoritative());
    assert_eq!(fetched.data.stage, Stage::Applied);
  }

  #[tokio::test]
  async fn test_timeline_falls_back_and_reports_missing() {
    let store = seeded_store(5);
    let svc = services(StubGateway::offline(), store.clone());
    let candidate = pick_at(&store, Stage::Offer);

    let history = svc.candidates.timeline(candidate.id).await.unwrap();
    assert_eq!(history.source, DataSource::LocalFallback);
    let stages: Vec<Stage> = history.data.iter().map(|e| e.stage).collect();
    assert_eq!(stages, vec![Stage::Applied, Stage::Screen, Stage::Tech, Stage::Offer]);

    let err = svc.candidates.timeline(100_000u64).await.unwrap_err();
    assert!(err.is_not_found());
  }

  #[tokio::test]
  async fn test_remote_timeline_unwraps_items() {
    let gateway = StubGateway::scripted([Ok(json!({
      "items": [
        { "id": 1, "candidateId": 3, "stage": "applied", "ts": "2025-02-01T10:00:00Z", "by": "hr" }
      ]
    }))]);
    let svc = services(gateway, memory_store());

    let history = svc.candidates.timeline("3").await.unwrap();
    assert!(history.is_authoritative());
    assert_eq!(history.data.len(), 1);
    assert_eq!(history.data[0].by, "hr");
  }

  #[tokio::test]
  async fn test_tombstoned_candidate_leaves_list_and_total() {
    let store = seeded_store(5);
    let svc = services(StubGateway::offline(), store.clone());
    let query = CandidateQuery::new().with_page(1, 100);
    let first = svc.candidates.list(&query).await.unwrap().data;

    svc.overlays().candidates.tombstone(first.items[0].id);
    let second = svc.candidates.list(&query).await.unwrap().data;
    assert_eq!(second.total, first.total - 1);
    assert_eq!(second.items.len(), first.items.len() - 1);
    assert!(svc.candidates.get(first.items[0].id).await.unwrap_err().is_not_found());
  }
}
