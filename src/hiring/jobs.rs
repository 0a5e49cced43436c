//! Job service: listing, creation, patching and dense-rank reordering.

use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::types::{IntoId, Job, JobPatch, JobStatus, NewJob};
use super::{fetch, overlay_one, overlay_page, required};
use crate::cache::{FallbackLayer, Fetched, Overlays, RANK_FIELD};
use crate::db::LocalStore;
use crate::error::AccessError;
use crate::query::{JobQuery, Page};
use crate::remote::{Gateway, OkResponse, RemoteRequest, ReorderBody};

/// Derive a URL slug from a title.
///
/// ASCII alphanumerics are lowercased and kept; every other run of
/// characters becomes a single `-`, never leading or trailing.
pub fn slugify(title: &str) -> String {
  let mut slug = String::with_capacity(title.len());
  let mut gap = false;

  for c in title.chars() {
    if c.is_ascii_alphanumeric() {
      if gap && !slug.is_empty() {
        slug.push('-');
      }
      gap = false;
      slug.push(c.to_ascii_lowercase());
    } else {
      gap = true;
    }
  }

  slug
}

/// First free slug among `base`, `base-2`, `base-3`, ...
fn unique_slug(base: &str, jobs: &[Job]) -> String {
  let base = if base.is_empty() { "job" } else { base };
  let taken: HashSet<&str> = jobs.iter().map(|j| j.slug.as_str()).collect();
  if !taken.contains(base) {
    return base.to_string();
  }

  (2..)
    .map(|n| format!("{}-{}", base, n))
    .find(|slug| !taken.contains(slug.as_str()))
    .unwrap_or_else(|| base.to_string())
}

fn slug_taken(jobs: &[Job], slug: &str, except: Option<u64>) -> bool {
  jobs
    .iter()
    .any(|j| j.slug == slug && Some(j.id) != except)
}

pub struct JobService<G> {
  gateway: Arc<G>,
  store: Arc<LocalStore>,
  overlays: Arc<Overlays>,
  layer: FallbackLayer,
}

impl<G: Gateway> JobService<G> {
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

  // ==========================================================================
  // Reads
  // ==========================================================================

  /// List jobs matching `query`.
  ///
  /// The page is selected by the query's sort, then the session overlay
  /// orders it by effective rank.
  #[instrument(skip(self), level = "debug")]
  pub async fn list(&self, query: &JobQuery) -> Result<Fetched<Page<Job>>, AccessError> {
    let request = RemoteRequest::get("/jobs").with_query(query.to_params());

    let fetched = self
      .layer
      .resolve(
        "jobs.list",
        || fetch(self.gateway.as_ref(), request),
        || Ok(query.apply(self.store.jobs()?)),
      )
      .await?;

    fetched.try_map(|page| overlay_page(&self.overlays.jobs, page))
  }

  pub async fn get(&self, id: impl IntoId) -> Result<Fetched<Job>, AccessError> {
    let id = id.into_id()?;

    let fetched = self
      .layer
      .resolve(
        "jobs.get",
        || fetch(self.gateway.as_ref(), RemoteRequest::get(format!("/jobs/{}", id))),
        || self.load(id),
      )
      .await?;

    fetched.try_map(|job| overlay_one(&self.overlays.jobs, job))
  }

  fn load(&self, id: u64) -> Result<Job, AccessError> {
    self
      .store
      .job(id)?
      .ok_or_else(|| AccessError::not_found("job", id))
  }

  // ==========================================================================
  // Writes
  // ==========================================================================

  #[instrument(skip(self, input), fields(title = %input.title), level = "debug")]
  pub async fn create(&self, mut input: NewJob) -> Result<Fetched<Job>, AccessError> {
    input.title = required("title", &input.title)?;
    let body = serde_json::to_value(&input)?;

    self
      .layer
      .mutate(
        "jobs.create",
        || fetch(self.gateway.as_ref(), RemoteRequest::post("/jobs", body)),
        || self.create_local(input),
      )
      .await
  }

  fn create_local(&self, input: NewJob) -> Result<Job, AccessError> {
    let jobs = self.store.jobs()?;

    let explicit = input
      .slug
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty());
    let slug = match explicit {
      Some(slug) if slug_taken(&jobs, slug, None) => {
        return Err(AccessError::Conflict(format!("slug {:?} is already taken", slug)));
      }
      Some(slug) => slug.to_string(),
      None => unique_slug(&slugify(&input.title), &jobs),
    };

    let job = self.store.insert_job(Job {
      id: 0,
      title: input.title,
      slug,
      status: input.status.unwrap_or_default(),
      order: jobs.len() as u32,
      tags: input.tags,
      company: input.company,
      location: input.location,
    })?;

    let mut all = jobs;
    all.push(job.clone());
    self.store.resequence_jobs(all)?;

    debug!(id = job.id, slug = %job.slug, "created job locally");
    Ok(job)
  }

  pub async fn update(&self, id: impl IntoId, patch: JobPatch) -> Result<Fetched<Job>, AccessError> {
    let id = id.into_id()?;
    if let Some(title) = &patch.title {
      required("title", title)?;
    }
    if let Some(slug) = &patch.slug {
      required("slug", slug)?;
    }
    let body = serde_json::to_value(&patch)?;

    self
      .layer
      .mutate(
        "jobs.update",
        || fetch(self.gateway.as_ref(), RemoteRequest::patch(format!("/jobs/{}", id), body)),
        || self.update_local(id, patch),
      )
      .await
  }

  fn update_local(&self, id: u64, patch: JobPatch) -> Result<Job, AccessError> {
    let mut job = self.load(id)?;

    if let Some(slug) = patch.slug {
      let slug = slug.trim().to_string();
      if slug != job.slug && slug_taken(&self.store.jobs()?, &slug, Some(id)) {
        return Err(AccessError::Conflict(format!("slug {:?} is already taken", slug)));
      }
      job.slug = slug;
    }
    if let Some(title) = patch.title {
      job.title = title.trim().to_string();
    }
    if let Some(status) = patch.status {
      job.status = status;
    }
    if let Some(tags) = patch.tags {
      job.tags = tags;
    }
    if let Some(company) = patch.company {
      job.company = company;
    }
    if let Some(location) = patch.location {
      job.location = location;
    }

    self.store.put_job(&job)?;
    Ok(job)
  }

  /// Archive a job. Jobs are never hard-deleted.
  pub async fn archive(&self, id: impl IntoId) -> Result<Fetched<Job>, AccessError> {
    let patch = JobPatch {
      status: Some(JobStatus::Archived),
      ..JobPatch::default()
    };
    self.update(id, patch).await
  }

  /// Move a job to the rank currently held by `to_order`.
  ///
  /// Locally the source is located by id and the target by rank (clamped to
  /// the end), then every rank is rewritten to its new index. Applying the
  /// same move twice leaves the same order.
  #[instrument(skip(self), level = "debug")]
  pub async fn reorder(
    &self,
    id: impl IntoId + std::fmt::Debug,
    from_order: u32,
    to_order: u32,
  ) -> Result<Fetched<OkResponse>, AccessError> {
    let id = id.into_id()?;
    let body = serde_json::to_value(ReorderBody {
      from_order,
      to_order,
    })?;

    self
      .layer
      .mutate(
        "jobs.reorder",
        || {
          fetch(
            self.gateway.as_ref(),
            RemoteRequest::patch(format!("/jobs/{}/reorder", id), body),
          )
        },
        || self.reorder_local(id, to_order),
      )
      .await
  }

  fn reorder_local(&self, id: u64, to_order: u32) -> Result<OkResponse, AccessError> {
    let mut jobs = self.store.jobs()?;
    let from = jobs
      .iter()
      .position(|j| j.id == id)
      .ok_or_else(|| AccessError::not_found("job", id))?;
    let to = jobs
      .iter()
      .position(|j| j.order == to_order)
      .unwrap_or(jobs.len() - 1);

    let moved = jobs.remove(from);
    let to = to.min(jobs.len());
    jobs.insert(to, moved);
    self.store.resequence_jobs(jobs)?;

    debug!(id, to, "reordered jobs locally");
    Ok(OkResponse::ok())
  }

  // ==========================================================================
  // Session-only edits
  // ==========================================================================

  /// Soft-delete a job for the rest of the session.
  pub fn hide(&self, id: impl IntoId) -> Result<(), AccessError> {
    self.overlays.jobs.tombstone(id.into_id()?);
    Ok(())
  }

  pub fn rename_in_session(&self, id: impl IntoId, title: &str) -> Result<(), AccessError> {
    let title = required("title", title)?;
    self.overlays.jobs.set(id.into_id()?, "title", title);
    Ok(())
  }

  pub fn archive_in_session(&self, id: impl IntoId) -> Result<(), AccessError> {
    self
      .overlays
      .jobs
      .set(id.into_id()?, "status", JobStatus::Archived.as_str());
    Ok(())
  }

  /// Give a job a session rank; it sorts ahead of stored jobs with the same rank.
  pub fn move_in_session(&self, id: impl IntoId, order: u32) -> Result<(), AccessError> {
    self
      .overlays
      .jobs
      .set(id.into_id()?, RANK_FIELD, Value::from(order));
    Ok(())
  }
}
