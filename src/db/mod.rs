//! Persistent local mirror of the remote service, backed by SQLite.

pub mod schema;
pub mod seed;

use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension, Params};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::StoreError;
use crate::hiring::types::{AssessmentDocument, Candidate, Job, Submission, TimelineEntry};

/// Full set of rows for a bulk import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
  pub jobs: Vec<Job>,
  pub candidates: Vec<Candidate>,
  pub timeline: Vec<TimelineEntry>,
  pub assessments: Vec<AssessmentDocument>,
}

/// SQLite-backed local store.
///
/// Each method takes the connection lock for its own statements only; a
/// read followed by a write from the caller is not atomic.
pub struct LocalStore {
  conn: Mutex<Connection>,
}

impl LocalStore {
  /// Open or create the store at `path`.
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|source| StoreError::Open {
        path: path.display().to_string(),
        source,
      })?;
    }

    let conn = Connection::open(path)?;
    Self::from_connection(conn)
  }

  /// Open a throwaway store (tests, `--offline` dry runs).
  pub fn open_in_memory() -> Result<Self, StoreError> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  /// Get the default database path
  pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .map(|dir| dir.join("hireflow").join("store.db"))
  }

  fn from_connection(conn: Connection) -> Result<Self, StoreError> {
    conn.execute_batch(schema::SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
    self.conn.lock().map_err(|_| StoreError::LockPoisoned)
  }

  // ==========================================================================
  // Jobs
  // ==========================================================================

  pub fn job_count(&self) -> Result<usize, StoreError> {
    count(&*self.conn()?, "jobs")
  }

  /// All jobs ordered by rank, then id.
  pub fn jobs(&self) -> Result<Vec<Job>, StoreError> {
    load_all(
      &*self.conn()?,
      r#"SELECT data FROM jobs ORDER BY "order", id"#,
      [],
    )
  }

  pub fn job(&self, id: u64) -> Result<Option<Job>, StoreError> {
    load_one(
      &*self.conn()?,
      "SELECT data FROM jobs WHERE id = ?",
      [id as i64],
    )
  }

  /// Insert a job, assigning the next id.
  pub fn insert_job(&self, mut job: Job) -> Result<Job, StoreError> {
    let conn = self.conn()?;
    job.id = next_id(&conn, "jobs")?;
    upsert_job(&conn, &job)?;
    Ok(job)
  }

  pub fn put_job(&self, job: &Job) -> Result<(), StoreError> {
    upsert_job(&*self.conn()?, job)
  }

  /// Rewrite every job's rank to its index in `jobs`, in one transaction.
  pub fn resequence_jobs(&self, mut jobs: Vec<Job>) -> Result<Vec<Job>, StoreError> {
    let mut conn = self.conn()?;
    let tx = conn.transaction()?;
    for (index, job) in jobs.iter_mut().enumerate() {
      job.order = index as u32;
      upsert_job(&tx, job)?;
    }
    tx.commit()?;
    debug!(count = jobs.len(), "resequenced job ranks");
    Ok(jobs)
  }

  // ==========================================================================
  // Candidates
  // ==========================================================================

  pub fn candidate_count(&self) -> Result<usize, StoreError> {
    count(&*self.conn()?, "candidates")
  }

  pub fn candidates(&self) -> Result<Vec<Candidate>, StoreError> {
    load_all(&*self.conn()?, "SELECT data FROM candidates ORDER BY id", [])
  }

  pub fn candidate(&self, id: u64) -> Result<Option<Candidate>, StoreError> {
    load_one(
      &*self.conn()?,
      "SELECT data FROM candidates WHERE id = ?",
      [id as i64],
    )
  }

  /// Insert a candidate together with its opening timeline entry.
  pub fn insert_candidate(
    &self,
    mut candidate: Candidate,
    mut opening: TimelineEntry,
  ) -> Result<(Candidate, TimelineEntry), StoreError> {
    let mut conn = self.conn()?;
    let tx = conn.transaction()?;
    candidate.id = next_id(&tx, "candidates")?;
    upsert_candidate(&tx, &candidate)?;
    opening.candidate_id = candidate.id;
    opening.id = next_id(&tx, "timelines")?;
    insert_timeline(&tx, &opening)?;
    tx.commit()?;
    Ok((candidate, opening))
  }

  pub fn put_candidate(&self, candidate: &Candidate) -> Result<(), StoreError> {
    upsert_candidate(&*self.conn()?, candidate)
  }

  /// Append a timeline entry, then persist the candidate's new stage.
  pub fn record_transition(
    &self,
    candidate: &Candidate,
    mut entry: TimelineEntry,
  ) -> Result<TimelineEntry, StoreError> {
    let mut conn = self.conn()?;
    let tx = conn.transaction()?;
    entry.id = next_id(&tx, "timelines")?;
    insert_timeline(&tx, &entry)?;
    upsert_candidate(&tx, candidate)?;
    tx.commit()?;
    Ok(entry)
  }

  // ==========================================================================
  // Timelines
  // ==========================================================================

  /// A candidate's history, oldest first.
  pub fn timeline(&self, candidate_id: u64) -> Result<Vec<TimelineEntry>, StoreError> {
    load_all(
      &*self.conn()?,
      "SELECT data FROM timelines WHERE candidate_id = ? ORDER BY ts, id",
      [candidate_id as i64],
    )
  }

  // ==========================================================================
  // Assessments
  // ==========================================================================

  pub fn assessment(&self, job_id: u64) -> Result<Option<AssessmentDocument>, StoreError> {
    load_one(
      &*self.conn()?,
      "SELECT data FROM assessments WHERE job_id = ?",
      [job_id as i64],
    )
  }

  /// Replace the whole document for its job.
  pub fn put_assessment(&self, doc: &AssessmentDocument) -> Result<(), StoreError> {
    upsert_assessment(&*self.conn()?, doc)
  }

  // ==========================================================================
  // Submissions
  // ==========================================================================

  pub fn append_submission(&self, mut submission: Submission) -> Result<Submission, StoreError> {
    let conn = self.conn()?;
    submission.id = next_id(&conn, "submissions")?;
    conn.execute(
      "INSERT INTO submissions (id, job_id, candidate_id, data) VALUES (?, ?, ?, ?)",
      params![
        submission.id as i64,
        submission.job_id as i64,
        submission.candidate_id.map(|id| id as i64),
        to_json(&submission)?,
      ],
    )?;
    Ok(submission)
  }

  pub fn submissions_for_job(&self, job_id: u64) -> Result<Vec<Submission>, StoreError> {
    load_all(
      &*self.conn()?,
      "SELECT data FROM submissions WHERE job_id = ? ORDER BY id",
      [job_id as i64],
    )
  }

  // ==========================================================================
  // Bulk
  // ==========================================================================

  /// Write a snapshot with pre-assigned ids in one transaction.
  pub fn import(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
    let mut conn = self.conn()?;
    let tx = conn.transaction()?;
    for job in &snapshot.jobs {
      upsert_job(&tx, job)?;
    }
    for candidate in &snapshot.candidates {
      upsert_candidate(&tx, candidate)?;
    }
    for entry in &snapshot.timeline {
      insert_timeline(&tx, entry)?;
    }
    for doc in &snapshot.assessments {
      upsert_assessment(&tx, doc)?;
    }
    tx.commit()?;
    Ok(())
  }

  /// Delete every row from every table.
  pub fn clear(&self) -> Result<(), StoreError> {
    self.conn()?.execute_batch(
      "DELETE FROM submissions;
       DELETE FROM assessments;
       DELETE FROM timelines;
       DELETE FROM candidates;
       DELETE FROM jobs;",
    )?;
    Ok(())
  }
}

// ============================================================================
// Row helpers
// ============================================================================

fn to_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
  Ok(serde_json::to_string(value)?)
}

fn count(conn: &Connection, table: &str) -> Result<usize, StoreError> {
  let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
    row.get(0)
  })?;
  Ok(n as usize)
}

fn next_id(conn: &Connection, table: &str) -> Result<u64, StoreError> {
  let id: i64 = conn.query_row(
    &format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {}", table),
    [],
    |row| row.get(0),
  )?;
  Ok(id as u64)
}

fn load_all<T: DeserializeOwned, P: Params>(
  conn: &Connection,
  sql: &str,
  params: P,
) -> Result<Vec<T>, StoreError> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;

  let mut out = Vec::new();
  for data in rows {
    out.push(serde_json::from_str(&data?)?);
  }
  Ok(out)
}

fn load_one<T: DeserializeOwned, P: Params>(
  conn: &Connection,
  sql: &str,
  params: P,
) -> Result<Option<T>, StoreError> {
  let data: Option<String> = conn
    .query_row(sql, params, |row| row.get(0))
    .optional()?;

  match data {
    Some(data) => Ok(Some(serde_json::from_str(&data)?)),
    None => Ok(None),
  }
}

fn upsert_job(conn: &Connection, job: &Job) -> Result<(), StoreError> {
  conn.execute(
    r#"INSERT INTO jobs (id, slug, status, "order", title, data)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT(id) DO UPDATE SET
         slug = excluded.slug,
         status = excluded.status,
         "order" = excluded."order",
         title = excluded.title,
         data = excluded.data"#,
    params![
      job.id as i64,
      job.slug,
      job.status.as_str(),
      job.order,
      job.title,
      to_json(job)?,
    ],
  )?;
  Ok(())
}

fn upsert_candidate(conn: &Connection, candidate: &Candidate) -> Result<(), StoreError> {
  conn.execute(
    "INSERT INTO candidates (id, email, stage, job_id, name, data)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT(id) DO UPDATE SET
       email = excluded.email,
       stage = excluded.stage,
       job_id = excluded.job_id,
       name = excluded.name,
       data = excluded.data",
    params![
      candidate.id as i64,
      candidate.email,
      candidate.stage.as_str(),
      candidate.job_id as i64,
      candidate.name,
      to_json(candidate)?,
    ],
  )?;
  Ok(())
}

fn insert_timeline(conn: &Connection, entry: &TimelineEntry) -> Result<(), StoreError> {
  conn.execute(
    "INSERT INTO timelines (id, candidate_id, ts, stage, data) VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      entry.id as i64,
      entry.candidate_id as i64,
      entry.ts.to_rfc3339_opts(SecondsFormat::Micros, true),
      entry.stage.as_str(),
      to_json(entry)?,
    ],
  )?;
  Ok(())
}

fn upsert_assessment(conn: &Connection, doc: &AssessmentDocument) -> Result<(), StoreError> {
  conn.execute(
    "INSERT INTO assessments (job_id, data) VALUES (?1, ?2)
     ON CONFLICT(job_id) DO UPDATE SET data = excluded.data",
    params![doc.job_id as i64, to_json(doc)?],
  )?;
  Ok(())
}
