/// Schema for the local mirror.
///
/// Every table keeps the full record as JSON in `data`; the other columns
/// exist for lookups and indexes.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL,
    "order" INTEGER NOT NULL,
    title TEXT NOT NULL,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
CREATE INDEX IF NOT EXISTS idx_jobs_order ON jobs("order");
CREATE INDEX IF NOT EXISTS idx_jobs_title ON jobs(title);

CREATE TABLE IF NOT EXISTS candidates (
    id INTEGER PRIMARY KEY,
    email TEXT NOT NULL,
    stage TEXT NOT NULL,
    job_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_candidates_email ON candidates(email);
CREATE INDEX IF NOT EXISTS idx_candidates_stage ON candidates(stage);
CREATE INDEX IF NOT EXISTS idx_candidates_job ON candidates(job_id);
CREATE INDEX IF NOT EXISTS idx_candidates_name ON candidates(name);

-- Append-only stage history
CREATE TABLE IF NOT EXISTS timelines (
    id INTEGER PRIMARY KEY,
    candidate_id INTEGER NOT NULL,
    ts TEXT NOT NULL,
    stage TEXT NOT NULL,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_timelines_candidate ON timelines(candidate_id);
CREATE INDEX IF NOT EXISTS idx_timelines_ts ON timelines(ts);
CREATE INDEX IF NOT EXISTS idx_timelines_stage ON timelines(stage);

-- One document per job
CREATE TABLE IF NOT EXISTS assessments (
    job_id INTEGER PRIMARY KEY,
    data TEXT NOT NULL
);

-- Append-only
CREATE TABLE IF NOT EXISTS submissions (
    id INTEGER PRIMARY KEY,
    job_id INTEGER NOT NULL,
    candidate_id INTEGER,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_submissions_job ON submissions(job_id);
CREATE INDEX IF NOT EXISTS idx_submissions_candidate ON submissions(candidate_id);
"#;
