// src/core/database.rs
//! Interview-session persistence: connection management, per-session write
//! serialization and the session repository.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use crate::analysis::AnalysisResult;
use crate::core::analysis_columns::AnalysisColumns;
use crate::utils;

// ===== Core Database Connection Management =====

pub struct Database {
    pool: SqlitePool,
    write_locks: SessionLocks,
}

impl Database {
    /// Create new database connection with automatic setup
    pub async fn new(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            utils::ensure_dir_exists(parent).await?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url).await.with_context(|| {
            format!("Failed to connect to database: {}", database_path.display())
        })?;

        info!(
            "Database connection established: {}",
            database_path.display()
        );

        Self::from_pool(pool).await
    }

    /// Private in-memory database, used by tests and dry runs
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self {
            pool,
            write_locks: SessionLocks::default(),
        };
        db.migrate().await?;
        Ok(db)
    }

    /// Get pool reference for custom operations
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn sessions(&self) -> SessionRepository<'_> {
        SessionRepository::new(&self.pool, &self.write_locks)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interview_sessions (
                id TEXT PRIMARY KEY,
                candidate_name TEXT NOT NULL,
                position TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'scheduled',
                vendor_call_id TEXT UNIQUE,
                transcript TEXT,
                recording_url TEXT,
                duration_minutes INTEGER,
                started_at TEXT,
                ended_at TEXT,
                overall_score INTEGER,
                category_scores TEXT,
                strengths TEXT,
                areas_for_improvement TEXT,
                detailed_feedback TEXT,
                hiring_recommendation TEXT,
                key_insights TEXT,
                question_analysis TEXT,
                interview_flow TEXT,
                analyzed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create interview_sessions table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_vendor_call_id ON interview_sessions(vendor_call_id);",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON interview_sessions(created_at);",
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}

// ===== Per-session write serialization =====

/// Hands out one async lock per session id so partial updates for the same
/// session never interleave.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop locks nobody is holding or waiting on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

// ===== Session Models =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            other => anyhow::bail!("Unknown session status: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InterviewSession {
    pub id: String,
    pub candidate_name: String,
    pub position: String,
    pub status: String,
    pub vendor_call_id: Option<String>,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub duration_minutes: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn status(&self) -> Result<SessionStatus> {
        self.status.parse()
    }

    pub fn has_analysis(&self) -> bool {
        self.analyzed_at.is_some()
    }
}

/// Call data recorded on a session once the vendor reports the call ended.
/// `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct CallArtifacts {
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
}

const SESSION_COLUMNS: &str = "id, candidate_name, position, status, vendor_call_id, transcript, \
     recording_url, duration_minutes, started_at, ended_at, analyzed_at, created_at, updated_at";

// ===== Session Repository =====

pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
    locks: &'a SessionLocks,
}

impl<'a> SessionRepository<'a> {
    pub fn new(pool: &'a SqlitePool, locks: &'a SessionLocks) -> Self {
        Self { pool, locks }
    }

    /// Schedule a new interview session
    pub async fn create_session(
        &self,
        candidate_name: &str,
        position: &str,
    ) -> Result<InterviewSession> {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO interview_sessions (id, candidate_name, position, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(candidate_name)
        .bind(position)
        .bind(SessionStatus::Scheduled.as_str())
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .context("Failed to create interview session")?;

        info!(
            "Scheduled interview session {} for {} ({})",
            id, candidate_name, position
        );

        Ok(InterviewSession {
            id,
            candidate_name: candidate_name.to_string(),
            position: position.to_string(),
            status: SessionStatus::Scheduled.as_str().to_string(),
            vendor_call_id: None,
            transcript: None,
            recording_url: None,
            duration_minutes: None,
            started_at: None,
            ended_at: None,
            analyzed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(&self, session_id: &str) -> Result<Option<InterviewSession>> {
        let session = sqlx::query_as::<_, InterviewSession>(&format!(
            "SELECT {} FROM interview_sessions WHERE id = ?",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(self.pool)
        .await
        .with_context(|| format!("Failed to load interview session {}", session_id))?;

        Ok(session)
    }

    pub async fn find_by_vendor_call_id(&self, call_id: &str) -> Result<Option<InterviewSession>> {
        let session = sqlx::query_as::<_, InterviewSession>(&format!(
            "SELECT {} FROM interview_sessions WHERE vendor_call_id = ?",
            SESSION_COLUMNS
        ))
        .bind(call_id)
        .fetch_optional(self.pool)
        .await
        .with_context(|| format!("Failed to look up session for call {}", call_id))?;

        Ok(session)
    }

    /// Most recently created sessions first
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<InterviewSession>> {
        let sessions = sqlx::query_as::<_, InterviewSession>(&format!(
            "SELECT {} FROM interview_sessions ORDER BY created_at DESC LIMIT ?",
            SESSION_COLUMNS
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .context("Failed to list interview sessions")?;

        Ok(sessions)
    }

    /// Link a vendor call to a session
    pub async fn attach_call(&self, session_id: &str, call_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(session_id).await;

        let outcome = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET vendor_call_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(call_id)
        .bind(Utc::now())
        .bind(session_id)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to link call {} to session {}", call_id, session_id))?;

        if outcome.rows_affected() == 0 {
            anyhow::bail!("Interview session not found: {}", session_id);
        }

        info!("Linked vendor call {} to session {}", call_id, session_id);
        Ok(())
    }

    pub async fn update_status(&self, session_id: &str, status: SessionStatus) -> Result<()> {
        let _guard = self.locks.acquire(session_id).await;

        let outcome = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(session_id)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to update status of session {}", session_id))?;

        if outcome.rows_affected() == 0 {
            anyhow::bail!("Interview session not found: {}", session_id);
        }

        debug!("Session {} is now {}", session_id, status);
        Ok(())
    }

    /// Store the call artifacts and mark the session completed
    pub async fn record_call_artifacts(
        &self,
        session_id: &str,
        artifacts: &CallArtifacts,
    ) -> Result<()> {
        let _guard = self.locks.acquire(session_id).await;

        let outcome = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET transcript = COALESCE(?, transcript),
                recording_url = COALESCE(?, recording_url),
                started_at = COALESCE(?, started_at),
                ended_at = COALESCE(?, ended_at),
                duration_minutes = COALESCE(?, duration_minutes),
                status = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(artifacts.transcript.as_deref())
        .bind(artifacts.recording_url.as_deref())
        .bind(artifacts.started_at)
        .bind(artifacts.ended_at)
        .bind(artifacts.duration_minutes.map(i64::from))
        .bind(SessionStatus::Completed.as_str())
        .bind(Utc::now())
        .bind(session_id)
        .execute(self.pool)
        .await
        .with_context(|| format!("Failed to record call artifacts for session {}", session_id))?;

        if outcome.rows_affected() == 0 {
            anyhow::bail!("Interview session not found: {}", session_id);
        }

        Ok(())
    }

    /// Partial update of the analysis columns of an existing session.
    ///
    /// Never inserts. Applying the same result twice changes nothing but
    /// `analyzed_at` and `updated_at`.
    pub async fn apply_analysis(&self, session_id: &str, result: &AnalysisResult) -> Result<()> {
        let columns = AnalysisColumns::from_result(result)?;
        let _guard = self.locks.acquire(session_id).await;
        let now = Utc::now();

        let statement = format!(
            "UPDATE interview_sessions SET {}, analyzed_at = ?, updated_at = ? WHERE id = ?",
            AnalysisColumns::assignment_list()
        );

        let outcome = sqlx::query(&statement)
            .bind(columns.overall_score)
            .bind(&columns.category_scores)
            .bind(&columns.strengths)
            .bind(&columns.areas_for_improvement)
            .bind(&columns.detailed_feedback)
            .bind(&columns.hiring_recommendation)
            .bind(&columns.key_insights)
            .bind(&columns.question_analysis)
            .bind(&columns.interview_flow)
            .bind(now)
            .bind(now)
            .bind(session_id)
            .execute(self.pool)
            .await
            .with_context(|| format!("Failed to save analysis for session {}", session_id))?;

        if outcome.rows_affected() == 0 {
            anyhow::bail!("Interview session not found: {}", session_id);
        }

        info!(
            "Saved analysis for session {}: score {}, recommendation {}",
            session_id, result.overall_score, result.hiring_recommendation
        );
        Ok(())
    }

    /// Read back a persisted analysis, `None` if the session has none yet
    pub async fn load_analysis(&self, session_id: &str) -> Result<Option<AnalysisResult>> {
        let columns = sqlx::query_as::<_, AnalysisColumns>(&format!(
            "SELECT {} FROM interview_sessions WHERE id = ? AND analyzed_at IS NOT NULL",
            AnalysisColumns::select_list()
        ))
        .bind(session_id)
        .fetch_optional(self.pool)
        .await
        .with_context(|| format!("Failed to load analysis for session {}", session_id))?;

        columns.map(AnalysisColumns::into_result).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::HiringRecommendation;

    #[derive(Debug, PartialEq, sqlx::FromRow)]
    struct StoredRow {
        id: String,
        candidate_name: String,
        position: String,
        status: String,
        transcript: Option<String>,
        overall_score: Option<i64>,
        category_scores: Option<String>,
        strengths: Option<String>,
        areas_for_improvement: Option<String>,
        detailed_feedback: Option<String>,
        hiring_recommendation: Option<String>,
        key_insights: Option<String>,
        question_analysis: Option<String>,
        interview_flow: Option<String>,
    }

    async fn stored_row(db: &Database, id: &str) -> StoredRow {
        sqlx::query_as::<_, StoredRow>(
            "SELECT id, candidate_name, position, status, transcript, overall_score, \
             category_scores, strengths, areas_for_improvement, detailed_feedback, \
             hiring_recommendation, key_insights, question_analysis, interview_flow \
             FROM interview_sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_one(db.pool())
        .await
        .unwrap()
    }

    async fn session_count(db: &Database) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM interview_sessions")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    fn sample_result() -> AnalysisResult {
        let mut result = AnalysisResult {
            overall_score: 81,
            strengths: vec!["Structured answers".to_string()],
            hiring_recommendation: HiringRecommendation::Yes,
            detailed_feedback: "Overall Performance: 81/100".to_string(),
            ..Default::default()
        };
        result.category_scores.technical = 81;
        result
    }

    #[tokio::test]
    async fn test_create_and_find_session() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.sessions();

        let session = repo.create_session("Ada Lovelace", "Engineer").await.unwrap();
        let found = repo.find_by_id(&session.id).await.unwrap().unwrap();

        assert_eq!(found.candidate_name, "Ada Lovelace");
        assert_eq!(found.status().unwrap(), SessionStatus::Scheduled);
        assert!(!found.has_analysis());
        assert!(repo.load_analysis(&session.id).await.unwrap().is_none());
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_analysis_round_trips() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.sessions();
        let session = repo.create_session("Ada", "Engineer").await.unwrap();

        repo.apply_analysis(&session.id, &sample_result()).await.unwrap();

        let loaded = repo.load_analysis(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, sample_result());
        assert!(repo.find_by_id(&session.id).await.unwrap().unwrap().has_analysis());
    }

    #[tokio::test]
    async fn test_apply_analysis_is_idempotent_and_partial() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.sessions();
        let session = repo.create_session("Ada", "Engineer").await.unwrap();
        repo.record_call_artifacts(
            &session.id,
            &CallArtifacts {
                transcript: Some("Interviewer: hello".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        repo.apply_analysis(&session.id, &sample_result()).await.unwrap();
        let first = stored_row(&db, &session.id).await;
        repo.apply_analysis(&session.id, &sample_result()).await.unwrap();
        let second = stored_row(&db, &session.id).await;

        assert_eq!(first, second);
        assert_eq!(second.transcript.as_deref(), Some("Interviewer: hello"));
        assert_eq!(second.candidate_name, "Ada");
        assert_eq!(session_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_apply_analysis_never_inserts() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.sessions();

        let err = repo
            .apply_analysis("no-such-session", &sample_result())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(session_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_applies_converge() {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let session = db.sessions().create_session("Ada", "Engineer").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let db = Arc::clone(&db);
            let id = session.id.clone();
            handles.push(tokio::spawn(async move {
                db.sessions().apply_analysis(&id, &sample_result()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let loaded = db.sessions().load_analysis(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, sample_result());
    }

    #[tokio::test]
    async fn test_call_lookup_and_artifacts() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.sessions();
        let session = repo.create_session("Ada", "Engineer").await.unwrap();

        repo.attach_call(&session.id, "call-42").await.unwrap();
        repo.update_status(&session.id, SessionStatus::InProgress)
            .await
            .unwrap();

        let found = repo.find_by_vendor_call_id("call-42").await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.status().unwrap(), SessionStatus::InProgress);

        repo.record_call_artifacts(
            &session.id,
            &CallArtifacts {
                recording_url: Some("https://cdn.example.com/rec.wav".to_string()),
                duration_minutes: Some(12),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let updated = repo.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(updated.status().unwrap(), SessionStatus::Completed);
        assert_eq!(updated.duration_minutes, Some(12));
        assert_eq!(updated.transcript, None);
        assert!(repo.attach_call("missing", "call-43").await.is_err());
    }

    #[tokio::test]
    async fn test_list_recent() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.sessions();
        repo.create_session("Ada", "Engineer").await.unwrap();
        repo.create_session("Grace", "Admiral").await.unwrap();

        let sessions = repo.list_recent(1).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(db.health_check().await.is_ok());
    }
}
