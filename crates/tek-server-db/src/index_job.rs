// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable index-job records.
//!
//! A job moves PENDING → RUNNING → {COMPLETED, FAILED, CANCELLED}; progress
//! is 0-100 and reaches 100 only at COMPLETED. Per-task outputs and metrics
//! live in the JSON `metadata` column.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{DbError, Result};
use crate::time::{format_ts, parse_opt_ts, parse_ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
	CodebaseFull,
	CodebaseIncr,
	DocsBucketFull,
	DocsBucketIncr,
	ApiAnalysis,
	UserflowAnalysis,
}

impl JobType {
	pub fn as_str(&self) -> &'static str {
		match self {
			JobType::CodebaseFull => "codebase_full",
			JobType::CodebaseIncr => "codebase_incr",
			JobType::DocsBucketFull => "docs_bucket_full",
			JobType::DocsBucketIncr => "docs_bucket_incr",
			JobType::ApiAnalysis => "api_analysis",
			JobType::UserflowAnalysis => "userflow_analysis",
		}
	}

	pub fn requires_codebase(&self) -> bool {
		matches!(self, JobType::CodebaseFull | JobType::CodebaseIncr)
	}
}

impl std::str::FromStr for JobType {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"codebase_full" => Ok(JobType::CodebaseFull),
			"codebase_incr" => Ok(JobType::CodebaseIncr),
			"docs_bucket_full" => Ok(JobType::DocsBucketFull),
			"docs_bucket_incr" => Ok(JobType::DocsBucketIncr),
			"api_analysis" => Ok(JobType::ApiAnalysis),
			"userflow_analysis" => Ok(JobType::UserflowAnalysis),
			_ => Err(format!("unknown job type: {s}")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Pending,
	Running,
	Completed,
	Failed,
	Cancelled,
}

impl JobStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			JobStatus::Pending => "pending",
			JobStatus::Running => "running",
			JobStatus::Completed => "completed",
			JobStatus::Failed => "failed",
			JobStatus::Cancelled => "cancelled",
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
	}
}

impl std::str::FromStr for JobStatus {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"pending" => Ok(JobStatus::Pending),
			"running" => Ok(JobStatus::Running),
			"completed" => Ok(JobStatus::Completed),
			"failed" => Ok(JobStatus::Failed),
			"cancelled" => Ok(JobStatus::Cancelled),
			_ => Err(format!("unknown job status: {s}")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTrigger {
	Manual,
	Webhook,
	Scheduled,
}

impl JobTrigger {
	pub fn as_str(&self) -> &'static str {
		match self {
			JobTrigger::Manual => "manual",
			JobTrigger::Webhook => "webhook",
			JobTrigger::Scheduled => "scheduled",
		}
	}
}

impl std::str::FromStr for JobTrigger {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"manual" => Ok(JobTrigger::Manual),
			"webhook" => Ok(JobTrigger::Webhook),
			"scheduled" => Ok(JobTrigger::Scheduled),
			_ => Err(format!("unknown job trigger: {s}")),
		}
	}
}

/// Per-task state stored under `metadata.tasks[name]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskRecord {
	pub progress: u8,
	pub output: Option<serde_json::Value>,
	pub metrics: Option<serde_json::Value>,
	pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct JobMetrics {
	pub languages: BTreeMap<String, u64>,
	pub file_types: BTreeMap<String, u64>,
	pub errors: Vec<String>,
	pub warnings: Vec<String>,
}

/// Structured job metadata. Serialized camelCase to match the wire shape
/// surfaced on the status endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct JobMetadata {
	pub base_commit: Option<String>,
	pub tasks: BTreeMap<String, TaskRecord>,
	pub files_processed: u64,
	pub symbols_extracted: u64,
	pub duration_ms: Option<i64>,
	pub metrics: JobMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexJobRecord {
	pub id: String,
	pub project_id: String,
	pub codebase_id: Option<String>,
	pub job_type: JobType,
	pub status: JobStatus,
	pub trigger: JobTrigger,
	pub current_task: Option<String>,
	pub progress: i64,
	pub priority: i64,
	pub description: Option<String>,
	pub metadata: JobMetadata,
	pub error_message: Option<String>,
	pub error_stack: Option<String>,
	pub retry_count: i64,
	pub max_retries: i64,
	pub started_at: Option<DateTime<Utc>>,
	pub completed_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl IndexJobRecord {
	pub fn new(project_id: impl Into<String>, job_type: JobType, trigger: JobTrigger) -> Self {
		let now = Utc::now();
		Self {
			id: uuid::Uuid::new_v4().to_string(),
			project_id: project_id.into(),
			codebase_id: None,
			job_type,
			status: JobStatus::Pending,
			trigger,
			current_task: None,
			progress: 0,
			priority: 0,
			description: None,
			metadata: JobMetadata::default(),
			error_message: None,
			error_stack: None,
			retry_count: 0,
			max_retries: 3,
			started_at: None,
			completed_at: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// Retry eligibility: a failed job with budget left. The retry count
	/// bound alone is necessary but not sufficient.
	pub fn can_retry(&self) -> bool {
		self.status == JobStatus::Failed && self.retry_count < self.max_retries
	}
}

#[derive(Debug, sqlx::FromRow)]
struct IndexJobRow {
	id: String,
	project_id: String,
	codebase_id: Option<String>,
	job_type: String,
	status: String,
	trigger_source: String,
	current_task: Option<String>,
	progress: i64,
	priority: i64,
	description: Option<String>,
	metadata: String,
	error_message: Option<String>,
	error_stack: Option<String>,
	retry_count: i64,
	max_retries: i64,
	started_at: Option<String>,
	completed_at: Option<String>,
	created_at: String,
	updated_at: String,
}

impl TryFrom<IndexJobRow> for IndexJobRecord {
	type Error = DbError;

	fn try_from(row: IndexJobRow) -> Result<Self> {
		Ok(IndexJobRecord {
			id: row.id,
			project_id: row.project_id,
			codebase_id: row.codebase_id,
			job_type: row
				.job_type
				.parse()
				.map_err(|e: String| DbError::Internal(e))?,
			status: row
				.status
				.parse()
				.map_err(|e: String| DbError::Internal(e))?,
			trigger: row
				.trigger_source
				.parse()
				.map_err(|e: String| DbError::Internal(e))?,
			current_task: row.current_task,
			progress: row.progress,
			priority: row.priority,
			description: row.description,
			metadata: serde_json::from_str(&row.metadata)?,
			error_message: row.error_message,
			error_stack: row.error_stack,
			retry_count: row.retry_count,
			max_retries: row.max_retries,
			started_at: parse_opt_ts(row.started_at.as_deref())?,
			completed_at: parse_opt_ts(row.completed_at.as_deref())?,
			created_at: parse_ts(&row.created_at)?,
			updated_at: parse_ts(&row.updated_at)?,
		})
	}
}

const SELECT_COLUMNS: &str = "id, project_id, codebase_id, job_type, status, trigger_source, \
	current_task, progress, priority, description, metadata, error_message, error_stack, \
	retry_count, max_retries, started_at, completed_at, created_at, updated_at";

#[derive(Clone)]
pub struct IndexJobRepository {
	pool: SqlitePool,
}

impl IndexJobRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, record), fields(job_id = %record.id))]
	pub async fn create(&self, record: &IndexJobRecord) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO index_jobs (id, project_id, codebase_id, job_type, status, trigger_source,
				current_task, progress, priority, description, metadata, error_message, error_stack,
				retry_count, max_retries, started_at, completed_at, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&record.id)
		.bind(&record.project_id)
		.bind(&record.codebase_id)
		.bind(record.job_type.as_str())
		.bind(record.status.as_str())
		.bind(record.trigger.as_str())
		.bind(&record.current_task)
		.bind(record.progress)
		.bind(record.priority)
		.bind(&record.description)
		.bind(serde_json::to_string(&record.metadata)?)
		.bind(&record.error_message)
		.bind(&record.error_stack)
		.bind(record.retry_count)
		.bind(record.max_retries)
		.bind(record.started_at.as_ref().map(format_ts))
		.bind(record.completed_at.as_ref().map(format_ts))
		.bind(format_ts(&record.created_at))
		.bind(format_ts(&record.updated_at))
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn get(&self, id: &str) -> Result<Option<IndexJobRecord>> {
		let row = sqlx::query_as::<_, IndexJobRow>(&format!(
			"SELECT {SELECT_COLUMNS} FROM index_jobs WHERE id = ?"
		))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(IndexJobRecord::try_from).transpose()
	}

	/// Like [`get`](Self::get) but errors when the job is missing.
	pub async fn get_required(&self, id: &str) -> Result<IndexJobRecord> {
		self.get(id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("job {id}")))
	}

	#[tracing::instrument(skip(self))]
	pub async fn list(
		&self,
		project_id: Option<&str>,
		status: Option<JobStatus>,
	) -> Result<Vec<IndexJobRecord>> {
		let mut sql = format!("SELECT {SELECT_COLUMNS} FROM index_jobs WHERE 1 = 1");
		if project_id.is_some() {
			sql.push_str(" AND project_id = ?");
		}
		if status.is_some() {
			sql.push_str(" AND status = ?");
		}
		sql.push_str(" ORDER BY created_at DESC");

		let mut query = sqlx::query_as::<_, IndexJobRow>(&sql);
		if let Some(project_id) = project_id {
			query = query.bind(project_id);
		}
		if let Some(status) = status {
			query = query.bind(status.as_str());
		}

		let rows = query.fetch_all(&self.pool).await?;
		rows.into_iter().map(IndexJobRecord::try_from).collect()
	}

	/// An active (pending or running) job on a codebase blocks further
	/// submissions for the same codebase.
	#[tracing::instrument(skip(self))]
	pub async fn find_active_for_codebase(
		&self,
		codebase_id: &str,
	) -> Result<Option<IndexJobRecord>> {
		let row = sqlx::query_as::<_, IndexJobRow>(&format!(
			"SELECT {SELECT_COLUMNS} FROM index_jobs
			 WHERE codebase_id = ? AND status IN ('pending', 'running')
			 LIMIT 1"
		))
		.bind(codebase_id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(IndexJobRecord::try_from).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn mark_running(&self, id: &str) -> Result<()> {
		let now = format_ts(&Utc::now());
		let result = sqlx::query(
			"UPDATE index_jobs SET status = 'running', started_at = ?, updated_at = ? WHERE id = ?",
		)
		.bind(&now)
		.bind(&now)
		.bind(id)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("job {id}")));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn update_task_progress(
		&self,
		id: &str,
		current_task: Option<&str>,
		progress: i64,
	) -> Result<()> {
		let progress = progress.clamp(0, 100);
		sqlx::query(
			"UPDATE index_jobs SET current_task = ?, progress = ?, updated_at = ? WHERE id = ?",
		)
		.bind(current_task)
		.bind(progress)
		.bind(format_ts(&Utc::now()))
		.bind(id)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self, metadata))]
	pub async fn update_metadata(&self, id: &str, metadata: &JobMetadata) -> Result<()> {
		sqlx::query("UPDATE index_jobs SET metadata = ?, updated_at = ? WHERE id = ?")
			.bind(serde_json::to_string(metadata)?)
			.bind(format_ts(&Utc::now()))
			.bind(id)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	/// Finish a job. `completed_at` is recorded for COMPLETED and FAILED
	/// outcomes; COMPLETED pins progress at 100.
	#[tracing::instrument(skip(self, error_message, error_stack))]
	pub async fn mark_terminal(
		&self,
		id: &str,
		status: JobStatus,
		error_message: Option<&str>,
		error_stack: Option<&str>,
	) -> Result<()> {
		if !status.is_terminal() {
			return Err(DbError::Internal(format!(
				"mark_terminal called with non-terminal status {}",
				status.as_str()
			)));
		}

		let now = format_ts(&Utc::now());
		let completed_at = matches!(status, JobStatus::Completed | JobStatus::Failed)
			.then(|| now.clone());

		let mut sql = String::from(
			"UPDATE index_jobs SET status = ?, error_message = ?, error_stack = ?, \
			 completed_at = ?, updated_at = ?",
		);
		if status == JobStatus::Completed {
			sql.push_str(", progress = 100, current_task = NULL");
		}
		sql.push_str(" WHERE id = ?");

		let result = sqlx::query(&sql)
			.bind(status.as_str())
			.bind(error_message)
			.bind(error_stack)
			.bind(completed_at)
			.bind(&now)
			.bind(id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("job {id}")));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn increment_retry_count(&self, id: &str) -> Result<()> {
		sqlx::query(
			"UPDATE index_jobs SET retry_count = retry_count + 1, updated_at = ? WHERE id = ?",
		)
		.bind(format_ts(&Utc::now()))
		.bind(id)
		.execute(&self.pool)
		.await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::codebase::{CodebaseRecord, CodebaseRepository};
	use crate::project::{ProjectRecord, ProjectRepository};
	use crate::testing::memory_pool;

	async fn setup() -> (SqlitePool, ProjectRecord, CodebaseRecord) {
		let pool = memory_pool().await;
		let projects = ProjectRepository::new(pool.clone());
		let codebases = CodebaseRepository::new(pool.clone());

		let project = ProjectRecord::new("P", None);
		projects.create(&project).await.unwrap();

		let codebase = CodebaseRecord::new(&project.id, "svc", "https://git.example/acme/svc.git");
		codebases.create(&codebase).await.unwrap();

		(pool, project, codebase)
	}

	#[tokio::test]
	async fn test_create_and_get_roundtrip() {
		let (pool, project, codebase) = setup().await;
		let repo = IndexJobRepository::new(pool);

		let mut job = IndexJobRecord::new(&project.id, JobType::CodebaseFull, JobTrigger::Manual);
		job.codebase_id = Some(codebase.id.clone());
		job.metadata.base_commit = Some("abc123".into());
		repo.create(&job).await.unwrap();

		let loaded = repo.get_required(&job.id).await.unwrap();
		assert_eq!(loaded.status, JobStatus::Pending);
		assert_eq!(loaded.job_type, JobType::CodebaseFull);
		assert_eq!(loaded.metadata.base_commit.as_deref(), Some("abc123"));
		assert_eq!(loaded.progress, 0);
		assert!(loaded.started_at.is_none());
	}

	#[tokio::test]
	async fn test_status_lifecycle_timestamps() {
		let (pool, project, _) = setup().await;
		let repo = IndexJobRepository::new(pool);

		let job = IndexJobRecord::new(&project.id, JobType::CodebaseFull, JobTrigger::Manual);
		repo.create(&job).await.unwrap();

		repo.mark_running(&job.id).await.unwrap();
		let running = repo.get_required(&job.id).await.unwrap();
		assert_eq!(running.status, JobStatus::Running);
		assert!(running.started_at.is_some());
		assert!(running.completed_at.is_none());

		repo.mark_terminal(&job.id, JobStatus::Completed, None, None)
			.await
			.unwrap();
		let done = repo.get_required(&job.id).await.unwrap();
		assert_eq!(done.status, JobStatus::Completed);
		assert_eq!(done.progress, 100);
		assert!(done.completed_at.is_some());
		assert!(done.current_task.is_none());
	}

	#[tokio::test]
	async fn test_cancelled_has_no_completed_at() {
		let (pool, project, _) = setup().await;
		let repo = IndexJobRepository::new(pool);

		let job = IndexJobRecord::new(&project.id, JobType::CodebaseFull, JobTrigger::Manual);
		repo.create(&job).await.unwrap();

		repo.mark_terminal(&job.id, JobStatus::Cancelled, None, None)
			.await
			.unwrap();
		let cancelled = repo.get_required(&job.id).await.unwrap();
		assert_eq!(cancelled.status, JobStatus::Cancelled);
		assert!(cancelled.completed_at.is_none());
		assert_ne!(cancelled.progress, 100);
	}

	#[tokio::test]
	async fn test_mark_terminal_rejects_non_terminal_status() {
		let (pool, project, _) = setup().await;
		let repo = IndexJobRepository::new(pool);

		let job = IndexJobRecord::new(&project.id, JobType::CodebaseFull, JobTrigger::Manual);
		repo.create(&job).await.unwrap();

		let err = repo
			.mark_terminal(&job.id, JobStatus::Running, None, None)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Internal(_)));
	}

	#[tokio::test]
	async fn test_find_active_for_codebase() {
		let (pool, project, codebase) = setup().await;
		let repo = IndexJobRepository::new(pool);

		assert!(repo
			.find_active_for_codebase(&codebase.id)
			.await
			.unwrap()
			.is_none());

		let mut job = IndexJobRecord::new(&project.id, JobType::CodebaseFull, JobTrigger::Manual);
		job.codebase_id = Some(codebase.id.clone());
		repo.create(&job).await.unwrap();

		assert!(repo
			.find_active_for_codebase(&codebase.id)
			.await
			.unwrap()
			.is_some());

		repo.mark_terminal(&job.id, JobStatus::Failed, Some("boom"), None)
			.await
			.unwrap();
		assert!(repo
			.find_active_for_codebase(&codebase.id)
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_metadata_task_records_roundtrip() {
		let (pool, project, _) = setup().await;
		let repo = IndexJobRepository::new(pool);

		let job = IndexJobRecord::new(&project.id, JobType::CodebaseFull, JobTrigger::Manual);
		repo.create(&job).await.unwrap();

		let mut metadata = JobMetadata::default();
		metadata.tasks.insert(
			"GIT_SYNC".into(),
			TaskRecord {
				progress: 100,
				output: Some(serde_json::json!({"commitHash": "abc123"})),
				metrics: None,
				error: None,
			},
		);
		metadata.files_processed = 7;
		metadata.metrics.languages.insert("java".into(), 7);
		repo.update_metadata(&job.id, &metadata).await.unwrap();

		let loaded = repo.get_required(&job.id).await.unwrap();
		assert_eq!(loaded.metadata, metadata);
	}

	#[tokio::test]
	async fn test_can_retry() {
		let (pool, project, _) = setup().await;
		let repo = IndexJobRepository::new(pool);

		let job = IndexJobRecord::new(&project.id, JobType::CodebaseFull, JobTrigger::Manual);
		repo.create(&job).await.unwrap();

		let pending = repo.get_required(&job.id).await.unwrap();
		assert!(!pending.can_retry());

		repo.mark_terminal(&job.id, JobStatus::Failed, Some("boom"), None)
			.await
			.unwrap();
		let failed = repo.get_required(&job.id).await.unwrap();
		assert!(failed.can_retry());

		for _ in 0..failed.max_retries {
			repo.increment_retry_count(&job.id).await.unwrap();
		}
		let exhausted = repo.get_required(&job.id).await.unwrap();
		assert!(!exhausted.can_retry());
	}

	#[tokio::test]
	async fn test_list_filters() {
		let (pool, project, _) = setup().await;
		let repo = IndexJobRepository::new(pool);

		let a = IndexJobRecord::new(&project.id, JobType::CodebaseFull, JobTrigger::Manual);
		let b = IndexJobRecord::new(&project.id, JobType::ApiAnalysis, JobTrigger::Webhook);
		repo.create(&a).await.unwrap();
		repo.create(&b).await.unwrap();
		repo.mark_terminal(&b.id, JobStatus::Failed, Some("x"), None)
			.await
			.unwrap();

		let all = repo.list(Some(&project.id), None).await.unwrap();
		assert_eq!(all.len(), 2);

		let failed = repo
			.list(Some(&project.id), Some(JobStatus::Failed))
			.await
			.unwrap();
		assert_eq!(failed.len(), 1);
		assert_eq!(failed[0].id, b.id);
	}
}
