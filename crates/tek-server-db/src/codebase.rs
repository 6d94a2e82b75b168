// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{DbError, Result};
use crate::time::{format_ts, parse_opt_ts, parse_ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodebaseStatus {
	Pending,
	Syncing,
	Active,
	Error,
	Archived,
}

impl CodebaseStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			CodebaseStatus::Pending => "pending",
			CodebaseStatus::Syncing => "syncing",
			CodebaseStatus::Active => "active",
			CodebaseStatus::Error => "error",
			CodebaseStatus::Archived => "archived",
		}
	}
}

impl std::str::FromStr for CodebaseStatus {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"pending" => Ok(CodebaseStatus::Pending),
			"syncing" => Ok(CodebaseStatus::Syncing),
			"active" => Ok(CodebaseStatus::Active),
			"error" => Ok(CodebaseStatus::Error),
			"archived" => Ok(CodebaseStatus::Archived),
			_ => Err(format!("unknown codebase status: {s}")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
	Manual,
	Auto,
	Webhook,
}

impl SyncMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			SyncMode::Manual => "manual",
			SyncMode::Auto => "auto",
			SyncMode::Webhook => "webhook",
		}
	}
}

impl std::str::FromStr for SyncMode {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"manual" => Ok(SyncMode::Manual),
			"auto" => Ok(SyncMode::Auto),
			"webhook" => Ok(SyncMode::Webhook),
			_ => Err(format!("unknown sync mode: {s}")),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseRecord {
	pub id: String,
	pub project_id: String,
	pub name: String,
	pub git_url: String,
	pub remote_project_id: Option<i64>,
	pub branch: String,
	pub storage_path: Option<String>,
	pub language: Option<String>,
	pub sync_mode: SyncMode,
	pub webhook_secret: Option<String>,
	pub last_sync_commit: Option<String>,
	pub last_sync_at: Option<DateTime<Utc>>,
	pub status: CodebaseStatus,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl CodebaseRecord {
	pub fn new(
		project_id: impl Into<String>,
		name: impl Into<String>,
		git_url: impl Into<String>,
	) -> Self {
		let now = Utc::now();
		Self {
			id: uuid::Uuid::new_v4().to_string(),
			project_id: project_id.into(),
			name: name.into(),
			git_url: git_url.into(),
			remote_project_id: None,
			branch: "main".to_string(),
			storage_path: None,
			language: None,
			sync_mode: SyncMode::Manual,
			webhook_secret: None,
			last_sync_commit: None,
			last_sync_at: None,
			status: CodebaseStatus::Pending,
			created_at: now,
			updated_at: now,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
struct CodebaseRow {
	id: String,
	project_id: String,
	name: String,
	git_url: String,
	remote_project_id: Option<i64>,
	branch: String,
	storage_path: Option<String>,
	language: Option<String>,
	sync_mode: String,
	webhook_secret: Option<String>,
	last_sync_commit: Option<String>,
	last_sync_at: Option<String>,
	status: String,
	created_at: String,
	updated_at: String,
}

impl TryFrom<CodebaseRow> for CodebaseRecord {
	type Error = DbError;

	fn try_from(row: CodebaseRow) -> Result<Self> {
		Ok(CodebaseRecord {
			id: row.id,
			project_id: row.project_id,
			name: row.name,
			git_url: row.git_url,
			remote_project_id: row.remote_project_id,
			branch: row.branch,
			storage_path: row.storage_path,
			language: row.language,
			sync_mode: row
				.sync_mode
				.parse()
				.map_err(|e: String| DbError::Internal(e))?,
			webhook_secret: row.webhook_secret,
			last_sync_commit: row.last_sync_commit,
			last_sync_at: parse_opt_ts(row.last_sync_at.as_deref())?,
			status: row
				.status
				.parse()
				.map_err(|e: String| DbError::Internal(e))?,
			created_at: parse_ts(&row.created_at)?,
			updated_at: parse_ts(&row.updated_at)?,
		})
	}
}

const SELECT_COLUMNS: &str = "id, project_id, name, git_url, remote_project_id, branch, \
	storage_path, language, sync_mode, webhook_secret, last_sync_commit, last_sync_at, status, \
	created_at, updated_at";

#[derive(Clone)]
pub struct CodebaseRepository {
	pool: SqlitePool,
}

impl CodebaseRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert a codebase. (project_id, git_url) is unique; a duplicate
	/// registration surfaces as `DbError::Conflict`.
	#[tracing::instrument(skip(self, record), fields(codebase_id = %record.id))]
	pub async fn create(&self, record: &CodebaseRecord) -> Result<()> {
		let result = sqlx::query(
			r#"
			INSERT INTO codebases (id, project_id, name, git_url, remote_project_id, branch,
				storage_path, language, sync_mode, webhook_secret, last_sync_commit, last_sync_at,
				status, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&record.id)
		.bind(&record.project_id)
		.bind(&record.name)
		.bind(&record.git_url)
		.bind(record.remote_project_id)
		.bind(&record.branch)
		.bind(&record.storage_path)
		.bind(&record.language)
		.bind(record.sync_mode.as_str())
		.bind(&record.webhook_secret)
		.bind(&record.last_sync_commit)
		.bind(record.last_sync_at.as_ref().map(format_ts))
		.bind(record.status.as_str())
		.bind(format_ts(&record.created_at))
		.bind(format_ts(&record.updated_at))
		.execute(&self.pool)
		.await;

		match result {
			Ok(_) => Ok(()),
			Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(DbError::Conflict(
				format!("codebase with git_url {} already exists in project", record.git_url),
			)),
			Err(e) => Err(e.into()),
		}
	}

	#[tracing::instrument(skip(self))]
	pub async fn get(&self, id: &str) -> Result<Option<CodebaseRecord>> {
		let row = sqlx::query_as::<_, CodebaseRow>(&format!(
			"SELECT {SELECT_COLUMNS} FROM codebases WHERE id = ?"
		))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(CodebaseRecord::try_from).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<CodebaseRecord>> {
		let rows = sqlx::query_as::<_, CodebaseRow>(&format!(
			"SELECT {SELECT_COLUMNS} FROM codebases WHERE project_id = ? ORDER BY created_at"
		))
		.bind(project_id)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(CodebaseRecord::try_from).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn update_status(&self, id: &str, status: CodebaseStatus) -> Result<()> {
		let result = sqlx::query("UPDATE codebases SET status = ?, updated_at = ? WHERE id = ?")
			.bind(status.as_str())
			.bind(format_ts(&Utc::now()))
			.bind(id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("codebase {id}")));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn update_storage_path(&self, id: &str, storage_path: &str) -> Result<()> {
		sqlx::query("UPDATE codebases SET storage_path = ?, updated_at = ? WHERE id = ?")
			.bind(storage_path)
			.bind(format_ts(&Utc::now()))
			.bind(id)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	/// Advance the sync watermark. Called only once a sync's work has been
	/// fully committed downstream, so `last_sync_commit` never points at a
	/// commit whose graph state is missing.
	#[tracing::instrument(skip(self))]
	pub async fn record_sync(
		&self,
		id: &str,
		commit: &str,
		language: Option<&str>,
	) -> Result<()> {
		let now = format_ts(&Utc::now());
		let result = sqlx::query(
			r#"
			UPDATE codebases
			SET last_sync_commit = ?, last_sync_at = ?, status = 'active',
				language = COALESCE(?, language), updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(commit)
		.bind(&now)
		.bind(language)
		.bind(&now)
		.bind(id)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("codebase {id}")));
		}
		Ok(())
	}
}
