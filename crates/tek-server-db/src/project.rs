// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{DbError, Result};
use crate::time::{format_ts, parse_ts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
	Active,
	Archived,
	Deleted,
}

impl ProjectStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			ProjectStatus::Active => "active",
			ProjectStatus::Archived => "archived",
			ProjectStatus::Deleted => "deleted",
		}
	}
}

impl std::str::FromStr for ProjectStatus {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"active" => Ok(ProjectStatus::Active),
			"archived" => Ok(ProjectStatus::Archived),
			"deleted" => Ok(ProjectStatus::Deleted),
			_ => Err(format!("unknown project status: {s}")),
		}
	}
}

/// Normalize a display name into a URL slug: lowercase, runs of
/// non-alphanumerics collapse to a single dash, no leading/trailing dash.
pub fn slugify(name: &str) -> String {
	let mut slug = String::with_capacity(name.len());
	let mut pending_dash = false;

	for c in name.chars() {
		if c.is_ascii_alphanumeric() {
			if pending_dash && !slug.is_empty() {
				slug.push('-');
			}
			pending_dash = false;
			slug.push(c.to_ascii_lowercase());
		} else {
			pending_dash = true;
		}
	}

	slug
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
	pub id: String,
	pub name: String,
	pub slug: String,
	pub description: Option<String>,
	pub status: ProjectStatus,
	pub metadata: serde_json::Value,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl ProjectRecord {
	pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
		let name = name.into();
		let now = Utc::now();
		Self {
			id: uuid::Uuid::new_v4().to_string(),
			slug: slugify(&name),
			name,
			description,
			status: ProjectStatus::Active,
			metadata: serde_json::json!({}),
			created_at: now,
			updated_at: now,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
	id: String,
	name: String,
	slug: String,
	description: Option<String>,
	status: String,
	metadata: String,
	created_at: String,
	updated_at: String,
}

impl TryFrom<ProjectRow> for ProjectRecord {
	type Error = DbError;

	fn try_from(row: ProjectRow) -> Result<Self> {
		Ok(ProjectRecord {
			id: row.id,
			name: row.name,
			slug: row.slug,
			description: row.description,
			status: row
				.status
				.parse()
				.map_err(|e: String| DbError::Internal(e))?,
			metadata: serde_json::from_str(&row.metadata)?,
			created_at: parse_ts(&row.created_at)?,
			updated_at: parse_ts(&row.updated_at)?,
		})
	}
}

#[derive(Clone)]
pub struct ProjectRepository {
	pool: SqlitePool,
}

impl ProjectRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, record), fields(project_id = %record.id))]
	pub async fn create(&self, record: &ProjectRecord) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO tek_projects (id, name, slug, description, status, metadata, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&record.id)
		.bind(&record.name)
		.bind(&record.slug)
		.bind(&record.description)
		.bind(record.status.as_str())
		.bind(serde_json::to_string(&record.metadata)?)
		.bind(format_ts(&record.created_at))
		.bind(format_ts(&record.updated_at))
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn get(&self, id: &str) -> Result<Option<ProjectRecord>> {
		let row = sqlx::query_as::<_, ProjectRow>(
			"SELECT id, name, slug, description, status, metadata, created_at, updated_at
			 FROM tek_projects WHERE id = ?",
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(ProjectRecord::try_from).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list(&self) -> Result<Vec<ProjectRecord>> {
		let rows = sqlx::query_as::<_, ProjectRow>(
			"SELECT id, name, slug, description, status, metadata, created_at, updated_at
			 FROM tek_projects WHERE status != 'deleted' ORDER BY created_at",
		)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(ProjectRecord::try_from).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn update_status(&self, id: &str, status: ProjectStatus) -> Result<()> {
		let result = sqlx::query("UPDATE tek_projects SET status = ?, updated_at = ? WHERE id = ?")
			.bind(status.as_str())
			.bind(format_ts(&Utc::now()))
			.bind(id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("project {id}")));
		}
		Ok(())
	}

	/// Soft-delete a project and cascade an archive onto its codebases.
	#[tracing::instrument(skip(self))]
	pub async fn delete(&self, id: &str) -> Result<()> {
		let mut tx = self.pool.begin().await?;
		let now = format_ts(&Utc::now());

		let result = sqlx::query("UPDATE tek_projects SET status = 'deleted', updated_at = ? WHERE id = ?")
			.bind(&now)
			.bind(id)
			.execute(&mut *tx)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("project {id}")));
		}

		sqlx::query("UPDATE codebases SET status = 'archived', updated_at = ? WHERE project_id = ?")
			.bind(&now)
			.bind(id)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::memory_pool;

	#[test]
	fn test_slugify_basic() {
		assert_eq!(slugify("My Project"), "my-project");
		assert_eq!(slugify("already-slugged"), "already-slugged");
	}

	#[test]
	fn test_slugify_collapses_runs() {
		assert_eq!(slugify("A  --  B"), "a-b");
		assert_eq!(slugify("tek / context / engine"), "tek-context-engine");
	}

	#[test]
	fn test_slugify_trims_edges() {
		assert_eq!(slugify("  padded  "), "padded");
		assert_eq!(slugify("!!!"), "");
	}

	#[tokio::test]
	async fn test_create_and_get_roundtrip() {
		let pool = memory_pool().await;
		let repo = ProjectRepository::new(pool);

		let record = ProjectRecord::new("Acme Payments", Some("payments platform".into()));
		repo.create(&record).await.unwrap();

		let loaded = repo.get(&record.id).await.unwrap().unwrap();
		assert_eq!(loaded.name, "Acme Payments");
		assert_eq!(loaded.slug, "acme-payments");
		assert_eq!(loaded.status, ProjectStatus::Active);
	}

	#[tokio::test]
	async fn test_get_missing_returns_none() {
		let pool = memory_pool().await;
		let repo = ProjectRepository::new(pool);

		assert!(repo.get("nope").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_delete_archives_codebases() {
		let pool = memory_pool().await;
		let projects = ProjectRepository::new(pool.clone());
		let codebases = crate::codebase::CodebaseRepository::new(pool);

		let project = ProjectRecord::new("P", None);
		projects.create(&project).await.unwrap();

		let cb = crate::codebase::CodebaseRecord::new(
			&project.id,
			"svc",
			"https://git.example/acme/svc.git",
		);
		codebases.create(&cb).await.unwrap();

		projects.delete(&project.id).await.unwrap();

		let loaded = codebases.get(&cb.id).await.unwrap().unwrap();
		assert_eq!(loaded.status, crate::codebase::CodebaseStatus::Archived);
		assert!(projects.list().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_update_status_missing_project() {
		let pool = memory_pool().await;
		let repo = ProjectRepository::new(pool);

		let err = repo
			.update_status("ghost", ProjectStatus::Archived)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}
}
