// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema creation for the metadata store.

use sqlx::SqlitePool;

use crate::error::Result;

/// Apply the schema. Statements are idempotent so this runs on every startup.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	let statements = [
		r#"
		CREATE TABLE IF NOT EXISTS tek_projects (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL,
			slug TEXT NOT NULL,
			description TEXT,
			status TEXT NOT NULL DEFAULT 'active',
			metadata TEXT NOT NULL DEFAULT '{}',
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
		r#"
		CREATE TABLE IF NOT EXISTS codebases (
			id TEXT PRIMARY KEY,
			project_id TEXT NOT NULL REFERENCES tek_projects(id),
			name TEXT NOT NULL,
			git_url TEXT NOT NULL,
			remote_project_id INTEGER,
			branch TEXT NOT NULL DEFAULT 'main',
			storage_path TEXT,
			language TEXT,
			sync_mode TEXT NOT NULL DEFAULT 'manual',
			webhook_secret TEXT,
			last_sync_commit TEXT,
			last_sync_at TEXT,
			status TEXT NOT NULL DEFAULT 'pending',
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
		r#"
		CREATE UNIQUE INDEX IF NOT EXISTS idx_codebases_project_git_url
			ON codebases(project_id, git_url)
		"#,
		r#"
		CREATE TABLE IF NOT EXISTS docs_buckets (
			id TEXT PRIMARY KEY,
			project_id TEXT NOT NULL REFERENCES tek_projects(id),
			name TEXT NOT NULL,
			description TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
		r#"
		CREATE TABLE IF NOT EXISTS documents (
			id TEXT PRIMARY KEY,
			bucket_id TEXT NOT NULL REFERENCES docs_buckets(id),
			codebase_id TEXT REFERENCES codebases(id),
			title TEXT NOT NULL,
			path TEXT NOT NULL,
			content_type TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
		r#"
		CREATE TABLE IF NOT EXISTS index_jobs (
			id TEXT PRIMARY KEY,
			project_id TEXT NOT NULL REFERENCES tek_projects(id),
			codebase_id TEXT REFERENCES codebases(id),
			job_type TEXT NOT NULL,
			status TEXT NOT NULL DEFAULT 'pending',
			trigger_source TEXT NOT NULL DEFAULT 'manual',
			current_task TEXT,
			progress INTEGER NOT NULL DEFAULT 0,
			priority INTEGER NOT NULL DEFAULT 0,
			description TEXT,
			metadata TEXT NOT NULL DEFAULT '{}',
			error_message TEXT,
			error_stack TEXT,
			retry_count INTEGER NOT NULL DEFAULT 0,
			max_retries INTEGER NOT NULL DEFAULT 3,
			started_at TEXT,
			completed_at TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
		r#"
		CREATE INDEX IF NOT EXISTS idx_index_jobs_codebase_status
			ON index_jobs(codebase_id, status)
		"#,
		r#"
		CREATE INDEX IF NOT EXISTS idx_index_jobs_project
			ON index_jobs(project_id)
		"#,
	];

	for statement in statements {
		sqlx::query(statement).execute(pool).await?;
	}

	tracing::debug!("migrations applied");
	Ok(())
}
