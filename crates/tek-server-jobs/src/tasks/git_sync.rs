// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Git synchronization task.
//!
//! Incremental mode pulls and diffs against the stored base commit; full
//! mode wipes the working tree and clones fresh. Either way the reported
//! change sets are filtered through the exclude patterns and the size cap.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use tek_server_git::{CloneOptions, FileOperation, GitAuth, GitClient};

use crate::config::TaskConfigResolver;
use crate::context::{GitSyncData, JobContext, TaskData, TaskKind};
use crate::error::{JobError, Result};
use crate::task::{Task, TaskResult};

const FULL_SYNC_ESTIMATE: Duration = Duration::from_secs(120);

pub struct GitSyncTask {
	git: Arc<dyn GitClient>,
	resolver: Arc<TaskConfigResolver>,
}

impl GitSyncTask {
	pub fn new(git: Arc<dyn GitClient>, resolver: Arc<TaskConfigResolver>) -> Self {
		Self { git, resolver }
	}

	pub fn estimated_duration(incremental: bool) -> Duration {
		if incremental {
			FULL_SYNC_ESTIMATE.mul_f64(0.3)
		} else {
			FULL_SYNC_ESTIMATE
		}
	}
}

#[async_trait]
impl Task for GitSyncTask {
	fn kind(&self) -> TaskKind {
		TaskKind::GitSync
	}

	fn description(&self) -> &str {
		"Synchronize the codebase working tree from its git remote"
	}

	async fn should_execute(&self, ctx: &JobContext) -> bool {
		self.resolver.git_sync_enabled()
			&& ctx
				.codebase
				.as_ref()
				.is_some_and(|codebase| !codebase.git_url.is_empty())
	}

	async fn validate(&self, ctx: &JobContext) -> Result<()> {
		if !ctx.working_dir.exists() {
			return Err(JobError::Validation(format!(
				"working directory {} does not exist",
				ctx.working_dir.display()
			)));
		}
		if ctx.codebase.is_none() {
			return Err(JobError::Validation("job has no codebase to sync".into()));
		}
		Ok(())
	}

	#[instrument(skip_all, fields(job_id = %ctx.job.id))]
	async fn execute(&self, ctx: &mut JobContext) -> Result<TaskResult> {
		let resolved = self.resolver.resolve_git_sync(&ctx.job, None)?;
		let config = &resolved.config;
		let codebase = ctx
			.codebase
			.clone()
			.ok_or_else(|| JobError::Validation("job has no codebase to sync".into()))?;
		let storage = ctx.storage_path.clone();

		let auth = config.access_token.as_ref().map(|token| GitAuth {
			username: config.username.clone(),
			access_token: token.clone(),
		});

		let is_repo = self.git.is_valid_repository(&storage).await;
		let incremental = resolved.incremental && is_repo && resolved.base_commit.is_some();

		if ctx.cancellation.is_cancelled() {
			return Err(JobError::Cancelled);
		}

		let (commit_hash, mut added, mut changed, mut deleted) = if incremental {
			let base = resolved
				.base_commit
				.as_deref()
				.ok_or_else(|| JobError::Internal("incremental sync without base commit".into()))?;

			info!(codebase_id = %codebase.id, base, "incremental sync");
			let commit = self
				.git
				.pull_repository(&storage, Some(&codebase.branch))
				.await?;

			let mut added = Vec::new();
			let mut changed = Vec::new();
			let mut deleted = Vec::new();
			for entry in self.git.diff(&storage, Some(base)).await? {
				match entry.operation {
					FileOperation::Added => added.push(entry.path),
					FileOperation::Modified => changed.push(entry.path),
					FileOperation::Deleted => deleted.push(entry.path),
					FileOperation::Renamed => {
						if let Some(old_path) = entry.old_path {
							deleted.push(old_path);
						}
						added.push(entry.path);
					}
				}
			}
			(commit, added, changed, deleted)
		} else {
			info!(codebase_id = %codebase.id, url_configured = !codebase.git_url.is_empty(), "full sync");
			if storage.exists() {
				// A stale or invalid tree cannot be cloned over.
				self.git.delete_repository(&storage).await?;
			}

			let options = CloneOptions {
				branch: Some(codebase.branch.clone()),
				depth: config.shallow.then_some(1),
				sparse_checkout: Vec::new(),
				auth,
			};
			let commit = self
				.git
				.clone_repository(&codebase.git_url, &storage, &options)
				.await?;
			let added = self.git.list_files(&storage, &[]).await?;
			(commit, added, Vec::new(), Vec::new())
		};

		if ctx.cancellation.is_cancelled() {
			return Err(JobError::Cancelled);
		}

		let size_cap = Some((storage.as_path(), config.max_file_size));
		retain_included(&mut added, &config.exclude_patterns, size_cap);
		retain_included(&mut changed, &config.exclude_patterns, size_cap);
		// Deleted files are gone from disk; only pattern filtering applies.
		retain_included(&mut deleted, &config.exclude_patterns, None);
		if !config.include_deleted {
			deleted.clear();
		}

		debug!(
			added = added.len(),
			changed = changed.len(),
			deleted = deleted.len(),
			commit = %commit_hash,
			"sync complete"
		);

		let metrics = json!({
			"filesAdded": added.len(),
			"filesChanged": changed.len(),
			"filesDeleted": deleted.len(),
			"incremental": incremental,
		});

		Ok(TaskResult::ok(TaskData::GitSync(GitSyncData {
			clone_path: storage,
			commit_hash,
			files_changed: changed,
			files_added: added,
			files_deleted: deleted,
		}))
		.with_metrics(metrics))
	}
}

/// Drop paths matching any exclude pattern, plus (when a size cap applies)
/// files larger than the cap.
fn retain_included(
	paths: &mut Vec<String>,
	exclude_patterns: &[String],
	size_cap: Option<(&Path, u64)>,
) {
	paths.retain(|path| {
		if is_excluded(path, exclude_patterns) {
			return false;
		}
		if let Some((root, max_size)) = size_cap {
			if let Ok(metadata) = std::fs::metadata(root.join(path)) {
				if metadata.len() > max_size {
					warn!(path, size = metadata.len(), "file exceeds size cap, excluded");
					return false;
				}
			}
		}
		true
	});
}

/// Patterns are either `*.ext` suffix globs or path-segment names
/// (`node_modules` excludes any path containing that segment).
fn is_excluded(path: &str, patterns: &[String]) -> bool {
	patterns.iter().any(|pattern| {
		if let Some(ext) = pattern.strip_prefix("*.") {
			return path.ends_with(&format!(".{ext}"));
		}
		path == pattern || path.split('/').any(|segment| segment == pattern)
	})
}
