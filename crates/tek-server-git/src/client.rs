// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CloneOptions, CommitInfo, DiffEntry};

/// Operations the indexing pipeline needs from a Git implementation.
///
/// The production implementation shells out to the git CLI
/// ([`crate::CommandGitClient`]); tests substitute mocks.
#[async_trait]
pub trait GitClient: Send + Sync {
	/// Clone `url` into `local_path` and return the HEAD commit hash.
	async fn clone_repository(
		&self,
		url: &str,
		local_path: &Path,
		options: &CloneOptions,
	) -> Result<String>;

	/// Pull `origin/<branch>` (or the tracking branch) and return the new
	/// HEAD commit hash.
	async fn pull_repository(&self, local_path: &Path, branch: Option<&str>) -> Result<String>;

	async fn current_commit(&self, local_path: &Path) -> Result<String>;

	/// `git diff --name-status <from>..HEAD`; with `from = None`, the diff
	/// of the last commit.
	async fn diff(&self, local_path: &Path, from_commit: Option<&str>) -> Result<Vec<DiffEntry>>;

	async fn commit_info(&self, local_path: &Path, commit: Option<&str>) -> Result<CommitInfo>;

	/// Commit metadata walking back from HEAD, newest first. `files` is
	/// not populated here.
	async fn commit_history(
		&self,
		local_path: &Path,
		from_commit: Option<&str>,
		limit: Option<usize>,
	) -> Result<Vec<CommitInfo>>;

	async fn file_content(
		&self,
		local_path: &Path,
		path: &str,
		commit: Option<&str>,
	) -> Result<String>;

	/// Tracked files, optionally narrowed by pathspecs.
	async fn list_files(&self, local_path: &Path, patterns: &[String]) -> Result<Vec<String>>;

	async fn is_valid_repository(&self, local_path: &Path) -> bool;

	async fn archive_repository(
		&self,
		local_path: &Path,
		out_path: &Path,
		commit: Option<&str>,
	) -> Result<()>;

	async fn delete_repository(&self, local_path: &Path) -> Result<()>;
}
