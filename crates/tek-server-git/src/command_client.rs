// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::auth::{authenticated_url, redact_url};
use crate::client::GitClient;
use crate::error::{GitError, Result};
use crate::types::{CloneOptions, CommitInfo, DiffEntry, FileOperation};

const CLONE_TIMEOUT: Duration = Duration::from_secs(600);
const PULL_TIMEOUT: Duration = Duration::from_secs(300);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

const COMMIT_FORMAT: &str = "%H%x1f%an%x1f%ae%x1f%aI%x1f%s";

/// Git client implementation using the git CLI.
pub struct CommandGitClient;

impl CommandGitClient {
	pub fn new() -> Self {
		Self
	}
}

impl Default for CommandGitClient {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl GitClient for CommandGitClient {
	async fn clone_repository(
		&self,
		url: &str,
		local_path: &Path,
		options: &CloneOptions,
	) -> Result<String> {
		if let Some(parent) = local_path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		let remote = authenticated_url(url, options.auth.as_ref());

		let mut args: Vec<String> = vec!["clone".into()];
		if let Some(branch) = &options.branch {
			args.push("--branch".into());
			args.push(branch.clone());
		}
		if let Some(depth) = options.depth {
			args.push("--depth".into());
			args.push(depth.to_string());
		}
		args.push(remote);
		args.push(local_path.display().to_string());

		run_git(None, &args, CLONE_TIMEOUT).await?;

		if !options.sparse_checkout.is_empty() {
			apply_sparse_checkout(local_path, &options.sparse_checkout).await?;
		}

		debug!(
			url = %redact_url(url),
			path = %local_path.display(),
			"cloned repository"
		);

		head_commit_or_unborn(local_path).await
	}

	async fn pull_repository(&self, local_path: &Path, branch: Option<&str>) -> Result<String> {
		let mut args: Vec<String> = vec!["pull".into()];
		if let Some(branch) = branch {
			args.push("origin".into());
			args.push(branch.to_string());
		}

		run_git(Some(local_path), &args, PULL_TIMEOUT).await?;

		let commit = self.current_commit(local_path).await?;
		debug!(path = %local_path.display(), commit = %commit, "pulled repository");
		Ok(commit)
	}

	async fn current_commit(&self, local_path: &Path) -> Result<String> {
		run_git(
			Some(local_path),
			&["rev-parse".into(), "HEAD".into()],
			COMMAND_TIMEOUT,
		)
		.await
	}

	async fn diff(&self, local_path: &Path, from_commit: Option<&str>) -> Result<Vec<DiffEntry>> {
		let range = match from_commit {
			Some(from) => format!("{from}..HEAD"),
			None => "HEAD~1..HEAD".to_string(),
		};

		let output = run_git(
			Some(local_path),
			&["diff".into(), "--name-status".into(), range],
			COMMAND_TIMEOUT,
		)
		.await?;

		Ok(parse_name_status(&output))
	}

	async fn commit_info(&self, local_path: &Path, commit: Option<&str>) -> Result<CommitInfo> {
		let commit = commit.unwrap_or("HEAD");
		let meta = run_git(
			Some(local_path),
			&[
				"show".into(),
				"-s".into(),
				format!("--format={COMMIT_FORMAT}"),
				commit.to_string(),
			],
			COMMAND_TIMEOUT,
		)
		.await?;

		let mut info = parse_commit_line(&meta)?;

		let files = run_git(
			Some(local_path),
			&[
				"show".into(),
				"--name-only".into(),
				"--format=".into(),
				commit.to_string(),
			],
			COMMAND_TIMEOUT,
		)
		.await?;
		info.files = files.lines().map(str::to_string).collect();

		Ok(info)
	}

	async fn commit_history(
		&self,
		local_path: &Path,
		from_commit: Option<&str>,
		limit: Option<usize>,
	) -> Result<Vec<CommitInfo>> {
		let mut args: Vec<String> = vec!["log".into(), format!("--format={COMMIT_FORMAT}")];
		if let Some(limit) = limit {
			args.push("-n".into());
			args.push(limit.to_string());
		}
		if let Some(from) = from_commit {
			args.push(format!("{from}..HEAD"));
		}

		let output = run_git(Some(local_path), &args, COMMAND_TIMEOUT).await?;
		output
			.lines()
			.filter(|l| !l.is_empty())
			.map(parse_commit_line)
			.collect()
	}

	async fn file_content(
		&self,
		local_path: &Path,
		path: &str,
		commit: Option<&str>,
	) -> Result<String> {
		let spec = format!("{}:{}", commit.unwrap_or("HEAD"), path);
		run_git(Some(local_path), &["show".into(), spec], COMMAND_TIMEOUT).await
	}

	async fn list_files(&self, local_path: &Path, patterns: &[String]) -> Result<Vec<String>> {
		let mut args: Vec<String> = vec!["ls-files".into()];
		if !patterns.is_empty() {
			args.push("--".into());
			args.extend(patterns.iter().cloned());
		}

		let output = run_git(Some(local_path), &args, COMMAND_TIMEOUT).await?;
		Ok(output
			.lines()
			.filter(|l| !l.is_empty())
			.map(str::to_string)
			.collect())
	}

	async fn is_valid_repository(&self, local_path: &Path) -> bool {
		if !local_path.is_dir() {
			return false;
		}

		let toplevel = run_git(
			Some(local_path),
			&["rev-parse".into(), "--show-toplevel".into()],
			COMMAND_TIMEOUT,
		)
		.await;

		match (toplevel, local_path.canonicalize()) {
			(Ok(top), Ok(canonical)) => Path::new(&top) == canonical,
			_ => false,
		}
	}

	async fn archive_repository(
		&self,
		local_path: &Path,
		out_path: &Path,
		commit: Option<&str>,
	) -> Result<()> {
		if let Some(parent) = out_path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		run_git(
			Some(local_path),
			&[
				"archive".into(),
				"--format=tar.gz".into(),
				"-o".into(),
				out_path.display().to_string(),
				commit.unwrap_or("HEAD").to_string(),
			],
			COMMAND_TIMEOUT,
		)
		.await?;
		Ok(())
	}

	async fn delete_repository(&self, local_path: &Path) -> Result<()> {
		match tokio::fs::remove_dir_all(local_path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}

/// HEAD hash, or empty for a repository with no commits yet.
async fn head_commit_or_unborn(local_path: &Path) -> Result<String> {
	match run_git(
		Some(local_path),
		&["rev-parse".into(), "--verify".into(), "HEAD".into()],
		COMMAND_TIMEOUT,
	)
	.await
	{
		Ok(hash) => Ok(hash),
		Err(GitError::CommandFailed { .. }) => {
			debug!(path = %local_path.display(), "repository has no commits");
			Ok(String::new())
		}
		Err(e) => Err(e),
	}
}

async fn apply_sparse_checkout(local_path: &Path, patterns: &[String]) -> Result<()> {
	run_git(
		Some(local_path),
		&["config".into(), "core.sparseCheckout".into(), "true".into()],
		COMMAND_TIMEOUT,
	)
	.await?;

	let sparse_file = local_path.join(".git").join("info").join("sparse-checkout");
	if let Some(parent) = sparse_file.parent() {
		tokio::fs::create_dir_all(parent).await?;
	}
	tokio::fs::write(&sparse_file, patterns.join("\n")).await?;

	run_git(
		Some(local_path),
		&[
			"read-tree".into(),
			"-m".into(),
			"-u".into(),
			"HEAD".into(),
		],
		COMMAND_TIMEOUT,
	)
	.await?;

	Ok(())
}

/// Runs a git command under a timeout and returns trimmed stdout.
///
/// The command line is logged and reported with credentials redacted. On
/// timeout the child is killed and a distinct error is returned.
async fn run_git(dir: Option<&Path>, args: &[String], timeout: Duration) -> Result<String> {
	let mut cmd = Command::new("git");
	if let Some(dir) = dir {
		cmd.arg("-C").arg(dir);
	}
	cmd.args(args);
	cmd.kill_on_drop(true);

	let redacted: Vec<String> = args.iter().map(|a| redact_url(a)).collect();
	trace!(args = ?redacted, "running git command");

	let output = match tokio::time::timeout(timeout, cmd.output()).await {
		Ok(result) => result.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				warn!("git not found in PATH");
				GitError::GitNotInstalled
			} else {
				GitError::Io(e)
			}
		})?,
		Err(_) => {
			warn!(args = ?redacted, timeout_secs = timeout.as_secs(), "git command timed out");
			return Err(GitError::Timeout {
				args: redacted,
				timeout_secs: timeout.as_secs(),
			});
		}
	};

	if output.status.success() {
		Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
	} else {
		let stderr = redact_url(String::from_utf8_lossy(&output.stderr).trim());
		Err(GitError::CommandFailed {
			args: redacted,
			stderr,
		})
	}
}

/// Parses `git diff --name-status` output. Rename lines carry both paths;
/// unknown status letters are skipped.
fn parse_name_status(output: &str) -> Vec<DiffEntry> {
	let mut entries = Vec::new();

	for line in output.lines() {
		let mut parts = line.split('\t');
		let Some(status) = parts.next() else { continue };
		let Some(operation) = FileOperation::from_status(status) else {
			continue;
		};

		match operation {
			FileOperation::Renamed => {
				let (Some(old_path), Some(new_path)) = (parts.next(), parts.next()) else {
					continue;
				};
				entries.push(DiffEntry {
					path: new_path.to_string(),
					operation,
					old_path: Some(old_path.to_string()),
				});
			}
			_ => {
				let Some(path) = parts.next() else { continue };
				entries.push(DiffEntry {
					path: path.to_string(),
					operation,
					old_path: None,
				});
			}
		}
	}

	entries
}

fn parse_commit_line(line: &str) -> Result<CommitInfo> {
	let fields: Vec<&str> = line.trim().split('\u{1f}').collect();
	if fields.len() != 5 {
		return Err(GitError::Parse(format!("unexpected commit line: {line:?}")));
	}

	let date = DateTime::parse_from_rfc3339(fields[3])
		.map(|d| d.with_timezone(&Utc))
		.map_err(|e| GitError::Parse(format!("invalid commit date {:?}: {e}", fields[3])))?;

	Ok(CommitInfo {
		hash: fields[0].to_string(),
		author: fields[1].to_string(),
		email: fields[2].to_string(),
		date,
		message: fields[4].to_string(),
		files: Vec::new(),
	})
}
