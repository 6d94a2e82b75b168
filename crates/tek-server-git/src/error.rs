// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
	#[error("git is not installed or not in PATH")]
	GitNotInstalled,

	#[error("git {args:?} failed: {stderr}")]
	CommandFailed { args: Vec<String>, stderr: String },

	#[error("git {args:?} timed out after {timeout_secs}s")]
	Timeout { args: Vec<String>, timeout_secs: u64 },

	#[error("not a git repository: {0}")]
	InvalidRepository(PathBuf),

	#[error("unexpected git output: {0}")]
	Parse(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl GitError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, GitError::Timeout { .. })
	}
}

pub type Result<T> = std::result::Result<T, GitError>;
