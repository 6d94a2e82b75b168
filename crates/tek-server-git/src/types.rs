// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};

/// Credentials embedded into the remote URL for HTTPS auth.
#[derive(Debug, Clone)]
pub struct GitAuth {
	pub username: Option<String>,
	pub access_token: String,
}

#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
	pub branch: Option<String>,
	pub depth: Option<u32>,
	pub sparse_checkout: Vec<String>,
	pub auth: Option<GitAuth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
	Added,
	Modified,
	Deleted,
	Renamed,
}

impl FileOperation {
	pub fn from_status(status: &str) -> Option<Self> {
		match status.chars().next()? {
			'A' => Some(FileOperation::Added),
			'M' => Some(FileOperation::Modified),
			'D' => Some(FileOperation::Deleted),
			'R' => Some(FileOperation::Renamed),
			_ => None,
		}
	}
}

/// One entry of `git diff --name-status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
	pub path: String,
	pub operation: FileOperation,
	/// Populated for renames: the pre-rename path.
	pub old_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommitInfo {
	pub hash: String,
	pub author: String,
	pub email: String,
	pub date: DateTime<Utc>,
	pub message: String,
	pub files: Vec<String>,
}
