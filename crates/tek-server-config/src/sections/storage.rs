// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Filesystem layout: codebase working trees and per-job scratch space.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfigLayer {
	pub root: Option<PathBuf>,
	pub storage_type: Option<String>,
	pub max_file_size_mb: Option<u64>,
}

impl StorageConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.root.is_some() {
			self.root = other.root;
		}
		if other.storage_type.is_some() {
			self.storage_type = other.storage_type;
		}
		if other.max_file_size_mb.is_some() {
			self.max_file_size_mb = other.max_file_size_mb;
		}
	}

	pub fn finalize(self) -> StorageConfig {
		StorageConfig {
			root: self.root.unwrap_or_else(|| PathBuf::from("./storage")),
			storage_type: self.storage_type.unwrap_or_else(|| "local".to_string()),
			max_file_size_mb: self.max_file_size_mb.unwrap_or(10),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
	pub root: PathBuf,
	pub storage_type: String,
	pub max_file_size_mb: u64,
}

impl StorageConfig {
	/// Working tree location for a codebase; persists across jobs.
	pub fn codebase_path(&self, codebase_id: &str) -> PathBuf {
		self.root.join("codebases").join(codebase_id)
	}

	/// Per-job scratch directory, removed by the cleanup task.
	pub fn job_scratch_path(&self, job_id: &str) -> PathBuf {
		std::env::temp_dir()
			.join("tekaicontextengine")
			.join("jobs")
			.join(job_id)
	}
}

impl Default for StorageConfig {
	fn default() -> Self {
		StorageConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_codebase_path_layout() {
		let config = StorageConfig::default();
		let path = config.codebase_path("cb-1");
		assert!(path.ends_with("codebases/cb-1"));
	}

	#[test]
	fn test_job_scratch_under_tmp() {
		let config = StorageConfig::default();
		let path = config.job_scratch_path("job-1");
		assert!(path.starts_with(std::env::temp_dir()));
		assert!(path.ends_with("tekaicontextengine/jobs/job-1"));
	}
}
