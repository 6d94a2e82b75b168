// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Worker pool sizing and the base task timeout.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobsConfigLayer {
	pub max_workers: Option<usize>,
	pub task_timeout_ms: Option<u64>,
}

impl JobsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.max_workers.is_some() {
			self.max_workers = other.max_workers;
		}
		if other.task_timeout_ms.is_some() {
			self.task_timeout_ms = other.task_timeout_ms;
		}
	}

	pub fn finalize(self) -> JobsConfig {
		JobsConfig {
			max_workers: self.max_workers.unwrap_or(4),
			task_timeout_ms: self.task_timeout_ms.unwrap_or(1_800_000),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobsConfig {
	pub max_workers: usize,
	/// Base per-job timeout; job types scale it by a multiplier.
	pub task_timeout_ms: u64,
}

impl Default for JobsConfig {
	fn default() -> Self {
		JobsConfigLayer::default().finalize()
	}
}
