// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cleanup task: removes the job's scratch directories and reports how
//! much disk was reclaimed. Never touches the codebase working tree.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use crate::context::{CleanupData, JobContext, TaskData, TaskKind};
use crate::error::Result;
use crate::task::{Task, TaskResult};

pub struct CleanupTask;

#[async_trait]
impl Task for CleanupTask {
	fn kind(&self) -> TaskKind {
		TaskKind::Cleanup
	}

	fn description(&self) -> &str {
		"Remove per-job scratch directories"
	}

	#[instrument(skip_all, fields(job_id = %ctx.job.id))]
	async fn execute(&self, ctx: &mut JobContext) -> Result<TaskResult> {
		// temp_dir lives under working_dir; one sweep covers both.
		let (temp_files_removed, disk_space_freed) = measure_tree(&ctx.working_dir);

		match tokio::fs::remove_dir_all(&ctx.working_dir).await {
			Ok(()) => {}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
			Err(e) => return Err(e.into()),
		}

		debug!(
			files = temp_files_removed,
			bytes = disk_space_freed,
			"scratch directories removed"
		);

		let data = CleanupData {
			temp_files_removed,
			disk_space_freed,
		};
		let metrics = json!({
			"tempFilesRemoved": temp_files_removed,
			"diskSpaceFreed": disk_space_freed,
		});

		Ok(TaskResult::ok(TaskData::Cleanup(data)).with_metrics(metrics))
	}
}

/// Count files and sum their sizes before deletion.
fn measure_tree(root: &std::path::Path) -> (u64, u64) {
	let mut files = 0u64;
	let mut bytes = 0u64;

	let Ok(entries) = std::fs::read_dir(root) else {
		return (0, 0);
	};
	for entry in entries.flatten() {
		let path = entry.path();
		if path.is_dir() {
			let (sub_files, sub_bytes) = measure_tree(&path);
			files += sub_files;
			bytes += sub_bytes;
		} else if let Ok(metadata) = entry.metadata() {
			files += 1;
			bytes += metadata.len();
		}
	}

	(files, bytes)
}
