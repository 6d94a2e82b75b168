// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Graph update task.
//!
//! Idempotently MERGEs the parsed symbol trees into the property graph and
//! cascade-deletes files removed since the base commit. Runs whenever
//! there are parsing results or deletions to apply.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{instrument, warn};

use tek_server_graph::{checksum_hex, GraphWriter};

use crate::config::TaskConfigResolver;
use crate::context::{GraphUpdateData, JobContext, TaskData, TaskKind};
use crate::error::{JobError, Result};
use crate::task::{Task, TaskResult};

pub struct GraphUpdateTask {
	writer: Arc<GraphWriter>,
	resolver: Arc<TaskConfigResolver>,
}

impl GraphUpdateTask {
	pub fn new(writer: Arc<GraphWriter>, resolver: Arc<TaskConfigResolver>) -> Self {
		Self { writer, resolver }
	}
}

#[async_trait]
impl Task for GraphUpdateTask {
	fn kind(&self) -> TaskKind {
		TaskKind::GraphUpdate
	}

	fn description(&self) -> &str {
		"Materialize parsed symbols and relationships in the property graph"
	}

	fn required_tasks(&self) -> &[TaskKind] {
		&[TaskKind::GitSync]
	}

	fn optional_tasks(&self) -> &[TaskKind] {
		&[TaskKind::CodeParsing]
	}

	async fn should_execute(&self, ctx: &JobContext) -> bool {
		if !self.resolver.graph_enabled() {
			return false;
		}

		let has_parsed = ctx
			.code_parsing_data()
			.is_some_and(|parsing| !parsing.parsing_results.is_empty());
		let has_deletions = ctx
			.git_sync_data()
			.is_some_and(|git| !git.files_deleted.is_empty());

		has_parsed || has_deletions
	}

	#[instrument(skip_all, fields(job_id = %ctx.job.id))]
	async fn execute(&self, ctx: &mut JobContext) -> Result<TaskResult> {
		// Validates URL shape and credentials before any write.
		self.resolver.resolve_graph(None)?;

		let codebase = ctx
			.codebase
			.clone()
			.ok_or_else(|| JobError::Validation("graph update requires a codebase".into()))?;
		let git = ctx
			.git_sync_data()
			.cloned()
			.ok_or_else(|| JobError::Validation("git sync output missing".into()))?;

		self.writer.verify_connection().await?;
		self.writer.ensure_schema().await?;

		let mut data = GraphUpdateData::default();

		let root_counters = self
			.writer
			.merge_codebase_root(
				&ctx.project.id,
				&ctx.project.name,
				&codebase.id,
				&codebase.name,
				&git.commit_hash,
			)
			.await?;
		accumulate(&mut data, root_counters);

		if let Some(parsing) = ctx.code_parsing_data().cloned() {
			for result in &parsing.parsing_results {
				if ctx.cancellation.is_cancelled() {
					return Err(JobError::Cancelled);
				}

				let mut checksums = BTreeMap::new();
				for file in &result.files {
					let checksum = match std::fs::read(git.clone_path.join(&file.path)) {
						Ok(content) => checksum_hex(&content),
						Err(e) => {
							warn!(path = %file.path, error = %e, "cannot read file for checksum");
							checksum_hex(file.path.as_bytes())
						}
					};
					checksums.insert(file.path.clone(), checksum);
				}

				let counters = self
					.writer
					.merge_files(&codebase.id, &result.files, &checksums)
					.await?;
				accumulate(&mut data, counters);
			}
		}

		if !git.files_deleted.is_empty() {
			let counters = self
				.writer
				.delete_files(&codebase.id, &git.files_deleted)
				.await?;
			accumulate(&mut data, counters);
		}

		let metrics = json!({
			"nodesCreated": data.nodes_created,
			"nodesUpdated": data.nodes_updated,
			"relationshipsCreated": data.relationships_created,
			"nodesDeleted": data.nodes_deleted,
			"relationshipsDeleted": data.relationships_deleted,
		});

		Ok(TaskResult::ok(TaskData::GraphUpdate(data)).with_metrics(metrics))
	}
}

fn accumulate(data: &mut GraphUpdateData, counters: tek_server_graph::WriteCounters) {
	data.nodes_created += counters.nodes_created;
	data.nodes_updated += counters.nodes_updated;
	data.relationships_created += counters.relationships_created;
	data.relationships_updated += counters.relationships_updated;
	data.nodes_deleted += counters.nodes_deleted;
	data.relationships_deleted += counters.relationships_deleted;
}
