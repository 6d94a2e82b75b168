// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-job transient state: paths, typed task outputs, metrics, and the
//! cooperative cancellation handle.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use tek_server_db::{CodebaseRecord, IndexJobRecord, ProjectRecord};
use tek_server_parser::NormalizedParserOutput;

/// Pipeline stages, in declared order. The string form keys the per-task
/// data slots and the persisted metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
	GitSync,
	CodeParsing,
	GraphUpdate,
	Cleanup,
}

impl TaskKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			TaskKind::GitSync => "GIT_SYNC",
			TaskKind::CodeParsing => "CODE_PARSING",
			TaskKind::GraphUpdate => "GRAPH_UPDATE",
			TaskKind::Cleanup => "CLEANUP",
		}
	}
}

impl std::fmt::Display for TaskKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSyncData {
	pub clone_path: PathBuf,
	pub commit_hash: String,
	pub files_changed: Vec<String>,
	pub files_added: Vec<String>,
	pub files_deleted: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeParsingData {
	pub symbols_extracted: u64,
	pub files_processed: u64,
	pub languages: BTreeMap<String, u64>,
	/// Full normalized outputs for the graph writer; too large for the
	/// persisted metadata, so not serialized there.
	#[serde(skip)]
	pub parsing_results: Vec<NormalizedParserOutput>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphUpdateData {
	pub nodes_created: u64,
	pub nodes_updated: u64,
	pub relationships_created: u64,
	pub relationships_updated: u64,
	pub nodes_deleted: u64,
	pub relationships_deleted: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupData {
	pub temp_files_removed: u64,
	pub disk_space_freed: u64,
}

/// Typed payloads written into the context's data slots.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TaskData {
	GitSync(GitSyncData),
	CodeParsing(CodeParsingData),
	GraphUpdate(GraphUpdateData),
	Cleanup(CleanupData),
}

impl TaskData {
	pub fn kind(&self) -> TaskKind {
		match self {
			TaskData::GitSync(_) => TaskKind::GitSync,
			TaskData::CodeParsing(_) => TaskKind::CodeParsing,
			TaskData::GraphUpdate(_) => TaskKind::GraphUpdate,
			TaskData::Cleanup(_) => TaskKind::Cleanup,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTiming {
	pub start: DateTime<Utc>,
	pub end: DateTime<Utc>,
	pub duration_ms: i64,
}

/// Accumulated while a job runs; folded into the persisted metadata at the
/// end.
#[derive(Debug)]
pub struct ContextMetrics {
	pub start_time: Instant,
	pub task_times: BTreeMap<TaskKind, TaskTiming>,
	pub total_files_processed: u64,
	pub total_symbols_extracted: u64,
	pub errors: Vec<String>,
	pub warnings: Vec<String>,
}

impl Default for ContextMetrics {
	fn default() -> Self {
		Self {
			start_time: Instant::now(),
			task_times: BTreeMap::new(),
			total_files_processed: 0,
			total_symbols_extracted: 0,
			errors: Vec::new(),
			warnings: Vec::new(),
		}
	}
}

#[derive(Clone, Default)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

pub struct JobContext {
	pub job: IndexJobRecord,
	pub project: ProjectRecord,
	pub codebase: Option<CodebaseRecord>,
	/// Per-job scratch root; removed by the cleanup task.
	pub working_dir: PathBuf,
	/// Scratch subdirectory for task temporaries.
	pub temp_dir: PathBuf,
	/// Codebase working tree; persists across jobs for incremental syncs.
	pub storage_path: PathBuf,
	pub data: BTreeMap<TaskKind, TaskData>,
	pub metrics: ContextMetrics,
	pub cancellation: CancellationToken,
}

impl JobContext {
	pub fn insert_data(&mut self, data: TaskData) {
		self.data.insert(data.kind(), data);
	}

	pub fn git_sync_data(&self) -> Option<&GitSyncData> {
		match self.data.get(&TaskKind::GitSync) {
			Some(TaskData::GitSync(data)) => Some(data),
			_ => None,
		}
	}

	pub fn code_parsing_data(&self) -> Option<&CodeParsingData> {
		match self.data.get(&TaskKind::CodeParsing) {
			Some(TaskData::CodeParsing(data)) => Some(data),
			_ => None,
		}
	}

	pub fn graph_update_data(&self) -> Option<&GraphUpdateData> {
		match self.data.get(&TaskKind::GraphUpdate) {
			Some(TaskData::GraphUpdate(data)) => Some(data),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cancellation_token_is_shared() {
		let token = CancellationToken::new();
		let clone = token.clone();
		assert!(!clone.is_cancelled());
		token.cancel();
		assert!(clone.is_cancelled());
	}

	#[test]
	fn test_task_kind_strings() {
		assert_eq!(TaskKind::GitSync.as_str(), "GIT_SYNC");
		assert_eq!(TaskKind::CodeParsing.as_str(), "CODE_PARSING");
		assert_eq!(TaskKind::GraphUpdate.as_str(), "GRAPH_UPDATE");
		assert_eq!(TaskKind::Cleanup.as_str(), "CLEANUP");
	}

	#[test]
	fn test_task_data_routes_to_its_slot() {
		let data = TaskData::Cleanup(CleanupData {
			temp_files_removed: 3,
			disk_space_freed: 4096,
		});
		assert_eq!(data.kind(), TaskKind::Cleanup);
	}
}
