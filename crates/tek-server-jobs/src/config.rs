// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-task configuration resolver.
//!
//! Resolution order: server defaults (already env-overlaid) → job-type
//! adjustments → per-call override layers, then validation. The graph
//! task additionally requires credentials, which the server-level load
//! leaves optional.

use tek_server_config::{
	GitSyncConfig, GitSyncConfigLayer, GraphConfig, GraphConfigLayer, ParsingConfig,
	ParsingConfigLayer, ServerConfig,
};
use tek_server_db::{IndexJobRecord, JobType};

use crate::error::{JobError, Result};

/// Fully resolved git-sync task configuration for one job.
#[derive(Debug, Clone)]
pub struct ResolvedGitSync {
	pub config: GitSyncConfig,
	/// Diff base for incremental jobs.
	pub base_commit: Option<String>,
	/// Whether the job's type asks for incremental sync at all; the task
	/// still falls back to a full clone when the working tree or base
	/// commit is unusable.
	pub incremental: bool,
}

pub struct TaskConfigResolver {
	git_sync: GitSyncConfig,
	parsing: ParsingConfig,
	graph: GraphConfig,
}

impl TaskConfigResolver {
	pub fn new(config: &ServerConfig) -> Self {
		Self {
			git_sync: config.git_sync.clone(),
			parsing: config.parsing.clone(),
			graph: config.graph.clone(),
		}
	}

	pub fn resolve_git_sync(
		&self,
		job: &IndexJobRecord,
		overrides: Option<GitSyncConfigLayer>,
	) -> Result<ResolvedGitSync> {
		let mut layer = self.git_sync.to_layer();
		if let Some(overrides) = overrides {
			layer.merge(overrides);
		}
		let config = layer.finalize();
		config.validate()?;

		Ok(ResolvedGitSync {
			incremental: job.job_type == JobType::CodebaseIncr && config.incremental_mode,
			base_commit: job.metadata.base_commit.clone(),
			config,
		})
	}

	pub fn resolve_parsing(&self, overrides: Option<ParsingConfigLayer>) -> Result<ParsingConfig> {
		let mut layer = self.parsing.to_layer();
		if let Some(overrides) = overrides {
			layer.merge(overrides);
		}
		let config = layer.finalize();
		config.validate()?;
		Ok(config)
	}

	/// Graph config with the full §4.7-style validation: beyond the shared
	/// rules, the writer refuses to run without credentials.
	pub fn resolve_graph(&self, overrides: Option<GraphConfigLayer>) -> Result<GraphConfig> {
		let mut layer = self.graph.to_layer();
		if let Some(overrides) = overrides {
			layer.merge(overrides);
		}
		let config = layer.finalize();
		config.validate()?;

		if config.username.is_empty() || config.password.is_empty() {
			return Err(JobError::Config(
				"graph store credentials are not configured".into(),
			));
		}

		Ok(config)
	}

	pub fn git_sync_enabled(&self) -> bool {
		self.git_sync.enabled
	}

	pub fn parsing_enabled(&self) -> bool {
		self.parsing.enabled
	}

	pub fn graph_enabled(&self) -> bool {
		self.graph.enabled
	}
}
