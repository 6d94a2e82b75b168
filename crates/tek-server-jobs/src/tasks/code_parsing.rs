// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Code parsing task.
//!
//! Groups the synced change set by language and runs one parser container
//! per enabled language. A language group that fails is recorded and
//! skipped; a parser timeout fails the task. Zero parsable files is a
//! successful no-op.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument, warn};

use tek_server_parser::{normalize, Language, ParserDriver, ParserRequest};

use crate::config::TaskConfigResolver;
use crate::context::{CodeParsingData, JobContext, TaskData, TaskKind};
use crate::error::{JobError, Result};
use crate::task::{Task, TaskResult};

pub struct CodeParsingTask {
	driver: Arc<dyn ParserDriver>,
	resolver: Arc<TaskConfigResolver>,
}

impl CodeParsingTask {
	pub fn new(driver: Arc<dyn ParserDriver>, resolver: Arc<TaskConfigResolver>) -> Self {
		Self { driver, resolver }
	}
}

#[async_trait]
impl Task for CodeParsingTask {
	fn kind(&self) -> TaskKind {
		TaskKind::CodeParsing
	}

	fn description(&self) -> &str {
		"Parse changed source files into symbol trees"
	}

	fn required_tasks(&self) -> &[TaskKind] {
		&[TaskKind::GitSync]
	}

	async fn should_execute(&self, ctx: &JobContext) -> bool {
		if !self.resolver.parsing_enabled() {
			return false;
		}
		ctx.git_sync_data()
			.is_some_and(|git| !git.files_added.is_empty() || !git.files_changed.is_empty())
	}

	#[instrument(skip_all, fields(job_id = %ctx.job.id))]
	async fn execute(&self, ctx: &mut JobContext) -> Result<TaskResult> {
		let config = self.resolver.resolve_parsing(None)?;
		let git = ctx
			.git_sync_data()
			.cloned()
			.ok_or_else(|| JobError::Validation("git sync output missing".into()))?;
		let codebase_name = ctx
			.codebase
			.as_ref()
			.map(|c| c.name.clone())
			.unwrap_or_else(|| ctx.project.slug.clone());

		let mut groups: BTreeMap<Language, Vec<String>> = BTreeMap::new();
		for path in git.files_added.iter().chain(&git.files_changed) {
			if let Some(language) = Language::from_path(path) {
				groups.entry(language).or_default().push(path.clone());
			}
		}

		let mut results = Vec::new();
		let mut languages = BTreeMap::new();
		let mut symbols_extracted = 0u64;
		let mut files_processed = 0u64;

		for (language, group_files) in groups {
			if ctx.cancellation.is_cancelled() {
				return Err(JobError::Cancelled);
			}

			let Some(language_config) = config.languages.get(language.as_str()) else {
				warn!(%language, "no parser configured, skipping group");
				continue;
			};
			if !language_config.enabled {
				info!(%language, files = group_files.len(), "parser disabled, skipping group");
				continue;
			}

			let request = ParserRequest {
				docker_image: language_config.docker_image.clone(),
				source_path: git.clone_path.clone(),
				output_path: ctx
					.temp_dir
					.join(format!("parser-output-{language}.json")),
				codebase_name: codebase_name.clone(),
				options: language_config.options.clone(),
				options_env_var: language.options_env_var().to_string(),
				timeout: Duration::from_secs(config.timeout_secs),
			};

			match self.driver.execute(&request).await {
				Ok(outcome) => {
					let normalized = normalize(
						&outcome.raw,
						language,
						&codebase_name,
						outcome.duration.as_millis() as u64,
					);
					symbols_extracted += normalized.metadata.total_symbols;
					files_processed += normalized.metadata.total_files;
					languages.insert(
						language.as_str().to_string(),
						normalized.metadata.total_files,
					);
					info!(
						%language,
						files = normalized.metadata.total_files,
						symbols = normalized.metadata.total_symbols,
						"language group parsed"
					);
					results.push(normalized);
				}
				// A hung parser is a task failure with a timeout kind; any
				// other failure only loses this language group.
				Err(e) if e.is_timeout() => return Err(e.into()),
				Err(e) => {
					warn!(%language, error = %e, "language group failed");
					ctx.metrics.errors.push(format!("{language}: {e}"));
				}
			}
		}

		ctx.metrics.total_files_processed += files_processed;
		ctx.metrics.total_symbols_extracted += symbols_extracted;

		let metrics = json!({
			"filesProcessed": files_processed,
			"symbolsExtracted": symbols_extracted,
			"languages": languages,
		});

		Ok(TaskResult::ok(TaskData::CodeParsing(CodeParsingData {
			symbols_extracted,
			files_processed,
			languages,
			parsing_results: results,
		}))
		.with_metrics(metrics))
	}
}
