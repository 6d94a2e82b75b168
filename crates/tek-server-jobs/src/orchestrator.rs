// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job orchestrator.
//!
//! Persists a PENDING job, submits its execution to the worker pool, and
//! returns immediately. The execution closure drives the job's task
//! pipeline in order, recording progress, per-task outputs, and metrics
//! into the durable record. Cancellation is cooperative: queued jobs are
//! removed from the pool, running jobs observe a token between (and
//! inside) tasks.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use tek_server_config::ServerConfig;
use tek_server_db::{
	CodebaseRepository, IndexJobRecord, IndexJobRepository, JobStatus, JobTrigger, JobType,
	ProjectRepository, TaskRecord,
};
use tek_server_git::GitClient;
use tek_server_graph::{GraphSession, GraphWriter};
use tek_server_parser::ParserDriver;

use crate::config::TaskConfigResolver;
use crate::context::{
	CancellationToken, CodeParsingData, ContextMetrics, JobContext, TaskTiming,
};
use crate::error::{JobError, Result};
use crate::service::JobWorkerService;
use crate::task::Task;
use crate::tasks::{CleanupTask, CodeParsingTask, GitSyncTask, GraphUpdateTask};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
	pub project_id: String,
	pub codebase_id: Option<String>,
	#[serde(rename = "type")]
	pub job_type: JobType,
	#[serde(default)]
	pub trigger: Option<JobTrigger>,
	pub description: Option<String>,
	pub base_commit: Option<String>,
	pub priority: Option<i64>,
}

/// What the execution closure hands back through the pool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
	pub job_id: String,
	pub status: JobStatus,
	pub duration_ms: u64,
	pub tasks_executed: u32,
	pub tasks_succeeded: u32,
	pub tasks_failed: u32,
	pub final_error: Option<String>,
}

struct RunningJob {
	token: CancellationToken,
}

pub struct JobOrchestrator {
	projects: ProjectRepository,
	codebases: CodebaseRepository,
	jobs: IndexJobRepository,
	worker: JobWorkerService<JobSummary>,
	codebase_pipeline: Vec<Arc<dyn Task>>,
	placeholder_pipeline: Vec<Arc<dyn Task>>,
	running: Mutex<HashMap<String, RunningJob>>,
	storage: tek_server_config::StorageConfig,
}

impl JobOrchestrator {
	pub fn new(
		projects: ProjectRepository,
		codebases: CodebaseRepository,
		jobs: IndexJobRepository,
		config: &ServerConfig,
		git: Arc<dyn GitClient>,
		parser: Arc<dyn ParserDriver>,
		graph: Arc<dyn GraphSession>,
	) -> Result<Arc<Self>> {
		let resolver = Arc::new(TaskConfigResolver::new(config));
		let writer = Arc::new(GraphWriter::new(graph, config.graph.batch_size));
		let worker = JobWorkerService::new(
			config.jobs.max_workers,
			Duration::from_millis(config.jobs.task_timeout_ms),
		)?;

		let codebase_pipeline: Vec<Arc<dyn Task>> = vec![
			Arc::new(GitSyncTask::new(git, Arc::clone(&resolver))),
			Arc::new(CodeParsingTask::new(parser, Arc::clone(&resolver))),
			Arc::new(GraphUpdateTask::new(writer, Arc::clone(&resolver))),
			Arc::new(CleanupTask),
		];
		let placeholder_pipeline: Vec<Arc<dyn Task>> = vec![Arc::new(CleanupTask)];

		Ok(Arc::new(Self {
			projects,
			codebases,
			jobs,
			worker,
			codebase_pipeline,
			placeholder_pipeline,
			running: Mutex::new(HashMap::new()),
			storage: config.storage.clone(),
		}))
	}

	fn pipeline_for(&self, job_type: JobType) -> &[Arc<dyn Task>] {
		match job_type {
			JobType::CodebaseFull | JobType::CodebaseIncr => &self.codebase_pipeline,
			// Docs and analysis pipelines are placeholders for now; they
			// still get scratch-space hygiene.
			JobType::DocsBucketFull
			| JobType::DocsBucketIncr
			| JobType::ApiAnalysis
			| JobType::UserflowAnalysis => &self.placeholder_pipeline,
		}
	}

	/// Validate the request, persist a PENDING job, and hand execution to
	/// the worker pool. Returns the persisted record immediately.
	#[instrument(skip(self, request), fields(project_id = %request.project_id))]
	pub async fn create_job(self: &Arc<Self>, request: CreateJobRequest) -> Result<IndexJobRecord> {
		let project = self
			.projects
			.get(&request.project_id)
			.await?
			.ok_or_else(|| JobError::NotFound(format!("project {}", request.project_id)))?;

		let codebase = match &request.codebase_id {
			Some(codebase_id) => {
				let codebase = self
					.codebases
					.get(codebase_id)
					.await?
					.ok_or_else(|| JobError::NotFound(format!("codebase {codebase_id}")))?;
				if codebase.project_id != project.id {
					return Err(JobError::Validation(format!(
						"codebase {codebase_id} does not belong to project {}",
						project.id
					)));
				}
				Some(codebase)
			}
			None => None,
		};

		if request.job_type.requires_codebase() && codebase.is_none() {
			return Err(JobError::Validation(format!(
				"job type {} requires a codebase",
				request.job_type.as_str()
			)));
		}

		// One active job per codebase; overlapping syncs on the same
		// working tree are rejected.
		if let Some(codebase) = &codebase {
			if self
				.jobs
				.find_active_for_codebase(&codebase.id)
				.await?
				.is_some()
			{
				return Err(JobError::State(format!(
					"codebase {} already has an active job",
					codebase.id
				)));
			}
		}

		let mut job = IndexJobRecord::new(
			&project.id,
			request.job_type,
			request.trigger.unwrap_or(JobTrigger::Manual),
		);
		job.codebase_id = codebase.as_ref().map(|c| c.id.clone());
		job.description = request.description;
		if let Some(priority) = request.priority {
			job.priority = priority;
		}
		if request.job_type == JobType::CodebaseIncr {
			job.metadata.base_commit = request
				.base_commit
				.or_else(|| codebase.as_ref().and_then(|c| c.last_sync_commit.clone()));
		}

		self.jobs.create(&job).await?;

		let token = CancellationToken::new();
		self.running
			.lock()
			.expect("running jobs lock poisoned")
			.insert(job.id.clone(), RunningJob { token: token.clone() });

		let this = Arc::clone(self);
		let execute_job_id = job.id.clone();
		let submitted = self.worker.submit_job(&job.id, job.job_type, async move {
			this.execute_job(execute_job_id, token).await
		});

		let receiver = match submitted {
			Ok(receiver) => receiver,
			Err(e) => {
				self.running
					.lock()
					.expect("running jobs lock poisoned")
					.remove(&job.id);
				self.jobs
					.mark_terminal(&job.id, JobStatus::Failed, Some(&e.to_string()), None)
					.await?;
				return Err(e);
			}
		};

		// Watch the pool outcome: pool-level timeouts (the execution
		// future was dropped mid-flight) still need a terminal record, and
		// the running map entry goes away on any outcome.
		let this = Arc::clone(self);
		let watched_job_id = job.id.clone();
		tokio::spawn(async move {
			match receiver.await {
				Ok(Ok(summary)) => {
					debug!(job_id = %watched_job_id, status = ?summary.status, "job settled")
				}
				Ok(Err(e)) => this.record_abnormal_end(&watched_job_id, &e).await,
				Err(_) => {}
			}
			this.running
				.lock()
				.expect("running jobs lock poisoned")
				.remove(&watched_job_id);
		});

		info!(job_id = %job.id, job_type = job.job_type.as_str(), "job created");
		Ok(job)
	}

	async fn record_abnormal_end(&self, job_id: &str, error: &JobError) {
		if matches!(error, JobError::Cancelled) {
			return;
		}

		match self.jobs.get(job_id).await {
			Ok(Some(job)) if !job.status.is_terminal() => {
				warn!(job_id, error = %error, "job ended abnormally");
				if let Err(e) = self
					.jobs
					.mark_terminal(job_id, JobStatus::Failed, Some(&error.to_string()), None)
					.await
				{
					warn!(job_id, error = %e, "failed to persist abnormal job end");
				}
			}
			Ok(_) => {}
			Err(e) => warn!(job_id, error = %e, "failed to load job after abnormal end"),
		}
	}

	/// The closure that runs on a pool worker.
	#[instrument(skip(self, token))]
	async fn execute_job(
		self: Arc<Self>,
		job_id: String,
		token: CancellationToken,
	) -> Result<JobSummary> {
		let started = Instant::now();
		let job = self.jobs.get_required(&job_id).await?;

		// A queued job cancelled between submit and pickup never runs.
		if job.status.is_terminal() {
			return Ok(JobSummary {
				job_id,
				status: job.status,
				duration_ms: 0,
				tasks_executed: 0,
				tasks_succeeded: 0,
				tasks_failed: 0,
				final_error: job.error_message,
			});
		}

		self.jobs.mark_running(&job_id).await?;

		let project = self
			.projects
			.get(&job.project_id)
			.await?
			.ok_or_else(|| JobError::NotFound(format!("project {}", job.project_id)))?;
		let codebase = match &job.codebase_id {
			Some(codebase_id) => self.codebases.get(codebase_id).await?,
			None => None,
		};

		let working_dir = self.storage.job_scratch_path(&job_id);
		let temp_dir = working_dir.join("temp");
		let storage_path = codebase
			.as_ref()
			.map(|c| self.storage.codebase_path(&c.id))
			.unwrap_or_else(|| working_dir.join("checkout"));
		tokio::fs::create_dir_all(&temp_dir).await?;

		let mut ctx = JobContext {
			job: job.clone(),
			project,
			codebase,
			working_dir,
			temp_dir,
			storage_path,
			data: BTreeMap::new(),
			metrics: ContextMetrics::default(),
			cancellation: token.clone(),
		};

		let tasks = self.pipeline_for(job.job_type);
		let total_tasks = tasks.len();
		let mut metadata = job.metadata.clone();
		let mut tasks_executed = 0u32;
		let mut tasks_succeeded = 0u32;
		let mut tasks_failed = 0u32;
		let mut final_error: Option<String> = None;
		let mut cancelled = false;

		for task in tasks.iter() {
			if token.is_cancelled() {
				cancelled = true;
				break;
			}

			let kind = task.kind();
			if !task.should_execute(&ctx).await {
				debug!(job_id = %job_id, task = %kind, "task skipped");
				continue;
			}

			let progress =
				(100.0 * tasks_executed as f64 / total_tasks as f64).round() as i64;
			self.jobs
				.update_task_progress(&job_id, Some(kind.as_str()), progress)
				.await?;

			if let Err(e) = task.validate(&ctx).await {
				warn!(job_id = %job_id, task = %kind, error = %e, "task validation failed");
				metadata.tasks.insert(
					kind.as_str().to_string(),
					TaskRecord {
						progress: 0,
						output: None,
						metrics: None,
						error: Some(e.to_string()),
					},
				);
				final_error = Some(format!("{kind}: {e}"));
				tasks_failed += 1;
				tasks_executed += 1;
				self.run_task_cleanup(task.as_ref(), &mut ctx).await;
				self.jobs.update_metadata(&job_id, &metadata).await?;
				break;
			}

			let task_start = Utc::now();
			let timer = Instant::now();
			let outcome = task.execute(&mut ctx).await;
			let task_end = Utc::now();
			ctx.metrics.task_times.insert(
				kind,
				TaskTiming {
					start: task_start,
					end: task_end,
					duration_ms: timer.elapsed().as_millis() as i64,
				},
			);
			tasks_executed += 1;

			match outcome {
				Ok(result) => {
					let output = result
						.data
						.as_ref()
						.and_then(|data| serde_json::to_value(data).ok());
					metadata.tasks.insert(
						kind.as_str().to_string(),
						TaskRecord {
							progress: 100,
							output,
							metrics: result.metrics.clone(),
							error: result.error.clone(),
						},
					);

					if result.success {
						tasks_succeeded += 1;
						if let Some(data) = result.data {
							ctx.insert_data(data);
						}
					} else {
						tasks_failed += 1;
						let message =
							result.error.unwrap_or_else(|| "task failed".to_string());
						warn!(job_id = %job_id, task = %kind, error = %message, "task failed");
						final_error = Some(format!("{kind}: {message}"));
					}
				}
				Err(JobError::Cancelled) => {
					cancelled = true;
					metadata.tasks.insert(
						kind.as_str().to_string(),
						TaskRecord {
							progress: 0,
							output: None,
							metrics: None,
							error: Some("cancelled".to_string()),
						},
					);
				}
				Err(e) => {
					tasks_failed += 1;
					warn!(job_id = %job_id, task = %kind, error = %e, "task errored");
					metadata.tasks.insert(
						kind.as_str().to_string(),
						TaskRecord {
							progress: 0,
							output: None,
							metrics: None,
							error: Some(e.to_string()),
						},
					);
					final_error = Some(format!("{kind}: {e}"));
				}
			}

			// Cleanup always runs for a task that executed; its failures
			// are logged, never fatal.
			self.run_task_cleanup(task.as_ref(), &mut ctx).await;
			self.jobs.update_metadata(&job_id, &metadata).await?;

			if cancelled || tasks_failed > 0 {
				break;
			}
		}

		metadata.files_processed = ctx.metrics.total_files_processed;
		metadata.symbols_extracted = ctx.metrics.total_symbols_extracted;
		metadata.duration_ms = Some(started.elapsed().as_millis() as i64);
		if let Some(parsing) = ctx.code_parsing_data() {
			metadata.metrics.languages = parsing.languages.clone();
			for result in &parsing.parsing_results {
				for file in &result.files {
					let extension = std::path::Path::new(&file.path)
						.extension()
						.and_then(|e| e.to_str())
						.unwrap_or("none")
						.to_string();
					*metadata.metrics.file_types.entry(extension).or_insert(0) += 1;
				}
			}
		}
		metadata.metrics.errors = ctx.metrics.errors.clone();
		metadata.metrics.warnings = ctx.metrics.warnings.clone();
		self.jobs.update_metadata(&job_id, &metadata).await?;

		let mut status = if cancelled {
			JobStatus::Cancelled
		} else if tasks_failed > 0 {
			JobStatus::Failed
		} else {
			JobStatus::Completed
		};

		// cancel_job may have persisted CANCELLED while the pipeline was
		// between token checks; a terminal record is never overwritten.
		let current = self.jobs.get_required(&job_id).await?;
		if current.status == JobStatus::Cancelled {
			status = JobStatus::Cancelled;
		}
		if !current.status.is_terminal() {
			self.jobs
				.mark_terminal(&job_id, status, final_error.as_deref(), None)
				.await?;
		}

		// The sync watermark advances only once the pipeline (including
		// the graph write) has fully succeeded.
		if status == JobStatus::Completed {
			if let (Some(codebase), Some(git)) = (ctx.codebase.as_ref(), ctx.git_sync_data()) {
				if !git.commit_hash.is_empty() {
					let language = dominant_language(ctx.code_parsing_data());
					if let Err(e) = self
						.codebases
						.record_sync(&codebase.id, &git.commit_hash, language.as_deref())
						.await
					{
						warn!(job_id = %job_id, error = %e, "failed to advance sync watermark");
					}
				}
			}
		}

		info!(
			job_id = %job_id,
			status = status.as_str(),
			tasks_executed,
			tasks_failed,
			duration_ms = started.elapsed().as_millis() as u64,
			"job finished"
		);

		Ok(JobSummary {
			job_id,
			status,
			duration_ms: started.elapsed().as_millis() as u64,
			tasks_executed,
			tasks_succeeded,
			tasks_failed,
			final_error,
		})
	}

	async fn run_task_cleanup(&self, task: &dyn Task, ctx: &mut JobContext) {
		if let Err(e) = task.cleanup(ctx).await {
			warn!(task = %task.kind(), error = %e, "task cleanup failed");
		}
	}

	pub async fn get_job_status(&self, job_id: &str) -> Result<IndexJobRecord> {
		Ok(self.jobs.get_required(job_id).await?)
	}

	pub async fn list_jobs(
		&self,
		project_id: Option<&str>,
		status: Option<JobStatus>,
	) -> Result<Vec<IndexJobRecord>> {
		Ok(self.jobs.list(project_id, status).await?)
	}

	/// Cancel a job. Terminal success/failure cannot be cancelled;
	/// cancelling an already-cancelled job is a no-op. Queued jobs are
	/// removed from the pool, running jobs observe the token.
	#[instrument(skip(self))]
	pub async fn cancel_job(&self, job_id: &str) -> Result<IndexJobRecord> {
		let job = self.jobs.get_required(job_id).await?;

		match job.status {
			JobStatus::Completed | JobStatus::Failed => {
				return Err(JobError::State(format!(
					"job {job_id} is already {}",
					job.status.as_str()
				)));
			}
			JobStatus::Cancelled => return Ok(job),
			JobStatus::Pending | JobStatus::Running => {}
		}

		let removed_from_queue = self.worker.remove_queued(job_id);
		if let Some(running) = self
			.running
			.lock()
			.expect("running jobs lock poisoned")
			.get(job_id)
		{
			running.token.cancel();
		}

		self.jobs
			.mark_terminal(job_id, JobStatus::Cancelled, None, None)
			.await?;
		self.running
			.lock()
			.expect("running jobs lock poisoned")
			.remove(job_id);

		info!(job_id, removed_from_queue, "job cancelled");
		Ok(self.jobs.get_required(job_id).await?)
	}

	/// Ids of jobs whose executions are tracked in memory.
	pub fn running_jobs(&self) -> Vec<String> {
		self.running
			.lock()
			.expect("running jobs lock poisoned")
			.keys()
			.cloned()
			.collect()
	}

	pub async fn shutdown(&self, grace: Duration) {
		self.worker.shutdown(grace).await;
	}
}

fn dominant_language(parsing: Option<&CodeParsingData>) -> Option<String> {
	parsing?
		.languages
		.iter()
		.max_by_key(|(_, count)| **count)
		.map(|(name, _)| name.clone())
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use serde_json::json;
	use std::path::Path;
	use std::sync::atomic::{AtomicU32, Ordering};
	use tek_server_db::testing::memory_pool;
	use tek_server_db::{CodebaseRecord, ProjectRecord};
	use tek_server_git::{
		CloneOptions, CommitInfo, DiffEntry, FileOperation, GitError,
	};
	use tek_server_graph::{CypherStatement, GraphError, WriteCounters};
	use tek_server_parser::{ParserError, ParserOutcome, ParserRequest, RawParserOutput};

	#[derive(Default)]
	struct MockGit {
		valid_repo: bool,
		clone_commit: String,
		listed_files: Vec<String>,
		pull_commit: String,
		diff_entries: Vec<DiffEntry>,
		clone_delay: Option<Duration>,
		calls: Mutex<Vec<String>>,
	}

	impl MockGit {
		fn record(&self, call: &str) {
			self.calls.lock().unwrap().push(call.to_string());
		}

		fn calls(&self) -> Vec<String> {
			self.calls.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl GitClient for MockGit {
		async fn clone_repository(
			&self,
			_url: &str,
			_local_path: &Path,
			_options: &CloneOptions,
		) -> tek_server_git::Result<String> {
			self.record("clone");
			if let Some(delay) = self.clone_delay {
				tokio::time::sleep(delay).await;
			}
			Ok(self.clone_commit.clone())
		}

		async fn pull_repository(
			&self,
			_local_path: &Path,
			_branch: Option<&str>,
		) -> tek_server_git::Result<String> {
			self.record("pull");
			Ok(self.pull_commit.clone())
		}

		async fn current_commit(&self, _local_path: &Path) -> tek_server_git::Result<String> {
			Ok(self.pull_commit.clone())
		}

		async fn diff(
			&self,
			_local_path: &Path,
			_from_commit: Option<&str>,
		) -> tek_server_git::Result<Vec<DiffEntry>> {
			self.record("diff");
			Ok(self.diff_entries.clone())
		}

		async fn commit_info(
			&self,
			_local_path: &Path,
			_commit: Option<&str>,
		) -> tek_server_git::Result<CommitInfo> {
			Err(GitError::Parse("not used by these tests".into()))
		}

		async fn commit_history(
			&self,
			_local_path: &Path,
			_from_commit: Option<&str>,
			_limit: Option<usize>,
		) -> tek_server_git::Result<Vec<CommitInfo>> {
			Ok(Vec::new())
		}

		async fn file_content(
			&self,
			_local_path: &Path,
			_path: &str,
			_commit: Option<&str>,
		) -> tek_server_git::Result<String> {
			Ok(String::new())
		}

		async fn list_files(
			&self,
			_local_path: &Path,
			_patterns: &[String],
		) -> tek_server_git::Result<Vec<String>> {
			self.record("list_files");
			Ok(self.listed_files.clone())
		}

		async fn is_valid_repository(&self, _local_path: &Path) -> bool {
			self.valid_repo
		}

		async fn archive_repository(
			&self,
			_local_path: &Path,
			_out_path: &Path,
			_commit: Option<&str>,
		) -> tek_server_git::Result<()> {
			Ok(())
		}

		async fn delete_repository(&self, _local_path: &Path) -> tek_server_git::Result<()> {
			self.record("delete");
			Ok(())
		}
	}

	#[derive(Default)]
	struct MockParser {
		fail_with_timeout: bool,
		calls: AtomicU32,
	}

	#[async_trait]
	impl ParserDriver for MockParser {
		async fn execute(
			&self,
			request: &ParserRequest,
		) -> tek_server_parser::Result<ParserOutcome> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if self.fail_with_timeout {
				return Err(ParserError::Timeout {
					image: request.docker_image.clone(),
					timeout_secs: 5,
				});
			}

			let raw: RawParserOutput = serde_json::from_value(json!({
				"classes": [
					{"name": "A", "filePath": "src/A.java", "visibility": "public", "line": 1}
				],
				"methods": [
					{"name": "m", "filePath": "src/A.java", "visibility": "public",
					 "className": "A", "line": 2}
				]
			}))
			.unwrap();

			Ok(ParserOutcome {
				raw,
				duration: Duration::from_millis(10),
			})
		}
	}

	#[derive(Default)]
	struct MockGraph {
		statements: Mutex<Vec<CypherStatement>>,
	}

	impl MockGraph {
		fn statements(&self) -> Vec<CypherStatement> {
			self.statements.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl GraphSession for MockGraph {
		async fn run_batch(
			&self,
			statements: &[CypherStatement],
		) -> std::result::Result<WriteCounters, GraphError> {
			self.statements.lock().unwrap().extend(statements.to_vec());
			Ok(WriteCounters {
				nodes_created: statements.len() as u64,
				nodes_deleted: 2,
				relationships_deleted: 3,
				..WriteCounters::default()
			})
		}
	}

	struct Harness {
		orchestrator: Arc<JobOrchestrator>,
		jobs: IndexJobRepository,
		codebases: CodebaseRepository,
		project: ProjectRecord,
		codebase: CodebaseRecord,
		git: Arc<MockGit>,
		parser: Arc<MockParser>,
		graph: Arc<MockGraph>,
		config: ServerConfig,
		_storage_dir: tempfile::TempDir,
	}

	async fn harness(git: MockGit, parser: MockParser, max_workers: usize) -> Harness {
		let pool = memory_pool().await;
		let projects = ProjectRepository::new(pool.clone());
		let codebases = CodebaseRepository::new(pool.clone());
		let jobs = IndexJobRepository::new(pool);

		let project = ProjectRecord::new("Acme", None);
		projects.create(&project).await.unwrap();
		let codebase = CodebaseRecord::new(&project.id, "svc", "https://git.example/acme/svc.git");
		codebases.create(&codebase).await.unwrap();

		let storage_dir = tempfile::tempdir().unwrap();
		let mut config = ServerConfig::default();
		config.storage.root = storage_dir.path().to_path_buf();
		config.jobs.max_workers = max_workers;
		config.graph.password = "secret".to_string();

		let git = Arc::new(git);
		let parser = Arc::new(parser);
		let graph = Arc::new(MockGraph::default());

		let orchestrator = JobOrchestrator::new(
			projects,
			codebases.clone(),
			jobs.clone(),
			&config,
			git.clone(),
			parser.clone(),
			graph.clone(),
		)
		.unwrap();

		Harness {
			orchestrator,
			jobs,
			codebases,
			project,
			codebase,
			git,
			parser,
			graph,
			config,
			_storage_dir: storage_dir,
		}
	}

	async fn wait_terminal(jobs: &IndexJobRepository, job_id: &str) -> IndexJobRecord {
		for _ in 0..250 {
			let job = jobs.get_required(job_id).await.unwrap();
			if job.status.is_terminal() {
				return job;
			}
			tokio::time::sleep(Duration::from_millis(20)).await;
		}
		panic!("job {job_id} never reached a terminal status");
	}

	fn full_index_request(harness: &Harness) -> CreateJobRequest {
		CreateJobRequest {
			project_id: harness.project.id.clone(),
			codebase_id: Some(harness.codebase.id.clone()),
			job_type: JobType::CodebaseFull,
			trigger: None,
			description: None,
			base_commit: None,
			priority: None,
		}
	}

	fn indexed_java_git() -> MockGit {
		MockGit {
			clone_commit: "abc123".to_string(),
			listed_files: vec!["src/A.java".to_string()],
			..MockGit::default()
		}
	}

	#[tokio::test]
	async fn test_full_index_job_completes() {
		let h = harness(indexed_java_git(), MockParser::default(), 2).await;

		let job = h
			.orchestrator
			.create_job(full_index_request(&h))
			.await
			.unwrap();
		assert_eq!(job.status, JobStatus::Pending);

		let done = wait_terminal(&h.jobs, &job.id).await;
		assert_eq!(done.status, JobStatus::Completed, "error: {:?}", done.error_message);
		assert_eq!(done.progress, 100);
		assert!(done.started_at.is_some());
		assert!(done.completed_at.is_some());

		// Every pipeline stage left its record.
		for task in ["GIT_SYNC", "CODE_PARSING", "GRAPH_UPDATE", "CLEANUP"] {
			assert!(done.metadata.tasks.contains_key(task), "missing {task}");
		}
		assert_eq!(done.metadata.files_processed, 1);
		assert_eq!(done.metadata.symbols_extracted, 2);
		assert_eq!(done.metadata.metrics.languages.get("java"), Some(&1));

		let parsing = &done.metadata.tasks["CODE_PARSING"];
		assert_eq!(parsing.metrics.as_ref().unwrap()["filesProcessed"], 1);
		assert_eq!(parsing.metrics.as_ref().unwrap()["symbolsExtracted"], 2);

		// The graph saw the anchor nodes, the class, and the member edge.
		let statements = h.graph.statements();
		assert!(statements.iter().any(|s| s.query.contains("HAS_CODEBASE")));
		assert!(statements.iter().any(|s| s.query.contains("MERGE (s:Class")));
		assert!(statements.iter().any(|s| s.query.contains("HAS_METHOD")));

		// Watermark advanced only after the whole pipeline succeeded.
		let codebase = h.codebases.get(&h.codebase.id).await.unwrap().unwrap();
		assert_eq!(codebase.last_sync_commit.as_deref(), Some("abc123"));
		assert_eq!(codebase.language.as_deref(), Some("java"));

		// Scratch space is gone; the working tree path is not touched.
		assert!(!h.config.storage.job_scratch_path(&job.id).exists());
	}

	#[tokio::test]
	async fn test_incremental_job_with_deletion() {
		let git = MockGit {
			valid_repo: true,
			pull_commit: "Y".to_string(),
			diff_entries: vec![DiffEntry {
				path: "src/Old.java".to_string(),
				operation: FileOperation::Deleted,
				old_path: None,
			}],
			..MockGit::default()
		};
		let h = harness(git, MockParser::default(), 2).await;
		h.codebases
			.record_sync(&h.codebase.id, "X", None)
			.await
			.unwrap();

		let mut request = full_index_request(&h);
		request.job_type = JobType::CodebaseIncr;
		let job = h.orchestrator.create_job(request).await.unwrap();
		assert_eq!(job.metadata.base_commit.as_deref(), Some("X"));

		let done = wait_terminal(&h.jobs, &job.id).await;
		assert_eq!(done.status, JobStatus::Completed, "error: {:?}", done.error_message);

		// Nothing to parse, so no container ran.
		assert_eq!(h.parser.calls.load(Ordering::SeqCst), 0);
		assert!(h.git.calls().contains(&"pull".to_string()));

		// The deleted file cascaded through the graph.
		let statements = h.graph.statements();
		assert!(statements.iter().any(|s| s.query.contains("DETACH DELETE")));
		let graph_output = done.metadata.tasks["GRAPH_UPDATE"]
			.output
			.as_ref()
			.unwrap();
		assert!(graph_output["nodesDeleted"].as_u64().unwrap() >= 1);

		let codebase = h.codebases.get(&h.codebase.id).await.unwrap().unwrap();
		assert_eq!(codebase.last_sync_commit.as_deref(), Some("Y"));
	}

	#[tokio::test]
	async fn test_parser_timeout_fails_job() {
		let parser = MockParser {
			fail_with_timeout: true,
			..MockParser::default()
		};
		let h = harness(indexed_java_git(), parser, 2).await;

		let job = h
			.orchestrator
			.create_job(full_index_request(&h))
			.await
			.unwrap();
		let done = wait_terminal(&h.jobs, &job.id).await;

		assert_eq!(done.status, JobStatus::Failed);
		assert_ne!(done.progress, 100);
		assert!(done.error_message.as_deref().unwrap().contains("timed out"));
		assert!(done.metadata.tasks["CODE_PARSING"]
			.error
			.as_deref()
			.unwrap()
			.contains("timed out"));

		// A failed pipeline never advances the watermark.
		let codebase = h.codebases.get(&h.codebase.id).await.unwrap().unwrap();
		assert!(codebase.last_sync_commit.is_none());
	}

	#[tokio::test]
	async fn test_cancel_queued_job() {
		let git = MockGit {
			clone_delay: Some(Duration::from_millis(300)),
			..indexed_java_git()
		};
		let h = harness(git, MockParser::default(), 1).await;

		let other = CodebaseRecord::new(&h.project.id, "other", "https://git.example/acme/b.git");
		h.codebases.create(&other).await.unwrap();

		let first = h
			.orchestrator
			.create_job(full_index_request(&h))
			.await
			.unwrap();
		tokio::time::sleep(Duration::from_millis(50)).await;

		let mut queued_request = full_index_request(&h);
		queued_request.codebase_id = Some(other.id.clone());
		let queued = h.orchestrator.create_job(queued_request).await.unwrap();

		let cancelled = h.orchestrator.cancel_job(&queued.id).await.unwrap();
		assert_eq!(cancelled.status, JobStatus::Cancelled);
		assert!(cancelled.completed_at.is_none());
		assert!(!h.orchestrator.running_jobs().contains(&queued.id));

		// Cancelling again is a no-op.
		let again = h.orchestrator.cancel_job(&queued.id).await.unwrap();
		assert_eq!(again.status, JobStatus::Cancelled);

		// The first job is unaffected.
		let first_done = wait_terminal(&h.jobs, &first.id).await;
		assert_eq!(first_done.status, JobStatus::Completed);

		// The cancelled job never ran its pipeline.
		let queued_after = h.jobs.get_required(&queued.id).await.unwrap();
		assert!(queued_after.metadata.tasks.is_empty());
	}

	#[tokio::test]
	async fn test_cancel_terminal_job_rejected() {
		let h = harness(indexed_java_git(), MockParser::default(), 2).await;

		let job = h
			.orchestrator
			.create_job(full_index_request(&h))
			.await
			.unwrap();
		wait_terminal(&h.jobs, &job.id).await;

		let err = h.orchestrator.cancel_job(&job.id).await.unwrap_err();
		assert!(matches!(err, JobError::State(_)));
	}

	#[tokio::test]
	async fn test_duplicate_active_job_rejected() {
		let git = MockGit {
			clone_delay: Some(Duration::from_millis(300)),
			..indexed_java_git()
		};
		let h = harness(git, MockParser::default(), 2).await;

		let first = h
			.orchestrator
			.create_job(full_index_request(&h))
			.await
			.unwrap();

		let err = h
			.orchestrator
			.create_job(full_index_request(&h))
			.await
			.unwrap_err();
		assert!(matches!(err, JobError::State(_)));

		wait_terminal(&h.jobs, &first.id).await;
	}

	#[tokio::test]
	async fn test_missing_project_and_foreign_codebase_rejected() {
		let h = harness(indexed_java_git(), MockParser::default(), 2).await;

		let mut request = full_index_request(&h);
		request.project_id = "ghost".to_string();
		assert!(matches!(
			h.orchestrator.create_job(request).await.unwrap_err(),
			JobError::NotFound(_)
		));

		let mut request = full_index_request(&h);
		request.codebase_id = Some("ghost".to_string());
		assert!(matches!(
			h.orchestrator.create_job(request).await.unwrap_err(),
			JobError::NotFound(_)
		));

		let mut request = full_index_request(&h);
		request.codebase_id = None;
		assert!(matches!(
			h.orchestrator.create_job(request).await.unwrap_err(),
			JobError::Validation(_)
		));
	}

	#[tokio::test]
	async fn test_empty_repository_completes() {
		let git = MockGit {
			clone_commit: String::new(),
			listed_files: Vec::new(),
			..MockGit::default()
		};
		let h = harness(git, MockParser::default(), 2).await;

		let job = h
			.orchestrator
			.create_job(full_index_request(&h))
			.await
			.unwrap();
		let done = wait_terminal(&h.jobs, &job.id).await;

		assert_eq!(done.status, JobStatus::Completed);
		assert_eq!(done.progress, 100);
		assert!(done.metadata.tasks.contains_key("GIT_SYNC"));
		// Downstream tasks had nothing to do.
		assert!(!done.metadata.tasks.contains_key("CODE_PARSING"));
		assert!(!done.metadata.tasks.contains_key("GRAPH_UPDATE"));
		assert_eq!(h.parser.calls.load(Ordering::SeqCst), 0);

		// No commit, no watermark.
		let codebase = h.codebases.get(&h.codebase.id).await.unwrap().unwrap();
		assert!(codebase.last_sync_commit.is_none());
	}

	#[tokio::test]
	async fn test_docs_job_runs_placeholder_pipeline() {
		let h = harness(MockGit::default(), MockParser::default(), 2).await;

		let request = CreateJobRequest {
			project_id: h.project.id.clone(),
			codebase_id: None,
			job_type: JobType::DocsBucketFull,
			trigger: Some(JobTrigger::Scheduled),
			description: Some("docs refresh".to_string()),
			base_commit: None,
			priority: None,
		};
		let job = h.orchestrator.create_job(request).await.unwrap();
		let done = wait_terminal(&h.jobs, &job.id).await;

		assert_eq!(done.status, JobStatus::Completed);
		assert_eq!(done.trigger, JobTrigger::Scheduled);
		assert!(done.metadata.tasks.contains_key("CLEANUP"));
		assert!(!done.metadata.tasks.contains_key("GIT_SYNC"));
	}

	#[tokio::test]
	async fn test_get_job_status_missing() {
		let h = harness(MockGit::default(), MockParser::default(), 2).await;
		assert!(matches!(
			h.orchestrator.get_job_status("ghost").await.unwrap_err(),
			JobError::NotFound(_)
		));
	}

	#[tokio::test]
	async fn test_task_times_are_recorded() {
		let h = harness(indexed_java_git(), MockParser::default(), 2).await;

		let job = h
			.orchestrator
			.create_job(full_index_request(&h))
			.await
			.unwrap();
		let done = wait_terminal(&h.jobs, &job.id).await;
		assert_eq!(done.status, JobStatus::Completed);

		// Running-jobs bookkeeping drains shortly after completion.
		for _ in 0..50 {
			if !h.orchestrator.running_jobs().contains(&job.id) {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		assert!(!h.orchestrator.running_jobs().contains(&job.id));
	}
}
