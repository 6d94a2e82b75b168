// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Index-job endpoints: create, inspect, cancel, plus the convenience
//! routes that build the request on the caller's behalf.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tek_server_db::{IndexJobRecord, JobStatus, JobTrigger, JobType, TaskRecord};
use tek_server_jobs::CreateJobRequest;

use crate::api::{ApiError, AppState};

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobCreatedResponse {
	pub id: String,
	#[serde(rename = "type")]
	pub job_type: String,
	pub status: String,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<IndexJobRecord> for JobCreatedResponse {
	fn from(record: IndexJobRecord) -> Self {
		Self {
			id: record.id,
			job_type: record.job_type.as_str().to_string(),
			status: record.status.as_str().to_string(),
			created_at: record.created_at,
		}
	}
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
	pub id: String,
	#[serde(rename = "type")]
	pub job_type: String,
	pub status: String,
	pub progress: i64,
	pub current_task: Option<String>,
	pub error: Option<String>,
	pub started_at: Option<chrono::DateTime<chrono::Utc>>,
	pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
	#[schema(value_type = Object)]
	pub tasks: BTreeMap<String, TaskRecord>,
}

impl From<IndexJobRecord> for JobStatusResponse {
	fn from(record: IndexJobRecord) -> Self {
		Self {
			id: record.id,
			job_type: record.job_type.as_str().to_string(),
			status: record.status.as_str().to_string(),
			progress: record.progress,
			current_task: record.current_task,
			error: record.error_message,
			started_at: record.started_at,
			completed_at: record.completed_at,
			tasks: record.metadata.tasks,
		}
	}
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobBody {
	pub project_id: String,
	pub codebase_id: Option<String>,
	#[serde(rename = "type")]
	#[schema(value_type = String)]
	pub job_type: JobType,
	pub description: Option<String>,
	pub base_commit: Option<String>,
	pub priority: Option<i64>,
}

/// POST /api/jobs
#[utoipa::path(
	post,
	path = "/api/jobs",
	request_body = CreateJobBody,
	responses(
		(status = 201, description = "Job accepted", body = JobCreatedResponse),
		(status = 400, description = "Malformed request"),
		(status = 404, description = "Unknown project or codebase"),
	),
	tag = "jobs"
)]
#[instrument(skip(state, body), fields(project_id = %body.project_id))]
pub async fn create_job(
	State(state): State<AppState>,
	Json(body): Json<CreateJobBody>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
	let record = state
		.orchestrator
		.create_job(CreateJobRequest {
			project_id: body.project_id,
			codebase_id: body.codebase_id,
			job_type: body.job_type,
			trigger: Some(JobTrigger::Manual),
			description: body.description,
			base_commit: body.base_commit,
			priority: body.priority,
		})
		.await?;

	Ok((StatusCode::CREATED, Json(record.into())))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
	pub project_id: Option<String>,
	pub status: Option<JobStatus>,
}

/// GET /api/jobs
#[utoipa::path(
	get,
	path = "/api/jobs",
	params(
		("projectId" = Option<String>, Query, description = "Filter by project"),
		("status" = Option<String>, Query, description = "Filter by status"),
	),
	responses((status = 200, description = "Jobs", body = [JobStatusResponse])),
	tag = "jobs"
)]
pub async fn list_jobs(
	State(state): State<AppState>,
	Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobStatusResponse>>, ApiError> {
	let records = state
		.orchestrator
		.list_jobs(query.project_id.as_deref(), query.status)
		.await?;
	Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// GET /api/jobs/{id}
#[utoipa::path(
	get,
	path = "/api/jobs/{id}",
	params(("id" = String, Path, description = "Job id")),
	responses(
		(status = 200, description = "Job status", body = JobStatusResponse),
		(status = 404, description = "Unknown job"),
	),
	tag = "jobs"
)]
pub async fn get_job(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
	let record = state.orchestrator.get_job_status(&id).await?;
	Ok(Json(record.into()))
}

/// DELETE /api/jobs/{id} - cancel a pending or running job.
#[utoipa::path(
	delete,
	path = "/api/jobs/{id}",
	params(("id" = String, Path, description = "Job id")),
	responses(
		(status = 200, description = "Job cancelled", body = JobStatusResponse),
		(status = 400, description = "Job already finished"),
		(status = 404, description = "Unknown job"),
	),
	tag = "jobs"
)]
#[instrument(skip(state))]
pub async fn cancel_job(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
	let record = state.orchestrator.cancel_job(&id).await?;
	Ok(Json(record.into()))
}

async fn start_codebase_job(
	state: &AppState,
	codebase_id: &str,
	job_type: JobType,
	base_commit: Option<String>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
	let codebase = state
		.codebases
		.get(codebase_id)
		.await?
		.ok_or_else(|| ApiError::not_found(format!("codebase {codebase_id}")))?;

	let record = state
		.orchestrator
		.create_job(CreateJobRequest {
			project_id: codebase.project_id.clone(),
			codebase_id: Some(codebase.id),
			job_type,
			trigger: Some(JobTrigger::Manual),
			description: None,
			base_commit,
			priority: None,
		})
		.await?;

	Ok((StatusCode::CREATED, Json(record.into())))
}

/// POST /api/codebases/{id}/index - start a full index.
#[utoipa::path(
	post,
	path = "/api/codebases/{id}/index",
	params(("id" = String, Path, description = "Codebase id")),
	responses(
		(status = 201, description = "Job accepted", body = JobCreatedResponse),
		(status = 404, description = "Unknown codebase"),
	),
	tag = "jobs"
)]
pub async fn start_full_index(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
	start_codebase_job(&state, &id, JobType::CodebaseFull, None).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalQuery {
	pub from_commit: Option<String>,
}

/// POST /api/codebases/{id}/index/incremental?fromCommit=...
#[utoipa::path(
	post,
	path = "/api/codebases/{id}/index/incremental",
	params(
		("id" = String, Path, description = "Codebase id"),
		("fromCommit" = String, Query, description = "Diff base commit"),
	),
	responses(
		(status = 201, description = "Job accepted", body = JobCreatedResponse),
		(status = 400, description = "Missing fromCommit"),
		(status = 404, description = "Unknown codebase"),
	),
	tag = "jobs"
)]
pub async fn start_incremental_index(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Query(query): Query<IncrementalQuery>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
	let from_commit = query
		.from_commit
		.filter(|c| !c.is_empty())
		.ok_or_else(|| ApiError::bad_request("fromCommit query parameter is required"))?;

	start_codebase_job(&state, &id, JobType::CodebaseIncr, Some(from_commit)).await
}

async fn start_analysis_job(
	state: &AppState,
	project_id: &str,
	job_type: JobType,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
	let record = state
		.orchestrator
		.create_job(CreateJobRequest {
			project_id: project_id.to_string(),
			codebase_id: None,
			job_type,
			trigger: Some(JobTrigger::Manual),
			description: None,
			base_commit: None,
			priority: None,
		})
		.await?;

	Ok((StatusCode::CREATED, Json(record.into())))
}

/// POST /api/projects/{id}/analysis/api
#[utoipa::path(
	post,
	path = "/api/projects/{id}/analysis/api",
	params(("id" = String, Path, description = "Project id")),
	responses(
		(status = 201, description = "Job accepted", body = JobCreatedResponse),
		(status = 404, description = "Unknown project"),
	),
	tag = "jobs"
)]
pub async fn start_api_analysis(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
	start_analysis_job(&state, &id, JobType::ApiAnalysis).await
}

/// POST /api/projects/{id}/analysis/userflow
#[utoipa::path(
	post,
	path = "/api/projects/{id}/analysis/userflow",
	params(("id" = String, Path, description = "Project id")),
	responses(
		(status = 201, description = "Job accepted", body = JobCreatedResponse),
		(status = 404, description = "Unknown project"),
	),
	tag = "jobs"
)]
pub async fn start_userflow_analysis(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
	start_analysis_job(&state, &id, JobType::UserflowAnalysis).await
}
