// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project and codebase registration endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tek_server_db::{CodebaseRecord, ProjectRecord, SyncMode};

use crate::api::{ApiError, AppState};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
	pub name: String,
	pub description: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
	pub id: String,
	pub name: String,
	pub slug: String,
	pub description: Option<String>,
	pub status: String,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProjectRecord> for ProjectResponse {
	fn from(record: ProjectRecord) -> Self {
		Self {
			id: record.id,
			name: record.name,
			slug: record.slug,
			description: record.description,
			status: record.status.as_str().to_string(),
			created_at: record.created_at,
		}
	}
}

/// POST /api/projects
#[utoipa::path(
	post,
	path = "/api/projects",
	request_body = CreateProjectRequest,
	responses(
		(status = 201, description = "Project created", body = ProjectResponse),
		(status = 400, description = "Malformed request"),
	),
	tag = "projects"
)]
#[instrument(skip(state, request))]
pub async fn create_project(
	State(state): State<AppState>,
	Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
	if request.name.trim().is_empty() {
		return Err(ApiError::bad_request("project name must not be empty"));
	}

	let record = ProjectRecord::new(request.name.trim(), request.description);
	state.projects.create(&record).await?;

	Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /api/projects/{id}
#[utoipa::path(
	get,
	path = "/api/projects/{id}",
	params(("id" = String, Path, description = "Project id")),
	responses(
		(status = 200, description = "Project", body = ProjectResponse),
		(status = 404, description = "Unknown project"),
	),
	tag = "projects"
)]
pub async fn get_project(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, ApiError> {
	let record = state
		.projects
		.get(&id)
		.await?
		.ok_or_else(|| ApiError::not_found(format!("project {id}")))?;
	Ok(Json(record.into()))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCodebaseRequest {
	pub name: String,
	pub git_url: String,
	pub branch: Option<String>,
	#[schema(value_type = Option<String>)]
	pub sync_mode: Option<SyncMode>,
	pub webhook_secret: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseResponse {
	pub id: String,
	pub project_id: String,
	pub name: String,
	pub git_url: String,
	pub branch: String,
	pub status: String,
	pub last_sync_commit: Option<String>,
}

impl From<CodebaseRecord> for CodebaseResponse {
	fn from(record: CodebaseRecord) -> Self {
		Self {
			id: record.id,
			project_id: record.project_id,
			name: record.name,
			git_url: record.git_url,
			branch: record.branch,
			status: record.status.as_str().to_string(),
			last_sync_commit: record.last_sync_commit,
		}
	}
}

/// POST /api/projects/{id}/codebases
#[utoipa::path(
	post,
	path = "/api/projects/{id}/codebases",
	params(("id" = String, Path, description = "Project id")),
	request_body = CreateCodebaseRequest,
	responses(
		(status = 201, description = "Codebase registered", body = CodebaseResponse),
		(status = 404, description = "Unknown project"),
		(status = 409, description = "Git URL already registered in this project"),
	),
	tag = "projects"
)]
#[instrument(skip(state, request), fields(project_id = %project_id))]
pub async fn create_codebase(
	State(state): State<AppState>,
	Path(project_id): Path<String>,
	Json(request): Json<CreateCodebaseRequest>,
) -> Result<(StatusCode, Json<CodebaseResponse>), ApiError> {
	if request.git_url.trim().is_empty() {
		return Err(ApiError::bad_request("gitUrl must not be empty"));
	}

	state
		.projects
		.get(&project_id)
		.await?
		.ok_or_else(|| ApiError::not_found(format!("project {project_id}")))?;

	let mut record = CodebaseRecord::new(&project_id, request.name.trim(), request.git_url.trim());
	if let Some(branch) = request.branch {
		record.branch = branch;
	}
	if let Some(sync_mode) = request.sync_mode {
		record.sync_mode = sync_mode;
	}
	record.webhook_secret = request.webhook_secret;

	state.codebases.create(&record).await?;
	Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /api/projects/{id}/codebases
#[utoipa::path(
	get,
	path = "/api/projects/{id}/codebases",
	params(("id" = String, Path, description = "Project id")),
	responses((status = 200, description = "Codebases", body = [CodebaseResponse])),
	tag = "projects"
)]
pub async fn list_codebases(
	State(state): State<AppState>,
	Path(project_id): Path<String>,
) -> Result<Json<Vec<CodebaseResponse>>, ApiError> {
	let records = state.codebases.list_by_project(&project_id).await?;
	Ok(Json(records.into_iter().map(Into::into).collect()))
}
