// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared state and the error-to-status mapping for all routes.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use tek_server_db::{CodebaseRepository, ProjectRepository};
use tek_server_jobs::{JobError, JobOrchestrator};

#[derive(Clone)]
pub struct AppState {
	pub orchestrator: Arc<JobOrchestrator>,
	pub projects: ProjectRepository,
	pub codebases: CodebaseRepository,
}

/// Error payload for every non-2xx response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
	pub status: StatusCode,
	pub error: &'static str,
	pub message: String,
}

impl ApiError {
	pub fn bad_request(message: impl Into<String>) -> Self {
		Self {
			status: StatusCode::BAD_REQUEST,
			error: "bad_request",
			message: message.into(),
		}
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		Self {
			status: StatusCode::NOT_FOUND,
			error: "not_found",
			message: message.into(),
		}
	}

	pub fn conflict(message: impl Into<String>) -> Self {
		Self {
			status: StatusCode::CONFLICT,
			error: "conflict",
			message: message.into(),
		}
	}

	pub fn internal(message: impl Into<String>) -> Self {
		Self {
			status: StatusCode::INTERNAL_SERVER_ERROR,
			error: "internal_error",
			message: message.into(),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(
			self.status,
			Json(ErrorResponse {
				error: self.error.to_string(),
				message: self.message,
			}),
		)
			.into_response()
	}
}

impl From<JobError> for ApiError {
	fn from(e: JobError) -> Self {
		match e {
			JobError::Validation(message) => ApiError::bad_request(message),
			JobError::NotFound(message) => ApiError::not_found(message),
			JobError::State(message) => ApiError::bad_request(message),
			JobError::Cancelled => ApiError::bad_request("job was cancelled".to_string()),
			JobError::Config(message) => ApiError::internal(message),
			JobError::External(message) | JobError::Internal(message) => {
				ApiError::internal(message)
			}
			timeout @ JobError::Timeout { .. } => ApiError::internal(timeout.to_string()),
		}
	}
}

impl From<tek_server_db::DbError> for ApiError {
	fn from(e: tek_server_db::DbError) -> Self {
		match e {
			tek_server_db::DbError::NotFound(message) => ApiError::not_found(message),
			tek_server_db::DbError::Conflict(message) => ApiError::conflict(message),
			other => ApiError::internal(other.to_string()),
		}
	}
}
