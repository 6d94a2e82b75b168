// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface for the TekContext engine.
//!
//! Thin controllers: request shapes are validated here, everything else is
//! forwarded to the orchestrator and the metadata repositories.

pub mod api;
pub mod routes;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use api::AppState;

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health))
		.route("/api/projects", post(routes::projects::create_project))
		.route("/api/projects/{id}", get(routes::projects::get_project))
		.route(
			"/api/projects/{id}/codebases",
			post(routes::projects::create_codebase).get(routes::projects::list_codebases),
		)
		.route(
			"/api/jobs",
			post(routes::jobs::create_job).get(routes::jobs::list_jobs),
		)
		.route(
			"/api/jobs/{id}",
			get(routes::jobs::get_job).delete(routes::jobs::cancel_job),
		)
		.route(
			"/api/codebases/{id}/index",
			post(routes::jobs::start_full_index),
		)
		.route(
			"/api/codebases/{id}/index/incremental",
			post(routes::jobs::start_incremental_index),
		)
		.route(
			"/api/projects/{id}/analysis/api",
			post(routes::jobs::start_api_analysis),
		)
		.route(
			"/api/projects/{id}/analysis/userflow",
			post(routes::jobs::start_userflow_analysis),
		)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		)
		.with_state(state)
}
