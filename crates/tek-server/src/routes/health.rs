// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::Json;
use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
	pub status: &'static str,
}

/// GET /health - liveness probe.
#[utoipa::path(
	get,
	path = "/health",
	responses((status = 200, description = "Server is alive", body = HealthResponse)),
	tag = "health"
)]
pub async fn health() -> Json<HealthResponse> {
	Json(HealthResponse { status: "ok" })
}
