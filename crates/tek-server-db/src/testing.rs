// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test helpers shared by this crate and downstream crates' tests.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// In-memory SQLite pool with the full schema applied.
///
/// A single connection: each in-memory SQLite connection is its own
/// database, so a wider pool would lose the schema.
///
/// Panics on failure; intended for tests only.
pub async fn memory_pool() -> SqlitePool {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.expect("in-memory sqlite");
	crate::migrations::run_migrations(&pool)
		.await
		.expect("migrations");
	pool
}
