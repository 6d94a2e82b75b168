// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Engine-wide error taxonomy.
//!
//! Timeouts are distinguished from other external failures so callers and
//! job records can report them as such.

use tek_server_config::ConfigError;
use tek_server_db::DbError;
use tek_server_git::GitError;
use tek_server_graph::GraphError;
use tek_server_parser::ParserError;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
	#[error("validation failed: {0}")]
	Validation(String),

	#[error("not found: {0}")]
	NotFound(String),

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("external dependency failed: {0}")]
	External(String),

	#[error("{what} timed out after {elapsed_ms}ms")]
	Timeout { what: String, elapsed_ms: u64 },

	#[error("illegal state: {0}")]
	State(String),

	#[error("cancelled")]
	Cancelled,

	#[error("internal error: {0}")]
	Internal(String),
}

impl JobError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, JobError::Timeout { .. })
	}
}

impl From<DbError> for JobError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::NotFound(what) => JobError::NotFound(what),
			DbError::Conflict(what) => JobError::State(what),
			other => JobError::Internal(other.to_string()),
		}
	}
}

impl From<GitError> for JobError {
	fn from(e: GitError) -> Self {
		match e {
			GitError::Timeout { ref args, timeout_secs } => JobError::Timeout {
				what: format!("git {}", args.join(" ")),
				elapsed_ms: timeout_secs * 1000,
			},
			other => JobError::External(other.to_string()),
		}
	}
}

impl From<ParserError> for JobError {
	fn from(e: ParserError) -> Self {
		match e {
			ParserError::Timeout { ref image, timeout_secs } => JobError::Timeout {
				what: format!("parser container {image}"),
				elapsed_ms: timeout_secs * 1000,
			},
			other => JobError::External(other.to_string()),
		}
	}
}

impl From<GraphError> for JobError {
	fn from(e: GraphError) -> Self {
		match e {
			GraphError::Config(message) => JobError::Config(message),
			other => JobError::External(other.to_string()),
		}
	}
}

impl From<ConfigError> for JobError {
	fn from(e: ConfigError) -> Self {
		JobError::Config(e.to_string())
	}
}

impl From<std::io::Error> for JobError {
	fn from(e: std::io::Error) -> Self {
		JobError::Internal(format!("I/O error: {e}"))
	}
}

pub type Result<T> = std::result::Result<T, JobError>;
