// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
	#[error("invalid graph configuration: {0}")]
	Config(String),

	#[error("graph store unreachable: {0}")]
	Http(#[from] reqwest::Error),

	#[error("graph query failed [{code}]: {message}")]
	Query { code: String, message: String },

	#[error("unexpected graph response: {0}")]
	Json(#[from] serde_json::Error),
}

impl GraphError {
	/// True for failures on schema objects that already exist; those are
	/// tolerated when creating constraints and indexes.
	pub fn is_already_exists(&self) -> bool {
		match self {
			GraphError::Query { code, message } => {
				code.contains("EquivalentSchemaRule")
					|| code.contains("ConstraintAlreadyExists")
					|| code.contains("IndexAlreadyExists")
					|| message.contains("already exists")
			}
			_ => false,
		}
	}
}

pub type Result<T> = std::result::Result<T, GraphError>;
