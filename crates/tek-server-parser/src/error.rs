// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
	#[error("parser image not available: {0}")]
	ImageUnavailable(String),

	#[error("parser container for {image} timed out after {timeout_secs}s")]
	Timeout { image: String, timeout_secs: u64 },

	#[error("parser container failed: {stderr}")]
	ContainerFailed { stderr: String },

	#[error("parser produced no output file: {0}")]
	OutputMissing(String),

	#[error("invalid parser output: {0}")]
	Json(#[from] serde_json::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl ParserError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, ParserError::Timeout { .. })
	}
}

pub type Result<T> = std::result::Result<T, ParserError>;
