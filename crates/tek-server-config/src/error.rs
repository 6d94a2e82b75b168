// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("invalid value for {var}: {message}")]
	InvalidValue { var: String, message: String },

	#[error("configuration validation failed: {0}")]
	Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
