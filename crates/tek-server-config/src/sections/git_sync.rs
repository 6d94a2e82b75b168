// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Git synchronization task configuration section.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

fn default_exclude_patterns() -> Vec<String> {
	[
		"node_modules",
		".git",
		"dist",
		"build",
		"target",
		"vendor",
		"*.min.js",
		"*.map",
	]
	.into_iter()
	.map(str::to_string)
	.collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GitSyncConfigLayer {
	pub enabled: Option<bool>,
	pub timeout_secs: Option<u64>,
	pub retries: Option<u32>,
	pub incremental_mode: Option<bool>,
	pub include_deleted: Option<bool>,
	pub max_file_size: Option<u64>,
	pub exclude_patterns: Option<Vec<String>>,
	pub shallow: Option<bool>,
	pub access_token: Option<String>,
	pub username: Option<String>,
}

impl GitSyncConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
		if other.retries.is_some() {
			self.retries = other.retries;
		}
		if other.incremental_mode.is_some() {
			self.incremental_mode = other.incremental_mode;
		}
		if other.include_deleted.is_some() {
			self.include_deleted = other.include_deleted;
		}
		if other.max_file_size.is_some() {
			self.max_file_size = other.max_file_size;
		}
		if other.exclude_patterns.is_some() {
			self.exclude_patterns = other.exclude_patterns;
		}
		if other.shallow.is_some() {
			self.shallow = other.shallow;
		}
		if other.access_token.is_some() {
			self.access_token = other.access_token;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
	}

	pub fn finalize(self) -> GitSyncConfig {
		GitSyncConfig {
			enabled: self.enabled.unwrap_or(true),
			timeout_secs: self.timeout_secs.unwrap_or(600),
			retries: self.retries.unwrap_or(3),
			incremental_mode: self.incremental_mode.unwrap_or(true),
			include_deleted: self.include_deleted.unwrap_or(true),
			max_file_size: self.max_file_size.unwrap_or(10 * 1024 * 1024),
			exclude_patterns: self.exclude_patterns.unwrap_or_else(default_exclude_patterns),
			shallow: self.shallow.unwrap_or(true),
			access_token: self.access_token,
			username: self.username,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitSyncConfig {
	pub enabled: bool,
	pub timeout_secs: u64,
	pub retries: u32,
	pub incremental_mode: bool,
	pub include_deleted: bool,
	pub max_file_size: u64,
	pub exclude_patterns: Vec<String>,
	pub shallow: bool,
	pub access_token: Option<String>,
	pub username: Option<String>,
}

impl GitSyncConfig {
	/// Layer form of this config, for overlaying per-call overrides.
	pub fn to_layer(&self) -> GitSyncConfigLayer {
		GitSyncConfigLayer {
			enabled: Some(self.enabled),
			timeout_secs: Some(self.timeout_secs),
			retries: Some(self.retries),
			incremental_mode: Some(self.incremental_mode),
			include_deleted: Some(self.include_deleted),
			max_file_size: Some(self.max_file_size),
			exclude_patterns: Some(self.exclude_patterns.clone()),
			shallow: Some(self.shallow),
			access_token: self.access_token.clone(),
			username: self.username.clone(),
		}
	}

	pub fn validate(&self) -> Result<()> {
		if self.timeout_secs == 0 {
			return Err(ConfigError::Validation("git_sync.timeout_secs must be > 0".into()));
		}
		if self.max_file_size == 0 {
			return Err(ConfigError::Validation("git_sync.max_file_size must be > 0".into()));
		}
		Ok(())
	}
}

impl Default for GitSyncConfig {
	fn default() -> Self {
		GitSyncConfigLayer::default().finalize()
	}
}
