// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Graph store configuration section.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingMode {
	#[default]
	Sync,
	Async,
}

impl std::str::FromStr for IndexingMode {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"sync" => Ok(IndexingMode::Sync),
			"async" => Ok(IndexingMode::Async),
			_ => Err(format!("unknown indexing mode: {s}")),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphConfigLayer {
	pub enabled: Option<bool>,
	pub timeout_secs: Option<u64>,
	pub retries: Option<u32>,
	pub url: Option<String>,
	pub username: Option<String>,
	pub password: Option<String>,
	pub database: Option<String>,
	pub batch_size: Option<usize>,
	pub enable_vector_index: Option<bool>,
	pub vector_dimensions: Option<u32>,
	pub indexing_mode: Option<IndexingMode>,
}

impl GraphConfigLayer {
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
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.database.is_some() {
			self.database = other.database;
		}
		if other.batch_size.is_some() {
			self.batch_size = other.batch_size;
		}
		if other.enable_vector_index.is_some() {
			self.enable_vector_index = other.enable_vector_index;
		}
		if other.vector_dimensions.is_some() {
			self.vector_dimensions = other.vector_dimensions;
		}
		if other.indexing_mode.is_some() {
			self.indexing_mode = other.indexing_mode;
		}
	}

	pub fn finalize(self) -> GraphConfig {
		GraphConfig {
			enabled: self.enabled.unwrap_or(true),
			timeout_secs: self.timeout_secs.unwrap_or(120),
			retries: self.retries.unwrap_or(2),
			url: self.url.unwrap_or_else(|| "http://localhost:7474".to_string()),
			username: self.username.unwrap_or_else(|| "neo4j".to_string()),
			password: self.password.unwrap_or_default(),
			database: self.database.unwrap_or_else(|| "neo4j".to_string()),
			batch_size: self.batch_size.unwrap_or(100),
			enable_vector_index: self.enable_vector_index.unwrap_or(false),
			vector_dimensions: self.vector_dimensions.unwrap_or(1536),
			indexing_mode: self.indexing_mode.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphConfig {
	pub enabled: bool,
	pub timeout_secs: u64,
	pub retries: u32,
	pub url: String,
	pub username: String,
	/// May be empty at load time; the graph task refuses to run without it.
	pub password: String,
	pub database: String,
	pub batch_size: usize,
	pub enable_vector_index: bool,
	pub vector_dimensions: u32,
	pub indexing_mode: IndexingMode,
}

impl GraphConfig {
	/// Layer form of this config, for overlaying per-call overrides.
	pub fn to_layer(&self) -> GraphConfigLayer {
		GraphConfigLayer {
			enabled: Some(self.enabled),
			timeout_secs: Some(self.timeout_secs),
			retries: Some(self.retries),
			url: Some(self.url.clone()),
			username: Some(self.username.clone()),
			password: Some(self.password.clone()),
			database: Some(self.database.clone()),
			batch_size: Some(self.batch_size),
			enable_vector_index: Some(self.enable_vector_index),
			vector_dimensions: Some(self.vector_dimensions),
			indexing_mode: Some(self.indexing_mode),
		}
	}

	pub fn validate(&self) -> Result<()> {
		if self.timeout_secs == 0 {
			return Err(ConfigError::Validation("graph.timeout_secs must be > 0".into()));
		}
		if self.batch_size == 0 {
			return Err(ConfigError::Validation("graph.batch_size must be > 0".into()));
		}
		if !self.url.contains("://") {
			return Err(ConfigError::Validation(format!(
				"graph.url is not a well-formed URI: {:?}",
				self.url
			)));
		}
		Ok(())
	}
}

impl Default for GraphConfig {
	fn default() -> Self {
		GraphConfigLayer::default().finalize()
	}
}
