// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct GraphConfig {
	pub url: String,
	pub username: String,
	pub password: String,
	pub database: String,
	pub batch_size: usize,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			url: "http://localhost:7474".to_string(),
			username: "neo4j".to_string(),
			password: String::new(),
			database: "neo4j".to_string(),
			batch_size: 100,
		}
	}
}

/// One parameterized Cypher statement.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CypherStatement {
	pub query: String,
	pub parameters: serde_json::Value,
}

impl CypherStatement {
	pub fn new(query: impl Into<String>) -> Self {
		Self {
			query: query.into(),
			parameters: serde_json::json!({}),
		}
	}

	pub fn param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		if let serde_json::Value::Object(map) = &mut self.parameters {
			map.insert(key.to_string(), value.into());
		}
		self
	}
}

/// Aggregated write counters from statement summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteCounters {
	pub nodes_created: u64,
	pub nodes_updated: u64,
	pub relationships_created: u64,
	pub relationships_updated: u64,
	pub nodes_deleted: u64,
	pub relationships_deleted: u64,
}

impl WriteCounters {
	pub fn merge(&mut self, other: &WriteCounters) {
		self.nodes_created += other.nodes_created;
		self.nodes_updated += other.nodes_updated;
		self.relationships_created += other.relationships_created;
		self.relationships_updated += other.relationships_updated;
		self.nodes_deleted += other.nodes_deleted;
		self.relationships_deleted += other.relationships_deleted;
	}
}
