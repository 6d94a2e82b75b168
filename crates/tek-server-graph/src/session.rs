// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session seam over the graph store.
//!
//! The store speaks parameterized Cypher over its transactional HTTP
//! endpoint; each `run_batch` call is one transaction that commits all
//! statements or rolls back on the first failure.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{GraphError, Result};
use crate::types::{CypherStatement, GraphConfig, WriteCounters};

#[async_trait]
pub trait GraphSession: Send + Sync {
	/// Run all statements in one transaction; returns aggregated write
	/// counters from the statement summaries.
	async fn run_batch(&self, statements: &[CypherStatement]) -> Result<WriteCounters>;

	/// Cheap connectivity probe (`RETURN 1`).
	async fn verify_connectivity(&self) -> Result<()> {
		self.run_batch(&[CypherStatement::new("RETURN 1")]).await?;
		Ok(())
	}
}

/// Transactional-Cypher HTTP session.
pub struct HttpGraphSession {
	client: reqwest::Client,
	commit_url: String,
	username: String,
	password: String,
}

impl HttpGraphSession {
	pub fn new(config: &GraphConfig) -> Result<Self> {
		let base = reqwest::Url::parse(&config.url)
			.map_err(|e| GraphError::Config(format!("invalid graph URL {:?}: {e}", config.url)))?;

		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(60))
			.pool_max_idle_per_host(50)
			.pool_idle_timeout(Duration::from_secs(30 * 60))
			.build()?;

		let commit_url = format!(
			"{}/db/{}/tx/commit",
			base.as_str().trim_end_matches('/'),
			config.database
		);

		Ok(Self {
			client,
			commit_url,
			username: config.username.clone(),
			password: config.password.clone(),
		})
	}
}

#[derive(Debug, Default, Deserialize)]
struct TxResponse {
	#[serde(default)]
	results: Vec<TxResult>,
	#[serde(default)]
	errors: Vec<TxError>,
}

#[derive(Debug, Default, Deserialize)]
struct TxResult {
	#[serde(default)]
	stats: Option<TxStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
struct TxStats {
	#[serde(default)]
	nodes_created: u64,
	#[serde(default)]
	nodes_deleted: u64,
	#[serde(default)]
	relationships_created: u64,
	// Some server versions report this key in the singular.
	#[serde(default, alias = "relationship_deleted")]
	relationships_deleted: u64,
	#[serde(default)]
	properties_set: u64,
}

#[derive(Debug, Default, Deserialize)]
struct TxError {
	#[serde(default)]
	code: String,
	#[serde(default)]
	message: String,
}

#[async_trait]
impl GraphSession for HttpGraphSession {
	#[instrument(skip(self, statements), fields(statement_count = statements.len()))]
	async fn run_batch(&self, statements: &[CypherStatement]) -> Result<WriteCounters> {
		let body = serde_json::json!({
			"statements": statements
				.iter()
				.map(|s| {
					serde_json::json!({
						"statement": s.query,
						"parameters": s.parameters,
						"includeStats": true,
					})
				})
				.collect::<Vec<_>>(),
		});

		let response = self
			.client
			.post(&self.commit_url)
			.basic_auth(&self.username, Some(&self.password))
			.json(&body)
			.send()
			.await?;

		let parsed: TxResponse = response.json().await?;

		if let Some(error) = parsed.errors.into_iter().next() {
			// The endpoint rolls the whole transaction back on any error.
			return Err(GraphError::Query {
				code: error.code,
				message: error.message,
			});
		}

		let mut counters = WriteCounters::default();
		for result in parsed.results {
			if let Some(stats) = result.stats {
				counters.merge(&WriteCounters {
					nodes_created: stats.nodes_created,
					nodes_updated: stats.properties_set,
					relationships_created: stats.relationships_created,
					relationships_updated: 0,
					nodes_deleted: stats.nodes_deleted,
					relationships_deleted: stats.relationships_deleted,
				});
			}
		}

		debug!(?counters, "batch committed");
		Ok(counters)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_rejects_malformed_url() {
		let config = GraphConfig {
			url: "not a url".into(),
			password: "secret".into(),
			..GraphConfig::default()
		};
		assert!(matches!(
			HttpGraphSession::new(&config),
			Err(GraphError::Config(_))
		));
	}

	#[test]
	fn test_commit_url_shape() {
		let config = GraphConfig {
			url: "http://graph.internal:7474/".into(),
			password: "secret".into(),
			database: "code".into(),
			..GraphConfig::default()
		};
		let session = HttpGraphSession::new(&config).unwrap();
		assert_eq!(
			session.commit_url,
			"http://graph.internal:7474/db/code/tx/commit"
		);
	}

	#[test]
	fn test_stats_parsing() {
		let raw = r#"{
			"results": [
				{"stats": {"nodes_created": 2, "properties_set": 5, "relationships_created": 1}},
				{"stats": {"nodes_deleted": 3, "relationships_deleted": 4}}
			],
			"errors": []
		}"#;
		let parsed: TxResponse = serde_json::from_str(raw).unwrap();
		assert_eq!(parsed.results.len(), 2);
		let stats = parsed.results[0].stats.as_ref().unwrap();
		assert_eq!(stats.nodes_created, 2);
		assert_eq!(stats.properties_set, 5);
	}
}
