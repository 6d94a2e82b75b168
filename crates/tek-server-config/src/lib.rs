// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration for the TekContext server.
//!
//! Layered: built-in defaults, overridden by environment variables. Each
//! section has an all-`Option` layer with `merge`, finalized into a
//! concrete config and validated.

pub mod env;
pub mod error;
pub mod layer;
pub mod sections;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub storage: StorageConfig,
	pub jobs: JobsConfig,
	pub git_sync: GitSyncConfig,
	pub parsing: ParsingConfig,
	pub graph: GraphConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration: defaults overlaid with environment variables.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();

	debug!("loading configuration from environment");
	merged.merge(env::layer_from_env()?);

	finalize(merged)
}

fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		storage: layer.storage.unwrap_or_default().finalize(),
		jobs: layer.jobs.unwrap_or_default().finalize(),
		git_sync: layer.git_sync.unwrap_or_default().finalize(),
		parsing: layer.parsing.unwrap_or_default().finalize(),
		graph: layer.graph.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	config.git_sync.validate()?;
	config.parsing.validate()?;
	config.graph.validate()?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		storage_root = %config.storage.root.display(),
		max_workers = config.jobs.max_workers,
		graph_url = %config.graph.url,
		"configuration loaded"
	);

	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_finalize_defaults() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert_eq!(config.jobs.max_workers, 4);
		assert_eq!(config.graph.batch_size, 100);
		assert_eq!(config.socket_addr(), "0.0.0.0:8080");
	}

	#[test]
	fn test_finalize_validates_sections() {
		let layer = ServerConfigLayer {
			graph: Some(GraphConfigLayer {
				url: Some("no-scheme".into()),
				..GraphConfigLayer::default()
			}),
			..ServerConfigLayer::default()
		};
		assert!(finalize(layer).is_err());
	}
}
