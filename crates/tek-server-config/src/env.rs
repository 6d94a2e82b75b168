// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment variable source.
//!
//! Reads the engine's recognized variables into a configuration layer.
//! Unset variables leave the layer slot empty so defaults apply.

use std::collections::BTreeMap;

use crate::error::{ConfigError, Result};
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, GitSyncConfigLayer, GraphConfigLayer, HttpConfigLayer, IndexingMode,
	JobsConfigLayer, LanguageParserConfig, LoggingConfigLayer, ParsingConfigLayer,
	StorageConfigLayer,
};

pub fn layer_from_env() -> Result<ServerConfigLayer> {
	Ok(ServerConfigLayer {
		http: Some(HttpConfigLayer {
			host: env_var("TEK_SERVER_HOST"),
			port: env_u16("TEK_SERVER_PORT")?,
		}),
		database: Some(DatabaseConfigLayer {
			url: env_var("DATABASE_URL"),
		}),
		storage: Some(StorageConfigLayer {
			root: env_var("STORAGE_ROOT").map(Into::into),
			storage_type: env_var("STORAGE_TYPE"),
			max_file_size_mb: env_u64("MAX_FILE_SIZE_MB")?,
		}),
		jobs: Some(JobsConfigLayer {
			max_workers: env_usize("JOB_MAX_WORKERS")?,
			task_timeout_ms: env_u64("JOB_TASK_TIMEOUT")?,
		}),
		git_sync: Some(GitSyncConfigLayer {
			enabled: env_bool("GIT_SYNC_ENABLED"),
			timeout_secs: env_u64("GIT_SYNC_TIMEOUT")?,
			retries: env_u32("GIT_SYNC_RETRIES")?,
			incremental_mode: env_bool("GIT_SYNC_INCREMENTAL"),
			include_deleted: env_bool("GIT_SYNC_INCLUDE_DELETED"),
			max_file_size: env_u64("GIT_SYNC_MAX_FILE_SIZE")?,
			exclude_patterns: env_list("GIT_SYNC_EXCLUDE_PATTERNS"),
			shallow: env_bool("GIT_SYNC_SHALLOW"),
			access_token: env_var("GIT_SYNC_ACCESS_TOKEN"),
			username: env_var("GIT_SYNC_USERNAME"),
		}),
		parsing: Some(ParsingConfigLayer {
			enabled: env_bool("CODE_PARSING_ENABLED"),
			timeout_secs: env_u64("CODE_PARSING_TIMEOUT")?,
			retries: env_u32("CODE_PARSING_RETRIES")?,
			max_file_size: env_u64("PARSING_MAX_FILE_SIZE")?,
			output_format: env_var("PARSING_OUTPUT_FORMAT"),
			languages: language_layers(),
		}),
		graph: Some(GraphConfigLayer {
			enabled: env_bool("NEO4J_ENABLED"),
			timeout_secs: env_u64("NEO4J_TIMEOUT")?,
			retries: env_u32("NEO4J_RETRIES")?,
			url: env_var("NEO4J_URL"),
			username: env_var("NEO4J_USERNAME"),
			password: env_var("NEO4J_PASSWORD"),
			database: env_var("NEO4J_DATABASE"),
			batch_size: env_usize("NEO4J_BATCH_SIZE")?,
			enable_vector_index: env_bool("NEO4J_VECTOR_INDEX"),
			vector_dimensions: env_u32("NEO4J_VECTOR_DIMENSIONS")?,
			indexing_mode: env_indexing_mode("NEO4J_INDEXING_MODE")?,
		}),
		logging: Some(LoggingConfigLayer {
			level: env_var("TEK_SERVER_LOG_LEVEL"),
		}),
	})
}

/// Per-language overrides: `PARSING_<LANG>_ENABLED`, `DOCKER_IMAGE_<LANG>`,
/// `PARSING_<LANG>_OPTIONS`. A language appears in the layer only when at
/// least one of its variables is set.
fn language_layers() -> Option<BTreeMap<String, LanguageParserConfig>> {
	use crate::sections::parsing::ParsingConfig;

	let defaults = ParsingConfig::default().languages;
	let mut overrides = BTreeMap::new();

	for (name, suffix) in [
		("java", "JAVA"),
		("typescript", "TS"),
		("python", "PYTHON"),
		("go", "GO"),
		("rust", "RUST"),
	] {
		let enabled = env_bool(&format!("PARSING_{suffix}_ENABLED"));
		let docker_image = env_var(&format!("DOCKER_IMAGE_{suffix}"));
		let options = env_list(&format!("PARSING_{suffix}_OPTIONS"));

		if enabled.is_none() && docker_image.is_none() && options.is_none() {
			continue;
		}

		let base = defaults.get(name).cloned().unwrap_or(LanguageParserConfig {
			enabled: false,
			docker_image: String::new(),
			options: Vec::new(),
		});

		overrides.insert(
			name.to_string(),
			LanguageParserConfig {
				enabled: enabled.unwrap_or(base.enabled),
				docker_image: docker_image.unwrap_or(base.docker_image),
				options: options.unwrap_or(base.options),
			},
		);
	}

	(!overrides.is_empty()).then_some(overrides)
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
}

fn env_list(name: &str) -> Option<Vec<String>> {
	env_var(name).map(|v| {
		v.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(str::to_string)
			.collect()
	})
}

fn env_indexing_mode(name: &str) -> Result<Option<IndexingMode>> {
	env_var(name)
		.map(|v| {
			v.parse().map_err(|message| ConfigError::InvalidValue {
				var: name.to_string(),
				message,
			})
		})
		.transpose()
}

macro_rules! env_parse {
	($fn_name:ident, $ty:ty) => {
		fn $fn_name(name: &str) -> Result<Option<$ty>> {
			env_var(name)
				.map(|v| {
					v.parse::<$ty>().map_err(|e| ConfigError::InvalidValue {
						var: name.to_string(),
						message: e.to_string(),
					})
				})
				.transpose()
		}
	};
}

env_parse!(env_u16, u16);
env_parse!(env_u32, u32);
env_parse!(env_u64, u64);
env_parse!(env_usize, usize);

#[cfg(test)]
mod tests {
	use super::*;

	// Env-var tests mutate process state; each uses its own variable names
	// to stay independent of test ordering.

	#[test]
	fn test_env_bool_forms() {
		std::env::set_var("TEK_TEST_BOOL_A", "true");
		std::env::set_var("TEK_TEST_BOOL_B", "0");
		assert_eq!(env_bool("TEK_TEST_BOOL_A"), Some(true));
		assert_eq!(env_bool("TEK_TEST_BOOL_B"), Some(false));
		assert_eq!(env_bool("TEK_TEST_BOOL_MISSING"), None);
	}

	#[test]
	fn test_env_list_splits_and_trims() {
		std::env::set_var("TEK_TEST_LIST", "node_modules, dist ,,.git");
		assert_eq!(
			env_list("TEK_TEST_LIST"),
			Some(vec![
				"node_modules".to_string(),
				"dist".to_string(),
				".git".to_string()
			])
		);
	}

	#[test]
	fn test_env_parse_rejects_garbage() {
		std::env::set_var("TEK_TEST_U64", "not-a-number");
		assert!(env_u64("TEK_TEST_U64").is_err());
	}

	#[test]
	fn test_empty_var_treated_as_unset() {
		std::env::set_var("TEK_TEST_EMPTY", "");
		assert_eq!(env_var("TEK_TEST_EMPTY"), None);
	}
}
