// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Code parsing task configuration: one parser container per language.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageParserConfig {
	pub enabled: bool,
	pub docker_image: String,
	pub options: Vec<String>,
}

fn default_languages() -> BTreeMap<String, LanguageParserConfig> {
	let mut languages = BTreeMap::new();
	languages.insert(
		"java".to_string(),
		LanguageParserConfig {
			enabled: true,
			docker_image: "tekai/parser-java:latest".to_string(),
			options: vec!["-Xmx2g".to_string()],
		},
	);
	languages.insert(
		"typescript".to_string(),
		LanguageParserConfig {
			enabled: true,
			docker_image: "tekai/parser-typescript:latest".to_string(),
			options: vec!["--max-old-space-size=2048".to_string()],
		},
	);
	languages.insert(
		"python".to_string(),
		LanguageParserConfig {
			enabled: false,
			docker_image: "tekai/parser-python:latest".to_string(),
			options: Vec::new(),
		},
	);
	languages.insert(
		"go".to_string(),
		LanguageParserConfig {
			enabled: false,
			docker_image: "tekai/parser-go:latest".to_string(),
			options: Vec::new(),
		},
	);
	languages.insert(
		"rust".to_string(),
		LanguageParserConfig {
			enabled: false,
			docker_image: "tekai/parser-rust:latest".to_string(),
			options: Vec::new(),
		},
	);
	languages
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParsingConfigLayer {
	pub enabled: Option<bool>,
	pub timeout_secs: Option<u64>,
	pub retries: Option<u32>,
	pub max_file_size: Option<u64>,
	pub output_format: Option<String>,
	/// Sparse per-language overrides; merged over the defaults.
	pub languages: Option<BTreeMap<String, LanguageParserConfig>>,
}

impl ParsingConfigLayer {
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
		if other.max_file_size.is_some() {
			self.max_file_size = other.max_file_size;
		}
		if other.output_format.is_some() {
			self.output_format = other.output_format;
		}
		if let Some(languages) = other.languages {
			let merged = self.languages.get_or_insert_with(BTreeMap::new);
			for (name, config) in languages {
				merged.insert(name, config);
			}
		}
	}

	pub fn finalize(self) -> ParsingConfig {
		let mut languages = default_languages();
		if let Some(overrides) = self.languages {
			for (name, config) in overrides {
				languages.insert(name, config);
			}
		}

		ParsingConfig {
			enabled: self.enabled.unwrap_or(true),
			timeout_secs: self.timeout_secs.unwrap_or(600),
			retries: self.retries.unwrap_or(2),
			max_file_size: self.max_file_size.unwrap_or(10 * 1024 * 1024),
			output_format: self.output_format.unwrap_or_else(|| "json".to_string()),
			languages,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsingConfig {
	pub enabled: bool,
	pub timeout_secs: u64,
	pub retries: u32,
	pub max_file_size: u64,
	pub output_format: String,
	pub languages: BTreeMap<String, LanguageParserConfig>,
}

impl ParsingConfig {
	/// Layer form of this config, for overlaying per-call overrides.
	pub fn to_layer(&self) -> ParsingConfigLayer {
		ParsingConfigLayer {
			enabled: Some(self.enabled),
			timeout_secs: Some(self.timeout_secs),
			retries: Some(self.retries),
			max_file_size: Some(self.max_file_size),
			output_format: Some(self.output_format.clone()),
			languages: Some(self.languages.clone()),
		}
	}

	pub fn validate(&self) -> Result<()> {
		if self.timeout_secs == 0 {
			return Err(ConfigError::Validation("parsing.timeout_secs must be > 0".into()));
		}
		if self.max_file_size == 0 {
			return Err(ConfigError::Validation("parsing.max_file_size must be > 0".into()));
		}
		for (name, language) in &self.languages {
			if language.enabled && language.docker_image.is_empty() {
				return Err(ConfigError::Validation(format!(
					"parsing.languages.{name}.docker_image must be set"
				)));
			}
		}
		Ok(())
	}
}

impl Default for ParsingConfig {
	fn default() -> Self {
		ParsingConfigLayer::default().finalize()
	}
}
