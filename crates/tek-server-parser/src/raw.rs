// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Raw parser JSON as emitted by the language containers.
//!
//! Shapes vary per language; every field is optional or defaulted and the
//! normalizer decides what to keep.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawParserOutput {
	pub metadata: Option<RawMetadata>,
	pub files: Vec<RawFile>,
	pub classes: Vec<RawEntity>,
	pub interfaces: Vec<RawEntity>,
	pub methods: Vec<RawEntity>,
	pub fields: Vec<RawEntity>,
	pub enums: Vec<RawEntity>,
	pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMetadata {
	pub language: Option<String>,
	pub framework: Option<String>,
	pub detected_frameworks: Vec<String>,
	pub codebase_name: Option<String>,
	#[serde(alias = "parsingDuration")]
	pub parsing_duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFile {
	#[serde(alias = "filePath")]
	pub path: Option<String>,
	pub file_name: Option<String>,
	pub package_name: Option<String>,
	pub language: Option<String>,
	pub imports: Vec<String>,
	pub exports: Vec<String>,
	/// Some parsers inline symbols per file instead of using the top-level
	/// entity arrays.
	pub symbols: Vec<RawEntity>,
	pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawParameter {
	pub name: String,
	#[serde(rename = "type")]
	pub type_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntity {
	pub name: String,
	#[serde(rename = "type", alias = "kind")]
	pub entity_type: Option<String>,
	pub file_path: Option<String>,
	pub visibility: Option<String>,
	pub is_static: Option<bool>,
	pub is_abstract: Option<bool>,
	pub return_type: Option<String>,
	pub parameters: Vec<RawParameter>,
	#[serde(alias = "decorators")]
	pub annotations: Vec<String>,
	pub line: Option<u32>,
	#[serde(alias = "parent")]
	pub class_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRelationship {
	#[serde(rename = "type")]
	pub rel_type: String,
	pub source: Option<String>,
	pub target: Option<String>,
	/// TypeScript-style ids shaped `codebase:type:fqn`.
	pub source_id: Option<String>,
	pub target_id: Option<String>,
	pub source_file_path: Option<String>,
	pub line: Option<u32>,
	pub properties: Option<serde_json::Value>,
}
