// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Normalized parser output: the uniform schema all language parsers are
//! reduced to before graph writing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
	Class,
	Interface,
	Method,
	Function,
	Field,
	Property,
	Variable,
	Enum,
}

impl SymbolKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			SymbolKind::Class => "class",
			SymbolKind::Interface => "interface",
			SymbolKind::Method => "method",
			SymbolKind::Function => "function",
			SymbolKind::Field => "field",
			SymbolKind::Property => "property",
			SymbolKind::Variable => "variable",
			SymbolKind::Enum => "enum",
		}
	}
}

impl std::str::FromStr for SymbolKind {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"class" => Ok(SymbolKind::Class),
			"interface" => Ok(SymbolKind::Interface),
			"method" => Ok(SymbolKind::Method),
			"function" => Ok(SymbolKind::Function),
			"field" => Ok(SymbolKind::Field),
			"property" => Ok(SymbolKind::Property),
			"variable" => Ok(SymbolKind::Variable),
			"enum" => Ok(SymbolKind::Enum),
			_ => Err(format!("unknown symbol kind: {s}")),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
	#[default]
	Public,
	Private,
	Protected,
	Internal,
	Package,
}

impl std::str::FromStr for Visibility {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"public" => Ok(Visibility::Public),
			"private" => Ok(Visibility::Private),
			"protected" => Ok(Visibility::Protected),
			"internal" => Ok(Visibility::Internal),
			"package" => Ok(Visibility::Package),
			_ => Err(format!("unknown visibility: {s}")),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
	pub name: String,
	#[serde(rename = "type")]
	pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Symbol {
	pub name: String,
	#[serde(rename = "type")]
	pub kind: SymbolKind,
	pub visibility: Visibility,
	pub is_static: bool,
	pub is_abstract: bool,
	pub return_type: Option<String>,
	pub parameters: Vec<Parameter>,
	pub annotations: Vec<String>,
	pub line: u32,
	/// Declaring type name for members (a method's class, a field's owner).
	pub parent: Option<String>,
}

impl Default for Symbol {
	fn default() -> Self {
		Self {
			name: String::new(),
			kind: SymbolKind::Variable,
			visibility: Visibility::Public,
			is_static: false,
			is_abstract: false,
			return_type: None,
			parameters: Vec::new(),
			annotations: Vec::new(),
			line: 0,
			parent: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRelationship {
	#[serde(rename = "type")]
	pub rel_type: String,
	pub source: String,
	pub target: String,
	pub line: Option<u32>,
	pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceFile {
	pub path: String,
	pub file_name: String,
	pub package_name: Option<String>,
	pub language: String,
	pub symbols: Vec<Symbol>,
	pub imports: Vec<String>,
	pub exports: Vec<String>,
	pub relationships: Vec<SymbolRelationship>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseMetadata {
	pub language: String,
	pub total_files: u64,
	pub total_symbols: u64,
	pub parsing_duration_ms: u64,
	pub framework: Option<String>,
	pub detected_frameworks: Vec<String>,
	pub codebase_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedParserOutput {
	pub metadata: ParseMetadata,
	pub files: Vec<SourceFile>,
}
