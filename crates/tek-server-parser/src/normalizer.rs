// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Raw parser JSON → normalized schema.
//!
//! Pure: identical raw inputs produce identical normalized outputs. File
//! ordering is path-sorted, so routing is deterministic.

use std::collections::BTreeMap;

use tracing::warn;

use crate::language::Language;
use crate::raw::{RawEntity, RawParserOutput, RawRelationship};
use crate::types::{
	NormalizedParserOutput, ParseMetadata, Parameter, SourceFile, Symbol, SymbolKind,
	SymbolRelationship, Visibility,
};

pub fn normalize(
	raw: &RawParserOutput,
	language: Language,
	codebase_name: &str,
	parsing_duration_ms: u64,
) -> NormalizedParserOutput {
	let mut files: BTreeMap<String, SourceFile> = BTreeMap::new();

	for raw_file in &raw.files {
		let Some(path) = raw_file.path.clone() else {
			warn!("parser file entry without a path, skipping");
			continue;
		};

		let entry = file_entry(&mut files, &path, language);
		if let Some(file_name) = &raw_file.file_name {
			entry.file_name = file_name.clone();
		}
		if raw_file.package_name.is_some() {
			entry.package_name = raw_file.package_name.clone();
		}
		entry.imports.extend(raw_file.imports.iter().cloned());
		entry.exports.extend(raw_file.exports.iter().cloned());

		for entity in &raw_file.symbols {
			let Some(kind) = entity_kind(entity, None) else {
				continue;
			};
			let symbol = to_symbol(entity, kind);
			file_entry(&mut files, &path, language).symbols.push(symbol);
		}

		for relationship in &raw_file.relationships {
			if let Some(rel) = to_relationship(relationship) {
				file_entry(&mut files, &path, language)
					.relationships
					.push(rel);
			}
		}
	}

	route_entities(&mut files, &raw.classes, Some(SymbolKind::Class), language);
	route_entities(
		&mut files,
		&raw.interfaces,
		Some(SymbolKind::Interface),
		language,
	);
	route_methods(&mut files, &raw.methods, language);
	route_entities(&mut files, &raw.fields, Some(SymbolKind::Field), language);
	route_entities(&mut files, &raw.enums, Some(SymbolKind::Enum), language);

	for relationship in &raw.relationships {
		route_relationship(&mut files, relationship, language);
	}

	let total_symbols = files.values().map(|f| f.symbols.len() as u64).sum();
	let total_files = files.len() as u64;

	let (framework, detected_frameworks, raw_codebase_name) = match &raw.metadata {
		Some(m) => (
			m.framework.clone(),
			m.detected_frameworks.clone(),
			m.codebase_name.clone(),
		),
		None => (None, Vec::new(), None),
	};

	NormalizedParserOutput {
		metadata: ParseMetadata {
			language: language.as_str().to_string(),
			total_files,
			total_symbols,
			parsing_duration_ms,
			framework,
			detected_frameworks,
			codebase_name: raw_codebase_name.or_else(|| Some(codebase_name.to_string())),
		},
		files: files.into_values().collect(),
	}
}

/// Get or create the file bucket for `path`. The per-file language comes
/// from the extension when it disagrees with the aggregate label.
fn file_entry<'a>(
	files: &'a mut BTreeMap<String, SourceFile>,
	path: &str,
	aggregate: Language,
) -> &'a mut SourceFile {
	files.entry(path.to_string()).or_insert_with(|| {
		let detected = Language::from_path(path)
			.map(|l| l.as_str().to_string())
			.unwrap_or_else(|| aggregate.as_str().to_string());
		SourceFile {
			path: path.to_string(),
			file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
			language: detected,
			..SourceFile::default()
		}
	})
}

fn route_entities(
	files: &mut BTreeMap<String, SourceFile>,
	entities: &[RawEntity],
	hint: Option<SymbolKind>,
	language: Language,
) {
	for entity in entities {
		let Some(path) = entity.file_path.as_deref() else {
			warn!(name = %entity.name, "entity without filePath, skipping");
			continue;
		};
		let Some(kind) = entity_kind(entity, hint) else {
			continue;
		};
		let symbol = to_symbol(entity, kind);
		file_entry(files, path, language).symbols.push(symbol);
	}
}

/// Methods declared on a type keep it as `parent`; the rest are standalone
/// functions.
fn route_methods(
	files: &mut BTreeMap<String, SourceFile>,
	entities: &[RawEntity],
	language: Language,
) {
	for entity in entities {
		let Some(path) = entity.file_path.as_deref() else {
			warn!(name = %entity.name, "method without filePath, skipping");
			continue;
		};
		let kind = if entity.class_name.is_some() {
			SymbolKind::Method
		} else {
			SymbolKind::Function
		};
		let symbol = to_symbol(entity, kind);
		file_entry(files, path, language).symbols.push(symbol);
	}
}

/// Resolve the symbol kind from the entity's declared type, falling back to
/// the array it arrived in. Unknown declared types are dropped with a
/// warning.
fn entity_kind(entity: &RawEntity, hint: Option<SymbolKind>) -> Option<SymbolKind> {
	match entity.entity_type.as_deref() {
		Some(declared) => match declared.to_ascii_lowercase().parse() {
			Ok(kind) => Some(kind),
			Err(_) => {
				warn!(name = %entity.name, declared, "unknown symbol type, skipping");
				hint
			}
		},
		None => hint,
	}
}

fn to_symbol(entity: &RawEntity, kind: SymbolKind) -> Symbol {
	let visibility = match entity.visibility.as_deref() {
		Some(raw) => match raw.to_ascii_lowercase().parse::<Visibility>() {
			Ok(v) => v,
			Err(_) => {
				warn!(name = %entity.name, visibility = raw, "unknown visibility, assuming public");
				Visibility::Public
			}
		},
		None => Visibility::Public,
	};

	Symbol {
		name: entity.name.clone(),
		kind,
		visibility,
		is_static: entity.is_static.unwrap_or(false),
		is_abstract: entity.is_abstract.unwrap_or(false),
		return_type: entity.return_type.clone(),
		parameters: entity
			.parameters
			.iter()
			.map(|p| Parameter {
				name: p.name.clone(),
				type_name: p.type_name.clone(),
			})
			.collect(),
		annotations: entity.annotations.clone(),
		line: entity.line.unwrap_or(0),
		parent: entity.class_name.clone(),
	}
}

fn to_relationship(raw: &RawRelationship) -> Option<SymbolRelationship> {
	let source = raw
		.source
		.clone()
		.or_else(|| raw.source_id.as_deref().map(|id| trailing_segment(id).to_string()))?;
	let target = raw
		.target
		.clone()
		.or_else(|| raw.target_id.as_deref().map(|id| trailing_segment(id).to_string()))?;

	Some(SymbolRelationship {
		rel_type: raw.rel_type.clone(),
		source,
		target,
		line: raw.line,
		properties: raw.properties.clone(),
	})
}

/// Attach a top-level relationship to its declaring file: by explicit
/// `sourceFilePath` when present, otherwise by locating a symbol whose name
/// matches the trailing segment of `sourceId`.
fn route_relationship(
	files: &mut BTreeMap<String, SourceFile>,
	raw: &RawRelationship,
	language: Language,
) {
	let Some(rel) = to_relationship(raw) else {
		warn!(rel_type = %raw.rel_type, "relationship without endpoints, skipping");
		return;
	};

	if let Some(path) = raw.source_file_path.as_deref() {
		file_entry(files, path, language).relationships.push(rel);
		return;
	}

	let needle = raw
		.source_id
		.as_deref()
		.map(trailing_segment)
		.unwrap_or(rel.source.as_str());

	let owner = files
		.iter()
		.find(|(_, file)| file.symbols.iter().any(|s| symbol_matches(s, needle)))
		.map(|(path, _)| path.clone());

	match owner {
		Some(path) => {
			if let Some(file) = files.get_mut(&path) {
				file.relationships.push(rel);
			}
		}
		None => warn!(
			rel_type = %raw.rel_type,
			source = %rel.source,
			"relationship source not found in any file, skipping"
		),
	}
}

fn symbol_matches(symbol: &Symbol, needle: &str) -> bool {
	symbol.name == needle || needle.ends_with(&format!(".{}", symbol.name))
}

fn trailing_segment(id: &str) -> &str {
	id.rsplit(':').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::raw::{RawFile, RawMetadata, RawParameter};

	fn java_raw() -> RawParserOutput {
		RawParserOutput {
			metadata: Some(RawMetadata {
				language: Some("java".into()),
				framework: Some("spring".into()),
				..RawMetadata::default()
			}),
			files: vec![RawFile {
				path: Some("src/A.java".into()),
				package_name: Some("com.acme".into()),
				imports: vec!["java.util.List".into()],
				..RawFile::default()
			}],
			classes: vec![RawEntity {
				name: "A".into(),
				file_path: Some("src/A.java".into()),
				visibility: Some("PUBLIC".into()),
				line: Some(1),
				..RawEntity::default()
			}],
			methods: vec![RawEntity {
				name: "m".into(),
				file_path: Some("src/A.java".into()),
				visibility: Some("public".into()),
				class_name: Some("A".into()),
				return_type: Some("void".into()),
				parameters: vec![RawParameter {
					name: "x".into(),
					type_name: Some("int".into()),
				}],
				line: Some(2),
				..RawEntity::default()
			}],
			..RawParserOutput::default()
		}
	}

	#[test]
	fn test_java_entities_route_to_declaring_file() {
		let out = normalize(&java_raw(), Language::Java, "svc", 42);

		assert_eq!(out.files.len(), 1);
		let file = &out.files[0];
		assert_eq!(file.path, "src/A.java");
		assert_eq!(file.file_name, "A.java");
		assert_eq!(file.package_name.as_deref(), Some("com.acme"));
		assert_eq!(file.symbols.len(), 2);

		let class = file.symbols.iter().find(|s| s.name == "A").unwrap();
		assert_eq!(class.kind, SymbolKind::Class);
		assert_eq!(class.visibility, Visibility::Public);

		let method = file.symbols.iter().find(|s| s.name == "m").unwrap();
		assert_eq!(method.kind, SymbolKind::Method);
		assert_eq!(method.parent.as_deref(), Some("A"));
		assert_eq!(method.parameters[0].type_name.as_deref(), Some("int"));
	}

	#[test]
	fn test_totals_invariant() {
		let out = normalize(&java_raw(), Language::Java, "svc", 42);
		let symbol_sum: u64 = out.files.iter().map(|f| f.symbols.len() as u64).sum();
		assert_eq!(out.metadata.total_symbols, symbol_sum);
		assert_eq!(out.metadata.total_files, out.files.len() as u64);
		assert_eq!(out.metadata.parsing_duration_ms, 42);
		assert_eq!(out.metadata.framework.as_deref(), Some("spring"));
	}

	#[test]
	fn test_pure_function() {
		let a = normalize(&java_raw(), Language::Java, "svc", 42);
		let b = normalize(&java_raw(), Language::Java, "svc", 42);
		assert_eq!(a, b);
	}

	#[test]
	fn test_method_without_class_is_function() {
		let raw = RawParserOutput {
			methods: vec![RawEntity {
				name: "helper".into(),
				file_path: Some("util.py".into()),
				..RawEntity::default()
			}],
			..RawParserOutput::default()
		};
		let out = normalize(&raw, Language::Python, "svc", 0);
		assert_eq!(out.files[0].symbols[0].kind, SymbolKind::Function);
	}

	#[test]
	fn test_unknown_symbol_type_skipped() {
		let raw = RawParserOutput {
			files: vec![RawFile {
				path: Some("x.ts".into()),
				symbols: vec![
					RawEntity {
						name: "Weird".into(),
						entity_type: Some("macro".into()),
						..RawEntity::default()
					},
					RawEntity {
						name: "Ok".into(),
						entity_type: Some("class".into()),
						..RawEntity::default()
					},
				],
				..RawFile::default()
			}],
			..RawParserOutput::default()
		};
		let out = normalize(&raw, Language::TypeScript, "svc", 0);
		assert_eq!(out.files[0].symbols.len(), 1);
		assert_eq!(out.files[0].symbols[0].name, "Ok");
	}

	#[test]
	fn test_mixed_language_output_detects_per_file() {
		let raw = RawParserOutput {
			files: vec![
				RawFile {
					path: Some("app.ts".into()),
					..RawFile::default()
				},
				RawFile {
					path: Some("script.py".into()),
					..RawFile::default()
				},
				RawFile {
					path: Some("LICENSE".into()),
					..RawFile::default()
				},
			],
			..RawParserOutput::default()
		};
		let out = normalize(&raw, Language::TypeScript, "svc", 0);

		let lang_of = |path: &str| {
			out.files
				.iter()
				.find(|f| f.path == path)
				.map(|f| f.language.clone())
				.unwrap()
		};
		assert_eq!(lang_of("app.ts"), "typescript");
		assert_eq!(lang_of("script.py"), "python");
		// Indeterminate extension falls back to the aggregate label.
		assert_eq!(lang_of("LICENSE"), "typescript");
	}

	#[test]
	fn test_relationship_routed_by_source_id() {
		let raw = RawParserOutput {
			files: vec![RawFile {
				path: Some("src/foo.ts".into()),
				symbols: vec![RawEntity {
					name: "Foo".into(),
					entity_type: Some("class".into()),
					..RawEntity::default()
				}],
				..RawFile::default()
			}],
			relationships: vec![RawRelationship {
				rel_type: "EXTENDS".into(),
				source_id: Some("svc:class:com.acme.Foo".into()),
				target_id: Some("svc:class:com.acme.Base".into()),
				..RawRelationship::default()
			}],
			..RawParserOutput::default()
		};
		let out = normalize(&raw, Language::TypeScript, "svc", 0);

		let file = out.files.iter().find(|f| f.path == "src/foo.ts").unwrap();
		assert_eq!(file.relationships.len(), 1);
		assert_eq!(file.relationships[0].rel_type, "EXTENDS");
		assert_eq!(file.relationships[0].source, "com.acme.Foo");
		assert_eq!(file.relationships[0].target, "com.acme.Base");
	}

	#[test]
	fn test_relationship_with_source_file_path() {
		let raw = RawParserOutput {
			relationships: vec![RawRelationship {
				rel_type: "CALLS".into(),
				source: Some("a".into()),
				target: Some("b".into()),
				source_file_path: Some("src/a.go".into()),
				..RawRelationship::default()
			}],
			..RawParserOutput::default()
		};
		let out = normalize(&raw, Language::Go, "svc", 0);

		assert_eq!(out.files.len(), 1);
		assert_eq!(out.files[0].path, "src/a.go");
		assert_eq!(out.files[0].relationships.len(), 1);
	}

	#[test]
	fn test_unroutable_relationship_dropped() {
		let raw = RawParserOutput {
			relationships: vec![RawRelationship {
				rel_type: "CALLS".into(),
				source: Some("ghost".into()),
				target: Some("b".into()),
				..RawRelationship::default()
			}],
			..RawParserOutput::default()
		};
		let out = normalize(&raw, Language::Go, "svc", 0);
		assert!(out.files.is_empty());
	}

	proptest::proptest! {
		#[test]
		fn prop_total_symbols_equals_sum_over_files(
			names in proptest::collection::vec("[a-z]{1,8}", 0..20)
		) {
			let raw = RawParserOutput {
				classes: names
					.iter()
					.enumerate()
					.map(|(i, name)| RawEntity {
						name: name.clone(),
						file_path: Some(format!("src/f{}.java", i % 5)),
						..RawEntity::default()
					})
					.collect(),
				..RawParserOutput::default()
			};

			let out = normalize(&raw, Language::Java, "svc", 0);
			let sum: u64 = out.files.iter().map(|f| f.symbols.len() as u64).sum();
			proptest::prop_assert_eq!(out.metadata.total_symbols, sum);
			proptest::prop_assert_eq!(out.metadata.total_symbols, names.len() as u64);
			proptest::prop_assert_eq!(out.metadata.total_files, out.files.len() as u64);
		}
	}

	#[test]
	fn test_entity_creates_missing_file_bucket() {
		let raw = RawParserOutput {
			classes: vec![RawEntity {
				name: "Orphan".into(),
				file_path: Some("src/orphan.java".into()),
				..RawEntity::default()
			}],
			..RawParserOutput::default()
		};
		let out = normalize(&raw, Language::Java, "svc", 0);
		assert_eq!(out.files.len(), 1);
		assert_eq!(out.files[0].file_name, "orphan.java");
		assert_eq!(out.files[0].symbols.len(), 1);
	}
}
