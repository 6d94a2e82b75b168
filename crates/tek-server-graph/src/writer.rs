// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! High-level graph writer over a [`GraphSession`].
//!
//! Node statements are emitted before relationship statements so that
//! name-matched endpoints exist by the time an edge MERGE runs; deletions
//! cascade from File nodes to the symbols they define.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, instrument, warn};

use tek_server_parser::{SourceFile, Symbol, SymbolKind, SymbolRelationship};

use crate::error::Result;
use crate::ids::symbol_id;
use crate::schema::{relationship_endpoints, SCHEMA_STATEMENTS};
use crate::session::GraphSession;
use crate::types::{CypherStatement, WriteCounters};

pub struct GraphWriter {
	session: Arc<dyn GraphSession>,
	batch_size: usize,
	schema_ready: AtomicBool,
}

impl GraphWriter {
	pub fn new(session: Arc<dyn GraphSession>, batch_size: usize) -> Self {
		Self {
			session,
			batch_size: batch_size.max(1),
			schema_ready: AtomicBool::new(false),
		}
	}

	/// Connectivity probe against the live session.
	pub async fn verify_connection(&self) -> Result<()> {
		self.session.verify_connectivity().await
	}

	/// Create constraints and indexes once per process. Failures on
	/// pre-existing schema objects are tolerated.
	#[instrument(skip(self))]
	pub async fn ensure_schema(&self) -> Result<()> {
		if self.schema_ready.load(Ordering::SeqCst) {
			return Ok(());
		}

		for statement in SCHEMA_STATEMENTS {
			match self
				.session
				.run_batch(&[CypherStatement::new(*statement)])
				.await
			{
				Ok(_) => {}
				Err(e) if e.is_already_exists() => {
					debug!(statement, "schema object already exists");
				}
				Err(e) => return Err(e),
			}
		}

		self.schema_ready.store(true, Ordering::SeqCst);
		Ok(())
	}

	/// MERGE the Project and Codebase anchor nodes, link them, and record
	/// the commit the codebase was indexed at.
	#[instrument(skip(self, project_name, codebase_name))]
	pub async fn merge_codebase_root(
		&self,
		project_id: &str,
		project_name: &str,
		codebase_id: &str,
		codebase_name: &str,
		commit_hash: &str,
	) -> Result<WriteCounters> {
		let statement = CypherStatement {
			query: "MERGE (p:Project {projectId: $projectId}) \
				SET p.name = $projectName \
				MERGE (c:Codebase {id: $codebaseId}) \
				SET c.name = $codebaseName, c.lastIndexedCommit = $commitHash \
				MERGE (p)-[:HAS_CODEBASE]->(c)"
				.to_string(),
			parameters: json!({
				"projectId": project_id,
				"projectName": project_name,
				"codebaseId": codebase_id,
				"codebaseName": codebase_name,
				"commitHash": commit_hash,
			}),
		};

		self.session.run_batch(&[statement]).await
	}

	/// MERGE files, their symbols, and their relationships in batches.
	/// `checksums` maps file path → content checksum.
	#[instrument(skip(self, files, checksums), fields(file_count = files.len()))]
	pub async fn merge_files(
		&self,
		codebase_id: &str,
		files: &[SourceFile],
		checksums: &BTreeMap<String, String>,
	) -> Result<WriteCounters> {
		let mut statements = Vec::new();

		for file in files {
			let checksum = checksums.get(&file.path).map(String::as_str).unwrap_or("");
			statements.push(file_statement(codebase_id, file, checksum));
			statements.extend(symbol_statements(file));
		}

		// Relationships after all nodes: endpoints are matched by name.
		for file in files {
			for relationship in &file.relationships {
				match relationship_statement(relationship) {
					Some(statement) => statements.push(statement),
					None => warn!(
						rel_type = %relationship.rel_type,
						"relationship type not in schema, skipping"
					),
				}
			}
		}

		self.run_chunked(statements).await
	}

	/// Cascade-delete File nodes and every symbol they define.
	#[instrument(skip(self, paths), fields(path_count = paths.len()))]
	pub async fn delete_files(
		&self,
		codebase_id: &str,
		paths: &[String],
	) -> Result<WriteCounters> {
		let statements: Vec<CypherStatement> = paths
			.iter()
			.map(|path| delete_statement(codebase_id, path))
			.collect();

		self.run_chunked(statements).await
	}

	async fn run_chunked(&self, statements: Vec<CypherStatement>) -> Result<WriteCounters> {
		let mut counters = WriteCounters::default();
		for chunk in statements.chunks(self.batch_size) {
			counters.merge(&self.session.run_batch(chunk).await?);
		}
		Ok(counters)
	}
}

fn file_statement(codebase_id: &str, file: &SourceFile, checksum: &str) -> CypherStatement {
	CypherStatement {
		query: "MERGE (f:File {path: $path}) \
			SET f.id = $id, f.fileName = $fileName, f.packageName = $packageName, \
				f.language = $language, f.checksum = $checksum \
			WITH f \
			MATCH (c:Codebase {id: $codebaseId}) \
			MERGE (c)-[:CONTAINS_FILE]->(f)"
			.to_string(),
		parameters: json!({
			"path": file.path,
			"id": crate::ids::file_node_id(checksum, &file.path),
			"fileName": file.file_name,
			"packageName": file.package_name,
			"language": file.language,
			"checksum": checksum,
			"codebaseId": codebase_id,
		}),
	}
}

/// Label and File-edge per symbol kind. Members with a parent type hang off
/// that type instead of the file.
fn symbol_label_and_edge(symbol: &Symbol) -> (&'static str, Option<&'static str>) {
	match symbol.kind {
		SymbolKind::Class => ("Class", Some("DEFINES_CLASS")),
		SymbolKind::Interface => ("Interface", Some("DEFINES_INTERFACE")),
		SymbolKind::Enum => ("Enum", Some("DEFINES_CLASS")),
		SymbolKind::Method | SymbolKind::Function => {
			if symbol.parent.is_some() {
				("Method", None)
			} else {
				("Method", Some("DEFINES_METHOD"))
			}
		}
		SymbolKind::Field | SymbolKind::Property | SymbolKind::Variable => {
			("Variable", Some("DEFINES_VARIABLE"))
		}
	}
}

fn symbol_statements(file: &SourceFile) -> Vec<CypherStatement> {
	// Types first so member symbols can attach to them within the batch.
	let (types, members): (Vec<&Symbol>, Vec<&Symbol>) = file.symbols.iter().partition(|s| {
		matches!(
			s.kind,
			SymbolKind::Class | SymbolKind::Interface | SymbolKind::Enum
		)
	});

	types
		.into_iter()
		.chain(members)
		.map(|symbol| symbol_statement(file, symbol))
		.collect()
}

fn symbol_statement(file: &SourceFile, symbol: &Symbol) -> CypherStatement {
	let (label, file_edge) = symbol_label_and_edge(symbol);
	let id = symbol_id(&file.path, symbol.kind.as_str(), &symbol.name, symbol.line);
	let fully_qualified_name = match &file.package_name {
		Some(package) => format!("{package}.{}", symbol.name),
		None => symbol.name.clone(),
	};

	let parameters = json!({
		"id": id,
		"name": symbol.name,
		"fullyQualifiedName": fully_qualified_name,
		"visibility": symbol.visibility,
		"isStatic": symbol.is_static,
		"isAbstract": symbol.is_abstract,
		"returnType": symbol.return_type,
		"annotations": symbol.annotations,
		"line": symbol.line,
		"path": file.path,
		"parent": symbol.parent,
	});

	let query = match file_edge {
		Some(edge) => format!(
			"MERGE (s:{label} {{id: $id}}) \
			 SET s.name = $name, s.fullyQualifiedName = $fullyQualifiedName, \
				s.visibility = $visibility, s.isStatic = $isStatic, \
				s.isAbstract = $isAbstract, s.returnType = $returnType, \
				s.annotations = $annotations, s.line = $line \
			 WITH s \
			 MATCH (f:File {{path: $path}}) \
			 MERGE (f)-[:{edge}]->(s)"
		),
		None => format!(
			"MERGE (m:{label} {{id: $id}}) \
			 SET m.name = $name, m.fullyQualifiedName = $fullyQualifiedName, \
				m.visibility = $visibility, m.isStatic = $isStatic, \
				m.isAbstract = $isAbstract, m.returnType = $returnType, \
				m.annotations = $annotations, m.line = $line \
			 WITH m \
			 MATCH (f:File {{path: $path}})-[:DEFINES_CLASS|DEFINES_INTERFACE]->(c) \
			 WHERE c.name = $parent \
			 MERGE (c)-[:HAS_METHOD]->(m)"
		),
	};

	CypherStatement { query, parameters }
}

/// Edge between nodes matched by name or FQN, constrained to the endpoint
/// labels the schema allows for the type. Unknown types yield no statement.
fn relationship_statement(relationship: &SymbolRelationship) -> Option<CypherStatement> {
	let (source_labels, target_labels) = relationship_endpoints(&relationship.rel_type)?;

	// rel_type is validated against the schema table, so embedding it in
	// the query text is safe.
	let query = format!(
		"MATCH (s) WHERE any(l IN labels(s) WHERE l IN $sourceLabels) \
			AND (s.name = $source OR s.fullyQualifiedName = $source) \
		 MATCH (t) WHERE any(l IN labels(t) WHERE l IN $targetLabels) \
			AND (t.name = $target OR t.fullyQualifiedName = $target) \
		 MERGE (s)-[:{}]->(t)",
		relationship.rel_type
	);

	Some(CypherStatement {
		query,
		parameters: json!({
			"sourceLabels": source_labels,
			"targetLabels": target_labels,
			"source": relationship.source,
			"target": relationship.target,
		}),
	})
}

fn delete_statement(codebase_id: &str, path: &str) -> CypherStatement {
	CypherStatement {
		query: "MATCH (c:Codebase {id: $codebaseId})-[:CONTAINS_FILE]->(f:File {path: $path}) \
			OPTIONAL MATCH (f)-[:DEFINES_CLASS|DEFINES_METHOD|DEFINES_INTERFACE|DEFINES_VARIABLE]->(s) \
			DETACH DELETE f, s"
			.to_string(),
		parameters: json!({
			"codebaseId": codebase_id,
			"path": path,
		}),
	}
}
