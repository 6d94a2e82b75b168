// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Graph schema: constraints, indexes, and the relationship-type table
//! with its endpoint label constraints.

/// Uniqueness constraints and lookup indexes. `IF NOT EXISTS` plus
/// tolerated already-exists failures keep creation idempotent across
/// server versions.
pub const SCHEMA_STATEMENTS: &[&str] = &[
	"CREATE CONSTRAINT project_id_unique IF NOT EXISTS FOR (n:Project) REQUIRE n.projectId IS UNIQUE",
	"CREATE CONSTRAINT codebase_id_unique IF NOT EXISTS FOR (n:Codebase) REQUIRE n.id IS UNIQUE",
	"CREATE CONSTRAINT class_id_unique IF NOT EXISTS FOR (n:Class) REQUIRE n.id IS UNIQUE",
	"CREATE CONSTRAINT method_id_unique IF NOT EXISTS FOR (n:Method) REQUIRE n.id IS UNIQUE",
	"CREATE CONSTRAINT interface_id_unique IF NOT EXISTS FOR (n:Interface) REQUIRE n.id IS UNIQUE",
	"CREATE CONSTRAINT api_endpoint_id_unique IF NOT EXISTS FOR (n:APIEndpoint) REQUIRE n.id IS UNIQUE",
	"CREATE INDEX file_path_idx IF NOT EXISTS FOR (n:File) ON (n.path)",
	"CREATE INDEX class_name_idx IF NOT EXISTS FOR (n:Class) ON (n.name)",
	"CREATE INDEX method_name_idx IF NOT EXISTS FOR (n:Method) ON (n.name)",
	"CREATE INDEX class_fqn_idx IF NOT EXISTS FOR (n:Class) ON (n.fullyQualifiedName)",
];

/// Allowed endpoint labels per relationship type, enforced at write time.
pub fn relationship_endpoints(
	rel_type: &str,
) -> Option<(&'static [&'static str], &'static [&'static str])> {
	match rel_type {
		"HAS_CODEBASE" => Some((&["Project"], &["Codebase"])),
		"CONTAINS_FILE" => Some((&["Codebase"], &["File"])),
		"AUTHORED" => Some((&["Author"], &["Commit"])),
		"MODIFIED_IN" => Some((&["File"], &["Commit"])),
		"DEFINES_CLASS" => Some((&["File"], &["Class"])),
		"DEFINES_METHOD" => Some((&["File"], &["Method"])),
		"HAS_METHOD" => Some((&["Class"], &["Method"])),
		"CALLS" => Some((&["Method"], &["Method"])),
		"IMPLEMENTS" => Some((&["Class"], &["Interface"])),
		"EXTENDS" => Some((&["Class"], &["Class"])),
		"USES_TYPE" => Some((&["Method"], &["Class", "Interface"])),
		"ANNOTATED_WITH" => Some((&["Class", "Method"], &["Annotation"])),
		"IMPLEMENTS_ENDPOINT" => Some((&["Method"], &["APIEndpoint"])),
		"TESTS" => Some((&["TestCase"], &["Class", "Method"])),
		"DEPENDS_ON" => Some((&["Codebase"], &["Dependency"])),
		"DESCRIBED_IN" => Some((&["Class", "Method", "APIEndpoint"], &["Chunk"])),
		"HAS_CHUNK" => Some((&["Document"], &["Chunk"])),
		"DOCUMENTS" => Some((&["Document"], &["UserFlow"])),
		"PUBLISHES_TO" => Some((&["Method"], &["KafkaTopic"])),
		"SUBSCRIBES_TO" => Some((&["Method"], &["KafkaTopic"])),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_known_relationship_endpoints() {
		let (src, dst) = relationship_endpoints("CALLS").unwrap();
		assert_eq!(src, &["Method"]);
		assert_eq!(dst, &["Method"]);

		let (src, dst) = relationship_endpoints("USES_TYPE").unwrap();
		assert_eq!(src, &["Method"]);
		assert_eq!(dst, &["Class", "Interface"]);
	}

	#[test]
	fn test_unknown_relationship_rejected() {
		assert!(relationship_endpoints("FRIENDS_WITH").is_none());
		assert!(relationship_endpoints("").is_none());
	}

	#[test]
	fn test_schema_statements_are_idempotent_by_construction() {
		for stmt in SCHEMA_STATEMENTS {
			assert!(stmt.contains("IF NOT EXISTS"), "{stmt}");
		}
	}
}
