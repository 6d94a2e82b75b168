// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Node id conventions.
//!
//! Symbol ids are content-addressed from the declaration site so repeated
//! indexing of the same source yields the same node.

use sha2::{Digest, Sha256};

/// Stable symbol node id: first 16 hex chars of
/// SHA-256 over `path:type:name:line`.
pub fn symbol_id(path: &str, kind: &str, name: &str, line: u32) -> String {
	let digest = Sha256::digest(format!("{path}:{kind}:{name}:{line}").as_bytes());
	hex::encode(digest)[..16].to_string()
}

/// Full SHA-256 hex digest, used as the file content checksum.
pub fn checksum_hex(content: &[u8]) -> String {
	hex::encode(Sha256::digest(content))
}

pub fn project_node_id(project_id: &str) -> String {
	format!("project:{project_id}")
}

pub fn codebase_node_id(codebase_id: &str) -> String {
	format!("codebase:{codebase_id}")
}

pub fn file_node_id(checksum: &str, path: &str) -> String {
	format!("file:{checksum}:{path}")
}

pub fn class_node_id(fully_qualified_name: &str) -> String {
	format!("class:{fully_qualified_name}")
}

pub fn method_node_id(signature: &str) -> String {
	format!("method:{signature}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_symbol_id_is_16_hex_chars() {
		let id = symbol_id("src/A.java", "class", "A", 1);
		assert_eq!(id.len(), 16);
		assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
	}

	#[test]
	fn test_symbol_id_deterministic() {
		assert_eq!(
			symbol_id("src/A.java", "class", "A", 1),
			symbol_id("src/A.java", "class", "A", 1)
		);
	}

	#[test]
	fn test_symbol_id_sensitive_to_every_component() {
		let base = symbol_id("src/A.java", "class", "A", 1);
		assert_ne!(base, symbol_id("src/B.java", "class", "A", 1));
		assert_ne!(base, symbol_id("src/A.java", "method", "A", 1));
		assert_ne!(base, symbol_id("src/A.java", "class", "B", 1));
		assert_ne!(base, symbol_id("src/A.java", "class", "A", 2));
	}

	#[test]
	fn test_checksum_hex() {
		let sum = checksum_hex(b"hello");
		assert_eq!(sum.len(), 64);
		assert_eq!(sum, checksum_hex(b"hello"));
		assert_ne!(sum, checksum_hex(b"world"));
	}

	#[test]
	fn test_node_id_prefixes() {
		assert_eq!(project_node_id("p1"), "project:p1");
		assert_eq!(codebase_node_id("c1"), "codebase:c1");
		assert_eq!(file_node_id("abcd", "src/A.java"), "file:abcd:src/A.java");
		assert_eq!(class_node_id("com.acme.A"), "class:com.acme.A");
		assert_eq!(method_node_id("com.acme.A#m()"), "method:com.acme.A#m()");
	}
}
