// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Languages with a parser container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
	Java,
	TypeScript,
	Python,
	Go,
	Rust,
}

impl Language {
	pub fn as_str(&self) -> &'static str {
		match self {
			Language::Java => "java",
			Language::TypeScript => "typescript",
			Language::Python => "python",
			Language::Go => "go",
			Language::Rust => "rust",
		}
	}

	/// Detect from a file extension. JavaScript routes to the TypeScript
	/// parser.
	pub fn from_path(path: &str) -> Option<Self> {
		let ext = Path::new(path).extension()?.to_str()?;
		match ext {
			"java" => Some(Language::Java),
			"ts" | "tsx" | "js" | "jsx" => Some(Language::TypeScript),
			"py" => Some(Language::Python),
			"go" => Some(Language::Go),
			"rs" => Some(Language::Rust),
			_ => None,
		}
	}

	/// Env var the parser container reads its runtime options from.
	pub fn options_env_var(&self) -> &'static str {
		match self {
			Language::Java => "JAVA_OPTS",
			Language::TypeScript => "NODE_OPTIONS",
			_ => "PARSER_OPTS",
		}
	}
}

impl std::str::FromStr for Language {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"java" => Ok(Language::Java),
			"typescript" => Ok(Language::TypeScript),
			"python" => Ok(Language::Python),
			"go" => Ok(Language::Go),
			"rust" => Ok(Language::Rust),
			_ => Err(format!("unknown language: {s}")),
		}
	}
}

impl std::fmt::Display for Language {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_from_path_known_extensions() {
		assert_eq!(Language::from_path("src/A.java"), Some(Language::Java));
		assert_eq!(Language::from_path("web/app.tsx"), Some(Language::TypeScript));
		assert_eq!(Language::from_path("lib/util.js"), Some(Language::TypeScript));
		assert_eq!(Language::from_path("tool.py"), Some(Language::Python));
		assert_eq!(Language::from_path("cmd/main.go"), Some(Language::Go));
		assert_eq!(Language::from_path("src/lib.rs"), Some(Language::Rust));
	}

	#[test]
	fn test_from_path_unknown() {
		assert_eq!(Language::from_path("README.md"), None);
		assert_eq!(Language::from_path("Makefile"), None);
		assert_eq!(Language::from_path("noext"), None);
	}
}
