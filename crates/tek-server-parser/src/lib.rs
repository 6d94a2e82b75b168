// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Containerized source parsers and their output normalization.
//!
//! Language parsers run as short-lived containers with the source tree
//! mounted read-only; their JSON output is copied out of the container,
//! parsed, and normalized into a uniform file/symbol/relationship schema
//! that the graph writer consumes.

pub mod driver;
pub mod error;
pub mod language;
pub mod normalizer;
pub mod raw;
pub mod types;

pub use driver::{DockerParserDriver, ParserDriver, ParserOutcome, ParserRequest};
pub use error::{ParserError, Result};
pub use language::Language;
pub use normalizer::normalize;
pub use raw::{RawEntity, RawFile, RawParserOutput, RawRelationship};
pub use types::{
	NormalizedParserOutput, ParseMetadata, Parameter, SourceFile, Symbol, SymbolKind,
	SymbolRelationship, Visibility,
};
