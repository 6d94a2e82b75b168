// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Writer for the code property graph.
//!
//! All writes are idempotent MERGEs batched into independent transactions;
//! re-running a write over the same normalized input converges to the same
//! graph state. The transport is a session seam ([`GraphSession`]) with an
//! HTTP transactional-Cypher implementation behind it.

pub mod error;
pub mod ids;
pub mod schema;
pub mod session;
pub mod types;
pub mod writer;

pub use error::{GraphError, Result};
pub use ids::{checksum_hex, symbol_id};
pub use schema::relationship_endpoints;
pub use session::{GraphSession, HttpGraphSession};
pub use types::{CypherStatement, GraphConfig, WriteCounters};
pub use writer::GraphWriter;
