// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod database;
pub mod git_sync;
pub mod graph;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod parsing;
pub mod storage;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use git_sync::{GitSyncConfig, GitSyncConfigLayer};
pub use graph::{GraphConfig, GraphConfigLayer, IndexingMode};
pub use http::{HttpConfig, HttpConfigLayer};
pub use jobs::{JobsConfig, JobsConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use parsing::{LanguageParserConfig, ParsingConfig, ParsingConfigLayer};
pub use storage::{StorageConfig, StorageConfigLayer};
