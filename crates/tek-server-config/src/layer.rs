// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The merged-sources configuration layer.

use crate::sections::{
	DatabaseConfigLayer, GitSyncConfigLayer, GraphConfigLayer, HttpConfigLayer, JobsConfigLayer,
	LoggingConfigLayer, ParsingConfigLayer, StorageConfigLayer,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerConfigLayer {
	pub http: Option<HttpConfigLayer>,
	pub database: Option<DatabaseConfigLayer>,
	pub storage: Option<StorageConfigLayer>,
	pub jobs: Option<JobsConfigLayer>,
	pub git_sync: Option<GitSyncConfigLayer>,
	pub parsing: Option<ParsingConfigLayer>,
	pub graph: Option<GraphConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_section(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.storage, other.storage, StorageConfigLayer::merge);
		merge_section(&mut self.jobs, other.jobs, JobsConfigLayer::merge);
		merge_section(&mut self.git_sync, other.git_sync, GitSyncConfigLayer::merge);
		merge_section(&mut self.parsing, other.parsing, ParsingConfigLayer::merge);
		merge_section(&mut self.graph, other.graph, GraphConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_section<T>(target: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	match (target.as_mut(), other) {
		(Some(existing), Some(incoming)) => merge(existing, incoming),
		(None, Some(incoming)) => *target = Some(incoming),
		_ => {}
	}
}
