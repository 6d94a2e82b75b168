// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The task contract every pipeline stage implements.

use async_trait::async_trait;

use crate::context::{JobContext, TaskData, TaskKind};
use crate::error::{JobError, Result};

/// Outcome of a task execution. `success: false` is a recoverable,
/// recorded failure; unexpected faults are returned as errors instead.
#[derive(Debug)]
pub struct TaskResult {
	pub success: bool,
	pub data: Option<TaskData>,
	pub metrics: Option<serde_json::Value>,
	pub error: Option<String>,
}

impl TaskResult {
	pub fn ok(data: TaskData) -> Self {
		Self {
			success: true,
			data: Some(data),
			metrics: None,
			error: None,
		}
	}

	pub fn ok_empty() -> Self {
		Self {
			success: true,
			data: None,
			metrics: None,
			error: None,
		}
	}

	pub fn failed(error: impl Into<String>) -> Self {
		Self {
			success: false,
			data: None,
			metrics: None,
			error: Some(error.into()),
		}
	}

	pub fn with_metrics(mut self, metrics: serde_json::Value) -> Self {
		self.metrics = Some(metrics);
		self
	}
}

#[async_trait]
pub trait Task: Send + Sync {
	fn kind(&self) -> TaskKind;

	fn description(&self) -> &str;

	/// Tasks whose data slots must exist before this one runs.
	fn required_tasks(&self) -> &[TaskKind] {
		&[]
	}

	/// Tasks that may precede this one but are not mandatory.
	fn optional_tasks(&self) -> &[TaskKind] {
		&[]
	}

	async fn should_execute(&self, _ctx: &JobContext) -> bool {
		true
	}

	/// Precondition check; the default verifies every required task has
	/// produced its data slot.
	async fn validate(&self, ctx: &JobContext) -> Result<()> {
		for required in self.required_tasks() {
			if !ctx.data.contains_key(required) {
				return Err(JobError::Validation(format!(
					"task {} requires output of {} which is missing",
					self.kind(),
					required
				)));
			}
		}
		Ok(())
	}

	async fn execute(&self, ctx: &mut JobContext) -> Result<TaskResult>;

	/// Best-effort; failures are logged and never fail the job.
	async fn cleanup(&self, _ctx: &mut JobContext) -> Result<()> {
		Ok(())
	}
}
