// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job orchestration and execution engine.
//!
//! Turns an index request into a durable, observable pipeline of tasks
//! (git synchronization, parser invocation, graph mutation, cleanup)
//! scheduled on a bounded FIFO worker pool, persisted for monitoring, and
//! cancellable while queued or running.

pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod pool;
pub mod semaphore;
pub mod service;
pub mod task;
pub mod tasks;

pub use config::TaskConfigResolver;
pub use context::{
	CancellationToken, CleanupData, CodeParsingData, GitSyncData, GraphUpdateData, JobContext,
	TaskData, TaskKind,
};
pub use error::{JobError, Result};
pub use orchestrator::{CreateJobRequest, JobOrchestrator, JobSummary};
pub use pool::{PoolTask, WorkerPool, WorkerPoolManager};
pub use semaphore::Semaphore;
pub use service::JobWorkerService;
pub use task::{Task, TaskResult};
