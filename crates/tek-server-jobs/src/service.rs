// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job worker service: owns the "job-execution" pool and applies per-type
//! timeout multipliers to the base task timeout.

use std::sync::Arc;
use std::time::Duration;

use futures::Future;
use tokio::sync::oneshot;
use tracing::info;

use tek_server_db::JobType;

use crate::error::Result;
use crate::pool::{PoolTask, WorkerPool, WorkerPoolManager};

pub const JOB_POOL_NAME: &str = "job-execution";

pub struct JobWorkerService<T> {
	manager: WorkerPoolManager<T>,
	pool: Arc<WorkerPool<T>>,
	base_timeout: Duration,
}

impl<T: Send + 'static> JobWorkerService<T> {
	pub fn new(max_workers: usize, base_timeout: Duration) -> Result<Self> {
		let manager = WorkerPoolManager::new();
		let pool = manager.create_pool(JOB_POOL_NAME, max_workers, base_timeout)?;

		info!(
			pool = JOB_POOL_NAME,
			max_workers,
			base_timeout_ms = base_timeout.as_millis() as u64,
			"job worker service ready"
		);

		Ok(Self {
			manager,
			pool,
			base_timeout,
		})
	}

	/// Per-type timeout: heavyweight full indexes get more headroom,
	/// incremental and docs jobs less.
	pub fn timeout_for(&self, job_type: JobType) -> Duration {
		let multiplier = match job_type {
			JobType::CodebaseFull => 3.0,
			JobType::CodebaseIncr => 0.5,
			JobType::DocsBucketFull | JobType::DocsBucketIncr => 0.3,
			JobType::ApiAnalysis | JobType::UserflowAnalysis => 2.0,
		};
		self.base_timeout.mul_f64(multiplier)
	}

	pub fn submit_job(
		&self,
		job_id: &str,
		job_type: JobType,
		execute: impl Future<Output = Result<T>> + Send + 'static,
	) -> Result<oneshot::Receiver<Result<T>>> {
		let task = PoolTask::new(
			format!("job-{job_id}"),
			Some(self.timeout_for(job_type)),
			execute,
		);
		self.pool.submit(task)
	}

	/// Drop a job that is still queued; running jobs are untouched.
	pub fn remove_queued(&self, job_id: &str) -> bool {
		self.pool.remove_queued(&format!("job-{job_id}"))
	}

	pub fn pool(&self) -> &Arc<WorkerPool<T>> {
		&self.pool
	}

	pub fn manager(&self) -> &WorkerPoolManager<T> {
		&self.manager
	}

	pub async fn shutdown(&self, grace: Duration) {
		self.pool.shutdown(grace).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_timeout_multipliers() {
		let service: JobWorkerService<u32> =
			JobWorkerService::new(4, Duration::from_secs(1800)).unwrap();

		assert_eq!(
			service.timeout_for(JobType::CodebaseFull),
			Duration::from_secs(5400)
		);
		assert_eq!(
			service.timeout_for(JobType::CodebaseIncr),
			Duration::from_secs(900)
		);
		assert_eq!(
			service.timeout_for(JobType::DocsBucketFull),
			Duration::from_secs(540)
		);
		assert_eq!(
			service.timeout_for(JobType::ApiAnalysis),
			Duration::from_secs(3600)
		);
	}

	#[tokio::test]
	async fn test_submit_job_runs_on_pool() {
		let service: JobWorkerService<u32> =
			JobWorkerService::new(2, Duration::from_secs(5)).unwrap();

		let rx = service
			.submit_job("j1", JobType::CodebaseFull, async { Ok(11) })
			.unwrap();
		assert_eq!(rx.await.unwrap().unwrap(), 11);
		assert!(service.manager().get(JOB_POOL_NAME).is_some());
	}

	#[tokio::test]
	async fn test_remove_queued_uses_job_prefix() {
		let service: JobWorkerService<u32> =
			JobWorkerService::new(1, Duration::from_secs(5)).unwrap();

		let blocker = service
			.submit_job("block", JobType::CodebaseFull, async {
				tokio::time::sleep(Duration::from_millis(150)).await;
				Ok(0)
			})
			.unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;

		let queued = service
			.submit_job("victim", JobType::CodebaseIncr, async { Ok(1) })
			.unwrap();

		assert!(service.remove_queued("victim"));
		assert!(queued.await.unwrap().is_err());
		blocker.await.unwrap().unwrap();
	}
}
