// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded worker pool with FIFO queueing.
//!
//! At most `max_workers` tasks execute concurrently; the rest wait in an
//! unbounded FIFO queue. Each task runs under a timeout; on expiry the
//! task future is dropped (cancelling the work at its next suspension
//! point) and the submitter sees a timeout error.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::Future;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, info, warn};

use crate::error::{JobError, Result};
use crate::semaphore::Semaphore;

type TaskFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

pub struct PoolTask<T> {
	pub id: String,
	pub timeout: Option<Duration>,
	future: TaskFuture<T>,
}

impl<T> PoolTask<T> {
	pub fn new(
		id: impl Into<String>,
		timeout: Option<Duration>,
		future: impl Future<Output = Result<T>> + Send + 'static,
	) -> Self {
		Self {
			id: id.into(),
			timeout,
			future: Box::pin(future),
		}
	}
}

struct QueuedTask<T> {
	task: PoolTask<T>,
	result_tx: oneshot::Sender<Result<T>>,
}

struct WorkerRecord {
	id: usize,
	busy: bool,
	last_used: Instant,
	current_task: Option<String>,
}

pub struct WorkerPool<T> {
	name: String,
	max_workers: usize,
	default_timeout: Duration,
	semaphore: Semaphore,
	workers: Mutex<Vec<WorkerRecord>>,
	queue: Mutex<VecDeque<QueuedTask<T>>>,
	shutting_down: AtomicBool,
	in_flight: AtomicUsize,
	drained: Notify,
}

impl<T> std::fmt::Debug for WorkerPool<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkerPool")
			.field("name", &self.name)
			.field("max_workers", &self.max_workers)
			.field("default_timeout", &self.default_timeout)
			.field("shutting_down", &self.shutting_down.load(Ordering::SeqCst))
			.field("in_flight", &self.in_flight.load(Ordering::SeqCst))
			.finish_non_exhaustive()
	}
}

impl<T: Send + 'static> WorkerPool<T> {
	pub fn new(name: impl Into<String>, max_workers: usize, default_timeout: Duration) -> Arc<Self> {
		let max_workers = max_workers.max(1);
		let workers = (0..max_workers)
			.map(|id| WorkerRecord {
				id,
				busy: false,
				last_used: Instant::now(),
				current_task: None,
			})
			.collect();

		Arc::new(Self {
			name: name.into(),
			max_workers,
			default_timeout,
			semaphore: Semaphore::new(max_workers),
			workers: Mutex::new(workers),
			queue: Mutex::new(VecDeque::new()),
			shutting_down: AtomicBool::new(false),
			in_flight: AtomicUsize::new(0),
			drained: Notify::new(),
		})
	}

	/// Enqueue a task. The returned receiver resolves with the task's
	/// result, a timeout error, or a cancellation.
	pub fn submit(self: &Arc<Self>, task: PoolTask<T>) -> Result<oneshot::Receiver<Result<T>>> {
		if self.shutting_down.load(Ordering::SeqCst) {
			return Err(JobError::State(format!(
				"worker pool {} is shutting down",
				self.name
			)));
		}

		let (result_tx, result_rx) = oneshot::channel();
		debug!(pool = %self.name, task_id = %task.id, "task queued");
		self.queue
			.lock()
			.expect("pool queue lock poisoned")
			.push_back(QueuedTask { task, result_tx });

		let pool = Arc::clone(self);
		tokio::spawn(async move { pool.drain_queue().await });

		Ok(result_rx)
	}

	/// Remove a queued task before a worker picks it up. The submitter's
	/// receiver resolves with `Cancelled`. Running tasks are unaffected.
	pub fn remove_queued(&self, task_id: &str) -> bool {
		let mut queue = self.queue.lock().expect("pool queue lock poisoned");
		let Some(position) = queue.iter().position(|q| q.task.id == task_id) else {
			return false;
		};

		let Some(queued) = queue.remove(position) else {
			return false;
		};
		drop(queue);

		let _ = queued.result_tx.send(Err(JobError::Cancelled));
		debug!(pool = %self.name, task_id, "queued task removed");
		true
	}

	/// Stop accepting work, wait up to `grace` for running tasks, then
	/// fail whatever is still queued.
	pub async fn shutdown(&self, grace: Duration) {
		self.shutting_down.store(true, Ordering::SeqCst);
		info!(pool = %self.name, "worker pool shutting down");

		let deadline = Instant::now() + grace;
		while self.in_flight.load(Ordering::SeqCst) > 0 {
			let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
				warn!(pool = %self.name, "shutdown grace expired with tasks in flight");
				break;
			};
			let _ = tokio::time::timeout(remaining, self.drained.notified()).await;
		}

		let leftovers: Vec<QueuedTask<T>> = self
			.queue
			.lock()
			.expect("pool queue lock poisoned")
			.drain(..)
			.collect();
		for queued in leftovers {
			let _ = queued
				.result_tx
				.send(Err(JobError::State("worker pool shut down".into())));
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn max_workers(&self) -> usize {
		self.max_workers
	}

	pub fn default_timeout(&self) -> Duration {
		self.default_timeout
	}

	pub fn queued(&self) -> usize {
		self.queue.lock().expect("pool queue lock poisoned").len()
	}

	pub fn active(&self) -> usize {
		self.in_flight.load(Ordering::SeqCst)
	}

	/// Process queued tasks until the queue is empty. One drain loop runs
	/// per submission; the semaphore bounds actual concurrency.
	async fn drain_queue(self: Arc<Self>) {
		loop {
			if self.shutting_down.load(Ordering::SeqCst) {
				return;
			}
			if self.queue.lock().expect("pool queue lock poisoned").is_empty() {
				return;
			}

			self.semaphore.acquire().await;

			let Some(queued) = self
				.queue
				.lock()
				.expect("pool queue lock poisoned")
				.pop_front()
			else {
				// Another drain loop got there first.
				self.semaphore.release();
				continue;
			};

			let Some(worker_id) = self.claim_worker(&queued.task.id) else {
				// A permit without an idle worker should not happen; put the
				// task back and retry.
				warn!(pool = %self.name, "no idle worker despite free permit");
				self.queue
					.lock()
					.expect("pool queue lock poisoned")
					.push_front(queued);
				self.semaphore.release();
				continue;
			};

			self.in_flight.fetch_add(1, Ordering::SeqCst);
			let QueuedTask { task, result_tx } = queued;
			let limit = task.timeout.unwrap_or(self.default_timeout);

			debug!(pool = %self.name, task_id = %task.id, worker_id, "task started");
			let result = match tokio::time::timeout(limit, task.future).await {
				Ok(result) => result,
				Err(_) => {
					warn!(pool = %self.name, task_id = %task.id, timeout_ms = limit.as_millis() as u64, "task timed out");
					Err(JobError::Timeout {
						what: format!("task {}", task.id),
						elapsed_ms: limit.as_millis() as u64,
					})
				}
			};

			self.release_worker(worker_id);
			self.semaphore.release();
			self.in_flight.fetch_sub(1, Ordering::SeqCst);
			self.drained.notify_waiters();

			let _ = result_tx.send(result);
		}
	}

	fn claim_worker(&self, task_id: &str) -> Option<usize> {
		let mut workers = self.workers.lock().expect("pool workers lock poisoned");
		let worker = workers.iter_mut().find(|w| !w.busy)?;
		worker.busy = true;
		worker.current_task = Some(task_id.to_string());
		Some(worker.id)
	}

	fn release_worker(&self, worker_id: usize) {
		let mut workers = self.workers.lock().expect("pool workers lock poisoned");
		if let Some(worker) = workers.iter_mut().find(|w| w.id == worker_id) {
			worker.busy = false;
			worker.current_task = None;
			worker.last_used = Instant::now();
		}
	}
}

/// Named pools; duplicate names are refused.
pub struct WorkerPoolManager<T> {
	pools: Mutex<HashMap<String, Arc<WorkerPool<T>>>>,
}

impl<T: Send + 'static> WorkerPoolManager<T> {
	pub fn new() -> Self {
		Self {
			pools: Mutex::new(HashMap::new()),
		}
	}

	pub fn create_pool(
		&self,
		name: &str,
		max_workers: usize,
		default_timeout: Duration,
	) -> Result<Arc<WorkerPool<T>>> {
		let mut pools = self.pools.lock().expect("pool manager lock poisoned");
		if pools.contains_key(name) {
			return Err(JobError::State(format!("worker pool {name} already exists")));
		}

		let pool = WorkerPool::new(name, max_workers, default_timeout);
		pools.insert(name.to_string(), Arc::clone(&pool));
		Ok(pool)
	}

	pub fn get(&self, name: &str) -> Option<Arc<WorkerPool<T>>> {
		self.pools
			.lock()
			.expect("pool manager lock poisoned")
			.get(name)
			.cloned()
	}
}

impl<T: Send + 'static> Default for WorkerPoolManager<T> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicU32;

	fn task(id: &str, work: impl Future<Output = Result<u32>> + Send + 'static) -> PoolTask<u32> {
		PoolTask::new(id, None, work)
	}

	#[tokio::test]
	async fn test_submit_returns_result() {
		let pool = WorkerPool::new("test", 2, Duration::from_secs(5));
		let rx = pool.submit(task("t1", async { Ok(7) })).unwrap();
		assert_eq!(rx.await.unwrap().unwrap(), 7);
	}

	#[tokio::test]
	async fn test_concurrency_never_exceeds_max_workers() {
		let pool = WorkerPool::new("test", 2, Duration::from_secs(5));
		let active = Arc::new(AtomicU32::new(0));
		let peak = Arc::new(AtomicU32::new(0));

		let mut receivers = Vec::new();
		for i in 0..6 {
			let active = Arc::clone(&active);
			let peak = Arc::clone(&peak);
			let rx = pool
				.submit(task(&format!("t{i}"), async move {
					let now = active.fetch_add(1, Ordering::SeqCst) + 1;
					peak.fetch_max(now, Ordering::SeqCst);
					tokio::time::sleep(Duration::from_millis(50)).await;
					active.fetch_sub(1, Ordering::SeqCst);
					Ok(i)
				}))
				.unwrap();
			receivers.push(rx);
		}

		for rx in receivers {
			rx.await.unwrap().unwrap();
		}
		assert!(peak.load(Ordering::SeqCst) <= 2, "peak: {}", peak.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn test_fifo_start_order() {
		let pool = WorkerPool::new("test", 1, Duration::from_secs(5));
		let order = Arc::new(Mutex::new(Vec::new()));

		let mut receivers = Vec::new();
		for i in 0..4u32 {
			let order = Arc::clone(&order);
			let rx = pool
				.submit(task(&format!("t{i}"), async move {
					order.lock().unwrap().push(i);
					Ok(i)
				}))
				.unwrap();
			receivers.push(rx);
			// Keep submission order unambiguous.
			tokio::time::sleep(Duration::from_millis(5)).await;
		}

		for rx in receivers {
			rx.await.unwrap().unwrap();
		}
		assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
	}

	#[tokio::test]
	async fn test_saturated_pool_is_not_starved() {
		// Scenario: two workers, three tasks; the third starts as soon as
		// one of the first two finishes.
		let pool = WorkerPool::new("test", 2, Duration::from_secs(5));

		let mut receivers = Vec::new();
		for i in 0..3u32 {
			let rx = pool
				.submit(task(&format!("j{i}"), async move {
					tokio::time::sleep(Duration::from_millis(100)).await;
					Ok(i)
				}))
				.unwrap();
			receivers.push(rx);
		}

		let started = Instant::now();
		for rx in receivers {
			rx.await.unwrap().unwrap();
		}
		let elapsed = started.elapsed();
		// Two batches of 100ms, not three.
		assert!(elapsed >= Duration::from_millis(200));
		assert!(elapsed < Duration::from_millis(400), "elapsed: {elapsed:?}");
	}

	#[tokio::test]
	async fn test_timeout_surfaces_timeout_error() {
		let pool = WorkerPool::new("test", 1, Duration::from_secs(5));
		let rx = pool
			.submit(PoolTask::new(
				"slow",
				Some(Duration::from_millis(50)),
				async {
					tokio::time::sleep(Duration::from_secs(30)).await;
					Ok(1)
				},
			))
			.unwrap();

		let err = rx.await.unwrap().unwrap_err();
		assert!(err.is_timeout());
	}

	#[tokio::test]
	async fn test_remove_queued_cancels_waiter() {
		let pool = WorkerPool::new("test", 1, Duration::from_secs(5));

		// Occupy the single worker.
		let blocker = pool
			.submit(PoolTask::new("blocker", None, async {
				tokio::time::sleep(Duration::from_millis(200)).await;
				Ok(0)
			}))
			.unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;

		let queued = pool.submit(task("victim", async { Ok(1) })).unwrap();
		assert!(pool.remove_queued("victim"));
		assert!(!pool.remove_queued("victim"));

		assert!(matches!(queued.await.unwrap(), Err(JobError::Cancelled)));
		blocker.await.unwrap().unwrap();
	}

	#[tokio::test]
	async fn test_submit_after_shutdown_rejected() {
		let pool = WorkerPool::new("test", 1, Duration::from_secs(5));
		pool.shutdown(Duration::from_millis(50)).await;

		let err = pool.submit(task("late", async { Ok(1) })).unwrap_err();
		assert!(matches!(err, JobError::State(_)));
	}

	#[tokio::test]
	async fn test_shutdown_fails_queued_tasks() {
		let pool = WorkerPool::new("test", 1, Duration::from_secs(5));

		let blocker = pool
			.submit(PoolTask::new("blocker", None, async {
				tokio::time::sleep(Duration::from_millis(100)).await;
				Ok(0)
			}))
			.unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;
		let queued = pool.submit(task("queued", async { Ok(1) })).unwrap();

		pool.shutdown(Duration::from_millis(500)).await;

		blocker.await.unwrap().unwrap();
		assert!(matches!(queued.await.unwrap(), Err(JobError::State(_))));
	}

	#[tokio::test]
	async fn test_manager_refuses_duplicate_names() {
		let manager: WorkerPoolManager<u32> = WorkerPoolManager::new();
		manager
			.create_pool("job-execution", 4, Duration::from_secs(5))
			.unwrap();

		let err = manager
			.create_pool("job-execution", 4, Duration::from_secs(5))
			.unwrap_err();
		assert!(matches!(err, JobError::State(_)));
		assert!(manager.get("job-execution").is_some());
		assert!(manager.get("other").is_none());
	}
}
