// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! FIFO async semaphore.
//!
//! Waiters are woken strictly in arrival order; `release` hands the permit
//! to the oldest waiter directly instead of returning it to the pool, so a
//! late arrival can never overtake the queue.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::oneshot;

struct SemaphoreState {
	permits: usize,
	waiters: VecDeque<oneshot::Sender<()>>,
}

pub struct Semaphore {
	state: Mutex<SemaphoreState>,
}

impl Semaphore {
	pub fn new(permits: usize) -> Self {
		Self {
			state: Mutex::new(SemaphoreState {
				permits,
				waiters: VecDeque::new(),
			}),
		}
	}

	/// Take a permit, suspending until one is free. Pair every call with
	/// exactly one `release`.
	pub async fn acquire(&self) {
		let receiver = {
			let mut state = self.state.lock().expect("semaphore lock poisoned");
			if state.permits > 0 {
				state.permits -= 1;
				return;
			}
			let (tx, rx) = oneshot::channel();
			state.waiters.push_back(tx);
			rx
		};

		// The sender is only dropped if the semaphore itself is dropped;
		// either way the wait is over.
		let _ = receiver.await;
	}

	/// Return a permit, handing it to the oldest live waiter if any.
	pub fn release(&self) {
		loop {
			let waiter = {
				let mut state = self.state.lock().expect("semaphore lock poisoned");
				match state.waiters.pop_front() {
					Some(waiter) => waiter,
					None => {
						state.permits += 1;
						return;
					}
				}
			};

			// A waiter whose future was dropped takes no permit; try the next.
			if waiter.send(()).is_ok() {
				return;
			}
		}
	}

	pub fn available_permits(&self) -> usize {
		self.state.lock().expect("semaphore lock poisoned").permits
	}

	pub fn waiting(&self) -> usize {
		self.state
			.lock()
			.expect("semaphore lock poisoned")
			.waiters
			.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::time::Duration;

	#[tokio::test]
	async fn test_acquire_release_roundtrip() {
		let sem = Semaphore::new(2);
		sem.acquire().await;
		sem.acquire().await;
		assert_eq!(sem.available_permits(), 0);

		sem.release();
		assert_eq!(sem.available_permits(), 1);
		sem.release();
		assert_eq!(sem.available_permits(), 2);
	}

	#[tokio::test]
	async fn test_waiters_woken_in_fifo_order() {
		let sem = Arc::new(Semaphore::new(1));
		sem.acquire().await;

		let order = Arc::new(Mutex::new(Vec::new()));
		let mut handles = Vec::new();

		for i in 0..5 {
			let sem = Arc::clone(&sem);
			let order = Arc::clone(&order);
			handles.push(tokio::spawn(async move {
				sem.acquire().await;
				order.lock().unwrap().push(i);
				sem.release();
			}));
			// Deterministic arrival order.
			tokio::time::sleep(Duration::from_millis(10)).await;
		}

		assert_eq!(sem.waiting(), 5);
		sem.release();

		for handle in handles {
			handle.await.unwrap();
		}
		assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
	}

	#[tokio::test]
	async fn test_dropped_waiter_does_not_consume_permit() {
		let sem = Arc::new(Semaphore::new(1));
		sem.acquire().await;

		let abandoned = {
			let sem = Arc::clone(&sem);
			tokio::spawn(async move { sem.acquire().await })
		};
		tokio::time::sleep(Duration::from_millis(10)).await;
		abandoned.abort();
		let _ = abandoned.await;

		let survivor = {
			let sem = Arc::clone(&sem);
			tokio::spawn(async move {
				sem.acquire().await;
				true
			})
		};
		tokio::time::sleep(Duration::from_millis(10)).await;

		sem.release();
		assert!(survivor.await.unwrap());
	}

	#[tokio::test]
	async fn test_release_without_waiters_restores_permit() {
		let sem = Semaphore::new(0);
		sem.release();
		assert_eq!(sem.available_permits(), 1);
		sem.acquire().await;
		assert_eq!(sem.available_permits(), 0);
	}
}
