// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread,
	time::Duration,
};

/// Shared flag a host sets to abandon a waiting query.
///
/// Every [`Session`](crate::session::Session) owns one, reachable through
/// `Session::cancellation`; clones observe the same flag, so the host can keep
/// a clone and cancel from another thread. A session clears the flag each time
/// it starts a scheduled query, so a cancel only ever affects the wait in
/// progress.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
	cancelled: Arc<AtomicBool>,
}

impl Cancellation {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Release);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Acquire)
	}

	/// Clear the flag so the handle can be reused for the next query.
	pub(crate) fn reset(&self) {
		self.cancelled.store(false, Ordering::Release);
	}
}

/// Fixed-interval sleep between two polls of a waiting query.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Backoff {
	interval: Duration,
	polls: usize,
}

impl Backoff {
	pub(crate) fn new(interval: Duration) -> Self {
		Self {
			interval,
			polls: 0,
		}
	}

	pub(crate) fn snooze(&mut self) {
		self.polls += 1;
		if self.interval.is_zero() {
			thread::yield_now();
		} else {
			thread::sleep(self.interval);
		}
	}

	pub(crate) fn polls(&self) -> usize {
		self.polls
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cancellation_is_shared() {
		let host = Cancellation::new();
		let session = host.clone();
		assert!(!session.is_cancelled());

		host.cancel();
		assert!(session.is_cancelled());

		session.reset();
		assert!(!host.is_cancelled());
	}

	#[test]
	fn test_backoff_counts_polls() {
		let mut backoff = Backoff::new(Duration::ZERO);
		backoff.snooze();
		backoff.snooze();
		assert_eq!(backoff.polls(), 2);
	}
}
