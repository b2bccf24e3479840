// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters of scheduler events
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
	registered: AtomicU64,
	rejected: AtomicU64,
	admitted: AtomicU64,
	retreats: AtomicU64,
	self_heals: AtomicU64,
	completed: AtomicU64,
	swept: AtomicU64,
	cancelled: AtomicU64,
}

impl SchedulerMetrics {
	pub fn new() -> Self {
		Self::default()
	}

	pub(crate) fn record_registered(&self) {
		self.registered.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rejected(&self) {
		self.rejected.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_admitted(&self, count: usize) {
		self.admitted.fetch_add(count as u64, Ordering::Relaxed);
	}

	pub(crate) fn record_retreat(&self) {
		self.retreats.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_self_heal(&self) {
		self.self_heals.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_completed(&self) {
		self.completed.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_swept(&self, count: usize) {
		self.swept.fetch_add(count as u64, Ordering::Relaxed);
	}

	pub(crate) fn record_cancelled(&self) {
		self.cancelled.fetch_add(1, Ordering::Relaxed);
	}

	pub fn snapshot(&self) -> MetricsSnapshot {
		MetricsSnapshot {
			registered: self.registered.load(Ordering::Relaxed),
			rejected: self.rejected.load(Ordering::Relaxed),
			admitted: self.admitted.load(Ordering::Relaxed),
			retreats: self.retreats.load(Ordering::Relaxed),
			self_heals: self.self_heals.load(Ordering::Relaxed),
			completed: self.completed.load(Ordering::Relaxed),
			swept: self.swept.load(Ordering::Relaxed),
			cancelled: self.cancelled.load(Ordering::Relaxed),
		}
	}
}

/// Point-in-time copy of [`SchedulerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
	/// Queries that got a registry record
	pub registered: u64,
	/// Registrations refused for capacity
	pub rejected: u64,
	/// Waiting → Available transitions
	pub admitted: u64,
	/// Lock passes that hit a contended table and backed off
	pub retreats: u64,
	/// Admission passes forced by a waiter that found no slot in use
	pub self_heals: u64,
	/// Records removed by normal completion or failure of the query
	pub completed: u64,
	/// Records removed by an abort sweep
	pub swept: u64,
	/// Waits abandoned through a cancellation
	pub cancelled: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_snapshot() {
		let metrics = SchedulerMetrics::new();
		metrics.record_registered();
		metrics.record_registered();
		metrics.record_admitted(2);
		metrics.record_retreat();
		metrics.record_swept(3);

		let snapshot = metrics.snapshot();
		assert_eq!(snapshot.registered, 2);
		assert_eq!(snapshot.admitted, 2);
		assert_eq!(snapshot.retreats, 1);
		assert_eq!(snapshot.swept, 3);
		assert_eq!(snapshot.completed, 0);
	}
}
