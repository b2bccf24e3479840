// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The scheduler service.
//!
//! One instance per host process. It owns the mutex guarding the registry and
//! the slot count, and drives the admission pass and the lock protocol on
//! behalf of sessions.

use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use crate::{
	admission::reschedule,
	config::{SchedulerBuilder, SchedulerConfig},
	dependency::DependencyIndex,
	error::{Error, Result},
	id::{ImmvId, QueryKey, SessionId, TableId, TransactionId},
	lock::{
		LockManager,
		pass::{lock_all, release},
	},
	metrics::{MetricsSnapshot, SchedulerMetrics},
	registry::{QueryRecord, QueryRegistry, QueryStatus},
	session::{Session, SessionKind},
	state::ScheduleState,
	wait::{Backoff, Cancellation},
};

pub struct Scheduler {
	config: SchedulerConfig,
	state: Mutex<ScheduleState>,
	index: Arc<dyn DependencyIndex>,
	locks: Arc<dyn LockManager>,
	metrics: SchedulerMetrics,
	next_session: AtomicU64,
	shutdown: AtomicBool,
}

impl Scheduler {
	pub fn builder() -> SchedulerBuilder {
		SchedulerBuilder::new()
	}

	pub(crate) fn new(config: SchedulerConfig, index: Arc<dyn DependencyIndex>, locks: Arc<dyn LockManager>) -> Self {
		info!(
			max_concurrent_queries = config.max_concurrent_queries,
			max_affected_tables = config.max_affected_tables,
			max_queries = config.max_queries,
			"scheduler started"
		);

		let registry = QueryRegistry::new(config.max_queries, config.max_affected_tables);
		Self {
			config,
			state: Mutex::new(ScheduleState::new(registry)),
			index,
			locks,
			metrics: SchedulerMetrics::new(),
			next_session: AtomicU64::new(1),
			shutdown: AtomicBool::new(false),
		}
	}

	pub fn metrics(&self) -> MetricsSnapshot {
		self.metrics.snapshot()
	}

	pub fn dependency_index(&self) -> &dyn DependencyIndex {
		self.index.as_ref()
	}

	pub fn lock_manager(&self) -> &dyn LockManager {
		self.locks.as_ref()
	}

	/// Open the bracket for a new host session.
	pub fn open_session(self: &Arc<Self>) -> Session {
		Session::new(Arc::clone(self), self.next_session_id(), SessionKind::Backend)
	}

	/// Open a session for a parallel worker. Workers run on behalf of a leader
	/// that already went through admission, so they never enter it themselves.
	pub fn open_parallel_worker(self: &Arc<Self>) -> Session {
		Session::new(Arc::clone(self), self.next_session_id(), SessionKind::ParallelWorker)
	}

	fn next_session_id(&self) -> SessionId {
		SessionId(self.next_session.fetch_add(1, Ordering::Relaxed))
	}

	/// Add a `Waiting` record for `key` and run an admission pass.
	///
	/// The returned record reflects the state after that pass, so it may
	/// already be `Available`.
	#[instrument(name = "scheduler::register", level = "debug", skip(self, affected))]
	pub fn register(&self, key: QueryKey, affected: &[ImmvId], transaction: TransactionId) -> Result<QueryRecord> {
		if self.is_shutdown() {
			return Err(Error::Shutdown);
		}

		let mut state = self.state.lock();
		let record = match state.registry.register(key, affected, transaction) {
			Ok(record) => record.clone(),
			Err(err) => {
				self.metrics.record_rejected();
				debug!(query = %key, error = %err, "registration refused");
				return Err(err);
			}
		};
		self.metrics.record_registered();

		self.reschedule_locked(&mut state);
		self.check_invariant(&state);

		Ok(state.registry.get(&key).cloned().unwrap_or(record))
	}

	/// Remove the record for `key`, give back its slot and let the next
	/// waiter in. A key that is not registered is ignored.
	#[instrument(name = "scheduler::deregister", level = "debug", skip(self))]
	pub fn deregister(&self, key: QueryKey) -> Option<QueryRecord> {
		let record = self.remove(key)?;
		self.metrics.record_completed();
		Some(record)
	}

	/// Run an admission pass. Returns how many records it admitted.
	pub fn reschedule(&self) -> usize {
		let mut state = self.state.lock();
		self.reschedule_locked(&mut state)
	}

	/// Records in arrival order.
	pub fn snapshot(&self) -> Vec<QueryRecord> {
		self.state.lock().registry.snapshot()
	}

	pub fn status(&self, key: QueryKey) -> Option<QueryStatus> {
		self.state.lock().registry.status(&key)
	}

	pub fn running_count(&self) -> usize {
		self.state.lock().running
	}

	/// Poll until `key` is admitted.
	///
	/// Whenever no record holds a slot but `key` is still not admitted, an
	/// admission pass is forced: a waiter must never sleep on an idle
	/// scheduler that nobody else is going to wake.
	///
	/// Returns the number of polls it took.
	#[instrument(name = "scheduler::wait_available", level = "trace", skip(self, cancellation))]
	pub fn wait_available(&self, key: QueryKey, cancellation: &Cancellation) -> Result<usize> {
		let mut backoff = Backoff::new(self.config.poll_interval);

		loop {
			{
				let mut state = self.state.lock();
				let Some(mut status) = state.registry.status(&key) else {
					return Err(Error::Aborted {
						key,
					});
				};

				if state.running == 0 && status != QueryStatus::Available {
					debug!(query = %key, %status, "no slot in use, forcing an admission pass");
					self.metrics.record_self_heal();
					self.reschedule_locked(&mut state);
					status = state.registry.status(&key).unwrap_or(status);
				}

				if status.holds_slot() {
					trace!(query = %key, polls = backoff.polls(), "admitted");
					return Ok(backoff.polls());
				}
			}

			if self.is_shutdown() {
				self.remove(key);
				return Err(Error::Shutdown);
			}

			if cancellation.is_cancelled() {
				self.remove(key);
				self.metrics.record_cancelled();
				debug!(query = %key, "cancelled while waiting");
				return Err(Error::Cancelled {
					key,
				});
			}

			backoff.snooze();
		}
	}

	/// Mark an admitted `key` as having retreated from its lock pass: its
	/// slot is given back and the next waiter is admitted.
	#[instrument(name = "scheduler::give_up", level = "debug", skip(self))]
	pub fn give_up(&self, key: QueryKey) {
		let mut state = self.state.lock();
		let Some(record) = state.registry.get_mut(&key) else {
			return;
		};

		let held_slot = record.status.holds_slot();
		record.status = QueryStatus::GaveUp;
		if held_slot {
			state.running = state.running.saturating_sub(1);
		}

		self.metrics.record_retreat();
		self.reschedule_locked(&mut state);
		self.check_invariant(&state);
	}

	/// Mark `key` as running. Fails if an abort removed the record meanwhile.
	pub fn mark_running(&self, key: QueryKey) -> Result<()> {
		let mut state = self.state.lock();
		match state.registry.get_mut(&key) {
			Some(record) => {
				record.status = QueryStatus::Running;
				Ok(())
			}
			None => Err(Error::Aborted {
				key,
			}),
		}
	}

	/// Admission plus lock protocol for a registered `key`.
	///
	/// Waits for a slot, then tries to lock every table in `tables` without
	/// blocking. A contended table makes the pass release what it took, give
	/// the slot back and wait again, so no session ever waits on a lock while
	/// holding another one taken here.
	///
	/// Returns the tables locked for this query; they are the caller's to
	/// release when the query ends.
	#[instrument(name = "scheduler::admit", level = "debug", skip(self, tables, cancellation), fields(tables = tables.len()))]
	pub fn admit(&self, key: QueryKey, tables: &[TableId], cancellation: &Cancellation) -> Result<Vec<TableId>> {
		let session = key.session;

		loop {
			let polls = self.wait_available(key, cancellation)?;

			match lock_all(self.locks.as_ref(), session, tables) {
				Ok(acquired) => {
					if let Err(err) = self.mark_running(key) {
						release(self.locks.as_ref(), session, &acquired);
						return Err(err);
					}

					debug!(
						query = %key,
						polls,
						locked = acquired.len(),
						holding = ?self.locks.locks_held(session),
						"got all necessary locks"
					);
					return Ok(acquired);
				}
				Err(retreat) => {
					debug!(query = %key, %retreat, "lock pass retreated");
					self.give_up(key);
				}
			}
		}
	}

	/// Drop every record owned by `session`, whatever state it is in.
	///
	/// Used when the session's transaction or subtransaction aborts, or when
	/// the session goes away. Returns how many records were removed.
	#[instrument(name = "scheduler::on_transaction_abort", level = "debug", skip(self))]
	pub fn on_transaction_abort(&self, session: SessionId) -> usize {
		let mut state = self.state.lock();
		let removed = state.registry.deregister_session(session);
		if removed.is_empty() {
			return 0;
		}

		for record in &removed {
			state.release_slot(record);
		}
		self.metrics.record_swept(removed.len());
		debug!(session = session.0, removed = removed.len(), "swept aborted queries");

		self.reschedule_locked(&mut state);
		self.check_invariant(&state);
		removed.len()
	}

	/// Refuse new registrations and make every waiter give up.
	pub fn shutdown(&self) {
		if !self.shutdown.swap(true, Ordering::AcqRel) {
			info!("scheduler shut down");
		}
	}

	pub fn is_shutdown(&self) -> bool {
		self.shutdown.load(Ordering::Acquire)
	}

	fn remove(&self, key: QueryKey) -> Option<QueryRecord> {
		let mut state = self.state.lock();
		let record = state.registry.deregister(&key)?;
		state.release_slot(&record);

		self.reschedule_locked(&mut state);
		self.check_invariant(&state);
		Some(record)
	}

	fn reschedule_locked(&self, state: &mut ScheduleState) -> usize {
		let admitted = reschedule(state, self.config.max_concurrent_queries);
		if admitted > 0 {
			self.metrics.record_admitted(admitted);
		}
		admitted
	}

	fn check_invariant(&self, state: &ScheduleState) {
		if state.running > self.config.max_concurrent_queries {
			warn!(
				running = state.running,
				max = self.config.max_concurrent_queries,
				"slot count above the concurrency limit"
			);
		}
		debug_assert_eq!(state.running, state.slots_in_use());
	}
}
