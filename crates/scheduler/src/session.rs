// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Execution bracket a host session wraps around every query it executes.
//!
//! The host calls [`Session::on_query_start`] before execution,
//! [`Session::on_query_end`] exactly once afterwards, and
//! [`Session::on_transaction_abort`] whenever its transaction or a
//! subtransaction aborts. [`Session::execute`] does the first two for a
//! closure and guarantees the end call even if the closure fails or panics.

use std::{mem, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
	dependency::dependency_set,
	error::{Error, Result},
	id::{ImmvId, QueryKey, SessionId, TableId, TransactionId},
	lock::pass::release,
	registry::QueryStatus,
	scheduler::Scheduler,
	wait::Cancellation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
	Backend,
	ParallelWorker,
}

/// What the host knows about a query when its execution starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStart {
	pub source: String,
	pub transaction: TransactionId,
	pub affected: Vec<ImmvId>,
	pub utility: bool,
	pub explain_only: bool,
}

impl QueryStart {
	pub fn new(source: impl Into<String>, transaction: TransactionId) -> Self {
		Self {
			source: source.into(),
			transaction,
			affected: Vec::new(),
			utility: false,
			explain_only: false,
		}
	}

	pub fn affecting(mut self, affected: impl IntoIterator<Item = ImmvId>) -> Self {
		self.affected.extend(affected);
		self
	}

	pub fn utility(mut self) -> Self {
		self.utility = true;
		self
	}

	pub fn explain_only(mut self) -> Self {
		self.explain_only = true;
		self
	}
}

#[derive(Debug)]
struct ActiveQuery {
	key: QueryKey,
	locked: Vec<TableId>,
}

#[derive(Debug, Default)]
struct SessionState {
	nesting: usize,
	utility: bool,
	sequence: u64,
	active: Option<ActiveQuery>,
}

pub struct Session {
	id: SessionId,
	kind: SessionKind,
	scheduler: Arc<Scheduler>,
	cancellation: Cancellation,
	state: Mutex<SessionState>,
}

impl Session {
	pub(crate) fn new(scheduler: Arc<Scheduler>, id: SessionId, kind: SessionKind) -> Self {
		trace!(session = id.0, ?kind, "session opened");
		Self {
			id,
			kind,
			scheduler,
			cancellation: Cancellation::new(),
			state: Mutex::new(SessionState::default()),
		}
	}

	pub fn id(&self) -> SessionId {
		self.id
	}

	pub fn kind(&self) -> SessionKind {
		self.kind
	}

	pub fn scheduler(&self) -> &Arc<Scheduler> {
		&self.scheduler
	}

	/// Handle the host uses to cancel this session's waiting query.
	pub fn cancellation(&self) -> &Cancellation {
		&self.cancellation
	}

	pub fn nesting_level(&self) -> usize {
		self.state.lock().nesting
	}

	/// Key of the query currently inside the bracket, if it was scheduled.
	pub fn active_query(&self) -> Option<QueryKey> {
		self.state.lock().active.as_ref().map(|active| active.key)
	}

	/// Tables this session locked for its current query.
	pub fn locked_tables(&self) -> Vec<TableId> {
		self.state.lock().active.as_ref().map(|active| active.locked.clone()).unwrap_or_default()
	}

	/// Register `start`, wait for admission and lock everything its views
	/// depend on.
	///
	/// Returns `None` without touching the scheduler for executions that are
	/// not enforced: parallel workers, utility commands, nested executions,
	/// EXPLAIN without ANALYZE and statements without source text.
	pub fn on_query_start(&self, start: &QueryStart) -> Result<Option<QueryKey>> {
		let (key, stale) = {
			let mut state = self.state.lock();
			if !self.enforced(&state, start) {
				trace!(session = self.id.0, nesting = state.nesting, "execution not scheduled");
				return Ok(None);
			}

			state.sequence += 1;
			self.cancellation.reset();
			(QueryKey::new(self.id, state.sequence), state.active.take())
		};

		if let Some(stale) = stale {
			warn!(query = %stale.key, "previous query never reported its end, finishing it now");
			self.finish(stale);
		}

		let tables = dependency_set(self.scheduler.dependency_index(), &start.affected);
		let record = self.scheduler.register(key, &start.affected, start.transaction)?;
		debug!(
			query = %key,
			transaction = start.transaction.0,
			arrival = record.arrival,
			tables = tables.len(),
			"query registered"
		);

		let locked = self.scheduler.admit(key, &tables, &self.cancellation)?;
		self.install(key, locked)
	}

	/// Make an admitted `key` the active query.
	///
	/// An abort sweep may have removed the record between admission and this
	/// call; the query then gives its locks back and fails instead of running
	/// without a slot. Holds the session state across the check, and
	/// [`Session::on_transaction_abort`] holds it across its sweep.
	fn install(&self, key: QueryKey, locked: Vec<TableId>) -> Result<Option<QueryKey>> {
		let mut state = self.state.lock();
		if self.scheduler.status(key) != Some(QueryStatus::Running) {
			release(self.scheduler.lock_manager(), self.id, &locked);
			debug!(query = %key, "aborted before execution started");
			return Err(Error::Aborted {
				key,
			});
		}

		state.active = Some(ActiveQuery {
			key,
			locked,
		});
		Ok(Some(key))
	}

	/// Release the locks of `key`, drop its record and admit the next waiter.
	///
	/// Calling it for a key that is not the active query, or twice for the
	/// same key, does nothing.
	pub fn on_query_end(&self, key: QueryKey, succeeded: bool) {
		let active = {
			let mut state = self.state.lock();
			if state.active.as_ref().is_some_and(|active| active.key == key) {
				state.active.take()
			} else {
				None
			}
		};

		match active {
			Some(active) => {
				self.finish(active);
				debug!(query = %key, succeeded, "query finished");
			}
			None => trace!(query = %key, "query already cleaned up"),
		}
	}

	/// Unconditional cleanup after the session's transaction aborted: the
	/// bracket's own end call may never come.
	pub fn on_transaction_abort(&self) {
		let mut state = self.state.lock();
		let active = state.active.take();
		if let Some(active) = &active {
			release(self.scheduler.lock_manager(), self.id, &active.locked);
		}

		let swept = self.scheduler.on_transaction_abort(self.id);
		drop(state);

		if active.is_some() || swept > 0 {
			debug!(session = self.id.0, swept, "transaction abort cleaned up scheduler state");
		}
	}

	pub fn on_subtransaction_abort(&self) {
		self.on_transaction_abort();
	}

	/// Run `execute` inside the bracket.
	///
	/// Executions started from within `execute` count as nested and are not
	/// scheduled again. Errors of `execute` are returned unchanged after the
	/// query has been cleaned up.
	pub fn execute<T, E>(&self, start: &QueryStart, execute: impl FnOnce() -> std::result::Result<T, E>) -> std::result::Result<T, E>
	where
		E: From<Error>,
	{
		let key = self.on_query_start(start)?;

		let guard = ExecutionGuard::enter(self, key);
		let result = execute();
		guard.exit(result.is_ok());
		result
	}

	/// Run `command` as a utility command. Queries executed while it runs are
	/// not scheduled.
	pub fn utility<R>(&self, command: impl FnOnce() -> R) -> R {
		let previous = mem::replace(&mut self.state.lock().utility, true);
		let _scope = UtilityScope {
			session: self,
			previous,
		};
		command()
	}

	fn enforced(&self, state: &SessionState, start: &QueryStart) -> bool {
		self.kind == SessionKind::Backend
			&& state.nesting == 0
			&& !state.utility
			&& !start.utility
			&& !start.explain_only
			&& !start.source.is_empty()
	}

	fn finish(&self, active: ActiveQuery) {
		release(self.scheduler.lock_manager(), self.id, &active.locked);
		self.scheduler.deregister(active.key);
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		self.on_transaction_abort();
		trace!(session = self.id.0, "session closed");
	}
}

struct ExecutionGuard<'a> {
	session: &'a Session,
	key: Option<QueryKey>,
	exited: bool,
}

impl<'a> ExecutionGuard<'a> {
	fn enter(session: &'a Session, key: Option<QueryKey>) -> Self {
		session.state.lock().nesting += 1;
		Self {
			session,
			key,
			exited: false,
		}
	}

	fn exit(mut self, succeeded: bool) {
		self.leave(succeeded);
	}

	fn leave(&mut self, succeeded: bool) {
		if self.exited {
			return;
		}
		self.exited = true;

		{
			let mut state = self.session.state.lock();
			state.nesting = state.nesting.saturating_sub(1);
		}

		if let Some(key) = self.key {
			self.session.on_query_end(key, succeeded);
		}
	}
}

impl Drop for ExecutionGuard<'_> {
	fn drop(&mut self) {
		self.leave(false);
	}
}

struct UtilityScope<'a> {
	session: &'a Session,
	previous: bool,
}

impl Drop for UtilityScope<'_> {
	fn drop(&mut self) {
		self.session.state.lock().utility = self.previous;
	}
}
