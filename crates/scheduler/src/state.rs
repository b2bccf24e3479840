// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::registry::{QueryRecord, QueryRegistry};

/// Everything guarded by the scheduler mutex.
///
/// `running` counts reserved slots: records in `Available` or `Running`. It is
/// raised by admission and lowered by give-up, completion and sweeps, so
/// `running <= max_concurrent_queries` holds whenever the mutex is free.
#[derive(Debug)]
pub struct ScheduleState {
	pub running: usize,
	pub registry: QueryRegistry,
}

impl ScheduleState {
	pub fn new(registry: QueryRegistry) -> Self {
		Self {
			running: 0,
			registry,
		}
	}

	/// Give back the slot of a record leaving the registry, if it held one.
	pub(crate) fn release_slot(&mut self, record: &QueryRecord) {
		if record.status.holds_slot() {
			debug_assert!(self.running > 0, "slot released twice for {}", record.key);
			self.running = self.running.saturating_sub(1);
		}
	}

	/// Recount `running` from the records. Only used to check the invariant.
	pub fn slots_in_use(&self) -> usize {
		self.registry.iter().filter(|record| record.status.holds_slot()).count()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		id::{QueryKey, SessionId, TransactionId},
		registry::QueryStatus,
	};

	#[test]
	fn test_release_slot_only_for_slot_holders() {
		let mut state = ScheduleState::new(QueryRegistry::new(4, 4));
		let key = QueryKey::new(SessionId(1), 1);
		state.registry.register(key, &[], TransactionId(1)).unwrap();

		let waiting = state.registry.get(&key).unwrap().clone();
		state.running = 1;
		state.release_slot(&waiting);
		assert_eq!(state.running, 1);

		let mut running = waiting;
		running.status = QueryStatus::Running;
		state.release_slot(&running);
		assert_eq!(state.running, 0);
	}
}
