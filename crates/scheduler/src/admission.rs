// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The admission pass.
//!
//! Runs under the scheduler mutex whenever the registry or the slot count
//! changes. It never blocks and touches every record at most twice.

use tracing::trace;

use crate::{registry::QueryStatus, state::ScheduleState};

/// Admit `Waiting` records in arrival order until every slot is taken, then
/// return records that gave up to `Waiting`.
///
/// A record that gave up is not admitted by the pass its own
/// give-up triggered; it keeps its arrival number and competes again from the
/// next pass on.
///
/// Returns how many records were admitted.
pub fn reschedule(state: &mut ScheduleState, max_concurrent: usize) -> usize {
	let mut admitted = 0;

	if state.running < max_concurrent {
		for record in state.registry.iter_mut() {
			if state.running >= max_concurrent {
				break;
			}
			if record.status == QueryStatus::Waiting {
				record.status = QueryStatus::Available;
				state.running += 1;
				admitted += 1;
				trace!(query = %record.key, arrival = record.arrival, "admitted");
			}
		}
	}

	for record in state.registry.iter_mut() {
		if record.status == QueryStatus::GaveUp {
			record.status = QueryStatus::Waiting;
		}
	}

	debug_assert!(state.running <= max_concurrent);
	admitted
}
