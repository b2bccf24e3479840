// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use tracing::{instrument, trace};

use crate::{
	error::LockRetreat,
	id::{SessionId, TableId},
	lock::LockManager,
};

/// Try to lock every table in `tables` for `session` without waiting.
///
/// Tables the session already holds are skipped and never released here, they
/// belong to the surrounding transaction. On the first contended table every
/// lock taken by this pass is released again and the pass retreats.
///
/// Returns the tables newly locked by this pass.
#[instrument(name = "scheduler::lock_pass", level = "trace", skip(locks, tables), fields(tables = tables.len()))]
pub(crate) fn lock_all(
	locks: &dyn LockManager,
	session: SessionId,
	tables: &[TableId],
) -> std::result::Result<Vec<TableId>, LockRetreat> {
	let mut acquired = Vec::with_capacity(tables.len());

	for &table in tables {
		if locks.held_by(session, table) {
			trace!(table = table.0, "already held");
			continue;
		}

		if locks.try_lock_exclusive(session, table) {
			acquired.push(table);
			continue;
		}

		release(locks, session, &acquired);
		return Err(LockRetreat {
			contended: table,
		});
	}

	Ok(acquired)
}

pub(crate) fn release(locks: &dyn LockManager, session: SessionId, tables: &[TableId]) {
	for &table in tables.iter().rev() {
		locks.unlock(session, table);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lock::MemoryLockManager;

	#[test]
	fn test_locks_everything() {
		let locks = MemoryLockManager::new();
		let acquired = lock_all(&locks, SessionId(1), &[TableId(1), TableId(2)]).unwrap();
		assert_eq!(acquired, vec![TableId(1), TableId(2)]);
		assert_eq!(locks.locks_held(SessionId(1)), vec![TableId(1), TableId(2)]);
	}

	#[test]
	fn test_skips_tables_already_held() {
		let locks = MemoryLockManager::new();
		assert!(locks.try_lock_exclusive(SessionId(1), TableId(1)));

		let acquired = lock_all(&locks, SessionId(1), &[TableId(1), TableId(2)]).unwrap();
		assert_eq!(acquired, vec![TableId(2)]);
	}

	#[test]
	fn test_retreat_releases_only_this_pass() {
		let locks = MemoryLockManager::new();
		assert!(locks.try_lock_exclusive(SessionId(1), TableId(1)));
		assert!(locks.try_lock_exclusive(SessionId(2), TableId(3)));

		let retreat = lock_all(&locks, SessionId(1), &[TableId(1), TableId(2), TableId(3)]).unwrap_err();
		assert_eq!(retreat.contended, TableId(3));

		// table 1 was held before the pass and stays held, table 2 was taken by the pass
		assert!(locks.held_by(SessionId(1), TableId(1)));
		assert_eq!(locks.owner(TableId(2)), None);
		assert!(locks.held_by(SessionId(2), TableId(3)));
	}

	#[test]
	fn test_release() {
		let locks = MemoryLockManager::new();
		let acquired = lock_all(&locks, SessionId(1), &[TableId(4), TableId(5)]).unwrap();
		release(&locks, SessionId(1), &acquired);
		assert_eq!(locks.locked_count(), 0);
	}
}
