// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use crate::{
	id::{SessionId, TableId},
	lock::LockManager,
};

/// In-process lock manager: one owner per table, no queueing.
#[derive(Debug, Default)]
pub struct MemoryLockManager {
	owners: Mutex<HashMap<TableId, SessionId>>,
}

impl MemoryLockManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn owner(&self, table: TableId) -> Option<SessionId> {
		self.owners.lock().get(&table).copied()
	}

	pub fn locked_count(&self) -> usize {
		self.owners.lock().len()
	}
}

impl LockManager for MemoryLockManager {
	fn try_lock_exclusive(&self, session: SessionId, table: TableId) -> bool {
		let mut owners = self.owners.lock();
		match owners.get(&table) {
			Some(owner) if *owner == session => true,
			Some(owner) => {
				trace!(table = table.0, session = session.0, owner = owner.0, "table lock contended");
				false
			}
			None => {
				owners.insert(table, session);
				true
			}
		}
	}

	fn unlock(&self, session: SessionId, table: TableId) {
		let mut owners = self.owners.lock();
		if owners.get(&table) == Some(&session) {
			owners.remove(&table);
		}
	}

	fn held_by(&self, session: SessionId, table: TableId) -> bool {
		self.owners.lock().get(&table) == Some(&session)
	}

	fn locks_held(&self, session: SessionId) -> Vec<TableId> {
		let mut tables: Vec<_> =
			self.owners.lock().iter().filter(|(_, owner)| **owner == session).map(|(table, _)| *table).collect();
		tables.sort();
		tables
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_exclusive() {
		let locks = MemoryLockManager::new();
		assert!(locks.try_lock_exclusive(SessionId(1), TableId(10)));
		assert!(!locks.try_lock_exclusive(SessionId(2), TableId(10)));
		assert!(locks.held_by(SessionId(1), TableId(10)));
		assert!(!locks.held_by(SessionId(2), TableId(10)));
		assert_eq!(locks.owner(TableId(10)), Some(SessionId(1)));
	}

	#[test]
	fn test_relock_by_owner_succeeds() {
		let locks = MemoryLockManager::new();
		assert!(locks.try_lock_exclusive(SessionId(1), TableId(10)));
		assert!(locks.try_lock_exclusive(SessionId(1), TableId(10)));
		assert_eq!(locks.locked_count(), 1);
	}

	#[test]
	fn test_unlock_by_non_owner_is_ignored() {
		let locks = MemoryLockManager::new();
		assert!(locks.try_lock_exclusive(SessionId(1), TableId(10)));
		locks.unlock(SessionId(2), TableId(10));
		assert!(locks.held_by(SessionId(1), TableId(10)));

		locks.unlock(SessionId(1), TableId(10));
		assert_eq!(locks.owner(TableId(10)), None);
	}

	#[test]
	fn test_locks_held_is_sorted_per_session() {
		let locks = MemoryLockManager::new();
		assert!(locks.try_lock_exclusive(SessionId(1), TableId(2)));
		assert!(locks.try_lock_exclusive(SessionId(1), TableId(1)));
		assert!(locks.try_lock_exclusive(SessionId(2), TableId(3)));

		assert_eq!(locks.locks_held(SessionId(1)), vec![TableId(1), TableId(2)]);
		assert_eq!(locks.locks_held(SessionId(2)), vec![TableId(3)]);
		assert_eq!(locks.locked_count(), 3);
	}
}
