// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Table lock manager interface and the all-or-retreat lock pass.

mod memory;
pub(crate) mod pass;

pub use memory::MemoryLockManager;

use crate::id::{SessionId, TableId};

/// Exclusive, session-owned table locks.
///
/// The scheduler only ever uses the non-blocking acquisition; a contended
/// table makes the whole pass retreat instead of waiting.
pub trait LockManager: Send + Sync {
	/// Take an exclusive lock on `table` for `session` without waiting.
	/// Returns false if another session holds it.
	fn try_lock_exclusive(&self, session: SessionId, table: TableId) -> bool;

	/// Release a lock `session` holds on `table`.
	fn unlock(&self, session: SessionId, table: TableId);

	fn held_by(&self, session: SessionId, table: TableId) -> bool;

	/// Every table `session` currently holds. Diagnostic only.
	fn locks_held(&self, _session: SessionId) -> Vec<TableId> {
		Vec::new()
	}
}
