// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Bookkeeping table of in-flight queries.
//!
//! The registry is never touched on its own: it lives inside
//! [`ScheduleState`](crate::state::ScheduleState) and every access happens
//! under the scheduler mutex.

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
	error::{Capacity, Error, Result},
	id::{ImmvId, QueryKey, SessionId, TransactionId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryStatus {
	/// Registered, not admitted yet
	Waiting,
	/// Admitted and holding a slot, lock pass not done yet
	Available,
	/// Holds a slot and every lock it needs
	Running,
	/// Lock pass retreated; the next admission pass returns it to `Waiting`
	GaveUp,
}

impl QueryStatus {
	/// Whether a record in this state occupies one of the concurrency slots.
	pub fn holds_slot(self) -> bool {
		matches!(self, QueryStatus::Available | QueryStatus::Running)
	}
}

impl Display for QueryStatus {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			QueryStatus::Waiting => f.write_str("WAITING"),
			QueryStatus::Available => f.write_str("AVAILABLE"),
			QueryStatus::Running => f.write_str("RUNNING"),
			QueryStatus::GaveUp => f.write_str("GAVE UP"),
		}
	}
}

pub type AffectedImmvs = SmallVec<[ImmvId; 8]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
	pub key: QueryKey,
	pub status: QueryStatus,
	pub affected: AffectedImmvs,
	pub transaction: TransactionId,
	pub arrival: u64,
}

#[derive(Debug)]
pub struct QueryRegistry {
	records: IndexMap<QueryKey, QueryRecord>,
	capacity: usize,
	max_affected: usize,
	next_arrival: u64,
}

impl QueryRegistry {
	pub fn new(capacity: usize, max_affected: usize) -> Self {
		Self {
			records: IndexMap::with_capacity(capacity),
			capacity,
			max_affected,
			next_arrival: 0,
		}
	}

	/// Add a `Waiting` record for `key` with the next arrival number.
	///
	/// Fails without touching the registry when it is full or when `affected`
	/// is larger than a record may carry. A key that is already registered
	/// keeps its existing record.
	pub fn register(
		&mut self,
		key: QueryKey,
		affected: &[ImmvId],
		transaction: TransactionId,
	) -> Result<&QueryRecord> {
		if affected.len() > self.max_affected {
			return Err(Error::CapacityExceeded(Capacity::AffectedTables {
				count: affected.len(),
				limit: self.max_affected,
			}));
		}

		if self.records.contains_key(&key) {
			return Ok(&self.records[&key]);
		}

		if self.records.len() >= self.capacity {
			return Err(Error::CapacityExceeded(Capacity::Registry {
				capacity: self.capacity,
			}));
		}

		self.next_arrival += 1;
		let record = QueryRecord {
			key,
			status: QueryStatus::Waiting,
			affected: affected.iter().copied().collect(),
			transaction,
			arrival: self.next_arrival,
		};

		let index = self.records.insert_full(key, record).0;
		Ok(&self.records[index])
	}

	/// Remove the record for `key`. Removing an absent key is a no-op.
	pub fn deregister(&mut self, key: &QueryKey) -> Option<QueryRecord> {
		self.records.shift_remove(key)
	}

	/// Remove every record owned by `session`.
	pub fn deregister_session(&mut self, session: SessionId) -> Vec<QueryRecord> {
		let keys: Vec<_> = self.records.keys().filter(|key| key.session == session).copied().collect();
		keys.iter().filter_map(|key| self.records.shift_remove(key)).collect()
	}

	pub fn get(&self, key: &QueryKey) -> Option<&QueryRecord> {
		self.records.get(key)
	}

	pub fn get_mut(&mut self, key: &QueryKey) -> Option<&mut QueryRecord> {
		self.records.get_mut(key)
	}

	pub fn status(&self, key: &QueryKey) -> Option<QueryStatus> {
		self.records.get(key).map(|record| record.status)
	}

	/// Records in arrival order.
	pub fn iter(&self) -> impl Iterator<Item = &QueryRecord> {
		self.records.values()
	}

	/// Records in arrival order.
	pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut QueryRecord> {
		self.records.values_mut()
	}

	pub fn snapshot(&self) -> Vec<QueryRecord> {
		self.records.values().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}
