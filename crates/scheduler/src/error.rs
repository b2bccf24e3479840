// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use crate::id::{QueryKey, TableId};

/// Which bounded resource a registration ran out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
	/// Every registry slot is taken by an in-flight query.
	Registry {
		capacity: usize,
	},
	/// The query touches more views than a record can carry.
	AffectedTables {
		count: usize,
		limit: usize,
	},
}

impl Display for Capacity {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Capacity::Registry {
				capacity,
			} => write!(f, "query registry is full ({} in-flight queries)", capacity),
			Capacity::AffectedTables {
				count,
				limit,
			} => write!(f, "query affects {} materialized views, at most {} are allowed", count, limit),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("capacity exceeded: {0}")]
	CapacityExceeded(Capacity),

	#[error("query {key} was cancelled while waiting for admission")]
	Cancelled {
		key: QueryKey,
	},

	#[error("query {key} was removed by an abort while waiting for admission")]
	Aborted {
		key: QueryKey,
	},

	#[error("scheduler has been shut down")]
	Shutdown,

	#[error("invalid scheduler configuration: {field} must be greater than zero")]
	InvalidConfig {
		field: &'static str,
	},
}

impl Error {
	/// Stable diagnostic code of this error.
	pub fn code(&self) -> &'static str {
		match self {
			Error::CapacityExceeded(Capacity::Registry {
				..
			}) => "SCHEDULER_001",
			Error::CapacityExceeded(Capacity::AffectedTables {
				..
			}) => "SCHEDULER_002",
			Error::Cancelled {
				..
			} => "SCHEDULER_003",
			Error::Aborted {
				..
			} => "SCHEDULER_004",
			Error::Shutdown => "SCHEDULER_005",
			Error::InvalidConfig {
				..
			} => "SCHEDULER_006",
		}
	}

	pub fn is_capacity_exceeded(&self) -> bool {
		matches!(self, Error::CapacityExceeded(_))
	}
}

pub type Result<T> = std::result::Result<T, Error>;

/// A lock pass hit a table someone else holds. Everything taken in the pass
/// has already been released when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LockRetreat {
	pub(crate) contended: TableId,
}

impl Display for LockRetreat {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "table {} is locked by another session", self.contended)
	}
}
