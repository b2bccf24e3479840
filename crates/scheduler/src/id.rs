// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	fmt::{Display, Formatter},
	ops::Deref,
};

use serde::{Deserialize, Serialize};

macro_rules! id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[repr(transparent)]
		#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize)]
		pub struct $name(pub u64);

		impl Deref for $name {
			type Target = u64;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}

		impl PartialEq<u64> for $name {
			fn eq(&self, other: &u64) -> bool {
				self.0.eq(other)
			}
		}

		impl From<$name> for u64 {
			fn from(value: $name) -> Self {
				value.0
			}
		}

		impl Display for $name {
			fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
				write!(f, "{}", self.0)
			}
		}
	};
}

id!(
	/// A host session (backend). Every query and every table lock is owned by one.
	SessionId
);

id!(
	/// An incrementally maintained materialized view.
	ImmvId
);

id!(
	/// A base table feeding one or more views.
	TableId
);

id!(
	/// The host transaction a query runs in. Diagnostic only.
	TransactionId
);

/// Identifies one execution of one query.
///
/// The sequence is per session and only ever grows, so a key is never handed
/// out twice for the lifetime of a session.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
	pub session: SessionId,
	pub sequence: u64,
}

impl QueryKey {
	pub fn new(session: SessionId, sequence: u64) -> Self {
		Self {
			session,
			sequence,
		}
	}
}

impl Display for QueryKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.session, self.sequence)
	}
}
