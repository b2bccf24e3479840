// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The view → base table dependency index the scheduler consults.

use std::collections::HashMap;

use indexmap::IndexSet;
use parking_lot::RwLock;

use crate::id::{ImmvId, TableId};

/// Read-only access to the base tables each view is computed from.
///
/// A view's dependencies are fixed when the view is created, so an
/// implementation may assume no concurrent change for the duration of a single
/// admission decision.
pub trait DependencyIndex: Send + Sync {
	/// Base tables `immv` reads, in definition order. Empty when `immv` is not a
	/// maintained view.
	fn dependencies_of(&self, immv: ImmvId) -> Vec<TableId>;
}

/// Union of the dependencies of `affected`, deduplicated, first occurrence
/// wins.
pub fn dependency_set(index: &dyn DependencyIndex, affected: &[ImmvId]) -> Vec<TableId> {
	let mut tables = IndexSet::new();
	for immv in affected {
		tables.extend(index.dependencies_of(*immv));
	}
	tables.into_iter().collect()
}

#[derive(Debug, Default)]
pub struct MemoryDependencyIndex {
	views: RwLock<HashMap<ImmvId, Vec<TableId>>>,
}

impl MemoryDependencyIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, immv: ImmvId, tables: impl IntoIterator<Item = TableId>) {
		self.views.write().insert(immv, tables.into_iter().collect());
	}

	pub fn remove(&self, immv: ImmvId) -> Option<Vec<TableId>> {
		self.views.write().remove(&immv)
	}

	pub fn len(&self) -> usize {
		self.views.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.views.read().is_empty()
	}
}

impl DependencyIndex for MemoryDependencyIndex {
	fn dependencies_of(&self, immv: ImmvId) -> Vec<TableId> {
		self.views.read().get(&immv).cloned().unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_view_has_no_dependencies() {
		let index = MemoryDependencyIndex::new();
		assert!(index.dependencies_of(ImmvId(1)).is_empty());
	}

	#[test]
	fn test_register_and_remove() {
		let index = MemoryDependencyIndex::new();
		index.register(ImmvId(1), [TableId(10), TableId(11)]);
		assert_eq!(index.dependencies_of(ImmvId(1)), vec![TableId(10), TableId(11)]);
		assert_eq!(index.len(), 1);

		assert_eq!(index.remove(ImmvId(1)), Some(vec![TableId(10), TableId(11)]));
		assert!(index.is_empty());
	}

	#[test]
	fn test_dependency_set_deduplicates_in_order() {
		let index = MemoryDependencyIndex::new();
		index.register(ImmvId(1), [TableId(3), TableId(1)]);
		index.register(ImmvId(2), [TableId(1), TableId(2), TableId(3)]);

		let tables = dependency_set(&index, &[ImmvId(1), ImmvId(2), ImmvId(99)]);
		assert_eq!(tables, vec![TableId(3), TableId(1), TableId(2)]);
	}
}
