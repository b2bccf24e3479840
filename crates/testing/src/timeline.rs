// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Records which queries execute at the same time and on which tables.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use reifydb_scheduler::TableId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
	pub table: TableId,
	pub running: String,
	pub entering: String,
}

#[derive(Debug, Default)]
struct Inner {
	active: HashMap<TableId, String>,
	concurrent: usize,
	max_concurrent: usize,
	started: Vec<String>,
	violations: Vec<Violation>,
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
	inner: Arc<Mutex<Inner>>,
}

impl Timeline {
	pub fn new() -> Self {
		Self::default()
	}

	/// Run `body` as the execution of `label` over `tables`, noting every table
	/// another running execution is already on.
	pub fn run<R>(&self, label: &str, tables: &[TableId], body: impl FnOnce() -> R) -> R {
		self.enter(label, tables);
		let result = body();
		self.exit(label, tables);
		result
	}

	fn enter(&self, label: &str, tables: &[TableId]) {
		let mut inner = self.inner.lock();
		for table in tables {
			if let Some(running) = inner.active.get(table).cloned() {
				inner.violations.push(Violation {
					table: *table,
					running,
					entering: label.to_string(),
				});
			}
		}
		for table in tables {
			inner.active.insert(*table, label.to_string());
		}
		inner.concurrent += 1;
		inner.max_concurrent = inner.max_concurrent.max(inner.concurrent);
		inner.started.push(label.to_string());
	}

	fn exit(&self, label: &str, tables: &[TableId]) {
		let mut inner = self.inner.lock();
		for table in tables {
			if inner.active.get(table).is_some_and(|owner| owner == label) {
				inner.active.remove(table);
			}
		}
		inner.concurrent -= 1;
	}

	/// Labels in the order their executions started.
	pub fn started(&self) -> Vec<String> {
		self.inner.lock().started.clone()
	}

	pub fn max_concurrent(&self) -> usize {
		self.inner.lock().max_concurrent
	}

	pub fn violations(&self) -> Vec<Violation> {
		self.inner.lock().violations.clone()
	}

	/// # Panics
	/// Panics if two executions sharing a table ever overlapped.
	pub fn assert_exclusive(&self) {
		let violations = self.violations();
		assert!(violations.is_empty(), "overlapping executions on shared tables: {:?}", violations);
	}
}
