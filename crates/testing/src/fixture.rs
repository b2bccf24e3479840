// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{sync::Arc, time::Duration};

use reifydb_scheduler::{ImmvId, MemoryDependencyIndex, MemoryLockManager, Scheduler, SchedulerBuilder, TableId};

/// A scheduler wired to in-memory collaborators.
pub struct Fixture {
	pub scheduler: Arc<Scheduler>,
	pub index: Arc<MemoryDependencyIndex>,
	pub locks: Arc<MemoryLockManager>,
}

pub struct FixtureBuilder {
	builder: SchedulerBuilder,
	views: Vec<(ImmvId, Vec<TableId>)>,
}

impl Fixture {
	/// Fixture allowing `max_concurrent` queries at once, polling every 50µs.
	pub fn builder(max_concurrent: usize) -> FixtureBuilder {
		FixtureBuilder {
			builder: Scheduler::builder()
				.max_concurrent_queries(max_concurrent)
				.poll_interval(Duration::from_micros(50)),
			views: Vec::new(),
		}
	}
}

impl FixtureBuilder {
	/// Declare view `immv` as depending on `tables`.
	pub fn view(mut self, immv: u64, tables: &[u64]) -> Self {
		self.views.push((ImmvId(immv), tables.iter().copied().map(TableId).collect()));
		self
	}

	pub fn configure(mut self, configure: impl FnOnce(SchedulerBuilder) -> SchedulerBuilder) -> Self {
		self.builder = configure(self.builder);
		self
	}

	pub fn build(self) -> Fixture {
		let index = Arc::new(MemoryDependencyIndex::new());
		for (immv, tables) in self.views {
			index.register(immv, tables);
		}

		let locks = Arc::new(MemoryLockManager::new());
		let scheduler = self.builder.build(index.clone(), locks.clone()).expect("valid fixture configuration");
		Fixture {
			scheduler,
			index,
			locks,
		}
	}
}
