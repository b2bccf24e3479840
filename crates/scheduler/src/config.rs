// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Scheduler configuration and the builder used to assemble it.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
	dependency::DependencyIndex,
	error::{Error, Result},
	lock::LockManager,
	scheduler::Scheduler,
};

pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 8;
pub const DEFAULT_MAX_AFFECTED_TABLES: usize = 16;
pub const DEFAULT_MAX_QUERIES: usize = 1024;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(30);

/// Configuration for the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
	/// Upper bound on queries holding an admission slot at once
	pub max_concurrent_queries: usize,
	/// Upper bound on views a single query may affect
	pub max_affected_tables: usize,
	/// Number of query records the registry can hold
	pub max_queries: usize,
	/// Sleep between two status checks of a waiting query
	pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
			max_affected_tables: DEFAULT_MAX_AFFECTED_TABLES,
			max_queries: DEFAULT_MAX_QUERIES,
			poll_interval: DEFAULT_POLL_INTERVAL,
		}
	}
}

impl SchedulerConfig {
	pub fn validate(&self) -> Result<()> {
		if self.max_concurrent_queries == 0 {
			return Err(Error::InvalidConfig {
				field: "max_concurrent_queries",
			});
		}
		if self.max_affected_tables == 0 {
			return Err(Error::InvalidConfig {
				field: "max_affected_tables",
			});
		}
		if self.max_queries == 0 {
			return Err(Error::InvalidConfig {
				field: "max_queries",
			});
		}
		Ok(())
	}
}

pub struct SchedulerBuilder {
	config: SchedulerConfig,
}

impl Default for SchedulerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl SchedulerBuilder {
	/// Create a new SchedulerBuilder with default settings
	pub fn new() -> Self {
		Self {
			config: SchedulerConfig::default(),
		}
	}

	/// Start from an already loaded configuration
	pub fn from_config(config: SchedulerConfig) -> Self {
		Self {
			config,
		}
	}

	pub fn max_concurrent_queries(mut self, count: usize) -> Self {
		self.config.max_concurrent_queries = count;
		self
	}

	pub fn max_affected_tables(mut self, count: usize) -> Self {
		self.config.max_affected_tables = count;
		self
	}

	/// Set the registry capacity.
	/// Defaults to 1024 if not set.
	pub fn max_queries(mut self, count: usize) -> Self {
		self.config.max_queries = count;
		self
	}

	pub fn poll_interval(mut self, interval: Duration) -> Self {
		self.config.poll_interval = interval;
		self
	}

	pub fn config(&self) -> &SchedulerConfig {
		&self.config
	}

	/// Validate the configuration and start the scheduler service.
	pub fn build(self, index: Arc<dyn DependencyIndex>, locks: Arc<dyn LockManager>) -> Result<Arc<Scheduler>> {
		self.config.validate()?;
		Ok(Arc::new(Scheduler::new(self.config, index, locks)))
	}
}
