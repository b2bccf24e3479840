// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Admission and lock ordering for queries that read or write tables feeding
//! incrementally maintained materialized views.
//!
//! Every enforced query is registered, waits for one of a bounded number of
//! slots, and then takes exclusive locks on all base tables its views depend
//! on without ever blocking on a lock: a contended table makes it release what
//! it took and wait again. Two queries whose views share a base table can
//! therefore never run at the same time, and no cycle of lock waits can form.

pub mod admission;
pub mod config;
pub mod dependency;
pub mod error;
pub mod id;
pub mod lock;
pub mod metrics;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod wait;

pub use config::{SchedulerBuilder, SchedulerConfig};
pub use dependency::{DependencyIndex, MemoryDependencyIndex};
pub use error::{Capacity, Error, Result};
pub use id::{ImmvId, QueryKey, SessionId, TableId, TransactionId};
pub use lock::{LockManager, MemoryLockManager};
pub use metrics::MetricsSnapshot;
pub use registry::{QueryRecord, QueryStatus};
pub use scheduler::Scheduler;
pub use session::{QueryStart, Session, SessionKind};
pub use wait::Cancellation;
