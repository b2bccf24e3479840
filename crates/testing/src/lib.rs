// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Shared test harness for the scheduler crates.

pub mod fixture;
pub mod gate;
pub mod logging;
pub mod timeline;
pub mod util;

pub use fixture::Fixture;
pub use gate::Gate;
pub use timeline::Timeline;
