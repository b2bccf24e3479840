// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::thread;

use reifydb_scheduler::{Cancellation, ImmvId, QueryKey, QueryStatus, SessionId, TransactionId};
use reifydb_testing::{Fixture, logging};

fn key(session: u64) -> QueryKey {
	QueryKey::new(SessionId(session), 1)
}

#[test]
fn test_lone_gave_up_query_is_readmitted() {
	logging::init();
	let fixture = Fixture::builder(1).view(1, &[10]).build();
	let scheduler = &fixture.scheduler;

	scheduler.register(key(1), &[ImmvId(1)], TransactionId(1)).unwrap();
	scheduler.give_up(key(1));

	assert_eq!(scheduler.status(key(1)), Some(QueryStatus::Waiting));
	assert_eq!(scheduler.running_count(), 0);

	scheduler.wait_available(key(1), &Cancellation::new()).unwrap();

	assert_eq!(scheduler.status(key(1)), Some(QueryStatus::Available));
	assert_eq!(scheduler.running_count(), 1);
	assert_eq!(scheduler.metrics().self_heals, 1);
	assert_eq!(scheduler.metrics().retreats, 1);
}

#[test]
fn test_give_up_lets_the_next_waiter_in_first() {
	logging::init();
	let fixture = Fixture::builder(1).view(1, &[10]).build();
	let scheduler = &fixture.scheduler;

	scheduler.register(key(1), &[ImmvId(1)], TransactionId(1)).unwrap();
	scheduler.register(key(2), &[ImmvId(1)], TransactionId(2)).unwrap();
	scheduler.give_up(key(1));

	assert_eq!(scheduler.status(key(1)), Some(QueryStatus::Waiting));
	assert_eq!(scheduler.status(key(2)), Some(QueryStatus::Available));
	assert_eq!(scheduler.metrics().self_heals, 0);
}

#[test]
fn test_waiting_thread_heals_without_outside_events() {
	logging::init();
	let fixture = Fixture::builder(2).view(1, &[10]).build();
	let scheduler = fixture.scheduler.clone();

	scheduler.register(key(1), &[ImmvId(1)], TransactionId(1)).unwrap();
	scheduler.give_up(key(1));

	let waiter = {
		let scheduler = scheduler.clone();
		thread::spawn(move || scheduler.wait_available(key(1), &Cancellation::new()))
	};

	waiter.join().unwrap().unwrap();
	assert_eq!(scheduler.status(key(1)), Some(QueryStatus::Available));
	assert_eq!(scheduler.running_count(), 1);
}
