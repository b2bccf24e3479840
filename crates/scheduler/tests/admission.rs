// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::thread;

use reifydb_scheduler::{Error, ImmvId, QueryKey, QueryStart, QueryStatus, SessionId, TableId, TransactionId};
use reifydb_testing::{Fixture, Gate, Timeline, logging, util::wait::wait_for};

fn key(session: u64) -> QueryKey {
	QueryKey::new(SessionId(session), 1)
}

#[test]
fn test_first_query_is_admitted_on_registration() {
	logging::init();
	let fixture = Fixture::builder(1).view(1, &[10]).build();

	let record = fixture.scheduler.register(key(1), &[ImmvId(1)], TransactionId(1)).unwrap();

	assert_eq!(record.status, QueryStatus::Available);
	assert_eq!(fixture.scheduler.running_count(), 1);
}

#[test]
fn test_waiters_are_admitted_in_arrival_order() {
	logging::init();
	let fixture = Fixture::builder(1).view(1, &[10]).build();
	let scheduler = &fixture.scheduler;

	for session in 1..=3 {
		scheduler.register(key(session), &[ImmvId(1)], TransactionId(session)).unwrap();
	}
	assert_eq!(scheduler.status(key(1)), Some(QueryStatus::Available));
	assert_eq!(scheduler.status(key(2)), Some(QueryStatus::Waiting));
	assert_eq!(scheduler.status(key(3)), Some(QueryStatus::Waiting));

	scheduler.deregister(key(1));
	assert_eq!(scheduler.status(key(2)), Some(QueryStatus::Available));
	assert_eq!(scheduler.status(key(3)), Some(QueryStatus::Waiting));

	scheduler.deregister(key(2));
	assert_eq!(scheduler.status(key(3)), Some(QueryStatus::Available));
	assert_eq!(scheduler.running_count(), 1);

	scheduler.deregister(key(3));
	assert_eq!(scheduler.running_count(), 0);
	assert!(scheduler.snapshot().is_empty());
}

#[test]
fn test_cap_bounds_admitted_queries() {
	logging::init();
	let fixture = Fixture::builder(2).view(1, &[10]).build();
	let scheduler = &fixture.scheduler;

	for session in 1..=5 {
		scheduler.register(key(session), &[ImmvId(1)], TransactionId(session)).unwrap();
	}

	let statuses: Vec<_> = scheduler.snapshot().into_iter().map(|record| record.status).collect();
	assert_eq!(
		statuses,
		vec![
			QueryStatus::Available,
			QueryStatus::Available,
			QueryStatus::Waiting,
			QueryStatus::Waiting,
			QueryStatus::Waiting,
		]
	);
	assert_eq!(scheduler.running_count(), 2);
	assert_eq!(scheduler.metrics().admitted, 2);
}

#[test]
fn test_sessions_execute_in_arrival_order() {
	logging::init();
	let fixture = Fixture::builder(1).view(1, &[10]).view(2, &[20]).view(3, &[30]).build();
	let gate = Gate::new();
	let timeline = Timeline::new();

	let spawn = |label: &'static str, immv: u64, tables: u64| {
		let scheduler = fixture.scheduler.clone();
		let gate = gate.clone();
		let timeline = timeline.clone();
		thread::spawn(move || {
			let session = scheduler.open_session();
			let start = QueryStart::new(label, TransactionId(immv)).affecting([ImmvId(immv)]);
			session.execute::<_, Error>(&start, || {
				timeline.run(label, &[TableId(tables)], || gate.wait());
				Ok(())
			})
		})
	};

	let first = spawn("first", 1, 10);
	wait_for(|| fixture.scheduler.running_count() == 1 && timeline.started().len() == 1, "first query running");

	let second = spawn("second", 2, 20);
	wait_for(|| fixture.scheduler.snapshot().len() == 2, "second query registered");

	let third = spawn("third", 3, 30);
	wait_for(|| fixture.scheduler.snapshot().len() == 3, "third query registered");

	gate.open();
	for handle in [first, second, third] {
		handle.join().unwrap().unwrap();
	}

	assert_eq!(timeline.started(), vec!["first", "second", "third"]);
	assert_eq!(timeline.max_concurrent(), 1);
	assert_eq!(fixture.scheduler.running_count(), 0);
	assert!(fixture.scheduler.snapshot().is_empty());
}
