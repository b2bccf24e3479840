// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;

/// One-shot barrier: every `wait` blocks until `open` is called once.
///
/// Used to hold a query inside its execution while a test inspects the
/// scheduler.
#[derive(Clone)]
pub struct Gate {
	sender: Arc<Mutex<Option<Sender<()>>>>,
	receiver: Receiver<()>,
}

impl Default for Gate {
	fn default() -> Self {
		Self::new()
	}
}

impl Gate {
	pub fn new() -> Self {
		let (sender, receiver) = bounded(0);
		Self {
			sender: Arc::new(Mutex::new(Some(sender))),
			receiver,
		}
	}

	pub fn open(&self) {
		self.sender.lock().take();
	}

	pub fn is_open(&self) -> bool {
		self.sender.lock().is_none()
	}

	pub fn wait(&self) {
		// nothing is ever sent, recv returns once the sender is dropped
		let _ = self.receiver.recv();
	}
}
