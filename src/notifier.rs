// Copyright 2026 Clustersync Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The Leave Notifier: a monotonic wait-for-equal counter
//! used to release a thread blocked in [`crate::barrier::Barrier::enter`].
//!
//! `enter()` is called from an arbitrary application thread, not awaited
//! inside a single async runtime, so the wait primitive here is a
//! `Condvar`, not a channel.

use std::sync::{Condvar, Mutex};

/// Thread-safe monotonic counter with wait-for-equal semantics.
#[derive(Debug, Default)]
pub struct LeaveNotify {
    value: Mutex<u64>,
    changed: Condvar,
}

impl LeaveNotify {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    pub fn value(&self) -> u64 {
        *self.value.lock().unwrap()
    }

    /// Advance the counter by one and wake any waiters.
    pub fn increment(&self) {
        let mut v = self.value.lock().unwrap();
        *v += 1;
        self.changed.notify_all();
    }

    /// Block until the counter reaches exactly `target`.
    ///
    /// Concurrent `enter()` calls on the same barrier replica are
    /// disallowed by design, so the counter never skips past
    /// a given waiter's `target` from that waiter's point of view.
    pub fn wait_equal(&self, target: u64) {
        let mut v = self.value.lock().unwrap();
        while *v != target {
            v = self.changed.wait(v).unwrap();
        }
    }
}
