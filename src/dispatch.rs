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

//! The per-session Command Dispatcher.
//!
//! One FIFO queue, one background command thread, and a side-park map for
//! `REDISPATCH` verdicts, built on blocking `std::sync`/`parking_lot`
//! primitives since the surrounding concurrency model is OS-thread based
//! rather than cooperative.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use crate::config::DispatcherConfig;
use crate::node::NodeRef;
use crate::packet::{Packet, INSTANCE_ANY};

pub type ObjectId = u32;

/// Outcome of invoking a handler for a dispatched packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Success; drop the packet.
    Handled,
    /// Handler consumed the packet but nothing further is required; drop.
    Discard,
    /// Not yet applicable (e.g. arrived for a future version); park it and
    /// move on to the next queued packet.
    Redispatch,
}

/// A packet paired with the node reference it arrived from, as handed to a
/// dispatcher-thread handler.
#[derive(Clone)]
pub struct QueuedCommand {
    pub packet: Packet,
    pub node: NodeRef,
}

impl QueuedCommand {
    pub fn new(packet: Packet, node: NodeRef) -> Self {
        Self { packet, node }
    }

    pub fn object_id(&self) -> Option<ObjectId> {
        self.packet.object.map(|o| o.object_id)
    }
}

type HandlerFn = dyn Fn(&QueuedCommand) -> Verdict + Send + Sync;

struct Queues {
    pending: VecDeque<QueuedCommand>,
    parked: HashMap<ObjectId, Vec<QueuedCommand>>,
    shutdown: bool,
}

/// Owns a session's command queue, its handler registry, and the background
/// thread that drains the queue. Constructed once per session.
pub struct Dispatcher {
    state: Arc<(Mutex<Queues>, Condvar)>,
    handlers: Mutex<HashMap<(ObjectId, u32), Vec<(u32, Arc<HandlerFn>)>>>,
    config: DispatcherConfig,
    thread: Mutex<Option<JoinHandle<()>>>,
    stalled_wakes: AtomicU32,
    running: AtomicBool,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new((
                Mutex::new(Queues {
                    pending: VecDeque::new(),
                    parked: HashMap::new(),
                    shutdown: false,
                }),
                Condvar::new(),
            )),
            handlers: Mutex::new(HashMap::new()),
            config,
            thread: Mutex::new(None),
            stalled_wakes: AtomicU32::new(0),
            running: AtomicBool::new(false),
        })
    }

    /// Register a handler for `(object_id, instance_id, command)`. Called at
    /// attach time by a distributed object. More than one
    /// replica of the same object can live on one node, so handlers are keyed by instance rather than
    /// overwriting one another; a packet addressed to [`INSTANCE_ANY`] is
    /// delivered to every replica registered for that `(object_id,
    /// command)`, since the sender of such a packet — typically a barrier
    /// master replying to a contributor — has no way to know which specific
    /// instance on the receiving node it should reach.
    pub fn register_handler(
        &self,
        object_id: ObjectId,
        instance_id: u32,
        command: u32,
        handler: impl Fn(&QueuedCommand) -> Verdict + Send + Sync + 'static,
    ) {
        let mut handlers = self.handlers.lock();
        let entries = handlers.entry((object_id, command)).or_default();
        entries.retain(|(iid, _)| *iid != instance_id);
        entries.push((instance_id, Arc::new(handler)));
    }

    pub fn unregister_object(&self, object_id: ObjectId) {
        self.handlers.lock().retain(|(oid, _), _| *oid != object_id);
        self.state.0.lock().parked.remove(&object_id);
    }

    /// Drop just one replica's handlers, leaving siblings on the same
    /// object-ID registered.
    pub fn unregister_instance(&self, object_id: ObjectId, instance_id: u32) {
        let mut handlers = self.handlers.lock();
        for (key, entries) in handlers.iter_mut() {
            if key.0 == object_id {
                entries.retain(|(iid, _)| *iid != instance_id);
            }
        }
    }

    /// Enqueue an incoming packet paired with its sender.
    pub fn push(&self, command: QueuedCommand) {
        let (mutex, cond) = &*self.state;
        let mut q = mutex.lock();
        if q.pending.len() >= self.config.command_queue_capacity {
            tracing::warn!(
                capacity = self.config.command_queue_capacity,
                "command queue exceeded its soft capacity hint"
            );
        }
        q.pending.push_back(command);
        cond.notify_one();
    }

    /// Re-inject every packet parked for `object_id` back onto the queue.
    /// Called whenever a handler advances state that might make a
    /// previously-`REDISPATCH`ed packet applicable.
    pub fn wake_object(&self, object_id: ObjectId) {
        let (mutex, cond) = &*self.state;
        let mut q = mutex.lock();
        if let Some(mut parked) = q.parked.remove(&object_id) {
            q.pending.append(&mut VecDeque::from(std::mem::take(&mut parked)));
            cond.notify_one();
        }
    }

    /// Start the command thread. Idempotent: a second call is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut guard = self.thread.lock();
        if guard.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);
        let this = self.clone();
        *guard = Some(std::thread::spawn(move || this.run()));
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        let (mutex, cond) = &*self.state;
        mutex.lock().shutdown = true;
        cond.notify_all();
        if let Some(handle) = self.thread.lock().take() {
            handle.join().ok();
        }
    }

    fn run(self: Arc<Self>) {
        tracing::info!("command thread started");
        let (mutex, cond) = &*self.state;
        loop {
            let next = {
                let mut q = mutex.lock();
                loop {
                    if q.shutdown {
                        tracing::info!("command thread stopping");
                        return;
                    }
                    if let Some(cmd) = q.pending.pop_front() {
                        break cmd;
                    }
                    cond.wait(&mut q);
                }
            };
            self.dispatch_one(next);
        }
    }

    fn dispatch_one(&self, command: QueuedCommand) {
        let object_id = match command.object_id() {
            Some(id) => id,
            None => {
                tracing::warn!("dropping packet with no object scope at object dispatch stage");
                return;
            }
        };
        let instance_id = command.packet.object.map(|o| o.instance_id).unwrap_or(0);
        let key = (object_id, command.packet.command);
        let entries = self.handlers.lock().get(&key).cloned().unwrap_or_default();
        let targets: Vec<Arc<HandlerFn>> = if instance_id == INSTANCE_ANY {
            entries.into_iter().map(|(_, h)| h).collect()
        } else {
            entries
                .into_iter()
                .filter(|(iid, _)| *iid == instance_id)
                .map(|(_, h)| h)
                .collect()
        };
        if targets.is_empty() {
            tracing::warn!(object_id, command = key.1, "no handler registered; dropping");
            return;
        }

        let mut redispatch = false;
        for handler in &targets {
            if let Verdict::Redispatch = handler(&command) {
                redispatch = true;
            }
        }

        if redispatch {
            let parked_len = {
                let mut q = self.state.0.lock();
                let bucket = q.parked.entry(object_id).or_default();
                bucket.push(command);
                bucket.len()
            };
            if parked_len >= self.config.redispatch_park_capacity {
                tracing::warn!(
                    object_id,
                    parked_len,
                    "object's redispatch side-park exceeded its soft capacity hint"
                );
            }
            let stalled = self.stalled_wakes.fetch_add(1, Ordering::Relaxed) + 1;
            if stalled == self.config.stalled_wake_warning_threshold {
                tracing::warn!(
                    object_id,
                    stalled,
                    "object has redispatched many times in a row without progress"
                );
            }
        } else {
            self.stalled_wakes.store(0, Ordering::Relaxed);
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
