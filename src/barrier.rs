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

//! The Barrier distributed object: an N-way
//! rendezvous across replicas that may sit at different object versions.
//!
//! Contributors enter at a version; the master accumulates arrivals per
//! version and releases all of them once `height` have arrived at the
//! current version.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use itertools::Itertools;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::dispatch::{ObjectId, QueuedCommand, Verdict};
use crate::error::{Error, Result};
use crate::node::{Node, NodeId, NodeRef};
use crate::object::{DistributedObject, ObjectState, INITIAL_VERSION};
use crate::packet::{command, Packet, Payload};
use crate::session::Session;

/// Contributors for a single version rarely exceed a handful; most barriers
/// run with single-digit height.
type Contributors = SmallVec<[NodeRef; 4]>;

/// A cross-node rendezvous point: `height` contributors must call
/// [`Barrier::enter`] at the same object version before any of them returns.
///
/// Exactly one replica — the one whose `master_node` is local — acts as
/// master and tracks arrivals; every other replica is a slave that only ever
/// sends `BARRIER_ENTER` and waits on its own [`crate::notifier::LeaveNotify`].
pub struct Barrier {
    state: ObjectState,
    height: Mutex<u32>,
    master_id: Mutex<NodeId>,
    master_node: Mutex<Option<NodeRef>>,
    is_master: bool,
    leave_notify: crate::notifier::LeaveNotify,
    /// Master-only: contributors recorded per version, in arrival order,
    /// erased once a version rendezvouses.
    entered: Mutex<HashMap<u32, Contributors>>,
}

impl Barrier {
    /// Construct a replica. `master_node` identifies the node that owns the
    /// master replica for this object; whether *this* replica is master is
    /// derived from `master_node.is_local()`.
    pub fn new(object_id: ObjectId, instance_id: u32, master_node: NodeRef, height: u32) -> Arc<Self> {
        let is_master = master_node.is_local();
        let master_id = master_node.node_id();
        Arc::new(Self {
            state: ObjectState::new(object_id, instance_id),
            height: Mutex::new(height),
            master_id: Mutex::new(master_id),
            master_node: Mutex::new(Some(master_node)),
            is_master,
            leave_notify: crate::notifier::LeaveNotify::new(),
            entered: Mutex::new(HashMap::new()),
        })
    }

    /// Construct a slave replica that does not yet know its master; the
    /// master node-reference and height arrive later via
    /// [`DistributedObject::apply_instance_data`].
    pub fn new_unresolved_slave(object_id: ObjectId, instance_id: u32) -> Arc<Self> {
        Arc::new(Self {
            state: ObjectState::new(object_id, instance_id),
            height: Mutex::new(0),
            master_id: Mutex::new(NodeId::ZERO),
            master_node: Mutex::new(None),
            is_master: false,
            leave_notify: crate::notifier::LeaveNotify::new(),
            entered: Mutex::new(HashMap::new()),
        })
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    pub fn height(&self) -> u32 {
        *self.height.lock()
    }

    /// Advance this replica's version. Meaningful on the master: the next
    /// contributor to arrive at the new version (very possibly the master's
    /// own subsequent `enter()` call) is what actually drives a pending
    /// rendezvous to completion — advancing the version on its own never
    /// rewalks `entered`.
    pub fn advance_version(&self) -> u32 {
        self.state.advance_version()
    }

    /// Block until `height` replicas — across however many versions they
    /// individually sit at — have all called `enter()` "at once" from the
    /// master's point of view.
    pub fn enter(&self) -> Result<()> {
        let height = self.height();
        if height == 0 {
            return Err(Error::precondition("barrier height is not configured"));
        }
        if self.master_id.lock().is_zero() {
            return Err(Error::precondition("barrier master_id is not configured"));
        }
        if height == 1 {
            return Ok(());
        }

        let master_node = self.resolve_master()?;
        let session = self.state.session()?;
        let requestor_id = session.local_node().node_id();
        let version = self.state.version();
        let object_header = self.state.header_to_master()?;

        // Reserve the target count before the send can possibly be answered,
        // so a reply racing ahead of this thread reaching `wait_equal` is
        // never lost (mirrors notifier.rs's own ordering requirement).
        let expected = self.leave_notify.value() + 1;
        let packet = Packet::barrier_enter(object_header, version, requestor_id);
        master_node.send(packet)?;
        self.leave_notify.wait_equal(expected);
        Ok(())
    }

    fn resolve_master(&self) -> Result<NodeRef> {
        let mut guard = self.master_node.lock();
        if let Some(node) = guard.as_ref() {
            return Ok(node.clone());
        }
        // Lazy resolution: mirrors the original `_master = localNode->connect(
        // _masterID, session->getServer())` — the node identified by
        // `master_id` is what's resolved, with the server only as the means
        // of locating/connecting to it, not a stand-in for it.
        let master_id = *self.master_id.lock();
        let session = self.state.session()?;
        let master = session.local_node().connect(master_id, session.server())?;
        *guard = Some(master.clone());
        Ok(master)
    }

    /// Master-side handler for `BARRIER_ENTER`.
    fn handle_enter(&self, cmd: &QueuedCommand) -> Verdict {
        let version = match &cmd.packet.payload {
            Payload::BarrierEnter { version, .. } => *version,
            other => {
                tracing::warn!(?other, "barrier enter handler received a non-enter payload");
                return Verdict::Discard;
            }
        };

        let contributors = {
            let mut entered = self.entered.lock();
            let bucket = entered.entry(version).or_default();
            bucket.push(cmd.node.clone());
            let current = self.state.version();
            if version > current {
                tracing::debug!(
                    version,
                    current,
                    count = bucket.len(),
                    "early barrier arrival; recorded and waiting for master to reach this version"
                );
                return Verdict::Discard;
            }
            if bucket.len() < self.height() as usize {
                return Verdict::Discard;
            }
            entered.remove(&version).unwrap()
        };

        self.rendezvous(version, contributors);
        Verdict::Discard
    }

    /// Release every recorded contributor for `version`: one
    /// `BARRIER_ENTER_REPLY` per distinct remote node (contributing more
    /// than once from the same remote node only costs one packet — the
    /// receiving node's dispatcher delivers that single reply to every
    /// replica it has registered for the object, see
    /// [`crate::dispatch::Dispatcher::register_handler`]), and one direct
    /// `leave_notify` increment per *local* entry, since a local contributor
    /// never goes over the wire and so needs no such fan-out. Multiplicity is
    /// preserved per contributing entry, not collapsed away by dedup — a
    /// node that entered twice gets two increments (or counts twice toward
    /// the remote dedup, but still receives only one wire packet).
    fn rendezvous(&self, version: u32, contributors: Contributors) {
        let total = contributors.len();
        let sorted = contributors.into_iter().sorted_by_key(|n| n.node_id());
        let object_header = match self.state.header(Some(crate::packet::INSTANCE_ANY)) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(version, error = %e, "cannot build barrier reply header");
                return;
            }
        };
        let reply = Packet::barrier_enter_reply(object_header);

        let (local, remote): (Vec<_>, Vec<_>) = sorted.partition(|n| n.is_local());
        for _ in &local {
            self.leave_notify.increment();
        }
        for node in remote.into_iter().unique_by(|n| n.node_id()) {
            if let Err(e) = node.send(reply.clone()) {
                tracing::warn!(version, node = %node.node_id(), error = %e, "failed to deliver barrier reply");
            }
        }
        tracing::debug!(version, count = total, "barrier rendezvoused");
    }

    /// Contributor-side handler for `BARRIER_ENTER_REPLY`: no
    /// payload to inspect, just release one waiter.
    fn handle_enter_reply(&self, _cmd: &QueuedCommand) -> Verdict {
        self.leave_notify.increment();
        Verdict::Handled
    }
}

impl DistributedObject for Barrier {
    fn object_id(&self) -> ObjectId {
        self.state.object_id()
    }

    fn instance_id(&self) -> u32 {
        self.state.instance_id()
    }

    fn version(&self) -> u32 {
        self.state.version()
    }

    fn attach_to_session(self: Arc<Self>, session: Arc<Session>) -> Result<()> {
        self.state.attach(&session)?;
        self.state.set_version(INITIAL_VERSION);

        let dispatcher = session.dispatcher().clone();
        let object_id = self.object_id();
        let instance_id = self.instance_id();

        if self.is_master {
            let this = self.clone();
            dispatcher.register_handler(object_id, instance_id, command::BARRIER_ENTER, move |cmd| {
                this.handle_enter(cmd)
            });
        }

        let this = self.clone();
        dispatcher.register_handler(
            object_id,
            instance_id,
            command::BARRIER_ENTER_REPLY,
            move |cmd| this.handle_enter_reply(cmd),
        );

        Ok(())
    }

    /// Full replica state: `(height, master_id)`.
    fn get_instance_data(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(20);
        buf.write_u32::<LittleEndian>(self.height()).unwrap();
        buf.write_u128::<LittleEndian>(self.master_id.lock().as_u128())
            .unwrap();
        buf
    }

    fn apply_instance_data(&self, data: &[u8]) -> Result<()> {
        let mut cursor = Cursor::new(data);
        let height = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::protocol(format!("truncated barrier instance data: {e}")))?;
        let master_id = cursor
            .read_u128::<LittleEndian>()
            .map_err(|e| Error::protocol(format!("truncated barrier master id: {e}")))?;
        *self.height.lock() = height;
        *self.master_id.lock() = NodeId::from_u128(master_id);
        Ok(())
    }

    /// Only the master-replicated subset: `height`.
    fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4);
        buf.write_u32::<LittleEndian>(self.height()).unwrap();
        buf
    }

    fn unpack(&self, data: &[u8]) -> Result<()> {
        let mut cursor = Cursor::new(data);
        let height = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::protocol(format!("truncated barrier pack data: {e}")))?;
        *self.height.lock() = height;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Weak};

    use super::*;
    use crate::node::NodeId;
    use crate::session::Session;

    /// A simulated node: an identity, a locality flag, and the session its
    /// own inbox delivers into. Doubles as the reply target master records
    /// in `entered` (its `send()` pushes straight into its bound inbox).
    struct LoopbackNode {
        id: NodeId,
        local: bool,
        self_ref: Weak<LoopbackNode>,
        inbox: Mutex<Option<Arc<Session>>>,
    }

    impl LoopbackNode {
        fn new(local: bool) -> Arc<Self> {
            Arc::new_cyclic(|weak| Self {
                id: NodeId::new(),
                local,
                self_ref: weak.clone(),
                inbox: Mutex::new(None),
            })
        }

        fn bind(&self, session: &Arc<Session>) {
            *self.inbox.lock() = Some(session.clone());
        }

        /// A proxy for sending to `self`'s inbox while attributing `as_node`
        /// as the packet's sender and `is_local_to_caller` as whether `self`
        /// is local from the caller's point of view. Each contributor gets
        /// its own edge to the same master rather than sharing one object, so
        /// the master's dispatcher can tell contributors apart.
        fn edge_from(self: &Arc<Self>, as_node: NodeRef, is_local_to_caller: bool) -> NodeRef {
            Arc::new(SendAs {
                target_inbox: self.inbox.lock().clone().expect("bind() before edge_from()"),
                target_id: self.id,
                target_is_local: is_local_to_caller,
                as_node,
            })
        }
    }

    impl Node for LoopbackNode {
        fn send(&self, packet: Packet) -> Result<()> {
            let inbox = self
                .inbox
                .lock()
                .clone()
                .ok_or_else(|| Error::precondition("loopback node has no bound inbox"))?;
            let sender: NodeRef = self
                .self_ref
                .upgrade()
                .ok_or_else(|| Error::precondition("loopback node already dropped"))?;
            inbox
                .dispatcher()
                .push(crate::dispatch::QueuedCommand::new(packet, sender));
            Ok(())
        }

        fn is_local(&self) -> bool {
            self.local
        }

        fn node_id(&self) -> NodeId {
            self.id
        }

        /// Node discovery proper is out of scope; this forwards the lookup
        /// to `server`, which is expected to know how to reach `target`.
        fn connect(&self, target: NodeId, server: &NodeRef) -> Result<NodeRef> {
            server.connect(target, server)
        }
    }

    /// A directed edge: sending through it delivers into `target_inbox` but
    /// attributes `as_node` as the sender, modeling one contributor's own
    /// point-to-point connection to the master.
    struct SendAs {
        target_inbox: Arc<Session>,
        target_id: NodeId,
        target_is_local: bool,
        as_node: NodeRef,
    }

    impl Node for SendAs {
        fn send(&self, packet: Packet) -> Result<()> {
            self.target_inbox
                .dispatcher()
                .push(crate::dispatch::QueuedCommand::new(packet, self.as_node.clone()));
            Ok(())
        }

        fn is_local(&self) -> bool {
            self.target_is_local
        }

        fn node_id(&self) -> NodeId {
            self.target_id
        }

        fn connect(&self, target: NodeId, server: &NodeRef) -> Result<NodeRef> {
            server.connect(target, server)
        }
    }

    /// Stands in for node discovery/connection establishment (external
    /// collaborator, see spec.md §1): a directory mapping a node-id to the
    /// edge that reaches it, consulted only through [`Node::connect`].
    struct Broker {
        id: NodeId,
        directory: Mutex<HashMap<NodeId, NodeRef>>,
    }

    impl Broker {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: NodeId::new(),
                directory: Mutex::new(HashMap::new()),
            })
        }

        fn register(&self, id: NodeId, edge: NodeRef) {
            self.directory.lock().insert(id, edge);
        }
    }

    impl Node for Broker {
        fn send(&self, _packet: Packet) -> Result<()> {
            Err(Error::precondition("broker is a resolution stand-in, not a message target"))
        }

        fn is_local(&self) -> bool {
            false
        }

        fn node_id(&self) -> NodeId {
            self.id
        }

        fn connect(&self, target: NodeId, _server: &NodeRef) -> Result<NodeRef> {
            self.directory
                .lock()
                .get(&target)
                .cloned()
                .ok_or_else(|| Error::precondition("broker has no route to that node id"))
        }
    }

    fn new_session(local: &NodeRef, server: &NodeRef) -> Arc<Session> {
        Session::new(1, local.clone(), server.clone())
    }

    #[test]
    fn height_one_returns_without_any_packets() {
        let master = LoopbackNode::new(true);
        let master_ref: NodeRef = master.clone();
        let session = new_session(&master_ref, &master_ref);
        let barrier = Barrier::new(1, 0, master_ref, 1);
        barrier.clone().attach_to_session(session).unwrap();
        barrier.enter().unwrap();
    }

    #[test]
    fn three_way_rendezvous_with_local_master_releases_all() {
        let master = LoopbackNode::new(true);
        let master_ref: NodeRef = master.clone();
        let master_session = new_session(&master_ref, &master_ref);
        master.bind(&master_session);

        let barrier_m = Barrier::new(1, 0, master.edge_from(master_ref.clone(), true), 3);
        barrier_m
            .clone()
            .attach_to_session(master_session.clone())
            .unwrap();

        let node_a = LoopbackNode::new(false);
        let node_b = LoopbackNode::new(false);
        let node_a_ref: NodeRef = node_a.clone();
        let node_b_ref: NodeRef = node_b.clone();

        let session_a = new_session(&node_a_ref, &master_ref);
        let session_b = new_session(&node_b_ref, &master_ref);
        node_a.bind(&session_a);
        node_b.bind(&session_b);

        let barrier_a = Barrier::new(1, 0, master.edge_from(node_a_ref, false), 3);
        barrier_a.clone().attach_to_session(session_a).unwrap();
        let barrier_b = Barrier::new(1, 0, master.edge_from(node_b_ref, false), 3);
        barrier_b.clone().attach_to_session(session_b).unwrap();

        let done_a = Arc::new(AtomicBool::new(false));
        let done_b = Arc::new(AtomicBool::new(false));
        let (ba, da) = (barrier_a.clone(), done_a.clone());
        let ha = std::thread::spawn(move || {
            ba.enter().unwrap();
            da.store(true, Ordering::SeqCst);
        });
        let (bb, db) = (barrier_b.clone(), done_b.clone());
        let hb = std::thread::spawn(move || {
            bb.enter().unwrap();
            db.store(true, Ordering::SeqCst);
        });

        std::thread::sleep(std::time::Duration::from_millis(30));
        assert!(!done_a.load(Ordering::SeqCst));
        assert!(!done_b.load(Ordering::SeqCst));

        barrier_m.enter().unwrap();

        ha.join().unwrap();
        hb.join().unwrap();
        assert!(done_a.load(Ordering::SeqCst));
        assert!(done_b.load(Ordering::SeqCst));
    }

    #[test]
    fn early_arrival_at_a_future_version_waits_for_master_to_catch_up() {
        let master = LoopbackNode::new(true);
        let master_ref: NodeRef = master.clone();
        let master_session = new_session(&master_ref, &master_ref);
        master.bind(&master_session);

        let barrier_m = Barrier::new(1, 0, master.edge_from(master_ref.clone(), true), 2);
        barrier_m
            .clone()
            .attach_to_session(master_session.clone())
            .unwrap();

        let node_c = LoopbackNode::new(false);
        let node_c_ref: NodeRef = node_c.clone();
        let session_c = new_session(&node_c_ref, &master_ref);
        node_c.bind(&session_c);
        let barrier_c = Barrier::new(1, 0, master.edge_from(node_c_ref, false), 2);
        barrier_c.clone().attach_to_session(session_c).unwrap();

        // The contributor races ahead to the next version before the master
        // has advanced to it.
        barrier_c.advance_version();
        assert_eq!(barrier_c.version(), barrier_m.version() + 1);

        let done_c = Arc::new(AtomicBool::new(false));
        let (bc, dc) = (barrier_c.clone(), done_c.clone());
        let hc = std::thread::spawn(move || {
            bc.enter().unwrap();
            dc.store(true, Ordering::SeqCst);
        });

        std::thread::sleep(std::time::Duration::from_millis(30));
        assert!(!done_c.load(Ordering::SeqCst));

        barrier_m.advance_version();
        assert_eq!(barrier_m.version(), barrier_c.version());
        barrier_m.enter().unwrap();

        hc.join().unwrap();
        assert!(done_c.load(Ordering::SeqCst));
    }

    #[test]
    fn two_replicas_on_the_same_node_both_release_from_one_reply() {
        // S4: two replicas of distinct barrier objects living on the same
        // non-master node both enter; the master observes two contributions
        // from that node (reaching its height of 2 without the master
        // itself contributing) and sends a single reply, which the node's
        // dispatcher fans out to both replicas via `INSTANCE_ANY`.
        let master = LoopbackNode::new(true);
        let master_ref: NodeRef = master.clone();
        let master_session = new_session(&master_ref, &master_ref);
        master.bind(&master_session);

        let node_a = LoopbackNode::new(false);
        let node_a_ref: NodeRef = node_a.clone();
        let session_a = new_session(&node_a_ref, &master_ref);
        node_a.bind(&session_a);

        let barrier_m = Barrier::new(10, 0, master.edge_from(master_ref.clone(), true), 2);
        barrier_m
            .clone()
            .attach_to_session(master_session.clone())
            .unwrap();

        let edge = master.edge_from(node_a_ref, false);
        let barrier_a1 = Barrier::new(10, 1, edge.clone(), 2);
        barrier_a1.clone().attach_to_session(session_a.clone()).unwrap();
        let barrier_a2 = Barrier::new(10, 2, edge, 2);
        barrier_a2.clone().attach_to_session(session_a).unwrap();

        let done_1 = Arc::new(AtomicBool::new(false));
        let done_2 = Arc::new(AtomicBool::new(false));
        let (b1, d1) = (barrier_a1.clone(), done_1.clone());
        let h1 = std::thread::spawn(move || {
            b1.enter().unwrap();
            d1.store(true, Ordering::SeqCst);
        });
        let (b2, d2) = (barrier_a2.clone(), done_2.clone());
        let h2 = std::thread::spawn(move || {
            b2.enter().unwrap();
            d2.store(true, Ordering::SeqCst);
        });

        h1.join().unwrap();
        h2.join().unwrap();
        assert!(done_1.load(Ordering::SeqCst));
        assert!(done_2.load(Ordering::SeqCst));
    }

    #[test]
    fn five_way_rendezvous_releases_all_regardless_of_arrival_order() {
        // Real contributors don't arrive in index order; shuffle the spawn
        // sequence each run so the rendezvous logic can't come to depend on
        // the order `entered` happens to fill up in.
        use rand::seq::SliceRandom;

        let master = LoopbackNode::new(true);
        let master_ref: NodeRef = master.clone();
        let master_session = new_session(&master_ref, &master_ref);
        master.bind(&master_session);

        let barrier_m = Barrier::new(20, 0, master.edge_from(master_ref.clone(), true), 5);
        barrier_m
            .clone()
            .attach_to_session(master_session.clone())
            .unwrap();

        let mut barriers = vec![barrier_m.clone()];
        for _ in 0..4 {
            let node = LoopbackNode::new(false);
            let node_ref: NodeRef = node.clone();
            let session = new_session(&node_ref, &master_ref);
            node.bind(&session);
            let barrier = Barrier::new(20, 0, master.edge_from(node_ref, false), 5);
            barrier.clone().attach_to_session(session).unwrap();
            barriers.push(barrier);
        }

        barriers.shuffle(&mut rand::thread_rng());

        let handles: Vec<_> = barriers
            .into_iter()
            .map(|b| std::thread::spawn(move || b.enter().unwrap()))
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn enter_rejects_unset_master_id() {
        let master = LoopbackNode::new(true);
        let master_ref: NodeRef = master.clone();
        let session = new_session(&master_ref, &master_ref);
        master.bind(&session);

        let barrier = Barrier::new_unresolved_slave(1, 0);
        barrier.clone().attach_to_session(session).unwrap();
        assert!(barrier.enter().is_err());
    }

    /// The master-identity slave never receives a direct `NodeRef` to its
    /// master: it only learns `master_id` through `apply_instance_data`, and
    /// its session's server is a distinct broker node, not the master
    /// itself. `enter()` must still resolve and reach the real master by id,
    /// not silently substitute the server.
    #[test]
    fn lazy_resolution_reaches_the_node_named_by_master_id_not_the_server() {
        let master = LoopbackNode::new(true);
        let master_ref: NodeRef = master.clone();
        let master_session = new_session(&master_ref, &master_ref);
        master.bind(&master_session);

        let barrier_m = Barrier::new(1, 0, master.edge_from(master_ref.clone(), true), 2);
        barrier_m
            .clone()
            .attach_to_session(master_session.clone())
            .unwrap();

        let node_c = LoopbackNode::new(false);
        let node_c_ref: NodeRef = node_c.clone();
        let broker = Broker::new();
        let broker_ref: NodeRef = broker.clone();
        broker.register(master.node_id(), master.edge_from(node_c_ref.clone(), false));

        // The session's server is the broker, a distinct node identity from
        // the master — the old fallback that substituted the server for the
        // master would silently address packets to the broker instead.
        assert_ne!(broker_ref.node_id(), master.node_id());
        let session_c = new_session(&node_c_ref, &broker_ref);
        node_c.bind(&session_c);

        let barrier_c = Barrier::new_unresolved_slave(1, 0);
        barrier_c.clone().attach_to_session(session_c).unwrap();
        barrier_c
            .apply_instance_data(&barrier_m.get_instance_data())
            .unwrap();

        let done_c = Arc::new(AtomicBool::new(false));
        let (bc, dc) = (barrier_c.clone(), done_c.clone());
        let hc = std::thread::spawn(move || {
            bc.enter().unwrap();
            dc.store(true, Ordering::SeqCst);
        });

        std::thread::sleep(std::time::Duration::from_millis(30));
        assert!(!done_c.load(Ordering::SeqCst));

        barrier_m.enter().unwrap();

        hc.join().unwrap();
        assert!(done_c.load(Ordering::SeqCst));
    }
}
