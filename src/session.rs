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

//! Session: the object-ID → distributed-object map scoped to a
//! session-ID, owning exactly one command queue/thread and exposing the
//! local node, the server node used for lookups, and object-ID allocation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::DispatcherConfig;
use crate::dispatch::{Dispatcher, ObjectId};
use crate::error::{Error, Result};
use crate::node::NodeRef;

pub type SessionId = u32;

/// A session's back-reference surface, exposed to distributed objects at
/// attach time.
pub struct Session {
    id: SessionId,
    local_node: NodeRef,
    server: NodeRef,
    dispatcher: Arc<Dispatcher>,
    next_object_id: AtomicU32,
    registered: Mutex<HashSet<(ObjectId, u32)>>,
}

impl Session {
    pub fn new(id: SessionId, local_node: NodeRef, server: NodeRef) -> Arc<Self> {
        Self::with_config(id, local_node, server, DispatcherConfig::default())
    }

    pub fn with_config(
        id: SessionId,
        local_node: NodeRef,
        server: NodeRef,
        config: DispatcherConfig,
    ) -> Arc<Self> {
        let dispatcher = Dispatcher::new(config);
        dispatcher.start();
        Arc::new(Self {
            id,
            local_node,
            server,
            dispatcher,
            next_object_id: AtomicU32::new(1),
            registered: Mutex::new(HashSet::new()),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn local_node(&self) -> &NodeRef {
        &self.local_node
    }

    pub fn server(&self) -> &NodeRef {
        &self.server
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Assign a fresh, session-unique object-ID. Session-unique ID allocation policy beyond
    /// uniqueness is an external collaborator concern; this
    /// just hands out a monotonically increasing counter. The returned ID is
    /// not yet marked registered: the caller still attaches a specific
    /// replica (object-ID, instance-ID) via [`Session::mark_registered`].
    pub fn allocate_object_id(&self) -> ObjectId {
        self.next_object_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Record that replica `(object_id, instance_id)` is attached. One
    /// object-ID may host more than one replica — distinct instance-IDs on
    /// the same node — so the registry key is the pair, not the object-ID
    /// alone; attaching the same `(object_id, instance_id)` twice is a
    /// programming error.
    pub fn mark_registered(&self, object_id: ObjectId, instance_id: u32) -> Result<()> {
        if !self.registered.lock().insert((object_id, instance_id)) {
            return Err(Error::precondition(format!(
                "object {object_id} instance {instance_id} already registered in session {}",
                self.id
            )));
        }
        Ok(())
    }

    pub fn is_registered(&self, object_id: ObjectId, instance_id: u32) -> bool {
        self.registered.lock().contains(&(object_id, instance_id))
    }

    /// Detach one replica. Siblings sharing `object_id` under a different
    /// `instance_id` remain registered and keep their handlers.
    pub fn unregister(&self, object_id: ObjectId, instance_id: u32) {
        self.registered.lock().remove(&(object_id, instance_id));
        self.dispatcher.unregister_instance(object_id, instance_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeId};
    use crate::packet::Packet;

    struct DummyNode(NodeId);
    impl Node for DummyNode {
        fn send(&self, _p: Packet) -> Result<()> {
            Ok(())
        }
        fn is_local(&self) -> bool {
            true
        }
        fn node_id(&self) -> NodeId {
            self.0
        }
        fn connect(&self, _target: NodeId, _server: &NodeRef) -> Result<NodeRef> {
            unimplemented!("session tests never exercise lazy master resolution")
        }
    }

    #[test]
    fn object_ids_are_unique_and_increasing() {
        let node: NodeRef = Arc::new(DummyNode(NodeId::new()));
        let session = Session::new(1, node.clone(), node);
        let a = session.allocate_object_id();
        let b = session.allocate_object_id();
        assert!(b > a);
        session.mark_registered(a, 0).unwrap();
        session.mark_registered(b, 0).unwrap();
        assert!(session.is_registered(a, 0));
        assert!(session.is_registered(b, 0));
    }

    #[test]
    fn mark_registered_rejects_duplicate_instance() {
        let node: NodeRef = Arc::new(DummyNode(NodeId::new()));
        let session = Session::new(1, node.clone(), node);
        session.mark_registered(7, 0).unwrap();
        assert!(session.mark_registered(7, 0).is_err());
    }

    #[test]
    fn mark_registered_allows_distinct_instances_of_same_object() {
        let node: NodeRef = Arc::new(DummyNode(NodeId::new()));
        let session = Session::new(1, node.clone(), node);
        session.mark_registered(7, 1).unwrap();
        session.mark_registered(7, 2).unwrap();
        assert!(session.is_registered(7, 1));
        assert!(session.is_registered(7, 2));
    }
}
