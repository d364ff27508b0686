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

//! Distributed Object attach, version, and send plumbing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use crate::dispatch::ObjectId;
use crate::error::{Error, Result};
use crate::node::NodeRef;
use crate::packet::{ObjectHeader, Packet, INSTANCE_ANY};
use crate::session::{Session, SessionId};

/// Sentinel meaning "version uninitialized".
pub const VERSION_NONE: u32 = u32::MAX;

/// The first usable version: the next value after [`VERSION_NONE`].
pub const INITIAL_VERSION: u32 = VERSION_NONE.wrapping_add(1);

/// Replica-identifying and session-backreference state shared by every
/// distributed object. Concrete objects (e.g. [`crate::barrier::Barrier`])
/// embed this rather than reimplementing attach/version/send bookkeeping.
pub struct ObjectState {
    object_id: ObjectId,
    instance_id: u32,
    version: AtomicU32,
    session: parking_lot::Mutex<Weak<Session>>,
}

impl ObjectState {
    pub fn new(object_id: ObjectId, instance_id: u32) -> Self {
        Self {
            object_id,
            instance_id,
            version: AtomicU32::new(VERSION_NONE),
            session: parking_lot::Mutex::new(Weak::new()),
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn set_version(&self, version: u32) {
        self.version.store(version, Ordering::SeqCst);
    }

    /// Advance to the next version, initializing from [`VERSION_NONE`] if
    /// this is the first call.
    pub fn advance_version(&self) -> u32 {
        self.version
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.wrapping_add(1))
            })
            .unwrap()
            .wrapping_add(1)
    }

    pub fn attach(&self, session: &Arc<Session>) -> Result<()> {
        session.mark_registered(self.object_id, self.instance_id)?;
        *self.session.lock() = Arc::downgrade(session);
        Ok(())
    }

    pub fn session(&self) -> Result<Arc<Session>> {
        self.session
            .lock()
            .upgrade()
            .ok_or_else(|| Error::precondition("object is not attached to a session"))
    }

    pub fn session_id(&self) -> Result<SessionId> {
        Ok(self.session()?.id())
    }

    /// Build the object header this replica stamps onto outgoing packets.
    /// A contributor sending to the master uses [`INSTANCE_ANY`], since the
    /// master does not know the contributor's instance-ID.
    pub fn header(&self, instance_override: Option<u32>) -> Result<ObjectHeader> {
        Ok(ObjectHeader {
            session_id: self.session_id()?,
            object_id: self.object_id,
            instance_id: instance_override.unwrap_or(self.instance_id),
        })
    }

    pub fn header_to_master(&self) -> Result<ObjectHeader> {
        self.header(Some(INSTANCE_ANY))
    }

    pub fn send(&self, node: &NodeRef, packet: Packet) -> Result<()> {
        node.send(packet)
    }
}

/// A replicated, versioned entity exchanging packets with its peers through
/// the owning node.
pub trait DistributedObject {
    fn object_id(&self) -> ObjectId;
    fn instance_id(&self) -> u32;
    fn version(&self) -> u32;

    /// Bind this replica to `session` and register its command handlers.
    fn attach_to_session(self: Arc<Self>, session: Arc<Session>) -> Result<()>;

    /// Serialize the full replica state.
    fn get_instance_data(&self) -> Vec<u8>;
    fn apply_instance_data(&self, data: &[u8]) -> Result<()>;

    /// Serialize only the replicated-from-master subset.
    fn pack(&self) -> Vec<u8>;
    fn unpack(&self, data: &[u8]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_version_is_the_value_after_none() {
        let state = ObjectState::new(1, 0);
        assert_eq!(state.version(), VERSION_NONE);
        let v = state.advance_version();
        assert_eq!(v, INITIAL_VERSION);
        assert_eq!(state.version(), INITIAL_VERSION);
    }

    #[test]
    fn header_requires_attachment() {
        let state = ObjectState::new(1, 0);
        assert!(state.header(None).is_err());
    }
}
