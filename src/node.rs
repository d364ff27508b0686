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

//! Node identity.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::Result;
use crate::packet::Packet;

/// Opaque 128-bit node identity, unique per live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u128);

impl NodeId {
    /// Sentinel denoting "unset".
    pub const ZERO: NodeId = NodeId(0);

    pub fn new() -> Self {
        NodeId(Uuid::new_v4().as_u128())
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    pub fn from_u128(v: u128) -> Self {
        NodeId(v)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// The collaborator interface this crate consumes for a peer connection.
/// Connection establishment and I/O are out of scope; callers
/// supply an implementation backed by whatever transport they use.
pub trait Node: Send + Sync {
    /// Transmit `packet` to this node.
    fn send(&self, packet: Packet) -> Result<()>;

    /// True exactly on the node that owns the node-object, i.e. when this
    /// `Node` handle refers to the local process.
    fn is_local(&self) -> bool;

    fn node_id(&self) -> NodeId;

    /// Resolve or establish a connection to `target`, using `server` as the
    /// rendezvous point if no connection to `target` exists yet. Called on
    /// the local node (`Session::local_node`) by a barrier replica that was
    /// only ever given `target`'s `NodeId` (e.g. a slave that learned its
    /// master's identity through `apply_instance_data` rather than being
    /// constructed with a `NodeRef` to it directly). The connection
    /// machinery itself is an external collaborator; this is only the
    /// lookup-by-id entry point the core consumes.
    fn connect(&self, target: NodeId, server: &NodeRef) -> Result<NodeRef>;
}

pub type NodeRef = Arc<dyn Node>;
