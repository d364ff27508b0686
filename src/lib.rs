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

//! Distributed-object synchronization and cross-node barrier rendezvous for
//! a cluster rendering runtime.
//!
//! Connection I/O, node discovery, session/object-ID allocation beyond a
//! trivial in-crate counter, and wire-format primitives outside the object
//! header are external collaborators; this crate supplies the
//! dispatch, versioning, and barrier state machines built on top of them.

pub mod barrier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod node;
pub mod notifier;
pub mod object;
pub mod packet;
pub mod session;

pub use barrier::Barrier;
pub use config::DispatcherConfig;
pub use dispatch::{Dispatcher, ObjectId, QueuedCommand, Verdict};
pub use error::{Error, Result};
pub use node::{Node, NodeId, NodeRef};
pub use notifier::LeaveNotify;
pub use object::{DistributedObject, ObjectState, INITIAL_VERSION, VERSION_NONE};
pub use packet::{command, DataType, ObjectHeader, Packet, Payload, INSTANCE_ANY};
pub use session::{Session, SessionId};
