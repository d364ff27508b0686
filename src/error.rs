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

//! Error kinds for the cluster-sync core.

use thiserror::Error;

use crate::node::NodeId;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced across the crate's public API.
///
/// `PreconditionViolation` covers programming errors reachable only through
/// misuse of the public API (unattached objects, zero-height barriers);
/// `TransportFailure` wraps whatever the `Node::send` collaborator returned;
/// `ProtocolViolation` covers malformed or unrecognized incoming packets.
#[derive(Error, Debug)]
pub enum Error {
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("transport failure sending to node {node}: {source}")]
    TransportFailure {
        node: NodeId,
        #[source]
        source: BoxedError,
    },

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl Error {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Error::PreconditionViolation(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::ProtocolViolation(msg.into())
    }

    pub fn transport(node: NodeId, source: impl Into<BoxedError>) -> Self {
        Error::TransportFailure {
            node,
            source: source.into(),
        }
    }
}
