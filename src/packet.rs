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

//! The on-wire packet envelope.
//!
//! Every message starts with a fixed 16-byte header `(size: u64,
//! datatype: u32, command: u32)`, little-endian, 8-byte aligned. Object
//! packets extend the header with `(session_id, object_id, instance_id)`.
//! Rather than the source's `Packet -> NodePacket -> SessionPacket ->
//! ObjectPacket -> BarrierEnterPacket` subtype chain, this is a
//! flat, tagged `Packet` struct matched on `(datatype, command)` at the
//! dispatcher entry point.

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::node::NodeId;

const HEADER_LEN: u64 = 16;
const OBJECT_HEADER_LEN: u64 = 16; // session_id, object_id, instance_id, padding

/// Sentinel `instance_id` meaning "deliver to any replica on the receiving node".
pub const INSTANCE_ANY: u32 = u32::MAX;

/// Selects the dispatch family a packet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Node,
    Session,
    Object,
    Custom(u32),
}

impl DataType {
    const NODE: u32 = 0x00;
    const SESSION: u32 = 0x01;
    const OBJECT: u32 = 0x02;

    fn to_u32(self) -> u32 {
        match self {
            DataType::Node => Self::NODE,
            DataType::Session => Self::SESSION,
            DataType::Object => Self::OBJECT,
            DataType::Custom(v) => v,
        }
    }

    fn from_u32(v: u32) -> Self {
        match v {
            Self::NODE => DataType::Node,
            Self::SESSION => DataType::Session,
            Self::OBJECT => DataType::Object,
            other => DataType::Custom(other),
        }
    }
}

/// Fixed command codes. Must stay stable across versions.
pub mod command {
    pub const BARRIER_ENTER: u32 = 1;
    pub const BARRIER_ENTER_REPLY: u32 = 2;
}

/// The `(session_id, object_id, instance_id)` header object-scoped packets carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    pub session_id: u32,
    pub object_id: u32,
    pub instance_id: u32,
}

/// The typed payload for the two barrier commands this crate defines, plus an
/// escape hatch for opaque payloads outside this crate's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    BarrierEnter { version: u32, requestor_id: NodeId },
    BarrierEnterReply,
    Raw(Vec<u8>),
}

/// A fully-formed on-wire packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub datatype: DataType,
    pub command: u32,
    pub object: Option<ObjectHeader>,
    pub payload: Payload,
}

impl Packet {
    pub fn barrier_enter(object: ObjectHeader, version: u32, requestor_id: NodeId) -> Self {
        Packet {
            datatype: DataType::Object,
            command: command::BARRIER_ENTER,
            object: Some(object),
            payload: Payload::BarrierEnter {
                version,
                requestor_id,
            },
        }
    }

    pub fn barrier_enter_reply(object: ObjectHeader) -> Self {
        Packet {
            datatype: DataType::Object,
            command: command::BARRIER_ENTER_REPLY,
            object: Some(object),
            payload: Payload::BarrierEnterReply,
        }
    }

    fn payload_len(&self) -> u64 {
        match &self.payload {
            Payload::BarrierEnter { .. } => 24, // version(4) + pad(4) + requestor_id(16)
            Payload::BarrierEnterReply => 0,
            Payload::Raw(bytes) => bytes.len() as u64,
        }
    }

    fn total_len(&self) -> u64 {
        let mut len = HEADER_LEN;
        if self.object.is_some() {
            len += OBJECT_HEADER_LEN;
        }
        len += self.payload_len();
        len
    }

    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.total_len() as usize);
        buf.write_u64::<LittleEndian>(self.total_len())?;
        buf.write_u32::<LittleEndian>(self.datatype.to_u32())?;
        buf.write_u32::<LittleEndian>(self.command)?;

        if let Some(obj) = &self.object {
            buf.write_u32::<LittleEndian>(obj.session_id)?;
            buf.write_u32::<LittleEndian>(obj.object_id)?;
            buf.write_u32::<LittleEndian>(obj.instance_id)?;
            buf.write_u32::<LittleEndian>(0)?; // padding to 8-byte alignment
        }

        match &self.payload {
            Payload::BarrierEnter {
                version,
                requestor_id,
            } => {
                buf.write_u32::<LittleEndian>(*version)?;
                buf.write_u32::<LittleEndian>(0)?; // padding
                buf.write_u128::<LittleEndian>(requestor_id.as_u128())?;
            }
            Payload::BarrierEnterReply => {}
            Payload::Raw(bytes) => buf.write_all(bytes)?,
        }

        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let size = cursor
            .read_u64::<LittleEndian>()
            .map_err(|e| Error::protocol(format!("truncated header: {e}")))?;
        if size as usize != bytes.len() {
            return Err(Error::protocol(format!(
                "size field {size} does not match buffer length {}",
                bytes.len()
            )));
        }
        let datatype = DataType::from_u32(
            cursor
                .read_u32::<LittleEndian>()
                .map_err(|e| Error::protocol(format!("truncated datatype: {e}")))?,
        );
        let command = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::protocol(format!("truncated command: {e}")))?;

        let object = if datatype == DataType::Object {
            let session_id = read_u32(&mut cursor, "session_id")?;
            let object_id = read_u32(&mut cursor, "object_id")?;
            let instance_id = read_u32(&mut cursor, "instance_id")?;
            let _padding = read_u32(&mut cursor, "object padding")?;
            Some(ObjectHeader {
                session_id,
                object_id,
                instance_id,
            })
        } else {
            None
        };

        let payload = match (datatype, command) {
            (DataType::Object, command::BARRIER_ENTER) => {
                let version = read_u32(&mut cursor, "barrier version")?;
                let _padding = read_u32(&mut cursor, "barrier enter padding")?;
                let requestor_id = cursor
                    .read_u128::<LittleEndian>()
                    .map_err(|e| Error::protocol(format!("truncated requestor id: {e}")))?;
                Payload::BarrierEnter {
                    version,
                    requestor_id: NodeId::from_u128(requestor_id),
                }
            }
            (DataType::Object, command::BARRIER_ENTER_REPLY) => Payload::BarrierEnterReply,
            _ => {
                let mut rest = Vec::new();
                cursor
                    .read_to_end(&mut rest)
                    .map_err(|e| Error::protocol(format!("truncated payload: {e}")))?;
                Payload::Raw(rest)
            }
        };

        Ok(Packet {
            datatype,
            command,
            object,
            payload,
        })
    }
}

fn read_u32(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<u32> {
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| Error::protocol(format!("truncated {field}: {e}")))
}
