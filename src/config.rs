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

//! Dispatcher configuration.
//!
//! A `serde`+`toml`-deserializable struct with `#[serde(default = ...)]`
//! fields and a `Default` impl that goes through an empty TOML document so
//! defaults live in one place.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Soft capacity hint for a session's command queue; the queue itself
    /// never refuses a push, this only feeds a `tracing::warn!` once
    /// exceeded.
    #[serde(default = "default::command_queue_capacity")]
    pub command_queue_capacity: usize,

    /// Soft capacity hint for the per-object redispatch side-park list.
    #[serde(default = "default::redispatch_park_capacity")]
    pub redispatch_park_capacity: usize,

    /// Number of consecutive wake cycles in which only redispatchable items
    /// remained and nothing changed before the dispatcher logs a warning.
    /// Diagnostic aid for a stuck early arrival, not a correctness
    /// mechanism.
    #[serde(default = "default::stalled_wake_warning_threshold")]
    pub stalled_wake_warning_threshold: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty document parses against all-default fields")
    }
}

impl DispatcherConfig {
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::precondition(format!(
                "failed to read dispatcher config '{}': {e}",
                path.display()
            ))
        })?;
        toml::from_str(&raw)
            .map_err(|e| Error::precondition(format!("invalid dispatcher config: {e}")))
    }
}

mod default {
    pub fn command_queue_capacity() -> usize {
        1024
    }

    pub fn redispatch_park_capacity() -> usize {
        256
    }

    pub fn stalled_wake_warning_threshold() -> u32 {
        64
    }
}
