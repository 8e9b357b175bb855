// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of SpaceBased.
//
// SpaceBased is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// SpaceBased is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with SpaceBased. If not, see <https://www.gnu.org/licenses/>.

//! Simulated cluster nodes
//!
//! A node is a logical partition inside one process: an id, a status and the
//! data items placed on it. Nothing here crosses a process boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Node availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Receives replicated and partitioned data
    Active,
    /// Administratively out of rotation; keeps its data
    Inactive,
    /// Failed; its data has been drained to the active nodes
    Failed,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Active => write!(f, "active"),
            NodeStatus::Inactive => write!(f, "inactive"),
            NodeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A logical node and the items placed on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: String,
    status: NodeStatus,
    data: Vec<Value>,
}

impl Node {
    /// New active, empty node
    pub fn new(id: impl Into<String>) -> Self {
        Node {
            id: id.into(),
            status: NodeStatus::Active,
            data: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    pub fn data(&self) -> &[Value] {
        &self.data
    }

    pub(crate) fn set_status(&mut self, status: NodeStatus) {
        self.status = status;
    }

    pub(crate) fn push(&mut self, item: Value) {
        self.data.push(item);
    }

    pub(crate) fn drain(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.data)
    }
}
