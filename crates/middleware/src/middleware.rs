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

//! Middleware: processing unit orchestration and node placement
//!
//! ## Purpose
//! Sits above the space for lifecycle and placement concerns. It is not on the
//! per-tuple reaction path: units react to space events directly once started.
//!
//! ## Design
//! - **Units**: registered by name in registration order. Re-registering a name
//!   stops the previous unit and replaces it in place.
//! - **Nodes**: an explicit in-process simulation. `replicate_data` appends to
//!   every active node, `partition_data` hashes the key onto one node (ring
//!   fallback to the next active node), `handle_node_failure` drains a node and
//!   re-replicates its items. There is no network, consensus or rebalancing.
//! - **Hashing**: `DefaultHasher` over the key; stable for a given build and
//!   node set, not across Rust releases.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use spacebased_processing::{ProcessingError, ProcessingUnit, UnitHost, UnitState};
use spacebased_tuplespace::TupleSpace;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::node::{Node, NodeStatus};

/// Where `partition_data` placed an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// The hashed node was active
    Primary(String),
    /// The hashed node was not active; the next active node in ring order took it
    Fallback(String),
    /// No node was active; replicated to this many nodes (always 0 today)
    Replicated(usize),
}

/// Unit name and state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub name: String,
    pub state: UnitState,
}

/// Node summary without its data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: String,
    pub status: NodeStatus,
    pub items: usize,
}

/// Point-in-time view of the middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub space: Option<String>,
    pub units: Vec<UnitSnapshot>,
    pub nodes: Vec<NodeSnapshot>,
    pub total_items: usize,
}

/// Middleware errors
#[derive(Debug, thiserror::Error)]
pub enum MiddlewareError {
    /// Unknown node id
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Node id already in use
    #[error("Node already exists: {0}")]
    DuplicateNode(String),

    /// Placement requested with no nodes configured
    #[error("No nodes configured")]
    NoNodes,

    /// Unit registered before the middleware was bound to a space
    #[error("Processing unit not initialized: {0}")]
    UnitNotInitialized(String),

    /// Unit lifecycle failure
    #[error("Processing unit error: {0}")]
    Unit(#[from] ProcessingError),
}

/// Unit orchestration plus simulated node placement
pub struct Middleware {
    space: RwLock<Option<Arc<TupleSpace>>>,
    units: RwLock<Vec<UnitHost>>,
    nodes: RwLock<Vec<Node>>,
}

impl Default for Middleware {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Middleware {
    /// Middleware with `node_count` active nodes named `node-0..`
    pub fn new(node_count: usize) -> Self {
        Self::with_nodes((0..node_count).map(|i| format!("node-{}", i)))
    }

    /// Middleware with explicitly named nodes (duplicates are skipped)
    pub fn with_nodes<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut nodes: Vec<Node> = Vec::new();
        for id in ids {
            let id = id.into();
            if !nodes.iter().any(|n| n.id() == id) {
                nodes.push(Node::new(id));
            }
        }
        Middleware {
            space: RwLock::new(None),
            units: RwLock::new(Vec::new()),
            nodes: RwLock::new(nodes),
        }
    }

    /// Bind the space; already registered (stopped) units are rebound to it
    pub async fn initialize(&self, space: Arc<TupleSpace>) -> Result<(), MiddlewareError> {
        let mut units = self.units.write().await;
        for host in units.iter_mut() {
            host.initialize(space.clone())?;
        }
        info!(space = %space.name(), units = units.len(), "middleware initialized");
        *self.space.write().await = Some(space);
        Ok(())
    }

    /// The bound space
    pub async fn space(&self) -> Option<Arc<TupleSpace>> {
        self.space.read().await.clone()
    }

    // ========================================================================
    // Processing units
    // ========================================================================

    /// Register `unit` and bind it to the space
    ///
    /// A unit with the same name is stopped and replaced in place. The new
    /// unit is not started; call [`Middleware::start_processing_units`].
    pub async fn register_processing_unit(&self, unit: Arc<dyn ProcessingUnit>) -> Result<(), MiddlewareError> {
        let name = unit.name().to_string();
        let space = self
            .space()
            .await
            .ok_or_else(|| MiddlewareError::UnitNotInitialized(name.clone()))?;

        let mut host = UnitHost::new(unit);
        host.initialize(space)?;

        let mut units = self.units.write().await;
        match units.iter_mut().find(|h| h.name() == name) {
            Some(existing) => {
                existing.stop().await?;
                *existing = host;
                info!(unit = %name, "processing unit replaced");
            }
            None => {
                units.push(host);
                info!(unit = %name, "processing unit registered");
            }
        }
        Ok(())
    }

    /// Start every unit in registration order
    ///
    /// Returns the number of backlog tuples processed. Every unit is started
    /// even if an earlier one fails; the first failure is returned. Each
    /// unit's backlog sweep runs with the registry unlocked, so units may call
    /// back into the middleware while processing.
    pub async fn start_processing_units(&self) -> Result<usize, MiddlewareError> {
        let registered = self.units.read().await.len();
        let mut processed = 0;
        let mut first_error = None;
        for index in 0..registered {
            let (name, activated) = {
                let mut units = self.units.write().await;
                let Some(host) = units.get_mut(index) else {
                    break;
                };
                (host.name().to_string(), host.activate().await)
            };
            let swept = match activated {
                Ok(Some(sweep)) => sweep.run().await,
                Ok(None) => Ok(0),
                Err(e) => Err(e),
            };
            match swept {
                Ok(count) => processed += count,
                Err(e) => {
                    error!(unit = %name, error = %e, "processing unit failed to start cleanly");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(processed),
        }
    }

    /// Stop every unit in registration order
    pub async fn stop_processing_units(&self) -> Result<(), MiddlewareError> {
        let mut units = self.units.write().await;
        for host in units.iter_mut() {
            host.stop().await?;
        }
        Ok(())
    }

    /// Registered unit names in registration order
    pub async fn unit_names(&self) -> Vec<String> {
        self.units.read().await.iter().map(|h| h.name().to_string()).collect()
    }

    /// State of the named unit
    pub async fn unit_state(&self, name: &str) -> Option<UnitState> {
        self.units
            .read()
            .await
            .iter()
            .find(|h| h.name() == name)
            .map(UnitHost::state)
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Add an active, empty node
    pub async fn add_node(&self, id: impl Into<String>) -> Result<(), MiddlewareError> {
        let id = id.into();
        let mut nodes = self.nodes.write().await;
        if nodes.iter().any(|n| n.id() == id) {
            return Err(MiddlewareError::DuplicateNode(id));
        }
        info!(node = %id, "node added");
        nodes.push(Node::new(id));
        Ok(())
    }

    /// Append `data` to every active node; returns how many received it
    pub async fn replicate_data(&self, data: Value) -> usize {
        replicate(&mut self.nodes.write().await, &data)
    }

    /// Place `data` on one node chosen by hashing `key`
    ///
    /// `hash(key) mod node_count` picks the primary. An inactive primary falls
    /// back to the next active node in ring order; with no active node at all
    /// the item is replicated (to nobody).
    pub async fn partition_data(&self, data: Value, key: &str) -> Result<Placement, MiddlewareError> {
        let mut nodes = self.nodes.write().await;
        if nodes.is_empty() {
            return Err(MiddlewareError::NoNodes);
        }

        let primary = (hash_key(key) % nodes.len() as u64) as usize;
        let target = (0..nodes.len())
            .map(|offset| (primary + offset) % nodes.len())
            .find(|&index| nodes[index].is_active());

        let placement = match target {
            Some(index) => {
                nodes[index].push(data);
                let id = nodes[index].id().to_string();
                if index == primary {
                    Placement::Primary(id)
                } else {
                    Placement::Fallback(id)
                }
            }
            None => {
                warn!(%key, "no active node for partition; replicating");
                Placement::Replicated(replicate(&mut nodes, &data))
            }
        };
        Ok(placement)
    }

    /// Mark `node_id` failed and re-replicate its items to the active nodes
    ///
    /// Items that were partitioned onto the failed node end up on every active
    /// node. Returns the number of items drained.
    pub async fn handle_node_failure(&self, node_id: &str) -> Result<usize, MiddlewareError> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .iter_mut()
            .find(|n| n.id() == node_id)
            .ok_or_else(|| MiddlewareError::NodeNotFound(node_id.to_string()))?;
        node.set_status(NodeStatus::Failed);
        let drained = node.drain();

        let mut copies = 0;
        for item in &drained {
            copies += replicate(&mut nodes, item);
        }
        warn!(node = %node_id, drained = drained.len(), copies, "node failed; data redistributed");
        Ok(drained.len())
    }

    /// Put a node back into rotation (no rebalancing)
    pub async fn activate_node(&self, node_id: &str) -> Result<(), MiddlewareError> {
        self.set_node_status(node_id, NodeStatus::Active).await
    }

    /// Take a node out of rotation; it keeps its data
    pub async fn deactivate_node(&self, node_id: &str) -> Result<(), MiddlewareError> {
        self.set_node_status(node_id, NodeStatus::Inactive).await
    }

    /// Copy of one node
    pub async fn node(&self, node_id: &str) -> Option<Node> {
        self.nodes.read().await.iter().find(|n| n.id() == node_id).cloned()
    }

    /// Copy of every node, in creation order
    pub async fn nodes(&self) -> Vec<Node> {
        self.nodes.read().await.clone()
    }

    /// Items held by one node
    pub async fn node_data(&self, node_id: &str) -> Result<Vec<Value>, MiddlewareError> {
        self.node(node_id)
            .await
            .map(|n| n.data().to_vec())
            .ok_or_else(|| MiddlewareError::NodeNotFound(node_id.to_string()))
    }

    /// Items held across all nodes (replicas counted per node)
    pub async fn total_items(&self) -> usize {
        self.nodes.read().await.iter().map(|n| n.data().len()).sum()
    }

    /// Units, nodes and item counts
    pub async fn snapshot(&self) -> ClusterSnapshot {
        let space = self.space().await.map(|s| s.name().to_string());
        let units = self
            .units
            .read()
            .await
            .iter()
            .map(|h| UnitSnapshot {
                name: h.name().to_string(),
                state: h.state(),
            })
            .collect();
        let nodes: Vec<NodeSnapshot> = self
            .nodes
            .read()
            .await
            .iter()
            .map(|n| NodeSnapshot {
                id: n.id().to_string(),
                status: n.status(),
                items: n.data().len(),
            })
            .collect();
        let total_items = nodes.iter().map(|n| n.items).sum();
        ClusterSnapshot {
            space,
            units,
            nodes,
            total_items,
        }
    }

    async fn set_node_status(&self, node_id: &str, status: NodeStatus) -> Result<(), MiddlewareError> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .iter_mut()
            .find(|n| n.id() == node_id)
            .ok_or_else(|| MiddlewareError::NodeNotFound(node_id.to_string()))?;
        node.set_status(status);
        info!(node = %node_id, %status, "node status changed");
        Ok(())
    }
}

fn replicate(nodes: &mut [Node], data: &Value) -> usize {
    let mut count = 0;
    for node in nodes.iter_mut().filter(|n| n.is_active()) {
        node.push(data.clone());
        count += 1;
    }
    count
}

/// Hash key for partitioning
fn hash_key(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}
