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

//! Middleware for the space-based core
//!
//! Orchestrates processing unit lifecycles against a shared tuple space and
//! simulates multi-node placement (replication, hash partitioning, failover)
//! inside one process.

#![warn(clippy::all)]

pub mod middleware;
pub mod node;

pub use middleware::{ClusterSnapshot, Middleware, MiddlewareError, NodeSnapshot, Placement, UnitSnapshot};
pub use node::{Node, NodeStatus};
