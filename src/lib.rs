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

//! SpaceBased: a space-based architecture core
//!
//! - [`tuplespace`]: the shared associative store and its event hooks
//! - [`processing`]: processing units, the order pipeline and inventory monitor
//! - [`middleware`]: unit orchestration and simulated node placement
//!
//! [`SpaceBasedSystemBuilder`] wires them together from a [`SpaceBasedConfig`].

#![warn(rustdoc::missing_crate_level_docs)]

pub use spacebased_middleware as middleware;
pub use spacebased_processing as processing;
pub use spacebased_tuplespace as tuplespace;

pub mod config;
pub mod system;
pub mod tracing_setup;

pub use config::{ClusterConfig, ConfigError, SpaceBasedConfig};
pub use middleware::{ClusterSnapshot, Middleware, MiddlewareError, Placement};
pub use processing::{
    CompensationPolicy, InventoryItem, Order, OrderItem, OrderStatus, PaymentGateway, PaymentOutcome,
    ProcessingUnit,
};
pub use system::{SpaceBasedSystem, SpaceBasedSystemBuilder, SystemError};
pub use tuplespace::{Query, SpaceEventKind, Template, TupleSpace, TupleSpaceError};
