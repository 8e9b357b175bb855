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

//! Processing units for the space-based core
//!
//! Domain tuples (inventory items, orders, low-stock alerts), the
//! [`ProcessingUnit`] framework with its [`UnitHost`] lifecycle, and the two
//! concrete units: the order pipeline and the inventory monitor.

#![warn(clippy::all)]

pub mod inventory;
pub mod inventory_unit;
pub mod order;
pub mod order_unit;
pub mod payment;
pub mod unit;

pub use inventory::{InventoryError, InventoryItem, InventoryReport, LowStockAlert};
pub use inventory_unit::{InventoryConfig, InventoryProcessingUnit, INVENTORY_UNIT_NAME};
pub use order::{Order, OrderError, OrderItem, OrderStatus};
pub use order_unit::{requested_quantities, validate_order, OrderProcessingUnit, ORDER_UNIT_NAME};
pub use payment::{
    CompensationPolicy, PaymentConfig, PaymentGateway, PaymentOutcome, SimulatedPaymentGateway,
};
pub use unit::{BacklogSweep, ProcessOutcome, ProcessingError, ProcessingUnit, UnitHost, UnitState};
