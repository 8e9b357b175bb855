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

//! Order tuples
//!
//! `total_amount` is derived from the items and recomputed on every change,
//! including after decoding from the space; it has no setter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use spacebased_tuplespace::{SpaceTuple, Template, TupleHeader, TupleSpaceError};
use std::fmt;

/// Order lifecycle
///
/// `pending` → one of the outcomes. `awaiting_payment` is the only other
/// non-terminal state: inventory is held while the gateway outcome is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Invalid,
    OutOfStock,
    AwaitingPayment,
    PaymentFailed,
    Completed,
}

impl OrderStatus {
    /// Terminal statuses are never changed by the pipeline
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending | OrderStatus::AwaitingPayment)
    }

    /// Wire name (as stored in the space)
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Invalid => "invalid",
            OrderStatus::OutOfStock => "out_of_stock",
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::PaymentFailed => "payment_failed",
            OrderStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub price: f64,
    pub quantity: u64,
}

impl OrderItem {
    pub fn new(product_id: impl Into<String>, price: f64, quantity: u64) -> Self {
        OrderItem {
            product_id: product_id.into(),
            price,
            quantity,
        }
    }

    /// price × quantity
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(flatten)]
    header: TupleHeader,
    pub customer_id: String,
    items: Vec<OrderItem>,
    #[serde(default)]
    total_amount: f64,
    status: OrderStatus,
    #[serde(default)]
    payment_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
}

impl Order {
    /// New pending order with a generated id
    pub fn new(customer_id: impl Into<String>, items: Vec<OrderItem>) -> Self {
        Self::with_header(TupleHeader::new(), customer_id, items)
    }

    /// New pending order under an explicit id
    pub fn with_header(header: TupleHeader, customer_id: impl Into<String>, items: Vec<OrderItem>) -> Self {
        let mut order = Order {
            header,
            customer_id: customer_id.into(),
            items,
            total_amount: 0.0,
            status: OrderStatus::Pending,
            payment_attempts: 0,
            transaction_id: None,
            failure_reason: None,
        };
        order.recompute_total();
        order
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_attempts(&self) -> u32 {
        self.payment_attempts
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Append a line
    pub fn add_item(&mut self, item: OrderItem) {
        self.items.push(item);
        self.recompute_total();
    }

    /// Remove the first line for `product_id`
    pub fn remove_item(&mut self, product_id: &str) -> Option<OrderItem> {
        let position = self.items.iter().position(|i| i.product_id == product_id)?;
        let removed = self.items.remove(position);
        self.recompute_total();
        Some(removed)
    }

    /// Replace all lines
    pub fn set_items(&mut self, items: Vec<OrderItem>) {
        self.items = items;
        self.recompute_total();
    }

    /// Move to `next`
    ///
    /// ## Errors
    /// `InvalidTransition` from a terminal status or back to `pending`.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if self.status.is_terminal() || next == OrderStatus::Pending {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Move to a failure status and record why
    pub fn fail(&mut self, status: OrderStatus, reason: impl Into<String>) -> Result<(), OrderError> {
        self.transition(status)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// Mark the order paid
    pub fn complete(&mut self, transaction_id: impl Into<String>) -> Result<(), OrderError> {
        self.transition(OrderStatus::Completed)?;
        self.transaction_id = Some(transaction_id.into());
        self.failure_reason = None;
        Ok(())
    }

    pub(crate) fn record_payment_attempt(&mut self) {
        self.payment_attempts += 1;
    }

    /// Template selecting orders in `status`
    pub fn status_template(status: OrderStatus) -> Template {
        Self::kind_template().with_field("status", status.as_str())
    }

    fn recompute_total(&mut self) {
        self.total_amount = self.items.iter().map(OrderItem::line_total).sum();
    }
}

impl SpaceTuple for Order {
    const KIND: &'static str = "order";

    fn header(&self) -> &TupleHeader {
        &self.header
    }

    fn from_value(value: Value) -> Result<Self, TupleSpaceError> {
        let mut order: Order =
            serde_json::from_value(value).map_err(|e| TupleSpaceError::Serialization(e.to_string()))?;
        order.recompute_total();
        Ok(order)
    }
}

/// Order errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
