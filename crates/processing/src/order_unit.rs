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

//! Order processing unit
//!
//! ## Purpose
//! Reacts to `pending` orders and drives each one to an outcome:
//!
//! ```text
//! validate ──✗──> invalid
//!    │
//! check inventory ──✗──> out_of_stock      (inventory untouched)
//!    │
//! update inventory
//!    │
//! charge ──declined──> payment_failed      (restock if CompensationPolicy::Restock)
//!    │ └──unknown × max_attempts──> awaiting_payment
//!    └──approved──> completed
//! ```
//!
//! The final order is written back under its original id. That write no longer
//! matches the unit's interest (`status == pending`), so it does not re-trigger.
//!
//! ## Listener failures
//! Every write-back in the pipeline is stored before listeners run. A failing
//! downstream listener is logged and the pipeline carries on, so the order
//! always reaches a status that matches the inventory it holds.
//!
//! ## Idempotence
//! `process` re-reads the order by id and skips anything no longer pending, so
//! a tuple seen by both the backlog sweep and a write event is handled once.

use async_trait::async_trait;
use serde_json::{json, Value};
use spacebased_tuplespace::{Query, SpaceTuple, Template, TupleSpace, TupleSpaceError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::inventory::InventoryItem;
use crate::order::{Order, OrderStatus};
use crate::payment::{CompensationPolicy, PaymentConfig, PaymentGateway, PaymentOutcome};
use crate::unit::{ProcessOutcome, ProcessingError, ProcessingUnit};

/// Default registry name
pub const ORDER_UNIT_NAME: &str = "order-processor";

pub struct OrderProcessingUnit {
    name: String,
    gateway: Arc<dyn PaymentGateway>,
    config: PaymentConfig,
}

impl OrderProcessingUnit {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: PaymentConfig) -> Self {
        Self::with_name(ORDER_UNIT_NAME, gateway, config)
    }

    pub fn with_name(name: impl Into<String>, gateway: Arc<dyn PaymentGateway>, config: PaymentConfig) -> Self {
        OrderProcessingUnit {
            name: name.into(),
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Re-attempt payment for every `awaiting_payment` order
    ///
    /// Returns how many orders left `awaiting_payment`.
    pub async fn retry_pending_payments(&self, space: &TupleSpace) -> Result<usize, ProcessingError> {
        let parked = space
            .read_all(Some(&Order::status_template(OrderStatus::AwaitingPayment)))
            .await?;
        let mut settled = 0;
        for (id, value) in parked {
            let mut order = Order::from_entry(&id, value)?;
            self.settle_payment(space, &id, &mut order).await?;
            if order.status() != OrderStatus::AwaitingPayment {
                settled += 1;
            }
            write_back(space, &id, order.to_value()?).await?;
        }
        if settled > 0 {
            info!(unit = %self.name, settled, "pending payments settled");
        }
        Ok(settled)
    }

    /// Charge until approved, declined, or out of attempts
    async fn settle_payment(
        &self,
        space: &TupleSpace,
        id: &str,
        order: &mut Order,
    ) -> Result<(), ProcessingError> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_unknown = String::new();

        for _ in 0..attempts {
            order.record_payment_attempt();
            match self.gateway.charge(id, order.total_amount()).await {
                PaymentOutcome::Approved { transaction_id } => {
                    order.complete(transaction_id)?;
                    return Ok(());
                }
                PaymentOutcome::Declined { reason } => {
                    warn!(order_id = %id, %reason, "payment declined");
                    order.fail(OrderStatus::PaymentFailed, reason)?;
                    if self.config.compensation == CompensationPolicy::Restock {
                        release_inventory(space, &requested_quantities(order)).await?;
                    }
                    return Ok(());
                }
                PaymentOutcome::Unknown { reason } => {
                    warn!(order_id = %id, attempt = order.payment_attempts(), %reason, "payment outcome unknown");
                    last_unknown = reason;
                }
            }
        }

        order.fail(
            OrderStatus::AwaitingPayment,
            format!("payment outcome unknown: {}", last_unknown),
        )?;
        Ok(())
    }

    /// Mark an undecodable pending tuple invalid, keeping its raw fields
    async fn reject_malformed(
        &self,
        space: &TupleSpace,
        id: &str,
        mut raw: Value,
        reason: String,
    ) -> Result<ProcessOutcome, ProcessingError> {
        warn!(order_id = %id, %reason, "malformed order");
        if let Some(fields) = raw.as_object_mut() {
            fields.insert("status".to_string(), json!(OrderStatus::Invalid.as_str()));
            fields.insert("failure_reason".to_string(), json!(reason));
        }
        write_back(space, id, raw.clone()).await?;
        Ok(ProcessOutcome::Updated(raw))
    }
}

#[async_trait]
impl ProcessingUnit for OrderProcessingUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn interest(&self) -> Template {
        Order::status_template(OrderStatus::Pending)
    }

    async fn process(
        &self,
        space: &TupleSpace,
        id: &str,
        _tuple: Value,
    ) -> Result<ProcessOutcome, ProcessingError> {
        // The event payload may be stale if an earlier reaction already handled it
        let Some(current) = space.read(Query::id(id)).await? else {
            return Ok(ProcessOutcome::Skipped);
        };
        if !self.interest().matches(&current) {
            debug!(order_id = %id, "order no longer pending");
            return Ok(ProcessOutcome::Skipped);
        }

        let mut order = match Order::from_entry(id, current.clone()) {
            Ok(order) => order,
            Err(e) => return self.reject_malformed(space, id, current, e.to_string()).await,
        };

        if let Err(reason) = validate_order(&order) {
            order.fail(OrderStatus::Invalid, reason)?;
        } else if let Err(reason) = check_inventory(space, &order).await? {
            order.fail(OrderStatus::OutOfStock, reason)?;
        } else {
            match update_inventory(space, &order).await {
                Ok(()) => self.settle_payment(space, id, &mut order).await?,
                Err(ProcessingError::InventoryConflict { product_id, message }) => {
                    order.fail(OrderStatus::OutOfStock, format!("{}: {}", product_id, message))?;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            unit = %self.name,
            order_id = %id,
            status = %order.status(),
            total = order.total_amount(),
            "order processed"
        );
        let value = order.to_value()?;
        write_back(space, id, value.clone()).await?;
        Ok(ProcessOutcome::Updated(value))
    }
}

/// Structural checks; the error is the failure reason
pub fn validate_order(order: &Order) -> Result<(), String> {
    if order.customer_id.trim().is_empty() {
        return Err("missing customer id".to_string());
    }
    if order.items().is_empty() {
        return Err("order has no items".to_string());
    }
    for (index, item) in order.items().iter().enumerate() {
        if item.product_id.trim().is_empty() {
            return Err(format!("item {} has no product id", index));
        }
        if !item.price.is_finite() || item.price < 0.0 {
            return Err(format!("item {} has invalid price {}", index, item.price));
        }
        if item.quantity == 0 {
            return Err(format!("item {} has zero quantity", index));
        }
    }
    Ok(())
}

/// Requested units per product, in first-seen order
///
/// Lines for the same product are summed so stock is checked against the total.
pub fn requested_quantities(order: &Order) -> Vec<(String, u64)> {
    let mut totals: Vec<(String, u64)> = Vec::new();
    for item in order.items() {
        match totals.iter_mut().find(|(product_id, _)| *product_id == item.product_id) {
            Some((_, quantity)) => *quantity = quantity.saturating_add(item.quantity),
            None => totals.push((item.product_id.clone(), item.quantity)),
        }
    }
    totals
}

/// Outer error: space failure. Inner error: shortfall reason.
async fn check_inventory(space: &TupleSpace, order: &Order) -> Result<Result<(), String>, ProcessingError> {
    for (product_id, requested) in requested_quantities(order) {
        let item = space
            .read_tuple::<InventoryItem>(InventoryItem::product_template(&product_id))
            .await?;
        match item {
            None => return Ok(Err(format!("unknown product {}", product_id))),
            Some(item) if item.quantity() < requested => {
                return Ok(Err(format!(
                    "{} has {} units, {} requested",
                    product_id,
                    item.quantity(),
                    requested
                )))
            }
            Some(_) => {}
        }
    }
    Ok(Ok(()))
}

/// Decrement stock for every line
///
/// Any failure puts back what was already taken before returning.
async fn update_inventory(space: &TupleSpace, order: &Order) -> Result<(), ProcessingError> {
    let mut applied: Vec<(String, u64)> = Vec::new();
    for (product_id, requested) in requested_quantities(order) {
        let failure = match reserve(space, &product_id, requested).await {
            Ok(None) => {
                applied.push((product_id, requested));
                continue;
            }
            Ok(Some(message)) => ProcessingError::InventoryConflict { product_id, message },
            Err(e) => e,
        };

        if let Err(e) = release_inventory(space, &applied).await {
            error!(error = %e, "failed to release reserved inventory");
        }
        return Err(failure);
    }
    Ok(())
}

/// Take `requested` units of `product_id`; `Some` is the shortfall reason
async fn reserve(space: &TupleSpace, product_id: &str, requested: u64) -> Result<Option<String>, ProcessingError> {
    let Some((item_id, value)) = space
        .read_entry(InventoryItem::product_template(product_id))
        .await?
    else {
        return Ok(Some("inventory item disappeared".to_string()));
    };
    let mut item = InventoryItem::from_entry(&item_id, value)?;
    if !item.decrease_quantity(requested) {
        return Ok(Some(format!("only {} units left", item.quantity())));
    }
    write_back(space, &item_id, item.to_value()?).await?;
    Ok(None)
}

/// Add quantities back to the first inventory item of each product
async fn release_inventory(space: &TupleSpace, quantities: &[(String, u64)]) -> Result<(), ProcessingError> {
    for (product_id, quantity) in quantities {
        match space
            .read_entry(InventoryItem::product_template(product_id))
            .await?
        {
            Some((item_id, value)) => {
                let mut item = InventoryItem::from_entry(&item_id, value)?;
                item.increase_quantity(*quantity);
                write_back(space, &item_id, item.to_value()?).await?;
                debug!(%product_id, quantity, "inventory released");
            }
            None => warn!(%product_id, quantity, "cannot release inventory for missing item"),
        }
    }
    Ok(())
}

/// Store a pipeline write-back
///
/// `ListenerFailed` means the tuple was stored and only an observer failed,
/// so it is logged rather than returned.
async fn write_back(space: &TupleSpace, id: &str, value: Value) -> Result<(), ProcessingError> {
    match space.write_with_id(id, value).await {
        Ok(_) => Ok(()),
        Err(TupleSpaceError::ListenerFailed { event, tuple_id, message, .. }) => {
            warn!(%event, %tuple_id, %message, "listener failed after write-back");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
