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

//! Inventory processing unit
//!
//! Watches every inventory write and raises a `low_stock_alert` tuple when the
//! quantity is at or below the threshold. Alerts for a product stay open while
//! it is low and are cleared once a write lifts it above the threshold, so the
//! next drop alerts again. Re-processing an item whose newest open alert
//! already reports its quantity (a backlog sweep after restart) writes nothing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spacebased_tuplespace::{SpaceTuple, Template, TupleSpace, TupleSpaceError};
use tracing::{debug, info, warn};

use crate::inventory::{InventoryItem, InventoryReport, LowStockAlert};
use crate::unit::{ProcessOutcome, ProcessingError, ProcessingUnit};

/// Default registry name
pub const INVENTORY_UNIT_NAME: &str = "inventory-processor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Alert when quantity is at or below this
    pub low_stock_threshold: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        InventoryConfig {
            low_stock_threshold: 5,
        }
    }
}

pub struct InventoryProcessingUnit {
    name: String,
    config: InventoryConfig,
}

impl Default for InventoryProcessingUnit {
    fn default() -> Self {
        Self::new(InventoryConfig::default())
    }
}

impl InventoryProcessingUnit {
    pub fn new(config: InventoryConfig) -> Self {
        Self::with_name(INVENTORY_UNIT_NAME, config)
    }

    pub fn with_name(name: impl Into<String>, config: InventoryConfig) -> Self {
        InventoryProcessingUnit {
            name: name.into(),
            config,
        }
    }

    pub fn threshold(&self) -> u64 {
        self.config.low_stock_threshold
    }

    /// Write an alert for `item` if it is low, or clear its alerts if it is not
    ///
    /// Returns the alert written, if any.
    pub async fn check_low_stock(
        &self,
        space: &TupleSpace,
        item: &InventoryItem,
    ) -> Result<Option<Value>, ProcessingError> {
        let threshold = self.threshold();
        let open = LowStockAlert::kind_template().with_field("product_id", item.product_id.as_str());

        if item.quantity() > threshold {
            let cleared = space.take_all(Some(&open)).await?;
            if !cleared.is_empty() {
                info!(product_id = %item.product_id, quantity = item.quantity(), cleared = cleared.len(), "stock recovered");
            }
            return Ok(None);
        }

        let newest = space.read_all(Some(&open)).await?.into_values().last();
        if newest.is_some_and(|alert| alert["quantity"] == item.quantity()) {
            debug!(product_id = %item.product_id, quantity = item.quantity(), "low stock already alerted");
            return Ok(None);
        }

        let alert = LowStockAlert::for_item(item, threshold);
        let value = alert.to_value()?;
        space.write_tuple(&alert).await?;
        warn!(
            product_id = %item.product_id,
            name = %item.name,
            quantity = item.quantity(),
            threshold,
            "low stock"
        );
        Ok(Some(value))
    }

    /// Aggregate over every inventory item in the space
    pub async fn generate_inventory_report(&self, space: &TupleSpace) -> Result<InventoryReport, ProcessingError> {
        let items: Vec<InventoryItem> = space.read_all_tuples(None).await?;
        let threshold = self.threshold();
        Ok(InventoryReport {
            total_items: items.len(),
            total_units: items.iter().map(InventoryItem::quantity).sum(),
            total_value: items.iter().map(InventoryItem::stock_value).sum(),
            low_stock: items
                .iter()
                .filter(|item| item.quantity() <= threshold)
                .cloned()
                .collect(),
            threshold,
        })
    }

    /// Add `amount` units to every item for `product_id`
    ///
    /// Each updated item is written back (and so re-checked for low stock).
    /// Returns how many items were updated.
    ///
    /// ## Errors
    /// `TupleNotFound` when no item has that product id.
    pub async fn restock_item(
        &self,
        space: &TupleSpace,
        product_id: &str,
        amount: u64,
    ) -> Result<usize, ProcessingError> {
        let matches = space
            .read_all(Some(&InventoryItem::product_template(product_id)))
            .await?;
        if matches.is_empty() {
            return Err(TupleSpaceError::TupleNotFound(product_id.to_string()).into());
        }

        let mut updated = 0;
        for (id, value) in matches {
            let mut item = InventoryItem::from_entry(&id, value)?;
            item.increase_quantity(amount);
            space.write_with_id(id, item.to_value()?).await?;
            updated += 1;
        }
        info!(%product_id, amount, updated, "inventory restocked");
        Ok(updated)
    }
}

#[async_trait]
impl ProcessingUnit for InventoryProcessingUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn interest(&self) -> Template {
        InventoryItem::kind_template()
    }

    async fn process(
        &self,
        space: &TupleSpace,
        id: &str,
        tuple: Value,
    ) -> Result<ProcessOutcome, ProcessingError> {
        let item = InventoryItem::from_entry(id, tuple)?;
        Ok(match self.check_low_stock(space, &item).await? {
            Some(alert) => ProcessOutcome::Derived(vec![alert]),
            None => ProcessOutcome::Skipped,
        })
    }
}
