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

//! Inventory tuples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spacebased_tuplespace::{SpaceTuple, Template, TupleHeader};

/// Stock record for one product
///
/// `product_id` is expected to be unique per SKU, but the space does not enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(flatten)]
    header: TupleHeader,
    pub product_id: String,
    pub name: String,
    price: f64,
    quantity: u64,
    #[serde(default)]
    pub description: String,
}

impl InventoryItem {
    /// Create an item with a generated id
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        quantity: u64,
    ) -> Result<Self, InventoryError> {
        Self::with_header(TupleHeader::new(), product_id, name, price, quantity)
    }

    /// Create an item under an explicit id
    pub fn with_header(
        header: TupleHeader,
        product_id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        quantity: u64,
    ) -> Result<Self, InventoryError> {
        if !price.is_finite() || price < 0.0 {
            return Err(InventoryError::InvalidPrice(price));
        }
        Ok(InventoryItem {
            header,
            product_id: product_id.into(),
            name: name.into(),
            price,
            quantity,
            description: String::new(),
        })
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Unit price
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Units in stock
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Value of the stock on hand
    pub fn stock_value(&self) -> f64 {
        self.price * self.quantity as f64
    }

    /// Add stock
    pub fn increase_quantity(&mut self, amount: u64) {
        self.quantity = self.quantity.saturating_add(amount);
    }

    /// Remove stock; returns false and leaves the quantity unchanged when
    /// `amount` exceeds what is on hand
    pub fn decrease_quantity(&mut self, amount: u64) -> bool {
        match self.quantity.checked_sub(amount) {
            Some(remaining) => {
                self.quantity = remaining;
                true
            }
            None => false,
        }
    }

    /// Template selecting inventory items for `product_id`
    pub fn product_template(product_id: &str) -> Template {
        Self::kind_template().with_field("product_id", product_id)
    }
}

impl SpaceTuple for InventoryItem {
    const KIND: &'static str = "inventory_item";

    fn header(&self) -> &TupleHeader {
        &self.header
    }
}

/// Side-channel notification written when stock drops to the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockAlert {
    #[serde(flatten)]
    header: TupleHeader,
    pub product_id: String,
    pub name: String,
    pub quantity: u64,
    pub threshold: u64,
    pub timestamp: DateTime<Utc>,
}

impl LowStockAlert {
    /// Alert for `item` against `threshold`
    pub fn for_item(item: &InventoryItem, threshold: u64) -> Self {
        LowStockAlert {
            header: TupleHeader::new(),
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            quantity: item.quantity(),
            threshold,
            timestamp: Utc::now(),
        }
    }
}

impl SpaceTuple for LowStockAlert {
    const KIND: &'static str = "low_stock_alert";

    fn header(&self) -> &TupleHeader {
        &self.header
    }
}

/// Aggregate view over every inventory item in the space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryReport {
    /// Number of inventory records
    pub total_items: usize,
    /// Units across all records
    pub total_units: u64,
    /// Σ price × quantity
    pub total_value: f64,
    /// Items at or below the low-stock threshold
    pub low_stock: Vec<InventoryItem>,
    /// Threshold the report was computed with
    pub threshold: u64,
}

/// Inventory construction errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InventoryError {
    /// Price was negative or not a number
    #[error("Invalid price: {0}")]
    InvalidPrice(f64),
}
