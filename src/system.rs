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

//! # SpaceBased System
//!
//! ## Purpose
//! Wires one space, the middleware, and the two domain units together from a
//! [`SpaceBasedConfig`]. This is the usual entry point for applications and
//! the CLI demo.
//!
//! ## Examples
//! ```rust,ignore
//! use spacebased::{SpaceBasedConfig, SpaceBasedSystemBuilder};
//!
//! let system = SpaceBasedSystemBuilder::new()
//!     .with_config(SpaceBasedConfig::from_env_or_default()?)
//!     .build()
//!     .await?;
//! system.start().await?;
//! ```

use spacebased_middleware::{Middleware, MiddlewareError, Placement};
use spacebased_processing::{
    InventoryItem, InventoryProcessingUnit, InventoryReport, Order, OrderProcessingUnit,
    PaymentGateway, ProcessingError, SimulatedPaymentGateway,
};
use spacebased_tuplespace::{Query, SpaceStorage, SpaceTuple, TupleSpace, TupleSpaceError};
use std::sync::Arc;
use tracing::info;

use crate::config::{ConfigError, SpaceBasedConfig};

/// Builder for [`SpaceBasedSystem`]
#[derive(Default)]
pub struct SpaceBasedSystemBuilder {
    config: SpaceBasedConfig,
    gateway: Option<Arc<dyn PaymentGateway>>,
    storage: Option<Arc<dyn SpaceStorage>>,
}

impl SpaceBasedSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: SpaceBasedConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `gateway` instead of the simulated one
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Use `storage` instead of the in-memory store
    pub fn with_storage(mut self, storage: Arc<dyn SpaceStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Validate the configuration and register the units (not started)
    pub async fn build(self) -> Result<SpaceBasedSystem, SystemError> {
        let config = self.config;
        config.validate()?;

        let space = Arc::new(match self.storage {
            Some(storage) => TupleSpace::with_storage(config.space_name.clone(), storage),
            None => TupleSpace::new(config.space_name.clone()),
        });
        let gateway = self
            .gateway
            .unwrap_or_else(|| Arc::new(SimulatedPaymentGateway::new(&config.payment)));

        let inventory = Arc::new(InventoryProcessingUnit::new(config.inventory.clone()));
        let orders = Arc::new(OrderProcessingUnit::new(gateway, config.payment.clone()));

        let middleware = Middleware::new(config.cluster.node_count);
        middleware.initialize(space.clone()).await?;
        middleware.register_processing_unit(inventory.clone()).await?;
        middleware.register_processing_unit(orders.clone()).await?;

        info!(
            space = %config.space_name,
            nodes = config.cluster.node_count,
            threshold = config.inventory.low_stock_threshold,
            compensation = ?config.payment.compensation,
            "system built"
        );

        Ok(SpaceBasedSystem {
            config,
            space,
            middleware,
            orders,
            inventory,
        })
    }
}

/// One space, its middleware and the order and inventory units
pub struct SpaceBasedSystem {
    config: SpaceBasedConfig,
    space: Arc<TupleSpace>,
    middleware: Middleware,
    orders: Arc<OrderProcessingUnit>,
    inventory: Arc<InventoryProcessingUnit>,
}

impl SpaceBasedSystem {
    pub fn config(&self) -> &SpaceBasedConfig {
        &self.config
    }

    pub fn space(&self) -> &Arc<TupleSpace> {
        &self.space
    }

    pub fn middleware(&self) -> &Middleware {
        &self.middleware
    }

    /// Start all units; returns the backlog processed
    pub async fn start(&self) -> Result<usize, SystemError> {
        Ok(self.middleware.start_processing_units().await?)
    }

    /// Stop all units
    pub async fn stop(&self) -> Result<(), SystemError> {
        Ok(self.middleware.stop_processing_units().await?)
    }

    /// Write an inventory item; returns its id
    pub async fn add_inventory(&self, item: &InventoryItem) -> Result<String, SystemError> {
        Ok(self.space.write_tuple(item).await?)
    }

    /// Write an order and place the processed result on the cluster
    ///
    /// Units react inline, so by the time this returns the order has reached
    /// an outcome (when the units are running). The stored result is
    /// partitioned by customer id.
    pub async fn place_order(&self, order: &Order) -> Result<(String, Placement), SystemError> {
        let id = self.space.write_tuple(order).await?;
        let processed = self.space.fetch(&id).await?;
        let placement = self.middleware.partition_data(processed, &order.customer_id).await?;
        Ok((id, placement))
    }

    /// Current state of an order
    pub async fn order(&self, id: &str) -> Result<Option<Order>, SystemError> {
        Ok(self.space.read_tuple(Query::id(id)).await?)
    }

    /// Current state of an inventory item
    pub async fn inventory_item(&self, id: &str) -> Result<Option<InventoryItem>, SystemError> {
        Ok(self.space.read_tuple(Query::id(id)).await?)
    }

    pub async fn inventory_report(&self) -> Result<InventoryReport, SystemError> {
        Ok(self.inventory.generate_inventory_report(&self.space).await?)
    }

    pub async fn restock(&self, product_id: &str, amount: u64) -> Result<usize, SystemError> {
        Ok(self.inventory.restock_item(&self.space, product_id, amount).await?)
    }

    pub async fn retry_pending_payments(&self) -> Result<usize, SystemError> {
        Ok(self.orders.retry_pending_payments(&self.space).await?)
    }

    /// Number of orders in every status, in first-seen order
    pub async fn order_status_counts(&self) -> Result<Vec<(String, usize)>, SystemError> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for tuple in self.space.read_all(Some(&Order::kind_template())).await?.into_values() {
            let status = tuple
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or("unknown")
                .to_string();
            match counts.iter_mut().find(|(s, _)| *s == status) {
                Some((_, count)) => *count += 1,
                None => counts.push((status, 1)),
            }
        }
        Ok(counts)
    }
}

/// System errors
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Space error: {0}")]
    Space(#[from] TupleSpaceError),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Middleware error: {0}")]
    Middleware(#[from] MiddlewareError),
}
