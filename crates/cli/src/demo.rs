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

//! Order/inventory demo

use anyhow::{Context, Result};
use spacebased::{
    InventoryItem, Order, OrderItem, OrderStatus, SpaceBasedConfig, SpaceBasedSystemBuilder,
};
use tracing::info;

const CATALOG: &[(&str, &str, f64, u64)] = &[
    ("P1", "Laptop", 999.99, 5),
    ("P2", "Mouse", 24.50, 20),
    ("P3", "Keyboard", 79.00, 8),
    ("P4", "Monitor", 249.00, 3),
];

pub async fn run(
    mut config: SpaceBasedConfig,
    orders: usize,
    seed: Option<u64>,
    fail_node: Option<&str>,
    json: bool,
) -> Result<()> {
    if seed.is_some() {
        config.payment.seed = seed;
    }
    let system = SpaceBasedSystemBuilder::new()
        .with_config(config)
        .build()
        .await
        .context("Failed to build system")?;
    system.start().await?;

    for (product_id, name, price, quantity) in CATALOG {
        let item = InventoryItem::new(*product_id, *name, *price, *quantity)?;
        system.add_inventory(&item).await?;
    }

    println!("📦 Placing {} orders", orders);
    for n in 0..orders {
        let (product_id, _, price, _) = CATALOG[n % CATALOG.len()];
        let quantity = (n % 3 + 1) as u64;
        let order = Order::new(format!("C{}", n % 4 + 1), vec![OrderItem::new(product_id, price, quantity)]);
        let (id, placement) = system.place_order(&order).await?;
        let outcome = system.order(&id).await?.map(|o| o.status()).unwrap_or(OrderStatus::Pending);
        println!("   {} {} x{} -> {} ({:?})", id, product_id, quantity, outcome, placement);
    }

    let parked = system.retry_pending_payments().await?;
    if parked > 0 {
        println!("💳 Settled {} parked payments", parked);
    }

    if let Some(node_id) = fail_node {
        let drained = system.middleware().handle_node_failure(node_id).await?;
        info!(node = %node_id, drained, "node failure simulated");
        println!("💥 Failed {}: {} items redistributed", node_id, drained);
    }

    println!("📊 Order outcomes");
    for (status, count) in system.order_status_counts().await? {
        println!("   {:<18} {}", status, count);
    }

    let report = system.inventory_report().await?;
    println!(
        "📋 Inventory: {} items, {} units, value {:.2}, {} at or below {}",
        report.total_items,
        report.total_units,
        report.total_value,
        report.low_stock.len(),
        report.threshold
    );
    for item in &report.low_stock {
        println!("   ⚠️  {} ({}) qty {}", item.product_id, item.name, item.quantity());
    }

    let snapshot = system.middleware().snapshot().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("🖧  Nodes");
        for node in &snapshot.nodes {
            println!("   {:<8} {:<9} {} items", node.id, node.status.to_string(), node.items);
        }
    }

    system.stop().await?;
    Ok(())
}
