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

//! End-to-end behaviour of the assembled system

use async_trait::async_trait;
use serde_json::json;
use spacebased::processing::LowStockAlert;
use spacebased::tuplespace::SpaceTuple;
use spacebased::{
    InventoryItem, Order, OrderItem, OrderStatus, PaymentGateway, PaymentOutcome, Query,
    SpaceBasedConfig, SpaceBasedSystem, SpaceBasedSystemBuilder, TupleSpace,
};
use std::sync::Arc;

struct FixedGateway(fn(&str) -> PaymentOutcome);

#[async_trait]
impl PaymentGateway for FixedGateway {
    async fn charge(&self, order_id: &str, _amount: f64) -> PaymentOutcome {
        (self.0)(order_id)
    }
}

async fn running(config: SpaceBasedConfig) -> SpaceBasedSystem {
    let system = SpaceBasedSystemBuilder::new().with_config(config).build().await.unwrap();
    system.start().await.unwrap();
    system
}

#[tokio::test]
async fn test_round_trip_take_and_subset_matching() {
    let space = TupleSpace::default();
    let tuple = json!({"a": 1, "b": 2, "nested": {"x": [1, 2]}});
    space.write_with_id("t1", tuple.clone()).await.unwrap();
    assert_eq!(space.read(Query::id("t1")).await.unwrap(), Some(tuple.clone()));

    assert!(space.exists(spacebased::Template::new(json!({"a": 1})).unwrap()).await.unwrap());
    assert!(!space.exists(spacebased::Template::new(json!({"a": 1, "c": 3})).unwrap()).await.unwrap());

    assert_eq!(space.take(Query::id("t1")).await.unwrap(), Some(tuple));
    assert_eq!(space.take(Query::id("t1")).await.unwrap(), None);
    assert_eq!(space.read(Query::id("t1")).await.unwrap(), None);
}

#[tokio::test]
async fn test_sufficient_stock_never_ends_out_of_stock() {
    // Random gateway: either outcome is acceptable
    for seed in 0..5 {
        let mut config = SpaceBasedConfig::default();
        config.payment.seed = Some(seed);
        let system = running(config).await;

        let item_id = system
            .add_inventory(&InventoryItem::new("P1", "Widget", 5.0, 1).unwrap())
            .await
            .unwrap();
        let (order_id, _) = system
            .place_order(&Order::new("C1", vec![OrderItem::new("P1", 5.0, 1)]))
            .await
            .unwrap();

        let order = system.order(&order_id).await.unwrap().unwrap();
        assert!(
            matches!(order.status(), OrderStatus::Completed | OrderStatus::PaymentFailed),
            "unexpected status {}",
            order.status()
        );
        let item = system.inventory_item(&item_id).await.unwrap().unwrap();
        assert_eq!(item.quantity(), 0);

        let alerts: Vec<LowStockAlert> = system.space().read_all_tuples(None).await.unwrap();
        assert!(alerts.iter().any(|a| a.product_id == "P1" && a.quantity == 0 && a.threshold == 5));
    }
}

#[tokio::test]
async fn test_oversized_order_is_out_of_stock_and_inventory_untouched() {
    let system = running(SpaceBasedConfig::default()).await;
    let item_id = system
        .add_inventory(&InventoryItem::new("P1", "Widget", 5.0, 1).unwrap())
        .await
        .unwrap();

    let (order_id, _) = system
        .place_order(&Order::new("C1", vec![OrderItem::new("P1", 5.0, 5)]))
        .await
        .unwrap();

    let order = system.order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::OutOfStock);
    assert_eq!(order.payment_attempts(), 0);
    assert_eq!(system.inventory_item(&item_id).await.unwrap().unwrap().quantity(), 1);
}

#[tokio::test]
async fn test_restock_policy_restores_inventory_after_decline() {
    let mut config = SpaceBasedConfig::default();
    config.payment.compensation = spacebased::CompensationPolicy::Restock;
    let system = SpaceBasedSystemBuilder::new()
        .with_config(config)
        .with_gateway(Arc::new(FixedGateway(|_| PaymentOutcome::Declined {
            reason: "card expired".to_string(),
        })))
        .build()
        .await
        .unwrap();
    system.start().await.unwrap();

    let item_id = system
        .add_inventory(&InventoryItem::new("P1", "Widget", 5.0, 8).unwrap())
        .await
        .unwrap();
    let (order_id, _) = system
        .place_order(&Order::new("C1", vec![OrderItem::new("P1", 5.0, 3)]))
        .await
        .unwrap();

    assert_eq!(system.order(&order_id).await.unwrap().unwrap().status(), OrderStatus::PaymentFailed);
    assert_eq!(system.inventory_item(&item_id).await.unwrap().unwrap().quantity(), 8);
}

#[tokio::test]
async fn test_orders_written_before_start_are_swept() {
    let mut config = SpaceBasedConfig::default();
    config.payment.success_rate = 1.0;
    let system = SpaceBasedSystemBuilder::new().with_config(config).build().await.unwrap();

    let item_id = system
        .add_inventory(&InventoryItem::new("P1", "Widget", 2.0, 10).unwrap())
        .await
        .unwrap();
    let order = Order::new("C1", vec![OrderItem::new("P1", 2.0, 4)]);
    let order_id = system.space().write_tuple(&order).await.unwrap();
    assert_eq!(system.order(&order_id).await.unwrap().unwrap().status(), OrderStatus::Pending);

    system.start().await.unwrap();
    assert_eq!(system.order(&order_id).await.unwrap().unwrap().status(), OrderStatus::Completed);
    assert_eq!(system.inventory_item(&item_id).await.unwrap().unwrap().quantity(), 6);

    // Restarting does not process it again
    system.stop().await.unwrap();
    system.start().await.unwrap();
    assert_eq!(system.inventory_item(&item_id).await.unwrap().unwrap().quantity(), 6);
}

#[tokio::test]
async fn test_report_and_restock() {
    let system = running(SpaceBasedConfig::default()).await;
    system
        .add_inventory(&InventoryItem::new("P1", "Widget", 2.0, 3).unwrap())
        .await
        .unwrap();
    system
        .add_inventory(&InventoryItem::new("P2", "Gadget", 10.0, 20).unwrap())
        .await
        .unwrap();

    let report = system.inventory_report().await.unwrap();
    assert_eq!(report.total_items, 2);
    assert_eq!(report.total_value, 206.0);
    assert_eq!(report.low_stock.len(), 1);

    assert_eq!(system.restock("P1", 10).await.unwrap(), 1);
    let report = system.inventory_report().await.unwrap();
    assert!(report.low_stock.is_empty());
    assert!(system.restock("P404", 1).await.is_err());
}

#[tokio::test]
async fn test_node_failure_redistributes_order_placements() {
    let mut config = SpaceBasedConfig::default();
    config.payment.success_rate = 1.0;
    config.cluster.node_count = 3;
    let system = running(config).await;
    system
        .add_inventory(&InventoryItem::new("P1", "Widget", 1.0, 100).unwrap())
        .await
        .unwrap();

    for customer in ["C1", "C2", "C3", "C4", "C5", "C6"] {
        system
            .place_order(&Order::new(customer, vec![OrderItem::new("P1", 1.0, 1)]))
            .await
            .unwrap();
    }
    let middleware = system.middleware();
    assert_eq!(middleware.total_items().await, 6);

    let held = middleware.node_data("node-1").await.unwrap().len();
    assert_eq!(middleware.handle_node_failure("node-1").await.unwrap(), held);
    assert!(middleware.node_data("node-1").await.unwrap().is_empty());
    assert_eq!(middleware.total_items().await, 6 + held);

    let kind = Order::kind_template();
    assert_eq!(system.space().count(Some(&kind)).await.unwrap(), 6);
}
