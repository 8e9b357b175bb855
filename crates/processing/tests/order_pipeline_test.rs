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

//! Order pipeline driven through space writes, with scripted payment outcomes

use async_trait::async_trait;
use serde_json::json;
use spacebased_processing::{
    CompensationPolicy, InventoryItem, InventoryProcessingUnit, LowStockAlert, Order, OrderItem,
    OrderProcessingUnit, OrderStatus, PaymentConfig, PaymentGateway, PaymentOutcome, ProcessingUnit,
    UnitHost,
};
use spacebased_tuplespace::{listener_fn, ListenerError, Query, SpaceEventKind, SpaceTuple, Template, TupleSpace};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays queued outcomes, then approves
#[derive(Default)]
struct ScriptedGateway {
    script: Mutex<VecDeque<PaymentOutcome>>,
    charges: Mutex<Vec<(String, f64)>>,
}

impl ScriptedGateway {
    fn with_script(outcomes: Vec<PaymentOutcome>) -> Arc<Self> {
        Arc::new(ScriptedGateway {
            script: Mutex::new(outcomes.into()),
            charges: Mutex::new(Vec::new()),
        })
    }

    fn push(&self, outcome: PaymentOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    fn charge_count(&self) -> usize {
        self.charges.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn charge(&self, order_id: &str, amount: f64) -> PaymentOutcome {
        self.charges.lock().unwrap().push((order_id.to_string(), amount));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| PaymentOutcome::Approved {
                transaction_id: format!("tx-{}", order_id),
            })
    }
}

fn declined() -> PaymentOutcome {
    PaymentOutcome::Declined {
        reason: "insufficient funds".to_string(),
    }
}

fn unknown() -> PaymentOutcome {
    PaymentOutcome::Unknown {
        reason: "timeout".to_string(),
    }
}

struct Harness {
    space: Arc<TupleSpace>,
    orders: Arc<OrderProcessingUnit>,
    gateway: Arc<ScriptedGateway>,
    hosts: Vec<UnitHost>,
}

async fn harness(gateway: Arc<ScriptedGateway>, config: PaymentConfig) -> Harness {
    let space = Arc::new(TupleSpace::new("orders-test"));
    let orders = Arc::new(OrderProcessingUnit::new(gateway.clone(), config));
    let units: Vec<Arc<dyn ProcessingUnit>> = vec![
        orders.clone(),
        Arc::new(InventoryProcessingUnit::default()),
    ];
    let mut hosts = Vec::new();
    for unit in units {
        let mut host = UnitHost::new(unit);
        host.initialize(space.clone()).unwrap();
        host.start().await.unwrap();
        hosts.push(host);
    }
    Harness {
        space,
        orders,
        gateway,
        hosts,
    }
}

async fn stock(space: &TupleSpace, product_id: &str, quantity: u64) -> String {
    let item = InventoryItem::new(product_id, "Widget", 10.0, quantity).unwrap();
    space.write_tuple(&item).await.unwrap()
}

async fn place(space: &TupleSpace, items: Vec<OrderItem>) -> String {
    space.write_tuple(&Order::new("C1", items)).await.unwrap()
}

async fn order(space: &TupleSpace, id: &str) -> Order {
    space.read_tuple(Query::id(id)).await.unwrap().unwrap()
}

async fn quantity(space: &TupleSpace, id: &str) -> u64 {
    let item: InventoryItem = space.read_tuple(Query::id(id)).await.unwrap().unwrap();
    item.quantity()
}

#[tokio::test]
async fn test_approved_order_completes_and_decrements_stock() {
    let h = harness(ScriptedGateway::with_script(vec![]), PaymentConfig::default()).await;
    let item_id = stock(&h.space, "P1", 1).await;

    let order_id = place(&h.space, vec![OrderItem::new("P1", 10.0, 1)]).await;

    let processed = order(&h.space, &order_id).await;
    assert_eq!(processed.status(), OrderStatus::Completed);
    assert_eq!(processed.transaction_id(), Some(format!("tx-{}", order_id).as_str()));
    assert_eq!(processed.payment_attempts(), 1);
    assert_eq!(quantity(&h.space, &item_id).await, 0);

    let alerts: Vec<LowStockAlert> = h.space.read_all_tuples(None).await.unwrap();
    assert!(alerts.iter().any(|a| a.product_id == "P1" && a.quantity == 0));
    assert_eq!(h.gateway.charges.lock().unwrap()[0], (order_id, 10.0));
}

#[tokio::test]
async fn test_insufficient_stock_leaves_inventory_untouched() {
    let h = harness(ScriptedGateway::with_script(vec![]), PaymentConfig::default()).await;
    let item_id = stock(&h.space, "P1", 1).await;

    let order_id = place(&h.space, vec![OrderItem::new("P1", 10.0, 5)]).await;

    let processed = order(&h.space, &order_id).await;
    assert_eq!(processed.status(), OrderStatus::OutOfStock);
    assert!(processed.failure_reason().unwrap().contains("P1"));
    assert_eq!(quantity(&h.space, &item_id).await, 1);
    assert_eq!(h.gateway.charge_count(), 0);
}

#[tokio::test]
async fn test_invalid_order_is_marked_not_charged() {
    let h = harness(ScriptedGateway::with_script(vec![]), PaymentConfig::default()).await;
    let order_id = h
        .space
        .write_tuple(&Order::new("", vec![OrderItem::new("P1", 1.0, 1)]))
        .await
        .unwrap();

    assert_eq!(order(&h.space, &order_id).await.status(), OrderStatus::Invalid);
    assert_eq!(h.gateway.charge_count(), 0);
}

#[tokio::test]
async fn test_malformed_pending_tuple_becomes_invalid() {
    let h = harness(ScriptedGateway::with_script(vec![]), PaymentConfig::default()).await;
    h.space
        .write_with_id("bad", json!({"type": "order", "status": "pending", "items": "oops"}))
        .await
        .unwrap();

    let stored = h.space.fetch("bad").await.unwrap();
    assert_eq!(stored["status"], json!("invalid"));
    assert_eq!(stored["items"], json!("oops"));
}

#[tokio::test]
async fn test_decline_keeps_inventory_under_accept_policy() {
    let h = harness(ScriptedGateway::with_script(vec![declined()]), PaymentConfig::default()).await;
    let item_id = stock(&h.space, "P1", 10).await;

    let order_id = place(&h.space, vec![OrderItem::new("P1", 10.0, 4)]).await;

    let processed = order(&h.space, &order_id).await;
    assert_eq!(processed.status(), OrderStatus::PaymentFailed);
    assert_eq!(processed.failure_reason(), Some("insufficient funds"));
    assert_eq!(quantity(&h.space, &item_id).await, 6);
}

#[tokio::test]
async fn test_decline_restocks_under_restock_policy() {
    let config = PaymentConfig {
        compensation: CompensationPolicy::Restock,
        ..PaymentConfig::default()
    };
    let h = harness(ScriptedGateway::with_script(vec![declined()]), config).await;
    let item_id = stock(&h.space, "P1", 10).await;

    let order_id = place(
        &h.space,
        vec![OrderItem::new("P1", 10.0, 4), OrderItem::new("P1", 10.0, 2)],
    )
    .await;

    assert_eq!(order(&h.space, &order_id).await.status(), OrderStatus::PaymentFailed);
    assert_eq!(quantity(&h.space, &item_id).await, 10);
}

#[tokio::test]
async fn test_unknown_outcomes_park_order_until_retry() {
    let h = harness(
        ScriptedGateway::with_script(vec![unknown(), unknown(), unknown()]),
        PaymentConfig::default(),
    )
    .await;
    let item_id = stock(&h.space, "P1", 10).await;

    let order_id = place(&h.space, vec![OrderItem::new("P1", 10.0, 2)]).await;

    let parked = order(&h.space, &order_id).await;
    assert_eq!(parked.status(), OrderStatus::AwaitingPayment);
    assert_eq!(parked.payment_attempts(), 3);
    assert_eq!(quantity(&h.space, &item_id).await, 8);

    // Still unknown: stays parked
    h.gateway.push(unknown());
    h.gateway.push(unknown());
    h.gateway.push(unknown());
    assert_eq!(h.orders.retry_pending_payments(&h.space).await.unwrap(), 0);
    assert_eq!(order(&h.space, &order_id).await.payment_attempts(), 6);

    // Script exhausted: approves
    assert_eq!(h.orders.retry_pending_payments(&h.space).await.unwrap(), 1);
    let settled = order(&h.space, &order_id).await;
    assert_eq!(settled.status(), OrderStatus::Completed);
    assert_eq!(settled.payment_attempts(), 7);
    assert_eq!(settled.failure_reason(), None);
    assert_eq!(quantity(&h.space, &item_id).await, 8);
}

#[tokio::test]
async fn test_unknown_then_approved_within_attempts() {
    let h = harness(ScriptedGateway::with_script(vec![unknown()]), PaymentConfig::default()).await;
    stock(&h.space, "P1", 10).await;

    let order_id = place(&h.space, vec![OrderItem::new("P1", 10.0, 1)]).await;

    let processed = order(&h.space, &order_id).await;
    assert_eq!(processed.status(), OrderStatus::Completed);
    assert_eq!(processed.payment_attempts(), 2);
}

#[tokio::test]
async fn test_backlog_orders_processed_on_start() {
    let space = Arc::new(TupleSpace::default());
    stock(&space, "P1", 3).await;
    let first = place(&space, vec![OrderItem::new("P1", 10.0, 2)]).await;
    let second = place(&space, vec![OrderItem::new("P1", 10.0, 2)]).await;

    let gateway = ScriptedGateway::with_script(vec![]);
    let mut host = UnitHost::new(Arc::new(OrderProcessingUnit::new(gateway.clone(), PaymentConfig::default())));
    host.initialize(space.clone()).unwrap();
    assert_eq!(host.start().await.unwrap(), 2);

    // Store order decides who gets the stock
    assert_eq!(order(&space, &first).await.status(), OrderStatus::Completed);
    assert_eq!(order(&space, &second).await.status(), OrderStatus::OutOfStock);
    assert_eq!(gateway.charge_count(), 1);

    // A restart finds nothing pending
    host.stop().await.unwrap();
    assert_eq!(host.start().await.unwrap(), 0);
}

#[tokio::test]
async fn test_stopped_units_do_not_react() {
    let mut h = harness(ScriptedGateway::with_script(vec![]), PaymentConfig::default()).await;
    stock(&h.space, "P1", 10).await;
    for host in &mut h.hosts {
        host.stop().await.unwrap();
    }

    let order_id = place(&h.space, vec![OrderItem::new("P1", 10.0, 1)]).await;
    assert_eq!(order(&h.space, &order_id).await.status(), OrderStatus::Pending);
    assert_eq!(h.space.count(Some(&LowStockAlert::kind_template())).await.unwrap(), 0);
}

/// Registers an observer that fails on every write of `kind`
async fn fail_writes_of(space: &TupleSpace, kind: &str) {
    let watched = Template::kind(kind);
    space
        .on(
            SpaceEventKind::Write,
            listener_fn(move |event| {
                if watched.matches(&event.tuple) {
                    Err(ListenerError::new("flaky-observer", "observer unavailable"))
                } else {
                    Ok(())
                }
            }),
        )
        .await;
}

#[tokio::test]
async fn test_failing_observer_does_not_strand_reserved_stock() {
    let mut h = harness(ScriptedGateway::with_script(vec![]), PaymentConfig::default()).await;
    let item_id = stock(&h.space, "P1", 10).await;
    fail_writes_of(&h.space, LowStockAlert::KIND).await;

    let order_id = place(&h.space, vec![OrderItem::new("P1", 10.0, 6)]).await;

    assert_eq!(order(&h.space, &order_id).await.status(), OrderStatus::Completed);
    assert_eq!(quantity(&h.space, &item_id).await, 4);
    assert_eq!(h.space.count(Some(&LowStockAlert::kind_template())).await.unwrap(), 1);

    // A restart sees a settled order and leaves stock alone
    for host in &mut h.hosts {
        host.stop().await.unwrap();
        host.start().await.unwrap();
    }
    assert_eq!(order(&h.space, &order_id).await.status(), OrderStatus::Completed);
    assert_eq!(quantity(&h.space, &item_id).await, 4);
    assert_eq!(h.gateway.charge_count(), 1);
}

#[tokio::test]
async fn test_restock_compensation_survives_failing_inventory_observer() {
    let config = PaymentConfig {
        compensation: CompensationPolicy::Restock,
        ..PaymentConfig::default()
    };
    let h = harness(ScriptedGateway::with_script(vec![declined()]), config).await;
    let item_id = stock(&h.space, "P1", 10).await;
    fail_writes_of(&h.space, InventoryItem::KIND).await;

    let order_id = place(&h.space, vec![OrderItem::new("P1", 10.0, 3)]).await;

    assert_eq!(order(&h.space, &order_id).await.status(), OrderStatus::PaymentFailed);
    assert_eq!(quantity(&h.space, &item_id).await, 10);
}

#[tokio::test]
async fn test_raw_json_order_is_processed() {
    let h = harness(ScriptedGateway::with_script(vec![]), PaymentConfig::default()).await;
    let item_id = stock(&h.space, "P1", 5).await;

    let order_id = h
        .space
        .write(json!({
            "type": "order",
            "customer_id": "C1",
            "items": [{"product_id": "P1", "price": 1.0, "quantity": 1}],
            "status": "pending"
        }))
        .await
        .unwrap();

    let processed = order(&h.space, &order_id).await;
    assert_eq!(processed.status(), OrderStatus::Completed);
    assert_eq!(processed.id(), order_id);
    assert_eq!(processed.total_amount(), 1.0);
    assert_eq!(quantity(&h.space, &item_id).await, 4);
}

#[tokio::test]
async fn test_low_stock_alerts_again_after_restock_and_sale() {
    let h = harness(ScriptedGateway::with_script(vec![]), PaymentConfig::default()).await;
    let item_id = stock(&h.space, "P1", 2).await;
    let alerts = LowStockAlert::kind_template();
    assert_eq!(h.space.count(Some(&alerts)).await.unwrap(), 1);

    InventoryProcessingUnit::default()
        .restock_item(&h.space, "P1", 8)
        .await
        .unwrap();
    assert_eq!(h.space.count(Some(&alerts)).await.unwrap(), 0);

    place(&h.space, vec![OrderItem::new("P1", 10.0, 8)]).await;
    assert_eq!(quantity(&h.space, &item_id).await, 2);

    let raised: Vec<LowStockAlert> = h.space.read_all_tuples(None).await.unwrap();
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].quantity, 2);
}
