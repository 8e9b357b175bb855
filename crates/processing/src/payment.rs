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

//! Payment gateway boundary
//!
//! ## Purpose
//! The order pipeline charges through [`PaymentGateway`]. A gateway answers
//! with one of three outcomes: approved, declined, or unknown. Unknown
//! (timeouts, dropped connections) is retryable and never treated as a decline.
//!
//! [`SimulatedPaymentGateway`] stands in for a real client: it approves with
//! probability `success_rate`, reports unknown with probability
//! `unknown_rate`, and declines otherwise.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Result of one charge attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// Money moved
    Approved { transaction_id: String },
    /// Gateway refused the charge
    Declined { reason: String },
    /// Outcome not known; safe to retry
    Unknown { reason: String },
}

impl PaymentOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, PaymentOutcome::Approved { .. })
    }
}

/// What happens to decremented inventory when payment is declined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationPolicy {
    /// Keep inventory decremented
    #[default]
    Accept,
    /// Put the ordered quantities back
    Restock,
}

impl std::str::FromStr for CompensationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accept" => Ok(CompensationPolicy::Accept),
            "restock" => Ok(CompensationPolicy::Restock),
            other => Err(format!("unknown compensation policy '{}'", other)),
        }
    }
}

/// Payment settings for the order pipeline and the simulated gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Probability of approval in the simulated gateway
    pub success_rate: f64,
    /// Probability of an unknown outcome in the simulated gateway
    pub unknown_rate: f64,
    /// Charge attempts per settlement before parking the order
    pub max_attempts: u32,
    /// Fixed RNG seed for reproducible simulations
    pub seed: Option<u64>,
    /// Inventory handling on decline
    pub compensation: CompensationPolicy,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        PaymentConfig {
            success_rate: 0.9,
            unknown_rate: 0.0,
            max_attempts: 3,
            seed: None,
            compensation: CompensationPolicy::Accept,
        }
    }
}

/// External payment collaborator
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge `amount` for `order_id`
    async fn charge(&self, order_id: &str, amount: f64) -> PaymentOutcome;
}

/// Random-outcome gateway used for demos and simulations
pub struct SimulatedPaymentGateway {
    success_rate: f64,
    unknown_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedPaymentGateway {
    /// Build from config; seeded when `config.seed` is set
    pub fn new(config: &PaymentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        SimulatedPaymentGateway {
            success_rate: config.success_rate.clamp(0.0, 1.0),
            unknown_rate: config.unknown_rate.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn charge(&self, order_id: &str, amount: f64) -> PaymentOutcome {
        let roll: f64 = self.rng.lock().await.gen();
        if roll < self.success_rate {
            PaymentOutcome::Approved {
                transaction_id: format!("txn-{}-{}", order_id, spacebased_tuplespace::new_tuple_id()),
            }
        } else if roll < self.success_rate + self.unknown_rate {
            PaymentOutcome::Unknown {
                reason: "gateway timeout".to_string(),
            }
        } else {
            PaymentOutcome::Declined {
                reason: format!("card declined for amount {:.2}", amount),
            }
        }
    }
}
