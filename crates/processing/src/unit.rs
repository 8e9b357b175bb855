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

//! Processing unit framework
//!
//! ## Purpose
//! A processing unit is a named reactive worker: it declares the tuples it is
//! interested in (a [`Template`]) and how to process one of them. [`UnitHost`]
//! binds a unit to a space and owns its lifecycle.
//!
//! ## Lifecycle
//! ```text
//! stopped --start()--> running --stop()--> stopped
//! ```
//! - `initialize(space)` binds the space; `start()` before that fails with
//!   `UnitNotInitialized`
//! - `start()` registers exactly one `write` listener and keeps its
//!   `Subscription`, then sweeps the backlog: every matching tuple already in
//!   the space is processed
//! - `stop()` releases the subscription, so restarting never doubles delivery
//!
//! ## Idempotence
//! `process` may see a tuple more than once (backlog sweep plus event). Each
//! unit guards itself, typically by checking a status field.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spacebased_tuplespace::{
    ListenerError, SpaceEvent, SpaceEventKind, SpaceListener, Subscription, Template, TupleSpace,
    TupleSpaceError,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::order::OrderError;

/// What `process` did with a tuple
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// The tuple was rewritten with this value
    Updated(Value),
    /// New tuples were written alongside
    Derived(Vec<Value>),
    /// Nothing to do (already handled or not applicable)
    Skipped,
}

/// A reactive worker bound to a tuple space
#[async_trait]
pub trait ProcessingUnit: Send + Sync {
    /// Unique name (the middleware registry key)
    fn name(&self) -> &str;

    /// Tuples this unit reacts to
    fn interest(&self) -> Template;

    /// React to one tuple stored under `id`
    async fn process(
        &self,
        space: &TupleSpace,
        id: &str,
        tuple: Value,
    ) -> Result<ProcessOutcome, ProcessingError>;
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Stopped,
    Running,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitState::Stopped => write!(f, "stopped"),
            UnitState::Running => write!(f, "running"),
        }
    }
}

/// Adapts a unit to the space listener interface
struct UnitListener {
    unit: Arc<dyn ProcessingUnit>,
    interest: Template,
}

#[async_trait]
impl SpaceListener for UnitListener {
    async fn on_event(&self, space: &TupleSpace, event: &SpaceEvent) -> Result<(), ListenerError> {
        if !self.interest.matches(&event.tuple) {
            return Ok(());
        }
        debug!(unit = %self.unit.name(), tuple_id = %event.id, "unit reacting to write");
        self.unit
            .process(space, &event.id, event.tuple.clone())
            .await
            .map(|_| ())
            .map_err(|e| ListenerError::new(self.unit.name(), e))
    }
}

/// Owns a unit's binding to a space and its listener registration
pub struct UnitHost {
    unit: Arc<dyn ProcessingUnit>,
    space: Option<Arc<TupleSpace>>,
    state: UnitState,
    subscription: Option<Subscription>,
}

impl fmt::Debug for UnitHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitHost")
            .field("unit", &self.unit.name())
            .field("initialized", &self.space.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl UnitHost {
    /// Wrap an unbound, stopped unit
    pub fn new(unit: Arc<dyn ProcessingUnit>) -> Self {
        UnitHost {
            unit,
            space: None,
            state: UnitState::Stopped,
            subscription: None,
        }
    }

    pub fn name(&self) -> &str {
        self.unit.name()
    }

    pub fn unit(&self) -> &Arc<dyn ProcessingUnit> {
        &self.unit
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.space.is_some()
    }

    /// Bind to `space`
    ///
    /// ## Errors
    /// `AlreadyRunning` when called on a running unit (stop it first).
    pub fn initialize(&mut self, space: Arc<TupleSpace>) -> Result<(), ProcessingError> {
        if self.state == UnitState::Running {
            return Err(ProcessingError::AlreadyRunning(self.name().to_string()));
        }
        self.space = Some(space);
        Ok(())
    }

    /// Start reacting, then process the backlog
    ///
    /// Returns how many backlog tuples were processed. Starting a running unit
    /// is a no-op returning 0.
    ///
    /// ## Errors
    /// - `UnitNotInitialized` when no space is bound
    /// - the first backlog failure (the rest of the backlog is still processed
    ///   and the unit stays running)
    pub async fn start(&mut self) -> Result<usize, ProcessingError> {
        match self.activate().await? {
            Some(sweep) => sweep.run().await,
            None => Ok(0),
        }
    }

    /// Register the write listener and mark the unit running
    ///
    /// Returns the backlog sweep still to run, or `None` when the unit was
    /// already running. The sweep borrows nothing from the host, so a caller
    /// holding the host behind a lock can release it before running the sweep.
    pub async fn activate(&mut self) -> Result<Option<BacklogSweep>, ProcessingError> {
        let space = self
            .space
            .clone()
            .ok_or_else(|| ProcessingError::UnitNotInitialized(self.name().to_string()))?;
        if self.state == UnitState::Running {
            return Ok(None);
        }

        let interest = self.unit.interest();
        let listener = Arc::new(UnitListener {
            unit: self.unit.clone(),
            interest: interest.clone(),
        });
        self.subscription = Some(space.on(SpaceEventKind::Write, listener).await);
        self.state = UnitState::Running;
        info!(unit = %self.name(), space = %space.name(), "processing unit started");

        Ok(Some(BacklogSweep {
            unit: self.unit.clone(),
            space,
            interest,
        }))
    }

    /// Stop reacting; stopping a stopped unit is a no-op
    pub async fn stop(&mut self) -> Result<(), ProcessingError> {
        if let (Some(space), Some(subscription)) = (&self.space, self.subscription.take()) {
            space.off(&subscription).await;
        }
        if self.state == UnitState::Running {
            self.state = UnitState::Stopped;
            info!(unit = %self.name(), "processing unit stopped");
        }
        Ok(())
    }
}

/// Tuples already in the space when a unit started
pub struct BacklogSweep {
    unit: Arc<dyn ProcessingUnit>,
    space: Arc<TupleSpace>,
    interest: Template,
}

impl BacklogSweep {
    /// Process every matching tuple; returns how many succeeded
    pub async fn run(self) -> Result<usize, ProcessingError> {
        let name = self.unit.name();
        let backlog = self.space.read_all(Some(&self.interest)).await?;
        let mut processed = 0;
        let mut first_error = None;
        for (id, tuple) in backlog {
            match self.unit.process(&self.space, &id, tuple).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    error!(unit = %name, tuple_id = %id, error = %e, "backlog processing failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if processed > 0 {
            info!(unit = %name, processed, "backlog sweep complete");
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(processed),
        }
    }
}

/// Processing errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// Unit used before being bound to a space
    #[error("Processing unit not initialized: {0}")]
    UnitNotInitialized(String),

    /// Rebinding a running unit
    #[error("Processing unit already running: {0}")]
    AlreadyRunning(String),

    /// Space operation failed
    #[error("Space error: {0}")]
    Space(#[from] TupleSpaceError),

    /// Illegal order state change
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Inventory changed between check and update
    #[error("Inventory conflict for {product_id}: {message}")]
    InventoryConflict { product_id: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spacebased_tuplespace::Query;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Marks `{"kind": "task", "done": false}` tuples done
    struct Marker {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProcessingUnit for Marker {
        fn name(&self) -> &str {
            "marker"
        }

        fn interest(&self) -> Template {
            Template::new(json!({"kind": "task", "done": false})).unwrap()
        }

        async fn process(
            &self,
            space: &TupleSpace,
            id: &str,
            mut tuple: Value,
        ) -> Result<ProcessOutcome, ProcessingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tuple["done"] = json!(true);
            space.write_with_id(id, tuple.clone()).await?;
            Ok(ProcessOutcome::Updated(tuple))
        }
    }

    fn marker() -> Arc<Marker> {
        Arc::new(Marker {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_start_requires_initialize() {
        let mut host = UnitHost::new(marker());
        let err = host.start().await.unwrap_err();
        assert!(matches!(err, ProcessingError::UnitNotInitialized(name) if name == "marker"));
        assert_eq!(host.state(), UnitState::Stopped);
    }

    #[tokio::test]
    async fn test_start_sweeps_backlog_then_reacts() {
        let space = Arc::new(TupleSpace::default());
        space.write_with_id("early", json!({"kind": "task", "done": false})).await.unwrap();

        let unit = marker();
        let mut host = UnitHost::new(unit.clone());
        host.initialize(space.clone()).unwrap();
        assert_eq!(host.start().await.unwrap(), 1);
        assert_eq!(host.state(), UnitState::Running);

        space.write_with_id("late", json!({"kind": "task", "done": false})).await.unwrap();

        for id in ["early", "late"] {
            let tuple = space.read(Query::id(id)).await.unwrap().unwrap();
            assert_eq!(tuple["done"], json!(true));
        }
        // Own write-backs are not re-processed (done=true no longer matches)
        assert_eq!(unit.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stop_releases_listener_and_restart_does_not_duplicate() {
        let space = Arc::new(TupleSpace::default());
        let unit = marker();
        let mut host = UnitHost::new(unit.clone());
        host.initialize(space.clone()).unwrap();

        host.start().await.unwrap();
        host.start().await.unwrap();
        assert_eq!(space.listener_count(SpaceEventKind::Write).await, 1);

        host.stop().await.unwrap();
        assert_eq!(host.state(), UnitState::Stopped);
        assert_eq!(space.listener_count(SpaceEventKind::Write).await, 0);

        space.write_with_id("while-stopped", json!({"kind": "task", "done": false})).await.unwrap();
        assert_eq!(unit.calls.load(Ordering::SeqCst), 0);

        // Restart picks the missed tuple up through the backlog sweep, once
        host.start().await.unwrap();
        assert_eq!(space.listener_count(SpaceEventKind::Write).await, 1);
        assert_eq!(unit.calls.load(Ordering::SeqCst), 1);

        space.write_with_id("after", json!({"kind": "task", "done": false})).await.unwrap();
        assert_eq!(unit.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cannot_rebind_running_unit() {
        let mut host = UnitHost::new(marker());
        host.initialize(Arc::new(TupleSpace::default())).unwrap();
        host.start().await.unwrap();
        assert!(matches!(
            host.initialize(Arc::new(TupleSpace::default())),
            Err(ProcessingError::AlreadyRunning(_))
        ));
        host.stop().await.unwrap();
        host.stop().await.unwrap();
        assert!(host.initialize(Arc::new(TupleSpace::default())).is_ok());
    }
}
