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

//! TupleSpace: the shared associative store
//!
//! ## Purpose
//! The sole communication channel between processing units. Tuples are
//! written under an id, read non-destructively, and removed by a single
//! consumer with `take`.
//!
//! ## Operations
//! - `write` / `write_with_id`: store (overwriting), fire `Write`
//! - `read` / `take` / `exists`: lookup by id, template, or any
//! - `read_all` / `take_all`: every match, `take_all` fires one `Take` per tuple
//! - `on` / `off`: listener registration with explicit [`Subscription`] handles
//! - `watch`: channel-based observer for code outside the reaction path
//!
//! ## Failure Semantics
//! Absence is `None` or an empty map, never an error. A listener failure does
//! not undo the mutation and does not stop later listeners; the first failure
//! is returned to the caller as [`TupleSpaceError::ListenerFailed`].

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, warn};

use crate::listener::{SpaceEvent, SpaceEventKind, SpaceListener, Subscription};
use crate::storage::{memory::MemoryStorage, SpaceStorage};
use crate::template::{Query, Template};
use crate::tuple::{new_tuple_id, SpaceTuple};

/// Capacity of each watch channel
pub const WATCH_CHANNEL_CAPACITY: usize = 100;

struct Registration {
    subscription: Subscription,
    listener: Arc<dyn SpaceListener>,
}

struct Watcher {
    template: Option<Template>,
    sender: mpsc::Sender<SpaceEvent>,
}

/// Statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TupleSpaceStats {
    total_writes: u64,
    total_reads: u64,
    total_takes: u64,
    events_dispatched: u64,
    current_size: usize,
}

impl TupleSpaceStats {
    /// Get total number of write operations
    pub fn total_writes(&self) -> u64 {
        self.total_writes
    }

    /// Get total number of read operations (read, read_all, exists, count)
    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    /// Get total number of tuples removed by take/take_all
    pub fn total_takes(&self) -> u64 {
        self.total_takes
    }

    /// Get number of listener invocations
    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched
    }

    /// Get current number of tuples in the space
    pub fn current_size(&self) -> usize {
        self.current_size
    }
}

/// Tuple space for coordination
pub struct TupleSpace {
    name: String,
    storage: Arc<dyn SpaceStorage>,
    listeners: RwLock<Vec<Registration>>,
    watchers: RwLock<Vec<Watcher>>,
    stats: RwLock<TupleSpaceStats>,
    next_subscription: AtomicU64,
}

impl Default for TupleSpace {
    fn default() -> Self {
        Self::new("default")
    }
}

impl std::fmt::Debug for TupleSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleSpace")
            .field("name", &self.name)
            .field("storage", &self.storage.provider())
            .finish()
    }
}

impl TupleSpace {
    /// Create a named in-memory tuple space
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_storage(name, Arc::new(MemoryStorage::new()))
    }

    /// Create a tuple space over an explicit storage backend
    pub fn with_storage(name: impl Into<String>, storage: Arc<dyn SpaceStorage>) -> Self {
        TupleSpace {
            name: name.into(),
            storage,
            listeners: RwLock::new(Vec::new()),
            watchers: RwLock::new(Vec::new()),
            stats: RwLock::new(TupleSpaceStats::default()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Space name (used in logs)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write a tuple, returning its id
    ///
    /// The id is the tuple's own `"id"` string field when present, otherwise
    /// a freshly generated one. Use [`TupleSpace::write_with_id`] to pick it.
    pub async fn write(&self, tuple: Value) -> Result<String, TupleSpaceError> {
        let id = tuple
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(new_tuple_id);
        self.write_entry(id, tuple).await
    }

    /// Write a tuple under `id`, overwriting whatever was stored there
    pub async fn write_with_id(
        &self,
        id: impl Into<String>,
        tuple: Value,
    ) -> Result<String, TupleSpaceError> {
        self.write_entry(id.into(), tuple).await
    }

    /// Write a typed tuple under its header id
    pub async fn write_tuple<T: SpaceTuple>(&self, tuple: &T) -> Result<String, TupleSpaceError> {
        let value = tuple.to_value()?;
        self.write_entry(tuple.id().to_string(), value).await
    }

    /// Bulk write tuples
    pub async fn write_batch(&self, tuples: Vec<Value>) -> Result<Vec<String>, TupleSpaceError> {
        let mut ids = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            ids.push(self.write(tuple).await?);
        }
        Ok(ids)
    }

    /// Read a tuple (non-destructive)
    pub async fn read(&self, query: impl Into<Query>) -> Result<Option<Value>, TupleSpaceError> {
        Ok(self.read_entry(query).await?.map(|(_, tuple)| tuple))
    }

    /// Read a tuple together with its id
    pub async fn read_entry(
        &self,
        query: impl Into<Query>,
    ) -> Result<Option<(String, Value)>, TupleSpaceError> {
        let found = match query.into() {
            Query::Id(id) => self.storage.get(&id).await?.map(|tuple| (id, tuple)),
            Query::Template(template) => self.storage.find_first(Some(&template)).await?,
            Query::Any => self.storage.find_first(None).await?,
        };
        self.stats.write().await.total_reads += 1;
        Ok(found)
    }

    /// Read and decode a typed tuple
    pub async fn read_tuple<T: SpaceTuple>(
        &self,
        query: impl Into<Query>,
    ) -> Result<Option<T>, TupleSpaceError> {
        self.read_entry(query)
            .await?
            .map(|(id, tuple)| T::from_entry(&id, tuple))
            .transpose()
    }

    /// Exact lookup that treats absence as an error
    pub async fn fetch(&self, id: &str) -> Result<Value, TupleSpaceError> {
        self.read(Query::id(id))
            .await?
            .ok_or_else(|| TupleSpaceError::TupleNotFound(id.to_string()))
    }

    /// Take a tuple (destructive read)
    ///
    /// At most one tuple is removed. Fires a `Take` event when something was taken.
    pub async fn take(&self, query: impl Into<Query>) -> Result<Option<Value>, TupleSpaceError> {
        Ok(self.take_entry(query).await?.map(|(_, tuple)| tuple))
    }

    /// Take a tuple together with its id
    pub async fn take_entry(
        &self,
        query: impl Into<Query>,
    ) -> Result<Option<(String, Value)>, TupleSpaceError> {
        let taken = match query.into() {
            Query::Id(id) => self.storage.remove(&id).await?.map(|tuple| (id, tuple)),
            Query::Template(template) => self.storage.take_first(Some(&template)).await?,
            Query::Any => self.storage.take_first(None).await?,
        };

        let Some((id, tuple)) = taken else {
            return Ok(None);
        };

        self.record_takes(1).await?;
        debug!(space = %self.name, tuple_id = %id, "tuple taken");

        self.dispatch(SpaceEvent {
            kind: SpaceEventKind::Take,
            id: id.clone(),
            tuple: tuple.clone(),
        })
        .await?;

        Ok(Some((id, tuple)))
    }

    /// Check if any tuple matches
    pub async fn exists(&self, query: impl Into<Query>) -> Result<bool, TupleSpaceError> {
        Ok(self.read_entry(query).await?.is_some())
    }

    /// Count tuples matching `template` (all tuples when `None`)
    pub async fn count(&self, template: Option<&Template>) -> Result<usize, TupleSpaceError> {
        Ok(self.read_all(template).await?.len())
    }

    /// Read all matching tuples, keyed by id in store order
    pub async fn read_all(
        &self,
        template: Option<&Template>,
    ) -> Result<IndexMap<String, Value>, TupleSpaceError> {
        let matches = self.storage.find_all(template).await?;
        self.stats.write().await.total_reads += 1;
        Ok(matches)
    }

    /// Read and decode every tuple of kind `T` that also matches `filter`
    pub async fn read_all_tuples<T: SpaceTuple>(
        &self,
        filter: Option<&Template>,
    ) -> Result<Vec<T>, TupleSpaceError> {
        let kind = T::kind_template();
        self.read_all(filter)
            .await?
            .into_iter()
            .filter(|(_, tuple)| kind.matches(tuple))
            .map(|(id, tuple)| T::from_entry(&id, tuple))
            .collect()
    }

    /// Take all matching tuples
    ///
    /// Fires one `Take` event per removed tuple, in store order. Every event is
    /// dispatched even when a listener fails; the first failure is returned.
    pub async fn take_all(
        &self,
        template: Option<&Template>,
    ) -> Result<IndexMap<String, Value>, TupleSpaceError> {
        let taken = self.storage.take_all(template).await?;
        if taken.is_empty() {
            return Ok(taken);
        }

        self.record_takes(taken.len() as u64).await?;
        debug!(space = %self.name, count = taken.len(), "tuples taken");

        let mut first_error = None;
        for (id, tuple) in &taken {
            let event = SpaceEvent {
                kind: SpaceEventKind::Take,
                id: id.clone(),
                tuple: tuple.clone(),
            };
            if let Err(e) = self.dispatch(event).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(taken),
        }
    }

    /// Register a listener for `kind`
    ///
    /// Registrations accumulate: the same listener registered twice runs twice.
    /// A listener registered while an event is being dispatched first sees the
    /// next event.
    pub async fn on(&self, kind: SpaceEventKind, listener: Arc<dyn SpaceListener>) -> Subscription {
        let subscription = Subscription::new(self.next_subscription.fetch_add(1, Ordering::Relaxed), kind);
        self.listeners.write().await.push(Registration {
            subscription: subscription.clone(),
            listener,
        });
        debug!(space = %self.name, subscription = subscription.id(), %kind, "listener registered");
        subscription
    }

    /// Release a registration; returns false if it was already released
    pub async fn off(&self, subscription: &Subscription) -> bool {
        let mut listeners = self.listeners.write().await;
        let before = listeners.len();
        listeners.retain(|r| r.subscription != *subscription);
        let removed = listeners.len() != before;
        if removed {
            debug!(space = %self.name, subscription = subscription.id(), "listener released");
        }
        removed
    }

    /// Number of live registrations for `kind`
    pub async fn listener_count(&self, kind: SpaceEventKind) -> usize {
        self.listeners
            .read()
            .await
            .iter()
            .filter(|r| r.subscription.kind() == kind)
            .count()
    }

    /// Watch for events on tuples matching `template` (all tuples when `None`)
    ///
    /// Delivery is best-effort: a full channel drops the event, a dropped
    /// receiver is pruned on the next event.
    pub async fn watch(&self, template: Option<Template>) -> mpsc::Receiver<SpaceEvent> {
        let (sender, receiver) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        self.watchers.write().await.push(Watcher { template, sender });
        receiver
    }

    /// Get space statistics
    pub async fn stats(&self) -> TupleSpaceStats {
        let mut stats = self.stats.read().await.clone();
        if let Ok(len) = self.storage.len().await {
            stats.current_size = len;
        }
        stats
    }

    /// Number of stored tuples
    pub async fn len(&self) -> Result<usize, TupleSpaceError> {
        self.storage.len().await
    }

    /// True when nothing is stored
    pub async fn is_empty(&self) -> Result<bool, TupleSpaceError> {
        Ok(self.len().await? == 0)
    }

    /// Clear all tuples without firing events
    pub async fn clear(&self) -> Result<usize, TupleSpaceError> {
        let dropped = self.storage.clear().await?;
        self.stats.write().await.current_size = 0;
        debug!(space = %self.name, dropped, "space cleared");
        Ok(dropped)
    }

    async fn write_entry(&self, id: String, tuple: Value) -> Result<String, TupleSpaceError> {
        let replaced = self.storage.put(id.clone(), tuple.clone()).await?;
        let size = self.storage.len().await?;
        {
            let mut stats = self.stats.write().await;
            stats.total_writes += 1;
            stats.current_size = size;
        }
        debug!(
            space = %self.name,
            tuple_id = %id,
            overwrite = replaced.is_some(),
            "tuple written"
        );

        self.dispatch(SpaceEvent {
            kind: SpaceEventKind::Write,
            id: id.clone(),
            tuple,
        })
        .await?;

        Ok(id)
    }

    async fn record_takes(&self, count: u64) -> Result<(), TupleSpaceError> {
        let size = self.storage.len().await?;
        let mut stats = self.stats.write().await;
        stats.total_takes += count;
        stats.current_size = size;
        Ok(())
    }

    async fn dispatch(&self, event: SpaceEvent) -> Result<(), TupleSpaceError> {
        self.notify_watchers(&event).await;

        // Snapshot so listeners can re-enter the space (and register/release) freely
        let listeners: Vec<Arc<dyn SpaceListener>> = self
            .listeners
            .read()
            .await
            .iter()
            .filter(|r| r.subscription.kind() == event.kind)
            .map(|r| r.listener.clone())
            .collect();

        let mut first_error = None;
        for listener in listeners {
            self.stats.write().await.events_dispatched += 1;
            if let Err(e) = listener.on_event(self, &event).await {
                error!(
                    space = %self.name,
                    event = %event.kind,
                    tuple_id = %event.id,
                    error = %e,
                    "space listener failed"
                );
                first_error.get_or_insert(TupleSpaceError::ListenerFailed {
                    event: event.kind,
                    tuple_id: event.id.clone(),
                    message: e.to_string(),
                    tuple: Box::new(event.tuple.clone()),
                });
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn notify_watchers(&self, event: &SpaceEvent) {
        let mut watchers = self.watchers.write().await;
        watchers.retain(|watcher| {
            if watcher.sender.is_closed() {
                return false;
            }
            let interested = watcher
                .template
                .as_ref()
                .map_or(true, |t| t.matches(&event.tuple));
            if interested {
                if let Err(mpsc::error::TrySendError::Full(_)) = watcher.sender.try_send(event.clone()) {
                    warn!(space = %self.name, tuple_id = %event.id, "watch channel full, event dropped");
                }
            }
            true
        });
    }
}

/// TupleSpace errors
#[derive(Debug, thiserror::Error)]
pub enum TupleSpaceError {
    /// No tuple stored under the id
    #[error("Tuple not found: {0}")]
    TupleNotFound(String),

    /// Template could not be built
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// Tuple could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage backend failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// A listener failed after the mutation was applied
    #[error("Listener failed on {event} of tuple {tuple_id}: {message}")]
    ListenerFailed {
        /// Event being dispatched
        event: SpaceEventKind,
        /// Id of the affected tuple
        tuple_id: String,
        /// Listener failure
        message: String,
        /// The tuple carried by the event (lets a `take` caller recover it)
        tuple: Box<Value>,
    },
}
