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

//! Space events and listeners
//!
//! ## Dispatch Model
//! Listeners run inline: `write`/`take` await every listener registered for
//! the event kind, in registration order, before returning. The store lock is
//! not held while listeners run, so a listener may write back into the space
//! (chained reactions). Each registration returns a [`Subscription`] which is
//! the only way to release it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::space::TupleSpace;

/// Kind of space mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceEventKind {
    /// Tuple stored (new or overwritten)
    Write,
    /// Tuple removed by take/take_all
    Take,
}

impl fmt::Display for SpaceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpaceEventKind::Write => write!(f, "write"),
            SpaceEventKind::Take => write!(f, "take"),
        }
    }
}

/// Event delivered to listeners and watchers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceEvent {
    /// What happened
    pub kind: SpaceEventKind,
    /// Id of the affected tuple
    pub id: String,
    /// The tuple as written or as taken
    pub tuple: Value,
}

/// Failure reported by a listener
#[derive(Debug, Clone, thiserror::Error)]
#[error("listener '{listener}' failed: {message}")]
pub struct ListenerError {
    /// Name of the failing listener
    pub listener: String,
    /// Failure description
    pub message: String,
}

impl ListenerError {
    /// Create a listener error
    pub fn new(listener: impl Into<String>, message: impl fmt::Display) -> Self {
        ListenerError {
            listener: listener.into(),
            message: message.to_string(),
        }
    }
}

/// Reacts to space events
#[async_trait]
pub trait SpaceListener: Send + Sync {
    /// Handle one event; `space` is the space that fired it
    async fn on_event(&self, space: &TupleSpace, event: &SpaceEvent) -> Result<(), ListenerError>;
}

/// Handle for one listener registration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    kind: SpaceEventKind,
}

impl Subscription {
    pub(crate) fn new(id: u64, kind: SpaceEventKind) -> Self {
        Subscription { id, kind }
    }

    /// Registration id (unique per space)
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Event kind this registration listens to
    pub fn kind(&self) -> SpaceEventKind {
        self.kind
    }
}

struct FnListener<F> {
    f: F,
}

#[async_trait]
impl<F> SpaceListener for FnListener<F>
where
    F: Fn(&SpaceEvent) -> Result<(), ListenerError> + Send + Sync,
{
    async fn on_event(&self, _space: &TupleSpace, event: &SpaceEvent) -> Result<(), ListenerError> {
        (self.f)(event)
    }
}

/// Wrap a synchronous closure as a listener (observers that never touch the space)
pub fn listener_fn<F>(f: F) -> std::sync::Arc<dyn SpaceListener>
where
    F: Fn(&SpaceEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    std::sync::Arc::new(FnListener { f })
}
