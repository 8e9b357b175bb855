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

//! Tuple Space Storage Backend Abstraction
//!
//! ## Purpose
//! Separates the store (id → tuple mapping) from event dispatch. `TupleSpace`
//! owns listeners, watchers and stats; a `SpaceStorage` only keeps tuples.
//!
//! ## Contract
//! - Iteration order is insertion order; overwriting an id keeps its position
//! - `take_first`/`take_all` find and remove under one lock (single consumer)
//! - Infrastructure failures are returned as `TupleSpaceError::Backend`
//!
//! Only the in-memory backend exists; the trait is the seam a distributed
//! store would plug into.

pub mod memory;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::{Template, TupleSpaceError};

/// Storage backend for a tuple space
#[async_trait]
pub trait SpaceStorage: Send + Sync {
    /// Store `tuple` under `id`, returning the tuple it replaced
    async fn put(&self, id: String, tuple: Value) -> Result<Option<Value>, TupleSpaceError>;

    /// Exact lookup
    async fn get(&self, id: &str) -> Result<Option<Value>, TupleSpaceError>;

    /// Exact removal
    async fn remove(&self, id: &str) -> Result<Option<Value>, TupleSpaceError>;

    /// First entry in store order matching `template` (any entry when `None`)
    async fn find_first(
        &self,
        template: Option<&Template>,
    ) -> Result<Option<(String, Value)>, TupleSpaceError>;

    /// All entries matching `template` (everything when `None`)
    async fn find_all(
        &self,
        template: Option<&Template>,
    ) -> Result<IndexMap<String, Value>, TupleSpaceError>;

    /// Atomically find and remove the first match
    async fn take_first(
        &self,
        template: Option<&Template>,
    ) -> Result<Option<(String, Value)>, TupleSpaceError>;

    /// Atomically remove every match
    async fn take_all(
        &self,
        template: Option<&Template>,
    ) -> Result<IndexMap<String, Value>, TupleSpaceError>;

    /// Number of stored tuples
    async fn len(&self) -> Result<usize, TupleSpaceError>;

    /// Remove everything, returning how many tuples were dropped
    async fn clear(&self) -> Result<usize, TupleSpaceError>;

    /// Backend name for logs
    fn provider(&self) -> &'static str;
}
