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

//! In-Memory Tuple Space Storage Backend
//!
//! ## Design
//! - **Storage**: `IndexMap<TupleId, Value>` (insertion ordered)
//! - **Template Matching**: Linear scan with early exit
//! - **Removal**: `shift_remove` so the remaining order is preserved
//!
//! ## Performance Characteristics
//! - **Write/Get by id**: O(1)
//! - **Read/Take by template**: O(n)
//! - **Take by id**: O(n) because of order-preserving removal

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::RwLock;

use super::SpaceStorage;
use crate::{Template, TupleSpaceError};

/// In-memory tuple storage
///
/// ## Thread Safety
/// Reads take the read lock, mutations the write lock. No lock is held
/// across calls, so callers never observe a half-applied take.
#[derive(Default)]
pub struct MemoryStorage {
    tuples: RwLock<IndexMap<String, Value>>,
}

impl MemoryStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty storage with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        MemoryStorage {
            tuples: RwLock::new(IndexMap::with_capacity(capacity)),
        }
    }
}

fn selects(template: Option<&Template>, tuple: &Value) -> bool {
    template.map_or(true, |t| t.matches(tuple))
}

#[async_trait]
impl SpaceStorage for MemoryStorage {
    async fn put(&self, id: String, tuple: Value) -> Result<Option<Value>, TupleSpaceError> {
        Ok(self.tuples.write().await.insert(id, tuple))
    }

    async fn get(&self, id: &str) -> Result<Option<Value>, TupleSpaceError> {
        Ok(self.tuples.read().await.get(id).cloned())
    }

    async fn remove(&self, id: &str) -> Result<Option<Value>, TupleSpaceError> {
        Ok(self.tuples.write().await.shift_remove(id))
    }

    async fn find_first(
        &self,
        template: Option<&Template>,
    ) -> Result<Option<(String, Value)>, TupleSpaceError> {
        let tuples = self.tuples.read().await;
        Ok(tuples
            .iter()
            .find(|(_, tuple)| selects(template, tuple))
            .map(|(id, tuple)| (id.clone(), tuple.clone())))
    }

    async fn find_all(
        &self,
        template: Option<&Template>,
    ) -> Result<IndexMap<String, Value>, TupleSpaceError> {
        let tuples = self.tuples.read().await;
        Ok(tuples
            .iter()
            .filter(|(_, tuple)| selects(template, tuple))
            .map(|(id, tuple)| (id.clone(), tuple.clone()))
            .collect())
    }

    async fn take_first(
        &self,
        template: Option<&Template>,
    ) -> Result<Option<(String, Value)>, TupleSpaceError> {
        let mut tuples = self.tuples.write().await;
        let position = tuples.iter().position(|(_, tuple)| selects(template, tuple));
        Ok(position.and_then(|index| tuples.shift_remove_index(index)))
    }

    async fn take_all(
        &self,
        template: Option<&Template>,
    ) -> Result<IndexMap<String, Value>, TupleSpaceError> {
        let mut tuples = self.tuples.write().await;
        let (taken, kept): (IndexMap<String, Value>, IndexMap<String, Value>) =
            std::mem::take(&mut *tuples)
                .into_iter()
                .partition(|(_, tuple)| selects(template, tuple));
        *tuples = kept;
        Ok(taken)
    }

    async fn len(&self) -> Result<usize, TupleSpaceError> {
        Ok(self.tuples.read().await.len())
    }

    async fn clear(&self) -> Result<usize, TupleSpaceError> {
        let mut tuples = self.tuples.write().await;
        let dropped = tuples.len();
        tuples.clear();
        Ok(dropped)
    }

    fn provider(&self) -> &'static str {
        "memory"
    }
}
