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

//! Tuple identity and the typed-tuple contract
//!
//! ## Purpose
//! The space stores plain `serde_json::Value`s. Domain records (inventory
//! items, orders, alerts) are serde structs that carry a [`TupleHeader`] and
//! implement [`SpaceTuple`], which converts them to and from space values and
//! stamps the `"type"` tag used by kind templates.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::space::TupleSpaceError;
use crate::template::{Template, TYPE_FIELD};

/// Generate a fresh tuple id (ULID, lexicographically sortable by creation time)
pub fn new_tuple_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Identity shared by every domain tuple
///
/// The id is fixed at construction; there is no setter. Tuples written as
/// plain JSON may omit `created_at`; decoding stamps the current time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleHeader {
    id: String,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl TupleHeader {
    /// Create a header with a generated id
    pub fn new() -> Self {
        Self::with_id(new_tuple_id())
    }

    /// Create a header with a caller-supplied id
    pub fn with_id(id: impl Into<String>) -> Self {
        TupleHeader {
            id: id.into(),
            created_at: Utc::now(),
        }
    }

    /// Tuple id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Default for TupleHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// A typed record that can live in the space
///
/// ## Contract
/// - `to_value` produces a JSON object carrying `"type": KIND`
/// - `from_value` accepts anything `to_value` produced (the `"type"` key is ignored)
/// - `kind_template()` matches every tuple of this kind
pub trait SpaceTuple: Serialize + DeserializeOwned + Send + Sync {
    /// Value of the `"type"` tag for this kind
    const KIND: &'static str;

    /// Identity header
    fn header(&self) -> &TupleHeader;

    /// Tuple id
    fn id(&self) -> &str {
        self.header().id()
    }

    /// Encode as a space value, stamping the kind tag
    fn to_value(&self) -> Result<Value, TupleSpaceError> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| TupleSpaceError::Serialization(e.to_string()))?;
        match value.as_object_mut() {
            Some(map) => {
                map.insert(TYPE_FIELD.to_string(), Value::String(Self::KIND.to_string()));
                Ok(value)
            }
            None => Err(TupleSpaceError::Serialization(format!(
                "{} must serialize to a JSON object",
                Self::KIND
            ))),
        }
    }

    /// Decode from a space value
    fn from_value(value: Value) -> Result<Self, TupleSpaceError> {
        serde_json::from_value(value).map_err(|e| TupleSpaceError::Serialization(e.to_string()))
    }

    /// Decode a value stored under `id`
    ///
    /// A body without an `"id"` string takes the store key as its id, so
    /// tuples written through [`crate::TupleSpace::write`] without one decode.
    fn from_entry(id: &str, mut value: Value) -> Result<Self, TupleSpaceError> {
        if let Some(map) = value.as_object_mut() {
            if !map.get("id").is_some_and(Value::is_string) {
                map.insert("id".to_string(), Value::String(id.to_string()));
            }
        }
        Self::from_value(value)
    }

    /// Template selecting every tuple of this kind
    fn kind_template() -> Template {
        Template::kind(Self::KIND)
    }
}
