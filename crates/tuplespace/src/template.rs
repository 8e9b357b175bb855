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

//! Template matching and lookup queries
//!
//! ## Matching Rules
//! - **Object template**: every template key must exist in the tuple with an
//!   equal value (subset match); extra tuple keys are ignored
//! - **Array template**: every template index must exist in the tuple with an
//!   equal value
//! - **Scalar template**: plain equality
//! - Shape mismatch (object vs array vs scalar) never matches
//!
//! Values compare with `serde_json::Value` equality, so `1` and `1.0` differ.

use serde_json::{Map, Value};

use crate::space::TupleSpaceError;

/// Key carrying the kind tag of domain tuples
pub const TYPE_FIELD: &str = "type";

/// Structural template used to select tuples
#[derive(Debug, Clone, PartialEq)]
pub struct Template(Value);

impl Template {
    /// Create a template from a JSON value
    ///
    /// ## Errors
    /// `InvalidTemplate` for `null`, which would be indistinguishable from "no template".
    pub fn new(value: Value) -> Result<Self, TupleSpaceError> {
        if value.is_null() {
            return Err(TupleSpaceError::InvalidTemplate(
                "null is not a valid template; use Query::Any to match everything".to_string(),
            ));
        }
        Ok(Template(value))
    }

    /// Parse a template from JSON text
    pub fn parse(text: &str) -> Result<Self, TupleSpaceError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| TupleSpaceError::InvalidTemplate(format!("malformed template: {}", e)))?;
        Self::new(value)
    }

    /// Empty object template (matches every object tuple)
    pub fn object() -> Self {
        Template(Value::Object(Map::new()))
    }

    /// Template matching every tuple tagged with `kind`
    pub fn kind(kind: &str) -> Self {
        Self::object().with_field(TYPE_FIELD, kind)
    }

    /// Add a required key to an object template
    ///
    /// A non-object template is replaced by an object holding just this key.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        match self.0.as_object_mut() {
            Some(map) => {
                map.insert(key.to_string(), value.into());
            }
            None => {
                let mut map = Map::new();
                map.insert(key.to_string(), value.into());
                self.0 = Value::Object(map);
            }
        }
        self
    }

    /// Underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Check whether `tuple` matches this template
    pub fn matches(&self, tuple: &Value) -> bool {
        match (&self.0, tuple) {
            (Value::Object(expected), Value::Object(actual)) => expected
                .iter()
                .all(|(key, value)| actual.get(key) == Some(value)),
            (Value::Array(expected), Value::Array(actual)) => expected
                .iter()
                .enumerate()
                .all(|(index, value)| actual.get(index) == Some(value)),
            (Value::Object(_), _) | (Value::Array(_), _) => false,
            (scalar, other) => scalar == other,
        }
    }
}

impl TryFrom<Value> for Template {
    type Error = TupleSpaceError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Template::new(value)
    }
}

/// How a lookup selects its tuple
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// First tuple in store order
    Any,
    /// Exact id lookup
    Id(String),
    /// First tuple (in store order) matching the template
    Template(Template),
}

impl Query {
    /// Exact id lookup
    pub fn id(id: impl Into<String>) -> Self {
        Query::Id(id.into())
    }
}

impl From<Template> for Query {
    fn from(template: Template) -> Self {
        Query::Template(template)
    }
}

impl From<&Template> for Query {
    fn from(template: &Template) -> Self {
        Query::Template(template.clone())
    }
}

impl From<Option<Template>> for Query {
    fn from(template: Option<Template>) -> Self {
        template.map(Query::Template).unwrap_or(Query::Any)
    }
}
