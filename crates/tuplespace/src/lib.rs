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

//! Associative tuple space for space-based coordination
//!
//! A shared store of JSON tuples addressed by id or selected by template
//! (subset match). Writes and takes fire events to registered listeners
//! inline, so processing units can react and write derived tuples back.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod listener;
pub mod space;
pub mod storage;
pub mod template;
pub mod tuple;

pub use listener::{listener_fn, SpaceEvent, SpaceEventKind, SpaceListener, ListenerError, Subscription};
pub use space::{TupleSpace, TupleSpaceError, TupleSpaceStats};
pub use storage::{memory::MemoryStorage, SpaceStorage};
pub use template::{Query, Template, TYPE_FIELD};
pub use tuple::{new_tuple_id, SpaceTuple, TupleHeader};
