// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Archetype ECS core — chunked columnar storage, schema-driven component
//! registration, and a three-axis query matcher over components, arrays,
//! and tags.
//!
//! `World` is the entry point: create entities, attach components/arrays/
//! tags, build a `Query` over them, and submit/listen for events through
//! `EventBus`. `serializer` writes and reads an entire world as one binary
//! blob.

pub mod bitset;
mod chunk;
pub mod definition;
pub mod entity;
pub mod error;
pub mod event_bus;
pub mod query;
pub mod schema;
pub mod serializer;
pub mod world;

pub use bitset::BitMask;
pub use definition::Definition;
pub use entity::{ArrayBuffer, EntityId};
pub use error::{EcsError, Result};
pub use event_bus::{Event, EventBus, ListenerHandle};
pub use query::{Query, QueryIter, QueryRow};
pub use schema::{Kind, Schema, DISABLED_TAG, MAX_COMPONENT_SIZE, MAX_IDS_PER_KIND};
pub use serializer::{read_world, serialize_world, write_world};
pub use world::{EntityCreatedOrDestroyed, Sign, World};

pub mod prelude;
