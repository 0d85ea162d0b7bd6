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

//! Type registry. Assigns every user type a small id (0-255) per kind, and
//! tracks the byte size and qualified name needed by the chunk storage and
//! the binary serializer.

use std::any::{Any, TypeId};

use rustc_hash::FxHashMap;

use crate::error::{EcsError, Result};

/// Schema id space per kind: 256 slots, matching `BitMask`'s capacity.
pub const MAX_IDS_PER_KIND: usize = 256;

/// Components and array elements above this size are rejected up front; a
/// `Chunk` column is a flat `Vec<u8>` and this keeps a single bad registration
/// from allocating something absurd.
pub const MAX_COMPONENT_SIZE: usize = 1 << 16;

/// The only tag id the core itself reserves. An entity with this tag set is
/// skipped by any query whose exclude filter includes it; `World::set_enabled`
/// toggles it.
pub const DISABLED_TAG: u8 = 0;
const DISABLED_TAG_NAME: &str = "core::Disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Component,
    Array,
    Tag,
}

#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub size: usize,
    pub kind: Kind,
}

#[derive(Debug, Default)]
struct KindTable {
    descriptors: Vec<TypeDescriptor>,
    by_name: FxHashMap<String, u8>,
}

impl KindTable {
    fn next_id(&self) -> Result<u8> {
        if self.descriptors.len() >= MAX_IDS_PER_KIND {
            return Err(EcsError::SchemaFull);
        }
        Ok(self.descriptors.len() as u8)
    }

    fn insert(&mut self, name: String, size: usize, kind: Kind) -> Result<u8> {
        let id = self.next_id()?;
        self.by_name.insert(name.clone(), id);
        self.descriptors.push(TypeDescriptor { name, size, kind });
        Ok(id)
    }
}

/// Registers user types and hands out the small per-kind ids that back
/// `BitMask`/`Definition` and chunk columns.
#[derive(Debug)]
pub struct Schema {
    components: KindTable,
    arrays: KindTable,
    tags: KindTable,
    by_rust_type: FxHashMap<(Kind, TypeId), u8>,
}

impl Schema {
    pub fn new() -> Self {
        let mut tags = KindTable::default();
        tags.insert(DISABLED_TAG_NAME.to_string(), 0, Kind::Tag)
            .expect("reserving the disabled tag cannot exhaust the tag id space");
        Self {
            components: KindTable::default(),
            arrays: KindTable::default(),
            tags,
            by_rust_type: FxHashMap::default(),
        }
    }

    fn table(&self, kind: Kind) -> &KindTable {
        match kind {
            Kind::Component => &self.components,
            Kind::Array => &self.arrays,
            Kind::Tag => &self.tags,
        }
    }

    fn table_mut(&mut self, kind: Kind) -> &mut KindTable {
        match kind {
            Kind::Component => &mut self.components,
            Kind::Array => &mut self.arrays,
            Kind::Tag => &mut self.tags,
        }
    }

    /// Registers `T` under `kind`, idempotently: calling this twice for the
    /// same `(kind, T)` pair returns the same id.
    pub fn register<T: Any>(&mut self, kind: Kind) -> Result<u8> {
        let key = (kind, TypeId::of::<T>());
        if let Some(&id) = self.by_rust_type.get(&key) {
            return Ok(id);
        }
        let size = if kind == Kind::Tag { 0 } else { std::mem::size_of::<T>() };
        if size > MAX_COMPONENT_SIZE {
            return Err(EcsError::SizeTooLarge { size, max: MAX_COMPONENT_SIZE });
        }
        let name = std::any::type_name::<T>().to_string();
        let id = self.table_mut(kind).insert(name, size, kind)?;
        self.by_rust_type.insert(key, id);
        Ok(id)
    }

    pub fn lookup<T: Any>(&self, kind: Kind) -> Result<u8> {
        self.by_rust_type
            .get(&(kind, TypeId::of::<T>()))
            .copied()
            .ok_or(EcsError::UnknownType)
    }

    pub fn size(&self, kind: Kind, id: u8) -> Result<usize> {
        self.table(kind)
            .descriptors
            .get(id as usize)
            .map(|d| d.size)
            .ok_or(EcsError::UnknownType)
    }

    pub fn name(&self, kind: Kind, id: u8) -> Result<&str> {
        self.table(kind)
            .descriptors
            .get(id as usize)
            .map(|d| d.name.as_str())
            .ok_or(EcsError::UnknownType)
    }

    pub fn id_by_name(&self, kind: Kind, name: &str) -> Result<u8> {
        self.table(kind).by_name.get(name).copied().ok_or(EcsError::UnknownType)
    }

    pub fn count(&self, kind: Kind) -> usize {
        self.table(kind).descriptors.len()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}
