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

//! World: central entity, chunk, and schema storage.
//!
//! A `World` is single-threaded and non-reentrant at the data-structure
//! level: every operation here takes `&mut self`. The one re-entrant path is
//! `poll_events`, whose callbacks receive `&mut World` back.

use std::any::Any;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[cfg(feature = "profiling")]
use tracing::trace;

use crate::chunk::{two_mut, Chunk};
use crate::definition::Definition;
use crate::entity::{ArrayBuffer, EntityId, EntitySlotTable};
use crate::error::{EcsError, Result};
use crate::event_bus::{self, Event, EventBus, ListenerHandle};
use crate::schema::{Kind, Schema};

/// Sign distinguishes the two directions `EntityCreatedOrDestroyed` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy)]
pub struct EntityCreatedOrDestroyed {
    pub entity: EntityId,
    pub sign: Sign,
}

/// Result of `World::append`: for each position in the source world, the
/// corresponding handle in `self` after the copy (`None` if that source
/// position was never live).
pub type AppendMap = Vec<Option<EntityId>>;

pub struct World {
    schema: Schema,
    slots: EntitySlotTable,
    chunks: Vec<Chunk>,
    chunk_index: FxHashMap<Definition, usize>,
    event_bus: EventBus,
    topology_version: u64,
}

impl World {
    pub fn new() -> Self {
        let schema = Schema::new();
        let mut world = Self {
            schema,
            slots: EntitySlotTable::new(),
            chunks: Vec::new(),
            chunk_index: FxHashMap::default(),
            event_bus: EventBus::new(),
            topology_version: 0,
        };
        world.get_or_create_chunk(Definition::EMPTY);
        world
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn len(&self) -> usize {
        self.slots.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.high_water_mark() as usize
    }

    pub(crate) fn topology_version(&self) -> u64 {
        self.topology_version
    }

    pub(crate) fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub(crate) fn event_bus_mut(&mut self) -> &mut EventBus {
        &mut self.event_bus
    }

    // ---- chunk plumbing used by Query -------------------------------------

    pub(crate) fn chunk_definitions(&self) -> Vec<Definition> {
        self.chunks.iter().map(|c| *c.definition()).collect()
    }

    pub(crate) fn chunk_row_count(&self, chunk_idx: usize) -> usize {
        self.chunks[chunk_idx].row_count()
    }

    pub(crate) fn chunk_entities(&self, chunk_idx: usize) -> &[u32] {
        self.chunks[chunk_idx].entities()
    }

    pub(crate) fn chunk_column_bytes(&self, chunk_idx: usize, id: u8) -> Result<&[u8]> {
        self.chunks[chunk_idx].column_bytes(id)
    }

    fn get_or_create_chunk(&mut self, definition: Definition) -> usize {
        if let Some(&idx) = self.chunk_index.get(&definition) {
            return idx;
        }
        let chunk = Chunk::new(definition, &self.schema);
        let idx = self.chunks.len();
        self.chunks.push(chunk);
        self.chunk_index.insert(definition, idx);
        self.topology_version += 1;
        idx
    }

    /// Moves the entity at `position` into the chunk for `new_def`, copying
    /// across every component both chunks share. No-op if the entity is
    /// already in a chunk with that definition.
    fn migrate(&mut self, position: u32, new_def: Definition) -> Result<()> {
        let (old_chunk_idx, old_row) = {
            let slot = self.slots.get(position).ok_or(EcsError::InvalidHandle)?;
            (slot.chunk_index, slot.row)
        };
        if *self.chunks[old_chunk_idx].definition() == new_def {
            return Ok(());
        }
        let new_chunk_idx = self.get_or_create_chunk(new_def);

        let new_row = if old_chunk_idx == new_chunk_idx {
            old_row
        } else {
            let (old_chunk, new_chunk) = two_mut(&mut self.chunks, old_chunk_idx, new_chunk_idx);
            let new_row = old_chunk.copy_row_to(old_row, new_chunk);
            if let Some(swapped) = old_chunk.remove_row(old_row) {
                if let Some(swapped_slot) = self.slots.get_mut(swapped) {
                    swapped_slot.row = old_row;
                }
            }
            new_row
        };

        let slot = self.slots.get_mut(position).ok_or(EcsError::InvalidHandle)?;
        slot.chunk_index = new_chunk_idx;
        slot.row = new_row;
        self.topology_version += 1;

        #[cfg(feature = "profiling")]
        trace!(position, old_chunk_idx, new_chunk_idx, "chunk migration");

        Ok(())
    }

    fn validate(&self, handle: EntityId) -> Result<()> {
        if self.slots.contains(handle) {
            Ok(())
        } else {
            Err(EcsError::InvalidHandle)
        }
    }

    fn current_definition(&self, position: u32) -> Definition {
        let idx = self.slots.get(position).map(|s| s.chunk_index).unwrap_or(0);
        *self.chunks[idx].definition()
    }

    // ---- entity lifecycle ---------------------------------------------

    pub fn create_entity(&mut self) -> EntityId {
        let handle = self.slots.allocate();
        let chunk_idx = self.get_or_create_chunk(Definition::EMPTY);
        let row = self.chunks[chunk_idx].add_row(handle.position);
        let slot = self.slots.get_mut(handle.position).expect("just allocated");
        slot.chunk_index = chunk_idx;
        slot.row = row;
        self.event_bus.submit(EntityCreatedOrDestroyed { entity: handle, sign: Sign::Positive });
        handle
    }

    pub fn contains_entity(&self, handle: EntityId) -> bool {
        self.slots.contains(handle)
    }

    pub fn is_enabled(&self, handle: EntityId) -> Result<bool> {
        self.validate(handle)?;
        Ok(self.slots.get(handle.position).unwrap().enabled)
    }

    pub fn set_enabled(&mut self, handle: EntityId, enabled: bool) -> Result<()> {
        self.validate(handle)?;
        let current = self.slots.get(handle.position).unwrap().enabled;
        if current == enabled {
            return Ok(());
        }
        let new_def = self.current_definition(handle.position).with_tag(crate::schema::DISABLED_TAG, !enabled);
        self.migrate(handle.position, new_def)?;
        self.slots.get_mut(handle.position).unwrap().enabled = enabled;
        Ok(())
    }

    pub fn destroy_entity(&mut self, handle: EntityId) -> Result<()> {
        self.validate(handle)?;
        self.destroy_position(handle.position, true);
        Ok(())
    }

    /// `emit_events` is `false` only for the filler positions the
    /// deserializer creates and immediately discards while walking up to a
    /// target position; those never existed from a listener's perspective
    /// and must not appear on the event bus.
    fn destroy_position(&mut self, position: u32, emit_events: bool) {
        let children: SmallVec<[u32; 4]> =
            self.slots.get(position).map(|s| s.children.clone()).unwrap_or_default();
        for child in children {
            if self.slots.get(child).is_some() {
                self.destroy_position(child, emit_events);
            }
        }

        let parent = self.slots.get(position).map(|s| s.parent).unwrap_or(0);
        if parent != 0 {
            if let Some(parent_slot) = self.slots.get_mut(parent) {
                parent_slot.children.retain(|&c| c != position);
            }
        }

        let (chunk_idx, row) = {
            let slot = self.slots.get(position).expect("validated by caller");
            (slot.chunk_index, slot.row)
        };
        if let Some(swapped) = self.chunks[chunk_idx].remove_row(row) {
            if let Some(swapped_slot) = self.slots.get_mut(swapped) {
                swapped_slot.row = row;
            }
        }

        let version = self.slots.version_of(position);
        self.slots.destroy(position);
        if emit_events {
            self.event_bus.submit(EntityCreatedOrDestroyed {
                entity: EntityId { position, version },
                sign: Sign::Negative,
            });
        }
    }

    // ---- components ------------------------------------------------------

    pub fn add_component<C: Any>(&mut self, handle: EntityId, value: C) -> Result<()> {
        let id = self.schema.register::<C>(Kind::Component)?;
        let bytes = unsafe { std::slice::from_raw_parts(&value as *const C as *const u8, std::mem::size_of::<C>()) };
        self.add_component_raw(handle, id, bytes)
    }

    pub fn add_component_raw(&mut self, handle: EntityId, id: u8, bytes: &[u8]) -> Result<()> {
        self.validate(handle)?;
        let def = self.current_definition(handle.position);
        if def.components.test(id) {
            return Err(EcsError::AlreadyHasComponent);
        }
        let new_def = def.with_component(id, true);
        self.migrate(handle.position, new_def)?;
        let row = self.slots.get(handle.position).unwrap().row;
        let chunk_idx = self.slots.get(handle.position).unwrap().chunk_index;
        self.chunks[chunk_idx].row_bytes_mut(id, row)?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn remove_component(&mut self, handle: EntityId, id: u8) -> Result<()> {
        self.validate(handle)?;
        let def = self.current_definition(handle.position);
        if !def.components.test(id) {
            return Err(EcsError::MissingComponent);
        }
        let new_def = def.with_component(id, false);
        self.migrate(handle.position, new_def)
    }

    pub fn contains_component(&self, handle: EntityId, id: u8) -> bool {
        self.current_definition_checked(handle).map(|d| d.components.test(id)).unwrap_or(false)
    }

    pub fn get_component<C: Any>(&self, handle: EntityId) -> Result<&C> {
        let id = self.schema.lookup::<C>(Kind::Component)?;
        let bytes = self.get_component_bytes(handle, id)?;
        Ok(unsafe { &*(bytes.as_ptr() as *const C) })
    }

    pub fn get_component_bytes(&self, handle: EntityId, id: u8) -> Result<&[u8]> {
        self.validate(handle)?;
        let slot = self.slots.get(handle.position).unwrap();
        self.chunks[slot.chunk_index].row_bytes(id, slot.row)
    }

    pub fn get_component_bytes_mut(&mut self, handle: EntityId, id: u8) -> Result<&mut [u8]> {
        self.validate(handle)?;
        let slot = self.slots.get(handle.position).unwrap();
        let (chunk_idx, row) = (slot.chunk_index, slot.row);
        self.chunks[chunk_idx].row_bytes_mut(id, row)
    }

    pub fn set_component_bytes(&mut self, handle: EntityId, id: u8, bytes: &[u8]) -> Result<()> {
        self.get_component_bytes_mut(handle, id)?.copy_from_slice(bytes);
        Ok(())
    }

    // ---- arrays ------------------------------------------------------

    pub fn create_array(&mut self, handle: EntityId, elem_id: u8, length: usize) -> Result<()> {
        self.validate(handle)?;
        if self.slots.get(handle.position).unwrap().arrays.contains_key(&elem_id) {
            return Err(EcsError::AlreadyHasArray);
        }
        let elem_size = self.schema.size(Kind::Array, elem_id)?;
        let buffer = ArrayBuffer::new(elem_size, length);
        self.slots.get_mut(handle.position).unwrap().arrays.insert(elem_id, buffer);
        let new_def = self.current_definition(handle.position).with_array(elem_id, true);
        self.migrate(handle.position, new_def)
    }

    pub fn destroy_array(&mut self, handle: EntityId, elem_id: u8) -> Result<()> {
        self.validate(handle)?;
        if self.slots.get_mut(handle.position).unwrap().arrays.remove(&elem_id).is_none() {
            return Err(EcsError::MissingArray);
        }
        let new_def = self.current_definition(handle.position).with_array(elem_id, false);
        self.migrate(handle.position, new_def)
    }

    pub fn resize_array(&mut self, handle: EntityId, elem_id: u8, length: usize) -> Result<()> {
        self.validate(handle)?;
        let slot = self.slots.get_mut(handle.position).unwrap();
        let buffer = slot.arrays.get_mut(&elem_id).ok_or(EcsError::MissingArray)?;
        buffer.resize(length);
        Ok(())
    }

    pub fn contains_array(&self, handle: EntityId, elem_id: u8) -> bool {
        self.slots.get(handle.position).map(|s| s.arrays.contains_key(&elem_id)).unwrap_or(false)
    }

    pub fn get_array(&self, handle: EntityId, elem_id: u8) -> Result<&[u8]> {
        self.validate(handle)?;
        let slot = self.slots.get(handle.position).unwrap();
        Ok(&slot.arrays.get(&elem_id).ok_or(EcsError::MissingArray)?.data)
    }

    pub fn get_array_mut(&mut self, handle: EntityId, elem_id: u8) -> Result<&mut [u8]> {
        self.validate(handle)?;
        let slot = self.slots.get_mut(handle.position).unwrap();
        Ok(&mut slot.arrays.get_mut(&elem_id).ok_or(EcsError::MissingArray)?.data)
    }

    pub fn array_len(&self, handle: EntityId, elem_id: u8) -> Result<usize> {
        self.validate(handle)?;
        let slot = self.slots.get(handle.position).unwrap();
        Ok(slot.arrays.get(&elem_id).ok_or(EcsError::MissingArray)?.length())
    }

    // ---- tags ------------------------------------------------------

    pub fn add_tag(&mut self, handle: EntityId, tag_id: u8) -> Result<()> {
        self.validate(handle)?;
        let def = self.current_definition(handle.position);
        if def.tags.test(tag_id) {
            return Err(EcsError::AlreadyHasTag);
        }
        self.migrate(handle.position, def.with_tag(tag_id, true))
    }

    pub fn remove_tag(&mut self, handle: EntityId, tag_id: u8) -> Result<()> {
        self.validate(handle)?;
        let def = self.current_definition(handle.position);
        if !def.tags.test(tag_id) {
            return Err(EcsError::MissingTag);
        }
        self.migrate(handle.position, def.with_tag(tag_id, false))
    }

    pub fn contains_tag(&self, handle: EntityId, tag_id: u8) -> bool {
        self.current_definition_checked(handle).map(|d| d.tags.test(tag_id)).unwrap_or(false)
    }

    fn current_definition_checked(&self, handle: EntityId) -> Option<Definition> {
        if !self.slots.contains(handle) {
            return None;
        }
        Some(self.current_definition(handle.position))
    }

    // ---- references ------------------------------------------------------

    /// Appends `target` to `handle`'s reference list. Returns the 1-based
    /// `rint` the caller should use to look it up later.
    pub fn add_reference(&mut self, handle: EntityId, target: EntityId) -> Result<usize> {
        self.validate(handle)?;
        let slot = self.slots.get_mut(handle.position).unwrap();
        slot.references.push(target.position);
        Ok(slot.references.len())
    }

    pub fn get_reference(&self, handle: EntityId, rint: usize) -> Result<EntityId> {
        self.validate(handle)?;
        let slot = self.slots.get(handle.position).unwrap();
        let &position = slot.references.get(rint - 1).ok_or(EcsError::InvalidHandle)?;
        Ok(EntityId { position, version: self.slots.version_of(position) })
    }

    pub fn contains_reference(&self, handle: EntityId, rint: usize) -> bool {
        self.slots.get(handle.position).map(|s| rint >= 1 && rint <= s.references.len()).unwrap_or(false)
    }

    pub fn reference_count(&self, handle: EntityId) -> Result<usize> {
        self.validate(handle)?;
        Ok(self.slots.get(handle.position).unwrap().references.len())
    }

    /// Removes the reference at `rint` (swap-with-last). Returns the rint
    /// that was reassigned and its target, if the removed slot wasn't last.
    pub fn remove_reference(&mut self, handle: EntityId, rint: usize) -> Result<Option<(usize, EntityId)>> {
        self.validate(handle)?;
        let slot = self.slots.get_mut(handle.position).unwrap();
        if rint < 1 || rint > slot.references.len() {
            return Err(EcsError::InvalidHandle);
        }
        let last = slot.references.len() - 1;
        let idx = rint - 1;
        if idx != last {
            slot.references.swap(idx, last);
            let moved = slot.references[idx];
            slot.references.pop();
            let moved_version = self.slots.version_of(moved);
            return Ok(Some((rint, EntityId { position: moved, version: moved_version })));
        }
        slot.references.pop();
        Ok(None)
    }

    // ---- parent / children ------------------------------------------------------

    fn is_ancestor(&self, candidate: u32, of: u32) -> bool {
        let mut cursor = of;
        while cursor != 0 {
            if cursor == candidate {
                return true;
            }
            cursor = self.slots.get(cursor).map(|s| s.parent).unwrap_or(0);
        }
        false
    }

    pub fn set_parent(&mut self, handle: EntityId, parent: Option<EntityId>) -> Result<()> {
        self.validate(handle)?;
        let parent_position = parent.map(|p| p.position).unwrap_or(0);
        if parent_position != 0 {
            self.validate(parent.unwrap())?;
            if parent_position == handle.position || self.is_ancestor(handle.position, parent_position) {
                return Err(EcsError::WouldCycle);
            }
        }

        let old_parent = self.slots.get(handle.position).unwrap().parent;
        if old_parent != 0 {
            if let Some(old_parent_slot) = self.slots.get_mut(old_parent) {
                old_parent_slot.children.retain(|&c| c != handle.position);
            }
        }

        self.slots.get_mut(handle.position).unwrap().parent = parent_position;
        if parent_position != 0 {
            self.slots.get_mut(parent_position).unwrap().children.push(handle.position);
        }
        Ok(())
    }

    pub fn parent(&self, handle: EntityId) -> Result<Option<EntityId>> {
        self.validate(handle)?;
        let parent_position = self.slots.get(handle.position).unwrap().parent;
        if parent_position == 0 {
            Ok(None)
        } else {
            Ok(Some(EntityId { position: parent_position, version: self.slots.version_of(parent_position) }))
        }
    }

    pub fn children(&self, handle: EntityId) -> Result<Vec<EntityId>> {
        self.validate(handle)?;
        let slot = self.slots.get(handle.position).unwrap();
        Ok(slot
            .children
            .iter()
            .map(|&position| EntityId { position, version: self.slots.version_of(position) })
            .collect())
    }

    // ---- clone / append ------------------------------------------------------

    pub fn clone_entity(&mut self, handle: EntityId) -> Result<EntityId> {
        self.validate(handle)?;
        let source_def = self.current_definition(handle.position);
        let new_handle = self.create_entity();

        for id in source_def.components.ones() {
            let row = self.slots.get(handle.position).unwrap().row;
            let chunk_idx = self.slots.get(handle.position).unwrap().chunk_index;
            let bytes = self.chunks[chunk_idx].row_bytes(id, row)?.to_vec();
            self.add_component_raw(new_handle, id, &bytes)?;
        }

        let arrays: Vec<(u8, ArrayBuffer)> =
            self.slots.get(handle.position).unwrap().arrays.iter().map(|(&id, buf)| (id, buf.clone())).collect();
        for (id, buffer) in arrays {
            self.create_array(new_handle, id, buffer.length())?;
            self.slots.get_mut(new_handle.position).unwrap().arrays.insert(id, buffer);
        }

        for tag_id in source_def.tags.ones() {
            if tag_id == crate::schema::DISABLED_TAG {
                continue;
            }
            self.add_tag(new_handle, tag_id)?;
        }

        let references = self.slots.get(handle.position).unwrap().references.clone();
        self.slots.get_mut(new_handle.position).unwrap().references = references;

        let enabled = self.slots.get(handle.position).unwrap().enabled;
        self.set_enabled(new_handle, enabled)?;

        Ok(new_handle)
    }

    /// Copies every live entity of `other` into `self`. Two-pass: all
    /// entities are created first (building a position map), then
    /// components/arrays/tags/references/parent links are copied with
    /// positions remapped through that map, so forward references resolve.
    pub fn append(&mut self, other: &World) -> AppendMap {
        let mut map: AppendMap = vec![None; other.slots.high_water_mark() as usize + 1];

        for position in other.slots.iter_live_positions() {
            map[position as usize] = Some(self.create_entity());
        }

        for position in other.slots.iter_live_positions() {
            let new_handle = map[position as usize].unwrap();
            let other_slot = other.slots.get(position).unwrap();
            let other_def = other.current_definition(position);

            for id in other_def.components.ones() {
                let bytes = other.chunks[other_slot.chunk_index].row_bytes(id, other_slot.row).unwrap();
                let _ = self.add_component_raw(new_handle, id, bytes);
            }

            for (&id, buffer) in other_slot.arrays.iter() {
                if self.create_array(new_handle, id, buffer.length()).is_ok() {
                    self.slots.get_mut(new_handle.position).unwrap().arrays.insert(id, buffer.clone());
                }
            }

            for tag_id in other_def.tags.ones() {
                if tag_id == crate::schema::DISABLED_TAG {
                    continue;
                }
                let _ = self.add_tag(new_handle, tag_id);
            }
            let _ = self.set_enabled(new_handle, other_slot.enabled);

            for &ref_target in other_slot.references.iter() {
                if let Some(mapped) = map.get(ref_target as usize).copied().flatten() {
                    let _ = self.add_reference(new_handle, mapped);
                }
            }

            if other_slot.parent != 0 {
                if let Some(mapped_parent) = map.get(other_slot.parent as usize).copied().flatten() {
                    let _ = self.set_parent(new_handle, Some(mapped_parent));
                }
            }
        }

        map
    }

    // ---- events ------------------------------------------------------

    pub fn submit_event<T: Event>(&mut self, value: T) {
        self.event_bus.submit(value);
    }

    pub fn listen<T: Event>(&mut self, callback: impl FnMut(&mut World, &T) + 'static) -> ListenerHandle {
        self.event_bus.listen(callback)
    }

    pub fn unlisten(&mut self, handle: ListenerHandle) -> bool {
        self.event_bus.unlisten(handle)
    }

    pub fn poll_events(&mut self) -> usize {
        event_bus::poll(self, None)
    }

    pub fn poll_events_capped(&mut self, cap: Option<usize>) -> usize {
        event_bus::poll(self, cap)
    }

    pub(crate) fn materialize_at_exact_position(&mut self, target_position: u32) -> EntityId {
        while self.slots.high_water_mark() + 1 < target_position {
            let filler = self.slots.allocate_fresh();
            let chunk_idx = self.get_or_create_chunk(Definition::EMPTY);
            let row = self.chunks[chunk_idx].add_row(filler.position);
            let slot = self.slots.get_mut(filler.position).unwrap();
            slot.chunk_index = chunk_idx;
            slot.row = row;
            self.destroy_position(filler.position, false);
        }
        let handle = self.slots.allocate_fresh();
        debug_assert_eq!(handle.position, target_position);
        let chunk_idx = self.get_or_create_chunk(Definition::EMPTY);
        let row = self.chunks[chunk_idx].add_row(handle.position);
        let slot = self.slots.get_mut(handle.position).unwrap();
        slot.chunk_index = chunk_idx;
        slot.row = row;
        handle
    }

    pub(crate) fn live_positions(&self) -> Vec<u32> {
        self.slots.iter_live_positions().collect()
    }

    pub(crate) fn slot_arrays(&self, position: u32) -> Vec<(u8, &ArrayBuffer)> {
        self.slots.get(position).map(|s| s.arrays.iter().map(|(&id, b)| (id, b)).collect()).unwrap_or_default()
    }

    pub(crate) fn slot_references(&self, position: u32) -> SmallVec<[u32; 4]> {
        self.slots.get(position).map(|s| s.references.clone()).unwrap_or_default()
    }

    pub(crate) fn slot_parent(&self, position: u32) -> u32 {
        self.slots.get(position).map(|s| s.parent).unwrap_or(0)
    }

    pub(crate) fn slot_enabled(&self, position: u32) -> bool {
        self.slots.get(position).map(|s| s.enabled).unwrap_or(true)
    }

    pub(crate) fn definition_at(&self, position: u32) -> Definition {
        self.current_definition(position)
    }

    pub(crate) fn handle_at(&self, position: u32) -> EntityId {
        EntityId { position, version: self.slots.version_of(position) }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Kind;

    #[test]
    fn create_entity_starts_in_empty_chunk() {
        let mut world = World::new();
        let e = world.create_entity();
        assert!(world.contains_entity(e));
        assert_eq!(world.definition_at(e.position), Definition::EMPTY);
    }

    #[test]
    fn destroy_invalidates_handle_and_frees_position() {
        let mut world = World::new();
        let e = world.create_entity();
        world.destroy_entity(e).unwrap();
        assert!(!world.contains_entity(e));
        assert!(matches!(world.destroy_entity(e), Err(EcsError::InvalidHandle)));
    }

    #[test]
    fn add_and_remove_component_round_trips() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, 42u32).unwrap();
        assert_eq!(*world.get_component::<u32>(e).unwrap(), 42u32);
        assert!(matches!(world.add_component(e, 7u32), Err(EcsError::AlreadyHasComponent)));

        let id = world.schema().lookup::<u32>(Kind::Component).unwrap();
        world.remove_component(e, id).unwrap();
        assert!(!world.contains_component(e, id));
        assert!(matches!(world.remove_component(e, id), Err(EcsError::MissingComponent)));
    }

    #[test]
    fn remove_row_swap_updates_surviving_slot() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        world.add_component(a, 1u32).unwrap();
        world.add_component(b, 2u32).unwrap();
        world.destroy_entity(a).unwrap();
        assert_eq!(*world.get_component::<u32>(b).unwrap(), 2u32);
    }

    #[test]
    fn set_enabled_toggles_disabled_tag() {
        let mut world = World::new();
        let e = world.create_entity();
        assert!(world.is_enabled(e).unwrap());
        world.set_enabled(e, false).unwrap();
        assert!(!world.is_enabled(e).unwrap());
        assert!(world.contains_tag(e, crate::schema::DISABLED_TAG));
        world.set_enabled(e, true).unwrap();
        assert!(!world.contains_tag(e, crate::schema::DISABLED_TAG));
    }

    #[test]
    fn set_parent_detects_cycle() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        world.set_parent(b, Some(a)).unwrap();
        assert!(matches!(world.set_parent(a, Some(b)), Err(EcsError::WouldCycle)));
        assert!(matches!(world.set_parent(a, Some(a)), Err(EcsError::WouldCycle)));
    }

    #[test]
    fn destroying_parent_recursively_destroys_children() {
        let mut world = World::new();
        let parent = world.create_entity();
        let child = world.create_entity();
        world.set_parent(child, Some(parent)).unwrap();
        world.destroy_entity(parent).unwrap();
        assert!(!world.contains_entity(child));
    }

    #[test]
    fn references_support_rint_lookup_and_swap_remove() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        let c = world.create_entity();
        let rint_b = world.add_reference(a, b).unwrap();
        let rint_c = world.add_reference(a, c).unwrap();
        assert_eq!(world.get_reference(a, rint_b).unwrap(), b);
        assert_eq!(world.get_reference(a, rint_c).unwrap(), c);

        let reassigned = world.remove_reference(a, rint_b).unwrap();
        assert_eq!(reassigned, Some((rint_b, c)));
        assert_eq!(world.get_reference(a, rint_b).unwrap(), c);
    }

    #[test]
    fn clone_entity_copies_components_and_tags_not_parent() {
        let mut world = World::new();
        let tag = world.schema_mut().register::<bool>(Kind::Tag).unwrap();
        let parent = world.create_entity();
        let original = world.create_entity();
        world.add_component(original, 5u32).unwrap();
        world.add_tag(original, tag).unwrap();
        world.set_parent(original, Some(parent)).unwrap();

        let copy = world.clone_entity(original).unwrap();
        assert_eq!(*world.get_component::<u32>(copy).unwrap(), 5u32);
        assert!(world.contains_tag(copy, tag));
        assert_eq!(world.parent(copy).unwrap(), None);
    }

    #[test]
    fn append_remaps_references_and_parents() {
        let mut source = World::new();
        let parent = source.create_entity();
        let child = source.create_entity();
        source.set_parent(child, Some(parent)).unwrap();
        source.add_reference(child, parent).unwrap();
        source.add_component(child, 11u32).unwrap();

        let mut dest = World::new();
        let map = dest.append(&source);
        let new_parent = map[parent.position as usize].unwrap();
        let new_child = map[child.position as usize].unwrap();

        assert_eq!(dest.parent(new_child).unwrap(), Some(new_parent));
        assert_eq!(dest.get_reference(new_child, 1).unwrap(), new_parent);
        assert_eq!(*dest.get_component::<u32>(new_child).unwrap(), 11u32);
    }
}
