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

//! Entity identity and the slot table that backs it.
//!
//! An entity is a `(position, version)` pair. Position 0 is reserved and
//! never assigned to a live entity, so `EntityId::NONE` can always be
//! distinguished from a real handle without an `Option` wrapper.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityId {
    pub position: u32,
    pub version: u32,
}

impl EntityId {
    pub const NONE: EntityId = EntityId { position: 0, version: 0 };

    pub fn is_none(&self) -> bool {
        self.position == 0
    }
}

/// A fixed-size per-entity array payload. Arrays live on the slot rather than
/// in a chunk column because their length varies per entity.
#[derive(Debug, Clone)]
pub struct ArrayBuffer {
    pub elem_size: usize,
    pub data: Vec<u8>,
}

impl ArrayBuffer {
    pub fn new(elem_size: usize, length: usize) -> Self {
        Self { elem_size, data: vec![0u8; elem_size * length] }
    }

    pub fn length(&self) -> usize {
        if self.elem_size == 0 {
            0
        } else {
            self.data.len() / self.elem_size
        }
    }

    pub fn resize(&mut self, length: usize) {
        self.data.resize(self.elem_size * length, 0);
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub version: u32,
    pub live: bool,
    pub enabled: bool,
    pub chunk_index: usize,
    pub row: usize,
    pub parent: u32,
    pub children: SmallVec<[u32; 4]>,
    pub references: SmallVec<[u32; 4]>,
    pub arrays: FxHashMap<u8, ArrayBuffer>,
}

impl Slot {
    fn sentinel() -> Self {
        Slot {
            version: 0,
            live: false,
            enabled: false,
            chunk_index: 0,
            row: 0,
            parent: 0,
            children: SmallVec::new(),
            references: SmallVec::new(),
            arrays: FxHashMap::default(),
        }
    }

    fn fresh_live(version: u32) -> Self {
        Slot {
            version,
            live: true,
            enabled: true,
            chunk_index: 0,
            row: 0,
            parent: 0,
            children: SmallVec::new(),
            references: SmallVec::new(),
            arrays: FxHashMap::default(),
        }
    }
}

/// Dense table of entity slots with a free list for position reuse.
///
/// Index 0 is a permanent sentinel (matches `EntityId::NONE`) and is never
/// handed out by `allocate`.
#[derive(Debug)]
pub(crate) struct EntitySlotTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live_count: usize,
}

impl EntitySlotTable {
    pub fn new() -> Self {
        Self { slots: vec![Slot::sentinel()], free: Vec::new(), live_count: 0 }
    }

    /// Allocates a handle, reusing a freed position when one is available.
    pub fn allocate(&mut self) -> EntityId {
        self.live_count += 1;
        if let Some(position) = self.free.pop() {
            let slot = &mut self.slots[position as usize];
            slot.live = true;
            slot.enabled = true;
            slot.chunk_index = 0;
            slot.row = 0;
            slot.parent = 0;
            slot.children.clear();
            slot.references.clear();
            slot.arrays.clear();
            EntityId { position, version: slot.version }
        } else {
            let position = self.slots.len() as u32;
            self.slots.push(Slot::fresh_live(1));
            EntityId { position, version: 1 }
        }
    }

    /// Allocates a new position unconditionally, bypassing the free list.
    /// Used only by the deserializer to reconstruct an exact position
    /// sequence, including positions that the source world left dead.
    pub fn allocate_fresh(&mut self) -> EntityId {
        self.live_count += 1;
        let position = self.slots.len() as u32;
        self.slots.push(Slot::fresh_live(1));
        EntityId { position, version: 1 }
    }

    pub fn get(&self, position: u32) -> Option<&Slot> {
        self.slots.get(position as usize).filter(|s| s.live)
    }

    pub fn get_mut(&mut self, position: u32) -> Option<&mut Slot> {
        self.slots.get_mut(position as usize).filter(|s| s.live)
    }

    pub fn version_of(&self, position: u32) -> u32 {
        self.slots.get(position as usize).map(|s| s.version).unwrap_or(0)
    }

    pub fn contains(&self, handle: EntityId) -> bool {
        if handle.is_none() {
            return false;
        }
        match self.slots.get(handle.position as usize) {
            Some(slot) => slot.live && slot.version == handle.version,
            None => false,
        }
    }

    /// Marks `position` dead, bumps its generation, and returns it to the
    /// free list. Panics if `position` is not currently live; callers must
    /// validate the handle first.
    pub fn destroy(&mut self, position: u32) {
        let slot = &mut self.slots[position as usize];
        debug_assert!(slot.live, "destroying a slot that is not live");
        slot.live = false;
        slot.version = slot.version.wrapping_add(1);
        slot.children.clear();
        slot.references.clear();
        slot.arrays.clear();
        slot.parent = 0;
        self.free.push(position);
        self.live_count -= 1;
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Highest position ever allocated (inclusive of dead/filler slots), used
    /// by the serializer to size its entity table.
    pub fn high_water_mark(&self) -> u32 {
        self.slots.len() as u32 - 1
    }

    /// Live positions in ascending order.
    pub fn iter_live_positions(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().enumerate().skip(1).filter(|(_, s)| s.live).map(|(i, _)| i as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_handle_is_position_zero() {
        assert!(EntityId::NONE.is_none());
        assert_eq!(EntityId::NONE.position, 0);
    }

    #[test]
    fn allocate_never_returns_position_zero() {
        let mut table = EntitySlotTable::new();
        let handle = table.allocate();
        assert_ne!(handle.position, 0);
    }

    #[test]
    fn destroy_then_allocate_reuses_position_with_new_version() {
        let mut table = EntitySlotTable::new();
        let first = table.allocate();
        table.destroy(first.position);
        let second = table.allocate();
        assert_eq!(first.position, second.position);
        assert_ne!(first.version, second.version);
        assert!(!table.contains(first));
        assert!(table.contains(second));
    }

    #[test]
    fn allocate_fresh_never_reuses_free_list() {
        let mut table = EntitySlotTable::new();
        let a = table.allocate();
        table.destroy(a.position);
        let b = table.allocate_fresh();
        assert_ne!(a.position, b.position);
    }

    #[test]
    fn live_count_tracks_allocations_and_destructions() {
        let mut table = EntitySlotTable::new();
        let a = table.allocate();
        let _b = table.allocate();
        assert_eq!(table.live_count(), 2);
        table.destroy(a.position);
        assert_eq!(table.live_count(), 1);
    }
}
