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

//! `Definition`: the three-axis bitmask that keys a chunk and drives query
//! matching. One `BitMask` per axis (components, array elements, tags).

use crate::bitset::BitMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Definition {
    pub components: BitMask,
    pub arrays: BitMask,
    pub tags: BitMask,
}

impl Definition {
    pub const EMPTY: Definition = Definition {
        components: BitMask::EMPTY,
        arrays: BitMask::EMPTY,
        tags: BitMask::EMPTY,
    };

    pub fn with_component(mut self, id: u8, present: bool) -> Self {
        self.components = self.components.with(id, present);
        self
    }

    pub fn with_array(mut self, id: u8, present: bool) -> Self {
        self.arrays = self.arrays.with(id, present);
        self
    }

    pub fn with_tag(mut self, id: u8, present: bool) -> Self {
        self.tags = self.tags.with(id, present);
        self
    }

    /// True iff `self` satisfies an `include` filter: every axis of `other`
    /// is a subset of the matching axis of `self`.
    pub fn contains_all(&self, other: &Definition) -> bool {
        self.components.contains_all(&other.components)
            && self.arrays.contains_all(&other.arrays)
            && self.tags.contains_all(&other.tags)
    }

    /// True iff `self` shares at least one bit with `other` on any axis; used
    /// to test an `exclude` filter.
    pub fn intersects(&self, other: &Definition) -> bool {
        self.components.intersects(&other.components)
            || self.arrays.intersects(&other.arrays)
            || self.tags.intersects(&other.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trips() {
        let def = Definition::EMPTY.with_component(3, true).with_tag(0, true);
        assert!(def.components.test(3));
        assert!(def.tags.test(0));
        assert!(def.arrays.is_empty());
    }

    #[test]
    fn contains_all_checks_every_axis() {
        let include = Definition::EMPTY.with_component(1, true).with_array(2, true);
        let chunk_def = include.with_component(9, true);
        assert!(chunk_def.contains_all(&include));
        assert!(!include.contains_all(&chunk_def));
    }

    #[test]
    fn intersects_checks_every_axis() {
        let exclude = Definition::EMPTY.with_tag(5, true);
        let with_tag = Definition::EMPTY.with_tag(5, true).with_component(1, true);
        let without_tag = Definition::EMPTY.with_component(1, true);
        assert!(with_tag.intersects(&exclude));
        assert!(!without_tag.intersects(&exclude));
    }
}
