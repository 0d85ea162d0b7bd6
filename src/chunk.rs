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

//! Columnar storage for one archetype: every entity with an identical
//! `Definition` lives in the same `Chunk`, one flat byte column per
//! component id, ordered ascending.
//!
//! Components are fixed-size, copy-safe, pointer-free blobs, so a column is
//! just `Vec<u8>` sliced by `item_size`; there is no drop glue to run on
//! removal.

use crate::definition::Definition;
use crate::error::{EcsError, Result};
use crate::schema::{Kind, Schema};

#[derive(Debug)]
struct ComponentColumn {
    item_size: usize,
    data: Vec<u8>,
}

impl ComponentColumn {
    fn new(item_size: usize) -> Self {
        Self { item_size, data: Vec::new() }
    }

    fn len(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    fn push_zeroed(&mut self) {
        self.data.resize(self.data.len() + self.item_size, 0);
    }

    fn row(&self, row: usize) -> &[u8] {
        let start = row * self.item_size;
        &self.data[start..start + self.item_size]
    }

    fn row_mut(&mut self, row: usize) -> &mut [u8] {
        let start = row * self.item_size;
        &mut self.data[start..start + self.item_size]
    }

    /// Removes `row` by swapping the last row into its place, matching the
    /// swap semantics `Chunk::remove_row` exposes on the entity column.
    fn swap_remove(&mut self, row: usize) {
        if self.item_size == 0 {
            return;
        }
        let len = self.len();
        let last = len - 1;
        if row != last {
            let item_size = self.item_size;
            let (head, tail) = self.data.split_at_mut(last * item_size);
            head[row * item_size..row * item_size + item_size].copy_from_slice(&tail[..item_size]);
        }
        self.data.truncate(last * self.item_size);
    }
}

/// A single archetype's storage: an ordered column of entity positions plus
/// one byte column per component id set in `definition.components`.
#[derive(Debug)]
pub(crate) struct Chunk {
    definition: Definition,
    entities: Vec<u32>,
    columns: Vec<(u8, ComponentColumn)>,
}

impl Chunk {
    pub fn new(definition: Definition, schema: &Schema) -> Self {
        let columns = definition
            .components
            .ones()
            .map(|id| {
                let size = schema.size(Kind::Component, id).unwrap_or(0);
                (id, ComponentColumn::new(size))
            })
            .collect();
        Self { definition, entities: Vec::new(), columns }
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn row_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[u32] {
        &self.entities
    }

    pub fn add_row(&mut self, position: u32) -> usize {
        let row = self.entities.len();
        self.entities.push(position);
        for (_, column) in self.columns.iter_mut() {
            column.push_zeroed();
        }
        row
    }

    /// Removes `row` via swap-with-last. Returns the position of the entity
    /// that was swapped into the vacated row, if any, so the caller can fix
    /// up that entity's slot.
    pub fn remove_row(&mut self, row: usize) -> Option<u32> {
        let last = self.entities.len() - 1;
        let swapped = if row != last { Some(self.entities[last]) } else { None };
        self.entities.swap_remove(row);
        for (_, column) in self.columns.iter_mut() {
            column.swap_remove(row);
        }
        swapped
    }

    fn column_index(&self, id: u8) -> Result<usize> {
        self.columns.binary_search_by_key(&id, |(cid, _)| *cid).map_err(|_| EcsError::MissingComponent)
    }

    pub fn column_bytes(&self, id: u8) -> Result<&[u8]> {
        let idx = self.column_index(id)?;
        Ok(&self.columns[idx].1.data)
    }

    pub fn row_bytes(&self, id: u8, row: usize) -> Result<&[u8]> {
        let idx = self.column_index(id)?;
        Ok(self.columns[idx].1.row(row))
    }

    pub fn row_bytes_mut(&mut self, id: u8, row: usize) -> Result<&mut [u8]> {
        let idx = self.column_index(id)?;
        Ok(self.columns[idx].1.row_mut(row))
    }

    pub fn item_size(&self, id: u8) -> Result<usize> {
        let idx = self.column_index(id)?;
        Ok(self.columns[idx].1.item_size)
    }

    /// Copies one row into a new row of `dst`, transferring only the
    /// components present in both chunks. Used by `World`'s migration path
    /// when an entity gains or loses a component/array/tag.
    pub fn copy_row_to(&self, row: usize, dst: &mut Chunk) -> usize {
        let dst_row = dst.add_row(self.entities[row]);
        for (id, column) in &self.columns {
            if let Ok(dst_idx) = dst.column_index(*id) {
                let src_bytes = column.row(row);
                dst.columns[dst_idx].1.row_mut(dst_row).copy_from_slice(src_bytes);
            }
        }
        dst_row
    }
}

/// Returns mutable references to two distinct indices of the same vector.
/// Panics if `a == b`.
pub(crate) fn two_mut<T>(slice: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b);
    if a < b {
        let (left, right) = slice.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = slice.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
