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

//! A single query type parameterized by include/exclude `Definition`s,
//! rather than a generic-arity fetch trait per tuple size. The caller
//! supplies the component ids it wants returned per row at construction; the
//! query resolves each matching chunk's column slices once per chunk, not
//! once per row.
//!
//! The query holds a raw pointer to the world rather than a borrowed
//! reference, the same way the teacher's `QueryIter`/`QueryIterMut` used
//! `NonNull` to iterate archetype storage: the core does not ask the borrow
//! checker to forbid mutation while a query is live, it asks a debug
//! assertion on the world's chunk-topology counter to catch it instead.

#[cfg(feature = "profiling")]
use tracing::trace_span;

use smallvec::SmallVec;

use crate::definition::Definition;
use crate::schema::Kind;
use crate::world::World;

fn matches(def: &Definition, include: &Definition, exclude: &Definition) -> bool {
    def.contains_all(include) && !def.intersects(exclude)
}

/// Three-axis query over a world: every chunk whose `Definition` is a
/// superset of `include` and disjoint from `exclude` matches.
pub struct Query {
    world: *const World,
    include: Definition,
    exclude: Definition,
    columns: SmallVec<[(u8, usize); 8]>,
}

impl Query {
    /// `component_ids` names the component ids each row should yield, in the
    /// order they should appear in `QueryRow::columns`.
    pub fn new(world: &World, include: Definition, exclude: Definition, component_ids: &[u8]) -> Self {
        #[cfg(feature = "profiling")]
        let _span = trace_span!("query_new").entered();

        let columns = component_ids
            .iter()
            .map(|&id| (id, world.schema().size(Kind::Component, id).unwrap_or(0)))
            .collect();
        Self { world: world as *const World, include, exclude, columns }
    }

    fn world(&self) -> &World {
        // SAFETY: `Query::new` took `world` from a live `&World`; the caller
        // is responsible for not freeing the world while a `Query` outlives
        // it, the same contract `spec.md`'s concurrency model places on the
        // caller rather than the type system.
        unsafe { &*self.world }
    }

    fn matched_chunks(&self) -> Vec<usize> {
        let world = self.world();
        world
            .chunk_definitions()
            .iter()
            .enumerate()
            .filter(|(_, def)| matches(def, &self.include, &self.exclude))
            .filter(|(idx, _)| world.chunk_row_count(*idx) > 0)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn iter(&self) -> QueryIter<'_> {
        let matched = self.matched_chunks();
        QueryIter {
            world: self.world,
            matched,
            columns: self.columns.clone(),
            chunk_cursor: 0,
            row_cursor: 0,
            current: None,
            captured_version: self.world().topology_version(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Number of rows the query would yield, without materializing rows.
    pub fn count(&self) -> usize {
        let world = self.world();
        self.matched_chunks().iter().map(|&idx| world.chunk_row_count(idx)).sum()
    }
}

impl<'q> IntoIterator for &'q Query {
    type Item = QueryRow<'q>;
    type IntoIter = QueryIter<'q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One matched row: the entity's position plus a byte slice per requested
/// component id, in the order the query was constructed with.
pub struct QueryRow<'q> {
    pub entity_position: u32,
    pub columns: SmallVec<[&'q [u8]; 8]>,
}

struct ResolvedChunk<'q> {
    entities: &'q [u32],
    column_data: SmallVec<[&'q [u8]; 8]>,
}

pub struct QueryIter<'q> {
    world: *const World,
    matched: Vec<usize>,
    columns: SmallVec<[(u8, usize); 8]>,
    chunk_cursor: usize,
    row_cursor: usize,
    current: Option<ResolvedChunk<'q>>,
    captured_version: u64,
    _marker: std::marker::PhantomData<&'q World>,
}

impl<'q> Iterator for QueryIter<'q> {
    type Item = QueryRow<'q>;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: see `Query::world`.
        let world = unsafe { &*self.world };

        debug_assert_eq!(
            world.topology_version(),
            self.captured_version,
            "IteratorInvalidated: world chunk layout changed during query iteration"
        );

        loop {
            if self.current.is_none() {
                let chunk_idx = *self.matched.get(self.chunk_cursor)?;
                let column_data = self
                    .columns
                    .iter()
                    .map(|&(id, _)| world.chunk_column_bytes(chunk_idx, id).unwrap_or(&[]))
                    .collect();
                self.current = Some(ResolvedChunk { entities: world.chunk_entities(chunk_idx), column_data });
                self.row_cursor = 0;
            }

            let resolved = self.current.as_ref().unwrap();
            if self.row_cursor >= resolved.entities.len() {
                self.current = None;
                self.chunk_cursor += 1;
                continue;
            }

            let row = self.row_cursor;
            self.row_cursor += 1;
            let entity_position = resolved.entities[row];
            let columns: SmallVec<[&'q [u8]; 8]> = self
                .columns
                .iter()
                .zip(resolved.column_data.iter())
                .map(|(&(_, size), &col)| if size == 0 { &col[0..0] } else { &col[row * size..row * size + size] })
                .collect();
            return Some(QueryRow { entity_position, columns });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_matches_only_superset_chunks() {
        let mut world = World::new();
        let a = world.schema_mut().register::<u32>(Kind::Component).unwrap();
        let b = world.schema_mut().register::<u64>(Kind::Component).unwrap();

        let with_both = world.create_entity();
        world.add_component_raw(with_both, a, &1u32.to_le_bytes()).unwrap();
        world.add_component_raw(with_both, b, &2u64.to_le_bytes()).unwrap();

        let with_a_only = world.create_entity();
        world.add_component_raw(with_a_only, a, &3u32.to_le_bytes()).unwrap();

        let include = Definition::EMPTY.with_component(a, true);
        let exclude = Definition::EMPTY;
        let query = Query::new(&world, include, exclude, &[a]);
        let positions: Vec<u32> = query.iter().map(|r| r.entity_position).collect();
        assert_eq!(positions.len(), 2);
        assert!(positions.contains(&with_both.position));
        assert!(positions.contains(&with_a_only.position));
    }

    #[test]
    fn query_exclude_filters_out_matching_bit() {
        let mut world = World::new();
        let a = world.schema_mut().register::<u32>(Kind::Component).unwrap();
        let tag = world.schema_mut().register::<bool>(Kind::Tag).unwrap();

        let tagged = world.create_entity();
        world.add_component_raw(tagged, a, &1u32.to_le_bytes()).unwrap();
        world.add_tag(tagged, tag).unwrap();

        let untagged = world.create_entity();
        world.add_component_raw(untagged, a, &2u32.to_le_bytes()).unwrap();

        let include = Definition::EMPTY.with_component(a, true);
        let exclude = Definition::EMPTY.with_tag(tag, true);
        let query = Query::new(&world, include, exclude, &[a]);
        let positions: Vec<u32> = query.iter().map(|r| r.entity_position).collect();
        assert_eq!(positions, vec![untagged.position]);
    }

    #[test]
    #[should_panic(expected = "IteratorInvalidated")]
    fn mutating_world_during_iteration_is_invalid() {
        let mut world = World::new();
        let a = world.schema_mut().register::<u32>(Kind::Component).unwrap();
        let e1 = world.create_entity();
        world.add_component_raw(e1, a, &1u32.to_le_bytes()).unwrap();
        let e2 = world.create_entity();
        world.add_component_raw(e2, a, &2u32.to_le_bytes()).unwrap();

        let include = Definition::EMPTY.with_component(a, true);
        let query = Query::new(&world, include, Definition::EMPTY, &[a]);
        let mut iter = query.iter();
        iter.next();
        let b = world.schema_mut().register::<u64>(Kind::Component).unwrap();
        world.add_component_raw(e1, b, &9u64.to_le_bytes()).unwrap();
        iter.next();
    }
}
