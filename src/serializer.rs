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

//! Binary world format: one little-endian, unpadded blob holding every live
//! entity's components, arrays, tags, parent link, and reference list.
//!
//! Type identity on the wire is the fully qualified Rust name, not the
//! schema id (ids are per-process). `read_world` resolves each wire type by
//! name against the destination world's own schema, so the caller must
//! register every type it expects to see before reading — an unresolved name
//! fails with `UnknownType` rather than being registered on the fly.
//!
//! Positions are preserved exactly: `read_world` walks the position sequence
//! ascending, materializing and immediately discarding filler entities to
//! skip the holes the source world had, so an entity that was at position 7
//! in the writer lands at position 7 in the reader too.

use std::io::{Read, Write};

use rustc_hash::FxHashMap;

#[cfg(feature = "profiling")]
use tracing::trace;

use crate::error::{EcsError, Result};
use crate::schema::{Kind, DISABLED_TAG};
use crate::world::World;

fn kind_tag(kind: Kind) -> u8 {
    match kind {
        Kind::Component => 0,
        Kind::Array => 1,
        Kind::Tag => 2,
    }
}

fn kind_from_tag(tag: u8) -> Result<Kind> {
    match tag {
        0 => Ok(Kind::Component),
        1 => Ok(Kind::Array),
        2 => Ok(Kind::Tag),
        other => Err(EcsError::MalformedData(format!("unknown type kind tag {other}"))),
    }
}

fn write_u32<W: Write>(out: &mut W, value: u32) -> Result<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_u16<W: Write>(out: &mut W, value: u16) -> Result<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn read_u32<R: Read>(input: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u16<R: Read>(input: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    input.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u8<R: Read>(input: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

struct TypeEntry {
    kind: Kind,
    name: String,
    size: usize,
}

/// Writes `world` to `out` in the binary format described in the module docs.
pub fn write_world<W: Write>(world: &World, out: &mut W) -> Result<()> {
    #[cfg(feature = "profiling")]
    trace!(entity_count = world.len(), "serializing world");

    let positions = world.live_positions();
    let mut types: Vec<TypeEntry> = Vec::new();
    let mut index_of: FxHashMap<(Kind, u8), u32> = FxHashMap::default();

    for &position in &positions {
        let def = world.definition_at(position);
        collect_type_table(world, Kind::Component, &def.components, None, &mut types, &mut index_of)?;
        collect_type_table(world, Kind::Array, &def.arrays, None, &mut types, &mut index_of)?;
        collect_type_table(world, Kind::Tag, &def.tags, Some(DISABLED_TAG), &mut types, &mut index_of)?;
    }

    write_u32(out, types.len() as u32)?;
    for entry in &types {
        let units: Vec<u16> = entry.name.encode_utf16().collect();
        write_u32(out, units.len() as u32)?;
        for unit in &units {
            out.write_all(&unit.to_le_bytes())?;
        }
        out.write_all(&[kind_tag(entry.kind)])?;
        write_u16(out, entry.size as u16)?;
    }

    write_u32(out, positions.len() as u32)?;
    for &position in &positions {
        write_entity(world, position, &index_of, out)?;
    }
    Ok(())
}

fn collect_type_table(
    world: &World,
    kind: Kind,
    mask: &crate::bitset::BitMask,
    skip: Option<u8>,
    types: &mut Vec<TypeEntry>,
    index_of: &mut FxHashMap<(Kind, u8), u32>,
) -> Result<()> {
    for id in mask.ones() {
        if skip == Some(id) {
            continue;
        }
        let key = (kind, id);
        if index_of.contains_key(&key) {
            continue;
        }
        let name = world.schema().name(kind, id)?.to_string();
        let size = world.schema().size(kind, id)?;
        index_of.insert(key, types.len() as u32);
        types.push(TypeEntry { kind, name, size });
    }
    Ok(())
}

fn write_entity<W: Write>(
    world: &World,
    position: u32,
    index_of: &FxHashMap<(Kind, u8), u32>,
    out: &mut W,
) -> Result<()> {
    let handle = world.handle_at(position);
    let def = world.definition_at(position);

    write_u32(out, position)?;

    let component_ids: Vec<u8> = def.components.ones().collect();
    write_u32(out, component_ids.len() as u32)?;
    for id in component_ids {
        write_u32(out, index_of[&(Kind::Component, id)])?;
        out.write_all(world.get_component_bytes(handle, id)?)?;
    }

    let arrays = world.slot_arrays(position);
    write_u32(out, arrays.len() as u32)?;
    for (id, buffer) in arrays {
        write_u32(out, index_of[&(Kind::Array, id)])?;
        write_u32(out, buffer.length() as u32)?;
        out.write_all(&buffer.data)?;
    }

    let tag_ids: Vec<u8> = def.tags.ones().filter(|&id| id != DISABLED_TAG).collect();
    write_u32(out, tag_ids.len() as u32)?;
    for id in tag_ids {
        write_u32(out, index_of[&(Kind::Tag, id)])?;
    }

    write_u32(out, world.slot_parent(position))?;

    let references = world.slot_references(position);
    write_u32(out, references.len() as u32)?;
    for target in references {
        write_u32(out, target)?;
    }

    out.write_all(&[world.slot_enabled(position) as u8])?;
    Ok(())
}

struct PendingRelations {
    position: u32,
    parent: u32,
    references: Vec<u32>,
}

/// Reads a blob written by `write_world` into `world`, which must already
/// have every referenced type pre-registered under a matching name (usually
/// by calling `Schema::register::<T>` for each type the caller expects).
pub fn read_world<R: Read>(world: &mut World, input: &mut R) -> Result<()> {
    let type_count = read_u32(input)?;
    let mut types = Vec::with_capacity(type_count as usize);
    for _ in 0..type_count {
        let name_units = read_u32(input)? as usize;
        let mut units = vec![0u16; name_units];
        for unit in units.iter_mut() {
            *unit = read_u16(input)?;
        }
        let name = String::from_utf16(&units)
            .map_err(|_| EcsError::MalformedData("type name is not valid UTF-16".to_string()))?;
        let kind = kind_from_tag(read_u8(input)?)?;
        let _size = read_u16(input)?;
        let id = world.schema().id_by_name(kind, &name)?;
        types.push((kind, id));
    }

    #[cfg(feature = "profiling")]
    trace!(type_count, "resolved wire type table against destination schema");

    let entity_count = read_u32(input)?;
    let mut pending = Vec::with_capacity(entity_count as usize);

    for _ in 0..entity_count {
        let position = read_u32(input)?;
        world.materialize_at_exact_position(position);
        let handle = world.handle_at(position);

        let component_count = read_u32(input)?;
        for _ in 0..component_count {
            let (_, id) = resolve_type(&types, read_u32(input)?, Kind::Component)?;
            let size = world.schema().size(Kind::Component, id)?;
            let mut bytes = vec![0u8; size];
            input.read_exact(&mut bytes)?;
            world.add_component_raw(handle, id, &bytes)?;
        }

        let array_count = read_u32(input)?;
        for _ in 0..array_count {
            let (_, id) = resolve_type(&types, read_u32(input)?, Kind::Array)?;
            let length = read_u32(input)? as usize;
            let elem_size = world.schema().size(Kind::Array, id)?;
            let mut bytes = vec![0u8; length * elem_size];
            input.read_exact(&mut bytes)?;
            world.create_array(handle, id, length)?;
            world.get_array_mut(handle, id)?.copy_from_slice(&bytes);
        }

        let tag_count = read_u32(input)?;
        for _ in 0..tag_count {
            let (_, id) = resolve_type(&types, read_u32(input)?, Kind::Tag)?;
            world.add_tag(handle, id)?;
        }

        let parent = read_u32(input)?;
        let reference_count = read_u32(input)?;
        let mut references = Vec::with_capacity(reference_count as usize);
        for _ in 0..reference_count {
            references.push(read_u32(input)?);
        }
        let enabled = read_u8(input)? != 0;
        if !enabled {
            world.set_enabled(handle, false)?;
        }

        pending.push(PendingRelations { position, parent, references });
    }

    for rel in pending {
        let handle = world.handle_at(rel.position);
        if rel.parent != 0 {
            world.set_parent(handle, Some(world.handle_at(rel.parent)))?;
        }
        for target in rel.references {
            world.add_reference(handle, world.handle_at(target))?;
        }
    }

    Ok(())
}

fn resolve_type(types: &[(Kind, u8)], index: u32, expected: Kind) -> Result<(Kind, u8)> {
    let &(kind, id) = types
        .get(index as usize)
        .ok_or_else(|| EcsError::MalformedData(format!("type index {index} out of range")))?;
    if kind != expected {
        return Err(EcsError::MalformedData(format!(
            "type index {index} is a {kind:?}, expected {expected:?}"
        )));
    }
    Ok((kind, id))
}

/// Convenience wrapper: serializes into a fresh `Vec<u8>`.
pub fn serialize_world(world: &World) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_world(world, &mut buf)?;
    Ok(buf)
}
