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

//! Error types

use std::fmt;

/// ECS error type
#[derive(Debug, Clone)]
pub enum EcsError {
    /// A handle's position is out of range, or its version doesn't match the
    /// slot's current generation (stale handle, already destroyed).
    InvalidHandle,

    /// Requested a component the entity does not carry.
    MissingComponent,

    /// Tried to add a component the entity already carries.
    AlreadyHasComponent,

    /// Requested an array the entity does not carry.
    MissingArray,

    /// Tried to create an array the entity already carries.
    AlreadyHasArray,

    /// Requested a tag the entity does not carry.
    MissingTag,

    /// Tried to add a tag the entity already carries.
    AlreadyHasTag,

    /// Schema lookup missed: the type was never registered, or (during
    /// deserialization) no type on the reader's schema matches the name on
    /// the wire.
    UnknownType,

    /// A kind's 256-id space is exhausted.
    SchemaFull,

    /// A component or array element exceeds the configured size cap.
    SizeTooLarge { size: usize, max: usize },

    /// Setting this parent would create a cycle in the hierarchy.
    WouldCycle,

    /// A `Query` iterator detected that the world's chunk layout changed
    /// since the iterator was constructed.
    IteratorInvalidated,

    /// The binary world format was truncated, had an out-of-range count, or
    /// otherwise failed to parse.
    MalformedData(String),

    /// Binary I/O failure while reading or writing a world blob.
    Io(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::InvalidHandle => write!(f, "invalid or stale entity handle"),
            EcsError::MissingComponent => write!(f, "entity does not have that component"),
            EcsError::AlreadyHasComponent => write!(f, "entity already has that component"),
            EcsError::MissingArray => write!(f, "entity does not have that array"),
            EcsError::AlreadyHasArray => write!(f, "entity already has that array"),
            EcsError::MissingTag => write!(f, "entity does not have that tag"),
            EcsError::AlreadyHasTag => write!(f, "entity already has that tag"),
            EcsError::UnknownType => write!(f, "type is not registered in the schema"),
            EcsError::SchemaFull => write!(f, "schema id space exhausted for this kind (256 max)"),
            EcsError::SizeTooLarge { size, max } => {
                write!(f, "type size {size} exceeds the maximum of {max} bytes")
            }
            EcsError::WouldCycle => write!(f, "operation would create a hierarchy cycle"),
            EcsError::IteratorInvalidated => {
                write!(f, "world mutated while a query iterator was live")
            }
            EcsError::MalformedData(msg) => write!(f, "malformed world data: {msg}"),
            EcsError::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<std::io::Error> for EcsError {
    fn from(err: std::io::Error) -> Self {
        EcsError::Io(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
