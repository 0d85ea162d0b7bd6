//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use archetype_ecs::prelude::*;
//! ```

pub use crate::bitset::BitMask;
pub use crate::definition::Definition;
pub use crate::entity::EntityId;
pub use crate::error::{EcsError, Result};
pub use crate::event_bus::{Event, EventBus, ListenerHandle};
pub use crate::query::{Query, QueryRow};
pub use crate::schema::{Kind, Schema};
pub use crate::world::World;
