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

//! Typed submit/listen/poll event bus.
//!
//! Events sit on one global FIFO queue (not one queue per type), so delivery
//! order across submissions is never reordered, matching the ordering
//! guarantee in `spec.md` §5. `poll` drains the queue to a fixed point (or to
//! a configurable per-call cap): a listener invoked during dispatch may
//! submit new events, which join the back of the same queue and are seen
//! before `poll` returns.

use std::any::{Any, TypeId};

use rustc_hash::FxHashMap;

use crate::world::World;

/// Blanket-implemented marker for anything that can ride the event bus.
/// Unlike function-pointer bindings (an external collaborator per
/// `spec.md` §1), in-process listeners are plain `FnMut` closures, so
/// "user context" is just whatever state the closure captures.
pub trait Event: Send + 'static {}
impl<T: Send + 'static> Event for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

struct QueuedEvent {
    type_id: TypeId,
    payload: Box<dyn Any + Send>,
}

struct ListenerEntry {
    id: u64,
    callback: Box<dyn FnMut(&mut World, &dyn Any)>,
}

#[derive(Default)]
pub struct EventBus {
    queue: std::collections::VecDeque<QueuedEvent>,
    listeners: FxHashMap<TypeId, Vec<ListenerEntry>>,
    handle_type: FxHashMap<u64, TypeId>,
    cancelled: std::collections::HashSet<u64>,
    next_handle: u64,
    default_cap: Option<usize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit<T: Event>(&mut self, value: T) {
        self.queue.push_back(QueuedEvent { type_id: TypeId::of::<T>(), payload: Box::new(value) });
    }

    /// Registers a listener for `T`. Invocation order among listeners of the
    /// same type is subscription order.
    pub fn listen<T: Event>(&mut self, mut callback: impl FnMut(&mut World, &T) + 'static) -> ListenerHandle {
        let id = self.next_handle;
        self.next_handle += 1;
        let type_id = TypeId::of::<T>();
        let wrapped = move |world: &mut World, payload: &dyn Any| {
            if let Some(value) = payload.downcast_ref::<T>() {
                callback(world, value);
            }
        };
        self.listeners.entry(type_id).or_default().push(ListenerEntry { id, callback: Box::new(wrapped) });
        self.handle_type.insert(id, type_id);
        ListenerHandle(id)
    }

    /// Removes a listener. Returns `false` if the handle is unknown. A
    /// listener cancelled mid-dispatch still finishes any call already in
    /// flight, but is skipped for the remainder of the current dispatch list.
    pub fn unlisten(&mut self, handle: ListenerHandle) -> bool {
        let Some(type_id) = self.handle_type.remove(&handle.0) else { return false };
        if let Some(vec) = self.listeners.get_mut(&type_id) {
            if let Some(pos) = vec.iter().position(|e| e.id == handle.0) {
                vec.remove(pos);
                return true;
            }
        }
        self.cancelled.insert(handle.0);
        true
    }

    pub fn set_default_cap(&mut self, cap: Option<usize>) {
        self.default_cap = cap;
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn listener_count(&self, type_id: TypeId) -> usize {
        self.listeners.get(&type_id).map(Vec::len).unwrap_or(0)
    }
}

/// Drains `world`'s event queue, dispatching each event to its type's
/// listener snapshot before moving to the next. Returns the number of
/// events dispatched.
///
/// Implemented as a free function (not `EventBus::poll`) because dispatch
/// needs `&mut World` for reentrant world calls while also mutating
/// `world.event_bus`'s internal maps; taking the per-type listener vector
/// out of the map before invoking callbacks avoids holding two overlapping
/// `&mut` borrows of the same field.
pub(crate) fn poll(world: &mut World, cap: Option<usize>) -> usize {
    let limit = cap.or(world.event_bus().default_cap);
    let mut processed = 0usize;

    loop {
        if let Some(max) = limit {
            if processed >= max {
                break;
            }
        }
        let Some(event) = world.event_bus_mut().queue.pop_front() else { break };

        let mut entries = world.event_bus_mut().listeners.remove(&event.type_id).unwrap_or_default();
        let mut dropped = std::collections::HashSet::new();
        for entry in entries.iter_mut() {
            if world.event_bus_mut().cancelled.remove(&entry.id) {
                dropped.insert(entry.id);
                continue;
            }
            (entry.callback)(world, event.payload.as_ref());
            // The callback may have unlistened itself or a not-yet-reached
            // peer of the same type; `listeners` has no entry for `type_id`
            // right now, so that `unlisten` call only recorded `cancelled`.
            if world.event_bus_mut().cancelled.remove(&entry.id) {
                dropped.insert(entry.id);
            }
        }
        if !dropped.is_empty() {
            entries.retain(|entry| !dropped.contains(&entry.id));
        }

        let bus = world.event_bus_mut();
        let existing = bus.listeners.entry(event.type_id).or_default();
        entries.append(existing);
        *existing = entries;

        processed += 1;
    }
    processed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Ping(u32);

    #[test]
    fn listener_is_invoked_in_submission_order() {
        let mut world = World::new();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        world.listen::<Ping>(move |_world, ping| seen_clone.borrow_mut().push(ping.0));

        world.submit_event(Ping(1));
        world.submit_event(Ping(2));
        world.poll_events();

        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn reentrant_submit_during_dispatch_is_drained_same_poll() {
        let mut world = World::new();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        let seen_a = seen.clone();
        world.listen::<Ping>(move |world, ping| {
            seen_a.borrow_mut().push(ping.0);
            if ping.0 == 1 {
                world.submit_event(Ping(2));
            }
        });

        world.submit_event(Ping(1));
        world.poll_events();

        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn unlisten_stops_future_dispatch() {
        let mut world = World::new();
        let count = std::rc::Rc::new(std::cell::RefCell::new(0));
        let count_clone = count.clone();
        let handle = world.listen::<Ping>(move |_world, _ping| {
            *count_clone.borrow_mut() += 1;
        });

        world.submit_event(Ping(1));
        world.poll_events();
        assert!(world.unlisten(handle));

        world.submit_event(Ping(1));
        world.poll_events();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn cancelling_self_during_own_dispatch_does_not_leave_a_zombie_listener() {
        let mut world = World::new();
        let count = std::rc::Rc::new(std::cell::RefCell::new(0));
        let count_clone = count.clone();
        let handle_cell: std::rc::Rc<std::cell::RefCell<Option<ListenerHandle>>> =
            std::rc::Rc::new(std::cell::RefCell::new(None));
        let handle_cell_clone = handle_cell.clone();

        let handle = world.listen::<Ping>(move |world, _ping| {
            *count_clone.borrow_mut() += 1;
            let handle = handle_cell_clone.borrow().expect("handle set before first dispatch");
            world.unlisten(handle);
        });
        *handle_cell.borrow_mut() = Some(handle);

        world.submit_event(Ping(1));
        world.submit_event(Ping(2));
        world.poll_events();

        assert_eq!(*count.borrow(), 1, "listener must not fire again after cancelling itself mid-dispatch");

        world.submit_event(Ping(3));
        world.poll_events();
        assert_eq!(*count.borrow(), 1, "listener must stay removed on subsequent polls, not reappear as a zombie");
    }

    #[test]
    fn poll_cap_leaves_remainder_for_next_call() {
        let mut world = World::new();
        let count = std::rc::Rc::new(std::cell::RefCell::new(0));
        let count_clone = count.clone();
        world.listen::<Ping>(move |_world, _ping| *count_clone.borrow_mut() += 1);

        world.submit_event(Ping(1));
        world.submit_event(Ping(2));
        world.submit_event(Ping(3));

        let dispatched = world.poll_events_capped(Some(1));
        assert_eq!(dispatched, 1);
        assert_eq!(*count.borrow(), 1);

        world.poll_events();
        assert_eq!(*count.borrow(), 3);
    }
}
