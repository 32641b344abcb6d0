//! Capacity-bounded slot tables with tombstone reuse.
//!
//! An [`Arena`] hands out small integer [`Handle`]s for the values it stores.
//! Index 0 is never allocated, so a packed tile can use `0` to mean "no
//! entity". Removing a value leaves a tombstone whose index goes onto a LIFO
//! free list; the next [`Arena::append`] reuses it before the backing store
//! grows. Appending when the store is at capacity and no tombstone is free
//! fails without touching any state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

use crate::GridError;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A stable reference to one arena slot. Never zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(NonZeroU32);

impl Handle {
    /// Build a handle from its raw index. `0` has no handle.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// The raw slot index (always `>= 1`).
    #[inline]
    pub fn raw(self) -> u32 {
        self.0.get()
    }

    #[inline]
    fn slot(self) -> usize {
        self.0.get() as usize
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.raw())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw())
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// A fixed-capacity slot table of one entity kind.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    /// Slot storage. `slots[0]` is a permanent placeholder.
    slots: Vec<Option<T>>,
    /// Tombstoned indices, reused last-in first-out.
    free: Vec<u32>,
    /// Maximum number of live values.
    capacity: u32,
}

impl<T> Arena<T> {
    /// Create an empty arena that can hold up to `capacity` live values.
    pub fn with_capacity(capacity: u32) -> Self {
        let mut slots = Vec::new();
        slots.push(None);
        Self {
            slots,
            free: Vec::new(),
            capacity,
        }
    }

    /// Store `value` and return its handle.
    ///
    /// Reuses the most recently freed slot if there is one; otherwise grows
    /// the backing store. Fails with [`GridError::CapacityExhausted`] when
    /// neither is possible.
    pub fn append(&mut self, value: T) -> Result<Handle, GridError> {
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(value);
            return Handle::from_raw(index).ok_or(GridError::CapacityExhausted {
                capacity: self.capacity,
            });
        }
        let next = self.slots.len() as u32;
        if next > self.capacity {
            tracing::debug!(capacity = self.capacity, "arena full, no tombstone to reuse");
            return Err(GridError::CapacityExhausted {
                capacity: self.capacity,
            });
        }
        self.slots.push(Some(value));
        Handle::from_raw(next).ok_or(GridError::CapacityExhausted {
            capacity: self.capacity,
        })
    }

    /// The value behind `handle`, or `None` for a tombstoned or out-of-range
    /// handle. Readers racing a removal see `None`, never a panic.
    #[inline]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots.get(handle.slot()).and_then(Option::as_ref)
    }

    /// Mutable access to a live value.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots.get_mut(handle.slot()).and_then(Option::as_mut)
    }

    /// Overwrite a live value in place.
    ///
    /// Returns `false` (and stores nothing) if the slot is not live: a
    /// tombstone can only be revived through [`append`](Self::append).
    pub fn set(&mut self, handle: Handle, value: T) -> bool {
        match self.get_mut(handle) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Tombstone the slot and return its value.
    ///
    /// Removing an already-free or out-of-range handle is a no-op returning
    /// `None`, so the free list never holds a duplicate.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let value = self.slots.get_mut(handle.slot())?.take()?;
        self.free.push(handle.raw());
        Some(value)
    }

    /// Whether `handle` currently resolves to a value.
    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.slots.len() - 1 - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of live values.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Iterate live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| Some((Handle::from_raw(i as u32)?, slot.as_ref()?)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_start_at_one() {
        let mut arena = Arena::with_capacity(4);
        let h = arena.append("a").unwrap();
        assert_eq!(h.raw(), 1);
        assert!(Handle::from_raw(0).is_none());
    }

    #[test]
    fn append_past_capacity_fails_without_mutation() {
        let mut arena = Arena::with_capacity(3);
        for _ in 0..3 {
            arena.append("ok").unwrap();
        }
        let err = arena.append("boom").unwrap_err();
        assert!(matches!(err, GridError::CapacityExhausted { capacity: 3 }));
        assert_eq!(arena.len(), 3);
        assert!(arena.iter().all(|(_, v)| *v == "ok"));
    }

    #[test]
    fn removed_slot_is_reused_next() {
        let mut arena = Arena::with_capacity(3);
        let handles: Vec<Handle> = (0..3).map(|_| arena.append("ok").unwrap()).collect();
        assert_eq!(arena.remove(handles[1]), Some("ok"));
        let h = arena.append("boom").unwrap();
        assert_eq!(h, handles[1]);
        let values: Vec<&str> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec!["ok", "boom", "ok"]);
    }

    #[test]
    fn free_list_is_lifo() {
        let mut arena = Arena::with_capacity(3);
        let a = arena.append(1).unwrap();
        let b = arena.append(2).unwrap();
        let c = arena.append(3).unwrap();
        arena.remove(a);
        arena.remove(b);
        arena.remove(c);
        assert!(arena.is_empty());
        assert_eq!(arena.append(10).unwrap(), c);
        assert_eq!(arena.append(20).unwrap(), b);
        assert_eq!(arena.append(30).unwrap(), a);
    }

    #[test]
    fn reuse_preferred_over_growth() {
        let mut arena = Arena::with_capacity(10);
        let a = arena.append('a').unwrap();
        let _b = arena.append('b').unwrap();
        arena.remove(a);
        assert_eq!(arena.append('c').unwrap(), a);
    }

    #[test]
    fn stale_and_out_of_range_reads_are_absent() {
        let mut arena = Arena::with_capacity(2);
        let h = arena.append(5u8).unwrap();
        arena.remove(h);
        assert_eq!(arena.get(h), None);
        assert_eq!(arena.get(Handle::from_raw(99).unwrap()), None);
        assert!(!arena.set(h, 6));
        assert_eq!(arena.remove(h), None, "double remove is a no-op");
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn set_overwrites_live_value() {
        let mut arena = Arena::with_capacity(2);
        let h = arena.append(String::from("old")).unwrap();
        assert!(arena.set(h, String::from("new")));
        assert_eq!(arena.get(h).map(String::as_str), Some("new"));
    }
}
