//! Generation-checked handle tables.
//!
//! A handle packs `generation << 32 | slot`. Freeing a slot bumps its
//! generation, so stale or double-freed handles are rejected instead of
//! aliasing whatever was stored there next.

use std::sync::{Mutex, MutexGuard, PoisonError};

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub(crate) struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> HandleTable<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Store `value`; `None` only once every 32-bit slot is in use.
    pub(crate) fn insert(&mut self, value: T) -> Option<u64> {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                let slot = u32::try_from(self.slots.len()).ok()?;
                // Generation 0 is reserved so that handle 0 is never valid.
                self.slots.push(Slot {
                    generation: 1,
                    value: None,
                });
                slot
            }
        };
        let entry = &mut self.slots[slot as usize];
        entry.value = Some(value);
        Some(pack(entry.generation, slot))
    }

    pub(crate) fn get(&self, handle: u64) -> Option<&T> {
        let (generation, slot) = unpack(handle);
        self.slots
            .get(slot as usize)
            .filter(|entry| entry.generation == generation)
            .and_then(|entry| entry.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, handle: u64) -> Option<&mut T> {
        let (generation, slot) = unpack(handle);
        self.slots
            .get_mut(slot as usize)
            .filter(|entry| entry.generation == generation)
            .and_then(|entry| entry.value.as_mut())
    }

    pub(crate) fn remove(&mut self, handle: u64) -> Option<T> {
        let (generation, slot) = unpack(handle);
        let entry = self.slots.get_mut(slot as usize)?;
        if entry.generation != generation {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1).max(1);
        self.free.push(slot);
        Some(value)
    }
}

fn pack(generation: u32, slot: u32) -> u64 {
    (u64::from(generation) << 32) | u64::from(slot)
}

fn unpack(handle: u64) -> (u32, u32) {
    ((handle >> 32) as u32, handle as u32)
}

/// Lock a table, recovering it if a previous holder panicked.
pub(crate) fn lock<T>(table: &Mutex<HandleTable<T>>) -> MutexGuard<'_, HandleTable<T>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}
