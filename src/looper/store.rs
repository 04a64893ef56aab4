// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Fixed set of nine loop slots.

use super::error::EngineError;
use super::slot::LoopSlot;
use super::SlotId;

/// Number of loop slots
pub const SLOT_COUNT: usize = 9;

/// Owner of all loop slots
#[derive(Debug, Clone)]
pub struct SlotStore {
    slots: Vec<LoopSlot>,
}

impl SlotStore {
    /// Create nine empty slots
    pub fn new() -> Self {
        Self {
            slots: SlotId::all().map(LoopSlot::new).collect(),
        }
    }

    /// Slot by validated id
    pub fn get(&self, id: SlotId) -> &LoopSlot {
        &self.slots[id.index()]
    }

    /// Mutable slot by validated id
    pub fn get_mut(&mut self, id: SlotId) -> &mut LoopSlot {
        &mut self.slots[id.index()]
    }

    /// Slot by raw number
    pub fn lookup(&self, id: u8) -> Result<&LoopSlot, EngineError> {
        SlotId::new(id).map(|id| self.get(id))
    }

    /// Iterate all slots in id order
    pub fn iter(&self) -> impl Iterator<Item = &LoopSlot> {
        self.slots.iter()
    }

    /// Replace a slot with a fresh empty one. Stopping its clocks is the
    /// caller's job.
    pub fn reset(&mut self, id: SlotId) {
        self.slots[id.index()] = LoopSlot::new(id);
    }
}

impl Default for SlotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_has_nine_slots() {
        let store = SlotStore::new();
        assert_eq!(store.iter().count(), SLOT_COUNT);
        for (i, slot) in store.iter().enumerate() {
            assert_eq!(slot.id().index(), i);
            assert!(slot.is_empty());
        }
    }

    #[test]
    fn test_lookup_out_of_range() {
        let store = SlotStore::new();
        assert!(store.lookup(8).is_ok());
        assert_eq!(
            store.lookup(9).unwrap_err(),
            EngineError::InvalidSlotReference(9)
        );
    }

    #[test]
    fn test_reset_slot() {
        let mut store = SlotStore::new();
        let id = SlotId::new(4).unwrap();
        {
            let slot = store.get_mut(id);
            slot.loop_length = Some(12);
            slot.locked = true;
            slot.frame = 3;
            slot.record(&[0x90, 60, 100]);
        }

        store.reset(id);
        let slot = store.get(id);
        assert_eq!(slot.id(), id);
        assert!(slot.is_empty());
        assert!(!slot.is_locked());
        assert_eq!(slot.frame(), 0);
    }
}
