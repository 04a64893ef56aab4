// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Loop engine.
//!
//! This module provides:
//! - Nine fixed loop slots with sparse frame-indexed event storage
//! - The arm / record / overdub state machine
//! - Per-slot playback on the frame clock
//! - Length transforms (duplicate, multiply, trim, clean)

pub mod command;
pub mod engine;
pub mod error;
pub mod slot;
pub mod status;
pub mod store;
pub mod transform;

use std::fmt;

pub use command::Command;
pub use engine::{EngineState, LoopEngine, SlotStatus};
pub use error::EngineError;
pub use slot::{Frame, FrameEvents, LoopSlot, MidiEvent, SlotSnapshot};
pub use status::{StatusSink, TracingStatus};
pub use store::{SlotStore, SLOT_COUNT};

/// Identity of one of the nine loop slots (0-8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u8);

impl SlotId {
    /// Validate a raw slot number
    pub fn new(id: u8) -> Result<Self, EngineError> {
        if (id as usize) < SLOT_COUNT {
            Ok(Self(id))
        } else {
            Err(EngineError::InvalidSlotReference(id))
        }
    }

    /// All slot ids in order
    pub fn all() -> impl Iterator<Item = SlotId> {
        (0..SLOT_COUNT as u8).map(SlotId)
    }

    /// Raw slot number
    pub fn get(self) -> u8 {
        self.0
    }

    /// Index into slot storage
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_id_range() {
        assert!(SlotId::new(0).is_ok());
        assert!(SlotId::new(8).is_ok());
        assert_eq!(SlotId::new(9), Err(EngineError::InvalidSlotReference(9)));
        assert_eq!(SlotId::new(255), Err(EngineError::InvalidSlotReference(255)));
    }

    #[test]
    fn test_slot_id_all() {
        let ids: Vec<u8> = SlotId::all().map(SlotId::get).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
