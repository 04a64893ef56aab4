// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Engine operation errors.
//!
//! None of these are fatal. Each is caught at the command boundary, logged,
//! and reported through the status sink while the slot state stays as it was.

use thiserror::Error;

use super::slot::Frame;
use super::SlotId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no loop slot {0} (slots are 0-8)")]
    InvalidSlotReference(u8),

    #[error("loop {0} has no length")]
    MissingLoopLength(SlotId),

    #[error("loop {slot}: factor {factor} is not usable with length {loop_length}")]
    InvalidFactor {
        slot: SlotId,
        factor: u32,
        loop_length: Frame,
    },

    #[error("loop {0} is recording")]
    SlotRecording(SlotId),

    #[error("loop {0} cannot be duplicated onto itself")]
    SameSlot(SlotId),
}
