// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Loop length transforms.
//!
//! These change a slot's length and/or data without touching its clock. A
//! running playback clock sees the new length on its next tick. Frame
//! positions are never rescaled; the tick wraps them into range.

use super::error::EngineError;
use super::slot::{Frame, LoopSlot};

/// Give `dest` the length of a source loop with no content.
///
/// The destination is locked, rewound to frame 0 and stopped.
pub fn copy_shape(loop_length: Frame, dest: &mut LoopSlot) {
    dest.loop_length = Some(loop_length);
    dest.locked = true;
    dest.frame = 0;
    dest.playing = false;
    dest.data.clear();
    dest.channels.clear();
}

/// Multiply the loop length. Existing events keep their frame indices, so
/// the recorded pattern fills the first `1/factor` of the new cycle.
pub fn multiply(slot: &mut LoopSlot, factor: u32) -> Result<Frame, EngineError> {
    let length = slot
        .loop_length
        .ok_or(EngineError::MissingLoopLength(slot.id()))?;

    let invalid = EngineError::InvalidFactor {
        slot: slot.id(),
        factor,
        loop_length: length,
    };
    if factor == 0 {
        return Err(invalid);
    }
    let new_length = length.checked_mul(factor).ok_or(invalid)?;

    slot.loop_length = Some(new_length);
    Ok(new_length)
}

/// Divide the loop length, rounding down. Events past the new end stay in
/// the map but are never reached.
pub fn trim(slot: &mut LoopSlot, factor: u32) -> Result<Frame, EngineError> {
    let length = slot
        .loop_length
        .ok_or(EngineError::MissingLoopLength(slot.id()))?;

    let new_length = length.checked_div(factor).unwrap_or(0);
    if new_length == 0 {
        return Err(EngineError::InvalidFactor {
            slot: slot.id(),
            factor,
            loop_length: length,
        });
    }

    slot.loop_length = Some(new_length);
    Ok(new_length)
}

/// Drop all events. Length and lock are kept.
pub fn clean(slot: &mut LoopSlot) {
    slot.data.clear();
    slot.channels.clear();
}
