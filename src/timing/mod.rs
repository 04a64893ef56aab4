// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing and clock module.
//!
//! This module provides the fixed-period frame clock that drives both
//! loop recording and loop playback.

pub mod clock;

pub use clock::{ClockId, ClockKind, ClockTick, FrameClock, DEFAULT_FRAME_RATE_MS};
