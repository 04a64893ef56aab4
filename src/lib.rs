// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDILOOP - a nine-slot MIDI loop recorder for the terminal.
//!
//! The engine in [`looper`] owns all loop state and is driven by three kinds
//! of input: MIDI messages, frame clock ticks, and discrete commands. The
//! remaining modules are the collaborators around it: port handling in
//! [`midi`], the clock in [`timing`], YAML files in [`config`] and
//! [`session`], key mapping in [`control`] and the ratatui front end in
//! [`ui`].

pub mod config;
pub mod control;
pub mod looper;
pub mod midi;
pub mod session;
pub mod timing;
pub mod ui;
