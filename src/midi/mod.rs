// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI I/O abstraction layer.
//!
//! This module provides a trait-based abstraction for MIDI output, the
//! midir-backed port implementations, and the status-byte table that decides
//! which incoming messages are recordable.

pub mod input;
pub mod output;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;

pub use input::{list_sources, print_sources, MidiInput, MidiInputEvent};
pub use output::{list_destinations, print_destinations, MidirOutput, NullOutput};

/// Trait for MIDI output implementations.
///
/// The loop engine owns exactly one output and calls [`MidiOutput::send`]
/// once per stored event whenever a playing slot reaches the event's frame.
pub trait MidiOutput: Send {
    /// Send a MIDI message immediately.
    ///
    /// # Arguments
    /// * `message` - Raw MIDI bytes (e.g., `[0x90, 60, 127]` for Note On)
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    // System Real-Time Messages
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;

    // System Common Messages
    pub const SYSEX_START: u8 = 0xF0;
    pub const SYSEX_END: u8 = 0xF7;
}

/// Recordable message categories, keyed by the upper nibble of the status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NoteOff,
    NoteOn,
    PolyAftertouch,
    ControlChange,
    ProgramChange,
    ChannelAftertouch,
    PitchBend,
}

impl MessageKind {
    /// Look up the category of a status byte.
    ///
    /// System messages (`0xF0..=0xFF`) and data bytes are not recordable.
    pub fn from_status(status: u8) -> Option<Self> {
        match status & 0xF0 {
            messages::NOTE_OFF => Some(MessageKind::NoteOff),
            messages::NOTE_ON => Some(MessageKind::NoteOn),
            messages::POLY_AFTERTOUCH => Some(MessageKind::PolyAftertouch),
            messages::CONTROL_CHANGE => Some(MessageKind::ControlChange),
            messages::PROGRAM_CHANGE => Some(MessageKind::ProgramChange),
            messages::CHANNEL_AFTERTOUCH => Some(MessageKind::ChannelAftertouch),
            messages::PITCH_BEND => Some(MessageKind::PitchBend),
            _ => None,
        }
    }

    /// Full message length including the status byte
    pub fn message_len(self) -> usize {
        match self {
            MessageKind::ProgramChange | MessageKind::ChannelAftertouch => 2,
            _ => 3,
        }
    }

    /// Short label for display
    pub fn label(self) -> &'static str {
        match self {
            MessageKind::NoteOff => "Note Off",
            MessageKind::NoteOn => "Note On",
            MessageKind::PolyAftertouch => "Poly AT",
            MessageKind::ControlChange => "CC",
            MessageKind::ProgramChange => "Program",
            MessageKind::ChannelAftertouch => "Chan AT",
            MessageKind::PitchBend => "Bend",
        }
    }
}

/// Classify a raw message. Returns `None` for anything the looper ignores:
/// empty or truncated messages and system messages.
pub fn classify(bytes: &[u8]) -> Option<MessageKind> {
    let status = *bytes.first()?;
    let kind = MessageKind::from_status(status)?;
    (bytes.len() >= kind.message_len()).then_some(kind)
}

/// Channel (0-15) of a channel voice message
pub fn channel_of(bytes: &[u8]) -> Option<u8> {
    classify(bytes).map(|_| bytes[0] & 0x0F)
}

/// How a MIDI port is chosen on the command line or in the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelector {
    /// Index in the port list
    Index(usize),
    /// Case-insensitive substring of the port name
    Name(String),
}

impl PortSelector {
    /// Pick a port from `(index, name)` pairs
    pub fn select(&self, ports: &[(usize, String)]) -> Option<usize> {
        match self {
            PortSelector::Index(index) => ports.iter().find(|(i, _)| i == index).map(|(i, _)| *i),
            PortSelector::Name(name) => {
                let needle = name.to_lowercase();
                ports
                    .iter()
                    .find(|(_, n)| n.to_lowercase().contains(&needle))
                    .map(|(i, _)| *i)
            }
        }
    }
}

impl FromStr for PortSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<usize>() {
            Ok(index) => PortSelector::Index(index),
            Err(_) => PortSelector::Name(s.trim().to_string()),
        })
    }
}

impl fmt::Display for PortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSelector::Index(index) => write!(f, "#{}", index),
            PortSelector::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}
