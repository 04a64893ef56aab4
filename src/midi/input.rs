// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input from controllers.
//!
//! Incoming messages are forwarded as raw `(timestamp, bytes)` pairs into the
//! engine's event loop. Filtering happens in the engine via
//! [`classify`](super::classify), so the input layer stays dumb.

use anyhow::{anyhow, Result};
use midir::{Ignore, MidiInputConnection};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use super::PortSelector;

const CLIENT_NAME: &str = "midiloop";

/// A message received from an input port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiInputEvent {
    /// Driver timestamp in microseconds
    pub timestamp: u64,
    /// Raw MIDI bytes
    pub bytes: Vec<u8>,
}

/// Open connection to an input port. Dropping it closes the port.
pub struct MidiInput {
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl MidiInput {
    /// Connect to the selected input port and forward every message to `sender`
    pub fn connect(selector: &PortSelector, sender: UnboundedSender<MidiInputEvent>) -> Result<Self> {
        let mut midi_in = midir::MidiInput::new(CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to create MIDI input client: {}", e))?;
        // Drop sysex, clock and active sensing at the driver level
        midi_in.ignore(Ignore::All);

        let ports = midi_in.ports();
        let names: Vec<(usize, String)> = ports
            .iter()
            .enumerate()
            .map(|(i, port)| {
                let name = midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown {}", i));
                (i, name)
            })
            .collect();

        let index = selector
            .select(&names)
            .ok_or_else(|| anyhow!("MIDI source {} not found", selector))?;
        let port_name = names[index].1.clone();

        let connection = midi_in
            .connect(
                &ports[index],
                "midiloop-in",
                move |timestamp, bytes, _| {
                    let _ = sender.send(MidiInputEvent {
                        timestamp,
                        bytes: bytes.to_vec(),
                    });
                },
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to MIDI source {}: {}", port_name, e))?;

        info!(port = %port_name, "MIDI input connected");
        Ok(Self {
            _connection: connection,
            port_name,
        })
    }

    /// Name of the connected port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// List all available MIDI sources
pub fn list_sources() -> Vec<(usize, String)> {
    let midi_in = match midir::MidiInput::new(CLIENT_NAME) {
        Ok(midi_in) => midi_in,
        Err(e) => {
            debug!("MIDI input unavailable: {}", e);
            return Vec::new();
        }
    };

    midi_in
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect()
}

/// Print all available MIDI sources to stdout
pub fn print_sources() {
    let sources = list_sources();
    if sources.is_empty() {
        println!("No MIDI sources found.");
    } else {
        println!("Available MIDI sources (inputs):");
        for (i, name) in sources {
            println!("  {}: {}", i, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_sources() {
        // Just verify it doesn't panic
        let sources = list_sources();
        println!("Found {} sources", sources.len());
    }

    #[test]
    fn test_connect_missing_source_fails() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let selector = PortSelector::Name("no such port, surely".to_string());
        assert!(MidiInput::connect(&selector, tx).is_err());
    }
}
