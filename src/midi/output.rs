// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI output backends.
//!
//! [`MidirOutput`] talks to a real port through midir. [`NullOutput`] is used
//! when no destination was chosen, so loops still run silently.

use anyhow::{anyhow, Result};
use midir::MidiOutputConnection;
use tracing::{debug, info};

use super::{MidiOutput, PortSelector};

const CLIENT_NAME: &str = "midiloop";

/// midir output connected to one destination
pub struct MidirOutput {
    connection: MidiOutputConnection,
    port_name: String,
}

impl MidirOutput {
    /// Connect to the selected destination.
    ///
    /// # Returns
    /// * `Ok(MidirOutput)` on success
    /// * `Err` if the client could not be created or no port matches
    pub fn connect(selector: &PortSelector) -> Result<Self> {
        let midi_out = midir::MidiOutput::new(CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to create MIDI output client: {}", e))?;

        let ports = midi_out.ports();
        let names: Vec<(usize, String)> = ports
            .iter()
            .enumerate()
            .map(|(i, port)| {
                let name = midi_out
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown {}", i));
                (i, name)
            })
            .collect();

        let index = selector
            .select(&names)
            .ok_or_else(|| anyhow!("MIDI destination {} not found", selector))?;
        let port_name = names[index].1.clone();

        let connection = midi_out
            .connect(&ports[index], "midiloop-out")
            .map_err(|e| anyhow!("Failed to connect to MIDI destination {}: {}", port_name, e))?;

        info!(port = %port_name, "MIDI output connected");
        Ok(Self {
            connection,
            port_name,
        })
    }

    /// Name of the connected port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiOutput for MidirOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection
            .send(message)
            .map_err(|e| anyhow!("Failed to send MIDI message: {}", e))
    }
}

/// Output that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl MidiOutput for NullOutput {
    fn send(&mut self, _message: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// List all available MIDI destinations.
///
/// # Returns
/// A vector of (index, name) tuples.
pub fn list_destinations() -> Vec<(usize, String)> {
    let midi_out = match midir::MidiOutput::new(CLIENT_NAME) {
        Ok(midi_out) => midi_out,
        Err(e) => {
            debug!("MIDI output unavailable: {}", e);
            return Vec::new();
        }
    };

    midi_out
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let name = midi_out
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect()
}

/// Print all available MIDI destinations to stdout.
pub fn print_destinations() {
    let destinations = list_destinations();
    if destinations.is_empty() {
        println!("No MIDI destinations found.");
    } else {
        println!("Available MIDI destinations:");
        for (i, name) in destinations {
            println!("  {}: {}", i, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_destinations() {
        // Destinations vary by system; only check that listing works
        let destinations = list_destinations();
        println!("Found {} destinations", destinations.len());
    }

    #[test]
    fn test_null_output_accepts_everything() {
        let mut output = NullOutput;
        assert!(output.send(&[0x90, 60, 100]).is_ok());
        assert!(output.send(&[]).is_ok());
    }
}
