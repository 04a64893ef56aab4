// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for MIDILOOP.
//!
//! This module provides the YAML configuration file: clock period, MIDI
//! ports, session file, log file, UI refresh rate and keyboard overrides.
//! Every field has a default, so an empty file is a valid configuration.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::midi::PortSelector;
use crate::timing::DEFAULT_FRAME_RATE_MS;

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LooperConfig {
    /// Engine timing
    #[serde(default)]
    pub engine: EngineConfig,
    /// MIDI port selection
    #[serde(default)]
    pub midi: MidiDeviceConfig,
    /// Session file loaded at startup and written on save
    #[serde(default)]
    pub session: Option<PathBuf>,
    /// Log file (nothing is logged in the TUI without one)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Terminal UI settings
    #[serde(default)]
    pub ui: UiConfig,
    /// Keyboard overrides: key name -> action name
    #[serde(default)]
    pub keyboard: HashMap<String, String>,
}

impl LooperConfig {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse a configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a map
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(1..=1000).contains(&self.engine.frame_rate_ms) {
            bail!(
                "engine.frame_rate_ms must be between 1 and 1000, got {}",
                self.engine.frame_rate_ms
            );
        }
        if !(1..=120).contains(&self.ui.fps) {
            bail!("ui.fps must be between 1 and 120, got {}", self.ui.fps);
        }
        Ok(())
    }
}

/// Engine timing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Frame clock period in milliseconds
    #[serde(default = "default_frame_rate_ms")]
    pub frame_rate_ms: u64,
}

fn default_frame_rate_ms() -> u64 {
    DEFAULT_FRAME_RATE_MS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_rate_ms: default_frame_rate_ms(),
        }
    }
}

impl EngineConfig {
    /// Frame clock period
    pub fn frame_rate(&self) -> Duration {
        Duration::from_millis(self.frame_rate_ms)
    }
}

/// MIDI device configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MidiDeviceConfig {
    /// Input port index or name substring
    #[serde(default)]
    pub input: Option<String>,
    /// Output port index or name substring
    #[serde(default)]
    pub output: Option<String>,
}

impl MidiDeviceConfig {
    /// Parsed input port selector
    pub fn input_selector(&self) -> Option<PortSelector> {
        self.input.as_deref().and_then(|s| s.parse().ok())
    }

    /// Parsed output port selector
    pub fn output_selector(&self) -> Option<PortSelector> {
        self.output.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Terminal UI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    /// Redraw rate
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_fps() -> u32 {
    30
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
engine:
  frame_rate_ms: 20

midi:
  input: "KeyStep"
  output: 1

session: "loops.yaml"
log_file: "midiloop.log"

ui:
  fps: 60

keyboard:
  f: multiply:4
"#;

        let config = LooperConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.engine.frame_rate_ms, 20);
        assert_eq!(config.engine.frame_rate(), Duration::from_millis(20));
        assert_eq!(
            config.midi.input_selector(),
            Some(PortSelector::Name("KeyStep".to_string()))
        );
        assert_eq!(config.midi.output_selector(), Some(PortSelector::Index(1)));
        assert_eq!(config.session, Some(PathBuf::from("loops.yaml")));
        assert_eq!(config.log_file, Some(PathBuf::from("midiloop.log")));
        assert_eq!(config.ui.fps, 60);
        assert_eq!(config.keyboard.get("f"), Some(&"multiply:4".to_string()));
    }

    #[test]
    fn test_default_values() {
        let config = LooperConfig::from_yaml("midi:\n  input: \"0\"\n").unwrap();
        assert_eq!(config.engine.frame_rate_ms, 25);
        assert_eq!(config.ui.fps, 30);
        assert_eq!(config.midi.output, None);
        assert!(config.session.is_none());
        assert!(config.keyboard.is_empty());
    }

    #[test]
    fn test_empty_document() {
        let config = LooperConfig::from_yaml("").unwrap();
        assert_eq!(config, LooperConfig::default());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(LooperConfig::from_yaml("engine:\n  frame_rate_ms: 0\n").is_err());
        assert!(LooperConfig::from_yaml("engine:\n  frame_rate_ms: 5000\n").is_err());
        assert!(LooperConfig::from_yaml("ui:\n  fps: 0\n").is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midiloop.yaml");

        let mut config = LooperConfig::default();
        config.engine.frame_rate_ms = 40;
        config.midi.output = Some("IAC".to_string());
        config.save(&path).unwrap();

        let loaded = LooperConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(LooperConfig::load("/nonexistent/midiloop.yaml").is_err());
    }
}
