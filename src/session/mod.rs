// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Session files.
//!
//! A session is the recorded content of all non-empty slots, stored as YAML.
//! Only lengths and events are saved; play state, arming and frame
//! positions are not.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::looper::{Frame, FrameEvents, LoopEngine, SlotId, SlotSnapshot};

/// Root of a session file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub session: SessionInfo,
    #[serde(default)]
    pub loops: Vec<SavedLoop>,
}

/// Session metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default = "default_name")]
    pub name: String,
    /// Frame clock period the loops were recorded at
    pub frame_rate_ms: u64,
}

fn default_name() -> String {
    "Untitled".to_string()
}

/// One saved slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLoop {
    pub slot: u8,
    #[serde(default)]
    pub loop_length: Option<Frame>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub channels: Vec<u8>,
    #[serde(default)]
    pub data: Vec<FrameEvents>,
}

impl SavedLoop {
    fn from_snapshot(slot: SlotId, snapshot: SlotSnapshot) -> Self {
        Self {
            slot: slot.get(),
            loop_length: snapshot.loop_length,
            locked: snapshot.locked,
            channels: snapshot.channels,
            data: snapshot.data,
        }
    }

    fn into_snapshot(self) -> SlotSnapshot {
        SlotSnapshot {
            loop_length: self.loop_length,
            locked: self.locked,
            channels: self.channels,
            data: self.data,
        }
    }
}

impl SessionFile {
    /// Capture the non-empty slots of an engine
    pub fn capture(name: impl Into<String>, engine: &LoopEngine) -> Self {
        let loops = SlotId::all()
            .map(|id| (id, engine.export_slot(id)))
            .filter(|(_, snapshot)| !snapshot.is_empty())
            .map(|(id, snapshot)| SavedLoop::from_snapshot(id, snapshot))
            .collect();

        Self {
            session: SessionInfo {
                name: name.into(),
                frame_rate_ms: engine.state().frame_rate.as_millis() as u64,
            },
            loops,
        }
    }

    /// Replace every slot of the engine with the session contents. Slots
    /// missing from the file are reset. Nothing is changed if the file names
    /// a slot that does not exist.
    pub fn restore(&self, engine: &mut LoopEngine) -> Result<()> {
        let mut snapshots: Vec<SlotSnapshot> = SlotId::all().map(|_| SlotSnapshot::default()).collect();
        for saved in &self.loops {
            let id = SlotId::new(saved.slot).context("Invalid session file")?;
            snapshots[id.index()] = saved.clone().into_snapshot();
        }

        let current = engine.state().frame_rate.as_millis() as u64;
        if current != self.session.frame_rate_ms {
            warn!(
                saved = self.session.frame_rate_ms,
                current, "session frame rate differs, loops will play at the current rate"
            );
        }

        for (id, snapshot) in SlotId::all().zip(snapshots) {
            engine.import_slot(id, snapshot);
        }
        info!(name = %self.session.name, loops = self.loops.len(), "session restored");
        Ok(())
    }

    /// Load a session from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read session file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse a session from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML session")
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize session to YAML")
    }

    /// Save the session to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write session file: {:?}", path.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looper::TracingStatus;
    use crate::midi::NullOutput;
    use crate::timing::FrameClock;
    use std::time::Duration;

    fn engine() -> LoopEngine {
        LoopEngine::new(
            FrameClock::manual(Duration::from_millis(25)),
            Box::new(NullOutput),
            Box::new(TracingStatus),
        )
    }

    fn id(n: u8) -> SlotId {
        SlotId::new(n).unwrap()
    }

    fn recorded_engine() -> LoopEngine {
        let mut engine = engine();
        engine.arm(id(2));
        engine.handle_midi(&[0x91, 64, 100]);
        for _ in 0..3 {
            engine.tick_all();
        }
        engine.handle_midi(&[0x81, 64, 0]);
        engine.tick_all();
        engine.arm(id(2));
        engine
    }

    #[test]
    fn test_capture_skips_empty_slots() {
        let engine = recorded_engine();
        let session = SessionFile::capture("jam", &engine);

        assert_eq!(session.session.name, "jam");
        assert_eq!(session.session.frame_rate_ms, 25);
        assert_eq!(session.loops.len(), 1);

        let saved = &session.loops[0];
        assert_eq!(saved.slot, 2);
        assert_eq!(saved.loop_length, Some(4));
        assert!(saved.locked);
        assert_eq!(saved.channels, vec![1]);
        assert_eq!(saved.data.len(), 2);
    }

    #[test]
    fn test_restore_replaces_all_slots() {
        let source = recorded_engine();
        let session = SessionFile::capture("jam", &source);

        let mut target = engine();
        target.arm(id(7));
        target.handle_midi(&[0x90, 60, 100]);
        target.tick_all();
        target.arm(id(7));
        assert!(!target.slot(id(7)).is_empty());

        session.restore(&mut target).unwrap();
        assert!(target.slot(id(7)).is_empty());
        assert_eq!(target.slot(id(2)).loop_length(), Some(4));
        assert_eq!(target.slot(id(2)).data(), source.slot(id(2)).data());
        assert!(!target.slot(id(2)).is_playing());
        assert_eq!(target.clock().running_count(), 0);
    }

    #[test]
    fn test_restore_rejects_unknown_slot() {
        let yaml = r#"
session:
  name: broken
  frame_rate_ms: 25
loops:
  - slot: 12
    loop_length: 4
"#;
        let session = SessionFile::from_yaml(yaml).unwrap();
        let mut engine = recorded_engine();
        assert!(session.restore(&mut engine).is_err());
        // Untouched on failure
        assert_eq!(engine.slot(id(2)).loop_length(), Some(4));
    }

    #[test]
    fn test_parse_minimal_session() {
        let yaml = r#"
session:
  frame_rate_ms: 20
loops:
  - slot: 0
    loop_length: 8
    locked: true
    data:
      - frame: 0
        events: [[144, 60, 100]]
"#;
        let session = SessionFile::from_yaml(yaml).unwrap();
        assert_eq!(session.session.name, "Untitled");
        assert_eq!(session.loops[0].data[0].events, vec![vec![144, 60, 100]]);
        assert!(session.loops[0].channels.is_empty());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loops.yaml");

        let session = SessionFile::capture("jam", &recorded_engine());
        session.save(&path).unwrap();
        let loaded = SessionFile::load(&path).unwrap();
        assert_eq!(loaded, session);
    }
}
