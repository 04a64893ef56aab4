// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Loop engine: arming, recording, overdub and playback.
//!
//! The engine is driven from a single event loop. Every entry point
//! ([`LoopEngine::handle_midi`], [`LoopEngine::on_tick`],
//! [`LoopEngine::execute`]) runs to completion before the next one, so the
//! slot state needs no locking.
//!
//! Slot life cycle:
//!
//! ```text
//! Idle --arm--> Armed --first MIDI--> Recording --arm/disarm--> Playing
//! ```
//!
//! Stopping the first pass of a slot fixes its length. Recording again on a
//! locked slot is an overdub: events are layered into the existing frames
//! and playback resumes where the pass stopped.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::midi::{classify, MidiOutput};
use crate::timing::{ClockId, ClockKind, ClockTick, FrameClock};

use super::command::Command;
use super::error::EngineError;
use super::slot::{Frame, LoopSlot, SlotSnapshot};
use super::status::StatusSink;
use super::store::SlotStore;
use super::transform;
use super::SlotId;

/// Global arming state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    /// Slot that receives incoming MIDI
    pub armed: Option<SlotId>,
    /// The armed slot is capturing (not just waiting)
    pub recording: bool,
    /// Next playback start resumes at the current frame
    pub overdub: bool,
    /// Clock period
    pub frame_rate: Duration,
}

/// Per-slot state as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Idle,
    /// Armed, waiting for the first MIDI message
    Armed,
    /// First pass, length not yet known
    Recording,
    /// Layering onto a locked loop
    Overdubbing,
    /// Waiting for a source loop's downbeat after duplicate
    Cued,
    Playing,
}

/// Duplicate destination waiting for the source loop to wrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cue {
    source: SlotId,
    dest: SlotId,
}

/// The loop engine
pub struct LoopEngine {
    state: EngineState,
    slots: SlotStore,
    clock: FrameClock,
    output: Box<dyn MidiOutput>,
    status: Box<dyn StatusSink>,
    cues: Vec<Cue>,
    /// Per-frame event counts of an overdubbed slot when recording began.
    /// Only those events are monitored during the pass.
    monitor: BTreeMap<Frame, usize>,
}

impl LoopEngine {
    /// Create an engine with nine empty slots
    pub fn new(clock: FrameClock, output: Box<dyn MidiOutput>, status: Box<dyn StatusSink>) -> Self {
        Self {
            state: EngineState {
                armed: None,
                recording: false,
                overdub: false,
                frame_rate: clock.period(),
            },
            slots: SlotStore::new(),
            clock,
            output,
            status,
            cues: Vec::new(),
            monitor: BTreeMap::new(),
        }
    }

    /// Current arming state
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Slot by validated id
    pub fn slot(&self, id: SlotId) -> &LoopSlot {
        self.slots.get(id)
    }

    /// All slots
    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    /// The frame clock
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Check if a slot is currently capturing MIDI
    pub fn is_recording(&self, id: SlotId) -> bool {
        self.state.recording && self.state.armed == Some(id)
    }

    /// Display state of a slot
    pub fn slot_status(&self, id: SlotId) -> SlotStatus {
        let slot = self.slots.get(id);
        if self.state.armed == Some(id) {
            if !self.state.recording {
                SlotStatus::Armed
            } else if slot.loop_length.is_some() {
                SlotStatus::Overdubbing
            } else {
                SlotStatus::Recording
            }
        } else if slot.playing {
            SlotStatus::Playing
        } else if self.cues.iter().any(|cue| cue.dest == id) {
            SlotStatus::Cued
        } else {
            SlotStatus::Idle
        }
    }

    /// Run a command, turning any failure into a log line and a status
    /// message. State is untouched on failure.
    pub fn execute(&mut self, command: Command) {
        if command.is_transform() {
            debug!(?command, "transform");
        }
        if let Err(e) = self.apply(command) {
            warn!(?command, error = %e, "command failed");
            self.report(&e.to_string());
        }
    }

    /// Run a command
    pub fn apply(&mut self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Arm(id) => {
                self.arm(SlotId::new(id)?);
                Ok(())
            }
            Command::Disarm => {
                self.disarm();
                Ok(())
            }
            Command::StartPlayback(id) => self.start_playback(SlotId::new(id)?),
            Command::StopPlayback(id) => {
                self.stop_playback(SlotId::new(id)?);
                Ok(())
            }
            Command::TogglePlayback(id) => self.toggle_playback(SlotId::new(id)?),
            Command::ResetSlot(id) => {
                self.reset_slot(SlotId::new(id)?);
                Ok(())
            }
            Command::Duplicate(source, dest) => {
                self.duplicate(SlotId::new(source)?, SlotId::new(dest)?)
            }
            Command::Multiply(id, factor) => self.multiply(SlotId::new(id)?, factor).map(|_| ()),
            Command::Trim(id, factor) => self.trim(SlotId::new(id)?, factor).map(|_| ()),
            Command::Clean(id) => {
                self.clean(SlotId::new(id)?);
                Ok(())
            }
        }
    }

    // ---- Arming and recording ----

    /// Arm a slot. Arming the armed slot again stops its recording; arming
    /// another slot first releases the current one.
    pub fn arm(&mut self, id: SlotId) {
        match self.state.armed {
            Some(current) if current == id => {
                self.release_armed();
                return;
            }
            Some(_) => self.release_armed(),
            None => {}
        }

        self.state.armed = Some(id);
        self.state.recording = false;
        info!(slot = %id, "armed");
        self.report(&format!("loop {} armed", id));
    }

    /// Release the armed slot, stopping its recording if one is running
    pub fn disarm(&mut self) {
        self.release_armed();
    }

    /// Feed an incoming MIDI message. Returns true if it was recorded.
    ///
    /// The first recognized message on an armed slot starts recording and
    /// is captured itself.
    pub fn handle_midi(&mut self, bytes: &[u8]) -> bool {
        if classify(bytes).is_none() {
            return false;
        }
        let Some(id) = self.state.armed else {
            return false;
        };

        if !self.state.recording {
            self.begin_recording(id);
        }

        let slot = self.slots.get_mut(id);
        // A trim during overdub can leave the frame past the new end
        slot.wrap_frame();
        slot.record(bytes);
        debug!(slot = %id, frame = slot.frame, ?bytes, "recorded");
        true
    }

    fn begin_recording(&mut self, id: SlotId) {
        self.state.recording = true;
        self.cues.retain(|cue| cue.dest != id);

        // Recording takes over from playback on this slot
        self.clock.cancel(ClockId::playback(id));
        let slot = self.slots.get_mut(id);
        slot.playing = false;

        if slot.locked {
            slot.wrap_frame();
            self.monitor = slot
                .data
                .iter()
                .map(|(frame, events)| (*frame, events.len()))
                .collect();
        } else {
            slot.frame = 0;
            self.monitor.clear();
        }

        self.clock.start(ClockId::record(id));
        info!(slot = %id, frame = slot.frame, overdub = slot.locked, "recording");
        let message = if slot.locked {
            format!("loop {} overdubbing", id)
        } else {
            format!("loop {} recording", id)
        };
        self.report(&message);
    }

    fn release_armed(&mut self) {
        let Some(id) = self.state.armed.take() else {
            return;
        };

        if !self.state.recording {
            info!(slot = %id, "disarmed");
            self.report(&format!("loop {} disarmed", id));
            return;
        }

        self.state.recording = false;
        self.monitor.clear();
        self.clock.cancel(ClockId::record(id));

        let slot = self.slots.get_mut(id);
        match slot.loop_length {
            Some(_) => self.state.overdub = true,
            None if slot.frame > 0 => {
                slot.loop_length = Some(slot.frame);
                slot.locked = true;
            }
            None => {
                // Stopped before the first tick: nothing to loop
                self.slots.reset(id);
                warn!(slot = %id, "recording too short");
                self.report(&EngineError::MissingLoopLength(id).to_string());
                return;
            }
        }

        let slot = self.slots.get(id);
        info!(
            slot = %id,
            loop_length = ?slot.loop_length,
            events = slot.event_count(),
            "recording stopped"
        );
        let message = format!("loop {}: {} events", id, slot.event_count());
        self.report(&message);

        if let Err(e) = self.start_playback(id) {
            self.report(&e.to_string());
        }
    }

    // ---- Clock ----

    /// Handle a clock tick. Ticks from cancelled or restarted clocks are
    /// ignored.
    pub fn on_tick(&mut self, tick: ClockTick) {
        if !self.clock.accepts(&tick) {
            debug!(clock = ?tick.clock, "stale tick dropped");
            return;
        }

        match tick.clock.kind {
            ClockKind::Record => self.record_tick(tick.clock.slot),
            ClockKind::Playback => self.playback_tick(tick.clock.slot),
        }
    }

    /// Tick every running clock once, in clock id order.
    ///
    /// Used with a manual clock, where no timer tasks deliver ticks.
    pub fn tick_all(&mut self) {
        for tick in self.clock.pending_ticks() {
            self.on_tick(tick);
        }
    }

    fn record_tick(&mut self, id: SlotId) {
        if !self.is_recording(id) {
            return;
        }

        let Self {
            slots,
            output,
            monitor,
            ..
        } = self;
        let slot = slots.get_mut(id);

        if slot.loop_length.is_some() {
            slot.wrap_frame();
            let events = slot.events_at(slot.frame);
            let heard = monitor.get(&slot.frame).copied().unwrap_or(0).min(events.len());
            dispatch(output.as_mut(), id, &events[..heard]);
        }
        // An overdub keeps the loop's phase, so its downbeat still releases cues
        if slot.advance() {
            self.fire_cues(id);
        }
    }

    fn playback_tick(&mut self, id: SlotId) {
        let Self { slots, output, .. } = self;
        let slot = slots.get_mut(id);
        if !slot.playing || slot.loop_length.is_none() {
            return;
        }

        slot.wrap_frame();
        dispatch(output.as_mut(), id, slot.events_at(slot.frame));
        if slot.advance() {
            self.fire_cues(id);
        }
    }

    fn fire_cues(&mut self, source: SlotId) {
        let (due, waiting): (Vec<Cue>, Vec<Cue>) = std::mem::take(&mut self.cues)
            .into_iter()
            .partition(|cue| cue.source == source);
        self.cues = waiting;

        for cue in due {
            debug!(source = %cue.source, dest = %cue.dest, "cue fired");
            if let Err(e) = self.start_playback(cue.dest) {
                self.report(&e.to_string());
            }
        }
    }

    // ---- Playback ----

    /// Start playback of a slot from frame 0, or from the current frame if
    /// the overdub flag is set. The flag is consumed.
    pub fn start_playback(&mut self, id: SlotId) -> Result<(), EngineError> {
        if self.is_recording(id) {
            return Err(EngineError::SlotRecording(id));
        }
        let slot = self.slots.get_mut(id);
        let length = slot.loop_length.ok_or(EngineError::MissingLoopLength(id))?;

        let resume = std::mem::take(&mut self.state.overdub);
        slot.frame = if resume { slot.frame % length } else { 0 };
        slot.playing = true;
        self.cues.retain(|cue| cue.dest != id);
        self.clock.start(ClockId::playback(id));

        info!(slot = %id, frame = slot.frame, loop_length = length, "playing");
        Ok(())
    }

    /// Stop playback of a slot. Drops a pending duplicate cue for it and
    /// starts any slot cued on it right away.
    pub fn stop_playback(&mut self, id: SlotId) {
        self.clock.cancel(ClockId::playback(id));
        self.cues.retain(|cue| cue.dest != id);
        if !self.is_recording(id) {
            self.fire_cues(id);
        }

        let slot = self.slots.get_mut(id);
        if slot.playing {
            slot.playing = false;
            info!(slot = %id, frame = slot.frame, "stopped");
            self.report(&format!("loop {} stopped", id));
        }
    }

    /// Start a stopped slot, stop a playing one
    pub fn toggle_playback(&mut self, id: SlotId) -> Result<(), EngineError> {
        if self.slots.get(id).playing {
            self.stop_playback(id);
            Ok(())
        } else {
            self.start_playback(id)
        }
    }

    /// Stop everything on a slot and clear it
    pub fn reset_slot(&mut self, id: SlotId) {
        self.clock.cancel_slot(id);
        if self.state.armed == Some(id) {
            self.state.armed = None;
            self.state.recording = false;
            self.monitor.clear();
        }
        self.cues.retain(|cue| cue.source != id && cue.dest != id);
        self.slots.reset(id);

        info!(slot = %id, "reset");
        self.report(&format!("loop {} reset", id));
    }

    // ---- Transforms ----

    /// Give `dest` the length of `source` with no events. `dest` starts
    /// playing on the next downbeat of `source`, or at once if `source` is
    /// not playing.
    pub fn duplicate(&mut self, source: SlotId, dest: SlotId) -> Result<(), EngineError> {
        if source == dest {
            return Err(EngineError::SameSlot(source));
        }
        if self.is_recording(dest) {
            return Err(EngineError::SlotRecording(dest));
        }
        let length = self
            .slots
            .get(source)
            .loop_length
            .ok_or(EngineError::MissingLoopLength(source))?;

        self.clock.cancel(ClockId::playback(dest));
        self.cues.retain(|cue| cue.dest != dest);
        transform::copy_shape(length, self.slots.get_mut(dest));
        info!(source = %source, dest = %dest, loop_length = length, "duplicated");

        if self.slots.get(source).playing {
            self.cues.push(Cue { source, dest });
            self.report(&format!("loop {} waits for loop {}", dest, source));
            Ok(())
        } else {
            self.start_playback(dest)
        }
    }

    /// Multiply a slot's length
    pub fn multiply(&mut self, id: SlotId, factor: u32) -> Result<Frame, EngineError> {
        let length = transform::multiply(self.slots.get_mut(id), factor)?;
        info!(slot = %id, factor, loop_length = length, "multiplied");
        self.report(&format!("loop {}: {} frames", id, length));
        Ok(length)
    }

    /// Divide a slot's length, rounding down
    pub fn trim(&mut self, id: SlotId, factor: u32) -> Result<Frame, EngineError> {
        let length = transform::trim(self.slots.get_mut(id), factor)?;
        info!(slot = %id, factor, loop_length = length, "trimmed");
        self.report(&format!("loop {}: {} frames", id, length));
        Ok(length)
    }

    /// Remove all events from a slot
    pub fn clean(&mut self, id: SlotId) {
        transform::clean(self.slots.get_mut(id));
        info!(slot = %id, "cleaned");
        self.report(&format!("loop {} cleaned", id));
    }

    // ---- Persistence ----

    /// Export a slot
    pub fn export_slot(&self, id: SlotId) -> SlotSnapshot {
        self.slots.get(id).snapshot()
    }

    /// Replace a slot with a snapshot. The slot is stopped and disarmed.
    pub fn import_slot(&mut self, id: SlotId, snapshot: SlotSnapshot) {
        self.clock.cancel_slot(id);
        if self.state.armed == Some(id) {
            self.state.armed = None;
            self.state.recording = false;
            self.monitor.clear();
        }
        self.cues.retain(|cue| cue.source != id && cue.dest != id);
        self.slots.get_mut(id).restore(snapshot);
        debug!(slot = %id, loop_length = ?self.slots.get(id).loop_length, "imported");
    }

    /// Send a status line to the status sink
    pub fn report(&mut self, message: &str) {
        self.status.status(message);
    }
}

/// Send events to the output. A failed send is logged and skipped.
fn dispatch(output: &mut dyn MidiOutput, slot: SlotId, events: &[Vec<u8>]) {
    for event in events {
        if let Err(e) = output.send(event) {
            warn!(slot = %slot, error = %e, "MIDI send failed");
        }
    }
}
