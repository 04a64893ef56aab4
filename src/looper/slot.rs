// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Loop slot data.
//!
//! A slot stores recorded MIDI as a sparse map from frame index to the raw
//! messages captured during that frame, in arrival order. Frames without
//! events have no entry.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::midi::channel_of;

use super::SlotId;

/// Frame index / frame count on the loop clock
pub type Frame = u32;

/// Raw MIDI message as captured
pub type MidiEvent = Vec<u8>;

/// One loop slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSlot {
    id: SlotId,
    /// Recording frame count, or playback position
    pub(crate) frame: Frame,
    /// Frames per cycle, unset until the first pass is stopped
    pub(crate) loop_length: Option<Frame>,
    /// Set once the length is established
    pub(crate) locked: bool,
    /// Playback clock active
    pub(crate) playing: bool,
    /// Frame -> events
    pub(crate) data: BTreeMap<Frame, Vec<MidiEvent>>,
    /// MIDI channels seen in recorded events
    pub(crate) channels: BTreeSet<u8>,
}

impl LoopSlot {
    /// Create an empty slot
    pub fn new(id: SlotId) -> Self {
        Self {
            id,
            frame: 0,
            loop_length: None,
            locked: false,
            playing: false,
            data: BTreeMap::new(),
            channels: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn loop_length(&self) -> Option<Frame> {
        self.loop_length
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Frame-indexed event map
    pub fn data(&self) -> &BTreeMap<Frame, Vec<MidiEvent>> {
        &self.data
    }

    /// Events stored at a frame, in arrival order
    pub fn events_at(&self, frame: Frame) -> &[MidiEvent] {
        self.data.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of stored events
    pub fn event_count(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    /// Channels observed while recording
    pub fn channels(&self) -> &BTreeSet<u8> {
        &self.channels
    }

    /// True if nothing was ever recorded or loaded
    pub fn is_empty(&self) -> bool {
        self.loop_length.is_none() && self.data.is_empty()
    }

    /// Append an event at the current frame
    pub(crate) fn record(&mut self, event: &[u8]) {
        self.data.entry(self.frame).or_default().push(event.to_vec());
        if let Some(channel) = channel_of(event) {
            self.channels.insert(channel);
        }
    }

    /// Bring `frame` back into range after the length shrank
    pub(crate) fn wrap_frame(&mut self) {
        if let Some(length) = self.loop_length {
            if self.frame >= length {
                self.frame %= length;
            }
        }
    }

    /// Move to the next frame, wrapping at the loop length.
    /// Returns true when the loop wrapped back to frame 0.
    pub(crate) fn advance(&mut self) -> bool {
        match self.loop_length {
            Some(length) => {
                self.frame = (self.frame + 1) % length;
                self.frame == 0
            }
            None => {
                self.frame += 1;
                false
            }
        }
    }

    /// Export the persistent part of the slot
    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            loop_length: self.loop_length,
            locked: self.locked,
            channels: self.channels.iter().copied().collect(),
            data: self
                .data
                .iter()
                .map(|(frame, events)| FrameEvents {
                    frame: *frame,
                    events: events.clone(),
                })
                .collect(),
        }
    }

    /// Replace the slot contents with a snapshot. The slot ends up stopped at
    /// frame 0. A zero length is treated as no length, and a slot with a
    /// length is always locked.
    pub(crate) fn restore(&mut self, snapshot: SlotSnapshot) {
        let loop_length = snapshot.loop_length.filter(|length| *length > 0);

        let mut data: BTreeMap<Frame, Vec<MidiEvent>> = BTreeMap::new();
        for entry in snapshot.data {
            data.entry(entry.frame).or_default().extend(entry.events);
        }

        self.frame = 0;
        self.playing = false;
        self.loop_length = loop_length;
        self.locked = loop_length.is_some();
        self.channels = snapshot.channels.into_iter().collect();
        self.data = data;
    }
}

/// Events of one frame in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEvents {
    pub frame: Frame,
    pub events: Vec<MidiEvent>,
}

/// Plain serializable form of a slot, with data ordered by frame
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotSnapshot {
    /// Frames per cycle
    #[serde(default)]
    pub loop_length: Option<Frame>,
    /// Whether the length is established
    #[serde(default)]
    pub locked: bool,
    /// Channels seen
    #[serde(default)]
    pub channels: Vec<u8>,
    /// Recorded events
    #[serde(default)]
    pub data: Vec<FrameEvents>,
}

impl SlotSnapshot {
    /// True if the snapshot describes an untouched slot
    pub fn is_empty(&self) -> bool {
        self.loop_length.is_none() && self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> LoopSlot {
        LoopSlot::new(SlotId::new(1).unwrap())
    }

    #[test]
    fn test_new_slot_is_empty() {
        let slot = slot();
        assert_eq!(slot.frame(), 0);
        assert_eq!(slot.loop_length(), None);
        assert!(!slot.is_locked());
        assert!(!slot.is_playing());
        assert!(slot.is_empty());
        assert_eq!(slot.event_count(), 0);
    }

    #[test]
    fn test_record_keeps_arrival_order() {
        let mut slot = slot();
        slot.frame = 3;
        slot.record(&[0x90, 60, 100]);
        slot.record(&[0x91, 64, 90]);
        slot.record(&[0xB0, 1, 20]);

        assert_eq!(
            slot.events_at(3),
            &[vec![0x90, 60, 100], vec![0x91, 64, 90], vec![0xB0, 1, 20]]
        );
        assert!(slot.events_at(2).is_empty());
        assert_eq!(slot.event_count(), 3);
        assert_eq!(slot.channels().iter().copied().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_advance_unbounded_then_wrapping() {
        let mut slot = slot();
        for _ in 0..10 {
            assert!(!slot.advance());
        }
        assert_eq!(slot.frame(), 10);

        slot.loop_length = Some(4);
        slot.frame = 2;
        assert!(!slot.advance());
        assert!(slot.advance());
        assert_eq!(slot.frame(), 0);
    }

    #[test]
    fn test_wrap_frame_after_shrink() {
        let mut slot = slot();
        slot.loop_length = Some(4);
        slot.frame = 9;
        slot.wrap_frame();
        assert_eq!(slot.frame(), 1);
    }

    #[test]
    fn test_snapshot_orders_frames() {
        let mut slot = slot();
        slot.loop_length = Some(8);
        slot.locked = true;
        slot.frame = 6;
        slot.record(&[0x80, 60, 0]);
        slot.frame = 0;
        slot.record(&[0x90, 60, 127]);

        let snapshot = slot.snapshot();
        assert_eq!(snapshot.loop_length, Some(8));
        assert!(snapshot.locked);
        assert_eq!(snapshot.channels, vec![0]);
        assert_eq!(snapshot.data.len(), 2);
        assert_eq!(snapshot.data[0].frame, 0);
        assert_eq!(snapshot.data[1].frame, 6);
    }

    #[test]
    fn test_restore_resets_position() {
        let mut slot = slot();
        slot.frame = 5;
        slot.playing = true;
        slot.record(&[0x90, 1, 1]);

        slot.restore(SlotSnapshot {
            loop_length: Some(16),
            locked: true,
            channels: vec![2],
            data: vec![FrameEvents {
                frame: 4,
                events: vec![vec![0x92, 60, 100]],
            }],
        });

        assert_eq!(slot.frame(), 0);
        assert!(!slot.is_playing());
        assert_eq!(slot.loop_length(), Some(16));
        assert!(slot.is_locked());
        assert_eq!(slot.event_count(), 1);
        assert_eq!(slot.events_at(4), &[vec![0x92, 60, 100]]);
        assert!(slot.events_at(5).is_empty());
    }

    #[test]
    fn test_restore_with_length_is_locked() {
        let mut slot = slot();
        slot.restore(SlotSnapshot {
            loop_length: Some(8),
            locked: false,
            ..Default::default()
        });
        assert_eq!(slot.loop_length(), Some(8));
        assert!(slot.is_locked());
    }

    #[test]
    fn test_restore_zero_length_is_unset() {
        let mut slot = slot();
        slot.restore(SlotSnapshot {
            loop_length: Some(0),
            locked: true,
            ..Default::default()
        });
        assert_eq!(slot.loop_length(), None);
        assert!(!slot.is_locked());
    }
}
