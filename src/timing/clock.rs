// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Frame clock implementation.
//!
//! Every loop slot owns up to two logically independent clocks: one that
//! advances the recording frame and one that advances playback. All clocks
//! share the same fixed period. A running clock is a small tokio task that
//! pushes [`ClockTick`]s into the engine's event loop, so the ticks of all
//! clocks are serialized with MIDI input and user commands.
//!
//! Cancelling a clock aborts its task, but a tick that was already queued may
//! still be delivered. Each start therefore hands out a fresh generation
//! number and [`FrameClock::accepts`] rejects ticks from older generations.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

use crate::looper::SlotId;

/// Default clock period in milliseconds
pub const DEFAULT_FRAME_RATE_MS: u64 = 25;

/// What a clock drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClockKind {
    /// Advances the frame of the slot being recorded
    Record,
    /// Advances the frame of a playing slot and dispatches its events
    Playback,
}

/// Identity of one slot clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockId {
    pub slot: SlotId,
    pub kind: ClockKind,
}

impl ClockId {
    /// Recording clock of a slot
    pub fn record(slot: SlotId) -> Self {
        Self {
            slot,
            kind: ClockKind::Record,
        }
    }

    /// Playback clock of a slot
    pub fn playback(slot: SlotId) -> Self {
        Self {
            slot,
            kind: ClockKind::Playback,
        }
    }
}

/// A single tick delivered to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub clock: ClockId,
    pub generation: u64,
}

/// Handle to a running clock. Dropping it stops the timer task.
#[derive(Debug)]
struct ClockHandle {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Registry of running slot clocks
#[derive(Debug)]
pub struct FrameClock {
    /// Tick period shared by every clock
    period: Duration,
    /// Where timer tasks deliver ticks; `None` in manual mode
    sender: Option<UnboundedSender<ClockTick>>,
    /// Running clocks
    running: BTreeMap<ClockId, ClockHandle>,
    /// Last generation handed out
    generation: u64,
}

impl FrameClock {
    /// Create a clock that spawns one interval task per running clock.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(period: Duration, sender: UnboundedSender<ClockTick>) -> Self {
        Self {
            period,
            sender: Some(sender),
            running: BTreeMap::new(),
            generation: 0,
        }
    }

    /// Create a clock that only does the bookkeeping. Ticks are fed by the
    /// caller, typically using [`FrameClock::pending_ticks`].
    pub fn manual(period: Duration) -> Self {
        Self {
            period,
            sender: None,
            running: BTreeMap::new(),
            generation: 0,
        }
    }

    /// Clock period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start (or restart) a clock. Returns the new generation.
    pub fn start(&mut self, clock: ClockId) -> u64 {
        self.cancel(clock);
        self.generation += 1;
        let generation = self.generation;

        let task = self.sender.as_ref().map(|sender| {
            spawn_interval(
                sender.clone(),
                ClockTick { clock, generation },
                self.period,
            )
        });

        trace!(?clock, generation, "clock started");
        self.running.insert(clock, ClockHandle { generation, task });
        generation
    }

    /// Stop a clock. Returns false if it was not running.
    pub fn cancel(&mut self, clock: ClockId) -> bool {
        let stopped = self.running.remove(&clock).is_some();
        if stopped {
            trace!(?clock, "clock cancelled");
        }
        stopped
    }

    /// Stop every clock that belongs to a slot
    pub fn cancel_slot(&mut self, slot: SlotId) {
        self.cancel(ClockId::record(slot));
        self.cancel(ClockId::playback(slot));
    }

    /// Check if a clock is running
    pub fn is_running(&self, clock: ClockId) -> bool {
        self.running.contains_key(&clock)
    }

    /// Check if a tick belongs to the current run of its clock
    pub fn accepts(&self, tick: &ClockTick) -> bool {
        self.running
            .get(&tick.clock)
            .map(|handle| handle.generation == tick.generation)
            .unwrap_or(false)
    }

    /// One tick for every running clock, ordered by clock id
    pub fn pending_ticks(&self) -> Vec<ClockTick> {
        self.running
            .iter()
            .map(|(clock, handle)| ClockTick {
                clock: *clock,
                generation: handle.generation,
            })
            .collect()
    }

    /// Number of running clocks
    pub fn running_count(&self) -> usize {
        self.running.len()
    }
}

fn spawn_interval(
    sender: UnboundedSender<ClockTick>,
    tick: ClockTick,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // First tick one full period after start, like a plain repeating timer
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if sender.send(tick).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn slot(id: u8) -> SlotId {
        SlotId::new(id).unwrap()
    }

    #[test]
    fn test_manual_clock_start_cancel() {
        let mut clock = FrameClock::manual(Duration::from_millis(25));
        let id = ClockId::record(slot(0));

        assert!(!clock.is_running(id));
        clock.start(id);
        assert!(clock.is_running(id));
        assert_eq!(clock.running_count(), 1);

        assert!(clock.cancel(id));
        assert!(!clock.is_running(id));
        assert!(!clock.cancel(id));
    }

    #[test]
    fn test_restart_rejects_stale_ticks() {
        let mut clock = FrameClock::manual(Duration::from_millis(25));
        let id = ClockId::playback(slot(3));

        let first = clock.start(id);
        let stale = ClockTick {
            clock: id,
            generation: first,
        };
        assert!(clock.accepts(&stale));

        let second = clock.start(id);
        assert_ne!(first, second);
        assert!(!clock.accepts(&stale));
        assert!(clock.accepts(&ClockTick {
            clock: id,
            generation: second
        }));
    }

    #[test]
    fn test_cancelled_clock_rejects_ticks() {
        let mut clock = FrameClock::manual(Duration::from_millis(25));
        let id = ClockId::record(slot(1));
        let generation = clock.start(id);
        clock.cancel(id);
        assert!(!clock.accepts(&ClockTick {
            clock: id,
            generation
        }));
    }

    #[test]
    fn test_cancel_slot() {
        let mut clock = FrameClock::manual(Duration::from_millis(25));
        clock.start(ClockId::record(slot(4)));
        clock.start(ClockId::playback(slot(4)));
        clock.start(ClockId::playback(slot(5)));

        clock.cancel_slot(slot(4));
        assert_eq!(clock.running_count(), 1);
        assert!(clock.is_running(ClockId::playback(slot(5))));
    }

    #[test]
    fn test_pending_ticks_ordered() {
        let mut clock = FrameClock::manual(Duration::from_millis(25));
        clock.start(ClockId::playback(slot(7)));
        clock.start(ClockId::record(slot(2)));

        let ticks = clock.pending_ticks();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].clock, ClockId::record(slot(2)));
        assert_eq!(ticks[1].clock, ClockId::playback(slot(7)));
        assert!(ticks.iter().all(|t| clock.accepts(t)));
    }

    #[tokio::test]
    async fn test_interval_clock_delivers_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = FrameClock::new(Duration::from_millis(5), tx);
        let id = ClockId::playback(slot(0));
        let generation = clock.start(id);

        for _ in 0..3 {
            let tick = time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(tick.clock, id);
            assert_eq!(tick.generation, generation);
        }

        clock.cancel(id);
        // Drain anything queued before the abort, then expect silence
        time::sleep(Duration::from_millis(20)).await;
        while rx.try_recv().is_ok() {}
        time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }
}
