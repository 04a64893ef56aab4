// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input activity widget.

use std::time::{Duration, Instant};

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::midi::{channel_of, classify, MessageKind};

/// Recent incoming MIDI messages
#[derive(Debug, Clone)]
pub struct MidiActivityState {
    /// Most recent last
    pub messages: Vec<MidiActivityMessage>,
    /// Maximum messages to keep
    pub max_messages: usize,
}

impl Default for MidiActivityState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            max_messages: 10,
        }
    }
}

impl MidiActivityState {
    /// Add a message, dropping the oldest past capacity
    pub fn add(&mut self, msg: MidiActivityMessage) {
        self.messages.push(msg);
        if self.messages.len() > self.max_messages {
            self.messages.remove(0);
        }
    }

    /// Clear all messages
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// An incoming MIDI message for display
#[derive(Debug, Clone)]
pub struct MidiActivityMessage {
    pub kind: MessageKind,
    /// Channel (1-16)
    pub channel: u8,
    /// Data (note name, controller value, etc.)
    pub data: String,
    /// Slot the message was recorded into
    pub recorded: Option<u8>,
    pub time: Instant,
}

impl MidiActivityMessage {
    /// Describe a raw message. Returns `None` for messages the looper does
    /// not record.
    pub fn from_bytes(bytes: &[u8], recorded: Option<u8>) -> Option<Self> {
        let kind = classify(bytes)?;
        let channel = channel_of(bytes)? + 1;
        let data1 = bytes.get(1).copied().unwrap_or(0);
        let data2 = bytes.get(2).copied().unwrap_or(0);

        let data = match kind {
            MessageKind::NoteOn if data2 > 0 => format!("{} vel:{}", note_name(data1), data2),
            MessageKind::NoteOn | MessageKind::NoteOff | MessageKind::PolyAftertouch => {
                note_name(data1)
            }
            MessageKind::ControlChange => format!("{}={}", data1, data2),
            MessageKind::ProgramChange | MessageKind::ChannelAftertouch => data1.to_string(),
            MessageKind::PitchBend => {
                let value = ((data2 as i32) << 7 | data1 as i32) - 8192;
                format!("{:+}", value)
            }
        };

        Some(Self {
            kind,
            channel,
            data,
            recorded,
            time: Instant::now(),
        })
    }
}

/// Convert MIDI note number to name
pub fn note_name(note: u8) -> String {
    const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i8 - 1;
    let name = NAMES[(note % 12) as usize];
    format!("{}{}", name, octave)
}

/// Widget for displaying incoming MIDI
pub struct MidiActivityWidget<'a> {
    state: &'a MidiActivityState,
    block: Option<Block<'a>>,
    max_messages: usize,
}

impl<'a> MidiActivityWidget<'a> {
    /// Create a new MIDI activity widget
    pub fn new(state: &'a MidiActivityState) -> Self {
        Self {
            state,
            block: None,
            max_messages: 4,
        }
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Set maximum messages to display
    pub fn max_messages(mut self, max: usize) -> Self {
        self.max_messages = max;
        self
    }
}

impl Widget for MidiActivityWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = self
            .block
            .unwrap_or_else(|| Block::default().borders(Borders::ALL).title(" MIDI In "));

        let inner = block.inner(area);
        block.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                (0..self.max_messages)
                    .map(|_| Constraint::Length(1))
                    .collect::<Vec<_>>(),
            )
            .split(inner);

        if self.state.messages.is_empty() {
            if let Some(first) = chunks.first() {
                Paragraph::new("No input")
                    .style(Style::default().fg(Color::DarkGray))
                    .render(*first, buf);
            }
            return;
        }

        // Most recent first
        for (i, msg) in self.state.messages.iter().rev().take(self.max_messages).enumerate() {
            if i >= chunks.len() {
                break;
            }

            let alpha = message_color(msg.time.elapsed());
            let target = match msg.recorded {
                Some(slot) => Span::styled(
                    format!(" → loop {}", slot),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                None => Span::raw(""),
            };

            let line = Line::from(vec![
                Span::styled(format!("Ch{:02} ", msg.channel), Style::default().fg(Color::Cyan)),
                Span::styled(format!("{:10} ", msg.kind.label()), Style::default().fg(alpha)),
                Span::styled(msg.data.clone(), Style::default().fg(alpha)),
                target,
            ]);

            Paragraph::new(line).render(chunks[i], buf);
        }
    }
}

/// Get color based on message age
fn message_color(age: Duration) -> Color {
    if age < Duration::from_millis(200) {
        Color::White
    } else if age < Duration::from_millis(500) {
        Color::Gray
    } else {
        Color::DarkGray
    }
}
