// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Loop slot status widget.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Paragraph, Widget},
};

use crate::looper::SlotStatus;

use super::SlotRow;

const COLUMNS: [Constraint; 7] = [
    Constraint::Length(4),  // Key
    Constraint::Length(6),  // Loop
    Constraint::Length(9),  // State
    Constraint::Length(8),  // Length
    Constraint::Length(8),  // Events
    Constraint::Length(14), // Channels
    Constraint::Min(10),    // Position
];

/// Widget for displaying all loop slots
pub struct SlotsWidget<'a> {
    slots: &'a [SlotRow],
    selected: Option<usize>,
    block: Option<Block<'a>>,
}

impl<'a> SlotsWidget<'a> {
    /// Create a new slots widget
    pub fn new(slots: &'a [SlotRow]) -> Self {
        Self {
            slots,
            selected: None,
            block: None,
        }
    }

    /// Set selected slot index
    pub fn selected(mut self, index: Option<usize>) -> Self {
        self.selected = index;
        self
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for SlotsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                std::iter::once(Constraint::Length(1))
                    .chain(self.slots.iter().map(|_| Constraint::Length(1)))
                    .collect::<Vec<_>>(),
            )
            .split(area);

        render_header(chunks[0], buf);

        for (i, slot) in self.slots.iter().enumerate() {
            if i + 1 >= chunks.len() {
                break;
            }
            render_slot_row(chunks[i + 1], buf, slot, self.selected == Some(i));
        }
    }
}

fn render_header(area: Rect, buf: &mut Buffer) {
    let style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(COLUMNS)
        .split(area);

    for (chunk, title) in chunks
        .iter()
        .zip(["Key", "Loop", "State", "Length", "Events", "Channels", "Position"])
    {
        Paragraph::new(title).style(style).render(*chunk, buf);
    }
}

fn render_slot_row(area: Rect, buf: &mut Buffer, slot: &SlotRow, selected: bool) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(COLUMNS)
        .split(area);

    // Selection indicator / key
    let key_style = if selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let key_text = if selected {
        format!(">{}", slot.id + 1)
    } else {
        format!(" {}", slot.id + 1)
    };
    Paragraph::new(key_text).style(key_style).render(chunks[0], buf);

    let dim = slot.loop_length.is_none() && slot.status == SlotStatus::Idle;
    let text_style = if dim {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    Paragraph::new(format!("{}", slot.id))
        .style(text_style)
        .render(chunks[1], buf);

    Paragraph::new(status_label(slot.status))
        .style(status_style(slot.status))
        .render(chunks[2], buf);

    let length = slot
        .loop_length
        .map(|l| l.to_string())
        .unwrap_or_else(|| "-".to_string());
    Paragraph::new(length).style(text_style).render(chunks[3], buf);

    Paragraph::new(slot.events.to_string())
        .style(text_style)
        .render(chunks[4], buf);

    let channels = if slot.channels.is_empty() {
        "-".to_string()
    } else {
        slot.channels
            .iter()
            .map(|c| (c + 1).to_string())
            .collect::<Vec<_>>()
            .join(",")
    };
    Paragraph::new(channels)
        .style(Style::default().fg(Color::Cyan))
        .render(chunks[5], buf);

    render_position(chunks[6], buf, slot);
}

/// Short state label
pub fn status_label(status: SlotStatus) -> &'static str {
    match status {
        SlotStatus::Idle => "idle",
        SlotStatus::Armed => "armed",
        SlotStatus::Recording => "rec",
        SlotStatus::Overdubbing => "overdub",
        SlotStatus::Cued => "cued",
        SlotStatus::Playing => "play",
    }
}

fn status_style(status: SlotStatus) -> Style {
    match status {
        SlotStatus::Idle => Style::default().fg(Color::DarkGray),
        SlotStatus::Armed => Style::default().fg(Color::Yellow),
        SlotStatus::Recording => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        SlotStatus::Overdubbing => Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        SlotStatus::Cued => Style::default().fg(Color::Cyan),
        SlotStatus::Playing => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    }
}

/// Frame position bar. While the first pass runs there is no length, so
/// the raw frame count is shown instead.
fn render_position(area: Rect, buf: &mut Buffer, slot: &SlotRow) {
    let width = area.width.saturating_sub(1) as usize;
    if width == 0 {
        return;
    }

    let Some(length) = slot.loop_length else {
        if slot.status == SlotStatus::Recording {
            Paragraph::new(format!("{} frames", slot.frame))
                .style(Style::default().fg(Color::Red))
                .render(area, buf);
        }
        return;
    };

    let filled = progress_cells(slot.frame, length, width);
    let bar: String = "█".repeat(filled) + &"░".repeat(width - filled);
    let color = match slot.status {
        SlotStatus::Playing => Color::Green,
        SlotStatus::Overdubbing => Color::Magenta,
        _ => Color::DarkGray,
    };
    Paragraph::new(bar)
        .style(Style::default().fg(color))
        .render(area, buf);
}

/// Number of filled cells for a frame position
pub fn progress_cells(frame: u32, length: u32, width: usize) -> usize {
    if length == 0 {
        return 0;
    }
    let frame = frame.min(length) as usize;
    (frame * width) / length as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u8, status: SlotStatus, loop_length: Option<u32>) -> SlotRow {
        SlotRow {
            id,
            status,
            frame: 2,
            loop_length,
            events: 3,
            channels: vec![0, 9],
        }
    }

    #[test]
    fn test_progress_cells() {
        assert_eq!(progress_cells(0, 8, 16), 0);
        assert_eq!(progress_cells(4, 8, 16), 8);
        assert_eq!(progress_cells(8, 8, 16), 16);
        assert_eq!(progress_cells(20, 8, 16), 16);
        assert_eq!(progress_cells(3, 0, 16), 0);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(SlotStatus::Recording), "rec");
        assert_eq!(status_label(SlotStatus::Overdubbing), "overdub");
        assert_eq!(status_label(SlotStatus::Playing), "play");
    }

    #[test]
    fn test_render_rows() {
        let slots = vec![
            row(0, SlotStatus::Playing, Some(8)),
            row(1, SlotStatus::Recording, None),
        ];
        let area = Rect::new(0, 0, 70, 4);
        let mut buf = Buffer::empty(area);
        SlotsWidget::new(&slots).selected(Some(1)).render(area, &mut buf);

        let width = area.width as usize;
        let line = |y: usize| -> String {
            buf.content[y * width..(y + 1) * width]
                .iter()
                .map(|cell| cell.symbol())
                .collect()
        };
        assert!(line(0).contains("State"));
        assert!(line(1).contains("play"));
        assert!(line(1).contains("1,10"));
        assert!(line(2).starts_with(">2"));
        assert!(line(2).contains("2 frames"));
    }
}
