// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Terminal UI for MIDILOOP.
//!
//! Provides a ratatui-based terminal interface with the loop slot table,
//! incoming MIDI activity, a status bar fed by the engine's status sink, and
//! a help overlay built from the active key bindings.

pub mod midi_activity;
pub mod slots;

pub use midi_activity::{MidiActivityMessage, MidiActivityState, MidiActivityWidget};
pub use slots::SlotsWidget;

use std::io::{self, Stdout};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::control::{format_shortcut, KeyboardController, LoopController};
use crate::looper::{LoopEngine, SlotStatus, StatusSink, SLOT_COUNT};

/// How long a status message stays in the status bar
const STATUS_TIMEOUT: Duration = Duration::from_secs(4);

/// One slot as shown in the slot table
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRow {
    pub id: u8,
    pub status: SlotStatus,
    pub frame: u32,
    pub loop_length: Option<u32>,
    pub events: usize,
    /// Channels 0-15
    pub channels: Vec<u8>,
}

/// UI state shared between components
#[derive(Debug, Clone)]
pub struct UiState {
    /// Slot table rows
    pub slots: Vec<SlotRow>,
    /// Selected slot
    pub selected: u8,
    /// Waiting for a duplicate destination
    pub duplicating: bool,
    /// Armed slot
    pub armed: Option<u8>,
    /// Frame clock period in milliseconds
    pub frame_rate_ms: u64,
    /// Connected input port
    pub input_port: Option<String>,
    /// Connected output port
    pub output_port: Option<String>,
    /// Session file name
    pub session: Option<String>,
    /// Incoming MIDI
    pub midi_activity: MidiActivityState,
    /// Help text visible
    pub show_help: bool,
    /// Status message
    pub status_message: Option<String>,
    /// Status message timestamp
    pub status_time: Option<Instant>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            slots: Vec::with_capacity(SLOT_COUNT),
            selected: 0,
            duplicating: false,
            armed: None,
            frame_rate_ms: crate::timing::DEFAULT_FRAME_RATE_MS,
            input_port: None,
            output_port: None,
            session: None,
            midi_activity: MidiActivityState::default(),
            show_help: false,
            status_message: None,
            status_time: None,
        }
    }
}

impl UiState {
    /// Set a status message that will be displayed temporarily
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_time = Some(Instant::now());
    }

    /// Clear expired status message
    pub fn clear_expired_status(&mut self) {
        if let Some(time) = self.status_time {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
                self.status_time = None;
            }
        }
    }

    /// Copy engine and controller state into the view
    pub fn sync(&mut self, engine: &LoopEngine, controller: &LoopController) {
        self.slots = engine
            .slots()
            .iter()
            .map(|slot| SlotRow {
                id: slot.id().get(),
                status: engine.slot_status(slot.id()),
                frame: slot.frame(),
                loop_length: slot.loop_length(),
                events: slot.event_count(),
                channels: slot.channels().iter().copied().collect(),
            })
            .collect();
        self.armed = engine.state().armed.map(|id| id.get());
        self.frame_rate_ms = engine.state().frame_rate.as_millis() as u64;
        self.selected = controller.selected();
        self.duplicating = controller.is_duplicating();
    }
}

/// Status sink that shows engine messages in the status bar
pub struct UiStatus {
    state: Arc<Mutex<UiState>>,
}

impl UiStatus {
    pub fn new(state: Arc<Mutex<UiState>>) -> Self {
        Self { state }
    }
}

impl StatusSink for UiStatus {
    fn status(&mut self, message: &str) {
        info!(target: "midiloop::status", "{}", message);
        if let Ok(mut state) = self.state.lock() {
            state.set_status(message);
        }
    }
}

/// A help overlay line
#[derive(Debug, Clone, PartialEq)]
pub struct HelpEntry {
    pub category: String,
    pub keys: String,
    pub description: String,
}

/// Build help entries from the key bindings. Shortcuts sharing an action
/// are merged onto one line.
pub fn help_entries(keyboard: &KeyboardController) -> Vec<HelpEntry> {
    const ORDER: [&str; 5] = ["Slots", "Transforms", "Navigation", "UI", "Custom"];

    let grouped = keyboard.bindings_by_category();
    let mut categories: Vec<&String> = grouped.keys().collect();
    categories.sort_by_key(|c| {
        (
            ORDER.iter().position(|o| o == c).unwrap_or(ORDER.len()),
            c.to_string(),
        )
    });

    let mut entries = Vec::new();
    for category in categories {
        let mut bindings = grouped[category].clone();
        bindings.sort_by_key(|b| (b.action.to_string(), format_shortcut(&b.shortcut)));

        let mut merged: Vec<(String, Vec<String>)> = Vec::new();
        for binding in bindings {
            let key = format_shortcut(&binding.shortcut);
            match merged.iter_mut().find(|(desc, _)| *desc == binding.description) {
                Some((_, keys)) => keys.push(key),
                None => merged.push((binding.description.clone(), vec![key])),
            }
        }

        entries.extend(merged.into_iter().map(|(description, keys)| HelpEntry {
            category: category.clone(),
            keys: keys.join("/"),
            description,
        }));
    }
    entries
}

/// Read terminal key presses on a background thread. The thread exits once
/// the receiver is gone.
pub fn spawn_key_reader(sender: UnboundedSender<KeyEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !sender.is_closed() {
            match event::poll(Duration::from_millis(50)) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        if sender.send(key).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!(error = %e, "terminal read failed");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    debug!(error = %e, "terminal poll failed");
                    break;
                }
            }
        }
    })
}

/// Terminal UI application
pub struct App {
    /// Shared UI state
    state: Arc<Mutex<UiState>>,
    /// Terminal handle
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Help overlay contents
    help: Vec<HelpEntry>,
    /// Target frame rate
    frame_rate: u32,
}

impl App {
    /// Create a new app with shared state
    pub fn new(state: Arc<Mutex<UiState>>, help: Vec<HelpEntry>) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            state,
            terminal,
            help,
            frame_rate: 30,
        })
    }

    /// Get shared state handle
    pub fn state(&self) -> Arc<Mutex<UiState>> {
        Arc::clone(&self.state)
    }

    /// Set frame rate
    pub fn set_frame_rate(&mut self, fps: u32) {
        self.frame_rate = fps.clamp(1, 120);
    }

    /// Time between redraws
    pub fn redraw_period(&self) -> Duration {
        Duration::from_millis(1000 / self.frame_rate as u64)
    }

    /// Toggle the help overlay
    pub fn toggle_help(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.show_help = !state.show_help;
        }
    }

    /// Draw the UI
    pub fn draw(&mut self) -> io::Result<()> {
        let state = match self.state.lock() {
            Ok(mut state) => {
                state.clear_expired_status();
                state.clone()
            }
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let help = &self.help;

        self.terminal.draw(|frame| {
            let area = frame.area();

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),                      // Header
                    Constraint::Length(SLOT_COUNT as u16 + 3),  // Slots
                    Constraint::Min(3),                         // MIDI activity
                    Constraint::Length(1),                      // Status bar
                ])
                .split(area);

            render_header(frame, chunks[0], &state);

            let slots = SlotsWidget::new(&state.slots)
                .selected(Some(state.selected as usize))
                .block(Block::default().borders(Borders::ALL).title(" Loops "));
            frame.render_widget(slots, chunks[1]);

            let rows = chunks[2].height.saturating_sub(2) as usize;
            let activity = MidiActivityWidget::new(&state.midi_activity).max_messages(rows);
            frame.render_widget(activity, chunks[2]);

            render_status_bar(frame, chunks[3], &state);

            if state.show_help {
                render_help_overlay(frame, area, help);
            }
        })?;

        Ok(())
    }

    /// Cleanup terminal on drop
    fn cleanup(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Render the header line: armed slot, clock and ports
fn render_header(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title(" MIDILOOP ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let armed = match state.armed {
        Some(slot) => Span::styled(
            format!("● ARMED {}", slot),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        None => Span::styled("○ disarmed", Style::default().fg(Color::DarkGray)),
    };

    let port = |name: &Option<String>| name.clone().unwrap_or_else(|| "-".to_string());
    let line = Line::from(vec![
        armed,
        Span::raw("  "),
        Span::styled(
            format!("{} ms/frame", state.frame_rate_ms),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw("  "),
        Span::styled(
            format!("in: {}", port(&state.input_port)),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  "),
        Span::styled(
            format!("out: {}", port(&state.output_port)),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  "),
        Span::styled(
            format!("session: {}", port(&state.session)),
            Style::default().fg(Color::White),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
}

/// Render status bar
fn render_status_bar(frame: &mut Frame, area: Rect, state: &UiState) {
    let text = if state.duplicating {
        Span::styled(
            format!(" Duplicate loop {} to: press 1-9 (Esc cancels)", state.selected),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    } else if let Some(ref msg) = state.status_message {
        Span::styled(format!(" {}", msg), Style::default().fg(Color::Yellow))
    } else {
        Span::styled(
            " 1-9: Arm | Space: Play/Stop | m/t: x2 /2 | d: Duplicate | s: Save | h: Help | q: Quit",
            Style::default().fg(Color::DarkGray),
        )
    };

    frame.render_widget(Paragraph::new(text), area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect, help: &[HelpEntry]) {
    let mut lines = Vec::new();
    let mut category: Option<&str> = None;
    for entry in help {
        if category != Some(entry.category.as_str()) {
            if category.is_some() {
                lines.push(Line::from(""));
            }
            lines.push(Line::from(Span::styled(
                entry.category.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            category = Some(entry.category.as_str());
        }
        lines.push(Line::from(format!("  {:<14}{}", entry.keys, entry.description)));
    }

    let width = 60.min(area.width.saturating_sub(4));
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    let help_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, help_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    frame.render_widget(Paragraph::new(lines).block(block), help_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlAction;
    use crate::looper::{SlotId, TracingStatus};
    use crate::midi::NullOutput;
    use crate::timing::FrameClock;

    #[test]
    fn test_ui_state_status() {
        let mut state = UiState::default();
        assert!(state.status_message.is_none());

        state.set_status("Test message");
        assert_eq!(state.status_message, Some("Test message".to_string()));

        state.clear_expired_status();
        assert!(state.status_message.is_some());
    }

    #[test]
    fn test_ui_status_sink() {
        let state = Arc::new(Mutex::new(UiState::default()));
        let mut sink = UiStatus::new(state.clone());
        sink.status("loop 2: 4 events");
        assert_eq!(
            state.lock().unwrap().status_message.as_deref(),
            Some("loop 2: 4 events")
        );
    }

    #[test]
    fn test_sync_from_engine() {
        let mut engine = LoopEngine::new(
            FrameClock::manual(Duration::from_millis(20)),
            Box::new(NullOutput),
            Box::new(TracingStatus),
        );
        let mut controller = LoopController::new();
        controller.resolve(ControlAction::ArmSlot(3));

        engine.arm(SlotId::new(3).unwrap());
        engine.handle_midi(&[0x92, 60, 100]);
        engine.tick_all();
        engine.tick_all();

        let mut state = UiState::default();
        state.sync(&engine, &controller);

        assert_eq!(state.slots.len(), SLOT_COUNT);
        assert_eq!(state.armed, Some(3));
        assert_eq!(state.selected, 3);
        assert_eq!(state.frame_rate_ms, 20);

        let row = &state.slots[3];
        assert_eq!(row.status, SlotStatus::Recording);
        assert_eq!(row.frame, 2);
        assert_eq!(row.loop_length, None);
        assert_eq!(row.events, 1);
        assert_eq!(row.channels, vec![2]);
        assert_eq!(state.slots[0].status, SlotStatus::Idle);
    }

    #[test]
    fn test_help_entries() {
        let keyboard = KeyboardController::with_defaults();
        let entries = help_entries(&keyboard);

        assert_eq!(entries[0].category, "Slots");
        let help = entries
            .iter()
            .find(|e| e.description == "Toggle Help")
            .unwrap();
        assert_eq!(help.category, "UI");
        assert_eq!(help.keys, "?/H");

        let quit = entries.iter().find(|e| e.description == "Quit").unwrap();
        assert_eq!(quit.keys, "Ctrl+C/Q");
    }
}
