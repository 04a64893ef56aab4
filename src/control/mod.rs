// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control system for keyboard input.
//!
//! This module provides:
//! - Keyboard shortcut handling with configurable bindings
//! - Resolution of key actions into engine commands, tracking the selected
//!   slot and the two-key duplicate gesture

pub mod keyboard;

pub use keyboard::{format_shortcut, parse_shortcut, KeyBinding, KeyboardController, Shortcut};

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};

use crate::looper::{Command, SLOT_COUNT};

/// Action that can be triggered by a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// No action
    None,

    // Slots
    /// Arm a slot, or stop its recording if already armed
    ArmSlot(u8),
    /// Release the armed slot (also cancels a pending duplicate)
    Disarm,
    /// Start or stop playback of the selected slot
    TogglePlay,
    /// Clear the selected slot
    Reset,

    // Transforms
    /// Remove events from the selected slot
    Clean,
    /// Multiply the selected slot's length
    Multiply(u32),
    /// Divide the selected slot's length
    Trim(u32),
    /// Next slot key picks the duplicate destination
    BeginDuplicate,

    // Session
    /// Write the session file
    Save,

    // Navigation
    /// Move selection up
    SelectUp,
    /// Move selection down
    SelectDown,

    // UI
    /// Toggle help display
    ToggleHelp,
    /// Quit application
    Quit,
}

impl ControlAction {
    /// Check if this action changes a loop's length or content
    pub fn is_transform(&self) -> bool {
        matches!(
            self,
            ControlAction::Clean
                | ControlAction::Multiply(_)
                | ControlAction::Trim(_)
                | ControlAction::BeginDuplicate
        )
    }
}

impl FromStr for ControlAction {
    type Err = anyhow::Error;

    /// Parse an action name as used in the `keyboard` config section, e.g.
    /// `arm:3`, `multiply:4`, `toggle_play`.
    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = match s.trim().split_once(':') {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (s.trim(), None),
        };
        let number = |what: &str| -> Result<u32> {
            let arg = arg.ok_or_else(|| anyhow!("action '{}' needs a {}", name, what))?;
            arg.parse()
                .map_err(|_| anyhow!("invalid {} '{}' for action '{}'", what, arg, name))
        };

        let action = match name.to_lowercase().as_str() {
            "none" => ControlAction::None,
            "arm" => {
                let slot = number("slot")?;
                if slot as usize >= SLOT_COUNT {
                    bail!("no loop slot {} (slots are 0-8)", slot);
                }
                ControlAction::ArmSlot(slot as u8)
            }
            "disarm" => ControlAction::Disarm,
            "toggle_play" | "play" => ControlAction::TogglePlay,
            "reset" => ControlAction::Reset,
            "clean" => ControlAction::Clean,
            "multiply" => ControlAction::Multiply(number("factor")?),
            "trim" => ControlAction::Trim(number("factor")?),
            "duplicate" => ControlAction::BeginDuplicate,
            "save" => ControlAction::Save,
            "select_up" | "up" => ControlAction::SelectUp,
            "select_down" | "down" => ControlAction::SelectDown,
            "help" => ControlAction::ToggleHelp,
            "quit" => ControlAction::Quit,
            other => bail!("unknown action '{}'", other),
        };
        Ok(action)
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlAction::None => write!(f, "none"),
            ControlAction::ArmSlot(slot) => write!(f, "arm:{}", slot),
            ControlAction::Disarm => write!(f, "disarm"),
            ControlAction::TogglePlay => write!(f, "toggle_play"),
            ControlAction::Reset => write!(f, "reset"),
            ControlAction::Clean => write!(f, "clean"),
            ControlAction::Multiply(factor) => write!(f, "multiply:{}", factor),
            ControlAction::Trim(factor) => write!(f, "trim:{}", factor),
            ControlAction::BeginDuplicate => write!(f, "duplicate"),
            ControlAction::Save => write!(f, "save"),
            ControlAction::SelectUp => write!(f, "select_up"),
            ControlAction::SelectDown => write!(f, "select_down"),
            ControlAction::ToggleHelp => write!(f, "help"),
            ControlAction::Quit => write!(f, "quit"),
        }
    }
}

/// What the application should do after a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing beyond a UI refresh
    Nothing,
    /// Run an engine command
    Engine(Command),
    /// Write the session file
    Save,
    /// Show or hide help
    ToggleHelp,
    /// Leave the application
    Quit,
}

/// Turns key actions into engine commands
#[derive(Debug, Clone, Default)]
pub struct LoopController {
    selected: u8,
    pending_duplicate: bool,
}

impl LoopController {
    /// Create a controller with slot 0 selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected slot
    pub fn selected(&self) -> u8 {
        self.selected
    }

    /// Check if the next slot key picks a duplicate destination
    pub fn is_duplicating(&self) -> bool {
        self.pending_duplicate
    }

    /// Resolve an action against the current selection
    pub fn resolve(&mut self, action: ControlAction) -> Outcome {
        if self.pending_duplicate {
            match action {
                ControlAction::ArmSlot(dest) => {
                    self.pending_duplicate = false;
                    return Outcome::Engine(Command::Duplicate(self.selected, dest));
                }
                ControlAction::Disarm => {
                    self.pending_duplicate = false;
                    return Outcome::Nothing;
                }
                _ => self.pending_duplicate = false,
            }
        }

        let selected = self.selected;
        match action {
            ControlAction::None => Outcome::Nothing,
            ControlAction::ArmSlot(slot) => {
                self.selected = slot;
                Outcome::Engine(Command::Arm(slot))
            }
            ControlAction::Disarm => Outcome::Engine(Command::Disarm),
            ControlAction::TogglePlay => Outcome::Engine(Command::TogglePlayback(selected)),
            ControlAction::Reset => Outcome::Engine(Command::ResetSlot(selected)),
            ControlAction::Clean => Outcome::Engine(Command::Clean(selected)),
            ControlAction::Multiply(factor) => Outcome::Engine(Command::Multiply(selected, factor)),
            ControlAction::Trim(factor) => Outcome::Engine(Command::Trim(selected, factor)),
            ControlAction::BeginDuplicate => {
                self.pending_duplicate = true;
                Outcome::Nothing
            }
            ControlAction::Save => Outcome::Save,
            ControlAction::SelectUp => {
                self.selected = self.selected.checked_sub(1).unwrap_or(SLOT_COUNT as u8 - 1);
                Outcome::Nothing
            }
            ControlAction::SelectDown => {
                self.selected = (self.selected + 1) % SLOT_COUNT as u8;
                Outcome::Nothing
            }
            ControlAction::ToggleHelp => Outcome::ToggleHelp,
            ControlAction::Quit => Outcome::Quit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_action_categories() {
        assert!(ControlAction::Multiply(2).is_transform());
        assert!(ControlAction::BeginDuplicate.is_transform());
        assert!(!ControlAction::TogglePlay.is_transform());
        assert!(!ControlAction::ArmSlot(1).is_transform());
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!("arm:3".parse::<ControlAction>().unwrap(), ControlAction::ArmSlot(3));
        assert_eq!("multiply:4".parse::<ControlAction>().unwrap(), ControlAction::Multiply(4));
        assert_eq!("Toggle_Play".parse::<ControlAction>().unwrap(), ControlAction::TogglePlay);
        assert_eq!("quit".parse::<ControlAction>().unwrap(), ControlAction::Quit);

        assert!("arm".parse::<ControlAction>().is_err());
        assert!("arm:9".parse::<ControlAction>().is_err());
        assert!("trim:x".parse::<ControlAction>().is_err());
        assert!("tempo".parse::<ControlAction>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for action in [
            ControlAction::ArmSlot(8),
            ControlAction::Trim(3),
            ControlAction::BeginDuplicate,
            ControlAction::SelectDown,
        ] {
            assert_eq!(action.to_string().parse::<ControlAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_arm_selects_slot() {
        let mut controller = LoopController::new();
        assert_eq!(controller.resolve(ControlAction::ArmSlot(4)), Outcome::Engine(Command::Arm(4)));
        assert_eq!(controller.selected(), 4);
        assert_eq!(
            controller.resolve(ControlAction::Multiply(2)),
            Outcome::Engine(Command::Multiply(4, 2))
        );
    }

    #[test]
    fn test_selection_wraps() {
        let mut controller = LoopController::new();
        controller.resolve(ControlAction::SelectUp);
        assert_eq!(controller.selected(), 8);
        controller.resolve(ControlAction::SelectDown);
        assert_eq!(controller.selected(), 0);
    }

    #[test]
    fn test_duplicate_gesture() {
        let mut controller = LoopController::new();
        controller.resolve(ControlAction::ArmSlot(2));

        assert_eq!(controller.resolve(ControlAction::BeginDuplicate), Outcome::Nothing);
        assert!(controller.is_duplicating());
        assert_eq!(
            controller.resolve(ControlAction::ArmSlot(5)),
            Outcome::Engine(Command::Duplicate(2, 5))
        );
        assert!(!controller.is_duplicating());
        // Destination key does not move the selection
        assert_eq!(controller.selected(), 2);
    }

    #[test]
    fn test_duplicate_cancelled() {
        let mut controller = LoopController::new();
        controller.resolve(ControlAction::BeginDuplicate);
        assert_eq!(controller.resolve(ControlAction::Disarm), Outcome::Nothing);
        assert!(!controller.is_duplicating());

        // Any other action cancels and runs normally
        controller.resolve(ControlAction::BeginDuplicate);
        assert_eq!(
            controller.resolve(ControlAction::TogglePlay),
            Outcome::Engine(Command::TogglePlayback(0))
        );
        assert!(!controller.is_duplicating());
    }
}
