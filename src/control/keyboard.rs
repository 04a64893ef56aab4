// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard shortcut handling.
//!
//! Provides configurable keyboard bindings for slot, transform and UI
//! actions. Bindings can be overridden from the `keyboard` config section.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use crossterm::event::{KeyCode, KeyModifiers};
use tracing::debug;

use super::ControlAction;

/// A keyboard shortcut definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shortcut {
    /// Key code
    pub code: KeyCode,
    /// Required modifiers
    pub modifiers: KeyModifiers,
}

impl Shortcut {
    /// Create a new shortcut
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Create a shortcut with no modifiers
    pub fn key(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Create a shortcut with Ctrl modifier
    pub fn ctrl(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::CONTROL)
    }

    /// Check if this shortcut matches a key event
    pub fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.code == code && self.modifiers == modifiers
    }
}

/// A keyboard binding (shortcut to action)
#[derive(Debug, Clone)]
pub struct KeyBinding {
    /// The shortcut
    pub shortcut: Shortcut,
    /// The action to perform
    pub action: ControlAction,
    /// Description for help display
    pub description: String,
    /// Category for grouping in help
    pub category: String,
}

impl KeyBinding {
    /// Create a new key binding
    pub fn new(shortcut: Shortcut, action: ControlAction, description: impl Into<String>) -> Self {
        Self {
            shortcut,
            action,
            description: description.into(),
            category: "General".to_string(),
        }
    }

    /// Set the category
    pub fn category(mut self, cat: impl Into<String>) -> Self {
        self.category = cat.into();
        self
    }
}

/// Keyboard controller with configurable bindings
pub struct KeyboardController {
    bindings: HashMap<Shortcut, KeyBinding>,
}

impl KeyboardController {
    /// Create an empty keyboard controller
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Create a keyboard controller with default bindings
    pub fn with_defaults() -> Self {
        let mut controller = Self::new();
        controller.add_default_bindings();
        controller
    }

    /// Add default keyboard bindings
    fn add_default_bindings(&mut self) {
        // Slots: keys 1-9 arm slots 0-8
        for (slot, c) in ('1'..='9').enumerate() {
            self.add(
                KeyBinding::new(
                    Shortcut::key(KeyCode::Char(c)),
                    ControlAction::ArmSlot(slot as u8),
                    format!("Arm / stop loop {}", slot),
                )
                .category("Slots"),
            );
        }

        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Esc), ControlAction::Disarm, "Disarm")
                .category("Slots"),
        );

        self.add(
            KeyBinding::new(
                Shortcut::key(KeyCode::Char(' ')),
                ControlAction::TogglePlay,
                "Play/Stop selected",
            )
            .category("Slots"),
        );

        self.add(
            KeyBinding::new(
                Shortcut::key(KeyCode::Char('x')),
                ControlAction::Reset,
                "Reset selected",
            )
            .category("Slots"),
        );

        // Transforms
        self.add(
            KeyBinding::new(
                Shortcut::key(KeyCode::Char('c')),
                ControlAction::Clean,
                "Clean selected",
            )
            .category("Transforms"),
        );

        self.add(
            KeyBinding::new(
                Shortcut::key(KeyCode::Char('m')),
                ControlAction::Multiply(2),
                "Length x2",
            )
            .category("Transforms"),
        );

        self.add(
            KeyBinding::new(
                Shortcut::key(KeyCode::Char('t')),
                ControlAction::Trim(2),
                "Length /2",
            )
            .category("Transforms"),
        );

        self.add(
            KeyBinding::new(
                Shortcut::key(KeyCode::Char('d')),
                ControlAction::BeginDuplicate,
                "Duplicate selected to next slot key",
            )
            .category("Transforms"),
        );

        // Navigation
        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Up), ControlAction::SelectUp, "Select previous")
                .category("Navigation"),
        );

        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Down), ControlAction::SelectDown, "Select next")
                .category("Navigation"),
        );

        // UI
        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Char('s')), ControlAction::Save, "Save session")
                .category("UI"),
        );

        self.add(
            KeyBinding::new(
                Shortcut::key(KeyCode::Char('?')),
                ControlAction::ToggleHelp,
                "Toggle Help",
            )
            .category("UI"),
        );

        self.add(
            KeyBinding::new(
                Shortcut::key(KeyCode::Char('h')),
                ControlAction::ToggleHelp,
                "Toggle Help",
            )
            .category("UI"),
        );

        self.add(
            KeyBinding::new(Shortcut::key(KeyCode::Char('q')), ControlAction::Quit, "Quit")
                .category("UI"),
        );

        self.add(
            KeyBinding::new(Shortcut::ctrl(KeyCode::Char('c')), ControlAction::Quit, "Quit")
                .category("UI"),
        );
    }

    /// Add a key binding
    pub fn add(&mut self, binding: KeyBinding) {
        self.bindings.insert(binding.shortcut, binding);
    }

    /// Remove a key binding
    pub fn remove(&mut self, shortcut: &Shortcut) -> Option<KeyBinding> {
        self.bindings.remove(shortcut)
    }

    /// Apply overrides from config: key name -> action name. An action of
    /// `none` removes the binding.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Result<()> {
        for (key, action) in overrides {
            let shortcut = parse_shortcut(key)?;
            let action: ControlAction = action
                .parse()
                .map_err(|e| anyhow!("keyboard override '{}': {}", key, e))?;

            if action == ControlAction::None {
                self.remove(&shortcut);
            } else {
                debug!(key = %key, action = %action, "key binding override");
                self.add(
                    KeyBinding::new(shortcut, action, format!("{}", action)).category("Custom"),
                );
            }
        }
        Ok(())
    }

    /// Get action for a key event
    pub fn get_action(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<&ControlAction> {
        self.bindings.get(&Shortcut::new(code, modifiers)).map(|b| &b.action)
    }

    /// Process a key event and return the action
    pub fn process_key(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<ControlAction> {
        // Terminals report shifted characters like '?' with SHIFT set
        let modifiers = match code {
            KeyCode::Char(_) => modifiers.difference(KeyModifiers::SHIFT),
            _ => modifiers,
        };
        self.get_action(code, modifiers).copied()
    }

    /// Get all bindings for help display
    pub fn bindings(&self) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.values()
    }

    /// Get bindings grouped by category
    pub fn bindings_by_category(&self) -> HashMap<String, Vec<&KeyBinding>> {
        let mut grouped: HashMap<String, Vec<&KeyBinding>> = HashMap::new();

        for binding in self.bindings.values() {
            grouped
                .entry(binding.category.clone())
                .or_default()
                .push(binding);
        }

        grouped
    }
}

impl Default for KeyboardController {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Parse a key name such as `x`, `space`, `esc`, `up`, `f5` or `ctrl+s`
pub fn parse_shortcut(s: &str) -> Result<Shortcut> {
    if s.trim() == "+" {
        return Ok(Shortcut::key(KeyCode::Char('+')));
    }

    let mut modifiers = KeyModifiers::NONE;
    let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
    let key = match parts.pop() {
        Some(key) if !key.is_empty() => key,
        _ => bail!("empty key name"),
    };

    for part in &parts {
        if part.is_empty() {
            continue;
        }
        match part.to_lowercase().as_str() {
            "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
            "alt" => modifiers |= KeyModifiers::ALT,
            "shift" => modifiers |= KeyModifiers::SHIFT,
            other => bail!("unknown modifier '{}' in '{}'", other, s),
        }
    }

    let code = match key.to_lowercase().as_str() {
        "space" => KeyCode::Char(' '),
        "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        lower => {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => match lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    Some(n) if (1..=12).contains(&n) => KeyCode::F(n),
                    _ => bail!("unknown key '{}'", key),
                },
            }
        }
    };

    Ok(Shortcut::new(code, modifiers))
}

/// Format a shortcut for display
pub fn format_shortcut(shortcut: &Shortcut) -> String {
    let mut parts = Vec::new();

    if shortcut.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("Ctrl");
    }
    if shortcut.modifiers.contains(KeyModifiers::ALT) {
        parts.push("Alt");
    }
    if shortcut.modifiers.contains(KeyModifiers::SHIFT) {
        parts.push("Shift");
    }

    let key = match shortcut.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_uppercase().to_string(),
        KeyCode::F(n) => format!("F{}", n),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        _ => "?".to_string(),
    };

    parts.push(&key);
    parts.join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_matches() {
        let s = Shortcut::ctrl(KeyCode::Char('c'));
        assert!(s.matches(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!s.matches(KeyCode::Char('c'), KeyModifiers::NONE));
        assert!(!s.matches(KeyCode::Char('x'), KeyModifiers::CONTROL));
    }

    #[test]
    fn test_keyboard_controller_defaults() {
        let controller = KeyboardController::with_defaults();

        let action = controller.get_action(KeyCode::Char(' '), KeyModifiers::NONE);
        assert_eq!(action, Some(&ControlAction::TogglePlay));

        let action = controller.get_action(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(action, Some(&ControlAction::Disarm));

        let action = controller.get_action(KeyCode::Char('m'), KeyModifiers::NONE);
        assert_eq!(action, Some(&ControlAction::Multiply(2)));

        let action = controller.get_action(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(action, Some(&ControlAction::Quit));
    }

    #[test]
    fn test_slot_keys() {
        let controller = KeyboardController::with_defaults();

        for i in 1..=9 {
            let c = char::from_digit(i, 10).unwrap();
            let action = controller.get_action(KeyCode::Char(c), KeyModifiers::NONE);
            assert_eq!(action, Some(&ControlAction::ArmSlot((i - 1) as u8)));
        }
        assert_eq!(controller.get_action(KeyCode::Char('0'), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_process_key_ignores_shift_on_chars() {
        let controller = KeyboardController::with_defaults();

        let action = controller.process_key(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert_eq!(action, Some(ControlAction::ToggleHelp));

        let action = controller.process_key(KeyCode::Char('z'), KeyModifiers::NONE);
        assert_eq!(action, None);
    }

    #[test]
    fn test_parse_shortcut() {
        assert_eq!(parse_shortcut("x").unwrap(), Shortcut::key(KeyCode::Char('x')));
        assert_eq!(parse_shortcut("space").unwrap(), Shortcut::key(KeyCode::Char(' ')));
        assert_eq!(parse_shortcut("Esc").unwrap(), Shortcut::key(KeyCode::Esc));
        assert_eq!(parse_shortcut("F5").unwrap(), Shortcut::key(KeyCode::F(5)));
        assert_eq!(parse_shortcut("ctrl+s").unwrap(), Shortcut::ctrl(KeyCode::Char('s')));
        assert_eq!(parse_shortcut("+").unwrap(), Shortcut::key(KeyCode::Char('+')));

        assert!(parse_shortcut("").is_err());
        assert!(parse_shortcut("hyper+x").is_err());
        assert!(parse_shortcut("nope").is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut controller = KeyboardController::with_defaults();
        let mut overrides = HashMap::new();
        overrides.insert("f".to_string(), "multiply:4".to_string());
        overrides.insert("m".to_string(), "none".to_string());
        controller.apply_overrides(&overrides).unwrap();

        assert_eq!(
            controller.get_action(KeyCode::Char('f'), KeyModifiers::NONE),
            Some(&ControlAction::Multiply(4))
        );
        assert_eq!(controller.get_action(KeyCode::Char('m'), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_apply_overrides_rejects_bad_action() {
        let mut controller = KeyboardController::with_defaults();
        let mut overrides = HashMap::new();
        overrides.insert("f".to_string(), "warp:9".to_string());
        assert!(controller.apply_overrides(&overrides).is_err());
    }

    #[test]
    fn test_format_shortcut() {
        let s = Shortcut::key(KeyCode::Char(' '));
        assert_eq!(format_shortcut(&s), "Space");

        let s = Shortcut::ctrl(KeyCode::Char('c'));
        assert_eq!(format_shortcut(&s), "Ctrl+C");

        let s = Shortcut::key(KeyCode::Up);
        assert_eq!(format_shortcut(&s), "↑");
    }

    #[test]
    fn test_bindings_by_category() {
        let controller = KeyboardController::with_defaults();
        let grouped = controller.bindings_by_category();

        assert!(grouped.contains_key("Slots"));
        assert!(grouped.contains_key("Transforms"));
        assert_eq!(grouped["Slots"].len(), 12);
    }
}
