// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Discrete engine commands.
//!
//! Slot numbers are raw so that the input layer can pass along whatever the
//! user asked for; the engine validates them.

/// A command for the loop engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Arm a slot; arming the armed slot again stops its recording
    Arm(u8),
    /// Release the armed slot, stopping its recording if one is running
    Disarm,
    /// Start playback of a slot
    StartPlayback(u8),
    /// Stop playback of a slot
    StopPlayback(u8),
    /// Start or stop playback depending on the current state
    TogglePlayback(u8),
    /// Clear a slot back to empty
    ResetSlot(u8),
    /// Copy the length of the first slot onto the second
    Duplicate(u8, u8),
    /// Multiply a slot's length
    Multiply(u8, u32),
    /// Divide a slot's length
    Trim(u8, u32),
    /// Remove all events of a slot
    Clean(u8),
}

impl Command {
    /// Check if this command changes a loop's length or content
    pub fn is_transform(&self) -> bool {
        matches!(
            self,
            Command::Duplicate(..) | Command::Multiply(..) | Command::Trim(..) | Command::Clean(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transform() {
        assert!(Command::Multiply(0, 2).is_transform());
        assert!(Command::Clean(3).is_transform());
        assert!(!Command::Arm(1).is_transform());
        assert!(!Command::Disarm.is_transform());
    }
}
