// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Status reporting.

use tracing::info;

/// Receiver for the human-readable status lines the engine emits on
/// transitions and failed operations
pub trait StatusSink {
    fn status(&mut self, message: &str);
}

/// Sink that only writes status lines to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn status(&mut self, message: &str) {
        info!(target: "midiloop::status", "{}", message);
    }
}
