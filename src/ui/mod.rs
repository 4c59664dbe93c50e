//! Headless render consumer
//!
//! The engine never pushes frames. A consumer remembers the UI version it
//! last drew and redraws only when the engine reports a newer one; any
//! number of bumps in between collapse into a single redraw.

pub mod text_board;

pub use text_board::{render_board, render_moves};

/// Redraw gate keyed on the engine's UI version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameGate {
    last_seen: Option<u64>,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `ui_version` differs from the last drawn one
    ///
    /// The first call always asks for a frame.
    pub fn needs_redraw(&mut self, ui_version: u64) -> bool {
        if self.last_seen == Some(ui_version) {
            return false;
        }
        self.last_seen = Some(ui_version);
        true
    }

    /// Force the next check to redraw
    pub fn invalidate(&mut self) {
        self.last_seen = None;
    }
}
