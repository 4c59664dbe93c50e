//! Change-detection tokens for render and analysis consumers
//!
//! Two monotonically increasing counters. Consumers compare the value they
//! last saw with the current one; the magnitude of the difference carries no
//! meaning and several bumps between polls collapse into one redraw.

/// Position and UI version counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionCounters {
    position: u64,
    ui: u64,
}

impl VersionCounters {
    /// The live position changed. Position changes are UI-visible too.
    pub fn bump_position(&mut self) {
        self.position += 1;
        self.ui += 1;
    }

    /// Something visible changed without touching the live position
    pub fn bump_ui(&mut self) {
        self.ui += 1;
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn ui(&self) -> u64 {
        self.ui
    }
}
