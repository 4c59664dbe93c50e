//! Game state resources
//!
//! Plain data owned by [`crate::game::GameState`]. Each resource keeps its
//! own small invariants; the engine coordinates them.
//!
//! - [`MoveLedger`] - move history, per-ply snapshots, redo stack
//! - [`CapturedPieces`] - captured material derived from a history prefix
//! - [`Selection`] - selected square and cached legal targets
//! - [`PendingPromotion`] - parked pawn move awaiting a piece choice
//! - [`VersionCounters`] - position/UI change tokens

pub mod captured;
pub mod history;
pub mod promotion;
pub mod selection;
pub mod versions;

pub use captured::*;
pub use history::*;
pub use promotion::*;
pub use selection::*;
pub use versions::*;
