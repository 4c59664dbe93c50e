//! toychess - a chess game state engine
//!
//! The engine ([`game::GameState`]) owns modes, selection, promotion,
//! undo/redo, a per-ply snapshot ledger for review, and version counters
//! that tell render and analysis consumers when to act. Chess rules come
//! from a pluggable [`game::RulesOracle`].
//!
//! Around it:
//! - [`analysis`] - background evaluation and opening lookups feeding keyed
//!   mailboxes
//! - [`ui`] - a headless text renderer and redraw gate
//! - [`core`] - settings, logging, ambient errors

pub mod analysis;
pub mod core;
pub mod game;
pub mod ui;

pub use game::{GameError, GameResult, GameState, Mode, MoveOutcome, TapOutcome};
