//! Chess game state engine
//!
//! Owns everything about a single game except the chess rules themselves,
//! which are delegated to a [`oracle::RulesOracle`]. Front-ends drive it
//! through [`GameState`] mutators and poll its version counters to decide
//! when to redraw or re-analyze.
//!
//! # Module Organization
//!
//! - `types` - colors, piece kinds, modes, board coordinates
//! - `error` - [`GameError`] and the [`GameResult`] alias
//! - `oracle` - the rules oracle trait and its shakmaty implementation
//! - `resources` - ledger, captured material, selection, promotion, versions
//! - `state` - the engine itself
//! - `input` - tap routing on top of the engine
//! - `status` - status and debug lines
//!
//! # Coordinates
//!
//! Squares are `(x, y)` with `x` the file index (0 = a) and `y` the row
//! from White's back rank seen from the top (0 = rank 8). The oracle speaks
//! algebraic squares; [`types::square_from_xy`] and
//! [`types::xy_from_square`] convert between the two.

pub mod error;
pub mod input;
pub mod oracle;
pub mod resources;
pub mod state;
pub mod status;
pub mod types;


pub use error::{GameError, GameResult};
pub use input::TapOutcome;
pub use oracle::{RulesOracle, ShakmatyOracle};
pub use state::{GameState, MoveOutcome};
pub use types::{square_from_xy, xy_from_square, BoardPos, Mode, Piece, PieceColor, PieceKind};
