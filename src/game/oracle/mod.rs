//! Rules oracle interface
//!
//! The game state engine never implements chess rules itself. Every legality
//! question and every board mutation goes through a [`RulesOracle`], which
//! speaks algebraic squares ("e2") and FEN strings. The engine holds two
//! independent instances: a live one (authoritative game) and a view one
//! (what gets displayed, including review scrubbing).
//!
//! [`ShakmatyOracle`] is the production implementation backed by the
//! `shakmaty` crate.

mod shakmaty_oracle;

pub use shakmaty_oracle::ShakmatyOracle;

use crate::game::error::GameResult;
use crate::game::types::{Piece, PieceColor, PieceKind};

/// Move as requested by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    pub promotion: Option<PieceKind>,
}

impl MoveRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, kind: PieceKind) -> Self {
        self.promotion = Some(kind);
        self
    }
}

/// One legal destination from a square
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalMove {
    pub to: String,
    pub promotion: Option<PieceKind>,
    pub captured: Option<PieceKind>,
}

/// Verbose record of a move the oracle applied (or undid)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub from: String,
    pub to: String,
    /// Side that made the move
    pub color: PieceColor,
    /// Kind of the moving piece before any promotion
    pub piece: PieceKind,
    pub captured: Option<PieceKind>,
    pub promotion: Option<PieceKind>,
    /// Standard algebraic notation including check suffix
    pub san: String,
}

impl MoveRecord {
    /// Request that replays this move
    pub fn to_request(&self) -> MoveRequest {
        MoveRequest {
            from: self.from.clone(),
            to: self.to.clone(),
            promotion: self.promotion,
        }
    }
}

/// Chess rules collaborator consumed by the engine
///
/// Implementations must be fully capable: there is no optional surface.
/// `Default` must produce the standard start position so the engine can
/// build fresh instances for ledger rebuilds.
pub trait RulesOracle: Default {
    /// Side to move
    fn turn(&self) -> PieceColor;

    /// Piece on an algebraic square, if any
    fn get(&self, square: &str) -> Option<Piece>;

    /// Legal moves starting on `square`, in oracle order
    fn moves_from(&self, square: &str) -> Vec<LegalMove>;

    /// Apply a move; `None` when it is illegal (state unchanged)
    fn apply(&mut self, request: &MoveRequest) -> Option<MoveRecord>;

    /// Take back the last applied move; `None` when there is nothing to undo
    fn undo(&mut self) -> Option<MoveRecord>;

    fn is_in_check(&self) -> bool;

    fn is_checkmate(&self) -> bool;

    fn is_stalemate(&self) -> bool;

    /// Any drawn state, stalemate included
    fn is_draw(&self) -> bool;

    fn is_game_over(&self) -> bool {
        self.is_checkmate() || self.is_draw()
    }

    /// Serialize the current position
    fn fen(&self) -> String;

    /// Replace the current position; clears the undo history
    fn load(&mut self, fen: &str) -> GameResult<()>;

    /// Back to the standard start position with empty undo history
    fn reset(&mut self);
}
