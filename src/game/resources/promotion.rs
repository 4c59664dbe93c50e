//! Pawn promotion state
//!
//! When a pawn move would land on the last rank the engine does not move
//! yet. It parks the move here and the UI prompts for the piece. The
//! position is untouched until the choice arrives.

use crate::game::types::{PieceColor, PieceKind};

/// A promotion waiting for the player's piece choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPromotion {
    /// Algebraic square the pawn moves from
    pub from: String,
    /// Algebraic square on the last rank
    pub to: String,
    /// Color of the promoting pawn
    pub color: PieceColor,
}

/// Pieces offered in the promotion chooser, in display order
pub const PROMOTION_CHOICES: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

/// Check if a pawn move results in promotion
///
/// `target_rank` is the 1-based rank number of the destination.
pub fn is_promotion_move(kind: PieceKind, color: PieceColor, target_rank: u8) -> bool {
    if kind != PieceKind::Pawn {
        return false;
    }
    match color {
        PieceColor::White => target_rank == 8,
        PieceColor::Black => target_rank == 1,
    }
}

/// Parse a promotion choice such as 'q' or 'N'
pub fn promotion_kind_from_char(c: char) -> Option<PieceKind> {
    PieceKind::from_char(c).filter(|k| k.is_promotion_target())
}
