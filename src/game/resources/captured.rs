//! Captured pieces and material advantage
//!
//! Derived entirely from a prefix of the move history: nothing here is a
//! source of truth, so it is rebuilt from scratch whenever the displayed ply
//! changes (new move, undo, review scrubbing).
//!
//! # Material Values
//!
//! Standard chess piece values in pawns:
//! - Pawn: 1
//! - Knight/Bishop: 3
//! - Rook: 5
//! - Queen: 9
//! - King: 0 (never captured)
//!
//! # Material Advantage
//!
//! Positive advantage means White is ahead, negative means Black is ahead.
//! For display the advantage becomes a single "+N" label attached to the
//! side that is ahead; the other side (and both sides on a tie) shows an
//! empty string.

use crate::game::oracle::MoveRecord;
use crate::game::types::{Piece, PieceColor, PieceKind};

/// Pieces captured by each side up to some ply
///
/// # Fields
///
/// - `white_captured`: Black pieces that White has captured
/// - `black_captured`: White pieces that Black has captured
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedPieces {
    /// Pieces captured by white (black pieces taken), in capture order
    pub white_captured: Vec<PieceKind>,
    /// Pieces captured by black (white pieces taken), in capture order
    pub black_captured: Vec<PieceKind>,
}

/// Per-kind counts in [`PieceKind::CAPTURABLE`] order
type KindCounts = [i32; 5];

impl CapturedPieces {
    /// Rebuild captures from the first `ply` moves of `history`
    ///
    /// `ply` is clamped to the history length. Moves without a capture, and
    /// king "captures" (which never happen in legal play), are skipped.
    pub fn from_history(history: &[MoveRecord], ply: usize) -> Self {
        let mut captured = Self::default();
        let ply = ply.min(history.len());
        for record in &history[..ply] {
            if let Some(kind) = record.captured {
                captured.add_capture(record.color, kind);
            }
        }
        captured
    }

    /// Record a capture made by `capturer`
    pub fn add_capture(&mut self, capturer: PieceColor, kind: PieceKind) {
        if kind == PieceKind::King {
            return;
        }
        match capturer {
            PieceColor::White => self.white_captured.push(kind),
            PieceColor::Black => self.black_captured.push(kind),
        }
    }

    /// Kinds captured by `capturer`, in capture order
    pub fn captured_by(&self, capturer: PieceColor) -> &[PieceKind] {
        match capturer {
            PieceColor::White => &self.white_captured,
            PieceColor::Black => &self.black_captured,
        }
    }

    /// Net material in pawns: positive if White is ahead
    pub fn material_advantage(&self) -> i32 {
        let white = counts(&self.white_captured);
        let black = counts(&self.black_captured);
        PieceKind::CAPTURABLE
            .iter()
            .enumerate()
            .map(|(i, kind)| kind.material_value() * (white[i] - black[i]))
            .sum()
    }

    /// "+N" for the side that is ahead, empty otherwise
    pub fn material_label(&self, color: PieceColor) -> String {
        let advantage = self.material_advantage();
        match color {
            PieceColor::White if advantage > 0 => format!("+{advantage}"),
            PieceColor::Black if advantage < 0 => format!("+{}", -advantage),
            _ => String::new(),
        }
    }

    /// Captured pieces of `capturer` grouped most valuable first
    ///
    /// Returned as victim pieces, e.g. white's captures come back black.
    pub fn grouped(&self, capturer: PieceColor) -> Vec<Piece> {
        let victim = capturer.opponent();
        let tally = counts(self.captured_by(capturer));
        expand(&tally, victim)
    }

    /// Captures left after cancelling equal kinds between the sides
    ///
    /// Returns `(white_surplus, black_surplus)` as victim pieces, grouped
    /// most valuable first. Used by layouts too narrow for full lists.
    pub fn differential(&self) -> (Vec<Piece>, Vec<Piece>) {
        let white = counts(&self.white_captured);
        let black = counts(&self.black_captured);

        let mut white_surplus = [0; 5];
        let mut black_surplus = [0; 5];
        for i in 0..PieceKind::CAPTURABLE.len() {
            let net = white[i] - black[i];
            if net > 0 {
                white_surplus[i] = net;
            } else {
                black_surplus[i] = -net;
            }
        }

        (
            expand(&white_surplus, PieceColor::Black),
            expand(&black_surplus, PieceColor::White),
        )
    }

    pub fn clear(&mut self) {
        self.white_captured.clear();
        self.black_captured.clear();
    }
}

fn counts(kinds: &[PieceKind]) -> KindCounts {
    let mut tally = [0; 5];
    for kind in kinds {
        if let Some(i) = PieceKind::CAPTURABLE.iter().position(|k| k == kind) {
            tally[i] += 1;
        }
    }
    tally
}

fn expand(tally: &KindCounts, color: PieceColor) -> Vec<Piece> {
    PieceKind::CAPTURABLE
        .iter()
        .zip(tally.iter())
        .flat_map(|(kind, &n)| std::iter::repeat(Piece::new(color, *kind)).take(n.max(0) as usize))
        .collect()
}
