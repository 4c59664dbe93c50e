//! Type definitions for chess game state
//!
//! Piece identities, board coordinates and the play/review mode flag shared
//! by the engine, the rules oracle and the render consumers.
//!
//! # Coordinates
//!
//! The engine addresses squares as `(x, y)` with `x` the file index
//! (0 = file 'a') and `y` the row from the top of the board, so `y = 0` is
//! rank 8 and `y = 7` is rank 1. The oracle speaks algebraic notation
//! ("e4"); [`square_from_xy`] and [`xy_from_square`] convert between the two
//! and must round-trip exactly.

use std::fmt;

/// Board position as `(file, row)`; row 0 is rank 8
pub type BoardPos = (u8, u8);

const FILES: &[u8; 8] = b"abcdefgh";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PieceColor {
    #[default]
    White,
    Black,
}

impl PieceColor {
    pub fn opponent(self) -> Self {
        match self {
            PieceColor::White => PieceColor::Black,
            PieceColor::Black => PieceColor::White,
        }
    }

    /// Single-letter code used in piece codes ("w" / "b")
    pub fn to_char(self) -> char {
        match self {
            PieceColor::White => 'w',
            PieceColor::Black => 'b',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'w' => Some(PieceColor::White),
            'b' => Some(PieceColor::Black),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceColor::White => "White",
            PieceColor::Black => "Black",
        }
    }
}

/// Kind of chess piece, independent of color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceKind {
    /// Capturable kinds in display order (most valuable first, pawns last)
    pub const CAPTURABLE: [PieceKind; 5] = [
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
        PieceKind::Pawn,
    ];

    /// Lowercase letter as used in move and piece codes
    pub fn to_char(self) -> char {
        match self {
            PieceKind::King => 'k',
            PieceKind::Queen => 'q',
            PieceKind::Rook => 'r',
            PieceKind::Bishop => 'b',
            PieceKind::Knight => 'n',
            PieceKind::Pawn => 'p',
        }
    }

    /// Parse a piece letter, case-insensitive
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'k' => Some(PieceKind::King),
            'q' => Some(PieceKind::Queen),
            'r' => Some(PieceKind::Rook),
            'b' => Some(PieceKind::Bishop),
            'n' => Some(PieceKind::Knight),
            'p' => Some(PieceKind::Pawn),
            _ => None,
        }
    }

    /// Standard relative material value in pawns. Kings are worth nothing
    /// because they are never captured.
    pub fn material_value(self) -> i32 {
        match self {
            PieceKind::Queen => 9,
            PieceKind::Rook => 5,
            PieceKind::Bishop | PieceKind::Knight => 3,
            PieceKind::Pawn => 1,
            PieceKind::King => 0,
        }
    }

    /// Whether a pawn may promote to this kind
    pub fn is_promotion_target(self) -> bool {
        matches!(
            self,
            PieceKind::Queen | PieceKind::Rook | PieceKind::Bishop | PieceKind::Knight
        )
    }
}

/// A colored piece, rendered as a two-letter code such as "wn" or "bq"
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: PieceColor,
    pub kind: PieceKind,
}

impl Piece {
    pub fn new(color: PieceColor, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    pub fn code(self) -> String {
        self.to_string()
    }

    /// Parse a two-letter code ("wp", "bk", ...)
    pub fn from_code(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        let color = PieceColor::from_char(chars.next()?)?;
        let kind = PieceKind::from_char(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Self { color, kind })
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.color.to_char(), self.kind.to_char())
    }
}

/// Top-level interaction mode
///
/// In `Play` the live position is authoritative and user moves mutate it.
/// In `Review` the view follows the snapshot ledger and the live position is
/// frozen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Play,
    Review,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Play => f.write_str("play"),
            Mode::Review => f.write_str("review"),
        }
    }
}

/// Convert engine coordinates to an algebraic square ("a8" for `(0, 0)`)
///
/// Returns `None` when either coordinate is off the board.
pub fn square_from_xy(x: u8, y: u8) -> Option<String> {
    if x > 7 || y > 7 {
        return None;
    }
    let file = FILES[x as usize] as char;
    let rank = 8 - y;
    Some(format!("{file}{rank}"))
}

/// Convert an algebraic square back to engine coordinates
pub fn xy_from_square(square: &str) -> Option<BoardPos> {
    let bytes = square.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let x = FILES.iter().position(|&f| f == bytes[0])? as u8;
    let rank = match bytes[1] {
        b'1'..=b'8' => bytes[1] - b'0',
        _ => return None,
    };
    Some((x, 8 - rank))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_mapping_corners() {
        assert_eq!(square_from_xy(0, 0).as_deref(), Some("a8"));
        assert_eq!(square_from_xy(7, 7).as_deref(), Some("h1"));
        assert_eq!(square_from_xy(1, 7).as_deref(), Some("b1"));
        assert_eq!(square_from_xy(4, 4).as_deref(), Some("e4"));
    }

    #[test]
    fn test_square_mapping_round_trip() {
        for x in 0..8u8 {
            for y in 0..8u8 {
                let square = square_from_xy(x, y).unwrap();
                assert_eq!(xy_from_square(&square), Some((x, y)), "round trip for {square}");
            }
        }
    }

    #[test]
    fn test_square_mapping_rejects_garbage() {
        assert_eq!(square_from_xy(8, 0), None);
        assert_eq!(square_from_xy(0, 8), None);
        assert_eq!(xy_from_square("i1"), None);
        assert_eq!(xy_from_square("a9"), None);
        assert_eq!(xy_from_square("a0"), None);
        assert_eq!(xy_from_square("e44"), None);
        assert_eq!(xy_from_square(""), None);
    }

    #[test]
    fn test_piece_codes() {
        let piece = Piece::new(PieceColor::Black, PieceKind::Queen);
        assert_eq!(piece.code(), "bq");
        assert_eq!(Piece::from_code("wn"), Some(Piece::new(PieceColor::White, PieceKind::Knight)));
        assert_eq!(Piece::from_code("xq"), None);
        assert_eq!(Piece::from_code("wqq"), None);
    }

    #[test]
    fn test_material_values() {
        assert_eq!(PieceKind::Pawn.material_value(), 1);
        assert_eq!(PieceKind::Knight.material_value(), 3);
        assert_eq!(PieceKind::Bishop.material_value(), 3);
        assert_eq!(PieceKind::Rook.material_value(), 5);
        assert_eq!(PieceKind::Queen.material_value(), 9);
        assert_eq!(PieceKind::King.material_value(), 0);
    }

    #[test]
    fn test_promotion_targets() {
        assert!(PieceKind::Queen.is_promotion_target());
        assert!(PieceKind::Knight.is_promotion_target());
        assert!(!PieceKind::King.is_promotion_target());
        assert!(!PieceKind::Pawn.is_promotion_target());
    }
}
