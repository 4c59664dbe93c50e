//! Rules oracle backed by shakmaty

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Role, Square};
use tracing::{debug, warn};

use super::{LegalMove, MoveRecord, MoveRequest, RulesOracle};
use crate::game::error::{GameError, GameResult};
use crate::game::types::{Piece, PieceColor, PieceKind};

/// Halfmove clock value at which the fifty-move rule applies
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// Standard chess rules with an undo stack and repetition tracking
#[derive(Debug, Clone)]
pub struct ShakmatyOracle {
    position: Chess,
    /// Positions before each applied move, paired with the move record
    undo_stack: Vec<(Chess, MoveRecord)>,
    /// Repetition key of every position reached since the last load
    repetition_keys: Vec<String>,
}

impl Default for ShakmatyOracle {
    fn default() -> Self {
        Self::from_position(Chess::default())
    }
}

impl ShakmatyOracle {
    fn from_position(position: Chess) -> Self {
        let key = repetition_key(&position);
        Self {
            position,
            undo_stack: Vec::new(),
            repetition_keys: vec![key],
        }
    }

    /// Build an oracle positioned at `fen`
    pub fn from_fen(fen: &str) -> GameResult<Self> {
        Ok(Self::from_position(parse_fen(fen)?))
    }

    /// Number of moves that can be undone
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    fn find_legal(&self, request: &MoveRequest) -> Option<Move> {
        let from: Square = request.from.parse().ok()?;
        let to: Square = request.to.parse().ok()?;
        let promotion = request.promotion.map(kind_to_role);

        self.position
            .legal_moves()
            .iter()
            .find(|m| m.from() == Some(from) && destination(m) == Some(to) && m.promotion() == promotion)
            .cloned()
    }

    fn is_threefold_repetition(&self) -> bool {
        let Some(current) = self.repetition_keys.last() else {
            return false;
        };
        self.repetition_keys.iter().filter(|key| *key == current).count() >= 3
    }
}

impl RulesOracle for ShakmatyOracle {
    fn turn(&self) -> PieceColor {
        color_from(self.position.turn())
    }

    fn get(&self, square: &str) -> Option<Piece> {
        let square: Square = square.parse().ok()?;
        self.position
            .board()
            .piece_at(square)
            .map(|p| Piece::new(color_from(p.color), role_to_kind(p.role)))
    }

    fn moves_from(&self, square: &str) -> Vec<LegalMove> {
        let Ok(from) = square.parse::<Square>() else {
            return Vec::new();
        };

        self.position
            .legal_moves()
            .iter()
            .filter(|m| m.from() == Some(from))
            .filter_map(|m| {
                let to = destination(m)?;
                Some(LegalMove {
                    to: to.to_string(),
                    promotion: m.promotion().map(role_to_kind),
                    captured: m.capture().map(role_to_kind),
                })
            })
            .collect()
    }

    fn apply(&mut self, request: &MoveRequest) -> Option<MoveRecord> {
        let Some(m) = self.find_legal(request) else {
            debug!(
                "[ORACLE] Rejected {}{}{}",
                request.from,
                request.to,
                request.promotion.map(|k| k.to_char().to_string()).unwrap_or_default()
            );
            return None;
        };

        let before = self.position.clone();
        let san = San::from_move(&before, m.clone());
        let after = match before.clone().play(m.clone()) {
            Ok(after) => after,
            Err(e) => {
                warn!("[ORACLE] Legal move failed to play: {:?}", e);
                return None;
            }
        };

        let suffix = if after.is_checkmate() {
            "#"
        } else if after.is_check() {
            "+"
        } else {
            ""
        };

        let record = MoveRecord {
            from: request.from.clone(),
            to: request.to.clone(),
            color: color_from(before.turn()),
            piece: role_to_kind(m.role()),
            captured: m.capture().map(role_to_kind),
            promotion: m.promotion().map(role_to_kind),
            san: format!("{san}{suffix}"),
        };

        self.repetition_keys.push(repetition_key(&after));
        self.undo_stack.push((before, record.clone()));
        self.position = after;
        Some(record)
    }

    fn undo(&mut self) -> Option<MoveRecord> {
        let (previous, record) = self.undo_stack.pop()?;
        self.position = previous;
        self.repetition_keys.pop();
        Some(record)
    }

    fn is_in_check(&self) -> bool {
        self.position.is_check()
    }

    fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }

    fn is_draw(&self) -> bool {
        if self.is_checkmate() {
            return false;
        }
        self.is_stalemate()
            || self.position.is_insufficient_material()
            || self.position.halfmoves() >= FIFTY_MOVE_HALFMOVES
            || self.is_threefold_repetition()
    }

    fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    fn load(&mut self, fen: &str) -> GameResult<()> {
        let position = parse_fen(fen)?;
        *self = Self::from_position(position);
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

fn parse_fen(fen: &str) -> GameResult<Chess> {
    let parsed: Fen = fen.parse().map_err(|e| GameError::InvalidPosition {
        fen: fen.to_string(),
        message: format!("{e}"),
    })?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| GameError::InvalidPosition {
            fen: fen.to_string(),
            message: format!("{e}"),
        })
}

/// Placement, side to move, castling rights and en passant square
fn repetition_key(position: &Chess) -> String {
    let fen = Fen::from_position(position, EnPassantMode::Legal).to_string();
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Square the moving piece lands on; castling is addressed by the king's
/// destination rather than the rook square.
fn destination(m: &Move) -> Option<Square> {
    match m {
        Move::Normal { to, .. } | Move::EnPassant { to, .. } => Some(*to),
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() { File::G } else { File::C };
            Some(Square::from_coords(file, king.rank()))
        }
        Move::Put { .. } => None,
    }
}

fn color_from(color: Color) -> PieceColor {
    match color {
        Color::White => PieceColor::White,
        Color::Black => PieceColor::Black,
    }
}

fn role_to_kind(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

fn kind_to_role(kind: PieceKind) -> Role {
    match kind {
        PieceKind::Pawn => Role::Pawn,
        PieceKind::Knight => Role::Knight,
        PieceKind::Bishop => Role::Bishop,
        PieceKind::Rook => Role::Rook,
        PieceKind::Queen => Role::Queen,
        PieceKind::King => Role::King,
    }
}
