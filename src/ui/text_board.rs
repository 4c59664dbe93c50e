//! Text rendering of the displayed position
//!
//! Draws the board the way a terminal front-end shows it: White's pieces in
//! uppercase, Black's in lowercase, rank 8 at the top.
//!
//! # Markers
//!
//! - `[x]` selected piece
//! - `(x)` legal target of the selection (`( )` on an empty square)
//! - `<x>` from/to squares of the last displayed move
//!
//! Under the board come the captured pieces per side with material labels
//! and the status line.

use std::fmt::Write;

use crate::analysis::eval::Evaluation;
use crate::game::oracle::RulesOracle;
use crate::game::state::GameState;
use crate::game::types::{Piece, PieceColor};

/// Letter for a piece: uppercase for White
pub fn piece_letter(piece: Piece) -> char {
    let c = piece.kind.to_char();
    match piece.color {
        PieceColor::White => c.to_ascii_uppercase(),
        PieceColor::Black => c,
    }
}

/// Board, captures and status as multi-line text
pub fn render_board<O: RulesOracle>(game: &GameState<O>) -> String {
    let mut out = String::new();
    let last = game.last_move();

    for y in 0..8u8 {
        let _ = write!(out, "{} ", 8 - y);
        for x in 0..8u8 {
            let letter = game.piece_at(x, y).map(piece_letter).unwrap_or('.');
            let pos = (x, y);
            let cell = if game.selected() == Some(pos) {
                format!("[{letter}]")
            } else if game.selection().is_target(pos) {
                let inner = if letter == '.' { ' ' } else { letter };
                format!("({inner})")
            } else if last.is_some_and(|m| m.from == pos || m.to == pos) {
                format!("<{letter}>")
            } else {
                format!(" {letter} ")
            };
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out.push_str("   a  b  c  d  e  f  g  h\n");

    for color in [PieceColor::White, PieceColor::Black] {
        let captured: String = game
            .captured_grouped(color)
            .into_iter()
            .map(piece_letter)
            .collect();
        let label = game.material_label(color);
        let _ = writeln!(out, "{}: {} {}", color.name(), captured, label);
    }

    if let Some(pending) = game.pending_promotion() {
        let _ = writeln!(out, "Promote {} -> {}: choose q r b n", pending.from, pending.to);
    }
    let _ = writeln!(out, "{}", game.status_text());
    out
}

/// Move list as "1. e4 e5" lines, marking the displayed ply with `*`
pub fn render_moves<O: RulesOracle>(game: &GameState<O>) -> String {
    let shown = game.displayed_ply();
    let cell = |san: &str, ply: usize| {
        if ply == shown {
            format!("{san}*")
        } else {
            san.to_string()
        }
    };

    let mut out = String::new();
    for row in game.move_rows() {
        let white = row
            .white
            .as_ref()
            .map(|c| cell(&c.san, c.ply))
            .unwrap_or_else(|| "...".to_string());
        let black = row
            .black
            .as_ref()
            .map(|c| cell(&c.san, c.ply))
            .unwrap_or_default();
        let line = format!("{}. {} {}", row.move_number, white, black);
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

/// Format engine score for display
pub fn format_evaluation(evaluation: Option<&Evaluation>) -> String {
    let Some(evaluation) = evaluation else {
        return "eval: ...".to_string();
    };
    let pawns = evaluation.cp as f64 / 100.0;
    if pawns > 0.0 {
        format!("eval: +{:.2} (depth {})", pawns, evaluation.depth)
    } else {
        format!("eval: {:.2} (depth {})", pawns, evaluation.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_position() {
        let game: GameState = GameState::new();
        let text = render_board(&game);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "8  r  n  b  q  k  b  n  r ");
        assert_eq!(lines[7], "1  R  N  B  Q  K  B  N  R ");
        assert_eq!(lines[8], "   a  b  c  d  e  f  g  h");
        assert_eq!(lines.last().copied(), Some("White to move"));
    }

    #[test]
    fn test_selection_markers() {
        let mut game: GameState = GameState::new();
        game.select_square(6, 7).unwrap();
        let text = render_board(&game);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[7].contains("[N]"));
        assert!(lines[5].contains("( )"), "f3 and h3 are targets: {}", lines[5]);
    }

    #[test]
    fn test_last_move_and_captures() {
        let mut game: GameState = GameState::new();
        for (from, to) in [((4, 6), (4, 4)), ((3, 1), (3, 3)), ((4, 4), (3, 3))] {
            game.select_square(from.0, from.1).unwrap();
            game.try_move_selected(to.0, to.1).unwrap();
        }
        let text = render_board(&game);

        assert!(text.contains("<P>"), "destination marked: {text}");
        assert!(text.contains("White: p +1"));
        assert!(text.contains("Black:  \n"));
    }

    #[test]
    fn test_move_list_marks_displayed_ply() {
        let mut game: GameState = GameState::new();
        for (from, to) in [((4, 6), (4, 4)), ((4, 1), (4, 3)), ((6, 7), (5, 5))] {
            game.select_square(from.0, from.1).unwrap();
            game.try_move_selected(to.0, to.1).unwrap();
        }
        assert_eq!(render_moves(&game), "1. e4 e5\n2. Nf3*\n");

        game.enter_review_at_end();
        game.goto_review_ply(1).unwrap();
        assert_eq!(render_moves(&game), "1. e4* e5\n2. Nf3\n");
    }

    #[test]
    fn test_format_evaluation() {
        assert_eq!(format_evaluation(None), "eval: ...");
        let eval = Evaluation {
            cp: 35,
            best_move: None,
            depth: 1,
        };
        assert_eq!(format_evaluation(Some(&eval)), "eval: +0.35 (depth 1)");
        let eval = Evaluation { cp: -120, ..eval };
        assert_eq!(format_evaluation(Some(&eval)), "eval: -1.20 (depth 1)");
    }
}
