//! Game Flow Integration Tests
//!
//! Tests for full game flows through the public engine API:
//! - Ledger invariants across moves, undo/redo and rebases
//! - Version counter semantics
//! - Special moves (castling, en passant)
//! - End-of-game detection

use toychess::game::types::{square_from_xy, xy_from_square};
use toychess::game::{BoardPos, GameError, GameState, Mode, MoveOutcome, PieceColor, PieceKind};

/// Select `from` and move to `to`
fn play(game: &mut GameState, from: &str, to: &str) -> String {
    let from: BoardPos = xy_from_square(from).unwrap();
    let to: BoardPos = xy_from_square(to).unwrap();
    game.select_square(from.0, from.1).unwrap();
    match game.try_move_selected(to.0, to.1).unwrap() {
        MoveOutcome::Moved { san } => san,
        MoveOutcome::PromotionPending => panic!("unexpected promotion"),
    }
}

fn check_ledger(game: &GameState) {
    assert_eq!(game.snapshots().len(), game.history().len() + 1);
    assert_eq!(game.snapshots()[0].fen, game.start_fen());
    assert_eq!(game.snapshots()[game.history().len()].fen, game.fen());
    game.verify_ledger().unwrap();
}

// ============================================================================
// Coordinates
// ============================================================================

#[test]
fn test_square_round_trip_all_squares() {
    for x in 0..8 {
        for y in 0..8 {
            let square = square_from_xy(x, y).unwrap();
            assert_eq!(xy_from_square(&square), Some((x, y)), "{square}");
        }
    }
    assert_eq!(square_from_xy(0, 0).as_deref(), Some("a8"));
    assert_eq!(square_from_xy(7, 7).as_deref(), Some("h1"));
}

// ============================================================================
// Ledger Invariants
// ============================================================================

#[test]
fn test_ledger_holds_through_mixed_session() {
    //! Moves, undo, redo, review and rebase all keep snapshots aligned
    let mut game: GameState = GameState::new();
    check_ledger(&game);

    for (from, to) in [("e2", "e4"), ("c7", "c5"), ("g1", "f3"), ("d7", "d6"), ("d2", "d4")] {
        play(&mut game, from, to);
        check_ledger(&game);
    }

    game.undo().unwrap();
    check_ledger(&game);
    game.undo().unwrap();
    check_ledger(&game);
    game.redo().unwrap();
    check_ledger(&game);

    game.enter_review_at_end();
    game.goto_review_ply(3).unwrap();
    game.play_from_here().unwrap();
    check_ledger(&game);
    assert_eq!(game.history().len(), 3);

    play(&mut game, "b8", "c6");
    check_ledger(&game);

    game.reset();
    check_ledger(&game);
}

#[test]
fn test_undo_after_every_move_restores_fen() {
    let mut game: GameState = GameState::new();
    for (from, to) in [("e2", "e4"), ("e7", "e5"), ("f1", "c4"), ("b8", "c6"), ("d1", "h5")] {
        let before = game.fen();
        play(&mut game, from, to);
        game.undo().unwrap();
        assert_eq!(game.fen(), before);
        game.redo().unwrap();
    }
    assert_eq!(game.history().len(), 5);
}

// ============================================================================
// Version Counters
// ============================================================================

#[test]
fn test_position_version_tracks_live_changes_only() {
    let mut game: GameState = GameState::new();
    let mut pos = game.position_version();

    // Selection-only operations
    game.select_square(4, 6).unwrap();
    game.clear_selection();
    game.select_square(1, 7).unwrap();
    let _ = game.try_move_selected(1, 4);
    assert_eq!(game.position_version(), pos);

    play(&mut game, "e2", "e4");
    assert_eq!(game.position_version(), pos + 1);
    pos = game.position_version();

    // Review scrubbing never touches the live game
    game.enter_review_at_end();
    game.goto_review_ply(0).unwrap();
    game.goto_review_ply(1).unwrap();
    game.exit_review_cancel().unwrap();
    assert_eq!(game.position_version(), pos);

    game.undo().unwrap();
    assert_eq!(game.position_version(), pos + 1);
}

#[test]
fn test_ui_version_strictly_increases() {
    let mut game: GameState = GameState::new();
    let mut last = game.ui_version();
    let mut step = |game: &GameState| {
        assert!(game.ui_version() > last);
        last = game.ui_version();
    };

    game.select_square(4, 6).unwrap();
    step(&game);
    game.try_move_selected(4, 4).unwrap();
    step(&game);
    game.enter_review_at_end();
    step(&game);
    game.goto_review_ply(0).unwrap();
    step(&game);
    game.set_mode(Mode::Play);
    step(&game);
}

// ============================================================================
// Special Moves
// ============================================================================

#[test]
fn test_castling_through_engine() {
    let mut game: GameState = GameState::with_start_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    game.select_square(4, 7).unwrap();
    assert!(game.legal_targets().contains(&(6, 7)));
    assert!(game.legal_targets().contains(&(2, 7)));

    assert_eq!(play(&mut game, "e1", "g1"), "O-O");
    assert_eq!(game.piece_code_at(6, 7).as_deref(), Some("wk"));
    assert_eq!(game.piece_code_at(5, 7).as_deref(), Some("wr"));

    assert_eq!(play(&mut game, "e8", "c8"), "O-O-O");
    assert_eq!(game.piece_code_at(3, 0).as_deref(), Some("br"));
    check_ledger(&game);
}

#[test]
fn test_en_passant_counts_as_capture() {
    let mut game: GameState = GameState::with_start_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
    assert_eq!(play(&mut game, "e5", "d6"), "exd6");
    assert_eq!(game.captured_by(PieceColor::White), &[PieceKind::Pawn]);
    assert_eq!(game.piece_code_at(3, 3), None, "captured pawn removed from d5");
    assert_eq!(game.material_label(PieceColor::White), "+1");
}

// ============================================================================
// Game End
// ============================================================================

#[test]
fn test_threefold_repetition_ends_game() {
    let mut game: GameState = GameState::new();
    for _ in 0..2 {
        play(&mut game, "g1", "f3");
        play(&mut game, "g8", "f6");
        play(&mut game, "f3", "g1");
        play(&mut game, "f6", "g8");
    }

    assert!(game.is_game_over());
    assert_eq!(game.status_text(), "Draw");
    assert_eq!(game.select_square(4, 6), Err(GameError::GameOver));

    // Taking a move back reopens the game
    game.undo().unwrap();
    assert!(!game.is_game_over());
}

#[test]
fn test_stalemate_status() {
    let game: GameState = GameState::with_start_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(game.is_game_over());
    assert_eq!(game.status_text(), "Stalemate");
}

#[test]
fn test_check_status() {
    let mut game: GameState = GameState::new();
    play(&mut game, "e2", "e4");
    play(&mut game, "f7", "f6");
    play(&mut game, "d1", "h5");
    assert_eq!(game.status_text(), "Black to move - Check");
}
