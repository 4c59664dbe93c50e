//! Tap routing
//!
//! Turns a tap on a board square into the right engine call. The front-end
//! does the hit testing; this only decides what a tap on `(x, y)` means
//! given the current selection.

use tracing::trace;

use crate::game::oracle::RulesOracle;
use crate::game::state::{GameState, MoveOutcome};
use crate::game::types::Mode;

/// What a tap ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    Moved { san: String },
    PromotionOpened,
    Selected,
    /// Selection or pending promotion was dropped
    Cleared,
    Ignored,
}

impl<O: RulesOracle> GameState<O> {
    /// Handle a tap on board square `(x, y)`
    ///
    /// - nothing selected: select the square
    /// - the selected square again: deselect
    /// - a legal target: move there (or open a promotion)
    /// - another own piece: select it instead
    /// - anything else: deselect
    ///
    /// In Review mode or after the game ended, taps only clear leftovers.
    pub fn tap(&mut self, x: u8, y: u8) -> TapOutcome {
        trace!("[GAME] Tap ({}, {})", x, y);

        if self.mode() == Mode::Review || self.is_game_over() {
            return self.drop_interaction();
        }

        if self.pending_promotion().is_some() {
            return self.drop_interaction();
        }

        let Some(selected) = self.selected() else {
            return self.select_and_report(x, y);
        };

        if selected == (x, y) {
            self.clear_selection();
            return TapOutcome::Cleared;
        }

        if self.selection().is_target((x, y)) {
            return match self.try_move_selected(x, y) {
                Ok(MoveOutcome::Moved { san }) => TapOutcome::Moved { san },
                Ok(MoveOutcome::PromotionPending) => TapOutcome::PromotionOpened,
                Err(_) => self.select_and_report(x, y),
            };
        }

        if self.can_select(x, y) {
            return self.select_and_report(x, y);
        }

        self.clear_selection();
        TapOutcome::Cleared
    }

    /// Handle a tap that missed the board and the promotion chooser
    pub fn tap_outside(&mut self) -> TapOutcome {
        self.drop_interaction()
    }

    fn select_and_report(&mut self, x: u8, y: u8) -> TapOutcome {
        match self.select_square(x, y) {
            Ok(()) if self.selected().is_some() => TapOutcome::Selected,
            Ok(()) => TapOutcome::Cleared,
            Err(_) => TapOutcome::Ignored,
        }
    }

    fn drop_interaction(&mut self) -> TapOutcome {
        let had_promotion = self.cancel_promotion().is_ok();
        let had_selection = self.selected().is_some();
        self.clear_selection();
        if had_promotion || had_selection {
            TapOutcome::Cleared
        } else {
            TapOutcome::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_select_then_move() {
        let mut game: GameState = GameState::new();
        assert_eq!(game.tap(4, 6), TapOutcome::Selected);
        assert_eq!(game.tap(4, 4), TapOutcome::Moved { san: "e4".into() });
        assert_eq!(game.piece_code_at(4, 4).as_deref(), Some("wp"));
    }

    #[test]
    fn test_tap_same_square_deselects() {
        let mut game: GameState = GameState::new();
        game.tap(6, 7);
        assert_eq!(game.tap(6, 7), TapOutcome::Cleared);
        assert!(game.selected().is_none());
    }

    #[test]
    fn test_tap_other_own_piece_switches_selection() {
        let mut game: GameState = GameState::new();
        game.tap(6, 7);
        assert_eq!(game.tap(1, 7), TapOutcome::Selected);
        assert_eq!(game.selected(), Some((1, 7)));
    }

    #[test]
    fn test_tap_empty_non_target_clears() {
        let mut game: GameState = GameState::new();
        game.tap(6, 7);
        assert_eq!(game.tap(0, 3), TapOutcome::Cleared);
        assert!(game.selected().is_none());
        assert_eq!(game.tap(0, 3), TapOutcome::Cleared, "empty square with nothing selected");
    }

    #[test]
    fn test_tap_opens_promotion() {
        let mut game: GameState = GameState::with_start_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        game.tap(0, 1);
        assert_eq!(game.tap(0, 0), TapOutcome::PromotionOpened);
        assert!(game.pending_promotion().is_some());

        assert_eq!(game.tap(4, 4), TapOutcome::Cleared, "board tap cancels the chooser");
        assert!(game.pending_promotion().is_none());
        assert!(game.selected().is_none());
    }

    #[test]
    fn test_tap_outside() {
        let mut game: GameState = GameState::new();
        assert_eq!(game.tap_outside(), TapOutcome::Ignored);
        game.tap(4, 6);
        let ui = game.ui_version();
        assert_eq!(game.tap_outside(), TapOutcome::Cleared);
        assert!(game.ui_version() > ui);
    }

    #[test]
    fn test_tap_in_review_is_ignored() {
        let mut game: GameState = GameState::new();
        game.tap(4, 6);
        game.tap(4, 4);
        game.enter_review_at_end();
        let fen = game.fen();

        assert_eq!(game.tap(3, 1), TapOutcome::Ignored);
        assert_eq!(game.fen(), fen);
    }
}
