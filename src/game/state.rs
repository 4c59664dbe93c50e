//! Game state engine
//!
//! [`GameState`] is the single owner of all game state. Everything the
//! front-end does (tapping squares, choosing a promotion piece, stepping
//! through history) goes through one of its mutators, and everything it
//! draws comes from one of its readers.
//!
//! # Two positions
//!
//! - **live**: the authoritative game. Only Play-mode moves, undo, redo,
//!   reset and play-from-here change it.
//! - **view**: what is displayed. In Play mode it mirrors live; in Review
//!   mode it is loaded from the snapshot at the review cursor.
//!
//! # Modes
//!
//! ```text
//! Play   --enter_review_at_end()--> Review (cursor = end of history)
//! Review --goto_review_ply(n)-----> Review (cursor = n, clamped)
//! Review --exit_review_cancel()---> Play   (view = live, history intact)
//! Review --play_from_here()-------> Play   (history truncated to cursor)
//! ```
//!
//! # Change detection
//!
//! Every mutation that changes something visible bumps the UI version;
//! every change to the live position also bumps the position version.
//! Rejected operations return an error and change nothing.

use tracing::{debug, error, info, warn};

use crate::analysis::mailbox::{KeyedMailbox, Retention};
use crate::analysis::opening::OpeningUpdate;
use crate::game::error::{GameError, GameResult};
use crate::game::oracle::{MoveRecord, MoveRequest, RulesOracle, ShakmatyOracle};
use crate::game::resources::{
    is_promotion_move, CapturedPieces, HistoryEntry, MoveLedger, MoveRow, PendingPromotion,
    PlyMove, Selection, Snapshot, VersionCounters,
};
use crate::game::types::{
    square_from_xy, xy_from_square, BoardPos, Mode, Piece, PieceColor, PieceKind,
};

/// Result of a successful [`GameState::try_move_selected`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move was applied
    Moved { san: String },
    /// The move needs a piece choice first
    PromotionPending,
}

/// The game state engine
///
/// Generic over the rules oracle so tests and benches can swap it; the
/// default is the shakmaty-backed oracle.
pub struct GameState<O: RulesOracle = ShakmatyOracle> {
    mode: Mode,
    live: O,
    view: O,

    selection: Selection,
    pending_promotion: Option<PendingPromotion>,

    ledger: MoveLedger,
    review_ply: usize,

    versions: VersionCounters,

    // Derived from the ledger prefix up to the displayed ply
    last_move: Option<PlyMove>,
    captured: CapturedPieces,

    openings: KeyedMailbox<String, OpeningUpdate>,
}

impl<O: RulesOracle> GameState<O> {
    /// New game from the standard start position
    pub fn new() -> Self {
        let live = O::default();
        let view = O::default();
        let ledger = MoveLedger::new(live.fen());
        let mut state = Self {
            mode: Mode::Play,
            live,
            view,
            selection: Selection::default(),
            pending_promotion: None,
            ledger,
            review_ply: 0,
            versions: VersionCounters::default(),
            last_move: None,
            captured: CapturedPieces::default(),
            openings: KeyedMailbox::new(Retention::Unbounded),
        };
        state.update_derived();
        state
    }

    /// New game from a custom start position
    ///
    /// Reset and play-from-here rebuilds go back to this position.
    pub fn with_start_fen(fen: &str) -> GameResult<Self> {
        let mut state = Self::new();
        state.live.load(fen)?;
        state.sync_view_to_live();
        state.ledger.reset(state.live.fen());
        state.update_derived();
        info!("[GAME] Started from custom position");
        Ok(state)
    }

    // ========================================================================
    // Guards
    // ========================================================================

    fn require_mode(&self, expected: Mode) -> GameResult<()> {
        if self.mode != expected {
            return Err(GameError::WrongMode {
                expected,
                actual: self.mode,
            });
        }
        Ok(())
    }

    /// Play mode, no promotion outstanding, game still running
    fn require_interactive(&self) -> GameResult<()> {
        self.require_mode(Mode::Play)?;
        if self.pending_promotion.is_some() {
            return Err(GameError::PromotionPending);
        }
        if self.live.is_game_over() {
            return Err(GameError::GameOver);
        }
        Ok(())
    }

    fn square(pos: BoardPos) -> GameResult<String> {
        square_from_xy(pos.0, pos.1).ok_or_else(|| GameError::InvalidSquare {
            square: format!("({}, {})", pos.0, pos.1),
        })
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Whether tapping `(x, y)` would select a piece
    pub fn can_select(&self, x: u8, y: u8) -> bool {
        if self.require_interactive().is_err() {
            return false;
        }
        square_from_xy(x, y)
            .and_then(|sq| self.live.get(&sq))
            .is_some_and(|piece| piece.color == self.live.turn())
    }

    /// Select the piece on `(x, y)` and compute its legal targets
    ///
    /// Tapping an empty square or an opponent piece clears the selection.
    pub fn select_square(&mut self, x: u8, y: u8) -> GameResult<()> {
        self.require_interactive()?;
        let square = Self::square((x, y))?;

        let own_piece = self
            .live
            .get(&square)
            .is_some_and(|piece| piece.color == self.live.turn());
        if !own_piece {
            self.clear_selection();
            return Ok(());
        }

        let targets: Vec<BoardPos> = self
            .live
            .moves_from(&square)
            .iter()
            .filter_map(|m| xy_from_square(&m.to))
            .collect();
        debug!("[GAME] Selected {} ({} targets)", square, targets.len());

        self.selection.set((x, y), targets);
        self.versions.bump_ui();
        Ok(())
    }

    /// Drop the selection; a no-op when nothing is selected
    pub fn clear_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.versions.bump_ui();
    }

    // ========================================================================
    // Moves
    // ========================================================================

    /// Move the selected piece to `(x, y)`
    ///
    /// A pawn reaching the last rank does not move yet: a promotion is
    /// opened instead and the move completes in [`Self::finish_promotion`].
    pub fn try_move_selected(&mut self, x: u8, y: u8) -> GameResult<MoveOutcome> {
        self.require_interactive()?;
        let from_pos = self
            .selection
            .selected_position
            .ok_or(GameError::NothingSelected)?;
        let from = Self::square(from_pos)?;
        let to = Self::square((x, y))?;

        if self.promotes(&from, &to) {
            self.begin_promotion(from_pos, (x, y))?;
            return Ok(MoveOutcome::PromotionPending);
        }

        let record = self
            .live
            .apply(&MoveRequest::new(from.as_str(), to.as_str()))
            .ok_or(GameError::IllegalMove { from, to })?;

        let san = record.san.clone();
        self.ledger.clear_redo();
        self.commit(record);
        Ok(MoveOutcome::Moved { san })
    }

    /// Whether `from -> to` is a legal pawn move onto the last rank
    fn promotes(&self, from: &str, to: &str) -> bool {
        let Some(piece) = self.live.get(from) else {
            return false;
        };
        let Some((_, y)) = xy_from_square(to) else {
            return false;
        };
        is_promotion_move(piece.kind, piece.color, 8 - y)
            && self
                .live
                .moves_from(from)
                .iter()
                .any(|m| m.to == to && m.promotion.is_some())
    }

    /// Park a promoting move until a piece is chosen
    ///
    /// Rejected unless the oracle lists a promoting move `from -> to`.
    pub fn begin_promotion(&mut self, from: BoardPos, to: BoardPos) -> GameResult<()> {
        self.require_interactive()?;
        let from_sq = Self::square(from)?;
        let to_sq = Self::square(to)?;
        if !self.promotes(&from_sq, &to_sq) {
            return Err(GameError::IllegalMove {
                from: from_sq,
                to: to_sq,
            });
        }
        let color = self.live.turn();

        debug!("[GAME] Promotion pending {} -> {}", from_sq, to_sq);
        self.pending_promotion = Some(PendingPromotion {
            from: from_sq,
            to: to_sq,
            color,
        });
        self.versions.bump_ui();
        Ok(())
    }

    /// Complete the pending promotion with `kind`
    ///
    /// An invalid piece keeps the promotion open. If the oracle rejects
    /// the move the promotion is dropped and an error returned.
    pub fn finish_promotion(&mut self, kind: PieceKind) -> GameResult<String> {
        self.require_mode(Mode::Play)?;
        if self.live.is_game_over() {
            return Err(GameError::GameOver);
        }
        let pending = self
            .pending_promotion
            .clone()
            .ok_or(GameError::NoPromotionPending)?;
        if !kind.is_promotion_target() {
            return Err(GameError::InvalidPromotionPiece {
                kind: kind.to_char(),
            });
        }

        let request = MoveRequest::new(pending.from.as_str(), pending.to.as_str()).with_promotion(kind);
        self.pending_promotion = None;
        match self.live.apply(&request) {
            Some(record) => {
                let san = record.san.clone();
                self.ledger.clear_redo();
                self.commit(record);
                Ok(san)
            }
            None => {
                warn!("[GAME] Promotion {} -> {} rejected", pending.from, pending.to);
                self.versions.bump_ui();
                Err(GameError::IllegalMove {
                    from: pending.from,
                    to: pending.to,
                })
            }
        }
    }

    /// Abandon the pending promotion without moving
    pub fn cancel_promotion(&mut self) -> GameResult<()> {
        if self.pending_promotion.take().is_none() {
            return Err(GameError::NoPromotionPending);
        }
        self.versions.bump_ui();
        Ok(())
    }

    /// Record a move the live oracle just applied
    fn commit(&mut self, record: MoveRecord) {
        debug!("[GAME] {} played {}", record.color.name(), record.san);
        let fen_after = self.live.fen();
        self.ledger.append(record, fen_after);
        self.sync_view_to_live();
        self.selection.clear();
        self.versions.bump_position();
        self.update_derived();
        self.enforce_game_over();
    }

    // ========================================================================
    // Undo / Redo / Reset
    // ========================================================================

    /// Take back the last move; it becomes redoable
    pub fn undo(&mut self) -> GameResult<()> {
        self.require_mode(Mode::Play)?;
        if self.ledger.is_empty() {
            return Err(GameError::NothingToUndo);
        }
        self.discard_interaction();

        let record = self.live.undo().ok_or(GameError::NothingToUndo)?;
        if self.ledger.truncate_tail().is_none() {
            error!("[LEDGER] Oracle undid {} but the ledger was empty", record.san);
        }
        debug!("[GAME] Undid {}", record.san);
        self.ledger.push_redo(record);

        self.sync_view_to_live();
        self.versions.bump_position();
        self.update_derived();
        self.enforce_game_over();
        Ok(())
    }

    /// Re-apply the most recently undone move
    pub fn redo(&mut self) -> GameResult<()> {
        self.require_mode(Mode::Play)?;
        if self.ledger.redo_depth() == 0 {
            return Err(GameError::NothingToRedo);
        }
        self.discard_interaction();

        let entry = self.ledger.pop_redo().ok_or(GameError::NothingToRedo)?;
        match self.live.apply(&entry.to_request()) {
            Some(record) => {
                debug!("[GAME] Redid {}", record.san);
                self.commit(record);
                Ok(())
            }
            None => {
                warn!("[GAME] Redo of {} rejected by the oracle", entry.san);
                self.versions.bump_ui();
                Err(GameError::IllegalMove {
                    from: entry.from,
                    to: entry.to,
                })
            }
        }
    }

    /// Back to the start position with empty history
    ///
    /// The mode is kept; in Review the cursor lands on ply 0.
    pub fn reset(&mut self) {
        let start = self.ledger.start_fen().to_string();
        if let Err(e) = self.live.load(&start) {
            error!("[GAME] Start position failed to reload: {}", e);
            self.live.reset();
        }
        self.sync_view_to_live();

        self.selection.clear();
        self.pending_promotion = None;
        self.ledger.reset(self.live.fen());
        self.review_ply = 0;
        self.openings.clear();

        info!("[GAME] Reset");
        self.versions.bump_position();
        self.update_derived();
    }

    /// Selection and pending promotion go away before history moves
    fn discard_interaction(&mut self) {
        if self.selection.is_empty() && self.pending_promotion.is_none() {
            return;
        }
        self.selection.clear();
        self.pending_promotion = None;
        self.versions.bump_ui();
    }

    /// Nothing stays selected once the live game has ended
    fn enforce_game_over(&mut self) {
        if !self.live.is_game_over() {
            return;
        }
        debug!("[GAME] Game over: {}", self.status_text());
        self.discard_interaction();
    }

    // ========================================================================
    // Review
    // ========================================================================

    /// Switch modes; entering Review starts at the end of history
    pub fn set_mode(&mut self, mode: Mode) {
        match mode {
            Mode::Review => self.enter_review_at_end(),
            Mode::Play => {
                if self.mode == Mode::Review {
                    // Only fails outside Review
                    let _ = self.exit_review_cancel();
                }
            }
        }
    }

    /// Enter Review with the cursor on the latest ply
    pub fn enter_review_at_end(&mut self) {
        self.selection.clear();
        self.pending_promotion = None;
        if self.mode != Mode::Review {
            info!("[REVIEW] Entering review");
        }
        self.mode = Mode::Review;
        self.load_view_ply(self.ledger.len());
    }

    /// Move the review cursor; out-of-range plies are clamped
    pub fn goto_review_ply(&mut self, ply: usize) -> GameResult<()> {
        self.require_mode(Mode::Review)?;
        self.load_view_ply(ply);
        Ok(())
    }

    /// Step the cursor by `delta` plies
    pub fn step_review(&mut self, delta: isize) -> GameResult<()> {
        self.require_mode(Mode::Review)?;
        let target = self.review_ply.saturating_add_signed(delta);
        self.load_view_ply(target);
        Ok(())
    }

    /// Leave Review without touching history
    pub fn exit_review_cancel(&mut self) -> GameResult<()> {
        self.require_mode(Mode::Review)?;
        info!("[REVIEW] Back to the live game");
        self.mode = Mode::Play;
        self.sync_view_to_live();
        self.versions.bump_ui();
        self.update_derived();
        Ok(())
    }

    /// Continue the game from the reviewed ply, discarding later moves
    ///
    /// The history prefix is replayed into a fresh oracle which then
    /// becomes the live game. On failure nothing changes.
    pub fn play_from_here(&mut self) -> GameResult<()> {
        self.require_mode(Mode::Review)?;
        let target = self.review_ply.min(self.ledger.len());

        let (live, ledger) = self.ledger.rebuild_from_prefix::<O>(target)?;
        info!(
            "[REVIEW] Playing from ply {} ({} moves discarded)",
            target,
            self.ledger.len() - target
        );

        self.live = live;
        self.ledger = ledger;
        self.mode = Mode::Play;
        self.review_ply = target;
        self.selection.clear();
        self.pending_promotion = None;
        self.sync_view_to_live();

        self.versions.bump_position();
        self.update_derived();
        self.enforce_game_over();
        Ok(())
    }

    fn load_view_ply(&mut self, ply: usize) {
        let ply = ply.min(self.ledger.len());
        self.review_ply = ply;
        let fen = self.ledger.snapshot_clamped(ply).fen.clone();
        if let Err(e) = self.view.load(&fen) {
            error!("[LEDGER] Snapshot {} failed to load: {}", ply, e);
        }
        debug!("[REVIEW] Cursor at {}/{}", ply, self.ledger.len());
        self.versions.bump_ui();
        self.update_derived();
    }

    fn sync_view_to_live(&mut self) {
        let fen = self.live.fen();
        if let Err(e) = self.view.load(&fen) {
            error!("[GAME] View failed to follow live position: {}", e);
        }
    }

    // ========================================================================
    // Derived state
    // ========================================================================

    /// Ply whose position is on screen
    pub fn displayed_ply(&self) -> usize {
        match self.mode {
            Mode::Play => self.ledger.len(),
            Mode::Review => self.review_ply.min(self.ledger.len()),
        }
    }

    /// Recompute last move, captures and the visible opening entry
    pub fn update_derived(&mut self) {
        let ply = self.displayed_ply();
        self.last_move = ply
            .checked_sub(1)
            .and_then(|index| self.ledger.move_at_ply(index));
        self.captured = CapturedPieces::from_history(self.ledger.history(), ply);

        if self.openings.set_current(self.view.fen()) {
            self.versions.bump_ui();
        }
    }

    // ========================================================================
    // Async updates
    // ========================================================================

    /// Queue an opening result; applied on the next
    /// [`Self::process_async_updates`]
    pub fn enqueue_opening_update(&mut self, update: OpeningUpdate) {
        if update.fen.is_empty() {
            return;
        }
        self.openings.post(update.fen.clone(), update);
    }

    /// Sender workers use to deliver `(fen, update)` pairs
    pub fn opening_sender(&self) -> crossbeam_channel::Sender<(String, OpeningUpdate)> {
        self.openings.sender()
    }

    /// Merge queued results; true when anything was merged
    pub fn process_async_updates(&mut self) -> bool {
        let report = self.openings.drain();
        if report.touched() {
            debug!("[OPENING] Merged {} results", report.merged);
            self.versions.bump_ui();
        }
        report.touched()
    }

    /// Opening result for the displayed position
    pub fn opening_suggestion(&self) -> Option<&OpeningUpdate> {
        self.openings.visible()
    }

    /// Opening result stored for any position
    pub fn opening_for(&self, fen: &str) -> Option<&OpeningUpdate> {
        self.openings.get(&fen.to_string())
    }

    // ========================================================================
    // Readers
    // ========================================================================

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn position_version(&self) -> u64 {
        self.versions.position()
    }

    pub fn ui_version(&self) -> u64 {
        self.versions.ui()
    }

    /// Piece on the displayed board
    pub fn piece_at(&self, x: u8, y: u8) -> Option<Piece> {
        square_from_xy(x, y).and_then(|sq| self.view.get(&sq))
    }

    /// Two-letter code ("wp", "bk") of the displayed piece
    pub fn piece_code_at(&self, x: u8, y: u8) -> Option<String> {
        self.piece_at(x, y).map(Piece::code)
    }

    /// Side to move on the displayed board
    pub fn turn(&self) -> PieceColor {
        self.view.turn()
    }

    /// Side to move in the live game
    pub fn live_turn(&self) -> PieceColor {
        self.live.turn()
    }

    /// Live position
    pub fn fen(&self) -> String {
        self.live.fen()
    }

    /// Displayed position
    pub fn view_fen(&self) -> String {
        self.view.fen()
    }

    /// Number of moves in the live game
    pub fn current_ply(&self) -> usize {
        self.ledger.len()
    }

    pub fn review_ply(&self) -> usize {
        self.review_ply
    }

    pub fn is_game_over(&self) -> bool {
        self.live.is_game_over()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected(&self) -> Option<BoardPos> {
        self.selection.selected_position
    }

    pub fn legal_targets(&self) -> &[BoardPos] {
        &self.selection.legal_targets
    }

    pub fn pending_promotion(&self) -> Option<&PendingPromotion> {
        self.pending_promotion.as_ref()
    }

    /// Last move up to the displayed ply
    pub fn last_move(&self) -> Option<PlyMove> {
        self.last_move
    }

    pub fn captured(&self) -> &CapturedPieces {
        &self.captured
    }

    pub fn captured_by(&self, color: PieceColor) -> &[PieceKind] {
        self.captured.captured_by(color)
    }

    pub fn captured_grouped(&self, color: PieceColor) -> Vec<Piece> {
        self.captured.grouped(color)
    }

    pub fn captured_differential(&self) -> (Vec<Piece>, Vec<Piece>) {
        self.captured.differential()
    }

    pub fn material_label(&self, color: PieceColor) -> String {
        self.captured.material_label(color)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.ledger.history()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        self.ledger.snapshots()
    }

    pub fn redo_depth(&self) -> usize {
        self.ledger.redo_depth()
    }

    pub fn move_rows(&self) -> Vec<MoveRow> {
        self.ledger.move_rows()
    }

    pub fn move_at_ply(&self, index: usize) -> Option<PlyMove> {
        self.ledger.move_at_ply(index)
    }

    pub fn start_fen(&self) -> &str {
        self.ledger.start_fen()
    }

    /// Re-check the snapshot ledger against a fresh replay
    pub fn verify_ledger(&self) -> GameResult<()> {
        self.ledger.verify::<O>()
    }

    /// Oracle describing the displayed position
    ///
    /// Play mode reads the live oracle: the view is reloaded from a FEN and
    /// carries no repetition history, so only live knows about threefold.
    pub(crate) fn displayed_oracle(&self) -> &O {
        match self.mode {
            Mode::Play => &self.live,
            Mode::Review => &self.view,
        }
    }
}

impl<O: RulesOracle> Default for GameState<O> {
    fn default() -> Self {
        Self::new()
    }
}
