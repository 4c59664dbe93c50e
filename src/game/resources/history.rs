//! Move history and snapshot ledger
//!
//! Maintains the chronological record of applied moves together with one
//! serialized position per ply. This enables:
//!
//! - **Undo/Redo**: truncate the tail, re-apply from the redo stack
//! - **Move Review**: load any ply's position without replaying moves
//! - **Play From Here**: rebase the live game onto a prefix of the history
//! - **Move Table**: paired white/black rows with ply indices for jumping
//!
//! # Invariants
//!
//! - `snapshots.len() == history.len() + 1`
//! - `snapshots[0]` is the start position
//! - `snapshots[i].fen` equals the start position with `history[0..i)`
//!   applied
//!
//! Only [`MoveLedger::append`], [`MoveLedger::truncate_tail`],
//! [`MoveLedger::rebuild_from_prefix`] and [`MoveLedger::reset`] mutate the
//! history, and each of them keeps the invariants.

use tracing::{debug, error};

use crate::game::error::{GameError, GameResult};
use crate::game::oracle::{MoveRecord, RulesOracle};
use crate::game::types::{xy_from_square, BoardPos, PieceColor, PieceKind};

/// One applied ply as recorded by the oracle
pub type HistoryEntry = MoveRecord;

/// Serialized position after a given ply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub ply: usize,
    /// Notation of the move that produced this position; `None` at ply 0
    pub san: Option<String>,
    pub fen: String,
}

/// A history move mapped back into engine coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlyMove {
    pub from: BoardPos,
    pub to: BoardPos,
    pub promotion: Option<PieceKind>,
}

/// One entry of the move table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCell {
    pub san: String,
    /// Ply reached after this move (1-based); jump target for review
    pub ply: usize,
}

/// A full move: white's ply and black's reply, if played
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRow {
    pub move_number: usize,
    pub white: Option<MoveCell>,
    pub black: Option<MoveCell>,
}

/// Ply-indexed move log with one position snapshot per ply
#[derive(Debug, Clone)]
pub struct MoveLedger {
    history: Vec<HistoryEntry>,
    snapshots: Vec<Snapshot>,
    /// Undone moves, most recent last
    redo_stack: Vec<HistoryEntry>,
}

impl MoveLedger {
    /// Empty ledger rooted at `start_fen`
    pub fn new(start_fen: impl Into<String>) -> Self {
        Self {
            history: Vec::new(),
            snapshots: vec![Snapshot {
                ply: 0,
                san: None,
                fen: start_fen.into(),
            }],
            redo_stack: Vec::new(),
        }
    }

    /// Record a freshly applied move and the live position it produced
    pub fn append(&mut self, entry: HistoryEntry, fen_after: String) {
        self.history.push(entry);
        let ply = self.history.len();
        let san = self.history.last().map(|e| e.san.clone());
        self.snapshots.push(Snapshot {
            ply,
            san,
            fen: fen_after,
        });
        debug!("[LEDGER] Appended ply {}", ply);
    }

    /// Drop the last ply and its snapshot
    pub fn truncate_tail(&mut self) -> Option<HistoryEntry> {
        let entry = self.history.pop()?;
        self.snapshots.pop();
        debug!("[LEDGER] Truncated to ply {}", self.history.len());
        Some(entry)
    }

    /// Discard everything and start over from `start_fen`
    pub fn reset(&mut self, start_fen: impl Into<String>) {
        *self = Self::new(start_fen);
    }

    /// Replay `history[0..ply)` through a fresh oracle
    ///
    /// Returns the oracle positioned at `ply` together with a ledger whose
    /// history and snapshots were regenerated move by move. The redo stack
    /// of the new ledger is empty. `self` is left untouched, so a failed
    /// replay cannot corrupt the current game.
    pub fn rebuild_from_prefix<O: RulesOracle>(&self, ply: usize) -> GameResult<(O, MoveLedger)> {
        let ply = ply.min(self.history.len());
        let start_fen = &self.snapshots[0].fen;

        let mut oracle = O::default();
        oracle.load(start_fen)?;

        let mut rebuilt = MoveLedger::new(oracle.fen());
        for (index, entry) in self.history[..ply].iter().enumerate() {
            let Some(record) = oracle.apply(&entry.to_request()) else {
                error!("[LEDGER] Replay diverged at ply {}", index + 1);
                return Err(GameError::ReplayFailed { ply: index + 1 });
            };
            rebuilt.append(record, oracle.fen());
        }

        debug!("[LEDGER] Rebuilt {} plies from start", ply);
        Ok((oracle, rebuilt))
    }

    /// Check both ledger invariants by replaying through a fresh oracle
    pub fn verify<O: RulesOracle>(&self) -> GameResult<()> {
        if self.snapshots.len() != self.history.len() + 1 {
            return Err(GameError::LedgerMismatch {
                history: self.history.len(),
                snapshots: self.snapshots.len(),
            });
        }

        let mut oracle = O::default();
        oracle.load(&self.snapshots[0].fen)?;
        if oracle.fen() != self.snapshots[0].fen {
            return Err(GameError::ReplayFailed { ply: 0 });
        }

        for (index, entry) in self.history.iter().enumerate() {
            let ply = index + 1;
            if oracle.apply(&entry.to_request()).is_none() {
                return Err(GameError::ReplayFailed { ply });
            }
            let snapshot = &self.snapshots[ply];
            if snapshot.ply != ply || snapshot.fen != oracle.fen() {
                return Err(GameError::ReplayFailed { ply });
            }
        }
        Ok(())
    }

    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo_stack.push(entry);
    }

    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo_stack.pop()
    }

    pub fn clear_redo(&mut self) {
        self.redo_stack.clear();
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Number of plies played
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Snapshot at `ply`, clamped to the recorded range
    pub fn snapshot_clamped(&self, ply: usize) -> &Snapshot {
        let ply = ply.min(self.history.len());
        &self.snapshots[ply]
    }

    pub fn start_fen(&self) -> &str {
        &self.snapshots[0].fen
    }

    /// Map a history index back to engine coordinates
    ///
    /// Returns `None` for out-of-range indices.
    pub fn move_at_ply(&self, index: usize) -> Option<PlyMove> {
        let entry = self.history.get(index)?;
        Some(PlyMove {
            from: xy_from_square(&entry.from)?,
            to: xy_from_square(&entry.to)?,
            promotion: entry.promotion,
        })
    }

    /// Move table rows: move number with white and black cells
    ///
    /// Numbering continues from the start position's full-move counter. A
    /// start with Black to move opens with a row whose white cell is empty.
    pub fn move_rows(&self) -> Vec<MoveRow> {
        let first_number = self.start_move_number();
        let cell = |entry: &HistoryEntry, ply: usize| MoveCell {
            san: entry.san.clone(),
            ply,
        };

        let mut rows = Vec::with_capacity(self.history.len() / 2 + 1);
        let mut rest = self.history.as_slice();
        let mut ply = 1;
        if let Some((first, tail)) = rest.split_first() {
            if first.color == PieceColor::Black {
                rows.push(MoveRow {
                    move_number: first_number,
                    white: None,
                    black: Some(cell(first, ply)),
                });
                rest = tail;
                ply += 1;
            }
        }

        for pair in rest.chunks(2) {
            rows.push(MoveRow {
                move_number: first_number + rows.len(),
                white: pair.first().map(|e| cell(e, ply)),
                black: pair.get(1).map(|e| cell(e, ply + 1)),
            });
            ply += 2;
        }
        rows
    }

    /// Full-move number of the start position, 1 when the FEN omits it
    fn start_move_number(&self) -> usize {
        self.start_fen()
            .split_whitespace()
            .nth(5)
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1)
    }
}
