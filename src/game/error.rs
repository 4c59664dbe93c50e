//! Error types for game module
//!
//! Every user-facing rejection (wrong mode, illegal move, nothing to undo)
//! is reported through [`GameError`] and always leaves engine state exactly
//! as it was. The ledger variants signal programming errors: the snapshot
//! ledger no longer agrees with the move history.

use crate::game::types::Mode;

/// Errors that can occur in game logic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Operation not available in the current mode
    #[error("Operation requires {expected} mode (currently {actual})")]
    WrongMode { expected: Mode, actual: Mode },

    /// A promotion choice is outstanding
    #[error("A pawn promotion is pending")]
    PromotionPending,

    /// The live game has ended
    #[error("The game is over")]
    GameOver,

    /// Move attempted without a selected piece
    #[error("No piece is selected")]
    NothingSelected,

    /// The oracle rejected the move
    #[error("Illegal move: {from} to {to}")]
    IllegalMove { from: String, to: String },

    /// Promotion finished or cancelled while none was pending
    #[error("No pawn promotion is pending")]
    NoPromotionPending,

    /// Promotion requested with a piece a pawn cannot become
    #[error("Cannot promote to '{kind}'")]
    InvalidPromotionPiece { kind: char },

    /// Coordinates or algebraic square outside the board
    #[error("Invalid square: {square}")]
    InvalidSquare { square: String },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialized position could not be loaded
    #[error("Invalid position '{fen}': {message}")]
    InvalidPosition { fen: String, message: String },

    /// Snapshot ledger length disagrees with the move history
    #[error("Ledger mismatch: {history} moves but {snapshots} snapshots")]
    LedgerMismatch { history: usize, snapshots: usize },

    /// Replaying the recorded history diverged at the given ply
    #[error("History replay failed at ply {ply}")]
    ReplayFailed { ply: usize },
}

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;
