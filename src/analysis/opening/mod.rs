//! Opening suggestions
//!
//! The driver watches the *view* position and asks a background
//! [`OpeningWorker`] for explorer statistics whenever it changes. Answers
//! come back as [`OpeningUpdate`]s keyed by position and are posted into
//! the engine's opening mailbox, where they stay for the rest of the game.
//!
//! # Statuses
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `ok` | Suggestions (possibly none) for the position |
//! | `rate_limited` | Explorer asked us to slow down; see `retry_at_ms` |
//! | `network_error` | No response at all |
//! | `http_<code>` | Any other non-success response |

pub mod limiter;
#[cfg(feature = "lichess")]
pub mod lichess;
pub mod worker;

pub use limiter::{Clock, RateLimiter, SystemClock, MIN_REQUEST_GAP_MS};
#[cfg(feature = "lichess")]
pub use lichess::LichessExplorer;
pub use worker::{OpeningSource, OpeningWorker, ResponseBody, SourceError, SourceResponse};

use std::fmt;

use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, warn};

use crate::game::oracle::RulesOracle;
use crate::game::state::GameState;

/// Typed outcome of a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpeningStatus {
    Ok,
    RateLimited,
    NetworkError,
    Http(u16),
}

impl fmt::Display for OpeningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpeningStatus::Ok => write!(f, "ok"),
            OpeningStatus::RateLimited => write!(f, "rate_limited"),
            OpeningStatus::NetworkError => write!(f, "network_error"),
            OpeningStatus::Http(code) => write!(f, "http_{code}"),
        }
    }
}

/// One candidate move with its game statistics
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSuggestion {
    pub uci: String,
    pub san: String,
    pub white: u64,
    pub draws: u64,
    pub black: u64,
    pub total: u64,
    /// White's expected score, draws counting half
    pub score: f64,
}

impl MoveSuggestion {
    /// Short label for status lines
    pub fn label(&self) -> &str {
        if !self.san.is_empty() {
            &self.san
        } else if !self.uci.is_empty() {
            &self.uci
        } else {
            "?"
        }
    }
}

/// Lookup result for one position
#[derive(Debug, Clone, PartialEq)]
pub struct OpeningUpdate {
    pub request_id: u64,
    pub fen: String,
    pub status: OpeningStatus,
    /// Served from the worker's cache
    pub cached: bool,
    pub opening_name: String,
    pub suggestions: Vec<MoveSuggestion>,
    pub message: Option<String>,
    /// Earliest time a new lookup may go out (rate-limited only)
    pub retry_at_ms: Option<u64>,
    pub next_allowed_at_ms: u64,
    pub received_at_ms: u64,
}

impl OpeningUpdate {
    /// Successful answer with the given suggestions
    pub fn ok(fen: impl Into<String>, suggestions: Vec<MoveSuggestion>) -> Self {
        Self {
            request_id: 0,
            fen: fen.into(),
            status: OpeningStatus::Ok,
            cached: false,
            opening_name: String::new(),
            suggestions,
            message: None,
            retry_at_ms: None,
            next_allowed_at_ms: 0,
            received_at_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningRequest {
    pub request_id: u64,
    pub fen: String,
}

/// Main-thread side of the opening lookup
///
/// A spawned worker is detached. Dropping the driver closes the request
/// channel and the worker exits after its current lookup, which may be
/// sleeping out a rate-limit deadline.
pub struct OpeningDriver {
    requests: Sender<OpeningRequest>,
    last_requested_fen: String,
    request_seq: u64,
}

impl OpeningDriver {
    /// Driver feeding an externally owned request channel
    pub fn new(requests: Sender<OpeningRequest>) -> Self {
        Self {
            requests,
            last_requested_fen: String::new(),
            request_seq: 0,
        }
    }

    /// Start `worker` on its own thread, answering into `results`
    pub fn spawn<S, C>(
        worker: OpeningWorker<S, C>,
        results: Sender<(String, OpeningUpdate)>,
    ) -> std::io::Result<Self>
    where
        S: OpeningSource + 'static,
        C: Clock + 'static,
    {
        let (requests, inbox) = unbounded();
        std::thread::Builder::new()
            .name("opening-worker".into())
            .spawn(move || worker.run(inbox, results))?;
        Ok(Self::new(requests))
    }

    /// Start a worker backed by the Lichess explorer
    #[cfg(feature = "lichess")]
    pub fn spawn_lichess(
        settings: &crate::core::settings::OpeningSettings,
        results: Sender<(String, OpeningUpdate)>,
    ) -> std::io::Result<Self> {
        let source = LichessExplorer::new(settings.endpoint.clone(), settings.speeds.clone())
            .map_err(std::io::Error::other)?;
        let worker = OpeningWorker::new(source, SystemClock, settings.min_request_gap_ms);
        Self::spawn(worker, results)
    }

    /// Ask for the game's view position if it changed since the last ask
    pub fn request_if_needed<O: RulesOracle>(&mut self, game: &GameState<O>) -> bool {
        self.request(&game.view_fen())
    }

    /// Ask for `fen` unless it was the last position requested
    pub fn request(&mut self, fen: &str) -> bool {
        if fen.is_empty() || fen == self.last_requested_fen {
            return false;
        }
        self.last_requested_fen = fen.to_string();
        self.request_seq += 1;

        debug!("[OPENING] Request {} queued", self.request_seq);
        let request = OpeningRequest {
            request_id: self.request_seq,
            fen: fen.to_string(),
        };
        if self.requests.send(request).is_err() {
            warn!("[OPENING] Worker is gone; request dropped");
            return false;
        }
        true
    }

    pub fn request_seq(&self) -> u64 {
        self.request_seq
    }
}
