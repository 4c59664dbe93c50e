//! Background position evaluation
//!
//! The evaluation collaborator is a stand-in: a worker thread that answers
//! every request with an arbitrary centipawn score. What matters is the
//! plumbing around it. Each dispatch gets a fresh generation number and
//! only the answer for the newest generation is ever shown; answers for
//! superseded generations are discarded when the mailbox is drained.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use rand::Rng;
use tracing::{debug, trace};

use crate::analysis::mailbox::{KeyedMailbox, Retention};
use crate::game::oracle::RulesOracle;
use crate::game::state::GameState;
use crate::game::types::PieceColor;

/// What the worker gets to look at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSummary {
    pub fen: String,
    pub side_to_move: PieceColor,
    pub ply: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub generation: u64,
    pub summary: PositionSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Centipawns from White's point of view
    pub cp: i32,
    pub best_move: Option<String>,
    pub depth: u32,
}

/// Main-thread side of the evaluation worker
pub struct EvalDriver {
    requests: Option<Sender<AnalysisRequest>>,
    mailbox: KeyedMailbox<u64, Evaluation>,
    generation: u64,
    last_position_version: Option<u64>,
    worker: Option<JoinHandle<()>>,
}

impl EvalDriver {
    /// Driver feeding an externally owned request channel
    pub fn new(requests: Sender<AnalysisRequest>) -> Self {
        Self {
            requests: Some(requests),
            mailbox: KeyedMailbox::new(Retention::CurrentOnly),
            generation: 0,
            last_position_version: None,
            worker: None,
        }
    }

    /// Driver with the stub worker running on its own thread
    pub fn spawn_stub(reply_delay: Duration) -> std::io::Result<Self> {
        let (requests, inbox) = unbounded();
        let mut driver = Self::new(requests);
        let handle = spawn_stub_worker(inbox, driver.response_sender(), reply_delay)?;
        driver.worker = Some(handle);
        Ok(driver)
    }

    /// Where workers post `(generation, evaluation)` answers
    pub fn response_sender(&self) -> Sender<(u64, Evaluation)> {
        self.mailbox.sender()
    }

    /// Dispatch when the live position changed since the last dispatch
    pub fn analyze_if_needed<O: RulesOracle>(&mut self, game: &GameState<O>) -> bool {
        let version = game.position_version();
        if self.last_position_version == Some(version) {
            return false;
        }
        self.last_position_version = Some(version);

        self.dispatch(PositionSummary {
            fen: game.fen(),
            side_to_move: game.live_turn(),
            ply: game.current_ply(),
        });
        true
    }

    /// Send a request under a new generation; returns that generation
    pub fn dispatch(&mut self, summary: PositionSummary) -> u64 {
        self.generation += 1;
        self.mailbox.set_current(self.generation);
        debug!("[ANALYSIS] Dispatch generation {}", self.generation);

        let request = AnalysisRequest {
            generation: self.generation,
            summary,
        };
        if let Some(requests) = &self.requests {
            if requests.send(request).is_err() {
                debug!("[ANALYSIS] Worker is gone; request dropped");
            }
        }
        self.generation
    }

    /// Merge answers; true when the shown evaluation changed
    pub fn poll(&mut self) -> bool {
        let report = self.mailbox.drain();
        if report.discarded > 0 {
            trace!("[ANALYSIS] Dropped {} stale evaluations", report.discarded);
        }
        report.visibility_changed
    }

    /// Evaluation for the newest generation, once it arrived
    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.mailbox.visible()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for EvalDriver {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

/// Run the stub evaluator until `requests` closes or `replies` goes away
pub fn spawn_stub_worker(
    requests: Receiver<AnalysisRequest>,
    replies: Sender<(u64, Evaluation)>,
    reply_delay: Duration,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("analysis-worker".into())
        .spawn(move || {
            let mut rng = rand::rng();
            for request in requests.iter() {
                if !reply_delay.is_zero() {
                    std::thread::sleep(reply_delay);
                }
                let evaluation = stub_evaluate(&request.summary, &mut rng);
                if replies.send((request.generation, evaluation)).is_err() {
                    break;
                }
            }
        })
}

fn stub_evaluate(summary: &PositionSummary, rng: &mut impl Rng) -> Evaluation {
    let tempo = match summary.side_to_move {
        PieceColor::White => 15,
        PieceColor::Black => -15,
    };
    Evaluation {
        cp: tempo + rng.random_range(-60..=60),
        best_move: None,
        depth: 1,
    }
}
