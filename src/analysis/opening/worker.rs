//! Opening suggestion worker
//!
//! Runs on its own thread and owns everything the lookup needs: the
//! upstream [`OpeningSource`], a [`RateLimiter`], and a cache of successful
//! answers keyed by position. Requests arrive on a channel; whenever the
//! worker gets to pick up a job it skips to the newest queued request, so
//! at most one lookup is in flight and only the latest position waits.
//!
//! Upstream failures never escape as errors. They become an
//! [`OpeningUpdate`] with a typed [`OpeningStatus`] so the engine always
//! has something to show.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::limiter::{
    parse_body_retry_after, parse_retry_after_header, parse_text_retry_after, Clock, RateLimiter,
};
use super::{MoveSuggestion, OpeningRequest, OpeningStatus, OpeningUpdate};

/// Body of an upstream response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    fn retry_after_ms(&self) -> u64 {
        match self {
            ResponseBody::Json(value) => parse_body_retry_after(value),
            ResponseBody::Text(text) => parse_text_retry_after(text),
        }
    }

    /// Human-readable failure message, if the body carries one
    fn message(&self) -> Option<String> {
        match self {
            ResponseBody::Text(text) => Some(text.clone()),
            ResponseBody::Json(Value::String(text)) => Some(text.clone()),
            ResponseBody::Json(Value::Object(map)) => ["error", "message"]
                .iter()
                .filter_map(|field| map.get(*field))
                .find_map(Value::as_str)
                .map(str::to_string),
            ResponseBody::Json(_) => None,
        }
    }
}

/// Raw upstream answer before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct SourceResponse {
    pub status: u16,
    /// Raw `retry-after` header
    pub retry_after: Option<String>,
    pub body: ResponseBody,
}

/// The request never produced a response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Upstream opening explorer
pub trait OpeningSource: Send {
    fn fetch(&mut self, fen: &str) -> Result<SourceResponse, SourceError>;
}

#[derive(Debug, Default, Deserialize)]
struct ExplorerBody {
    #[serde(default)]
    moves: Vec<ExplorerMove>,
    #[serde(default)]
    opening: Option<ExplorerOpening>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExplorerMove {
    uci: String,
    san: String,
    white: u64,
    draws: u64,
    black: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExplorerOpening {
    name: String,
}

/// Turn upstream move statistics into ranked suggestions
///
/// Ordered by games played, then by score from White's point of view.
/// Moves with no games score negative infinity.
pub fn normalize_moves(body: &Value) -> (String, Vec<MoveSuggestion>) {
    let parsed: ExplorerBody = serde_json::from_value(body.clone()).unwrap_or_default();

    let mut suggestions: Vec<MoveSuggestion> = parsed
        .moves
        .into_iter()
        .map(|m| {
            let total = m.white.saturating_add(m.draws).saturating_add(m.black);
            let score = if total == 0 {
                f64::NEG_INFINITY
            } else {
                (m.white as f64 + 0.5 * m.draws as f64) / total as f64
            };
            MoveSuggestion {
                uci: m.uci,
                san: m.san,
                white: m.white,
                draws: m.draws,
                black: m.black,
                total,
                score,
            }
        })
        .collect();

    suggestions.sort_by(|a, b| b.total.cmp(&a.total).then(b.score.total_cmp(&a.score)));

    let name = parsed.opening.map(|o| o.name).unwrap_or_default();
    (name, suggestions)
}

pub struct OpeningWorker<S, C> {
    source: S,
    clock: C,
    limiter: RateLimiter,
    cache: HashMap<String, OpeningUpdate>,
}

impl<S: OpeningSource, C: Clock> OpeningWorker<S, C> {
    pub fn new(source: S, clock: C, min_request_gap_ms: u64) -> Self {
        Self {
            source,
            clock,
            limiter: RateLimiter::new(min_request_gap_ms),
            cache: HashMap::new(),
        }
    }

    /// Answer one request, from cache when possible
    pub fn handle(&mut self, request: &OpeningRequest) -> OpeningUpdate {
        if let Some(hit) = self.cache.get(&request.fen) {
            debug!("[OPENING] Cache hit for request {}", request.request_id);
            let mut update = hit.clone();
            update.cached = true;
            update.request_id = request.request_id;
            return update;
        }

        let update = self.fetch_suggestions(request);
        if update.status == OpeningStatus::Ok {
            self.cache.insert(request.fen.clone(), update.clone());
        }
        update
    }

    /// Serve requests until either channel closes
    ///
    /// Jobs queued while a lookup was running collapse to the newest one.
    pub fn run(mut self, requests: Receiver<OpeningRequest>, results: Sender<(String, OpeningUpdate)>) {
        while let Ok(mut job) = requests.recv() {
            for newer in requests.try_iter() {
                debug!("[OPENING] Superseded request {}", job.request_id);
                job = newer;
            }
            let update = self.handle(&job);
            if results.send((job.fen, update)).is_err() {
                break;
            }
        }
        debug!("[OPENING] Worker stopped");
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn fetch_suggestions(&mut self, request: &OpeningRequest) -> OpeningUpdate {
        let wait = self.limiter.wait_before_send(self.clock.now_ms());
        if wait > 0 {
            debug!("[OPENING] Waiting {}ms before next lookup", wait);
            self.clock.sleep_ms(wait);
        }

        let response = match self.source.fetch(&request.fen) {
            Ok(response) => response,
            Err(e) => {
                warn!("[OPENING] Lookup failed: {}", e);
                return self.update(request, OpeningStatus::NetworkError, Some(e.to_string()));
            }
        };

        let now = self.clock.now_ms();
        self.limiter.mark_sent(now);

        let header_ms = response
            .retry_after
            .as_deref()
            .map(parse_retry_after_header)
            .unwrap_or(0);
        let retry_after_ms = header_ms.max(response.body.retry_after_ms());
        self.limiter.note_retry_after(now, retry_after_ms);

        match response.status {
            200..=299 => {
                let body = match &response.body {
                    ResponseBody::Json(value) => value.clone(),
                    ResponseBody::Text(_) => Value::Null,
                };
                let (opening_name, suggestions) = normalize_moves(&body);
                let mut update = self.update(request, OpeningStatus::Ok, None);
                update.opening_name = opening_name;
                update.suggestions = suggestions;
                update
            }
            429 => {
                if retry_after_ms == 0 {
                    self.limiter.back_off(now);
                }
                warn!(
                    "[OPENING] Rate limited until {}",
                    self.limiter.next_allowed_at_ms()
                );
                let message = response.body.message().unwrap_or_else(|| "rate limited".into());
                let mut update = self.update(request, OpeningStatus::RateLimited, Some(message));
                update.retry_at_ms = Some(self.limiter.next_allowed_at_ms());
                update
            }
            code => {
                warn!("[OPENING] Upstream answered HTTP {}", code);
                let message = response.body.message().unwrap_or_else(|| "request failed".into());
                self.update(request, OpeningStatus::Http(code), Some(message))
            }
        }
    }

    fn update(
        &self,
        request: &OpeningRequest,
        status: OpeningStatus,
        message: Option<String>,
    ) -> OpeningUpdate {
        OpeningUpdate {
            request_id: request.request_id,
            fen: request.fen.clone(),
            status,
            cached: false,
            opening_name: String::new(),
            suggestions: Vec::new(),
            message,
            retry_at_ms: None,
            next_allowed_at_ms: self.limiter.next_allowed_at_ms(),
            received_at_ms: self.clock.now_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Manual clock: sleeping just advances time
    #[derive(Clone, Default)]
    struct ManualClock {
        now: Arc<Mutex<u64>>,
        slept: Arc<Mutex<Vec<u64>>>,
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            *self.now.lock().unwrap()
        }

        fn sleep_ms(&self, ms: u64) {
            *self.now.lock().unwrap() += ms;
            self.slept.lock().unwrap().push(ms);
        }
    }

    /// Replays canned responses and counts fetches
    struct ScriptedSource {
        responses: VecDeque<Result<SourceResponse, SourceError>>,
        fetched: Arc<Mutex<Vec<String>>>,
    }

    impl OpeningSource for ScriptedSource {
        fn fetch(&mut self, fen: &str) -> Result<SourceResponse, SourceError> {
            self.fetched.lock().unwrap().push(fen.to_string());
            self.responses
                .pop_front()
                .unwrap_or_else(|| Err(SourceError::Network("script exhausted".into())))
        }
    }

    fn ok(body: Value) -> Result<SourceResponse, SourceError> {
        Ok(SourceResponse {
            status: 200,
            retry_after: None,
            body: ResponseBody::Json(body),
        })
    }

    fn worker(
        responses: Vec<Result<SourceResponse, SourceError>>,
    ) -> (OpeningWorker<ScriptedSource, ManualClock>, ManualClock, Arc<Mutex<Vec<String>>>) {
        let clock = ManualClock::default();
        *clock.now.lock().unwrap() = 1_000_000;
        let fetched = Arc::new(Mutex::new(Vec::new()));
        let source = ScriptedSource {
            responses: responses.into(),
            fetched: fetched.clone(),
        };
        (OpeningWorker::new(source, clock.clone(), 5000), clock, fetched)
    }

    fn request(id: u64, fen: &str) -> OpeningRequest {
        OpeningRequest {
            request_id: id,
            fen: fen.to_string(),
        }
    }

    // ========================================================================
    // Normalization
    // ========================================================================

    #[test]
    fn test_normalize_sorts_by_total_then_score() {
        let body = json!({
            "opening": { "name": "King's Pawn" },
            "moves": [
                { "uci": "d7d5", "san": "d5", "white": 10, "draws": 0, "black": 10 },
                { "uci": "e7e5", "san": "e5", "white": 30, "draws": 10, "black": 20 },
                { "uci": "c7c5", "san": "c5", "white": 5, "draws": 5, "black": 10 },
                { "uci": "a7a6", "san": "a6" }
            ]
        });
        let (name, moves) = normalize_moves(&body);
        assert_eq!(name, "King's Pawn");
        let sans: Vec<&str> = moves.iter().map(|m| m.san.as_str()).collect();
        // d5 and c5 both have 20 games; d5 scores 0.5, c5 scores 0.375
        assert_eq!(sans, vec!["e5", "d5", "c5", "a6"]);
        assert_eq!(moves[0].total, 60);
        assert!((moves[0].score - 35.0 / 60.0).abs() < 1e-9);
        assert_eq!(moves[3].score, f64::NEG_INFINITY);
    }

    #[test]
    fn test_normalize_tolerates_missing_moves() {
        let (name, moves) = normalize_moves(&json!({ "unexpected": true }));
        assert!(name.is_empty());
        assert!(moves.is_empty());
        assert!(normalize_moves(&Value::Null).1.is_empty());
    }

    // ========================================================================
    // Lookup flow
    // ========================================================================

    #[test]
    fn test_success_is_cached() {
        //! A second request for the same position never reaches the source
        let (mut worker, _clock, fetched) = worker(vec![ok(json!({ "moves": [] }))]);

        let first = worker.handle(&request(1, "fen-a"));
        assert_eq!(first.status, OpeningStatus::Ok);
        assert!(!first.cached);

        let second = worker.handle(&request(2, "fen-a"));
        assert!(second.cached);
        assert_eq!(second.request_id, 2);
        assert_eq!(fetched.lock().unwrap().len(), 1);
        assert_eq!(worker.cache_len(), 1);
    }

    #[test]
    fn test_requests_are_spaced_by_min_gap() {
        let (mut worker, clock, _) = worker(vec![ok(json!({})), ok(json!({}))]);
        worker.handle(&request(1, "fen-a"));
        worker.handle(&request(2, "fen-b"));
        assert_eq!(*clock.slept.lock().unwrap(), vec![5000]);
    }

    #[test]
    fn test_rate_limit_without_hint_backs_off_min_gap() {
        let (mut worker, clock, _) = worker(vec![Ok(SourceResponse {
            status: 429,
            retry_after: None,
            body: ResponseBody::Text(String::new()),
        })]);

        let update = worker.handle(&request(1, "fen-a"));
        let now = clock.now_ms();
        assert_eq!(update.status, OpeningStatus::RateLimited);
        assert_eq!(update.retry_at_ms, Some(now + 5000));
        assert_eq!(worker.cache_len(), 0, "failures are not cached");
    }

    #[test]
    fn test_rate_limit_uses_largest_hint() {
        //! Header says 10s, body says 30s: the body wins
        let (mut worker, clock, _) = worker(vec![Ok(SourceResponse {
            status: 429,
            retry_after: Some("10".into()),
            body: ResponseBody::Json(json!({ "error": "Try again in 30 seconds" })),
        })]);

        let update = worker.handle(&request(1, "fen-a"));
        assert_eq!(update.retry_at_ms, Some(clock.now_ms() + 30_000));
        assert_eq!(update.message.as_deref(), Some("Try again in 30 seconds"));
        assert_eq!(worker.limiter().wait_before_send(clock.now_ms()), 30_000);
    }

    #[test]
    fn test_huge_retry_hint_keeps_worker_alive() {
        //! An absurd header hint pins the deadline; the worker keeps answering
        let (mut worker, _clock, _) = worker(vec![Ok(SourceResponse {
            status: 429,
            retry_after: Some("1e300".into()),
            body: ResponseBody::Text(String::new()),
        })]);

        let update = worker.handle(&request(1, "fen-a"));
        assert_eq!(update.status, OpeningStatus::RateLimited);
        assert_eq!(update.retry_at_ms, Some(u64::MAX));
        assert_eq!(worker.limiter().next_allowed_at_ms(), u64::MAX);
    }

    #[test]
    fn test_http_and_network_failures() {
        let (mut worker, _, _) = worker(vec![
            Ok(SourceResponse {
                status: 503,
                retry_after: None,
                body: ResponseBody::Json(Value::Null),
            }),
            Err(SourceError::Network("connection refused".into())),
        ]);

        let http = worker.handle(&request(1, "fen-a"));
        assert_eq!(http.status, OpeningStatus::Http(503));
        assert_eq!(http.status.to_string(), "http_503");
        assert_eq!(http.message.as_deref(), Some("request failed"));

        let network = worker.handle(&request(2, "fen-b"));
        assert_eq!(network.status, OpeningStatus::NetworkError);
        assert!(network.message.unwrap_or_default().contains("connection refused"));
    }

    #[test]
    fn test_run_collapses_queued_requests() {
        //! Only the newest queued position is looked up
        let (worker, _, fetched) = worker(vec![ok(json!({}))]);
        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        let (res_tx, res_rx) = crossbeam_channel::unbounded();

        req_tx.send(request(1, "fen-a")).unwrap();
        req_tx.send(request(2, "fen-b")).unwrap();
        req_tx.send(request(3, "fen-c")).unwrap();
        drop(req_tx);
        worker.run(req_rx, res_tx);

        let results: Vec<(String, OpeningUpdate)> = res_rx.try_iter().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "fen-c");
        assert_eq!(results[0].1.request_id, 3);
        assert_eq!(*fetched.lock().unwrap(), vec!["fen-c".to_string()]);
    }
}
