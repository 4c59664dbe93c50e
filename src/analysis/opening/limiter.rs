//! Request pacing for the opening explorer
//!
//! Two gates decide when the next request may leave:
//! - a fixed minimum gap since the last request that reached the server
//! - a policy deadline pushed forward by server retry hints
//!
//! The worker sleeps for whichever is longer. Time is read through a
//! [`Clock`] so tests can run the limiter without real sleeps.

use std::time::Duration;

use serde_json::Value;
use web_time::{SystemTime, UNIX_EPOCH};

/// Default spacing between requests, in milliseconds
pub const MIN_REQUEST_GAP_MS: u64 = 5000;

/// Wall-clock source used by the opening worker
pub trait Clock: Send {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;

    fn sleep_ms(&self, ms: u64);
}

/// Real time via `web-time`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Owned rate-limit state, one per worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiter {
    min_gap_ms: u64,
    last_sent_at_ms: u64,
    next_allowed_at_ms: u64,
}

impl RateLimiter {
    pub fn new(min_gap_ms: u64) -> Self {
        Self {
            min_gap_ms,
            last_sent_at_ms: 0,
            next_allowed_at_ms: 0,
        }
    }

    /// How long to wait at `now_ms` before sending
    pub fn wait_before_send(&self, now_ms: u64) -> u64 {
        let since_last = now_ms.saturating_sub(self.last_sent_at_ms);
        let wait_for_gap = self.min_gap_ms.saturating_sub(since_last);
        let wait_for_policy = self.next_allowed_at_ms.saturating_sub(now_ms);
        wait_for_gap.max(wait_for_policy)
    }

    /// A response came back; network failures do not count as sends
    pub fn mark_sent(&mut self, now_ms: u64) {
        self.last_sent_at_ms = now_ms;
    }

    /// Push the policy deadline out by a server hint
    pub fn note_retry_after(&mut self, now_ms: u64, retry_after_ms: u64) {
        if retry_after_ms > 0 {
            self.next_allowed_at_ms = self.next_allowed_at_ms.max(now_ms.saturating_add(retry_after_ms));
        }
    }

    /// Rate limited without any hint: back off by the minimum gap
    pub fn back_off(&mut self, now_ms: u64) {
        self.next_allowed_at_ms = self.next_allowed_at_ms.max(now_ms.saturating_add(self.min_gap_ms));
    }

    pub fn next_allowed_at_ms(&self) -> u64 {
        self.next_allowed_at_ms
    }

    pub fn last_sent_at_ms(&self) -> u64 {
        self.last_sent_at_ms
    }

    pub fn min_gap_ms(&self) -> u64 {
        self.min_gap_ms
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MIN_REQUEST_GAP_MS)
    }
}

/// `retry-after` header value in milliseconds; 0 when absent or unusable
///
/// Only the delay-seconds form is understood.
pub fn parse_retry_after_header(value: &str) -> u64 {
    match value.trim().parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds > 0.0 => seconds_to_ms(seconds),
        _ => 0,
    }
}

/// Retry hint carried by a response body, in milliseconds
///
/// JSON objects may carry `wait`, `retryAfter` or `retry_after` (seconds),
/// or an `error`/`message` text such as "try again in 30 seconds". Plain
/// text bodies are searched for the same phrase.
pub fn parse_body_retry_after(body: &Value) -> u64 {
    match body {
        Value::Null => 0,
        Value::Object(map) => {
            let wait = ["wait", "retryAfter", "retry_after"]
                .iter()
                .filter_map(|field| map.get(*field))
                .find_map(positive_seconds);
            if let Some(seconds) = wait {
                return seconds_to_ms(seconds);
            }
            let message = ["error", "message"]
                .iter()
                .filter_map(|field| map.get(*field))
                .find_map(Value::as_str)
                .unwrap_or_default();
            seconds_hint(message).map(seconds_to_ms).unwrap_or(0)
        }
        Value::String(text) => seconds_hint(text).map(seconds_to_ms).unwrap_or(0),
        other => seconds_hint(&other.to_string()).map(seconds_to_ms).unwrap_or(0),
    }
}

/// Same as [`parse_body_retry_after`] for a non-JSON body
pub fn parse_text_retry_after(text: &str) -> u64 {
    seconds_hint(text).map(seconds_to_ms).unwrap_or(0)
}

fn positive_seconds(value: &Value) -> Option<f64> {
    let seconds = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (seconds.is_finite() && seconds > 0.0).then_some(seconds)
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).ceil() as u64
}

/// First "<number> s" phrase in `text` ("5s", "2.5 sec", "30 seconds")
fn seconds_hint(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        let number = &text[start..i];

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j < bytes.len() && bytes[j].eq_ignore_ascii_case(&b's') {
            return number.parse().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_request_is_not_delayed() {
        let limiter = RateLimiter::new(5000);
        assert_eq!(limiter.wait_before_send(1_000_000), 0);
    }

    #[test]
    fn test_minimum_gap_between_sends() {
        let mut limiter = RateLimiter::new(5000);
        limiter.mark_sent(10_000);
        assert_eq!(limiter.wait_before_send(12_000), 3000);
        assert_eq!(limiter.wait_before_send(15_000), 0);
    }

    #[test]
    fn test_policy_deadline_wins_when_longer() {
        //! Wait is the larger of the gap and the server deadline
        let mut limiter = RateLimiter::new(5000);
        limiter.mark_sent(10_000);
        limiter.note_retry_after(10_000, 60_000);
        assert_eq!(limiter.next_allowed_at_ms(), 70_000);
        assert_eq!(limiter.wait_before_send(12_000), 58_000);
    }

    #[test]
    fn test_deadline_never_moves_backwards() {
        let mut limiter = RateLimiter::new(5000);
        limiter.note_retry_after(0, 30_000);
        limiter.note_retry_after(1000, 2000);
        assert_eq!(limiter.next_allowed_at_ms(), 30_000);

        limiter.back_off(1000);
        assert_eq!(limiter.next_allowed_at_ms(), 30_000);
    }

    #[test]
    fn test_back_off_uses_min_gap() {
        let mut limiter = RateLimiter::new(5000);
        limiter.back_off(100);
        assert_eq!(limiter.next_allowed_at_ms(), 5100);
    }

    #[test]
    fn test_huge_hints_saturate() {
        //! An absurd server hint pins the deadline instead of overflowing
        let mut limiter = RateLimiter::new(u64::MAX);
        limiter.note_retry_after(10_000, parse_retry_after_header("1e300"));
        assert_eq!(limiter.next_allowed_at_ms(), u64::MAX);

        limiter.back_off(10_000);
        assert_eq!(limiter.next_allowed_at_ms(), u64::MAX);
        assert_eq!(limiter.wait_before_send(10_000), u64::MAX - 10_000);
    }

    #[test]
    fn test_header_parsing() {
        assert_eq!(parse_retry_after_header("30"), 30_000);
        assert_eq!(parse_retry_after_header(" 1.5 "), 1500);
        assert_eq!(parse_retry_after_header("0"), 0);
        assert_eq!(parse_retry_after_header("-4"), 0);
        assert_eq!(parse_retry_after_header("Wed, 21 Oct 2015 07:28:00 GMT"), 0);
    }

    #[test]
    fn test_body_wait_fields() {
        assert_eq!(parse_body_retry_after(&json!({ "wait": 12 })), 12_000);
        assert_eq!(parse_body_retry_after(&json!({ "retryAfter": "2" })), 2000);
        assert_eq!(parse_body_retry_after(&json!({ "retry_after": 0.25 })), 250);
        assert_eq!(parse_body_retry_after(&json!({ "wait": 0, "retry_after": 3 })), 3000);
    }

    #[test]
    fn test_body_message_phrases() {
        //! Seconds mentioned in an error message count as a hint
        assert_eq!(
            parse_body_retry_after(&json!({ "error": "Too many requests. Try again in 60 seconds." })),
            60_000
        );
        assert_eq!(parse_body_retry_after(&json!({ "message": "wait 2.5 sec" })), 2500);
        assert_eq!(parse_body_retry_after(&json!({ "error": "slow down" })), 0);
        assert_eq!(parse_body_retry_after(&json!("retry in 7s")), 7000);
        assert_eq!(parse_body_retry_after(&Value::Null), 0);
    }

    #[test]
    fn test_text_bodies() {
        assert_eq!(parse_text_retry_after("Rate limited, 10 Seconds"), 10_000);
        assert_eq!(parse_text_retry_after("error 429 then 3 s"), 3000);
        assert_eq!(parse_text_retry_after("no numbers"), 0);
    }
}
