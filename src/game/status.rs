//! Status and debug text
//!
//! The status line describes the *displayed* position, so in Review it
//! reports on the scrubbed ply and carries a `Review n/N` tag. In Play it
//! reads the live oracle, which alone holds the repetition history. The debug
//! line is a compact one-liner for overlays and logs.

use crate::game::oracle::RulesOracle;
use crate::game::state::GameState;
use crate::game::types::Mode;
use crate::analysis::opening::OpeningStatus;

impl<O: RulesOracle> GameState<O> {
    /// Human-readable state of the displayed position
    ///
    /// Examples: `"White to move"`, `"Black to move - Check"`,
    /// `"Checkmate - Review 4/9"`.
    pub fn status_text(&self) -> String {
        let oracle = self.displayed_oracle();
        let side = oracle.turn().name();

        let base = if oracle.is_checkmate() {
            "Checkmate".to_string()
        } else if oracle.is_stalemate() {
            "Stalemate".to_string()
        } else if oracle.is_draw() {
            "Draw".to_string()
        } else if oracle.is_in_check() {
            format!("{side} to move - Check")
        } else {
            format!("{side} to move")
        };

        match self.mode() {
            Mode::Play => base,
            Mode::Review => format!(
                "{base} - Review {}/{}",
                self.review_ply(),
                self.current_ply()
            ),
        }
    }

    /// `mode:.. ui:.. pos:.. ply:.. rev:.. openings:..`
    pub fn debug_line(&self, now_ms: u64) -> String {
        format!(
            "mode:{} ui:{} pos:{} ply:{} rev:{} {}",
            self.mode(),
            self.ui_version(),
            self.position_version(),
            self.current_ply(),
            self.review_ply(),
            self.opening_debug_line(now_ms)
        )
    }

    /// Opening suggestion summary for the displayed position
    pub fn opening_debug_line(&self, now_ms: u64) -> String {
        let Some(update) = self.opening_suggestion() else {
            return "openings:pending".to_string();
        };

        match update.status {
            OpeningStatus::RateLimited => {
                let retry_at = update.retry_at_ms.unwrap_or(now_ms);
                let seconds = retry_at.saturating_sub(now_ms).div_ceil(1000);
                format!("openings:rate-limit ({seconds}s)")
            }
            OpeningStatus::Ok if update.suggestions.is_empty() => "openings:none".to_string(),
            OpeningStatus::Ok => {
                let top: Vec<&str> = update.suggestions.iter().take(3).map(|m| m.label()).collect();
                let cached = if update.cached { " (cached)" } else { "" };
                format!("openings:{}{}", top.join(","), cached)
            }
            status => format!("openings:{status}"),
        }
    }
}
