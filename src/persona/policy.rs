//! Engagement completion policy.
//!
//! Evaluated every turn; any satisfied rule ends the engagement. Once
//! complete, the session is terminal — later messages are still
//! logged and extracted but the persona stops taking turns.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::session::Session;

/// Agent turns of depth required before intelligence volume alone can
/// close a session. Closing on the first artifact would waste a live
/// scammer who might still surrender a payment identifier.
const MIN_DEPTH_FOR_INTEL_CLOSE: u32 = 3;

/// Explicit stop/refusal signals from the counterparty.
static DISENGAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(stop messaging|stop texting|not interested|leave me alone|wrong number|don'?t (message|text|call)|goodbye|good bye|bye)\b|^stop\b",
    )
    .unwrap()
});

/// Why an engagement concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Hard stop at the configured agent-turn maximum.
    MaxTurns,
    /// Enough distinct intelligence categories harvested.
    IntelligenceGathered,
    /// Counterparty signalled they are done.
    Disengaged,
}

/// Turn-by-turn completion decision.
#[derive(Debug, Clone)]
pub struct CompletionPolicy {
    max_agent_turns: u32,
    intel_category_threshold: usize,
}

impl CompletionPolicy {
    pub fn new(max_agent_turns: u32, intel_category_threshold: usize) -> Self {
        Self {
            max_agent_turns,
            intel_category_threshold,
        }
    }

    /// Does the latest counterparty message read as a goodbye?
    pub fn is_disengaging(&self, text: &str) -> bool {
        DISENGAGE_RE.is_match(text)
    }

    /// Evaluate completion for a turn where the agent has now taken
    /// `agent_turns_after` turns. `None` means keep engaging.
    pub fn evaluate(
        &self,
        session: &Session,
        agent_turns_after: u32,
        last_scammer_text: &str,
    ) -> Option<CompletionReason> {
        if self.is_disengaging(last_scammer_text) {
            return Some(CompletionReason::Disengaged);
        }

        // Hard stop applies whether or not anything was harvested.
        if agent_turns_after >= self.max_agent_turns {
            return Some(CompletionReason::MaxTurns);
        }

        let intel = &session.intelligence;
        let enough_categories = intel.category_count() >= self.intel_category_threshold;
        let deep_enough = agent_turns_after >= MIN_DEPTH_FOR_INTEL_CLOSE;
        // A captured payment identifier is the prize; wrap up as soon
        // as the depth guard allows. Other artifact mixes wait one
        // extra category past the threshold.
        let payment_close =
            intel.has_payment_identifier() && enough_categories && deep_enough;
        let volume_close =
            intel.category_count() > self.intel_category_threshold && deep_enough;
        if session.scam_detected && (payment_close || volume_close) {
            return Some(CompletionReason::IntelligenceGathered);
        }

        None
    }
}
