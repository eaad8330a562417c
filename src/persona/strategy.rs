//! Conversational strategy ladder.
//!
//! Inferred fresh each turn from the session's rolling scam score and
//! how much intelligence has been harvested. Drives the persona
//! directives and is surfaced on the dashboard.

use serde::Serialize;

/// How aggressively the persona digs for artifacts this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// No scam signal yet; stay bland.
    Neutral,
    /// Weak signal; play along cautiously.
    Suspicious,
    /// Clear signal; start angling for payment details.
    Extraction,
    /// Confirmed scam, little harvested yet.
    HighConfidence,
    /// Confirmed scam and harvesting well; keep them talking.
    Harvest,
}

impl Strategy {
    /// Infer the strategy for the upcoming agent turn.
    pub fn infer(
        rolling_score: f32,
        scam_detected: bool,
        actionable_categories: usize,
        agent_turns: u32,
    ) -> Self {
        if rolling_score < 3.0 && !scam_detected {
            Strategy::Neutral
        } else if rolling_score < 6.0 && !scam_detected {
            Strategy::Suspicious
        } else if rolling_score < 10.0 {
            Strategy::Extraction
        } else if actionable_categories >= 3 || agent_turns >= 5 {
            Strategy::Harvest
        } else {
            Strategy::HighConfidence
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Neutral => "neutral",
            Self::Suspicious => "suspicious",
            Self::Extraction => "extraction",
            Self::HighConfidence => "high_confidence",
            Self::Harvest => "harvest",
        };
        write!(f, "{s}")
    }
}
