//! Scam-intent classification — weighted signal matching.
//!
//! Heuristic-only and infallible: this path is the sole authority on
//! scam intent and must never block a turn. Verdicts fold into the
//! session monotonically — once a session is marked scam it stays
//! marked, whatever later messages score.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::session::Verdict;

/// Score at or above which a single message flags scam intent.
const SCAM_SCORE_THRESHOLD: f32 = 3.0;

/// Score cap, mirrored in the confidence denominator below.
const MAX_SCORE: f32 = 10.0;

static URGENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(urgent|urgently|immediately|right now|within \d+ (minute|minutes|hour|hours)|final warning|last warning|today)\b",
    )
    .unwrap()
});

static AUTHORITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(bank|sbi|security team|fraud team|customs|police|rbi|compliance|official)\b")
        .unwrap()
});

static REWARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(prize|lottery|reward|cashback|gift|bonus|offer|winner)\b").unwrap()
});

static VERIFY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(verify|verification|otp|one time password|pin|upi pin|cvv|account number|kyc)\b",
    )
    .unwrap()
});

static LINK_PRESSURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(click|open|tap|visit)\b.*\b(link|url|site|website)\b|https?://\S+|\bwww\.\S+")
        .unwrap()
});

static ALT_CHANNEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(call|whatsapp|telegram|email|contact)\b").unwrap());

/// One weighted signal: pattern, indicator name, weight.
struct Signal {
    regex: &'static LazyLock<Regex>,
    indicator: &'static str,
    weight: f32,
}

static SIGNALS: &[Signal] = &[
    Signal { regex: &URGENCY_RE, indicator: "urgency", weight: 2.0 },
    Signal { regex: &AUTHORITY_RE, indicator: "authority_impersonation", weight: 2.0 },
    Signal { regex: &REWARD_RE, indicator: "reward_bait", weight: 1.5 },
    Signal { regex: &VERIFY_RE, indicator: "verification_or_secret_request", weight: 2.5 },
    Signal { regex: &LINK_PRESSURE_RE, indicator: "external_link_pressure", weight: 2.0 },
    Signal { regex: &ALT_CHANNEL_RE, indicator: "alternate_channel_push", weight: 1.0 },
];

/// Classify a single message.
///
/// `prior_score` is the session's rolling score; a session already
/// deep in a scam conversation tips ambiguous follow-ups over the
/// threshold (scammers rarely re-state the hook every message).
pub fn classify(text: &str, prior_score: f32) -> Verdict {
    if text.is_empty() {
        return Verdict::default();
    }

    let mut score = 0.0_f32;
    let mut matched_terms = BTreeSet::new();
    for signal in SIGNALS {
        if signal.regex.is_match(text) {
            score += signal.weight;
            matched_terms.insert(signal.indicator.to_string());
        }
    }
    score = score.min(MAX_SCORE);

    let category_hint = category_hint(&matched_terms);

    let is_scam = score >= SCAM_SCORE_THRESHOLD
        || (score > 0.0 && prior_score >= SCAM_SCORE_THRESHOLD)
        || (matched_terms.contains("verification_or_secret_request") && matched_terms.len() >= 2);

    Verdict {
        is_scam,
        score,
        matched_terms,
        category_hint,
    }
}

/// Confidence in `[0, 1]` derived from a score.
pub fn confidence(score: f32) -> f32 {
    (score / 8.0).min(1.0)
}

fn category_hint(indicators: &BTreeSet<String>) -> Option<String> {
    if indicators.contains("reward_bait") {
        Some("LOTTERY_SCAM".to_string())
    } else if indicators.contains("external_link_pressure") {
        Some("PHISHING".to_string())
    } else if indicators.contains("verification_or_secret_request")
        && indicators.contains("authority_impersonation")
    {
        Some("BANK_FRAUD".to_string())
    } else if !indicators.is_empty() {
        Some("GENERIC_SCAM".to_string())
    } else {
        None
    }
}
