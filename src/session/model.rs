//! Session aggregate and the value types that hang off it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Scammer,
    Agent,
}

/// One message in a session's history.
///
/// Ordered by arrival. The timestamp is caller-supplied epoch
/// milliseconds and untrusted — never used for ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    pub timestamp: i64,
}

/// Extracted artifacts, accumulated over a session's lifetime.
///
/// Each set only ever grows (monotonic union); values are normalized
/// before insertion so re-extraction is idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intelligence {
    pub bank_accounts: BTreeSet<String>,
    pub upi_ids: BTreeSet<String>,
    pub phishing_links: BTreeSet<String>,
    pub phone_numbers: BTreeSet<String>,
    pub suspicious_keywords: BTreeSet<String>,
}

impl Intelligence {
    /// Union `other` into `self`. Set semantics make this idempotent.
    pub fn merge(&mut self, other: &Intelligence) {
        self.bank_accounts.extend(other.bank_accounts.iter().cloned());
        self.upi_ids.extend(other.upi_ids.iter().cloned());
        self.phishing_links.extend(other.phishing_links.iter().cloned());
        self.phone_numbers.extend(other.phone_numbers.iter().cloned());
        self.suspicious_keywords
            .extend(other.suspicious_keywords.iter().cloned());
    }

    /// Number of populated *actionable* categories. Keywords are a
    /// weak signal and do not count toward engagement completion.
    pub fn category_count(&self) -> usize {
        [
            !self.bank_accounts.is_empty(),
            !self.upi_ids.is_empty(),
            !self.phishing_links.is_empty(),
            !self.phone_numbers.is_empty(),
        ]
        .iter()
        .filter(|populated| **populated)
        .count()
    }

    /// Whether a direct payment identifier was captured.
    pub fn has_payment_identifier(&self) -> bool {
        !self.upi_ids.is_empty() || !self.bank_accounts.is_empty()
    }

    /// Total artifacts across all five sets.
    pub fn total_items(&self) -> usize {
        self.bank_accounts.len()
            + self.upi_ids.len()
            + self.phishing_links.len()
            + self.phone_numbers.len()
            + self.suspicious_keywords.len()
    }
}

/// Engagement state machine for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementState {
    /// Session created, first message not yet evaluated.
    New,
    /// Conversation in progress.
    Active,
    /// Engagement concluded. Terminal.
    Complete,
}

impl EngagementState {
    pub fn can_transition_to(&self, target: EngagementState) -> bool {
        use EngagementState::*;
        matches!((self, target), (New, Active) | (Active, Complete))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for EngagementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Terminal record of the one-shot callback delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackOutcome {
    Delivered,
    Failed,
}

/// Caller-supplied channel metadata, kept for dashboard grouping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMeta {
    pub channel: String,
    pub language: String,
    pub locale: String,
}

/// The aggregate root: all state for one `sessionId`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub state: EngagementState,
    pub history: Vec<Message>,
    /// Monotonic: once true, never reverts.
    pub scam_detected: bool,
    /// Monotonic: once true, the persona stops taking turns.
    pub engagement_complete: bool,
    pub intelligence: Intelligence,
    /// Monotonic: set the moment a dispatch is initiated.
    pub callback_sent: bool,
    pub callback_outcome: Option<CallbackOutcome>,
    /// Highest classifier score seen this session (0..=10).
    pub rolling_scam_score: f32,
    pub scammer_turns: u32,
    pub agent_turns: u32,
    pub meta: SessionMeta,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: String, meta: SessionMeta) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            state: EngagementState::New,
            history: Vec::new(),
            scam_detected: false,
            engagement_complete: false,
            intelligence: Intelligence::default(),
            callback_sent: false,
            callback_outcome: None,
            rolling_scam_score: 0.0,
            scammer_turns: 0,
            agent_turns: 0,
            meta,
            created_at: now,
            last_activity: now,
        }
    }

    /// Total messages exchanged (both directions).
    pub fn total_messages(&self) -> u32 {
        self.history.len() as u32
    }

    /// Dashboard projection of this session.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            state: self.state,
            scam_detected: self.scam_detected,
            engagement_complete: self.engagement_complete,
            callback_sent: self.callback_sent,
            total_messages: self.total_messages(),
            agent_turns: self.agent_turns,
            intelligence_items: self.intelligence.total_items(),
            locale: self.meta.locale.clone(),
            last_activity: self.last_activity,
        }
    }
}

/// Lightweight per-session row for dashboard listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub state: EngagementState,
    pub scam_detected: bool,
    pub engagement_complete: bool,
    pub callback_sent: bool,
    pub total_messages: u32,
    pub agent_turns: u32,
    pub intelligence_items: usize,
    pub locale: String,
    pub last_activity: DateTime<Utc>,
}

/// Classifier output for a single message. Not persisted; folds into
/// the session via [`Session::scam_detected`] and the rolling score.
#[derive(Debug, Clone, Default)]
pub struct Verdict {
    pub is_scam: bool,
    /// 0..=10 weighted signal score.
    pub score: f32,
    pub matched_terms: BTreeSet<String>,
    pub category_hint: Option<String>,
}

/// The payload POSTed to the evaluation endpoint. Schema is part of
/// the external contract — keep it stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub session_id: String,
    pub scam_detected: bool,
    pub total_messages_exchanged: u32,
    pub extracted_intelligence: Intelligence,
    pub agent_notes: String,
}

impl CallbackPayload {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            scam_detected: session.scam_detected,
            total_messages_exchanged: session.total_messages(),
            extracted_intelligence: session.intelligence.clone(),
            agent_notes: format!(
                "engagement ran {} agent turns, peak scam score {:.1}, {} intelligence categories",
                session.agent_turns,
                session.rolling_scam_score,
                session.intelligence.category_count(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_idempotent() {
        let mut a = Intelligence::default();
        let mut b = Intelligence::default();
        b.upi_ids.insert("scammer@upi".into());
        b.suspicious_keywords.insert("urgent".into());

        a.merge(&b);
        let after_first = a.clone();
        a.merge(&b);
        assert_eq!(a, after_first);
        assert_eq!(a.upi_ids.len(), 1);
    }

    #[test]
    fn category_count_excludes_keywords() {
        let mut intel = Intelligence::default();
        intel.suspicious_keywords.insert("verify".into());
        assert_eq!(intel.category_count(), 0);

        intel.upi_ids.insert("a@upi".into());
        intel.phone_numbers.insert("9876543210".into());
        assert_eq!(intel.category_count(), 2);
    }

    #[test]
    fn state_transitions() {
        assert!(EngagementState::New.can_transition_to(EngagementState::Active));
        assert!(EngagementState::Active.can_transition_to(EngagementState::Complete));
        assert!(!EngagementState::Complete.can_transition_to(EngagementState::Active));
        assert!(EngagementState::Complete.is_terminal());
    }

    #[test]
    fn callback_payload_projects_session() {
        let mut session = Session::new("s-1".into(), SessionMeta::default());
        session.scam_detected = true;
        session.history.push(Message {
            sender: Sender::Scammer,
            text: "hello".into(),
            timestamp: 0,
        });
        let payload = CallbackPayload::from_session(&session);
        assert_eq!(payload.session_id, "s-1");
        assert!(payload.scam_detected);
        assert_eq!(payload.total_messages_exchanged, 1);
    }
}
