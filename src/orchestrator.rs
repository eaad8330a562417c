//! Engagement orchestrator — the per-message pipeline entry point.
//!
//! Everything that mutates a session happens here, under that
//! session's exclusive lock: append inbound → extract → classify →
//! persona turn → append outbound → state machine. The callback fires
//! on a separate task after the lock is released.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::callback::CallbackDispatcher;
use crate::classify;
use crate::extract;
use crate::persona::PersonaEngine;
use crate::reply::ReplyChain;
use crate::session::{
    CallbackPayload, EngagementState, Intelligence, Message, Sender, Session, SessionMeta,
    SessionStore,
};

/// Line returned for messages arriving after the engagement has
/// concluded. Logged and extracted, but no persona turn is spent.
const POST_COMPLETION_LINE: &str = "Sorry, I cannot talk right now.";

// ── Wire types ──────────────────────────────────────────────────────

/// Inbound message-processing request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngageRequest {
    pub session_id: String,
    pub message: InboundMessage,
    /// Caller-supplied context. Advisory only — the server-side
    /// session history is authoritative, so this is never replayed
    /// into state.
    #[serde(default)]
    pub conversation_history: Vec<serde_json::Value>,
    #[serde(default)]
    pub metadata: RequestMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub sender: Sender,
    pub text: String,
    /// Caller-supplied epoch milliseconds; untrusted.
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestMetadata {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub locale: String,
}

/// What one processed message produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementOutcome {
    pub reply: String,
    pub scam_detected: bool,
    pub engagement_complete: bool,
    pub intelligence: Intelligence,
    pub total_messages_exchanged: u32,
}

// ── Orchestrator ────────────────────────────────────────────────────

pub struct Orchestrator {
    store: Arc<SessionStore>,
    persona: PersonaEngine,
    chain: Arc<ReplyChain>,
    dispatcher: Arc<CallbackDispatcher>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<SessionStore>,
        persona: PersonaEngine,
        chain: Arc<ReplyChain>,
        dispatcher: Arc<CallbackDispatcher>,
    ) -> Self {
        Self {
            store,
            persona,
            chain,
            dispatcher,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Process one inbound message end to end.
    #[instrument(skip_all, fields(session_id = %request.session_id, request_id = %Uuid::new_v4()))]
    pub async fn process(&self, request: EngageRequest) -> EngagementOutcome {
        let meta = SessionMeta {
            channel: request.metadata.channel,
            language: request.metadata.language,
            locale: request.metadata.locale,
        };
        let handle = self.store.get_or_create(&request.session_id, &meta).await;

        let mut completed_payload = None;
        let outcome = {
            let mut session = handle.lock().await;
            let outcome = self
                .process_locked(&mut session, &request.message, &mut completed_payload)
                .await;
            outcome
        };

        // Callback fires outside the lock and never delays the reply.
        if let Some(payload) = completed_payload {
            self.dispatcher.spawn(Arc::clone(&handle), payload);
        }

        outcome
    }

    async fn process_locked(
        &self,
        session: &mut Session,
        inbound: &InboundMessage,
        completed_payload: &mut Option<CallbackPayload>,
    ) -> EngagementOutcome {
        if session.state == EngagementState::New {
            session.state = EngagementState::Active;
        }

        session.history.push(Message {
            sender: inbound.sender,
            text: inbound.text.clone(),
            timestamp: inbound.timestamp,
        });
        if inbound.sender == Sender::Scammer {
            session.scammer_turns += 1;
        }

        // Extraction and classification degrade to "no signal" on
        // weird input; they never abort the turn.
        let extracted = extract::extract(&inbound.text);
        session.intelligence.merge(&extracted);

        let verdict = classify::classify(&inbound.text, session.rolling_scam_score);
        session.scam_detected |= verdict.is_scam;
        session.rolling_scam_score = session.rolling_scam_score.max(verdict.score);

        let reply = if session.engagement_complete {
            POST_COMPLETION_LINE.to_string()
        } else {
            let turn = self
                .persona
                .take_turn(session, &inbound.text, &self.chain)
                .await;

            let reply = match turn.reply {
                Some(text) => {
                    session.history.push(Message {
                        sender: Sender::Agent,
                        text: text.clone(),
                        timestamp: Utc::now().timestamp_millis(),
                    });
                    session.agent_turns += 1;
                    text
                }
                None => String::new(),
            };

            if turn.complete {
                session.engagement_complete = true;
                if session.state.can_transition_to(EngagementState::Complete) {
                    session.state = EngagementState::Complete;
                }
                info!(
                    scam_detected = session.scam_detected,
                    reason = ?turn.reason,
                    agent_turns = session.agent_turns,
                    intel_items = session.intelligence.total_items(),
                    "Engagement complete"
                );

                // At-most-once: the flag flips under the lock, so a
                // racing completion trigger sees it and stands down.
                if session.scam_detected && !session.callback_sent {
                    session.callback_sent = true;
                    *completed_payload = Some(CallbackPayload::from_session(session));
                }
            }
            reply
        };

        session.last_activity = Utc::now();

        EngagementOutcome {
            reply,
            scam_detected: session.scam_detected,
            engagement_complete: session.engagement_complete,
            intelligence: session.intelligence.clone(),
            total_messages_exchanged: session.total_messages(),
        }
    }
}
