//! Persona engine — decides the conversational stance, produces the
//! reply via the provider chain, and decides when engagement ends.
//!
//! The persona is a credulous, mildly confused target who strings the
//! scammer along. Hard rules, enforced by a static filter on every
//! generated reply: never acknowledge detection, never emit real
//! account or payment data, never give material assistance.

pub mod policy;
pub mod strategy;

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::reply::{ReplyChain, ReplyContext, ScriptedResponder};
use crate::session::Session;

pub use policy::{CompletionPolicy, CompletionReason};
pub use strategy::Strategy;

/// Neutral sign-off for the completing turn.
const CLOSING_LINE: &str =
    "Okay, I have to go now, someone is at the door. I will look at this later.";

/// Phrases that would blow the persona's cover or read as the system
/// talking instead of the character.
static COVER_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(scam(mer)?|fraudster|honeypot|chatbot|language model|(?:as an |i am an? )?\bai\b|automated (agent|system)|you are (lying|a criminal)|report(ed|ing)? (you|this) to)\b",
    )
    .unwrap()
});

/// Long digit runs must never appear in outbound replies: the persona
/// has no real account, card or OTP to give.
static SENSITIVE_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d\s\-]{7,}\d").unwrap());

/// One persona turn: an optional reply plus the completion decision.
#[derive(Debug, Clone)]
pub struct PersonaTurn {
    pub reply: Option<String>,
    /// Which backend produced the reply (for logs/dashboard).
    pub provider: Option<String>,
    pub complete: bool,
    pub reason: Option<CompletionReason>,
    pub strategy: Strategy,
}

pub struct PersonaEngine {
    policy: CompletionPolicy,
    scripted: ScriptedResponder,
    history_window: usize,
    closing_reply: bool,
}

impl PersonaEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            policy: CompletionPolicy::new(
                config.max_agent_turns,
                config.intel_category_threshold,
            ),
            scripted: ScriptedResponder::new(),
            history_window: config.history_window,
            closing_reply: config.closing_reply,
        }
    }

    /// Take one persona turn for an active session.
    ///
    /// `last_text` is the inbound message that triggered this turn
    /// (already appended to the session history).
    pub async fn take_turn(
        &self,
        session: &Session,
        last_text: &str,
        chain: &ReplyChain,
    ) -> PersonaTurn {
        let strategy = Strategy::infer(
            session.rolling_scam_score,
            session.scam_detected,
            session.intelligence.category_count(),
            session.agent_turns,
        );

        // A goodbye gets at most the neutral sign-off; no point in
        // spending a provider call on it.
        if self.policy.is_disengaging(last_text) {
            return PersonaTurn {
                reply: self.closing_reply.then(|| CLOSING_LINE.to_string()),
                provider: None,
                complete: true,
                reason: Some(CompletionReason::Disengaged),
                strategy,
            };
        }

        let ctx = self.build_context(session, strategy);
        let generated = chain.generate(&ctx).await;
        let reply = self.filter_reply(generated.text, &ctx);

        let agent_turns_after = session.agent_turns + 1;
        let reason = self.policy.evaluate(session, agent_turns_after, last_text);
        debug!(
            session_id = %session.session_id,
            %strategy,
            provider = %generated.provider,
            complete = reason.is_some(),
            "Persona turn taken"
        );

        PersonaTurn {
            reply: Some(reply),
            provider: Some(generated.provider),
            complete: reason.is_some(),
            reason,
            strategy,
        }
    }

    fn build_context(&self, session: &Session, strategy: Strategy) -> ReplyContext {
        let start = session.history.len().saturating_sub(self.history_window);
        ReplyContext {
            directives: directives(strategy),
            history: session.history[start..].to_vec(),
            scam_detected: session.scam_detected,
            strategy,
            agent_turn: session.agent_turns,
        }
    }

    /// Static content filter over every generated reply. A rejected
    /// reply is swapped for a scripted line rather than surfaced.
    fn filter_reply(&self, text: String, ctx: &ReplyContext) -> String {
        if COVER_BREAK_RE.is_match(&text) || SENSITIVE_DIGITS_RE.is_match(&text) {
            warn!("Generated reply tripped the content filter, using scripted line");
            return self.scripted.reply(ctx);
        }
        text
    }
}

/// Persona directives for the system prompt, per strategy.
fn directives(strategy: Strategy) -> String {
    let stance = "You are Savitri, a polite, slightly forgetful retiree who is not \
                  comfortable with phones or apps. Reply in one or two short, informal \
                  sentences. Never share any real account number, card number, OTP, PIN \
                  or password; if asked, be vague, make excuses, or ask a question back. \
                  Never say or hint that the other person might be dishonest, and never \
                  mention assistants, bots or software.";
    let goal = match strategy {
        Strategy::Neutral => "You do not know who is messaging you. Ask who they are and what they want.",
        Strategy::Suspicious => "Sound a little worried and confused. Ask them to explain what happened in simple words.",
        Strategy::Extraction => {
            "Act willing to cooperate but hopeless with technology. Ask exactly where \
             the money should go: which number, which ID, which link, step by step."
        }
        Strategy::HighConfidence | Strategy::Harvest => {
            "Keep them talking. Claim things failed or didn't come through and ask them \
             to repeat payment IDs, phone numbers and links again, or to give alternates."
        }
    };
    format!("{stance}\n\nThis turn: {goal}")
}
