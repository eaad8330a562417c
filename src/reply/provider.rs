//! The reply-provider seam: one trait, interchangeable backends.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::persona::Strategy;
use crate::session::{Message, Sender};

/// Everything a backend needs to produce one persona reply.
///
/// Backends are stateless between calls; all conversational state
/// lives on the session and arrives here as a trimmed copy.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    /// Persona directives, sent as the system prompt.
    pub directives: String,
    /// Trailing slice of the session history, oldest first.
    pub history: Vec<Message>,
    pub scam_detected: bool,
    pub strategy: Strategy,
    /// Zero-based index of the agent turn being generated.
    pub agent_turn: u32,
}

impl ReplyContext {
    /// History as (role, text) pairs in chat-completion convention:
    /// the scammer is the "user", the persona is the "assistant".
    pub fn transcript(&self) -> Vec<(&'static str, &str)> {
        self.history
            .iter()
            .map(|m| match m.sender {
                Sender::Scammer => ("user", m.text.as_str()),
                Sender::Agent => ("assistant", m.text.as_str()),
            })
            .collect()
    }
}

/// A reply-generation backend. Implementations either return reply
/// text or fail; failure of any kind advances the chain.
#[async_trait]
pub trait ReplyProvider: Send + Sync {
    /// Short name for logs and failover traces.
    fn name(&self) -> &str;

    /// Generate one reply for the given context.
    async fn generate(&self, ctx: &ReplyContext) -> Result<String, ProviderError>;
}
