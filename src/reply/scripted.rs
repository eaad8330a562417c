//! Deterministic scripted responder — the chain's guaranteed tail.
//!
//! No network, no state, never fails. Lines are keyed off the
//! strategy and the agent-turn index so repeated fallbacks still read
//! like a conversation rather than a stuck bot.

use async_trait::async_trait;

use super::provider::{ReplyContext, ReplyProvider};
use crate::error::ProviderError;
use crate::persona::Strategy;

const NEUTRAL_LINES: &[&str] = &[
    "Sorry, who is this? I don't think I have this number saved.",
    "Oh okay. What is this regarding exactly?",
    "I was just having my tea, can you explain that again?",
];

const SUSPICIOUS_LINES: &[&str] = &[
    "Oh no, that sounds serious. What do I need to do?",
    "I don't understand all this, is my account really in trouble?",
    "My nephew usually helps me with these things. Can you explain slowly?",
];

const EXTRACTION_LINES: &[&str] = &[
    "Okay okay, I want to fix this. Where exactly do I send the payment?",
    "The app is asking for some ID to send money to. What should I type there?",
    "It says the transfer failed. Can you give me the number once more, slowly?",
    "Should I use the UPI thing or the bank transfer? Which number do I put?",
];

const HARVEST_LINES: &[&str] = &[
    "I wrote it down but my handwriting is bad. Can you send the details again?",
    "My bank app wants a phone number for confirmation too. Which one do I give?",
    "Is there another number or link in case this one doesn't work?",
    "Wait, the page isn't loading. Can you send the link one more time?",
];

/// Scripted persona responder.
#[derive(Debug, Default, Clone)]
pub struct ScriptedResponder;

impl ScriptedResponder {
    pub fn new() -> Self {
        Self
    }

    /// Pick the canned line for this turn. Total: always returns.
    pub fn reply(&self, ctx: &ReplyContext) -> String {
        let lines = match ctx.strategy {
            Strategy::Neutral => NEUTRAL_LINES,
            Strategy::Suspicious => SUSPICIOUS_LINES,
            Strategy::Extraction | Strategy::HighConfidence => EXTRACTION_LINES,
            Strategy::Harvest => HARVEST_LINES,
        };
        lines[ctx.agent_turn as usize % lines.len()].to_string()
    }
}

#[async_trait]
impl ReplyProvider for ScriptedResponder {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, ctx: &ReplyContext) -> Result<String, ProviderError> {
        Ok(self.reply(ctx))
    }
}
