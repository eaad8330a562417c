//! Provider failover chain.
//!
//! Fixed priority order; every failure advances immediately. The
//! scripted tail makes the chain total — callers never see an error,
//! whatever the network does.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ProviderError;

use super::gate::RateGate;
use super::provider::{ReplyContext, ReplyProvider};
use super::scripted::ScriptedResponder;

/// A reply plus which backend produced it.
#[derive(Debug, Clone)]
pub struct ChainReply {
    pub text: String,
    pub provider: String,
}

/// Ordered chain of network providers ending in the scripted tail.
pub struct ReplyChain {
    providers: Vec<Arc<dyn ReplyProvider>>,
    fallback: ScriptedResponder,
    gate: Arc<RateGate>,
}

impl ReplyChain {
    pub fn new(providers: Vec<Arc<dyn ReplyProvider>>, gate: Arc<RateGate>) -> Self {
        Self {
            providers,
            fallback: ScriptedResponder::new(),
            gate,
        }
    }

    /// Chain with no network backends; every reply is scripted.
    pub fn scripted_only() -> Self {
        Self::new(Vec::new(), Arc::new(RateGate::unlimited()))
    }

    /// Generate a reply. Total: always returns text.
    ///
    /// Each network provider attempt is one LLM call and needs its
    /// own gate admission; a denial is just another failure that
    /// advances the chain.
    pub async fn generate(&self, ctx: &ReplyContext) -> ChainReply {
        for provider in &self.providers {
            if !self.gate.allow_reply() {
                let denied = ProviderError::Gated {
                    provider: provider.name().to_string(),
                };
                warn!(provider = provider.name(), error = %denied, "Reply provider failed, advancing chain");
                continue;
            }
            match provider.generate(ctx).await {
                Ok(text) => {
                    debug!(provider = provider.name(), "Reply generated");
                    return ChainReply {
                        text,
                        provider: provider.name().to_string(),
                    };
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Reply provider failed, advancing chain");
                }
            }
        }

        self.scripted(ctx)
    }

    fn scripted(&self, ctx: &ReplyContext) -> ChainReply {
        ChainReply {
            text: self.fallback.reply(ctx),
            provider: "scripted".to_string(),
        }
    }
}
