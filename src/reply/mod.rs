//! Reply generation: provider trait, network backends, rate gate and
//! the failover chain with its scripted tail.

pub mod chain;
pub mod gate;
pub mod gemini;
pub mod openai;
pub mod provider;
pub mod scripted;

use std::sync::Arc;

use crate::config::Config;

pub use chain::{ChainReply, ReplyChain};
pub use gate::{GateSnapshot, RateGate};
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use provider::{ReplyContext, ReplyProvider};
pub use scripted::ScriptedResponder;

/// Build the chain from configuration: OpenAI first, Gemini second,
/// scripted tail always. Providers without a key are left out.
pub fn chain_from_config(config: &Config, gate: Arc<RateGate>) -> ReplyChain {
    let mut providers: Vec<Arc<dyn ReplyProvider>> = Vec::new();
    if let Some(key) = &config.openai_api_key {
        providers.push(Arc::new(OpenAiProvider::new(
            key.clone(),
            config.openai_model.clone(),
            config.provider_timeout,
        )));
    }
    if let Some(key) = &config.gemini_api_key {
        providers.push(Arc::new(GeminiProvider::new(
            key.clone(),
            config.gemini_model.clone(),
            config.provider_timeout,
        )));
    }
    tracing::info!(
        network_providers = providers.len(),
        "Reply chain assembled (scripted tail always present)"
    );
    ReplyChain::new(providers, gate)
}
