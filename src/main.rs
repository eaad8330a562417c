use anyhow::Context;
use scambait::config::Config;
use scambait::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().context("loading configuration")?;
    tracing::info!(
        bind = %config.bind_addr,
        callback = %config.callback_url,
        max_agent_turns = config.max_agent_turns,
        openai = config.openai_api_key.is_some(),
        gemini = config.gemini_api_key.is_some(),
        "Starting scambait v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = AppState::from_config(&config);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}
