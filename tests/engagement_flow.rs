//! Integration tests for the engagement pipeline over HTTP.
//!
//! Each test spins up the real axum app on a random port with a
//! scripted (or deliberately failing) reply chain and exercises the
//! REST contract end to end, including the callback side via a local
//! capture server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::routing::post;
use futures::future::join_all;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use scambait::callback::CallbackDispatcher;
use scambait::config::Config;
use scambait::error::ProviderError;
use scambait::orchestrator::Orchestrator;
use scambait::persona::PersonaEngine;
use scambait::reply::{RateGate, ReplyChain, ReplyContext, ReplyProvider};
use scambait::routes::{self, AppState};
use scambait::session::SessionStore;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

const API_KEY: &str = "test-ingest-key";
const DASHBOARD_KEY: &str = "test-dashboard-key";

/// Provider that always fails, for chain-resilience tests.
struct BrokenProvider;

#[async_trait]
impl ReplyProvider for BrokenProvider {
    fn name(&self) -> &str {
        "broken"
    }
    async fn generate(&self, _ctx: &ReplyContext) -> Result<String, ProviderError> {
        Err(ProviderError::RequestFailed {
            provider: "broken".to_string(),
            reason: "simulated outage".to_string(),
        })
    }
}

/// Build the app with a custom chain/config and serve it on an
/// ephemeral port. Returns the bound address and the shared store.
async fn spawn_app(config: Config, chain: ReplyChain) -> (SocketAddr, Arc<SessionStore>) {
    let store = Arc::new(SessionStore::new());
    let dispatcher = Arc::new(CallbackDispatcher::new(
        config.callback_url.clone(),
        config.callback_attempts,
        config.callback_backoff,
        config.callback_timeout,
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        PersonaEngine::new(&config),
        Arc::new(chain),
        dispatcher,
    ));
    let state = AppState {
        orchestrator,
        store: Arc::clone(&store),
        gate: Arc::new(RateGate::unlimited()),
        api_key: SecretString::from(API_KEY),
        dashboard_key: SecretString::from(DASHBOARD_KEY),
        extended_response: config.extended_response,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, routes::router(state)).await.unwrap();
    });
    (addr, store)
}

/// Local endpoint that counts callback POSTs it receives.
async fn spawn_callback_capture() -> (String, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));

    async fn capture(State(counter): State<Arc<AtomicUsize>>) -> &'static str {
        counter.fetch_add(1, Ordering::SeqCst);
        "ok"
    }

    let app = Router::new()
        .route("/evaluate", post(capture))
        .with_state(Arc::clone(&counter));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/evaluate"), counter)
}

fn test_config() -> Config {
    Config {
        api_key: SecretString::from(API_KEY),
        dashboard_key: SecretString::from(DASHBOARD_KEY),
        callback_url: "http://127.0.0.1:1/evaluate".to_string(),
        callback_attempts: 1,
        callback_backoff: Duration::from_millis(1),
        callback_timeout: Duration::from_millis(500),
        ..Config::default()
    }
}

fn message_body(session_id: &str, text: &str) -> Value {
    json!({
        "sessionId": session_id,
        "message": {"sender": "scammer", "text": text, "timestamp": 1_700_000_000_000_i64},
        "conversationHistory": [],
        "metadata": {"channel": "sms", "language": "en", "locale": "en-IN"}
    })
}

async fn post_message(addr: SocketAddr, key: &str, body: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/message"))
        .header("x-api-key", key)
        .json(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn scam_message_gets_extended_response() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _store) = spawn_app(test_config(), ReplyChain::scripted_only()).await;

        let response = post_message(
            addr,
            API_KEY,
            &message_body(
                "itest-1",
                "Your bank account will be blocked today. Verify immediately.",
            ),
        )
        .await;
        assert_eq!(response.status(), 200);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "success");
        assert!(!body["reply"].as_str().unwrap().is_empty());
        assert_eq!(body["scamDetected"], true);
        assert_eq!(body["engagementComplete"], false);
        assert_eq!(body["totalMessagesExchanged"], 2);
        let keywords = body["intelligence"]["suspiciousKeywords"].as_array().unwrap();
        for kw in ["account", "blocked", "verify"] {
            assert!(keywords.iter().any(|v| v == kw), "missing keyword {kw}");
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn wrong_api_key_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _store) = spawn_app(test_config(), ReplyChain::scripted_only()).await;
        let response = post_message(addr, "nope", &message_body("itest-2", "hello")).await;
        assert_eq!(response.status(), 401);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn empty_message_text_is_a_bad_request() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _store) = spawn_app(test_config(), ReplyChain::scripted_only()).await;
        let response = post_message(addr, API_KEY, &message_body("itest-3", "  ")).await;
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "error");
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn total_provider_failure_is_unobservable() {
    timeout(TEST_TIMEOUT, async {
        let chain = ReplyChain::new(
            vec![Arc::new(BrokenProvider), Arc::new(BrokenProvider)],
            Arc::new(RateGate::unlimited()),
        );
        let (addr, _store) = spawn_app(test_config(), chain).await;

        let response = post_message(
            addr,
            API_KEY,
            &message_body("itest-4", "URGENT: verify your account now"),
        )
        .await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert!(!body["reply"].as_str().unwrap().is_empty());
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn concurrent_first_messages_share_one_session() {
    timeout(TEST_TIMEOUT, async {
        let (addr, store) = spawn_app(test_config(), ReplyChain::scripted_only()).await;

        let requests: Vec<_> = (0..8)
            .map(|i| {
                let body = message_body("itest-race", &format!("hello message {i}"));
                async move {
                    let response = post_message(addr, API_KEY, &body).await;
                    assert_eq!(response.status(), 200);
                }
            })
            .collect();
        join_all(requests).await;

        assert_eq!(store.len().await, 1);
        let snapshot = store.snapshot("itest-race").await.unwrap();
        let inbound = snapshot
            .history
            .iter()
            .filter(|m| matches!(m.sender, scambait::session::Sender::Scammer))
            .count();
        assert_eq!(inbound, 8, "no inbound message lost or duplicated");
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn callback_fires_exactly_once_under_concurrent_completion() {
    timeout(TEST_TIMEOUT, async {
        let (callback_url, counter) = spawn_callback_capture().await;
        let config = Config {
            callback_url,
            // One agent turn: the first processed message completes
            // the engagement, so every concurrent request is a
            // completion trigger candidate.
            max_agent_turns: 1,
            ..test_config()
        };
        let (addr, store) = spawn_app(config, ReplyChain::scripted_only()).await;

        let requests: Vec<_> = (0..6)
            .map(|_| {
                let body = message_body(
                    "itest-once",
                    "This is the bank fraud team. Verify your OTP immediately.",
                );
                async move {
                    post_message(addr, API_KEY, &body).await;
                }
            })
            .collect();
        join_all(requests).await;

        // Wait for the spawned dispatch to land, then make sure no
        // second one ever does.
        let mut waited = Duration::ZERO;
        while counter.load(Ordering::SeqCst) == 0 && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(25)).await;
            waited += Duration::from_millis(25);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let snapshot = store.snapshot("itest-once").await.unwrap();
        assert!(snapshot.callback_sent);
        assert!(snapshot.engagement_complete);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn dashboard_lists_recent_sessions_with_limit() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _store) = spawn_app(test_config(), ReplyChain::scripted_only()).await;

        for i in 0..5 {
            post_message(addr, API_KEY, &message_body(&format!("itest-d{i}"), "hello")).await;
        }

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{addr}/api/dashboard/sessions?limit=2"))
            .header("x-api-key", DASHBOARD_KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let rows: Vec<Value> = response.json().await.unwrap();
        assert_eq!(rows.len(), 2);
        // Most recently active first.
        assert_eq!(rows[0]["sessionId"], "itest-d4");
        assert_eq!(rows[1]["sessionId"], "itest-d3");

        // Ingest key does not open the dashboard.
        let response = client
            .get(format!("http://{addr}/api/dashboard/sessions"))
            .header("x-api-key", API_KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn unknown_session_lookup_is_not_found() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _store) = spawn_app(test_config(), ReplyChain::scripted_only()).await;
        let response = reqwest::Client::new()
            .get(format!("http://{addr}/api/dashboard/sessions/ghost"))
            .header("x-api-key", DASHBOARD_KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn summary_reflects_processed_sessions() {
    timeout(TEST_TIMEOUT, async {
        let (addr, _store) = spawn_app(test_config(), ReplyChain::scripted_only()).await;
        post_message(
            addr,
            API_KEY,
            &message_body("itest-s1", "bank security team: verify otp immediately"),
        )
        .await;
        post_message(addr, API_KEY, &message_body("itest-s2", "lunch tomorrow?")).await;

        let response = reqwest::Client::new()
            .get(format!("http://{addr}/api/dashboard/summary"))
            .header("x-api-key", DASHBOARD_KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["totalSessions"], 2);
        assert_eq!(body["scamSessions"], 1);
        assert_eq!(body["sessionsByLocale"]["en-IN"], 2);
        assert!(body["llmGate"]["enabled"].is_boolean());
    })
    .await
    .unwrap();
}
