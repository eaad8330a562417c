//! One-shot result callback to the external evaluation endpoint.
//!
//! At-most-once is enforced upstream: the orchestrator flips
//! `callback_sent` under the session lock before handing the snapshot
//! here, so concurrent completion triggers cannot double-send. This
//! side only does best-effort delivery with bounded retry and records
//! the terminal outcome back on the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::CallbackError;
use crate::session::{CallbackOutcome, CallbackPayload, Session};

pub struct CallbackDispatcher {
    client: reqwest::Client,
    url: String,
    attempts: u32,
    base_backoff: Duration,
    timeout: Duration,
}

impl CallbackDispatcher {
    pub fn new(url: String, attempts: u32, base_backoff: Duration, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            attempts: attempts.max(1),
            base_backoff,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.callback_url.clone(),
            config.callback_attempts,
            config.callback_backoff,
            config.callback_timeout,
        )
    }

    /// Fire the callback on its own task, after the caller has
    /// released the session lock. Never blocks the inbound response.
    pub fn spawn(self: &Arc<Self>, session: Arc<Mutex<Session>>, payload: CallbackPayload) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = match dispatcher.dispatch(&payload).await {
                Ok(()) => CallbackOutcome::Delivered,
                Err(e) => {
                    error!(session_id = %payload.session_id, error = %e, "Callback delivery failed");
                    CallbackOutcome::Failed
                }
            };
            let mut session = session.lock().await;
            session.callback_outcome = Some(outcome);
        });
    }

    /// POST the payload with bounded retry and exponential backoff.
    pub async fn dispatch(&self, payload: &CallbackPayload) -> Result<(), CallbackError> {
        let mut last_error = String::new();
        for attempt in 1..=self.attempts {
            match self.post_once(payload).await {
                Ok(()) => {
                    info!(
                        session_id = %payload.session_id,
                        attempt,
                        "Callback delivered"
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        session_id = %payload.session_id,
                        attempt,
                        error = %e,
                        "Callback attempt failed"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.attempts {
                let backoff = self.base_backoff * 2u32.pow(attempt - 1);
                let jitter = {
                    use rand::Rng;
                    Duration::from_millis(rand::thread_rng().gen_range(0..=100))
                };
                tokio::time::sleep(backoff + jitter).await;
            }
        }

        Err(CallbackError::Exhausted {
            attempts: self.attempts,
            last: last_error,
        })
    }

    async fn post_once(&self, payload: &CallbackPayload) -> Result<(), CallbackError> {
        // Bounded like every other outbound call: a stalled endpoint
        // must fail the attempt, not park the dispatch task.
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| CallbackError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CallbackError::ErrorStatus(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Intelligence, SessionMeta};

    #[tokio::test]
    async fn exhausts_attempts_against_dead_endpoint() {
        // Nothing listens on this port; every attempt is a transport
        // error and the dispatcher must report exhaustion, not hang.
        let dispatcher = CallbackDispatcher::new(
            "http://127.0.0.1:1/evaluate".to_string(),
            2,
            Duration::from_millis(1),
            Duration::from_millis(250),
        );
        let session = Session::new("dead".into(), SessionMeta::default());
        let payload = CallbackPayload::from_session(&session);

        match dispatcher.dispatch(&payload).await {
            Err(CallbackError::Exhausted { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stalled_endpoint_fails_the_attempt_within_the_timeout() {
        // Endpoint that accepts the connection and then goes silent:
        // without the per-attempt timeout this dispatch never returns.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let _held_open = socket;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                });
            }
        });

        let dispatcher = CallbackDispatcher::new(
            format!("http://{addr}/evaluate"),
            1,
            Duration::from_millis(1),
            Duration::from_millis(100),
        );
        let session = Session::new("stalled".into(), SessionMeta::default());
        let payload = CallbackPayload::from_session(&session);

        let result =
            tokio::time::timeout(Duration::from_secs(3), dispatcher.dispatch(&payload)).await;
        match result {
            Ok(Err(CallbackError::Exhausted { attempts, .. })) => assert_eq!(attempts, 1),
            Ok(other) => panic!("expected exhaustion, got {other:?}"),
            Err(_) => panic!("dispatch was not bounded by the per-attempt timeout"),
        }
    }

    #[test]
    fn payload_schema_is_stable() {
        let mut session = Session::new("s-9".into(), SessionMeta::default());
        session.scam_detected = true;
        session.intelligence = Intelligence::default();
        session.intelligence.upi_ids.insert("x@upi".into());

        let value = serde_json::to_value(CallbackPayload::from_session(&session)).unwrap();
        assert_eq!(value["sessionId"], "s-9");
        assert_eq!(value["scamDetected"], true);
        assert!(value["totalMessagesExchanged"].is_number());
        assert_eq!(value["extractedIntelligence"]["upiIds"][0], "x@upi");
        assert!(value["extractedIntelligence"]["bankAccounts"].is_array());
        assert!(value["extractedIntelligence"]["phishingLinks"].is_array());
        assert!(value["extractedIntelligence"]["phoneNumbers"].is_array());
        assert!(value["extractedIntelligence"]["suspiciousKeywords"].is_array());
    }
}
