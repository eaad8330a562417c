//! In-process RPM gate for LLM calls.
//!
//! Sliding 60-second windows, one global and one for the reply stage.
//! A denied call is treated by the chain as provider unavailability,
//! so bursts degrade to the scripted responder instead of queueing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

const WINDOW: Duration = Duration::from_secs(60);

/// Rate gate over outbound LLM calls.
pub struct RateGate {
    enabled: bool,
    global_limit: usize,
    reply_limit: usize,
    windows: Mutex<Windows>,
}

struct Windows {
    global: VecDeque<Instant>,
    reply: VecDeque<Instant>,
    dropped_replies: u64,
}

/// Point-in-time view of the gate for the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateSnapshot {
    pub enabled: bool,
    pub global_rpm_limit: usize,
    pub reply_rpm_limit: usize,
    pub global_in_window: usize,
    pub reply_in_window: usize,
    pub dropped_replies: u64,
}

impl RateGate {
    pub fn new(enabled: bool, global_rpm: u32, reply_rpm: u32) -> Self {
        Self {
            enabled,
            global_limit: global_rpm.max(1) as usize,
            reply_limit: reply_rpm.max(1) as usize,
            windows: Mutex::new(Windows {
                global: VecDeque::new(),
                reply: VecDeque::new(),
                dropped_replies: 0,
            }),
        }
    }

    /// A gate that never denies, for tests and gate-off deployments.
    pub fn unlimited() -> Self {
        Self::new(false, u32::MAX, u32::MAX)
    }

    /// Try to admit one reply-stage LLM call.
    pub fn allow_reply(&self) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("gate lock poisoned");
        prune(&mut windows.global, now);
        prune(&mut windows.reply, now);

        if windows.global.len() >= self.global_limit || windows.reply.len() >= self.reply_limit {
            windows.dropped_replies += 1;
            return false;
        }
        windows.global.push_back(now);
        windows.reply.push_back(now);
        true
    }

    pub fn snapshot(&self) -> GateSnapshot {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("gate lock poisoned");
        prune(&mut windows.global, now);
        prune(&mut windows.reply, now);
        GateSnapshot {
            enabled: self.enabled,
            global_rpm_limit: self.global_limit,
            reply_rpm_limit: self.reply_limit,
            global_in_window: windows.global.len(),
            reply_in_window: windows.reply.len(),
            dropped_replies: windows.dropped_replies,
        }
    }
}

fn prune(queue: &mut VecDeque<Instant>, now: Instant) {
    while let Some(front) = queue.front() {
        if now.duration_since(*front) >= WINDOW {
            queue.pop_front();
        } else {
            break;
        }
    }
}
