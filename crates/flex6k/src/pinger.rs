//! Keep-alive pinger.
//!
//! Once a session is active, a `ping` goes out every second. The radio's
//! replies refresh [`PingState`]; if no reply has been seen for the timeout
//! window the session is torn down with reason `"timeout"`. The first few
//! replies double as the "client fully initialized" signal consumed by
//! callers that want to know the radio has finished its initial status
//! burst.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::commands;
use crate::session::{Responder, Shared};

/// Reply bookkeeping shared between the pinger task and the TCP reader.
pub(crate) struct PingState {
    last_reply: Mutex<Instant>,
    replies: AtomicU32,
}

impl PingState {
    pub(crate) fn new() -> Arc<PingState> {
        Arc::new(PingState {
            last_reply: Mutex::new(Instant::now()),
            replies: AtomicU32::new(0),
        })
    }

    /// Record a ping reply; returns the total reply count.
    pub(crate) fn note_reply(&self) -> u32 {
        *self.last_reply.lock().unwrap() = Instant::now();
        self.replies.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn since_last_reply(&self) -> Duration {
        self.last_reply.lock().unwrap().elapsed()
    }
}

/// Spawn the keep-alive task. It exits when the session's cancellation
/// token fires or when it tears the session down itself.
pub(crate) fn spawn(shared: Arc<Shared>, interval: Duration, timeout: Duration) {
    let state = PingState::new();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shared.cancelled() => break,
                _ = ticker.tick() => {
                    if state.since_last_reply() > timeout {
                        tracing::warn!("keep-alive timeout");
                        shared.teardown("timeout").await;
                        break;
                    }
                    if shared
                        .send_with_responder(&commands::ping(), Responder::Ping(state.clone()))
                        .await
                        .is_err()
                    {
                        // The write path failing means teardown is already
                        // in flight; the token will stop this task.
                    }
                }
            }
        }
        tracing::debug!("pinger stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_reply_counts_and_refreshes() {
        let state = PingState::new();
        assert_eq!(state.note_reply(), 1);
        assert_eq!(state.note_reply(), 2);
        assert!(state.since_last_reply() < Duration::from_millis(100));
    }
}
