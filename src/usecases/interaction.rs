//! Interaction primitives: send-and-capture and click-button.
//!
//! Both capture every failure into their result record instead of
//! propagating it; the engine pattern-matches on the recorded signal kind.

use crate::domain::{CaptureRecord, ClickOutcome, DomainError, MessageRecord};
use crate::ports::BotGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Messages snapshotted before a click so new arrivals can be told apart.
const PRE_SNAPSHOT_LIMIT: usize = 3;
/// Messages scanned after a click or during the polling fallback.
const POST_SCAN_LIMIT: usize = 5;

/// Fixed wait windows for the primitives, all in one place. The
/// pre-interaction throttle is a deliberate rate-limit courtesy, not an
/// incidental sleep. Tests inject zeros so nothing actually waits.
#[derive(Debug, Clone, Copy)]
pub struct WaitProfile {
    /// Mandatory throttle before every send/click.
    pub interaction_delay: Duration,
    /// Grace after sending before the first response is expected.
    pub post_send_grace: Duration,
    /// Quiescence gap: if no further message arrives within it, collection
    /// stops early rather than waiting out the full timeout.
    pub quiescence_gap: Duration,
    /// Settle delay between a callback ack and the history scan.
    pub settle_delay: Duration,
    /// Cap on the single wait of the polling fallback.
    pub poll_wait_cap: Duration,
}

impl Default for WaitProfile {
    fn default() -> Self {
        Self {
            interaction_delay: Duration::from_secs(1),
            post_send_grace: Duration::from_millis(500),
            quiescence_gap: Duration::from_secs(3),
            settle_delay: Duration::from_secs(2),
            poll_wait_cap: Duration::from_secs(5),
        }
    }
}

impl WaitProfile {
    /// All-zero waits for tests.
    #[cfg(test)]
    pub(crate) fn instant() -> Self {
        Self {
            interaction_delay: Duration::ZERO,
            post_send_grace: Duration::ZERO,
            quiescence_gap: Duration::ZERO,
            settle_delay: Duration::ZERO,
            poll_wait_cap: Duration::ZERO,
        }
    }
}

/// One-at-a-time interactions against the resolved bot. No operation runs
/// concurrently with another: history scans assume no concurrent sends.
pub struct Interactor {
    gateway: Arc<dyn BotGateway>,
    waits: WaitProfile,
    /// Per-interaction response timeout.
    timeout: Duration,
}

impl Interactor {
    pub fn new(gateway: Arc<dyn BotGateway>, waits: WaitProfile, timeout: Duration) -> Self {
        Self {
            gateway,
            waits,
            timeout,
        }
    }

    /// The mandatory inter-interaction delay. Called before every send/click.
    pub async fn throttle(&self) {
        tokio::time::sleep(self.waits.interaction_delay).await;
    }

    /// Send `text` and collect all responses arriving within the timeout,
    /// stopping early at the quiescence gap. Exactly one outbound message is
    /// sent per call; every failure lands in the record, never the caller.
    pub async fn send_and_capture(&self, text: &str) -> CaptureRecord {
        let mut rec = CaptureRecord::new(text);

        if let Err(e) = self.gateway.send_text(text).await {
            rec.error = Some(e.to_string());
            return rec;
        }
        tokio::time::sleep(self.waits.post_send_grace).await;

        match self.capture_streamed().await {
            Ok(responses) => rec.responses = responses,
            Err(stream_err) => {
                // The response stream is unusable; fall back to a one-shot
                // history poll against the same already-sent message.
                debug!(error = %stream_err, "streamed capture failed, polling history");
                match self.capture_polled().await {
                    Ok(responses) => rec.responses = responses,
                    Err(e) => {
                        rec.error = Some(e.to_string());
                        return rec;
                    }
                }
            }
        }

        if rec.responses.is_empty() {
            rec.timed_out = true;
        }
        rec
    }

    /// Primary capture strategy: drain the bounded response stream until the
    /// quiescence gap passes with nothing new, or the timeout budget is out.
    async fn capture_streamed(&self) -> Result<Vec<MessageRecord>, DomainError> {
        let deadline = Instant::now() + self.timeout;
        let mut responses = Vec::new();
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let window = self.waits.quiescence_gap.min(deadline - now);
            match self.gateway.next_incoming(window).await? {
                Some(msg) => responses.push(msg),
                None => break, // quiescent
            }
        }
        Ok(responses)
    }

    /// Fallback strategy: wait once, then take everything in recent history
    /// above our own outgoing message, restored to oldest-first order.
    async fn capture_polled(&self) -> Result<Vec<MessageRecord>, DomainError> {
        tokio::time::sleep(self.timeout.min(self.waits.poll_wait_cap)).await;
        let recent = self.gateway.recent_messages(POST_SCAN_LIMIT).await?;
        let mut responses: Vec<MessageRecord> =
            recent.into_iter().take_while(|m| !m.outgoing).collect();
        responses.reverse();
        Ok(responses)
    }

    /// Invoke a callback button, capture its acknowledgment, then scan
    /// history for either a new message or an edit of the clicked one.
    /// Only one of the two is reported; a new message wins.
    pub async fn click_button(&self, message_id: i32, payload: &str) -> ClickOutcome {
        let mut outcome = ClickOutcome::default();

        let pre_ids: Vec<i32> = match self.gateway.recent_messages(PRE_SNAPSHOT_LIMIT).await {
            Ok(msgs) => msgs.iter().map(|m| m.id).collect(),
            Err(e) => {
                outcome.error = Some(e.into());
                return outcome;
            }
        };

        match self.gateway.invoke_callback(message_id, payload).await {
            Ok(ack) => outcome.callback_answer = ack.render(),
            // The bot never acknowledged the callback; not an error by itself,
            // a result message may still follow.
            Err(DomainError::Timeout) => {}
            Err(e) => {
                outcome.error = Some(e.into());
                return outcome;
            }
        }

        tokio::time::sleep(self.waits.settle_delay).await;

        match self.gateway.recent_messages(POST_SCAN_LIMIT).await {
            Ok(history) => {
                for m in &history {
                    if m.outgoing {
                        break;
                    }
                    if !pre_ids.contains(&m.id) {
                        outcome.new_message = Some(m.clone());
                        break;
                    }
                }
            }
            Err(e) => {
                outcome.error = Some(e.into());
                return outcome;
            }
        }

        // No fresh message: re-read the clicked one by id, however deep it
        // sits in history, and report it if it was edited in place.
        if outcome.new_message.is_none() {
            match self.gateway.message_by_id(message_id).await {
                Ok(Some(m)) if m.edited => outcome.edited_message = Some(m),
                Ok(_) => {}
                Err(e) => outcome.error = Some(e.into()),
            }
        }

        outcome
    }
}
