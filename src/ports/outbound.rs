//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    BotIdentity, BotInfo, CallbackAck, DomainError, MessageRecord, Report, SignInResult,
};
use std::path::PathBuf;
use std::time::Duration;

/// Gateway to one target bot. `resolve_bot` must succeed before any other
/// call; the adapter caches the resolved peer internally. All interactions
/// are issued one at a time (history scans assume no concurrent sends).
#[async_trait::async_trait]
pub trait BotGateway: Send + Sync {
    /// Resolve the bot handle (with or without a leading `@`).
    async fn resolve_bot(&self, handle: &str) -> Result<BotIdentity, DomainError>;

    /// Full profile: description and registered command list. Best-effort;
    /// callers degrade a failure to an error-annotated info object.
    async fn full_info(&self) -> Result<BotInfo, DomainError>;

    /// Send one text message to the bot. Fire-and-forget: responses are
    /// observed via `next_incoming` or `recent_messages`.
    async fn send_text(&self, text: &str) -> Result<(), DomainError>;

    /// Wait up to `timeout` for the next incoming bot message that this
    /// gateway has not yet handed out. `Ok(None)` means the window elapsed
    /// quietly; `Err` means the stream is unusable and the caller should
    /// fall back to history polling.
    async fn next_incoming(&self, timeout: Duration)
        -> Result<Option<MessageRecord>, DomainError>;

    /// Fetch recent messages from the conversation, newest first.
    async fn recent_messages(&self, limit: usize) -> Result<Vec<MessageRecord>, DomainError>;

    /// Fetch one message by id in its current shape, however old it is.
    /// `Ok(None)` when it no longer exists.
    async fn message_by_id(&self, message_id: i32) -> Result<Option<MessageRecord>, DomainError>;

    /// Invoke a callback button on `message_id` with its opaque payload.
    ///
    /// Failure taxonomy: `InvalidMessageId`, `InvalidPayload`,
    /// `RateLimited{seconds}`, `Timeout` (bot never acknowledged), or a
    /// generic `Transport` detail.
    async fn invoke_callback(
        &self,
        message_id: i32,
        payload: &str,
    ) -> Result<CallbackAck, DomainError>;
}

/// Authentication port. Login code and 2FA flow against the session store.
#[async_trait::async_trait]
pub trait AuthPort: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool, DomainError>;

    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), DomainError>;

    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError>;

    async fn check_password(&self, password: &[u8]) -> Result<(), DomainError>;
}

/// Report store port. Persist one serialized blueprint per run.
#[async_trait::async_trait]
pub trait ReportStorePort: Send + Sync {
    /// Write the report; returns the path written.
    async fn save(&self, report: &Report) -> Result<PathBuf, DomainError>;
}
