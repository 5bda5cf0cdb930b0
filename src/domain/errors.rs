//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Not authorized: {0}")]
    AuthRequired(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Bot not found: {0}")]
    BotNotFound(String),

    #[error("No response within the wait window")]
    Timeout,

    /// FloodWait: the caller must honor `seconds` before any further interaction.
    #[error("Rate limited: retry after {seconds} seconds")]
    RateLimited { seconds: u64 },

    #[error("Message no longer resolvable")]
    InvalidMessageId,

    #[error("Callback payload rejected by the bot")]
    InvalidPayload,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Report store error: {0}")]
    ReportStore(String),
}

impl DomainError {
    /// "Expected" failures (no session, bad handle, missing config) exit with
    /// code 1; everything else is an internal error, code 2.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            DomainError::ConfigMissing(_)
                | DomainError::AuthRequired(_)
                | DomainError::BotNotFound(_)
        )
    }
}
