//! Domain entities. Pure data structures for the discovery blueprint.
//!
//! No Telegram/IO types here — these are mapped from adapters.

use crate::domain::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a button does when activated. Closed set of wire-level kinds with an
/// explicit fallback so new protocol button types never crash the mapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ButtonAction {
    /// Sends an opaque payload to the bot without posting visible text.
    Callback { data: String },
    Url { url: String },
    SwitchInline { query: String },
    SharePhone,
    ShareGeo,
    /// Reply-keyboard button: pressing it posts its label as a plain message.
    Text,
    Unrecognized { type_name: String },
}

/// One button in an inline or reply-keyboard grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonRef {
    pub label: String,
    #[serde(flatten)]
    pub action: ButtonAction,
}

impl ButtonRef {
    /// The opaque callback payload, if this button carries one.
    pub fn callback_data(&self) -> Option<&str> {
        match &self.action {
            ButtonAction::Callback { data } => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Document,
    WebPage,
    Contact,
    Geo,
    Poll,
    Dice,
    Venue,
    Game,
    Invoice,
    Unsupported,
}

/// Canonical record of one bot message: text plus the exact control layout.
/// Row and column order of both grids is preserved from the wire layout;
/// dedup and reporting depend on that ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i32,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_grid: Vec<Vec<ButtonRef>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reply_grid: Vec<Vec<ButtonRef>>,
    pub has_media: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_kind: Option<MediaKind>,
    /// Set when the message carries an edit timestamp.
    #[serde(default)]
    pub edited: bool,
    /// Our own outgoing message. History scans stop at these.
    #[serde(skip)]
    pub outgoing: bool,
}

impl MessageRecord {
    /// Callback buttons in grid order (row-major): `(label, payload)`.
    pub fn callback_buttons(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inline_grid
            .iter()
            .flatten()
            .filter_map(|b| b.callback_data().map(|data| (b.label.as_str(), data)))
    }

    /// Labels of plain reply-keyboard buttons in grid order.
    pub fn reply_labels(&self) -> impl Iterator<Item = &str> {
        self.reply_grid
            .iter()
            .flatten()
            .filter(|b| b.action == ButtonAction::Text)
            .map(|b| b.label.as_str())
    }
}

/// Immediate acknowledgment the bot returns for a callback invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackAck {
    pub message: Option<String>,
    pub alert: bool,
    pub url: Option<String>,
}

impl CallbackAck {
    /// Render for the blueprint: alert-flagged answers get an `[ALERT]`
    /// marker, URL answers `[URL]`. A URL wins when both are present.
    pub fn render(&self) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(format!("[URL] {}", url));
        }
        match (&self.message, self.alert) {
            (Some(m), true) => Some(format!("[ALERT] {}", m)),
            (Some(m), false) => Some(m.clone()),
            (None, _) => None,
        }
    }
}

/// Why a single button click failed. Recorded on the node; only `RateLimited`
/// stops the surrounding traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ClickFailure {
    InvalidMessageId,
    InvalidPayload,
    RateLimited { wait_secs: u64 },
    Transport { detail: String },
}

impl From<DomainError> for ClickFailure {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidMessageId => ClickFailure::InvalidMessageId,
            DomainError::InvalidPayload => ClickFailure::InvalidPayload,
            DomainError::RateLimited { seconds } => ClickFailure::RateLimited {
                wait_secs: seconds,
            },
            other => ClickFailure::Transport {
                detail: other.to_string(),
            },
        }
    }
}

/// Result of one click-button call. Failure is a field, never a propagated
/// error: the traversal decides what to do with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClickOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_message: Option<MessageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<MessageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ClickFailure>,
}

/// Result of one send-and-capture call. The command-probing phases reuse it
/// with the optional classification fields filled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub sent: String,
    pub responses: Vec<MessageRecord>,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Did the bot appear to know this command? None outside probing phases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognized: Option<bool>,
    /// Description from the bot's registered command list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_description: Option<String>,
    /// Reply-keyboard label, when probing reply buttons.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_label: Option<String>,
}

impl CaptureRecord {
    pub fn new(sent: impl Into<String>) -> Self {
        Self {
            sent: sent.into(),
            ..Self::default()
        }
    }

    /// Text of the first response, if any. Input to the unknown-command check.
    pub fn first_response_text(&self) -> &str {
        self.responses.first().map(|m| m.text.as_str()).unwrap_or("")
    }
}

/// One edge in the discovered button graph. `path` records the first
/// discovery path only: a payload is clicked once per run, so the node set
/// forms a tree even though the dedup set is global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationNode {
    pub path: Vec<String>,
    pub depth: u32,
    pub label: String,
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ClickFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_message: Option<MessageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_edited: Option<MessageRecord>,
}

/// Monotonic counters. Owned by the engine, bumped after every interaction,
/// never decremented. `total_interactions == commands_tested +
/// buttons_explored` holds at run end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total_interactions: u32,
    pub successful_responses: u32,
    pub timeouts: u32,
    pub errors: u32,
    pub buttons_explored: u32,
    pub commands_tested: u32,
    pub max_depth_reached: u32,
}

/// Identity captured when the bot handle resolves.
#[derive(Debug, Clone, Default)]
pub struct BotIdentity {
    pub id: i64,
    pub first_name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredCommand {
    pub command: String,
    pub description: String,
}

/// Best-effort bot profile. A fetch failure leaves identity fields as
/// resolved and sets `error`; it never aborts the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub first_name: String,
    pub username: String,
    pub is_bot: bool,
    pub description: String,
    #[serde(default)]
    pub registered_commands: Vec<RegisteredCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-phase results, in exploration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotStructure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<CaptureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<CaptureRecord>,
    #[serde(default)]
    pub button_tree: Vec<ExplorationNode>,
    #[serde(default)]
    pub reply_keyboard: Vec<CaptureRecord>,
    #[serde(default)]
    pub registered_commands: Vec<CaptureRecord>,
    #[serde(default)]
    pub discovered_commands: Vec<CaptureRecord>,
    #[serde(default)]
    pub common_commands: Vec<CaptureRecord>,
}

/// Top-level blueprint for one run. Finalized at run end; on an abort it is
/// still emitted with whatever was collected and `error` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub ok: bool,
    pub bot_handle: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub bot_info: BotInfo,
    pub structure: BotStructure,
    pub statistics: RunStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
}

impl Report {
    pub fn new(bot_handle: impl Into<String>) -> Self {
        Self {
            ok: true,
            bot_handle: bot_handle.into(),
            started_at: Utc::now(),
            finished_at: None,
            bot_info: BotInfo::default(),
            structure: BotStructure::default(),
            statistics: RunStatistics::default(),
            error: None,
            saved_to: None,
        }
    }
}

/// Outcome of submitting a login code. 2FA-protected accounts need a second
/// step with the account password.
#[derive(Debug)]
pub enum SignInResult {
    Success,
    PasswordRequired { hint: Option<String> },
}
