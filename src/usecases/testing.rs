//! Scripted in-memory `BotGateway` for engine and primitive tests.
//!
//! The fake keeps a linear message history like a real conversation:
//! outgoing sends land in it, scripted replies are appended behind them,
//! and `recent_messages` serves it newest first.

use crate::domain::{
    BotIdentity, BotInfo, ButtonAction, ButtonRef, CallbackAck, DomainError, MessageRecord,
    RegisteredCommand,
};
use crate::ports::BotGateway;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use std::sync::Mutex;

/// One or more scripted bot messages.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    messages: Vec<Template>,
}

#[derive(Debug, Clone, Default)]
struct Template {
    text: String,
    inline_rows: Vec<Vec<(String, String)>>,
    reply_rows: Vec<Vec<String>>,
}

impl Script {
    /// A single plain message.
    pub(crate) fn message(text: &str) -> Self {
        Self {
            messages: vec![Template {
                text: text.to_string(),
                ..Template::default()
            }],
        }
    }

    /// Several plain messages, delivered in order.
    pub(crate) fn texts(texts: &[&str]) -> Self {
        Self {
            messages: texts
                .iter()
                .map(|t| Template {
                    text: t.to_string(),
                    ..Template::default()
                })
                .collect(),
        }
    }

    /// Append one inline row of callback buttons to the last message.
    pub(crate) fn with_buttons(mut self, buttons: &[(&str, &str)]) -> Self {
        if let Some(last) = self.messages.last_mut() {
            last.inline_rows.push(
                buttons
                    .iter()
                    .map(|(label, data)| (label.to_string(), data.to_string()))
                    .collect(),
            );
        }
        self
    }

    /// Append one reply-keyboard row of plain text buttons to the last message.
    pub(crate) fn with_reply_row(mut self, labels: &[&str]) -> Self {
        if let Some(last) = self.messages.last_mut() {
            last.reply_rows
                .push(labels.iter().map(|l| l.to_string()).collect());
        }
        self
    }
}

#[derive(Debug)]
enum ClickBehavior {
    /// Push the scripted messages and return the ack.
    Reply { script: Script, ack: CallbackAck },
    /// Mark the clicked message edited with new text.
    Edit { text: String },
    /// Both a new message and an edit of the clicked one.
    Both { new_text: String, edited_text: String },
    Fail(DomainError),
}

#[derive(Default)]
struct FakeState {
    next_id: i32,
    /// Oldest first; `recent_messages` reverses.
    history: Vec<MessageRecord>,
    /// Incoming queue for `next_incoming`.
    pending: VecDeque<MessageRecord>,
    commands: HashMap<String, Script>,
    clicks: HashMap<String, ClickBehavior>,
    clicked: Vec<String>,
    sent: Vec<String>,
    info: BotInfo,
    info_fails: bool,
}

impl FakeState {
    fn materialize(&mut self, template: &Template) -> MessageRecord {
        self.next_id += 1;
        MessageRecord {
            id: self.next_id,
            text: template.text.clone(),
            inline_grid: template
                .inline_rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|(label, data)| ButtonRef {
                            label: label.clone(),
                            action: ButtonAction::Callback { data: data.clone() },
                        })
                        .collect()
                })
                .collect(),
            reply_grid: template
                .reply_rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|label| ButtonRef {
                            label: label.clone(),
                            action: ButtonAction::Text,
                        })
                        .collect()
                })
                .collect(),
            ..MessageRecord::default()
        }
    }

    fn deliver(&mut self, script: &Script, queue_incoming: bool) {
        for template in &script.messages {
            let msg = self.materialize(template);
            self.history.push(msg.clone());
            if queue_incoming {
                self.pending.push_back(msg);
            }
        }
    }
}

pub(crate) struct FakeBot {
    state: Mutex<FakeState>,
    stream_broken: AtomicBool,
}

impl FakeBot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                info: BotInfo {
                    id: 42,
                    first_name: "Sample".into(),
                    username: "SampleBot".into(),
                    is_bot: true,
                    ..BotInfo::default()
                },
                ..FakeState::default()
            }),
            stream_broken: AtomicBool::new(false),
        })
    }

    pub(crate) fn on_command(&self, command: &str, script: Script) {
        self.state
            .lock().unwrap()
            .commands
            .insert(command.to_string(), script);
    }

    pub(crate) fn on_click(&self, payload: &str, script: Script) {
        self.state.lock().unwrap().clicks.insert(
            payload.to_string(),
            ClickBehavior::Reply {
                script,
                ack: CallbackAck::default(),
            },
        );
    }

    pub(crate) fn on_click_alert(&self, payload: &str, message: &str) {
        self.state.lock().unwrap().clicks.insert(
            payload.to_string(),
            ClickBehavior::Reply {
                script: Script::default(),
                ack: CallbackAck {
                    message: Some(message.to_string()),
                    alert: true,
                    url: None,
                },
            },
        );
    }

    pub(crate) fn on_click_edit(&self, payload: &str, text: &str) {
        self.state.lock().unwrap().clicks.insert(
            payload.to_string(),
            ClickBehavior::Edit {
                text: text.to_string(),
            },
        );
    }

    pub(crate) fn on_click_both(&self, payload: &str, new_text: &str, edited_text: &str) {
        self.state.lock().unwrap().clicks.insert(
            payload.to_string(),
            ClickBehavior::Both {
                new_text: new_text.to_string(),
                edited_text: edited_text.to_string(),
            },
        );
    }

    pub(crate) fn on_click_error(&self, payload: &str, error: DomainError) {
        self.state
            .lock().unwrap()
            .clicks
            .insert(payload.to_string(), ClickBehavior::Fail(error));
    }

    /// Seed one incoming message directly into history; returns its id.
    pub(crate) fn seed_message(&self, script: Script) -> i32 {
        let mut state = self.state.lock().unwrap();
        for template in &script.messages {
            let msg = state.materialize(template);
            state.history.push(msg);
        }
        state.next_id
    }

    pub(crate) fn set_registered(&self, commands: &[(&str, &str)]) {
        self.state.lock().unwrap().info.registered_commands = commands
            .iter()
            .map(|(command, description)| RegisteredCommand {
                command: command.to_string(),
                description: description.to_string(),
            })
            .collect();
    }

    pub(crate) fn fail_full_info(&self) {
        self.state.lock().unwrap().info_fails = true;
    }

    pub(crate) fn fail_stream(&self) {
        self.stream_broken.store(true, Ordering::SeqCst);
    }

    pub(crate) fn sent_texts(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub(crate) fn clicked_payloads(&self) -> Vec<String> {
        self.state.lock().unwrap().clicked.clone()
    }
}

#[async_trait::async_trait]
impl BotGateway for FakeBot {
    async fn resolve_bot(&self, _handle: &str) -> Result<BotIdentity, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(BotIdentity {
            id: state.info.id,
            first_name: state.info.first_name.clone(),
            username: state.info.username.clone(),
        })
    }

    async fn full_info(&self) -> Result<BotInfo, DomainError> {
        let state = self.state.lock().unwrap();
        if state.info_fails {
            return Err(DomainError::Transport("info unavailable".into()));
        }
        Ok(state.info.clone())
    }

    async fn send_text(&self, text: &str) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        state.sent.push(text.to_string());
        state.next_id += 1;
        let outgoing = MessageRecord {
            id: state.next_id,
            text: text.to_string(),
            outgoing: true,
            ..MessageRecord::default()
        };
        state.history.push(outgoing);
        if let Some(script) = state.commands.get(text).cloned() {
            state.deliver(&script, true);
        }
        Ok(())
    }

    async fn next_incoming(
        &self,
        _timeout: Duration,
    ) -> Result<Option<MessageRecord>, DomainError> {
        if self.stream_broken.load(Ordering::SeqCst) {
            return Err(DomainError::Transport("stream unavailable".into()));
        }
        Ok(self.state.lock().unwrap().pending.pop_front())
    }

    async fn recent_messages(&self, limit: usize) -> Result<Vec<MessageRecord>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.history.iter().rev().take(limit).cloned().collect())
    }

    async fn message_by_id(&self, message_id: i32) -> Result<Option<MessageRecord>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.history.iter().find(|m| m.id == message_id).cloned())
    }

    async fn invoke_callback(
        &self,
        message_id: i32,
        payload: &str,
    ) -> Result<CallbackAck, DomainError> {
        let mut state = self.state.lock().unwrap();
        state.clicked.push(payload.to_string());
        match state.clicks.remove(payload) {
            None => Ok(CallbackAck::default()),
            Some(ClickBehavior::Reply { script, ack }) => {
                state.deliver(&script, false);
                Ok(ack)
            }
            Some(ClickBehavior::Edit { text }) => {
                if let Some(msg) = state.history.iter_mut().find(|m| m.id == message_id) {
                    msg.text = text;
                    msg.edited = true;
                }
                Ok(CallbackAck::default())
            }
            Some(ClickBehavior::Both {
                new_text,
                edited_text,
            }) => {
                if let Some(msg) = state.history.iter_mut().find(|m| m.id == message_id) {
                    msg.text = edited_text;
                    msg.edited = true;
                }
                state.deliver(&Script::message(&new_text), false);
                Ok(CallbackAck::default())
            }
            Some(ClickBehavior::Fail(err)) => Err(err),
        }
    }
}
