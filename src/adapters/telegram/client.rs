//! Implements BotGateway using grammers Client.
//!
//! Uses raw invoke for GetHistory, GetFullUser and GetBotCallbackAnswer;
//! sending goes through the high-level client. Incoming messages are observed
//! by polling history against a message-id watermark, so no update stream is
//! needed for a single short-lived conversation.

use crate::adapters::telegram::mapper;
use crate::domain::{BotIdentity, BotInfo, CallbackAck, DomainError, MessageRecord};
use crate::ports::BotGateway;
use async_trait::async_trait;
use grammers_client::peer::Peer;
use grammers_session::types::PeerRef;
use grammers_client::tl;
use grammers_client::Client;
use grammers_client::InvocationError;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// How often the watermark poll re-reads history.
const POLL_INTERVAL: Duration = Duration::from_millis(300);

/// The resolved conversation target. Set once by resolve_bot.
struct Target {
    peer_ref: PeerRef,
    input_peer: tl::enums::InputPeer,
    /// Highest message id already seen; next_incoming returns ids above it.
    last_seen_id: i32,
}

/// Telegram gateway adapter. Wraps a grammers Client (shared with the auth
/// adapter via clone in main).
pub struct GrammersBotGateway {
    client: Client,
    target: Mutex<Option<Target>>,
}

impl GrammersBotGateway {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            target: Mutex::new(None),
        }
    }

    async fn target_peers(&self) -> Result<(PeerRef, tl::enums::InputPeer), DomainError> {
        let guard = self.target.lock().await;
        let target = guard
            .as_ref()
            .ok_or_else(|| DomainError::Transport("bot not resolved yet".into()))?;
        Ok((target.peer_ref.clone(), target.input_peer.clone()))
    }

    async fn advance_watermark(&self, id: i32) {
        let mut guard = self.target.lock().await;
        if let Some(target) = guard.as_mut() {
            if id > target.last_seen_id {
                target.last_seen_id = id;
            }
        }
    }

    async fn watermark(&self) -> i32 {
        self.target
            .lock()
            .await
            .as_ref()
            .map(|t| t.last_seen_id)
            .unwrap_or(0)
    }

    /// One GetHistory page, newest first. Flood waits surface as RateLimited;
    /// the engine decides whether to abort.
    async fn history(&self, limit: i32) -> Result<Vec<MessageRecord>, DomainError> {
        use tl::enums::messages::Messages;

        let (_, input_peer) = self.target_peers().await?;
        let req = tl::functions::messages::GetHistory {
            peer: input_peer,
            offset_id: 0,
            offset_date: 0,
            add_offset: 0,
            limit,
            max_id: 0,
            min_id: 0,
            hash: 0,
        };

        let raw = self.client.invoke(&req).await.map_err(map_invocation)?;
        let messages = match raw {
            Messages::Messages(m) => m.messages,
            Messages::Slice(m) => m.messages,
            Messages::ChannelMessages(m) => m.messages,
            Messages::NotModified(_) => return Ok(vec![]),
        };
        Ok(messages
            .iter()
            .filter_map(mapper::message_to_record)
            .collect())
    }
}

#[async_trait]
impl BotGateway for GrammersBotGateway {
    async fn resolve_bot(&self, handle: &str) -> Result<BotIdentity, DomainError> {
        let username = handle.trim().trim_start_matches('@');
        let peer = self
            .client
            .resolve_username(username)
            .await
            .map_err(map_invocation)?
            .ok_or_else(|| DomainError::BotNotFound(handle.to_string()))?;
        if !matches!(peer, Peer::User(_)) {
            return Err(DomainError::BotNotFound(handle.to_string()));
        }

        let peer_ref = peer
            .to_ref()
            .await
            .map_err(|e| DomainError::Transport(e.to_string()))?
            .ok_or_else(|| DomainError::Transport("peer not in session cache".into()))?;
        let input_peer: tl::enums::InputPeer = peer_ref.clone().into();
        let input_user = input_user_of(&input_peer)
            .ok_or_else(|| DomainError::BotNotFound(handle.to_string()))?;

        // Fetch the raw user: the bot flag is not part of resolution.
        let users = self
            .client
            .invoke(&tl::functions::users::GetUsers {
                id: vec![input_user],
            })
            .await
            .map_err(map_invocation)?;
        let user = users
            .into_iter()
            .find_map(|u| match u {
                tl::enums::User::User(u) => Some(u),
                _ => None,
            })
            .ok_or_else(|| DomainError::BotNotFound(handle.to_string()))?;
        if !user.bot {
            return Err(DomainError::BotNotFound(handle.to_string()));
        }

        *self.target.lock().await = Some(Target {
            peer_ref,
            input_peer,
            last_seen_id: 0,
        });

        // Seed the watermark so a stale conversation is not replayed.
        let recent = self.history(1).await?;
        if let Some(top) = recent.first() {
            self.advance_watermark(top.id).await;
        }

        Ok(BotIdentity {
            id: user.id,
            first_name: user.first_name.unwrap_or_default(),
            username: user.username.unwrap_or_else(|| username.to_string()),
        })
    }

    async fn full_info(&self) -> Result<BotInfo, DomainError> {
        let (_, input_peer) = self.target_peers().await?;
        let id = input_user_of(&input_peer)
            .ok_or_else(|| DomainError::Transport("target is not a user peer".into()))?;

        let raw = self
            .client
            .invoke(&tl::functions::users::GetFullUser { id })
            .await
            .map_err(map_invocation)?;
        let tl::enums::users::UserFull::Full(full) = raw;
        Ok(mapper::full_user_to_bot_info(&full))
    }

    async fn send_text(&self, text: &str) -> Result<(), DomainError> {
        let (peer_ref, _) = self.target_peers().await?;
        let sent = self
            .client
            .send_message(peer_ref, text)
            .await
            .map_err(map_invocation)?;
        // Our own message must not be mistaken for a reply.
        self.advance_watermark(sent.id()).await;
        debug!(id = sent.id(), "message sent");
        Ok(())
    }

    async fn next_incoming(
        &self,
        timeout: Duration,
    ) -> Result<Option<MessageRecord>, DomainError> {
        let deadline = Instant::now() + timeout;
        loop {
            let watermark = self.watermark().await;
            let page = self.history(10).await?;
            // Oldest unseen first, so multi-message replies come in order.
            let fresh = page
                .into_iter()
                .filter(|m| m.id > watermark && !m.outgoing)
                .min_by_key(|m| m.id);
            if let Some(msg) = fresh {
                self.advance_watermark(msg.id).await;
                return Ok(Some(msg));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }

    async fn recent_messages(&self, limit: usize) -> Result<Vec<MessageRecord>, DomainError> {
        self.history(limit as i32).await
    }

    async fn message_by_id(&self, message_id: i32) -> Result<Option<MessageRecord>, DomainError> {
        use tl::enums::messages::Messages;

        let req = tl::functions::messages::GetMessages {
            id: vec![tl::enums::InputMessage::Id(tl::types::InputMessageId {
                id: message_id,
            })],
        };
        let raw = self.client.invoke(&req).await.map_err(map_invocation)?;
        let messages = match raw {
            Messages::Messages(m) => m.messages,
            Messages::Slice(m) => m.messages,
            Messages::ChannelMessages(m) => m.messages,
            Messages::NotModified(_) => return Ok(None),
        };
        Ok(messages
            .iter()
            .filter_map(mapper::message_to_record)
            .find(|m| m.id == message_id))
    }

    async fn invoke_callback(&self, message_id: i32, payload: &str) -> Result<CallbackAck, DomainError> {
        let (_, input_peer) = self.target_peers().await?;
        let req = tl::functions::messages::GetBotCallbackAnswer {
            game: false,
            peer: input_peer,
            msg_id: message_id,
            data: Some(payload.as_bytes().to_vec()),
            password: None,
        };
        match self.client.invoke(&req).await {
            Ok(answer) => Ok(mapper::callback_answer_to_ack(&answer)),
            Err(e) => {
                let mapped = map_invocation(e);
                if !matches!(mapped, DomainError::Timeout) {
                    warn!(message_id, error = %mapped, "callback invocation failed");
                }
                Err(mapped)
            }
        }
    }
}

fn input_user_of(peer: &tl::enums::InputPeer) -> Option<tl::enums::InputUser> {
    match peer {
        tl::enums::InputPeer::User(u) => {
            Some(tl::enums::InputUser::User(tl::types::InputUser {
                user_id: u.user_id,
                access_hash: u.access_hash,
            }))
        }
        _ => None,
    }
}

/// Map an RPC failure to the domain error union. Flood waits carry their
/// server-mandated delay.
fn map_invocation(err: InvocationError) -> DomainError {
    match err {
        InvocationError::Rpc(rpc) if rpc.code == 420 => DomainError::RateLimited {
            seconds: rpc.value.unwrap_or(60) as u64,
        },
        InvocationError::Rpc(rpc) => match rpc.name.as_str() {
            "MESSAGE_ID_INVALID" => DomainError::InvalidMessageId,
            "DATA_INVALID" | "BUTTON_DATA_INVALID" => DomainError::InvalidPayload,
            "BOT_RESPONSE_TIMEOUT" => DomainError::Timeout,
            _ => DomainError::Transport(rpc.to_string()),
        },
        other => DomainError::Transport(other.to_string()),
    }
}
