//! Telegram adapters: grammers-backed gateway, auth, mapping, session.

pub mod auth_adapter;
pub mod client;
pub mod mapper;
pub mod session;
