//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    BotIdentity, BotInfo, BotStructure, ButtonAction, ButtonRef, CallbackAck, CaptureRecord,
    ClickFailure, ClickOutcome, ExplorationNode, MediaKind, MessageRecord, RegisteredCommand,
    Report, RunStatistics, SignInResult,
};
pub use errors::DomainError;
