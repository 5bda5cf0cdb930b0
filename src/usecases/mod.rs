//! Application use cases. Orchestrate domain logic via ports.

pub mod auth_service;
pub mod explorer;
pub mod interaction;
pub mod probing;

#[cfg(test)]
pub(crate) mod testing;

pub use auth_service::AuthService;
pub use explorer::{ExploreLimits, ExplorerService};
pub use interaction::{Interactor, WaitProfile};
