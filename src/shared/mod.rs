//! Shared application plumbing: configuration.

pub mod config;
