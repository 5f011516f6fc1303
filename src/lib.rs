#![deny(missing_docs)]
//! Telegram relay bot: forwards user messages and albums to the creator chat.

/// Album (media group) aggregation with debounced flushing.
pub mod album;
/// Telegram-facing handlers: inbound extraction, forwarding and commands.
pub mod bot;
/// Configuration and settings management.
pub mod config;
/// HTTP liveness endpoint.
pub mod health;
/// Logging setup: token redaction and daily log files.
pub mod logging;
/// User-facing reply texts.
pub mod replies;
/// Telegram runtime entrypoint.
pub mod runner;
/// Recording outbound transport for tests.
pub mod testing;
/// Outbound transport seam and transport-neutral message types.
pub mod transport;
