/// `/start` and `/log` commands
pub mod commands;
/// Routing of incoming messages to the creator chat
pub mod forwarder;
/// Transport-neutral view of incoming Telegram messages
pub mod inbound;

pub use forwarder::Forwarder;
pub use inbound::Incoming;
