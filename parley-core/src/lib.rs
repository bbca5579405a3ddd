//! A chat command engine: turns inbound messages into command invocations, collects typed
//! arguments through interactive prompts, enforces enablement, permissions and throttling, and
//! runs the command.
//!
//! The engine talks to the outside world only through collaborator traits:
//! [`gateway_handler::Transport`] for replies, [`directory::GuildDirectory`] for guild lookups
//! and [`settings::Settings`] for per-scope settings.

pub mod command;
pub mod console;
pub mod directory;
pub mod gateway_handler;
pub mod metrics;
pub mod settings;

#[cfg(test)]
pub mod testing;
