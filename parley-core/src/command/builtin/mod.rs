//! Commands every registry can carry: help, ping, prefix management, enablement and the
//! unknown-command fallback.

use std::sync::Arc;

use super::TCommand;
use super::errors::ConfigurationError;
use super::group::CommandGroup;
use super::registry::CommandRegistry;

pub mod enablement;
pub mod groups;
pub mod help;
pub mod ping;
pub mod prefix;
pub mod unknown;

pub const UTIL_GROUP: &str = "util";
pub const COMMANDS_GROUP: &str = "commands";

/// Registers the `util` and `commands` groups and their commands. Both groups are guarded, so
/// nothing here can be disabled.
pub fn register_builtins(registry: &CommandRegistry) -> Result<(), ConfigurationError> {
    registry.register_group(
        CommandGroup::new(UTIL_GROUP, "Utility")
            .description("Help, prefix and other basics")
            .guarded(true),
    )?;
    registry.register_group(
        CommandGroup::new(COMMANDS_GROUP, "Commands")
            .description("Enabling and disabling commands")
            .guarded(true),
    )?;

    let commands: [TCommand; 7] = [
        Arc::new(help::Help),
        Arc::new(ping::Ping),
        Arc::new(prefix::Prefix),
        Arc::new(unknown::UnknownCommand),
        Arc::new(enablement::Enable),
        Arc::new(enablement::Disable),
        Arc::new(groups::Groups),
    ];
    registry.register_commands(commands)
}
