use std::sync::Arc;

use tracing::debug;

use super::error::{ParseError, PreParseError};
use super::preprocess::preprocess;
use crate::command::errors::ResolveError;
use crate::command::registry::{CommandRegistry, RegisteredCommand};
use crate::gateway_handler::dispatcher::DispatchOptions;
use crate::gateway_handler::{Invocation, InvocationContent};
use crate::settings::Settings;

/// What an invocation resolved to.
#[derive(Debug)]
pub enum ParseResult {
    /// A prefixed command with its unparsed argument string.
    Command {
        command: Arc<RegisteredCommand>,
        args: String,
        calling_prefix: String,
    },
    /// A command whose pattern matched the whole message. `captures[0]` is the full match.
    Pattern {
        command: Arc<RegisteredCommand>,
        captures: Vec<Option<String>>,
    },
    /// The unknown-command fallback, for a prefixed token that names nothing.
    Unknown {
        command: Arc<RegisteredCommand>,
        token: String,
        calling_prefix: String,
    },
    /// The token partially matches several commands.
    Ambiguous {
        token: String,
        candidates: Vec<Arc<RegisteredCommand>>,
    },
    /// A structured invocation and its named options.
    Structured {
        command: Arc<RegisteredCommand>,
        options: Vec<(String, String)>,
    },
}
impl ParseResult {
    pub fn command(&self) -> Option<&Arc<RegisteredCommand>> {
        match self {
            Self::Command { command, .. }
            | Self::Pattern { command, .. }
            | Self::Unknown { command, .. }
            | Self::Structured { command, .. } => Some(command),
            Self::Ambiguous { .. } => None,
        }
    }
}

/// Splits `command_text` into the command token and everything after it.
fn split_token(command_text: &str) -> (&str, &str) {
    let command_text = command_text.trim_start();
    match command_text.find(char::is_whitespace) {
        Some(end) => (&command_text[..end], command_text[end..].trim()),
        None => (command_text, ""),
    }
}

/// The first command with a pattern matching `content`, checked in registration order.
pub fn match_patterns(registry: &CommandRegistry, content: &str) -> Option<ParseResult> {
    for command in registry.commands_with_patterns() {
        let captures = command.patterns.iter().find_map(|p| p.captures(content));
        if let Some(captures) = captures {
            let captures = captures
                .iter()
                .map(|m| m.map(|m| m.as_str().to_owned()))
                .collect();
            return Some(ParseResult::Pattern { command, captures });
        }
    }

    None
}

/// Parse an invocation into a command.
///
/// **Step 1**: Structured invocations name their command directly. Only exact names, aliases
/// and `group:member` are accepted.
///
/// **Step 2**: Check that the message starts with the correct prefix (see [`preprocess`]). A
/// message without a prefix can still match a command's pattern.
///
/// **Step 3**: Split the command token from its arguments and resolve the token. Commands that
/// opted out of default handling are only reachable through their patterns. A token that names
/// nothing falls through to patterns in prefixless direct messages, and then to the registered
/// unknown-command fallback.
pub async fn parse_invocation(
    invocation: &Invocation,
    registry: &CommandRegistry,
    options: &DispatchOptions,
    settings: &dyn Settings,
) -> Result<ParseResult, ParseError> {
    if let InvocationContent::Structured {
        command,
        options: named,
    } = &invocation.content
    {
        if invocation.author_is_bot {
            return Err(PreParseError::UserIsBot(invocation.author.get()).into());
        }

        let found = registry
            .find_commands(command, true, |c| c.metadata.default_handling && !c.metadata.unknown)
            .into_iter()
            .next();
        return match found {
            Some(command) => Ok(ParseResult::Structured {
                command,
                options: named.clone(),
            }),
            None => Err(ParseError::CommandNotFound(command.clone())),
        };
    }

    let content = invocation.text().unwrap_or_default();
    let preprocess = match preprocess(invocation, options, settings).await {
        Ok(p) => p,
        Err(PreParseError::MessageNotPrefixed(prefix)) => {
            return match_patterns(registry, content)
                .ok_or(ParseError::PreParseFail(PreParseError::MessageNotPrefixed(prefix)));
        },
        Err(e) => return Err(e.into()),
    };

    let (token, args) = split_token(&content[preprocess.prefix.len()..]);
    if token.is_empty() {
        return Err(ParseError::EmptyCommand);
    }

    match registry.resolve_command(token) {
        Ok(command) if command.metadata.default_handling && !command.metadata.unknown => {
            debug!("parser: {token:?} resolved to {}", command.qualified_name());
            return Ok(ParseResult::Command {
                command,
                args: args.to_owned(),
                calling_prefix: preprocess.prefix,
            });
        },
        Err(ResolveError::Ambiguous(candidates)) => {
            return Ok(ParseResult::Ambiguous {
                token: token.to_owned(),
                candidates,
            });
        },
        _ => {},
    }

    if preprocess.prefix.is_empty()
        && let Some(pattern) = match_patterns(registry, content)
    {
        return Ok(pattern);
    }

    match registry.unknown_command() {
        Some(command) => Ok(ParseResult::Unknown {
            command,
            token: token.to_owned(),
            calling_prefix: preprocess.prefix,
        }),
        None => Err(ParseError::CommandNotFound(token.to_owned())),
    }
}
