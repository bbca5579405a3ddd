use parley_common::util::discord::mention_prefixes;
use tracing::debug;

use crate::gateway_handler::Invocation;
use crate::gateway_handler::dispatcher::DispatchOptions;
use crate::gateway_handler::message_parser::error::PreParseError;
use crate::settings::Settings;

pub struct PreprocessResult {
    /// The prefix the message starts with. Empty for prefixless direct messages.
    pub prefix: String,
}

/// Returns `Some(prefix)` if the message starts with a mention of the agent, otherwise `None`.
fn message_mention_prefix(content: &str, agent_id: u64) -> Option<String> {
    if agent_id == 0 {
        return None;
    }

    mention_prefixes(agent_id)
        .into_iter()
        .find(|mention| content.starts_with(mention.as_str()))
}

/// Initial message processing.
/// Checks the validity of the message before performing any kind of parsing.
///
/// This includes:
/// - Checking that the message is not sent by a bot,
/// - Checking that the message starts with the correct prefix for the context, and returning any
///   identified prefix.
///
/// Prefix precedence:
/// 1. prefix override (disabling other prefixes)
/// 2. mention prefix
/// 3. in direct messages: the default prefix if present, otherwise no prefix
/// 4. in guilds: the guild prefix, or the default one if the guild never set its own. An empty
///    guild prefix leaves only the mention prefix.
pub async fn preprocess(
    invocation: &Invocation,
    options: &DispatchOptions,
    settings: &dyn Settings,
) -> Result<PreprocessResult, PreParseError> {
    if invocation.author_is_bot {
        return Err(PreParseError::UserIsBot(invocation.author.get()));
    }

    let Some(content) = invocation.text() else {
        return Err(PreParseError::NotText);
    };

    let parsed_prefix = if let Some(ref r#override) = options.prefix_override {
        r#override.clone()
    } else if let Some(mention_prefix) = message_mention_prefix(content, options.agent_id) {
        mention_prefix
    } else if let Some(guild_id) = invocation.guild_id {
        match settings.prefix(guild_id).await {
            Ok(Some(p)) if p.is_empty() => {
                return Err(PreParseError::MessageNotPrefixed(String::new()));
            },
            Ok(Some(p)) => p,
            Ok(None) => options.default_prefix.clone(),
            Err(error) => {
                return Err(PreParseError::Failure(format!("failed to fetch prefix: {error:#}")));
            },
        }
    } else if !options.default_prefix.is_empty() && content.starts_with(&options.default_prefix) {
        options.default_prefix.clone()
    } else {
        String::new()
    };

    if !content.starts_with(&parsed_prefix) {
        return Err(PreParseError::MessageNotPrefixed(parsed_prefix));
    }

    debug!("parser: parsed prefix: {:?}", parsed_prefix);

    Ok(PreprocessResult { prefix: parsed_prefix })
}
