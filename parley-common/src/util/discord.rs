use regex::Regex;

use super::regex::{CHANNEL_MENTION, ROLE_MENTION, USER_MENTION};

fn id_from(regex: &Regex, input: &str) -> Option<u64> {
    regex
        .captures(input.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .filter(|id| *id != 0)
}

/// Parses `<@id>`, `<@!id>` or a bare ID.
pub fn user_mention_to_id(input: &str) -> Option<u64> {
    id_from(&USER_MENTION, input)
}

/// Parses `<#id>` or a bare ID.
pub fn channel_mention_to_id(input: &str) -> Option<u64> {
    id_from(&CHANNEL_MENTION, input)
}

/// Parses `<@&id>` or a bare ID.
pub fn role_mention_to_id(input: &str) -> Option<u64> {
    id_from(&ROLE_MENTION, input)
}

/// Both mention forms of `id`, the plain one first.
pub fn mention_prefixes(id: u64) -> [String; 2] {
    [format!("<@{id}>"), format!("<@!{id}>")]
}
