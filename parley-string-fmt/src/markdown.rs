use std::fmt::Display;

use lazy_static::lazy_static;
use regex::Regex;

/// Longest message body most chat transports accept in one go.
pub const MESSAGE_LIMIT: usize = 2000;

lazy_static! {
    static ref BACKTICK: Regex = Regex::new(r"`").unwrap();
    static ref MASS_MENTION: Regex = Regex::new(r"@(everyone|here)").unwrap();
}

pub trait Markdown {
    fn escape_codestring(&self) -> String;
    /// Defuses `@everyone` and `@here` so echoed user input cannot ping a whole channel.
    fn escape_mentions(&self) -> String;

    fn codestring(&self) -> String;
}

fn cut(t: impl Display, to: usize) -> String {
    t.to_string().chars().take(to).collect::<String>()
}

impl<T> Markdown for T
where
    T: Display,
{
    fn escape_codestring(&self) -> String {
        BACKTICK.replace_all(&cut(self, MESSAGE_LIMIT - 2), "'").into_owned()
    }

    fn escape_mentions(&self) -> String {
        MASS_MENTION
            .replace_all(&self.to_string(), "@\u{200b}$1")
            .into_owned()
    }

    fn codestring(&self) -> String {
        format!("`{}`", self.escape_codestring())
    }
}

/// Formats a list of candidates the user has to pick between, e.g. when a partial command name
/// matched more than one command.
pub fn disambiguation<I, S>(items: I, label: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: Display,
{
    let list = items
        .into_iter()
        .map(|item| item.to_string().codestring())
        .collect::<Vec<_>>()
        .join(", ");

    format!("Multiple {label} found, please be more specific: {list}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codestring_replaces_backticks() {
        assert_eq!("a`b".codestring(), "`a'b`");
        assert_eq!("x".repeat(MESSAGE_LIMIT + 5).codestring().len(), MESSAGE_LIMIT);
    }

    #[test]
    fn mass_mentions_are_defused() {
        assert_eq!("hi @everyone".escape_mentions(), "hi @\u{200b}everyone");
        assert_eq!("mail me@home".escape_mentions(), "mail me@home");
    }

    #[test]
    fn disambiguation_lists_every_candidate() {
        let text = disambiguation(["ping", "pingall"], "commands");
        assert_eq!(
            text,
            "Multiple commands found, please be more specific: `ping`, `pingall`"
        );
    }
}
