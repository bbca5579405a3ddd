//! A transport over stdin/stdout, for running the engine locally.
//!
//! Each input line is one message. Lines may start with `[user@channel]` to pick the author and
//! channel, or `[user@dm]` for a direct message; anything else comes from user 1 in channel 1.
//! Every console channel lives in guild [`CONSOLE_GUILD`].

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

use crate::command::messagebuilder::MessageBuilder;
use crate::gateway_handler::{Invocation, InvocationContent, ReplyTarget, ResponseHandle, Transport};

pub const CONSOLE_GUILD: Id<GuildMarker> = Id::new(1);

const DEFAULT_ID: u64 = 1;

/// Parses one input line. Returns `None` for blank lines and malformed headers.
pub fn parse_line(line: &str, message_id: u64) -> Option<Invocation> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (author, channel, text) = match line.strip_prefix('[') {
        Some(rest) => {
            let (header, text) = rest.split_once(']')?;
            let (user, channel) = header.split_once('@')?;
            let user = user.trim().parse::<u64>().ok()?;
            let channel = match channel.trim() {
                "dm" => None,
                id => Some(id.parse::<u64>().ok()?),
            };
            (user, channel, text.trim_start())
        },
        None => (DEFAULT_ID, Some(DEFAULT_ID), line),
    };

    let author = Id::new_checked(author)?;
    Some(Invocation {
        message_id,
        author,
        author_is_bot: false,
        // direct messages use the author's ID as the channel
        channel_id: Id::new_checked(channel.unwrap_or(author.get()))?,
        guild_id: channel.map(|_| CONSOLE_GUILD),
        channel_nsfw: false,
        content: InvocationContent::Text(text.to_owned()),
    })
}

pub struct ConsoleTransport {
    stdout: Mutex<Stdout>,
    next_id: AtomicU64,
}
impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            stdout: Mutex::new(tokio::io::stdout()),
            next_id: AtomicU64::new(1),
        }
    }
}
impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(&self, target: ReplyTarget, message: MessageBuilder) -> anyhow::Result<ResponseHandle> {
        let mut stdout = self.stdout.lock().await;
        stdout
            .write_all(format!("[{target}] {}\n", message.trimmed_content()).as_bytes())
            .await?;
        stdout.flush().await?;

        Ok(ResponseHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_pick_author_and_channel() {
        let invocation = parse_line("[5@7] !ping", 3).unwrap();
        assert_eq!(invocation.author.get(), 5);
        assert_eq!(invocation.channel_id.get(), 7);
        assert_eq!(invocation.guild_id, Some(CONSOLE_GUILD));
        assert_eq!(invocation.text(), Some("!ping"));
        assert_eq!(invocation.message_id, 3);
    }

    #[test]
    fn direct_messages_and_plain_lines() {
        let dm = parse_line("[5@dm] help", 1).unwrap();
        assert!(dm.is_direct());
        assert_eq!(dm.channel_id.get(), 5);

        let plain = parse_line("!ping", 1).unwrap();
        assert_eq!(plain.author.get(), DEFAULT_ID);
        assert_eq!(plain.guild_id, Some(CONSOLE_GUILD));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        assert!(parse_line("   ", 1).is_none());
        assert!(parse_line("[5] !ping", 1).is_none());
        assert!(parse_line("[0@1] !ping", 1).is_none());
        assert!(parse_line("[x@1] !ping", 1).is_none());
    }
}
