//! Routes follow-up messages to invocations that are waiting on a reply.
//!
//! While an argument prompt is open, every message from the same user in the same channel is
//! delivered to the waiting invocation instead of being dispatched as a new command.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};

type ConversationKey = (Id<UserMarker>, Id<ChannelMarker>);

struct Pending {
    id: u64,
    sender: UnboundedSender<String>,
}

#[derive(Clone, Default)]
pub struct Conversations {
    pending: Arc<Mutex<HashMap<ConversationKey, Pending>>>,
    next_id: Arc<AtomicU64>,
}
impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts listening for replies from `user` in `channel`. An older conversation for the same
    /// pair is superseded and will not receive anything further.
    pub fn open(&self, user: Id<UserMarker>, channel: Id<ChannelMarker>) -> Conversation {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = unbounded_channel();

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((user, channel), Pending { id, sender });

        if previous.is_some() {
            tracing::debug!("conversation for {user} in {channel} superseded");
        }

        Conversation {
            key: (user, channel),
            id,
            receiver,
            conversations: self.clone(),
        }
    }

    /// Delivers `content` to the conversation waiting on `user` in `channel`.
    ///
    /// Returns whether the message was consumed.
    pub fn offer(&self, user: Id<UserMarker>, channel: Id<ChannelMarker>, content: &str) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let Some(conversation) = pending.get(&(user, channel)) else {
            return false;
        };

        if conversation.sender.send(content.to_owned()).is_ok() {
            true
        } else {
            pending.remove(&(user, channel));
            false
        }
    }

    pub fn is_pending(&self, user: Id<UserMarker>, channel: Id<ChannelMarker>) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&(user, channel))
    }

    fn close(&self, key: ConversationKey, id: u64) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.get(&key).is_some_and(|p| p.id == id) {
            pending.remove(&key);
        }
    }
}

/// One open conversation. Dropping it stops routing replies to it.
pub struct Conversation {
    key: ConversationKey,
    id: u64,
    receiver: UnboundedReceiver<String>,
    conversations: Conversations,
}
impl Conversation {
    /// Waits up to `wait` for the next reply. `None` if nothing arrived in time or the
    /// conversation was superseded.
    pub async fn next(&mut self, wait: Duration) -> Option<String> {
        tokio::time::timeout(wait, self.receiver.recv()).await.ok().flatten()
    }
}
impl Drop for Conversation {
    fn drop(&mut self) {
        self.conversations.close(self.key, self.id);
    }
}
