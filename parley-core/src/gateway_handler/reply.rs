use anyhow::Context;
use tracing::warn;

use super::{ReplyTarget, ResponseHandle, Transport};
use crate::command::messagebuilder::MessageBuilder;

/// Sends `builder` to `target`, logging failures instead of returning them.
pub async fn send_logged(
    transport: &dyn Transport,
    target: ReplyTarget,
    builder: impl Into<MessageBuilder>,
) -> Option<ResponseHandle> {
    match transport.send(target, builder.into()).await {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to send message to {target}: {e:#}");
            None
        },
    }
}

/// Sends `builder` to `primary`. If that fails, sends `fallback_notice` followed by the message
/// itself to `fallback`.
pub async fn send_with_fallback(
    transport: &dyn Transport,
    primary: ReplyTarget,
    fallback: ReplyTarget,
    builder: impl Into<MessageBuilder>,
    fallback_notice: &str,
) -> anyhow::Result<ResponseHandle> {
    let builder = builder.into();
    match transport.send(primary, builder.clone()).await {
        Ok(handle) => Ok(handle),
        Err(e) => {
            warn!("Failed to send message to {primary}, falling back to {fallback}: {e:#}");
            let _ = send_logged(transport, fallback, fallback_notice).await;
            transport
                .send(fallback, builder)
                .await
                .with_context(|| format!("Failed to send message to {fallback}"))
        },
    }
}
