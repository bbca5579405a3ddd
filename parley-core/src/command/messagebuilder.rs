use parley_string_fmt::markdown::MESSAGE_LIMIT;

/// Content of one outgoing message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageBuilder {
    pub content: Option<String>,
    /// Whether the transport should suppress every mention in the content.
    pub suppress_mentions: bool,
}
impl MessageBuilder {
    /// Returns the content trimmed to fit in one message.
    pub fn trimmed_content(&self) -> String {
        let mut content = self.content.clone().unwrap_or_default();
        if let Some((truncated_byte_index, _)) = content.char_indices().nth(MESSAGE_LIMIT) {
            content.truncate(truncated_byte_index);
        }
        content
    }
}

impl From<&str> for MessageBuilder {
    fn from(value: &str) -> Self {
        Self {
            content: Some(value.into()),
            suppress_mentions: true,
        }
    }
}
impl From<String> for MessageBuilder {
    fn from(value: String) -> Self {
        Self {
            content: Some(value),
            suppress_mentions: true,
        }
    }
}
