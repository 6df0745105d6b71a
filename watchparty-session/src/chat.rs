use watchparty_core::ChatMessage;

/// Append-only chat history for the current room, in local receipt order.
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn push(&mut self, message: ChatMessage) {
        self.entries.push(message);
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
