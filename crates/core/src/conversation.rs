//! Conversation-related types.

use std::slice;

use toolchat_model::ModelMessage;

/// Represents a conversation.
///
/// The transcript is an append-only log: messages keep their insertion
/// order and are never removed or rewritten.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    messages: Vec<ModelMessage>,
}

impl Conversation {
    /// Creates an empty conversation.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to the end of the transcript.
    #[inline]
    pub fn push(&mut self, msg: ModelMessage) {
        trace!("appending {} message #{}", msg.role, self.messages.len());
        self.messages.push(msg);
    }

    /// Returns all messages in transcript order.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> Option<&ModelMessage> {
        self.messages.last()
    }

    /// Returns an iterator over the messages in transcript order.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, ModelMessage> {
        self.messages.iter()
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been said yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a ModelMessage;
    type IntoIter = slice::Iter<'a, ModelMessage>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use toolchat_model::Role;

    use super::*;

    #[test]
    fn test_append_keeps_earlier_entries() {
        let mut conversation = Conversation::new();
        conversation.push(ModelMessage::system("Be concise."));
        conversation.push(ModelMessage::user("Hi"));
        let before = conversation.messages().to_vec();

        conversation.push(ModelMessage::assistant("Hello!", vec![]));
        conversation.push(ModelMessage::tool("{}"));

        assert_eq!(conversation.len(), 4);
        assert_eq!(&conversation.messages()[..2], before.as_slice());
        let roles: Vec<Role> = conversation.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool]
        );
        assert_eq!(conversation.last().unwrap().content, "{}");
    }
}
