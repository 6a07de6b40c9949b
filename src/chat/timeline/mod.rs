use crate::chat::types::{Message, MessageKind};
use std::collections::HashSet;

/// Ordered (oldest → newest), id-unique list of messages for one conversation.
///
/// All merge paths go through a membership test against every held id, not
/// just the tail: overlapping poll windows can deliver an id we already hold
/// anywhere in the list.
#[derive(Debug, Clone, Default)]
pub struct MessageTimeline {
    messages: Vec<Message>,
    ids: HashSet<String>,
}

impl MessageTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a server page (newest first).
    pub fn from_page(newest_first: Vec<Message>) -> Self {
        let mut timeline = Self::new();
        timeline.append_page(newest_first);
        timeline
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn first(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(|m| m.id.as_str())
    }

    pub fn of_kind(&self, kind: MessageKind) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.kind == kind)
    }

    /// Append a single message unless its id is already held.
    /// Returns whether it was added.
    pub fn push(&mut self, message: Message) -> bool {
        if self.ids.contains(&message.id) {
            return false;
        }
        self.ids.insert(message.id.clone());
        self.messages.push(message);
        true
    }

    /// Merge a newest-first page at the end of the timeline.
    ///
    /// The page is reversed, then each unseen message is appended in that
    /// order. Returns the ids that were added.
    pub fn append_page(&mut self, newest_first: Vec<Message>) -> Vec<String> {
        let mut added = Vec::new();
        for message in newest_first.into_iter().rev() {
            let id = message.id.clone();
            if self.push(message) {
                added.push(id);
            }
        }
        added
    }

    /// Merge a newest-first page of older history at the front.
    ///
    /// Returns how many messages were inserted.
    pub fn prepend_page(&mut self, newest_first: Vec<Message>) -> usize {
        let mut older: Vec<Message> = Vec::with_capacity(newest_first.len());
        for message in newest_first.into_iter().rev() {
            if self.ids.insert(message.id.clone()) {
                older.push(message);
            }
        }
        let inserted = older.len();
        if inserted > 0 {
            older.append(&mut self.messages);
            self.messages = older;
        }
        inserted
    }

    /// Throw everything away and rebuild from a fresh newest-first page.
    pub fn replace(&mut self, newest_first: Vec<Message>) {
        *self = Self::from_page(newest_first);
    }
}

#[cfg(test)]
mod tests;
