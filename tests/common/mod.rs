// Shared test helpers: not all items used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use bondvoyage::chat::{ChatTransport, FileUpload, Message, MessageKind, MessagePage};
use bondvoyage::{ChatError, ChatResult};
use chrono::{Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Fetch {
        cursor: Option<String>,
        limit: u32,
    },
    Send {
        content: String,
        files: Vec<String>,
    },
    Suggest,
    MarkRead,
    Unread,
}

/// Transport that replays queued responses in order and records every call.
///
/// Fetches without a cursor pop from `latest`, fetches with a cursor pop
/// from `older`. An empty queue answers with an empty page / zero.
#[derive(Default)]
pub struct MockChatTransport {
    latest: Mutex<VecDeque<ChatResult<MessagePage>>>,
    older: Mutex<VecDeque<ChatResult<MessagePage>>>,
    sends: Mutex<VecDeque<ChatResult<Message>>>,
    suggestions: Mutex<VecDeque<ChatResult<Message>>>,
    mark_reads: Mutex<VecDeque<ChatResult<()>>>,
    unread: Mutex<VecDeque<ChatResult<u64>>>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl MockChatTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_latest(&self, r: ChatResult<MessagePage>) -> &Self {
        self.latest.lock().unwrap().push_back(r);
        self
    }

    pub fn push_older(&self, r: ChatResult<MessagePage>) -> &Self {
        self.older.lock().unwrap().push_back(r);
        self
    }

    pub fn push_send(&self, r: ChatResult<Message>) -> &Self {
        self.sends.lock().unwrap().push_back(r);
        self
    }

    pub fn push_suggestion(&self, r: ChatResult<Message>) -> &Self {
        self.suggestions.lock().unwrap().push_back(r);
        self
    }

    pub fn push_mark_read(&self, r: ChatResult<()>) -> &Self {
        self.mark_reads.lock().unwrap().push_back(r);
        self
    }

    pub fn push_unread(&self, r: ChatResult<u64>) -> &Self {
        self.unread.lock().unwrap().push_back(r);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn send_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RecordedCall::Send { .. }))
            .count()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatTransport for MockChatTransport {
    async fn fetch_messages(
        &self,
        _booking_id: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> ChatResult<MessagePage> {
        self.record(RecordedCall::Fetch {
            cursor: cursor.map(str::to_string),
            limit,
        });
        let queue = if cursor.is_some() {
            &self.older
        } else {
            &self.latest
        };
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(MessagePage::default()))
    }

    async fn send_message(
        &self,
        _booking_id: &str,
        content: &str,
        files: &[FileUpload],
    ) -> ChatResult<Message> {
        self.record(RecordedCall::Send {
            content: content.to_string(),
            files: files.iter().map(|f| f.file_name.clone()).collect(),
        });
        self.sends
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(user_msg("echo", 99)))
    }

    async fn generate_ai_suggestion(&self, _booking_id: &str) -> ChatResult<Message> {
        self.record(RecordedCall::Suggest);
        self.suggestions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ai_msg("ai-default", 99)))
    }

    async fn mark_read(&self, _booking_id: &str) -> ChatResult<()> {
        self.record(RecordedCall::MarkRead);
        self.mark_reads.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn unread_count(&self, _booking_id: &str) -> ChatResult<u64> {
        self.record(RecordedCall::Unread);
        self.unread.lock().unwrap().pop_front().unwrap_or(Ok(0))
    }
}

// --- Message builders ---

/// A message created `minute` minutes after a fixed base time.
pub fn message(id: &str, kind: MessageKind, minute: i64) -> Message {
    Message {
        id: id.to_string(),
        sender_user_id: match kind {
            MessageKind::User => Some("traveler-1".into()),
            MessageKind::Admin => Some("agent-7".into()),
            MessageKind::AiSuggestion | MessageKind::System => None,
        },
        kind,
        content: format!("content of {}", id),
        attachments: vec![],
        created_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap() + Duration::minutes(minute),
    }
}

pub fn user_msg(id: &str, minute: i64) -> Message {
    message(id, MessageKind::User, minute)
}

pub fn ai_msg(id: &str, minute: i64) -> Message {
    message(id, MessageKind::AiSuggestion, minute)
}

/// A newest-first page; `ids` are given newest first, as the server sends them.
pub fn page(ids: &[&str], next_cursor: Option<&str>) -> MessagePage {
    let n = ids.len() as i64;
    MessagePage {
        items: ids
            .iter()
            .enumerate()
            .map(|(i, id)| user_msg(id, n - i as i64))
            .collect(),
        has_more: next_cursor.is_some(),
        next_cursor: next_cursor.map(str::to_string),
    }
}

pub fn server_error() -> ChatError {
    ChatError::Transport {
        status: Some(503),
        message: "API error (503): unavailable".into(),
        retryable: true,
    }
}

pub fn ids(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}
