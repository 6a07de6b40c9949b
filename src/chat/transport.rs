use crate::chat::types::{FileUpload, Message, MessagePage};
use crate::errors::ChatResult;
use async_trait::async_trait;

/// The request/response boundary between the sync engine and the backend.
///
/// Implementations only move data; ordering, dedup and unread bookkeeping
/// all live in the engine.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Fetch up to `limit` messages, newest first. `cursor` selects an older
    /// page; `None` means "the most recent messages".
    async fn fetch_messages(
        &self,
        booking_id: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> ChatResult<MessagePage>;

    /// Create a message. Implementations switch to multipart when `files`
    /// is non-empty.
    async fn send_message(
        &self,
        booking_id: &str,
        content: &str,
        files: &[FileUpload],
    ) -> ChatResult<Message>;

    /// Ask the backend assistant to draft a reply. May be slow.
    async fn generate_ai_suggestion(&self, booking_id: &str) -> ChatResult<Message>;

    /// Mark the conversation read for the current user. Idempotent.
    async fn mark_read(&self, booking_id: &str) -> ChatResult<()>;

    async fn unread_count(&self, booking_id: &str) -> ChatResult<u64>;
}
