/// Change notifications published by a [`ChatSyncEngine`](crate::chat::ChatSyncEngine).
///
/// Delivered over a `tokio::sync::broadcast` channel; slow subscribers lag
/// and lose events rather than holding the engine back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The whole list was (re)loaded from the server.
    Loaded { count: usize },
    /// New messages were added at the end, oldest first.
    Appended { ids: Vec<String> },
    /// Older history was added at the front.
    Prepended { count: usize },
    UnreadChanged { count: u64 },
}

/// Capacity of the per-engine event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
