pub mod engine;
pub mod events;
pub mod http;
pub mod poller;
pub mod timeline;
pub mod transport;
pub mod types;

pub use engine::{ChatSyncEngine, ConversationState, SyncSettings};
pub use events::ChatEvent;
pub use http::HttpChatTransport;
pub use poller::Poller;
pub use timeline::MessageTimeline;
pub use transport::ChatTransport;
pub use types::{Attachment, FileUpload, Message, MessageKind, MessagePage, UnreadCount};
