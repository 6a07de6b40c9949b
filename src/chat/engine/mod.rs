use crate::chat::events::{ChatEvent, EVENT_CHANNEL_CAPACITY};
use crate::chat::http::HttpChatTransport;
use crate::chat::poller::Poller;
use crate::chat::timeline::MessageTimeline;
use crate::chat::transport::ChatTransport;
use crate::chat::types::{FileUpload, Message, MessageKind};
use crate::config::{ChatSyncConfig, Config};
use crate::errors::{ChatError, ChatResult};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Tunables for one engine, usually derived from [`ChatSyncConfig`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub page_size: u32,
    pub poll_limit: u32,
    /// `None` disables background polling.
    pub poll_interval: Option<Duration>,
    pub max_attachments: usize,
    pub max_attachment_bytes: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&ChatSyncConfig::default())
    }
}

impl From<&ChatSyncConfig> for SyncSettings {
    fn from(c: &ChatSyncConfig) -> Self {
        Self {
            page_size: c.page_size,
            poll_limit: c.poll_limit,
            poll_interval: c.poll_interval(),
            max_attachments: c.max_attachments,
            max_attachment_bytes: c.max_attachment_bytes,
        }
    }
}

/// Point-in-time copy of a conversation, for rendering.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub unread_count: u64,
    pub is_loading: bool,
    pub is_sending: bool,
    pub is_generating_ai: bool,
}

impl ConversationState {
    pub fn messages_of_kind(&self, kind: MessageKind) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.kind == kind)
    }
}

#[derive(Default)]
struct SyncState {
    timeline: MessageTimeline,
    next_cursor: Option<String>,
    has_more: bool,
    unread_count: u64,
    /// Ticket of the reload whose page is currently applied.
    applied_reload: u64,
}

/// Holds a busy flag for the duration of one operation and clears it on
/// every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Counts in-flight page loads; `is_loading` is true while any are running.
struct LoadGuard<'a>(&'a AtomicUsize);

impl<'a> LoadGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }

    /// Enter only if no other load is running.
    fn enter_exclusive(counter: &'a AtomicUsize) -> Option<Self> {
        counter
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(counter))
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

struct Shared {
    booking_id: String,
    transport: Arc<dyn ChatTransport>,
    settings: SyncSettings,
    state: Mutex<SyncState>,
    loads_in_flight: AtomicUsize,
    sending: AtomicBool,
    generating_ai: AtomicBool,
    /// Bumped every time the list is replaced wholesale; pages fetched
    /// against an older list are discarded.
    epoch: AtomicU64,
    /// Issued to each reload when it starts. Only a reload newer than the
    /// applied one may replace the list.
    reload_seq: AtomicU64,
    closed: AtomicBool,
    events: broadcast::Sender<ChatEvent>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn set_unread(&self, count: u64) {
        let changed = {
            let mut state = self.lock_state();
            let changed = state.unread_count != count;
            state.unread_count = count;
            changed
        };
        if changed {
            self.emit(ChatEvent::UnreadChanged { count });
        }
    }

    /// Fetch the newest page and replace the held list with it.
    async fn load_latest(&self) -> ChatResult<()> {
        let _loading = LoadGuard::enter(&self.loads_in_flight);
        let ticket = self.reload_seq.fetch_add(1, Ordering::AcqRel) + 1;

        let (page, unread) = tokio::join!(
            self.transport
                .fetch_messages(&self.booking_id, None, self.settings.page_size),
            self.transport.unread_count(&self.booking_id),
        );
        let page = page?;

        if self.is_closed() {
            debug!(booking_id = %self.booking_id, "ignoring page load after shutdown");
            return Ok(());
        }

        let count = page.items.len();
        {
            let mut state = self.lock_state();
            if ticket < state.applied_reload {
                debug!(booking_id = %self.booking_id, ticket, "newer reload already applied, dropping this one");
                return Ok(());
            }
            state.applied_reload = ticket;
            self.epoch.fetch_add(1, Ordering::AcqRel);
            state.timeline.replace(page.items);
            state.has_more = page.has_more;
            state.next_cursor = page.next_cursor;
        }
        debug!(booking_id = %self.booking_id, count, "conversation loaded");
        self.emit(ChatEvent::Loaded { count });

        match unread {
            Ok(n) => self.set_unread(n),
            Err(e) => warn!(booking_id = %self.booking_id, "unread count unavailable: {}", e),
        }
        Ok(())
    }

    /// One background sync pass. Never fails; returns how many messages were added.
    async fn poll(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        metrics::counter!("bondvoyage_chat_polls_total").increment(1);

        let page = match self
            .transport
            .fetch_messages(&self.booking_id, None, self.settings.poll_limit)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                metrics::counter!("bondvoyage_chat_poll_failures_total").increment(1);
                warn!(booking_id = %self.booking_id, "chat poll failed: {}", e);
                return 0;
            }
        };
        if self.is_closed() {
            return 0;
        }

        let added = self.lock_state().timeline.append_page(page.items);
        let added_count = added.len();
        if added_count > 0 {
            metrics::counter!("bondvoyage_chat_messages_merged_total")
                .increment(added_count as u64);
            debug!(booking_id = %self.booking_id, added = added_count, "poll merged new messages");
            self.emit(ChatEvent::Appended { ids: added });
        }

        match self.transport.unread_count(&self.booking_id).await {
            Ok(n) if !self.is_closed() => self.set_unread(n),
            Ok(_) => {}
            Err(e) => warn!(booking_id = %self.booking_id, "unread refresh failed: {}", e),
        }
        added_count
    }

    /// Append a message we just created, unless a poll beat us to it.
    fn accept(&self, message: Message) {
        if self.is_closed() {
            return;
        }
        let id = message.id.clone();
        if self.lock_state().timeline.push(message) {
            self.emit(ChatEvent::Appended { ids: vec![id] });
        }
    }
}

/// Keeps one booking's conversation in sync with the server.
///
/// Owns the message list, pagination cursor, unread count and the polling
/// timer. One engine per open conversation view; call [`shutdown`] (or drop
/// the engine) when the view goes away.
///
/// [`shutdown`]: ChatSyncEngine::shutdown
pub struct ChatSyncEngine {
    shared: Arc<Shared>,
    poller: Mutex<Option<Poller>>,
}

impl ChatSyncEngine {
    pub fn new(
        booking_id: impl Into<String>,
        transport: Arc<dyn ChatTransport>,
        settings: SyncSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                booking_id: booking_id.into(),
                transport,
                settings,
                state: Mutex::new(SyncState::default()),
                loads_in_flight: AtomicUsize::new(0),
                sending: AtomicBool::new(false),
                generating_ai: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                reload_seq: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                events,
            }),
            poller: Mutex::new(None),
        }
    }

    /// Engine talking to the REST API described by `config`.
    pub fn from_config(booking_id: impl Into<String>, config: &Config) -> Self {
        let transport: Arc<dyn ChatTransport> = Arc::new(HttpChatTransport::new(&config.api));
        Self::new(booking_id, transport, SyncSettings::from(&config.chat))
    }

    pub fn booking_id(&self) -> &str {
        &self.shared.booking_id
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.shared.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.shared.events.subscribe()
    }

    fn ensure_open(&self) -> ChatResult<()> {
        if self.shared.is_closed() {
            return Err(ChatError::Closed);
        }
        Ok(())
    }

    /// Load the newest page and unread count, and start background polling.
    ///
    /// Polling starts even when the first load fails, so a later tick can
    /// fill the list; the load error is still returned. Calling this again
    /// reloads without spawning a second poller.
    pub async fn initialize(&self) -> ChatResult<()> {
        self.ensure_open()?;
        if self.shared.booking_id.trim().is_empty() {
            return Err(ChatError::InvalidInput("booking id is empty".into()));
        }
        let loaded = self.shared.load_latest().await;
        self.start_polling();
        loaded?;
        info!(booking_id = %self.shared.booking_id, "chat conversation initialized");
        Ok(())
    }

    /// Reload from scratch, replacing the held list.
    pub async fn refresh(&self) -> ChatResult<()> {
        self.ensure_open()?;
        self.shared.load_latest().await
    }

    /// Fetch the next page of older history and put it in front.
    ///
    /// No-op when there is nothing older or another load is running.
    pub async fn load_more(&self) -> ChatResult<()> {
        self.ensure_open()?;
        let shared = &self.shared;
        let (cursor, epoch) = {
            let state = shared.lock_state();
            match (&state.next_cursor, state.has_more) {
                (Some(cursor), true) => (cursor.clone(), shared.epoch.load(Ordering::Acquire)),
                _ => return Ok(()),
            }
        };
        let Some(_loading) = LoadGuard::enter_exclusive(&shared.loads_in_flight) else {
            debug!(booking_id = %shared.booking_id, "load_more skipped, load in flight");
            return Ok(());
        };

        let page = shared
            .transport
            .fetch_messages(&shared.booking_id, Some(&cursor), shared.settings.page_size)
            .await?;
        if shared.is_closed() {
            return Ok(());
        }

        let inserted = {
            let mut state = shared.lock_state();
            if shared.epoch.load(Ordering::Acquire) != epoch
                || state.next_cursor.as_deref() != Some(cursor.as_str())
            {
                debug!(booking_id = %shared.booking_id, "discarding stale history page");
                return Ok(());
            }
            let inserted = state.timeline.prepend_page(page.items);
            state.has_more = page.has_more;
            state.next_cursor = page.next_cursor;
            inserted
        };
        if inserted > 0 {
            shared.emit(ChatEvent::Prepended { count: inserted });
        }
        Ok(())
    }

    /// Run one background sync pass now. Failures are logged, never returned.
    pub async fn poll(&self) -> usize {
        self.shared.poll().await
    }

    /// Send a message with optional attachments.
    ///
    /// Rejected locally when there is neither text nor a file, when the files
    /// break the configured limits, or when another send is still running.
    pub async fn send_message(&self, content: &str, files: &[FileUpload]) -> ChatResult<Message> {
        self.ensure_open()?;
        if content.trim().is_empty() && files.is_empty() {
            return Err(ChatError::InvalidInput(
                "message needs text or at least one attachment".into(),
            ));
        }
        self.validate_files(files)?;

        let Some(_sending) = BusyGuard::acquire(&self.shared.sending) else {
            return Err(ChatError::Busy("send_message"));
        };
        let message = self
            .shared
            .transport
            .send_message(&self.shared.booking_id, content, files)
            .await?;
        self.shared.accept(message.clone());
        Ok(message)
    }

    /// Ask the assistant for a suggested reply. Independent of `send_message`.
    pub async fn generate_ai_suggestion(&self) -> ChatResult<Message> {
        self.ensure_open()?;
        let Some(_generating) = BusyGuard::acquire(&self.shared.generating_ai) else {
            return Err(ChatError::Busy("generate_ai_suggestion"));
        };
        let message = self
            .shared
            .transport
            .generate_ai_suggestion(&self.shared.booking_id)
            .await?;
        if message.kind != MessageKind::AiSuggestion {
            debug!(kind = %message.kind, "suggestion endpoint returned a non-AI message");
        }
        self.shared.accept(message.clone());
        Ok(message)
    }

    /// Mark the conversation read. The unread count drops to zero only once
    /// the server has confirmed.
    pub async fn mark_as_read(&self) -> ChatResult<()> {
        self.ensure_open()?;
        self.shared
            .transport
            .mark_read(&self.shared.booking_id)
            .await?;
        if !self.shared.is_closed() {
            self.shared.set_unread(0);
        }
        Ok(())
    }

    fn validate_files(&self, files: &[FileUpload]) -> ChatResult<()> {
        let limits = &self.shared.settings;
        if files.len() > limits.max_attachments {
            return Err(ChatError::InvalidInput(format!(
                "too many attachments: {} (maximum {})",
                files.len(),
                limits.max_attachments
            )));
        }
        if let Some(big) = files.iter().find(|f| f.size() > limits.max_attachment_bytes) {
            return Err(ChatError::InvalidInput(format!(
                "attachment {} is {} bytes (maximum {})",
                big.file_name,
                big.size(),
                limits.max_attachment_bytes
            )));
        }
        Ok(())
    }

    fn lock_poller(&self) -> MutexGuard<'_, Option<Poller>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start background polling if enabled and not already running.
    pub fn start_polling(&self) {
        if self.shared.is_closed() {
            return;
        }
        let Some(interval) = self.shared.settings.poll_interval else {
            debug!(booking_id = %self.shared.booking_id, "polling disabled");
            return;
        };
        let mut slot = self.lock_poller();
        if slot.as_ref().is_some_and(Poller::is_running) {
            return;
        }

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let name = format!("chat:{}", self.shared.booking_id);
        *slot = Some(Poller::start(name, interval, move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(shared) if !shared.is_closed() => {
                        shared.poll().await;
                        true
                    }
                    _ => false,
                }
            }
        }));
    }

    pub fn stop_polling(&self) {
        if let Some(mut poller) = self.lock_poller().take() {
            poller.stop();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.lock_poller().as_ref().is_some_and(Poller::is_running)
    }

    /// Stop polling and refuse further work. Responses still in flight are
    /// dropped when they arrive.
    pub fn shutdown(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            info!(booking_id = %self.shared.booking_id, "chat conversation closed");
        }
        self.stop_polling();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    // --- Read accessors ---

    pub fn state(&self) -> ConversationState {
        let shared = &self.shared;
        let state = shared.lock_state();
        ConversationState {
            messages: state.timeline.messages().to_vec(),
            next_cursor: state.next_cursor.clone(),
            has_more: state.has_more,
            unread_count: state.unread_count,
            is_loading: shared.loads_in_flight.load(Ordering::Acquire) > 0,
            is_sending: shared.sending.load(Ordering::Acquire),
            is_generating_ai: shared.generating_ai.load(Ordering::Acquire),
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock_state().timeline.messages().to_vec()
    }

    pub fn message_ids(&self) -> Vec<String> {
        self.shared
            .lock_state()
            .timeline
            .ids()
            .map(str::to_string)
            .collect()
    }

    pub fn unread_count(&self) -> u64 {
        self.shared.lock_state().unread_count
    }

    pub fn has_more(&self) -> bool {
        self.shared.lock_state().has_more
    }

    pub fn next_cursor(&self) -> Option<String> {
        self.shared.lock_state().next_cursor.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.loads_in_flight.load(Ordering::Acquire) > 0
    }

    pub fn is_sending(&self) -> bool {
        self.shared.sending.load(Ordering::Acquire)
    }

    pub fn is_generating_ai(&self) -> bool {
        self.shared.generating_ai.load(Ordering::Acquire)
    }
}

impl Drop for ChatSyncEngine {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.stop_polling();
    }
}
