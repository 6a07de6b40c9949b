use crate::errors::ChatError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Generates a `Debug` impl that redacts secret fields.
///
/// Field specifiers:
/// - `field_name`: printed normally via `&self.field_name`
/// - `redact(field_name)`: `String` field: shows `[empty]` or `[REDACTED]`
macro_rules! redact_debug {
    (@field $builder:ident, $self:ident, redact($field:ident)) => {
        $builder.field(
            stringify!($field),
            &if $self.$field.is_empty() {
                "[empty]"
            } else {
                "[REDACTED]"
            },
        );
    };
    (@field $builder:ident, $self:ident, $field:ident) => {
        $builder.field(stringify!($field), &$self.$field);
    };

    (@fields $builder:ident, $self:ident,) => {};
    (@fields $builder:ident, $self:ident, redact($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, $field:ident, $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, $field);
        redact_debug!(@fields $builder, $self, $($rest)*);
    };

    ($struct_name:ident, $($fields:tt)*) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($struct_name));
                redact_debug!(@fields builder, self, $($fields)*);
                builder.finish()
            }
        }
    };
}

/// Upper bound for any page the client asks the server for.
pub const MAX_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

fn default_base_url() -> String {
    "http://127.0.0.1:3000/api".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_error_body() -> usize {
    64 * 1024
}

/// Where the BondVoyage REST API lives and how to talk to it.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url", rename = "baseUrl")]
    pub base_url: String,
    /// Bearer token sent with every request. Empty means anonymous.
    #[serde(default, rename = "authToken")]
    pub auth_token: String,
    #[serde(default = "default_connect_timeout", rename = "connectTimeoutSecs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout", rename = "requestTimeoutSecs")]
    pub request_timeout_secs: u64,
    /// Cap on how much of an error response body is read into the error message.
    #[serde(default = "default_max_error_body", rename = "maxErrorBodyBytes")]
    pub max_error_body_bytes: usize,
}

redact_debug!(
    ApiConfig,
    base_url,
    redact(auth_token),
    connect_timeout_secs,
    request_timeout_secs,
    max_error_body_bytes,
);

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: String::new(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            max_error_body_bytes: default_max_error_body(),
        }
    }
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Chat sync
// ---------------------------------------------------------------------------

fn default_page_size() -> u32 {
    30
}

fn default_poll_limit() -> u32 {
    10
}

fn default_poll_interval_ms() -> i64 {
    10_000
}

fn default_max_attachments() -> usize {
    5
}

fn default_max_attachment_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSyncConfig {
    /// Messages requested by the initial load, refresh and each `load_more`.
    #[serde(default = "default_page_size", rename = "pageSize")]
    pub page_size: u32,
    /// Messages requested by each background poll.
    #[serde(default = "default_poll_limit", rename = "pollLimit")]
    pub poll_limit: u32,
    /// Poll period in milliseconds. Zero or negative disables polling.
    #[serde(default = "default_poll_interval_ms", rename = "pollIntervalMs")]
    pub poll_interval_ms: i64,
    #[serde(default = "default_max_attachments", rename = "maxAttachments")]
    pub max_attachments: usize,
    #[serde(
        default = "default_max_attachment_bytes",
        rename = "maxAttachmentBytes"
    )]
    pub max_attachment_bytes: u64,
}

impl Default for ChatSyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            poll_limit: default_poll_limit(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attachments: default_max_attachments(),
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}

impl ChatSyncConfig {
    /// Poll period, or `None` when polling is disabled.
    pub fn poll_interval(&self) -> Option<Duration> {
        u64::try_from(self.poll_interval_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatSyncConfig,
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ChatError> {
        self.validate_api()?;
        self.validate_chat()?;
        Ok(())
    }

    /// Apply `BONDVOYAGE_API_URL` / `BONDVOYAGE_API_TOKEN` style overrides.
    ///
    /// `lookup` is usually `std::env::var(..).ok()`; tests pass a closure.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BONDVOYAGE_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        if let Some(token) = lookup("BONDVOYAGE_API_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.api.auth_token = token.trim().to_string();
        }
    }

    fn validate_api(&self) -> Result<(), ChatError> {
        let parsed = url::Url::parse(&self.api.base_url).map_err(|e| {
            ChatError::Config(format!(
                "api.baseUrl '{}' is not a valid URL: {}",
                self.api.base_url, e
            ))
        })?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ChatError::Config(format!(
                    "api.baseUrl must use http or https, got '{}'",
                    other
                )));
            }
        }
        if parsed.scheme() == "http"
            && !self.api.auth_token.is_empty()
            && !matches!(parsed.host_str(), Some("127.0.0.1" | "localhost" | "::1"))
        {
            warn!(
                "api.authToken is configured for a plain-http, non-local base URL ({})",
                self.api.base_url
            );
        }
        if self.api.connect_timeout_secs == 0 {
            return Err(ChatError::Config(
                "api.connectTimeoutSecs must be > 0".into(),
            ));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ChatError::Config(
                "api.requestTimeoutSecs must be > 0".into(),
            ));
        }
        if self.api.max_error_body_bytes == 0 {
            return Err(ChatError::Config("api.maxErrorBodyBytes must be > 0".into()));
        }
        Ok(())
    }

    fn validate_chat(&self) -> Result<(), ChatError> {
        let c = &self.chat;
        if c.page_size == 0 || c.page_size > MAX_PAGE_SIZE {
            return Err(ChatError::Config(format!(
                "chat.pageSize must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if c.poll_limit == 0 || c.poll_limit > MAX_PAGE_SIZE {
            return Err(ChatError::Config(format!(
                "chat.pollLimit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if c.poll_interval().is_some_and(|d| d < Duration::from_millis(500)) {
            warn!(
                "chat.pollIntervalMs {} is very aggressive, consider >= 500",
                c.poll_interval_ms
            );
        }
        if c.max_attachment_bytes == 0 {
            return Err(ChatError::Config(
                "chat.maxAttachmentBytes must be > 0".into(),
            ));
        }
        Ok(())
    }
}
