use crate::chat::transport::ChatTransport;
use crate::chat::types::{FileUpload, Message, MessagePage, UnreadCount};
use crate::config::ApiConfig;
use crate::errors::{ChatError, ChatResult};
use crate::utils::http::{api_http_client, read_error_body};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Some endpoints wrap their payload as `{"data": ...}`, others return it bare.
#[derive(Deserialize)]
struct Wrapped<T> {
    data: T,
}

/// [`ChatTransport`] over the BondVoyage REST API.
pub struct HttpChatTransport {
    base_url: String,
    auth_token: Option<String>,
    max_error_body_bytes: usize,
    client: Client,
}

impl HttpChatTransport {
    pub fn new(api: &ApiConfig) -> Self {
        Self::with_client(api, api_http_client(api))
    }

    pub fn with_client(api: &ApiConfig, client: Client) -> Self {
        let token = api.auth_token.trim();
        Self {
            base_url: api.base_url.trim_end_matches('/').to_string(),
            auth_token: (!token.is_empty()).then(|| token.to_string()),
            max_error_body_bytes: api.max_error_body_bytes,
            client,
        }
    }

    fn chat_url(&self, booking_id: &str, suffix: &str) -> String {
        format!(
            "{}/bookings/{}/chat/{}",
            self.base_url,
            urlencoding::encode(booking_id),
            suffix
        )
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn execute(&self, req: RequestBuilder, operation: &str) -> ChatResult<Response> {
        let resp = self.authorize(req).send().await.map_err(|e| {
            warn!("chat {} request failed: {}", operation, e);
            ChatError::from(e)
        })?;
        let status = resp.status();
        if status.is_success() {
            debug!("chat {} -> {}", operation, status);
            return Ok(resp);
        }

        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = read_error_body(resp, self.max_error_body_bytes).await;
        Err(error_from_status(status, retry_after, &body))
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> ChatResult<T> {
        let bytes = resp.bytes().await?;
        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => Ok(value),
            // Report the bare-form error: it names the offending field
            Err(bare_err) => serde_json::from_slice::<Wrapped<T>>(&bytes)
                .map(|w| w.data)
                .map_err(|_| ChatError::Decode(bare_err.to_string())),
        }
    }

    fn build_multipart(content: &str, files: &[FileUpload]) -> ChatResult<Form> {
        let mut form = Form::new().text("content", content.to_string());
        for file in files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(file.mime_type_or_default())
                .map_err(|e| {
                    ChatError::InvalidInput(format!(
                        "invalid mime type for {}: {}",
                        file.file_name, e
                    ))
                })?;
            form = form.part("files", part);
        }
        Ok(form)
    }
}

/// Map a non-success HTTP status to a typed error.
pub(crate) fn error_from_status(
    status: StatusCode,
    retry_after: Option<u64>,
    body: &str,
) -> ChatError {
    let detail = server_message(body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            body.trim().to_string()
        }
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("chat API rate limit hit (retry after {:?}s)", retry_after);
            ChatError::RateLimit { retry_after }
        }
        _ => ChatError::Transport {
            status: Some(status.as_u16()),
            message: format!("API error ({}): {}", status.as_u16(), detail),
            retryable: status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT,
        },
    }
}

/// Pull a human-readable message out of a JSON error body, if there is one.
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let pick = |v: &Value| v.as_str().map(str::to_string);
    value
        .get("message")
        .and_then(pick)
        .or_else(|| value.get("error").and_then(pick))
        .or_else(|| value.pointer("/error/message").and_then(pick))
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn fetch_messages(
        &self,
        booking_id: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> ChatResult<MessagePage> {
        let mut req = self
            .client
            .get(self.chat_url(booking_id, "messages"))
            .query(&[("limit", limit.to_string())]);
        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor)]);
        }
        let resp = self.execute(req, "fetch_messages").await?;
        Self::decode(resp).await
    }

    async fn send_message(
        &self,
        booking_id: &str,
        content: &str,
        files: &[FileUpload],
    ) -> ChatResult<Message> {
        let url = self.chat_url(booking_id, "messages");
        let req = if files.is_empty() {
            self.client.post(url).json(&json!({ "content": content }))
        } else {
            self.client
                .post(url)
                .multipart(Self::build_multipart(content, files)?)
        };
        let resp = self.execute(req, "send_message").await?;
        Self::decode(resp).await
    }

    async fn generate_ai_suggestion(&self, booking_id: &str) -> ChatResult<Message> {
        let req = self
            .client
            .post(self.chat_url(booking_id, "ai-suggestion"));
        let resp = self.execute(req, "generate_ai_suggestion").await?;
        Self::decode(resp).await
    }

    async fn mark_read(&self, booking_id: &str) -> ChatResult<()> {
        let req = self.client.post(self.chat_url(booking_id, "read"));
        self.execute(req, "mark_read").await?;
        Ok(())
    }

    async fn unread_count(&self, booking_id: &str) -> ChatResult<u64> {
        let req = self.client.get(self.chat_url(booking_id, "unread-count"));
        let resp = self.execute(req, "unread_count").await?;
        let count: UnreadCount = Self::decode(resp).await?;
        Ok(count.unread_count)
    }
}
