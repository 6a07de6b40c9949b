use crate::config::ApiConfig;
use reqwest::{Client, Response};
use tracing::debug;

/// Build a `reqwest::Client` with the configured connect and overall timeouts.
///
/// Falls back to the default client if the builder fails.
pub fn api_http_client(api: &ApiConfig) -> Client {
    Client::builder()
        .connect_timeout(api.connect_timeout())
        .timeout(api.request_timeout())
        .user_agent(concat!("bondvoyage/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Read at most `max_bytes` of an error response body as lossy UTF-8.
///
/// Streams via `chunk()` and stops at the limit, appending `[truncated]`.
/// A body that fails mid-stream yields whatever arrived before the failure.
pub async fn read_error_body(resp: Response, max_bytes: usize) -> String {
    let mut buf = Vec::new();
    let mut stream = resp;
    let mut truncated = false;
    loop {
        match stream.chunk().await {
            Ok(Some(chunk)) => {
                let remaining = max_bytes.saturating_sub(buf.len());
                if chunk.len() > remaining {
                    buf.extend_from_slice(&chunk[..remaining]);
                    truncated = true;
                    break;
                }
                buf.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                debug!("error body read interrupted: {}", e);
                break;
            }
        }
    }
    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        text.push_str(" [truncated]");
    }
    text
}

#[cfg(test)]
mod tests;
