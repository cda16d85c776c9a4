use std::io;
use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::debug;

use relay_types::api::{PostMessageRequest, PostMessageResponse};
use relay_types::{Message, Presence};

use crate::error::{ClientError, Result};
use crate::sse::parse_sse_line;

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Delay before stream reconnect attempt `attempt` (0-based): doubling from
/// one second, capped at thirty.
pub fn backoff(attempt: u32) -> Duration {
    BACKOFF_BASE
        .checked_mul(2u32.saturating_pow(attempt))
        .map_or(BACKOFF_MAX, |d| d.min(BACKOFF_MAX))
}

/// HTTP client for one relay server.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn post_message(&self, from: &str, body: &str) -> Result<PostMessageResponse> {
        let req = PostMessageRequest {
            from: from.to_string(),
            body: body.to_string(),
        };
        let resp = self.http.post(self.url("/messages")).json(&req).send().await?;
        decode(resp, StatusCode::CREATED).await
    }

    /// Messages addressed to `name` after `since`, or every message when `all`.
    /// The server records the request as activity for `name`.
    pub async fn fetch_messages(&self, name: &str, since: i64, all: bool) -> Result<Vec<Message>> {
        let mut query = vec![("for", name.to_string()), ("since", since.to_string())];
        if all {
            query.push(("all", "true".to_string()));
        }
        let resp = self.http.get(self.url("/messages")).query(&query).send().await?;
        decode(resp, StatusCode::OK).await
    }

    /// Full history, or only the newest `limit` messages when `limit > 0`.
    pub async fn fetch_log(&self, limit: u32) -> Result<Vec<Message>> {
        let mut req = self.http.get(self.url("/messages"));
        if limit > 0 {
            req = req.query(&[("limit", limit)]);
        }
        decode(req.send().await?, StatusCode::OK).await
    }

    pub async fn fetch_presence(&self) -> Result<Vec<Presence>> {
        let resp = self.http.get(self.url("/presence")).send().await?;
        decode(resp, StatusCode::OK).await
    }

    pub async fn is_reachable(&self) -> bool {
        match self.http.get(self.url("/presence")).send().await {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(_) => false,
        }
    }

    /// Follow `/stream`, calling `on_message` for every pushed message.
    /// Runs until the connection ends and returns the reason; a server
    /// closing the stream is reported as [`ClientError::StreamClosed`].
    pub async fn stream<F>(&self, on_message: F) -> ClientError
    where
        F: FnMut(Message),
    {
        match self.read_stream(on_message).await {
            Ok(()) => ClientError::StreamClosed,
            Err(e) => e,
        }
    }

    /// [`stream`](Self::stream) in a loop, reconnecting after [`backoff`]
    /// delays. `on_retry` sees each delay and the error that caused it.
    /// Never returns; cancel the future to stop.
    pub async fn stream_with_reconnect<F, R>(&self, mut on_message: F, mut on_retry: R)
    where
        F: FnMut(Message),
        R: FnMut(Duration, &ClientError),
    {
        let mut attempt = 0u32;
        loop {
            let err = self.stream(&mut on_message).await;
            let delay = backoff(attempt);
            on_retry(delay, &err);
            attempt = attempt.saturating_add(1);
            tokio::time::sleep(delay).await;
        }
    }

    async fn read_stream<F>(&self, mut on_message: F) -> Result<()>
    where
        F: FnMut(Message),
    {
        let resp = self.http.get(self.url("/stream")).send().await?;
        let resp = check_status(resp, StatusCode::OK).await?;

        let body = Box::pin(resp.bytes_stream().map_err(io::Error::other));
        let mut lines = StreamReader::new(body).lines();

        while let Some(line) = lines.next_line().await? {
            match parse_sse_line(&line) {
                Ok(Some(msg)) => on_message(msg),
                Ok(None) => {}
                Err(e) => debug!("Skipping undecodable stream line: {}", e),
            }
        }
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response, expected: StatusCode) -> Result<reqwest::Response> {
    if resp.status() == expected {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default().trim().to_string();
    Err(ClientError::Status { status, body })
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response, expected: StatusCode) -> Result<T> {
    let resp = check_status(resp, expected).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
