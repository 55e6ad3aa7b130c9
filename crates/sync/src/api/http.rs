//! HTTP implementation of the match server interfaces.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use match_core::{MatchId, MatchView, Move, TurnId};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use super::sse::SseDecoder;
use super::{ApiError, EventSource, EventTransport, MatchApi};
use crate::auth::Credential;
use crate::config::SyncConfig;

/// Match server client over HTTP.
///
/// Request/response calls carry the configured timeout; the subscription
/// does not, since it is expected to stay open indefinitely.
#[derive(Clone)]
pub struct HttpMatchApi {
    base_url: String,
    http_client: reqwest::Client,
    request_timeout: Duration,
}

#[derive(Serialize)]
struct PlayTurnBody {
    #[serde(rename = "move")]
    choice: Move,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl HttpMatchApi {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            base_url: config.api_url.clone(),
            http_client: reqwest::Client::new(),
            request_timeout: config.request_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn match_url(&self, match_id: &MatchId) -> String {
        format!("{}/matches/{}", self.base_url, match_id)
    }

    /// Reads a match body, or turns a non-success response into
    /// [`ApiError::Status`] carrying the server's `message`.
    async fn read_match(response: reqwest::Response) -> Result<MatchView, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!("Unparseable match body: {}", body);
            ApiError::Decode(e)
        })
    }
}

/// Extracts `{message}` from an error body. Falls back to a non-empty plain
/// text body.
fn error_message(body: &str) -> Option<String> {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message.filter(|m| !m.is_empty()),
        Err(_) => {
            let text = body.trim();
            (!text.is_empty() && !text.starts_with('{')).then(|| text.to_string())
        }
    }
}

#[async_trait]
impl MatchApi for HttpMatchApi {
    async fn fetch_match(
        &self,
        match_id: &MatchId,
        credential: &Credential,
    ) -> Result<MatchView, ApiError> {
        tracing::debug!("GET match {}", match_id);

        let response = self
            .http_client
            .get(self.match_url(match_id))
            .header(AUTHORIZATION, credential.bearer())
            .timeout(self.request_timeout)
            .send()
            .await?;

        Self::read_match(response).await
    }

    async fn play_turn(
        &self,
        match_id: &MatchId,
        turn_id: &TurnId,
        choice: Move,
        credential: &Credential,
    ) -> Result<MatchView, ApiError> {
        let url = format!("{}/turns/{}", self.match_url(match_id), turn_id);
        tracing::debug!("POST {} move={}", url, choice);

        let response = self
            .http_client
            .post(url)
            .header(AUTHORIZATION, credential.bearer())
            .json(&PlayTurnBody { choice })
            .timeout(self.request_timeout)
            .send()
            .await?;

        Self::read_match(response).await
    }
}

#[async_trait]
impl EventTransport for HttpMatchApi {
    async fn subscribe(
        &self,
        match_id: &MatchId,
        credential: &Credential,
    ) -> Result<Box<dyn EventSource>, ApiError> {
        let url = format!("{}/subscribe", self.match_url(match_id));
        tracing::debug!("Opening subscription {}", url);

        let response = self
            .http_client
            .get(url)
            .header(AUTHORIZATION, credential.bearer())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();

        Ok(Box::new(SseEventSource {
            chunks,
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
        }))
    }
}

/// Subscription body decoded as server-sent events.
struct SseEventSource {
    chunks: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    ready: VecDeque<String>,
}

#[async_trait]
impl EventSource for SseEventSource {
    async fn next_frame(&mut self) -> Option<Result<String, ApiError>> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Some(Ok(frame));
            }
            match self.chunks.next().await? {
                Ok(chunk) => self.ready.extend(self.decoder.feed(&chunk)),
                Err(e) => return Some(Err(ApiError::Network(e))),
            }
        }
    }
}
