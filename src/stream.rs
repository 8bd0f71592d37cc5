//! Streaming chat-completion client.
//!
//! Opens `POST {base}/v1/chat/completions` with `stream: true`, decodes the
//! `data:`-prefixed event lines of the response body and hands text fragments
//! to the caller in server order. A failed attempt (network error, bad
//! status, body-read error) is retried with the same payload up to
//! `max_retries` times with a fixed backoff; exhaustion ends the sequence
//! silently, distinguishable from a clean finish through
//! [`FragmentStream::outcome`].

use std::time::Duration;

use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::logger;

const DONE_SENTINEL: &str = "[DONE]";
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(serde::Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(serde::Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(serde::Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

/// How a fragment sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The server finished cleanly (`[DONE]` or end of body).
    Done,
    /// Every attempt failed and the retry budget ran out.
    Exhausted,
}

enum StreamItem {
    Fragment(String),
    End(StreamOutcome),
}

/// Lazy fragment sequence; pull one fragment at a time from the worker side.
pub struct FragmentStream {
    rx: mpsc::Receiver<StreamItem>,
    outcome: Option<StreamOutcome>,
}

impl Iterator for FragmentStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.outcome.is_some() {
            return None;
        }
        match self.rx.blocking_recv() {
            Some(StreamItem::Fragment(text)) => Some(text),
            Some(StreamItem::End(outcome)) => {
                self.outcome = Some(outcome);
                None
            }
            None => {
                self.outcome = Some(StreamOutcome::Exhausted);
                None
            }
        }
    }
}

impl FragmentStream {
    /// Final status, available once the iterator has returned `None`.
    pub fn outcome(&self) -> Option<StreamOutcome> {
        self.outcome
    }
}

#[derive(Clone)]
pub struct CompletionClient {
    handle: Handle,
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    max_retries: u32,
    backoff: Duration,
}

impl CompletionClient {
    pub fn new(
        handle: Handle,
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            handle,
            http,
            base_url: base_url.into(),
            api_token: api_token.into(),
            max_retries,
            backoff: RETRY_BACKOFF,
        }
    }

    #[allow(dead_code)]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Start a streaming completion for `request` and return the fragment
    /// sequence. Each call opens fresh connection state; the sequence is
    /// finite and not restartable.
    pub fn stream_chat(&self, request: ChatRequest) -> FragmentStream {
        let (tx, rx) = mpsc::channel(32);
        let client = self.clone();
        self.handle.spawn(async move {
            let outcome = client.run(request, &tx).await;
            let _ = tx.send(StreamItem::End(outcome)).await;
        });
        FragmentStream { rx, outcome: None }
    }

    async fn run(&self, request: ChatRequest, tx: &mpsc::Sender<StreamItem>) -> StreamOutcome {
        let mut retries = 0;
        while retries < self.max_retries {
            match self.attempt(&request, tx).await {
                Ok(()) => return StreamOutcome::Done,
                Err(err) => {
                    logger::log(&format!("completion attempt failed: {err}"));
                }
            }
            retries += 1;
            if retries < self.max_retries {
                logger::log(&format!("retrying ({retries}/{})", self.max_retries));
                tokio::time::sleep(self.backoff).await;
            }
        }
        logger::log("max retries reached, giving up");
        StreamOutcome::Exhausted
    }

    /// One connect-and-read attempt. `Ok(())` is a clean termination
    /// (`[DONE]`, end of body, or the caller dropping the stream); any error
    /// is retryable.
    async fn attempt(
        &self,
        request: &ChatRequest,
        tx: &mpsc::Sender<StreamItem>,
    ) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_token)
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("completion endpoint returned {status}");
        }

        // Buffer bytes and split on newlines so UTF-8 sequences broken across
        // transport chunks reassemble before decoding.
        let mut body = resp.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                if self.forward_line(&line, tx).await {
                    return Ok(());
                }
            }
        }
        if !buf.is_empty() {
            self.forward_line(&buf, tx).await;
        }
        Ok(())
    }

    /// Returns true when the attempt is finished.
    async fn forward_line(&self, raw: &[u8], tx: &mpsc::Sender<StreamItem>) -> bool {
        let line = String::from_utf8_lossy(raw);
        match parse_event_line(&line) {
            LineEvent::Fragment(text) => {
                // A send error means the caller dropped the stream.
                tx.send(StreamItem::Fragment(text)).await.is_err()
            }
            LineEvent::Done => true,
            LineEvent::Skip => false,
        }
    }
}

enum LineEvent {
    Fragment(String),
    Done,
    Skip,
}

/// Classify one line of the event stream. Only non-empty `data:` lines
/// matter; a `[DONE]` payload ends the stream, anything else is parsed as a
/// completion chunk. Unparseable lines are logged and skipped.
fn parse_event_line(line: &str) -> LineEvent {
    let line = line.trim();
    if line.is_empty() {
        return LineEvent::Skip;
    }
    let Some(rest) = line.strip_prefix("data:") else {
        return LineEvent::Skip;
    };
    if rest.contains(DONE_SENTINEL) {
        return LineEvent::Done;
    }
    match serde_json::from_str::<StreamChunk>(rest.trim()) {
        Ok(chunk) => {
            let content = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .filter(|c| !c.is_empty());
            match content {
                Some(text) => LineEvent::Fragment(text),
                None => LineEvent::Skip,
            }
        }
        Err(err) => {
            logger::log(&format!("skipping unparseable stream line: {err}"));
            LineEvent::Skip
        }
    }
}
