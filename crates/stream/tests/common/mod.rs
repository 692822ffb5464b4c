#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use brigade_stream::client::{StreamClientError, StreamConnector};
use brigade_stream::config::RegistryConfig;
use brigade_stream::event_stream::EventStream;
use brigade_stream::reconnect::FixedDelay;
use brigade_stream::token::{StaticToken, TokenError, TokenProvider};
use brigade_stream::ConnectionRegistry;
use bytes::Bytes;
use futures::channel::mpsc;
use parking_lot::Mutex;

pub const BASE_URL: &str = "http://api.test";

/// Sender half of a scripted stream: push raw body chunks or a transport error.
pub type StreamFeed = mpsc::UnboundedSender<Result<Bytes, StreamClientError>>;

enum Scripted {
    Stream(mpsc::UnboundedReceiver<Result<Bytes, StreamClientError>>),
    Error(StreamClientError),
}

/// In-memory connector that replays scripted outcomes in order and records
/// every open request. With nothing scripted, opens fail with a
/// connection error.
#[derive(Default)]
pub struct FakeConnector {
    script: Mutex<VecDeque<Scripted>>,
    opened: Mutex<Vec<(String, String)>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script a successful open and return the feed for its body.
    pub fn push_stream(&self) -> StreamFeed {
        let (tx, rx) = mpsc::unbounded();
        self.script.lock().push_back(Scripted::Stream(rx));
        tx
    }

    pub fn push_error(&self, error: StreamClientError) {
        self.script.lock().push_back(Scripted::Error(error));
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// `(url, token)` of every open request, in order.
    pub fn opened(&self) -> Vec<(String, String)> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl StreamConnector for FakeConnector {
    async fn open(&self, url: &str, token: &str) -> Result<EventStream, StreamClientError> {
        self.opened.lock().push((url.to_string(), token.to_string()));
        match self.script.lock().pop_front() {
            Some(Scripted::Stream(rx)) => Ok(EventStream::from_byte_stream(rx)),
            Some(Scripted::Error(e)) => Err(e),
            None => Err(StreamClientError::Connection("connection refused".into())),
        }
    }
}

/// Token provider that always reports missing credentials.
pub struct NoToken;

#[async_trait]
impl TokenProvider for NoToken {
    async fn get_token(&self) -> Result<String, TokenError> {
        Err(TokenError::Missing)
    }
}

pub fn test_config() -> RegistryConfig {
    RegistryConfig::new(BASE_URL)
        .with_reconnect(FixedDelay::default())
        .with_heartbeat_timeout(Duration::from_secs(45))
}

pub fn registry_with(connector: Arc<FakeConnector>) -> ConnectionRegistry {
    ConnectionRegistry::new(test_config(), connector, Arc::new(StaticToken::new("secret")))
}

/// Push one `data:` line onto a scripted stream.
pub fn send_line(feed: &StreamFeed, json: &str) {
    feed.unbounded_send(Ok(Bytes::from(format!("data: {json}\n"))))
        .expect("stream receiver should still be open");
}

pub fn domain_json(event_type: &str, target: &str, order_id: &str) -> String {
    format!(
        r#"{{"kind":"domain","type":"{event_type}","target":"{target}","timestamp":"2026-10-15T12:00:00Z","payload":{{"orderId":"{order_id}","tableNumber":"Table 4","status":"READY","previousStatus":"IN_PREPARATION","dishCount":2,"totalPrice":23.5}},"message":"update"}}"#
    )
}

pub fn heartbeat_json() -> String {
    r#"{"kind":"system","message":"heartbeat","timestamp":"2026-10-15T12:00:30Z"}"#.to_string()
}

/// Poll `condition` while letting spawned tasks (and paused time) advance
/// in small steps. Panics after roughly one second of test time.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

/// Let spawned tasks run without advancing past any real deadline.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
