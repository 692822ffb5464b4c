//! An open notification stream, read one `data:` payload at a time.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::client::StreamClientError;
use crate::decoder::LineDecoder;

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamClientError>> + Send>>;

/// A live event stream over an HTTP response body (or any byte stream).
///
/// [`next_message`](Self::next_message) is cancel-safe: dropping its
/// future between chunks loses nothing, so it can sit in a
/// `tokio::select!` next to timers.
pub struct EventStream {
    body: Option<ByteStream>,
    decoder: LineDecoder,
    pending: VecDeque<Result<String, StreamClientError>>,
}

impl EventStream {
    /// Wrap a raw byte stream. Used by [`StreamClient`](crate::client::StreamClient)
    /// for HTTP bodies and directly by tests.
    pub fn from_byte_stream<S>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, StreamClientError>> + Send + 'static,
    {
        Self {
            body: Some(Box::pin(body)),
            decoder: LineDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    /// Next message payload.
    ///
    /// * `Some(Ok(data))` for each `data:` line, in server order.
    /// * `Some(Err(StreamClientError::Decode(_)))` for a single undecodable
    ///   line; the stream remains usable.
    /// * `Some(Err(_))` for any other error, after which the stream is closed.
    /// * `None` once the server ends the body or after [`close`](Self::close).
    pub async fn next_message(&mut self) -> Option<Result<String, StreamClientError>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }

            let body = self.body.as_mut()?;
            match body.next().await {
                Some(Ok(chunk)) => {
                    tracing::trace!(bytes = chunk.len(), "Stream chunk received");
                    for line in self.decoder.push(&chunk) {
                        self.pending
                            .push_back(line.map_err(|e| StreamClientError::Decode(e.to_string())));
                    }
                }
                Some(Err(e)) => {
                    self.body = None;
                    return Some(Err(e));
                }
                None => {
                    if self.decoder.pending_len() > 0 {
                        tracing::debug!(
                            bytes = self.decoder.pending_len(),
                            "Discarding unterminated trailing line",
                        );
                    }
                    self.body = None;
                    return None;
                }
            }
        }
    }

    /// Stop reading and release the underlying body. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.body.take().is_some() {
            tracing::debug!("Event stream closed");
        }
        self.pending.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.body.is_none() && self.pending.is_empty()
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("closed", &self.is_closed())
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use futures::stream;

    use super::*;

    fn chunks(parts: &[&'static str]) -> EventStream {
        let items: Vec<Result<Bytes, StreamClientError>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        EventStream::from_byte_stream(stream::iter(items))
    }

    #[tokio::test]
    async fn yields_messages_in_order_across_chunks() {
        let mut events = chunks(&["data: one\nda", "ta: two\n", "\ndata: three\n"]);
        assert_eq!(events.next_message().await.unwrap().unwrap(), "one");
        assert_eq!(events.next_message().await.unwrap().unwrap(), "two");
        assert_eq!(events.next_message().await.unwrap().unwrap(), "three");
        assert!(events.next_message().await.is_none());
        assert!(events.is_closed());
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let items = vec![
            Ok(Bytes::from_static(b"data: one\n")),
            Err(StreamClientError::Transport("reset".into())),
            Ok(Bytes::from_static(b"data: never\n")),
        ];
        let mut events = EventStream::from_byte_stream(stream::iter(items));
        assert_eq!(events.next_message().await.unwrap().unwrap(), "one");
        assert_matches!(
            events.next_message().await,
            Some(Err(StreamClientError::Transport(_)))
        );
        assert!(events.next_message().await.is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_stops_delivery() {
        let mut events = chunks(&["data: one\ndata: two\n"]);
        assert_eq!(events.next_message().await.unwrap().unwrap(), "one");
        events.close();
        events.close();
        assert!(events.is_closed());
        assert!(events.next_message().await.is_none());
    }
}
