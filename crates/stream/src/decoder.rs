//! Line framing for `text/event-stream` response bodies.
//!
//! Chunks arrive at arbitrary byte boundaries, including in the middle
//! of a multi-byte UTF-8 sequence, so bytes are buffered and only
//! complete lines are decoded.

/// Upper bound on a single buffered line. A server that never sends a
/// newline would otherwise grow the buffer without limit.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A complete line that could not be turned into a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("line exceeds {MAX_LINE_BYTES} bytes")]
    LineTooLong,
}

/// Incremental decoder that turns body chunks into `data:` payloads.
///
/// Only the `data` field is meaningful on notification streams;
/// comments, `event:`, `id:`, `retry:` and blank lines are skipped.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline.
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the payloads of every line it completed,
    /// in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, DecodeError>> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let newline_idx = self.scanned + offset;
            self.scanned = 0;
            let mut line: Vec<u8> = self.buffer.drain(..=newline_idx).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(decoded) = decode_line(line) {
                out.push(decoded);
            }
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            self.buffer.clear();
            out.push(Err(DecodeError::LineTooLong));
        }
        self.scanned = self.buffer.len();

        out
    }

    /// Bytes of an unterminated line still waiting for its newline.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(line: Vec<u8>) -> Option<Result<String, DecodeError>> {
    let text = match String::from_utf8(line) {
        Ok(text) => text,
        Err(e) => {
            // Only data lines matter; anything else is skipped even if garbled.
            if e.as_bytes().starts_with(b"data:") {
                return Some(Err(DecodeError::InvalidUtf8(e.utf8_error().to_string())));
            }
            return None;
        }
    };

    let value = text.strip_prefix("data:")?;
    let value = value.strip_prefix(' ').unwrap_or(value);
    Some(Ok(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(decoder: &mut LineDecoder, chunk: &[u8]) -> Vec<String> {
        decoder
            .push(chunk)
            .into_iter()
            .map(|r| r.expect("line should decode"))
            .collect()
    }

    #[test]
    fn single_line_in_one_chunk() {
        let mut decoder = LineDecoder::new();
        assert_eq!(data(&mut decoder, b"data: {\"a\":1}\n"), vec![r#"{"a":1}"#]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn line_split_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(data(&mut decoder, b"da").is_empty());
        assert!(data(&mut decoder, b"ta: hel").is_empty());
        assert_eq!(data(&mut decoder, b"lo\n\ndata: next\n"), vec!["hello", "next"]);
    }

    #[test]
    fn line_fed_one_byte_at_a_time() {
        let mut decoder = LineDecoder::new();
        let stream = b"data: first\ndata: second\n";
        let mut out = Vec::new();
        for byte in stream {
            out.extend(data(&mut decoder, std::slice::from_ref(byte)));
            assert!(decoder.scanned <= decoder.pending_len());
        }
        assert_eq!(out, vec!["first", "second"]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut decoder = LineDecoder::new();
        let line = "data: prêt à servir\n".as_bytes();
        // Split inside the two-byte encoding of 'ê'.
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
        assert!(data(&mut decoder, &line[..split]).is_empty());
        assert_eq!(data(&mut decoder, &line[split..]), vec!["prêt à servir"]);
    }

    #[test]
    fn crlf_and_missing_space_are_accepted() {
        let mut decoder = LineDecoder::new();
        assert_eq!(data(&mut decoder, b"data:x\r\ndata:  y\r\n"), vec!["x", " y"]);
    }

    #[test]
    fn non_data_fields_are_skipped() {
        let mut decoder = LineDecoder::new();
        let chunk = b": keep-alive\nevent: message\nid: 7\nretry: 1000\n\ndata: kept\n";
        assert_eq!(data(&mut decoder, chunk), vec!["kept"]);
    }

    #[test]
    fn invalid_utf8_data_line_is_an_error_for_that_line_only() {
        let mut decoder = LineDecoder::new();
        let out = decoder.push(b"data: \xff\xfe\ndata: ok\n");
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Err(DecodeError::InvalidUtf8(_))));
        assert_eq!(out[1], Ok("ok".to_string()));
    }

    #[test]
    fn oversized_line_is_discarded() {
        let mut decoder = LineDecoder::new();
        let out = decoder.push(&vec![b'a'; MAX_LINE_BYTES + 1]);
        assert_eq!(out, vec![Err(DecodeError::LineTooLong)]);
        assert_eq!(decoder.pending_len(), 0);
    }
}
