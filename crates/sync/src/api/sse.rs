//! Incremental `text/event-stream` decoder.
//!
//! Only the `data` field matters to this client: `event`, `id` and `retry`
//! fields are ignored, as are comment lines. Line endings may be LF or CRLF,
//! and chunks may split lines (or UTF-8 sequences) anywhere.
use tracing::warn;

/// Upper bound on a single unterminated line and on the data of one event.
pub const MAX_EVENT_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    data_len: usize,
    limit: usize,
    /// Skipping the rest of an oversized line.
    discarding: bool,
    /// Skipping the rest of an oversized event.
    dropping_event: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_EVENT_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that drops any line or event larger than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            data: Vec::new(),
            data_len: 0,
            limit: limit.max(1),
            discarding: false,
            dropping_event: false,
        }
    }

    /// Feeds one chunk and returns the payloads of every event it completed.
    ///
    /// A line that grows past the limit is dropped along with the event it
    /// belongs to; decoding resumes after the next line ending.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(event) = self.process_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }

        if self.buffer.len() > self.limit {
            warn!(len = self.buffer.len(), "dropping oversized event-stream line");
            self.buffer.clear();
            self.reset_event();
            self.discarding = true;
            self.dropping_event = true;
        }
        events
    }

    fn reset_event(&mut self) {
        self.data.clear();
        self.data_len = 0;
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if std::mem::take(&mut self.dropping_event) {
                self.reset_event();
                return None;
            }
            if self.data.is_empty() {
                return None;
            }
            let payload = self.data.join("\n");
            self.reset_event();
            return Some(payload);
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            if self.dropping_event {
                return None;
            }
            self.data_len += value.len();
            if self.data_len > self.limit {
                warn!(len = self.data_len, "dropping oversized event");
                self.reset_event();
                self.dropping_event = true;
                return None;
            }
            self.data.push(value.to_string());
        }
        None
    }
}
