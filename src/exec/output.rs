//! Destinations for command output.

use bytes::{Bytes, BytesMut};

/// A line longer than this is logged in pieces.
const MAX_LOG_LINE: usize = 64 * 1024;

/// Receives process output chunks in the order they were read.
pub trait OutputSink: Send {
    fn write(&mut self, chunk: &[u8]);
}

impl OutputSink for Vec<u8> {
    fn write(&mut self, chunk: &[u8]) {
        self.extend_from_slice(chunk);
    }
}

/// Tees output to the log, tagged with the route, and to the response body.
///
/// Every line reaches the log. The body keeps at most `limit` bytes of
/// output, followed by a truncation marker when anything was dropped.
#[derive(Debug)]
pub struct RouteOutput {
    route: String,
    body: BytesMut,
    limit: usize,
    omitted: usize,
    marked: bool,
    partial: Vec<u8>,
}

impl RouteOutput {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            body: BytesMut::new(),
            limit: usize::MAX,
            omitted: 0,
            marked: false,
            partial: Vec::new(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Bytes of output left out of the body.
    pub fn omitted(&self) -> usize {
        self.omitted
    }

    /// Append a message after the output, regardless of the limit.
    pub fn append_message(&mut self, message: &str) {
        self.seal();
        self.log_line(message.as_bytes());
        self.body.extend_from_slice(message.as_bytes());
    }

    pub fn into_body(mut self) -> Bytes {
        self.seal();
        self.body.freeze()
    }

    /// Flush a trailing partial line and mark any truncation, once.
    fn seal(&mut self) {
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            self.log_line(&line);
        }
        if self.omitted > 0 && !self.marked {
            self.marked = true;
            let marker = format!("\n[output truncated: {} bytes omitted]\n", self.omitted);
            self.body.extend_from_slice(marker.as_bytes());
        }
    }

    fn log_line(&self, line: &[u8]) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        tracing::info!(route = %self.route, "{}", String::from_utf8_lossy(line));
    }
}

impl OutputSink for RouteOutput {
    fn write(&mut self, chunk: &[u8]) {
        self.partial.extend_from_slice(chunk);
        while let Some(end) = self.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=end).collect();
            self.log_line(&line[..end]);
        }
        if self.partial.len() > MAX_LOG_LINE {
            let line = std::mem::take(&mut self.partial);
            self.log_line(&line);
        }

        let room = self.limit.saturating_sub(self.body.len());
        let kept = room.min(chunk.len());
        self.body.extend_from_slice(&chunk[..kept]);
        if kept < chunk.len() {
            if self.omitted == 0 {
                tracing::warn!(route = %self.route, limit = self.limit, "Response output limit reached, truncating");
            }
            self.omitted += chunk.len() - kept;
        }
    }
}
