//! Line framing for the device byte stream
//!
//! The field unit speaks newline-terminated ASCII text. [`LineFramer`]
//! accumulates raw chunks as they arrive from the transport and yields one
//! trimmed message per `\n`, however the bytes happen to be chunked.
//!
//! The accumulator is bounded: a peer that never sends `\n` cannot grow the
//! buffer without limit. When the cap is exceeded the buffered bytes are
//! discarded, an overflow is counted, and framing continues with later
//! input.

/// Accumulates transport chunks and yields newline-terminated messages
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    max_line_len: usize,
    overflows: u64,
}

impl LineFramer {
    /// Create a framer that discards any unterminated line longer than
    /// `max_line_len` bytes
    pub fn new(max_line_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line_len,
            overflows: 0,
        }
    }

    /// Feed one chunk of bytes; returns every complete message it finishes,
    /// in arrival order, trimmed of surrounding whitespace
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let message = String::from_utf8_lossy(&line).trim().to_string();
            messages.push(message);
        }

        if self.buf.len() > self.max_line_len {
            self.overflows += 1;
            tracing::warn!(
                "Discarding {} unterminated bytes (line cap {})",
                self.buf.len(),
                self.max_line_len
            );
            self.buf.clear();
        }

        messages
    }

    /// Drop any partially accumulated line (called on a fresh connect)
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Bytes currently buffered for an unterminated line
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Times the accumulator was discarded for exceeding the cap
    pub fn overflows(&self) -> u64 {
        self.overflows
    }
}
