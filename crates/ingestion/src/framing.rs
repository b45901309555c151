//! Newline framing for byte-stream transports

use bytes::{Buf, BytesMut};

/// Longest line kept before the buffer is discarded
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a byte stream into text lines
///
/// Accepts `\n` and `\r\n` terminators. Invalid UTF-8 is replaced, so a
/// garbled line still reaches the codec and fails there.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > MAX_LINE_BYTES && !self.buffer.contains(&b'\n') {
            tracing::warn!(
                bytes = self.buffer.len(),
                "Discarding unterminated oversized line"
            );
            self.buffer.clear();
        }
    }

    /// Next complete line, without its terminator
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|b| *b == b'\n')?;
        let line = self.buffer.split_to(end);
        self.buffer.advance(1);

        let text = String::from_utf8_lossy(&line);
        Some(text.trim_end_matches('\r').to_string())
    }

    /// Remaining unterminated bytes as a final line (at EOF)
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        Some(String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string())
    }

    /// Bytes waiting for a terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_across_chunks() {
        let mut framer = LineFramer::new();
        framer.extend(b"100 1 2 ");
        assert_eq!(framer.next_line(), None);

        framer.extend(b"3\r\n200 4 5 6\nrest");
        assert_eq!(framer.next_line().as_deref(), Some("100 1 2 3"));
        assert_eq!(framer.next_line().as_deref(), Some("200 4 5 6"));
        assert_eq!(framer.next_line(), None);
        assert_eq!(framer.pending(), 4);
        assert_eq!(framer.finish().as_deref(), Some("rest"));
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_empty_lines_preserved() {
        let mut framer = LineFramer::new();
        framer.extend(b"\n\na\n");
        assert_eq!(framer.next_line().as_deref(), Some(""));
        assert_eq!(framer.next_line().as_deref(), Some(""));
        assert_eq!(framer.next_line().as_deref(), Some("a"));
    }

    #[test]
    fn test_oversized_line_discarded() {
        let mut framer = LineFramer::new();
        framer.extend(&vec![b'x'; MAX_LINE_BYTES + 1]);
        assert_eq!(framer.pending(), 0);
    }
}
