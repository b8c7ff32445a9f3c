//! Newline framing over a byte stream.
//!
//! Request boundaries are defined solely by `\n`. Reads from a socket may
//! split a request anywhere or carry several requests at once, so bytes are
//! accumulated per connection and complete lines are handed out in stream
//! order. Whatever follows the last newline stays buffered for the next read.

/// Accumulates bytes and yields complete `\n`-terminated lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to contain no newline.
    scanned: usize,
}

impl LineDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
        }
    }

    /// Appends freshly read bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Removes and returns the next complete line, without its `\n`.
    ///
    /// Returns `None` when no complete line is buffered.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            return None;
        };

        let end = self.scanned + offset;
        let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
        line.pop();
        self.scanned = 0;
        Some(line)
    }

    /// Feeds `bytes` and drains every line completed by them.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.feed(bytes);
        std::iter::from_fn(|| self.next_line()).collect()
    }

    /// Bytes of an incomplete trailing line.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_complete_line() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.decode(b"{\"method\":\"help\"}\n");
        assert_eq!(lines, vec![b"{\"method\":\"help\"}".to_vec()]);
        assert!(decoder.is_empty());
    }

    #[test]
    fn several_lines_in_one_read() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.decode(b"first\nsecond\nthird\n");
        assert_eq!(
            lines,
            vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]
        );
    }

    #[test]
    fn line_split_across_reads() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.decode(b"{\"method\":").is_empty());
        assert_eq!(decoder.pending(), b"{\"method\":");
        assert!(decoder.decode(b"\"reverse\"").is_empty());

        let lines = decoder.decode(b"}\n");
        assert_eq!(lines, vec![b"{\"method\":\"reverse\"}".to_vec()]);
        assert!(decoder.is_empty());
    }

    #[test]
    fn remainder_is_kept() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.decode(b"one\ntw");
        assert_eq!(lines, vec![b"one".to_vec()]);
        assert_eq!(decoder.pending(), b"tw");

        let lines = decoder.decode(b"o\nthree\n");
        assert_eq!(lines, vec![b"two".to_vec(), b"three".to_vec()]);
    }

    #[test]
    fn byte_at_a_time() {
        let mut decoder = LineDecoder::new();
        let mut lines = Vec::new();
        for byte in b"ab\ncd\n" {
            lines.extend(decoder.decode(std::slice::from_ref(byte)));
        }
        assert_eq!(lines, vec![b"ab".to_vec(), b"cd".to_vec()]);
    }

    #[test]
    fn empty_lines_are_yielded() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.decode(b"\n\nx\n");
        assert_eq!(lines, vec![Vec::new(), Vec::new(), b"x".to_vec()]);
    }

    #[test]
    fn multibyte_utf8_split_mid_character() {
        let text = "{\"s\":\"こんにちは\"}\n".as_bytes();
        let (head, tail) = text.split_at(8);

        let mut decoder = LineDecoder::new();
        assert!(decoder.decode(head).is_empty());
        let lines = decoder.decode(tail);
        assert_eq!(lines, vec![text[..text.len() - 1].to_vec()]);
    }
}
