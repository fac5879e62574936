//! Accumulator for encoded frames awaiting transmission.

/// Byte buffer holding already-encoded frames that have not been acknowledged
/// by a successful send.
///
/// Frames are only ever appended; the buffer empties wholesale when a flush
/// succeeds or when the overflow policy evicts it. There is no partial
/// truncation because a flush always transmits the entire contents.
#[derive(Debug, Default)]
pub(crate) struct PendingBuffer {
    bytes: Vec<u8>,
}

impl PendingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one encoded frame.
    pub fn append(&mut self, frame: &[u8]) {
        self.bytes.extend_from_slice(frame);
    }

    /// Buffered size in bytes. Events are not counted; only bytes matter for
    /// the overflow policy.
    pub fn bytesize(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The full buffered contents, in append order.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Remove and return everything, leaving the buffer empty. Used to hand
    /// evicted bytes to an overflow callback.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_exactly_each_appended_frame() {
        let mut buffer = PendingBuffer::new();
        assert!(buffer.is_empty());
        buffer.append(b"abc");
        assert_eq!(buffer.bytesize(), 3);
        buffer.append(b"defg");
        assert_eq!(buffer.bytesize(), 7);
        assert_eq!(buffer.as_slice(), b"abcdefg");
    }

    #[test]
    fn clear_empties_completely() {
        let mut buffer = PendingBuffer::new();
        buffer.append(b"abc");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.bytesize(), 0);
    }

    #[test]
    fn take_returns_contents_and_resets() {
        let mut buffer = PendingBuffer::new();
        buffer.append(b"abc");
        buffer.append(b"def");
        let taken = buffer.take();
        assert_eq!(taken, b"abcdef");
        assert!(buffer.is_empty());
    }
}
