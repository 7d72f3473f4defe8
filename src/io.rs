//! Output and input plumbing.

use crate::Result;
use bytes::Bytes;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

/// Growable in-memory byte buffer satisfying the same positioned-output
/// contract as a file, so in-memory round trips never touch a temp file.
#[derive(Debug, Default)]
pub struct MemorySink {
    buffer: Cursor<Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.get_ref().is_empty()
    }

    /// Consume the sink and return the encoded bytes.
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.buffer.into_inner())
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.buffer.flush()
    }
}

impl Seek for MemorySink {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.buffer.seek(pos)
    }
}

/// Drain an arbitrary byte stream into memory for reading.
pub(crate) fn drain_to_bytes(mut reader: impl Read) -> Result<Bytes> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_is_positioned() {
        let mut sink = MemorySink::new();
        sink.write_all(b"hello world").unwrap();
        sink.seek(SeekFrom::Start(6)).unwrap();
        sink.write_all(b"earth").unwrap();
        assert_eq!(sink.len(), 11);
        assert_eq!(sink.into_bytes().as_ref(), b"hello earth");
    }

    #[test]
    fn test_drain_to_bytes() {
        let bytes = drain_to_bytes(&b"abc"[..]).unwrap();
        assert_eq!(bytes.as_ref(), b"abc");
    }
}
