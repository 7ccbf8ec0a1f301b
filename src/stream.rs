//! Byte cursor over an in-memory buffer
//!
//! Sequential little-endian reader used by both chunk decoders. Every read
//! checks the remaining length first and fails with
//! [`LoadError::InsufficientData`], which makes the parsers above it
//! panic-free against truncated or adversarial input.

use crate::error::LoadError;

/// Sequential reader over a borrowed byte slice.
///
/// Invariant: `pos <= data.len()` at all times; every typed read advances
/// `pos` by exactly the type's encoded width or fails without advancing.
#[derive(Debug)]
pub struct DataStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DataStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed.
    #[inline]
    pub fn at_eof(&self) -> bool {
        self.pos == self.data.len()
    }

    fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], LoadError> {
        if self.remaining() < n {
            return Err(LoadError::InsufficientData(context));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.take(1, "u8")?[0])
    }

    /// Bools are encoded as one byte, nonzero = true.
    pub fn read_bool(&mut self) -> Result<bool, LoadError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, LoadError> {
        let b = self.take(2, "u16")?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, LoadError> {
        let b = self.take(4, "u32")?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32, LoadError> {
        let b = self.take(4, "f32")?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Length-prefixed string: `u32` length followed by that many bytes,
    /// no terminator. Non-UTF-8 bytes are replaced, never rejected.
    pub fn read_string(&mut self) -> Result<String, LoadError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len, "string body")?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Copy `n` raw bytes out of the buffer.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, LoadError> {
        Ok(self.take(n, "raw bytes")?.to_vec())
    }

    /// Skip `n` bytes without copying. Used to discard ignored chunk bodies.
    pub fn skip(&mut self, n: usize) -> Result<(), LoadError> {
        self.take(n, "skipped bytes")?;
        Ok(())
    }

    /// Rewind by `n` bytes. Crate-internal: the only caller is chunk-id
    /// peeking, which rewinds exactly what it just read.
    pub(crate) fn rewind(&mut self, n: usize) {
        debug_assert!(n <= self.pos);
        self.pos -= n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_reads() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x80, 0x3f];
        let mut s = DataStream::new(&data);
        assert_eq!(s.read_u8().unwrap(), 0x01);
        assert_eq!(s.read_u16().unwrap(), 0x1234);
        assert_eq!(s.read_u32().unwrap(), 0x12345678);
        assert_eq!(s.read_f32().unwrap(), 1.0);
        assert!(s.at_eof());
    }

    #[test]
    fn test_read_past_end() {
        let mut s = DataStream::new(&[0xAA]);
        assert!(matches!(s.read_u16(), Err(LoadError::InsufficientData(_))));
        // A failed read must not advance the cursor
        assert_eq!(s.position(), 0);
        assert_eq!(s.read_u8().unwrap(), 0xAA);
        assert!(matches!(s.read_u8(), Err(LoadError::InsufficientData(_))));
    }

    #[test]
    fn test_read_string() {
        let mut data = 5u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"hello rest");
        let mut s = DataStream::new(&data);
        assert_eq!(s.read_string().unwrap(), "hello");
        assert_eq!(s.remaining(), 5);
    }

    #[test]
    fn test_string_length_past_end() {
        let mut data = 100u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"short");
        let mut s = DataStream::new(&data);
        assert!(matches!(
            s.read_string(),
            Err(LoadError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_skip_and_rewind() {
        let data = [0u8, 1, 2, 3, 4, 5];
        let mut s = DataStream::new(&data);
        s.skip(4).unwrap();
        assert_eq!(s.read_u8().unwrap(), 4);
        s.rewind(2);
        assert_eq!(s.read_u8().unwrap(), 3);
        assert!(matches!(s.skip(3), Err(LoadError::InsufficientData(_))));
    }
}
