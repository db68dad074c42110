//! Bounds-checked little-endian cursor over a seekable input

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// Primitive cursor over a byte-addressable input.
///
/// Every read advances the cursor by exactly the width read, or fails with
/// [`Error::TruncatedInput`] without consuming anything. The total input length
/// is captured up front so forward skips can be rejected before a seek is
/// issued; seeking past the end of a file never succeeds silently.
///
/// All multi-byte values are little-endian.
pub struct ChunkReader<R> {
    inner: R,
    position: u64,
    len: u64,
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Wrap `inner`, starting at its current position.
    pub fn new(mut inner: R) -> Result<Self> {
        let position = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(position))?;
        Ok(Self {
            inner,
            position,
            len,
        })
    }

    /// Absolute offset of the cursor
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total length of the input in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes left between the cursor and the end of input
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.position)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a 4-byte chunk tag
    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        self.read_array()
    }

    /// Read `len` bytes as a string; bytes that are not valid UTF-8 are
    /// replaced rather than rejected.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        self.ensure(len as u64)?;
        let mut buf = vec![0u8; len];
        self.fill(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Advance the cursor by `len` bytes without reading them.
    pub fn skip(&mut self, len: u64) -> Result<()> {
        self.ensure(len)?;
        let offset = i64::try_from(len).map_err(|_| self.truncated(len))?;
        self.inner.seek(SeekFrom::Current(offset))?;
        self.position += len;
        Ok(())
    }

    /// Release the underlying input, positioned at the cursor.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N as u64)?;
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let needed = buf.len() as u64;
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.position += needed;
                Ok(())
            }
            // The input shrank after the length was captured
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(self.truncated(needed)),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn ensure(&self, needed: u64) -> Result<()> {
        if needed > self.remaining() {
            return Err(self.truncated(needed));
        }
        Ok(())
    }

    fn truncated(&self, needed: u64) -> Error {
        Error::TruncatedInput {
            offset: self.position,
            needed,
            available: self.remaining(),
        }
    }
}
