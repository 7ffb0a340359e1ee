//! Raw byte access to debuggee memory.
//!
//! Everything above this trait is host-independent: the visitor, decoders,
//! snapshot builder and graph analyzer only ever see [`MemorySource`]. The
//! concrete source may be `/proc/<pid>/mem`, a core file, or a synthetic
//! image in tests.
//!
//! All reads are fallible. Unmapped or protected addresses come back as
//! [`SpelunkError::Inaccessible`]; callers truncate that branch of the
//! traversal instead of propagating the failure upward.

use crate::error::{Result, SpelunkError};

/// Fallible raw reads from the debuggee address space.
///
/// Values are decoded little-endian; big-endian debuggees are not supported.
pub trait MemorySource
{
    /// Fill `buf` from `address`. Must either fill the whole buffer or fail.
    fn read(&self, address: u64, buf: &mut [u8]) -> Result<()>;

    /// Can `address` be read at all? Used to probe pointees before
    /// descending into them.
    fn is_readable(&self, address: u64) -> bool
    {
        let mut byte = [0u8; 1];
        self.read(address, &mut byte).is_ok()
    }

    fn read_u8(&self, address: u64) -> Result<u8>
    {
        let mut buf = [0u8; 1];
        self.read(address, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&self, address: u64) -> Result<u16>
    {
        let mut buf = [0u8; 2];
        self.read(address, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&self, address: u64) -> Result<u32>
    {
        let mut buf = [0u8; 4];
        self.read(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&self, address: u64) -> Result<u64>
    {
        let mut buf = [0u8; 8];
        self.read(address, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// One pointer-sized word (64-bit debuggees only).
    fn read_word(&self, address: u64) -> Result<u64>
    {
        self.read_u64(address)
    }

    /// NUL-terminated string at `address`, at most `cap` bytes, decoded
    /// lossily. `Ok(None)` when the very first byte is unreadable.
    fn read_c_string(&self, address: u64, cap: usize) -> Result<Option<String>>
    {
        if address == 0 {
            return Ok(None);
        }
        let mut bytes = Vec::new();
        for offset in 0..cap as u64 {
            let byte = match self.read_u8(address + offset) {
                Ok(byte) => byte,
                Err(SpelunkError::Inaccessible { .. }) if offset == 0 => return Ok(None),
                // string runs off the end of a mapping: keep what we have
                Err(SpelunkError::Inaccessible { .. }) => break,
                Err(err) => return Err(err),
            };
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Exactly `len` bytes at `address`, decoded lossily, stopping at an
    /// embedded NUL.
    fn read_string_exact(&self, address: u64, len: usize) -> Result<String>
    {
        let mut buf = vec![0u8; len];
        self.read(address, &mut buf)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(len);
        Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
    }
}
