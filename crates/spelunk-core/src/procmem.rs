//! # Process Memory Source
//!
//! [`MemorySource`] over a live Linux process via `/proc/<pid>/mem`. Reads
//! are positional (`pread`), so one open descriptor serves the whole
//! traversal without seeking state. The debuggee should be stopped, or at
//! least quiescent, while a traversal runs; nothing here stops it.

use std::fs::File;
use std::os::unix::fs::FileExt;

use crate::error::{Result, SpelunkError};
use crate::value::MemorySource;

/// Raw memory of a live process.
#[derive(Debug)]
pub struct ProcessMemory
{
    mem: File,
    pid: u32,
}

impl ProcessMemory
{
    /// Open `/proc/<pid>/mem`. Requires ptrace-level access to the target
    /// (same user with default Yama settings, or CAP_SYS_PTRACE).
    pub fn attach(pid: u32) -> Result<Self>
    {
        let mem = File::open(format!("/proc/{pid}/mem")).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => SpelunkError::NotAttached,
            _ => SpelunkError::Io(err),
        })?;
        Ok(ProcessMemory { mem, pid })
    }

    pub fn pid(&self) -> u32
    {
        self.pid
    }
}

impl MemorySource for ProcessMemory
{
    fn read(&self, address: u64, buf: &mut [u8]) -> Result<()>
    {
        // unmapped pages surface as EIO/EFAULT from pread; both mean the
        // same thing to a traversal
        match self.mem.read_exact_at(buf, address) {
            Ok(()) => Ok(()),
            Err(_) => Err(SpelunkError::Inaccessible { address }),
        }
    }
}
