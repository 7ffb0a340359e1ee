//! Shared test harness: a synthetic debuggee.
//!
//! Tests build a byte image laid out exactly like a stopped process would
//! be, hand-construct the matching type descriptors, and run the real
//! visitor/decoders against it.

#![allow(dead_code)]

pub mod cxx;

use spelunk_core::error::{Result, SpelunkError};
use spelunk_core::selection::{Focus, FocusHost};
use spelunk_core::value::{MemorySource, TypeRef, Value};

/// Fixed-size little-endian memory image at a chosen base address.
pub struct Image
{
    base: u64,
    bytes: Vec<u8>,
    cursor: u64,
}

impl Image
{
    pub fn new(base: u64, capacity: usize) -> Self
    {
        Image {
            base,
            bytes: vec![0; capacity],
            cursor: base,
        }
    }

    pub fn base(&self) -> u64
    {
        self.base
    }

    /// Bump-allocate `size` bytes inside the image.
    pub fn alloc(&mut self, size: u64, align: u64) -> u64
    {
        let aligned = (self.cursor + align - 1) / align * align;
        self.cursor = aligned + size;
        assert!(
            self.cursor <= self.base + self.bytes.len() as u64,
            "image exhausted"
        );
        aligned
    }

    fn offset(&self, address: u64, len: usize) -> usize
    {
        let off = (address - self.base) as usize;
        assert!(off + len <= self.bytes.len(), "write outside image");
        off
    }

    pub fn write_bytes(&mut self, address: u64, data: &[u8])
    {
        let off = self.offset(address, data.len());
        self.bytes[off..off + data.len()].copy_from_slice(data);
    }

    pub fn write_u8(&mut self, address: u64, v: u8)
    {
        self.write_bytes(address, &[v]);
    }

    pub fn write_u16(&mut self, address: u64, v: u16)
    {
        self.write_bytes(address, &v.to_le_bytes());
    }

    pub fn write_u32(&mut self, address: u64, v: u32)
    {
        self.write_bytes(address, &v.to_le_bytes());
    }

    pub fn write_i32(&mut self, address: u64, v: i32)
    {
        self.write_bytes(address, &v.to_le_bytes());
    }

    pub fn write_u64(&mut self, address: u64, v: u64)
    {
        self.write_bytes(address, &v.to_le_bytes());
    }

    pub fn write_i64(&mut self, address: u64, v: i64)
    {
        self.write_bytes(address, &v.to_le_bytes());
    }

    pub fn write_f32(&mut self, address: u64, v: f32)
    {
        self.write_bytes(address, &v.to_le_bytes());
    }

    pub fn write_f64(&mut self, address: u64, v: f64)
    {
        self.write_bytes(address, &v.to_le_bytes());
    }

    pub fn write_str(&mut self, address: u64, s: &str)
    {
        self.write_bytes(address, s.as_bytes());
        self.write_u8(address + s.len() as u64, 0);
    }

    /// Typed view into this image.
    pub fn value(&self, address: u64, ty: TypeRef) -> Value<'_>
    {
        Value::new(self, address, ty)
    }
}

impl MemorySource for Image
{
    fn read(&self, address: u64, buf: &mut [u8]) -> Result<()>
    {
        if address < self.base {
            return Err(SpelunkError::Inaccessible { address });
        }
        let off = (address - self.base) as usize;
        if off + buf.len() > self.bytes.len() {
            return Err(SpelunkError::Inaccessible { address });
        }
        buf.copy_from_slice(&self.bytes[off..off + buf.len()]);
        Ok(())
    }
}

/// Host with an observable, switchable thread/frame selection.
pub struct MockHost
{
    focus: Focus,
    pub switches: usize,
    /// When set, the next `set_focus` to this focus fails once.
    pub fail_on: Option<Focus>,
}

impl MockHost
{
    pub fn new(focus: Focus) -> Self
    {
        MockHost {
            focus,
            switches: 0,
            fail_on: None,
        }
    }
}

impl FocusHost for MockHost
{
    fn focus(&self) -> Focus
    {
        self.focus
    }

    fn set_focus(&mut self, focus: Focus) -> Result<()>
    {
        if self.fail_on == Some(focus) {
            self.fail_on = None;
            return Err(SpelunkError::FocusRestore(format!(
                "thread {} is gone",
                focus.thread
            )));
        }
        self.switches += 1;
        self.focus = focus;
        Ok(())
    }
}
