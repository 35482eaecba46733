//! Block Device Abstraction Layer
//!
//! File systems talk to storage exclusively through [`BlockDevice`]: whole
//! 512-byte sectors addressed by LBA. Each call is atomic at this layer;
//! there are no partial-sector transfers.
//!
//! ```text
//! ┌───────────────────────────────┐
//! │       File System Layer       │
//! └───────────────────────────────┘
//!                 │
//!                 ▼
//! ┌───────────────────────────────┐
//! │   BlockDevice (read/write)    │
//! └───────────────────────────────┘
//!        │                 │
//!        ▼                 ▼
//! ┌─────────────┐   ┌─────────────┐
//! │  ATA/IDE    │   │  RAM disk   │
//! └─────────────┘   └─────────────┘
//! ```

use alloc::boxed::Box;
use core::fmt;

/// Sector size in bytes
pub const SECTOR_SIZE: usize = 512;

/// Block device failure status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockStatus {
    /// Device reported an I/O error
    IoError = 2,
    /// LBA range or buffer length rejected
    InvalidParameter = 3,
    /// Media not present
    NoMedia = 5,
    /// Write protected
    WriteProtected = 6,
    /// Timeout
    Timeout = 7,
    /// Bad sector
    BadSector = 9,
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BlockStatus::IoError => "device I/O error",
            BlockStatus::InvalidParameter => "invalid sector range",
            BlockStatus::NoMedia => "no media",
            BlockStatus::WriteProtected => "write protected",
            BlockStatus::Timeout => "device timeout",
            BlockStatus::BadSector => "bad sector",
        };
        f.write_str(text)
    }
}

/// A sector-addressed storage device.
///
/// `buf`/`data` must be exactly `count * SECTOR_SIZE` bytes long; anything
/// else is rejected with [`BlockStatus::InvalidParameter`].
pub trait BlockDevice {
    /// Read `count` sectors starting at `lba` into `buf`
    fn read_sectors(&mut self, lba: u32, count: u32, buf: &mut [u8]) -> Result<(), BlockStatus>;

    /// Write `count` sectors starting at `lba` from `data`
    fn write_sectors(&mut self, lba: u32, count: u32, data: &[u8]) -> Result<(), BlockStatus>;
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn read_sectors(&mut self, lba: u32, count: u32, buf: &mut [u8]) -> Result<(), BlockStatus> {
        (**self).read_sectors(lba, count, buf)
    }

    fn write_sectors(&mut self, lba: u32, count: u32, data: &[u8]) -> Result<(), BlockStatus> {
        (**self).write_sectors(lba, count, data)
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for Box<D> {
    fn read_sectors(&mut self, lba: u32, count: u32, buf: &mut [u8]) -> Result<(), BlockStatus> {
        (**self).read_sectors(lba, count, buf)
    }

    fn write_sectors(&mut self, lba: u32, count: u32, data: &[u8]) -> Result<(), BlockStatus> {
        (**self).write_sectors(lba, count, data)
    }
}

/// Byte length of a `count`-sector transfer, if `len` matches it
pub fn transfer_len(count: u32, len: usize) -> Result<usize, BlockStatus> {
    let expected = (count as usize)
        .checked_mul(SECTOR_SIZE)
        .ok_or(BlockStatus::InvalidParameter)?;
    if expected != len || count == 0 {
        return Err(BlockStatus::InvalidParameter);
    }
    Ok(expected)
}
