//! RAM Disk Driver
//!
//! Provides an in-memory block device for testing and temporary storage.
//! The backing store is a heap buffer sized at creation time.
//!
//! # Features
//! - Full read/write support
//! - Import/export of raw disk images
//! - Fault injection for exercising error paths
//! - No persistence (data lost on reboot)

use alloc::vec;
use alloc::vec::Vec;

use super::block::{transfer_len, BlockDevice, BlockStatus, SECTOR_SIZE};

/// Heap-backed block device
pub struct RamDisk {
    data: Vec<u8>,
    /// Remaining successful reads before `IoError` (None = never fail)
    reads_left: Option<usize>,
    /// Remaining successful writes before `IoError` (None = never fail)
    writes_left: Option<usize>,
    read_ops: usize,
    write_ops: usize,
}

impl RamDisk {
    /// Create a zero-filled RAM disk of `sectors` sectors
    pub fn new(sectors: u32) -> Self {
        Self::from_image(vec![0u8; sectors as usize * SECTOR_SIZE])
    }

    /// Wrap an existing disk image. A trailing partial sector is dropped.
    pub fn from_image(mut image: Vec<u8>) -> Self {
        let whole = image.len() - image.len() % SECTOR_SIZE;
        image.truncate(whole);
        log::debug!("[RAMDISK] Created RAM disk: {} sectors", whole / SECTOR_SIZE);
        Self {
            data: image,
            reads_left: None,
            writes_left: None,
            read_ops: 0,
            write_ops: 0,
        }
    }

    /// Number of sectors
    pub fn sector_count(&self) -> u32 {
        (self.data.len() / SECTOR_SIZE) as u32
    }

    /// Raw image contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the disk, returning its image
    pub fn into_image(self) -> Vec<u8> {
        self.data
    }

    /// Borrow one sector
    pub fn sector(&self, lba: u32) -> Option<&[u8]> {
        let start = lba as usize * SECTOR_SIZE;
        self.data.get(start..start + SECTOR_SIZE)
    }

    /// Let `n` more reads succeed, then fail every read with `IoError`
    pub fn fail_reads_after(&mut self, n: usize) {
        self.reads_left = Some(n);
    }

    /// Let `n` more writes succeed, then fail every write with `IoError`
    pub fn fail_writes_after(&mut self, n: usize) {
        self.writes_left = Some(n);
    }

    /// Clear any injected faults
    pub fn clear_faults(&mut self) {
        self.reads_left = None;
        self.writes_left = None;
    }

    /// Number of successful read transfers
    pub fn read_ops(&self) -> usize {
        self.read_ops
    }

    /// Number of successful write transfers
    pub fn write_ops(&self) -> usize {
        self.write_ops
    }

    fn byte_range(&self, lba: u32, count: u32, len: usize) -> Result<(usize, usize), BlockStatus> {
        let bytes = transfer_len(count, len)?;
        let start = lba as usize * SECTOR_SIZE;
        let end = start.checked_add(bytes).ok_or(BlockStatus::InvalidParameter)?;
        if end > self.data.len() {
            return Err(BlockStatus::InvalidParameter);
        }
        Ok((start, end))
    }
}

/// Consume one unit of an injected fault budget
fn take_budget(budget: &mut Option<usize>) -> Result<(), BlockStatus> {
    match budget {
        Some(0) => Err(BlockStatus::IoError),
        Some(n) => {
            *n -= 1;
            Ok(())
        }
        None => Ok(()),
    }
}

impl BlockDevice for RamDisk {
    fn read_sectors(&mut self, lba: u32, count: u32, buf: &mut [u8]) -> Result<(), BlockStatus> {
        let (start, end) = self.byte_range(lba, count, buf.len())?;
        take_budget(&mut self.reads_left)?;
        buf.copy_from_slice(&self.data[start..end]);
        self.read_ops += 1;
        Ok(())
    }

    fn write_sectors(&mut self, lba: u32, count: u32, data: &[u8]) -> Result<(), BlockStatus> {
        let (start, end) = self.byte_range(lba, count, data.len())?;
        take_budget(&mut self.writes_left)?;
        self.data[start..end].copy_from_slice(data);
        self.write_ops += 1;
        Ok(())
    }
}
