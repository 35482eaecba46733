//! I/O Layer
//!
//! - `block` - Block device interface consumed by file systems
//! - `ramdisk` - Heap-backed block device

pub mod block;
pub mod ramdisk;

pub use block::{BlockDevice, BlockStatus, SECTOR_SIZE};
pub use ramdisk::RamDisk;

/// Initialize the I/O layer
pub fn init() {
    log::info!("[IO] Block layer initialized (sector size {})", SECTOR_SIZE);
}
