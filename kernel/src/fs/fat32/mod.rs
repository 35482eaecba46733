//! FAT32 File System Driver
//!
//! Implements FAT32 support on top of any [`BlockDevice`](crate::io::BlockDevice).
//! This driver provides:
//! - Volume mounting (boot sector validation and geometry)
//! - FAT chain access with mirrored FAT copies
//! - 8.3 short-name directories (long-name entries are skipped)
//! - File reading/writing, create/delete, mkdir/rmdir, rename
//! - A current-directory register for relative paths
//! - Volume formatting
//!
//! # Structure
//! - `bpb` - BIOS Parameter Block, boot sector and geometry
//! - `table` - FAT entry access and cluster allocation
//! - `cluster` - Whole-cluster I/O
//! - `dir` - Directory entry codec and 8.3 names
//! - `volume` - Mounted volume and mount options
//! - `lookup` - Directory scanning and path resolution
//! - `file` - File and directory operations
//! - `format` - Formatter

pub mod bpb;
pub mod cluster;
pub mod dir;
pub mod file;
pub mod format;
pub mod lookup;
pub mod table;
pub mod volume;

// Re-export commonly used items
pub use bpb::cluster_values;
pub use bpb::{Fat32BootSector, FsInfo, VolumeGeometry};
pub use dir::{decode_name, encode_name, DirEntry, DirListing, FileAttributes, FileInfo};
pub use dir::DIR_ENTRY_SIZE;
pub use format::{format_volume, FormatOptions};
pub use lookup::{DirHit, EntryLocation};
pub use volume::{Fat32Volume, MountOptions, NamePolicy, ParentResolution};

/// Initialize FAT32 subsystem
pub fn init() {
    log::info!("[FS] FAT32 driver initializing...");
    log::info!("[FS] FAT32 driver initialized");
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{format_volume, Fat32Volume, FormatOptions, MountOptions};
    use crate::io::RamDisk;

    /// Size of the default test volume (2MB, 4000 one-sector clusters)
    pub const TEST_SECTORS: u32 = 4096;

    /// A freshly formatted RAM disk
    pub fn formatted_disk(sectors: u32, sectors_per_cluster: u8) -> RamDisk {
        let mut disk = RamDisk::new(sectors);
        let options = FormatOptions::new().with_sectors_per_cluster(sectors_per_cluster);
        format_volume(&mut disk, 0, sectors, &options).unwrap();
        disk
    }

    /// Mount a freshly formatted volume with explicit options
    pub fn mounted_with(
        sectors: u32,
        sectors_per_cluster: u8,
        options: MountOptions,
    ) -> Fat32Volume<RamDisk> {
        Fat32Volume::mount_with(formatted_disk(sectors, sectors_per_cluster), 0, options).unwrap()
    }

    /// Mount a freshly formatted volume with default options
    pub fn mounted(sectors: u32, sectors_per_cluster: u8) -> Fat32Volume<RamDisk> {
        mounted_with(sectors, sectors_per_cluster, MountOptions::default())
    }

    /// The default test volume (512-byte clusters)
    pub fn test_volume() -> Fat32Volume<RamDisk> {
        mounted(TEST_SECTORS, 1)
    }
}
