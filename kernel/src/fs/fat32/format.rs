//! FAT32 volume formatter
//!
//! Lays down a fresh FAT32 file system:
//! - Boot sector (and a backup copy when the reserved area has room)
//! - FSInfo sector with free count and next-free marked unknown
//! - Zeroed FAT copies with entries 0 and 1 reserved
//! - An empty root directory in cluster 2
//!
//! The FAT size is found by iteration: a larger FAT leaves fewer data
//! clusters, so the size is grown until it covers every cluster.

use alloc::vec;

use crate::fs::{FsError, FsResult};
use crate::io::{BlockDevice, SECTOR_SIZE};

use super::bpb::{
    cluster_values, Fat32BootSector, FsInfo, VolumeGeometry, EXTENDED_BOOT_SIGNATURE,
    FAT32_FS_TYPE,
};

/// Media descriptor for fixed disks
const MEDIA_FIXED: u8 = 0xF8;

/// Sector holding the FSInfo structure
const FS_INFO_SECTOR: u16 = 1;

/// Sector holding the backup boot sector
const BACKUP_BOOT_SECTOR: u16 = 6;

/// Sectors zeroed per device call while clearing the FATs
const ZERO_RUN: u32 = 16;

/// Formatter parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Sectors per cluster (power of two)
    pub sectors_per_cluster: u8,
    /// Reserved sectors, at least 2 (boot sector and FSInfo)
    pub reserved_sectors: u16,
    /// Number of FAT copies
    pub num_fats: u8,
    /// Volume label (space-padded)
    pub volume_label: [u8; 11],
    /// Volume serial number
    pub volume_id: u32,
}

impl FormatOptions {
    pub const fn new() -> Self {
        Self {
            sectors_per_cluster: 1,
            reserved_sectors: 32,
            num_fats: 2,
            volume_label: *b"NO NAME    ",
            volume_id: 0x1234_5678,
        }
    }

    pub const fn with_sectors_per_cluster(mut self, sectors_per_cluster: u8) -> Self {
        self.sectors_per_cluster = sectors_per_cluster;
        self
    }

    pub const fn with_reserved_sectors(mut self, reserved_sectors: u16) -> Self {
        self.reserved_sectors = reserved_sectors;
        self
    }

    pub const fn with_num_fats(mut self, num_fats: u8) -> Self {
        self.num_fats = num_fats;
        self
    }

    pub const fn with_volume_id(mut self, volume_id: u32) -> Self {
        self.volume_id = volume_id;
        self
    }

    /// Set the label; it is upper-cased and cut to 11 characters
    pub fn with_label(mut self, label: &str) -> Self {
        self.volume_label = [b' '; 11];
        for (slot, b) in self.volume_label.iter_mut().zip(label.bytes()) {
            *slot = b.to_ascii_uppercase();
        }
        self
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Smallest FAT (in sectors) that covers every data cluster it leaves room for
fn fat_size_for(total_sectors: u32, options: &FormatOptions) -> FsResult<u32> {
    let spc = options.sectors_per_cluster as u64;
    let reserved = options.reserved_sectors as u64;
    let num_fats = options.num_fats as u64;
    let entries_per_sector = (SECTOR_SIZE / 4) as u64;

    let mut fat_size: u64 = 1;
    loop {
        let metadata = reserved + num_fats * fat_size;
        let data = (total_sectors as u64)
            .checked_sub(metadata)
            .ok_or(FsError::UnsupportedVolume)?;
        let clusters = data / spc;
        let needed = (clusters + 2).div_ceil(entries_per_sector);
        if needed <= fat_size {
            return u32::try_from(fat_size).map_err(|_| FsError::UnsupportedVolume);
        }
        fat_size = needed;
    }
}

/// Write a fresh FAT32 file system of `total_sectors` sectors at `partition_lba`.
///
/// Returns the geometry a subsequent mount will see.
pub fn format_volume<D: BlockDevice>(
    device: &mut D,
    partition_lba: u32,
    total_sectors: u32,
    options: &FormatOptions,
) -> FsResult<VolumeGeometry> {
    let spc = options.sectors_per_cluster;
    if spc == 0 || !spc.is_power_of_two() || options.num_fats == 0 {
        return Err(FsError::UnsupportedVolume);
    }
    if options.reserved_sectors <= FS_INFO_SECTOR {
        return Err(FsError::UnsupportedVolume);
    }

    let fat_size = fat_size_for(total_sectors, options)?;
    let has_backup = options.reserved_sectors > BACKUP_BOOT_SECTOR + FS_INFO_SECTOR;

    let boot = Fat32BootSector {
        jump: [0xEB, 0x58, 0x90],
        oem_name: *b"HOBBYOS ",
        bytes_per_sector: SECTOR_SIZE as u16,
        sectors_per_cluster: spc,
        reserved_sectors: options.reserved_sectors,
        num_fats: options.num_fats,
        root_entry_count: 0,
        total_sectors_16: 0,
        media_type: MEDIA_FIXED,
        fat_size_16: 0,
        sectors_per_track: 63,
        num_heads: 255,
        hidden_sectors: partition_lba,
        total_sectors_32: total_sectors,
        fat_size_32: fat_size,
        ext_flags: 0,
        fs_version: 0,
        root_cluster: cluster_values::FIRST_DATA,
        fs_info_sector: FS_INFO_SECTOR,
        backup_boot_sector: if has_backup { BACKUP_BOOT_SECTOR } else { 0 },
        drive_number: 0x80,
        boot_signature: EXTENDED_BOOT_SIGNATURE,
        volume_id: options.volume_id,
        volume_label: options.volume_label,
        fs_type: FAT32_FS_TYPE,
    };
    // Validates the layout before anything is written
    let geometry = VolumeGeometry::from_boot_sector(&boot, partition_lba)?;

    let mut sector = [0u8; SECTOR_SIZE];
    boot.write_to(&mut sector);
    device.write_sectors(partition_lba, 1, &sector)?;
    if has_backup {
        device.write_sectors(partition_lba + BACKUP_BOOT_SECTOR as u32, 1, &sector)?;
    }

    FsInfo::unknown().write_to(&mut sector);
    device.write_sectors(partition_lba + FS_INFO_SECTOR as u32, 1, &sector)?;
    if has_backup {
        let backup = partition_lba + (BACKUP_BOOT_SECTOR + FS_INFO_SECTOR) as u32;
        device.write_sectors(backup, 1, &sector)?;
    }

    // Clear every FAT copy
    let zeros = vec![0u8; ZERO_RUN as usize * SECTOR_SIZE];
    let fat_sectors = geometry.num_fats * fat_size;
    let mut done = 0;
    while done < fat_sectors {
        let run = (fat_sectors - done).min(ZERO_RUN);
        let bytes = run as usize * SECTOR_SIZE;
        device.write_sectors(geometry.fat_start_sector + done, run, &zeros[..bytes])?;
        done += run;
    }

    // Reserved entries and the root directory's single cluster
    sector.fill(0);
    let first_entries = [
        0x0FFF_FF00 | MEDIA_FIXED as u32,
        cluster_values::EOC,
        cluster_values::EOC,
    ];
    for (i, value) in first_entries.iter().enumerate() {
        sector[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
    }
    for copy in 0..geometry.num_fats {
        device.write_sectors(geometry.fat_start_sector + copy * fat_size, 1, &sector)?;
    }

    let root = vec![0u8; geometry.bytes_per_cluster as usize];
    let root_lba = geometry
        .cluster_to_sector(geometry.root_cluster)
        .ok_or(FsError::UnsupportedVolume)?;
    device.write_sectors(root_lba, geometry.sectors_per_cluster, &root)?;

    log::info!(
        "[FAT32] Formatted '{}' at LBA {}: {} sectors, {} clusters of {} bytes, FAT {} sectors x{}",
        boot.volume_label_str(),
        partition_lba,
        total_sectors,
        geometry.total_clusters,
        geometry.bytes_per_cluster,
        fat_size,
        geometry.num_fats
    );
    Ok(geometry)
}
