//! FAT32 BIOS Parameter Block (BPB)
//!
//! The BPB is located in the boot sector (the first sector of the partition)
//! and contains the parameters needed to locate the FATs and the data area.
//!
//! # Boot Sector Layout (512 bytes)
//! - Bytes 0-2: Jump instruction
//! - Bytes 3-10: OEM name
//! - Bytes 11-35: BPB (BIOS Parameter Block)
//! - Bytes 36-89: Extended BPB (FAT32 specific)
//! - Bytes 90-509: Boot code
//! - Bytes 510-511: Signature (0x55, 0xAA)
//!
//! Fields are decoded little-endian at fixed offsets; bytes the driver does
//! not consume are kept only so the formatter can write them.

use crate::fs::{FsError, FsResult};
use crate::io::SECTOR_SIZE;

/// FAT32 cluster entry values
pub mod cluster_values {
    /// Free cluster
    pub const FREE: u32 = 0x00000000;
    /// Bad cluster
    pub const BAD: u32 = 0x0FFFFFF7;
    /// End of chain (minimum value)
    pub const EOC_MIN: u32 = 0x0FFFFFF8;
    /// End of chain (standard value)
    pub const EOC: u32 = 0x0FFFFFFF;
    /// First data cluster
    pub const FIRST_DATA: u32 = 2;

    /// Mask for 28-bit cluster number
    pub const CLUSTER_MASK: u32 = 0x0FFFFFFF;
    /// Reserved top nibble of a FAT entry
    pub const RESERVED_MASK: u32 = 0xF0000000;

    /// Check if cluster is end of chain
    pub fn is_eoc(cluster: u32) -> bool {
        (cluster & CLUSTER_MASK) >= EOC_MIN
    }

    /// Check if cluster is free
    pub fn is_free(cluster: u32) -> bool {
        (cluster & CLUSTER_MASK) == FREE
    }

    /// Check if cluster is bad
    pub fn is_bad(cluster: u32) -> bool {
        (cluster & CLUSTER_MASK) == BAD
    }
}

/// Boot sector signature bytes
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// Extended boot signature
pub const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;

/// File system type string for FAT32
pub const FAT32_FS_TYPE: [u8; 8] = *b"FAT32   ";

fn le16(b: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([b[off], b[off + 1]])
}

fn le32(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

fn put16(b: &mut [u8], off: usize, v: u16) {
    b[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

fn put32(b: &mut [u8], off: usize, v: u32) {
    b[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

/// Decoded FAT32 boot sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fat32BootSector {
    /// Jump instruction (EB xx 90 or E9 xx xx)
    pub jump: [u8; 3],
    /// OEM name
    pub oem_name: [u8; 8],
    /// Bytes per sector (must be 512 for this driver)
    pub bytes_per_sector: u16,
    /// Sectors per cluster (power of 2)
    pub sectors_per_cluster: u8,
    /// Reserved sectors (including boot sector)
    pub reserved_sectors: u16,
    /// Number of FATs (usually 2)
    pub num_fats: u8,
    /// Root directory entries (0 for FAT32)
    pub root_entry_count: u16,
    /// Total sectors (16-bit, 0 for FAT32)
    pub total_sectors_16: u16,
    /// Media type (0xF8 for fixed disk)
    pub media_type: u8,
    /// Sectors per FAT (16-bit, 0 for FAT32)
    pub fat_size_16: u16,
    /// Sectors per track
    pub sectors_per_track: u16,
    /// Number of heads
    pub num_heads: u16,
    /// Hidden sectors (partition start)
    pub hidden_sectors: u32,
    /// Total sectors (32-bit)
    pub total_sectors_32: u32,
    /// Sectors per FAT copy
    pub fat_size_32: u32,
    /// Extended flags
    pub ext_flags: u16,
    /// File system version
    pub fs_version: u16,
    /// Root directory cluster
    pub root_cluster: u32,
    /// FSInfo sector number
    pub fs_info_sector: u16,
    /// Backup boot sector
    pub backup_boot_sector: u16,
    /// Drive number
    pub drive_number: u8,
    /// Extended boot signature (0x29)
    pub boot_signature: u8,
    /// Volume serial number
    pub volume_id: u32,
    /// Volume label (space-padded)
    pub volume_label: [u8; 11],
    /// File system type string
    pub fs_type: [u8; 8],
}

impl Fat32BootSector {
    /// Decode a boot sector. Only the length is checked here; geometry
    /// validation happens in [`VolumeGeometry::from_boot_sector`].
    pub fn parse(sector: &[u8]) -> FsResult<Self> {
        if sector.len() < SECTOR_SIZE {
            return Err(FsError::UnsupportedVolume);
        }
        let b = sector;

        let mut jump = [0u8; 3];
        jump.copy_from_slice(&b[0..3]);
        let mut oem_name = [0u8; 8];
        oem_name.copy_from_slice(&b[3..11]);
        let mut volume_label = [0u8; 11];
        volume_label.copy_from_slice(&b[71..82]);
        let mut fs_type = [0u8; 8];
        fs_type.copy_from_slice(&b[82..90]);

        Ok(Self {
            jump,
            oem_name,
            bytes_per_sector: le16(b, 11),
            sectors_per_cluster: b[13],
            reserved_sectors: le16(b, 14),
            num_fats: b[16],
            root_entry_count: le16(b, 17),
            total_sectors_16: le16(b, 19),
            media_type: b[21],
            fat_size_16: le16(b, 22),
            sectors_per_track: le16(b, 24),
            num_heads: le16(b, 26),
            hidden_sectors: le32(b, 28),
            total_sectors_32: le32(b, 32),
            fat_size_32: le32(b, 36),
            ext_flags: le16(b, 40),
            fs_version: le16(b, 42),
            root_cluster: le32(b, 44),
            fs_info_sector: le16(b, 48),
            backup_boot_sector: le16(b, 50),
            drive_number: b[64],
            boot_signature: b[66],
            volume_id: le32(b, 67),
            volume_label,
            fs_type,
        })
    }

    /// Encode into a full 512-byte sector (boot code zeroed, signature set)
    pub fn write_to(&self, sector: &mut [u8; SECTOR_SIZE]) {
        sector.fill(0);
        let b = &mut sector[..];
        b[0..3].copy_from_slice(&self.jump);
        b[3..11].copy_from_slice(&self.oem_name);
        put16(b, 11, self.bytes_per_sector);
        b[13] = self.sectors_per_cluster;
        put16(b, 14, self.reserved_sectors);
        b[16] = self.num_fats;
        put16(b, 17, self.root_entry_count);
        put16(b, 19, self.total_sectors_16);
        b[21] = self.media_type;
        put16(b, 22, self.fat_size_16);
        put16(b, 24, self.sectors_per_track);
        put16(b, 26, self.num_heads);
        put32(b, 28, self.hidden_sectors);
        put32(b, 32, self.total_sectors_32);
        put32(b, 36, self.fat_size_32);
        put16(b, 40, self.ext_flags);
        put16(b, 42, self.fs_version);
        put32(b, 44, self.root_cluster);
        put16(b, 48, self.fs_info_sector);
        put16(b, 50, self.backup_boot_sector);
        b[64] = self.drive_number;
        b[66] = self.boot_signature;
        put32(b, 67, self.volume_id);
        b[71..82].copy_from_slice(&self.volume_label);
        b[82..90].copy_from_slice(&self.fs_type);
        b[510..512].copy_from_slice(&BOOT_SIGNATURE);
    }

    /// Get total sectors
    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_16 != 0 {
            self.total_sectors_16 as u32
        } else {
            self.total_sectors_32
        }
    }

    /// Get volume label as string
    pub fn volume_label_str(&self) -> &str {
        let len = self
            .volume_label
            .iter()
            .rposition(|&b| b != b' ')
            .map(|p| p + 1)
            .unwrap_or(0);
        core::str::from_utf8(&self.volume_label[..len]).unwrap_or("")
    }
}

/// Volume geometry derived from the boot sector at mount time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeGeometry {
    /// LBA of the boot sector
    pub partition_lba: u32,
    /// Always 512
    pub bytes_per_sector: u32,
    /// Sectors per cluster
    pub sectors_per_cluster: u32,
    /// Reserved sectors before the first FAT
    pub reserved_sectors: u32,
    /// Number of FAT copies
    pub num_fats: u32,
    /// Sectors per FAT copy
    pub fat_size: u32,
    /// Root directory cluster
    pub root_cluster: u32,
    /// Legacy root directory sectors (0 on FAT32)
    pub root_dir_sectors: u32,
    /// Absolute LBA of the first FAT
    pub fat_start_sector: u32,
    /// Absolute LBA of cluster 2
    pub data_start_sector: u32,
    /// Cluster size in bytes
    pub bytes_per_cluster: u32,
    /// Number of data clusters
    pub total_clusters: u32,
}

impl VolumeGeometry {
    /// Validate a boot sector and derive the layout of the volume
    pub fn from_boot_sector(bs: &Fat32BootSector, partition_lba: u32) -> FsResult<Self> {
        if bs.bytes_per_sector as usize != SECTOR_SIZE {
            return Err(FsError::UnsupportedVolume);
        }
        let spc = bs.sectors_per_cluster as u32;
        if spc == 0 || !spc.is_power_of_two() {
            return Err(FsError::UnsupportedVolume);
        }
        if bs.num_fats == 0 || bs.fat_size_32 == 0 {
            return Err(FsError::UnsupportedVolume);
        }
        if bs.root_cluster < cluster_values::FIRST_DATA {
            return Err(FsError::UnsupportedVolume);
        }

        let bytes_per_sector = SECTOR_SIZE as u32;
        let root_dir_sectors =
            (bs.root_entry_count as u32 * 32).div_ceil(bytes_per_sector);
        let reserved = bs.reserved_sectors as u32;
        let num_fats = bs.num_fats as u32;
        let fat_size = bs.fat_size_32;

        let metadata = (num_fats as u64 * fat_size as u64)
            + reserved as u64
            + root_dir_sectors as u64;
        let total = bs.total_sectors() as u64;
        if total <= metadata {
            return Err(FsError::UnsupportedVolume);
        }
        // Every sector of the volume must be addressable by a 32-bit LBA
        if partition_lba as u64 + total > u32::MAX as u64 + 1 {
            return Err(FsError::UnsupportedVolume);
        }

        let fat_start_sector = partition_lba
            .checked_add(reserved)
            .ok_or(FsError::UnsupportedVolume)?;
        let data_start_sector: u32 = (partition_lba as u64 + metadata)
            .try_into()
            .map_err(|_| FsError::UnsupportedVolume)?;

        // A FAT sector holds 128 entries; entries 0 and 1 are reserved
        let fat_capacity = (fat_size as u64 * (bytes_per_sector as u64 / 4)).saturating_sub(2);
        let data_clusters = (total - metadata) / spc as u64;
        let total_clusters = data_clusters
            .min(fat_capacity)
            .min((cluster_values::BAD - cluster_values::FIRST_DATA) as u64) as u32;

        if total_clusters == 0 || bs.root_cluster >= total_clusters + cluster_values::FIRST_DATA {
            return Err(FsError::UnsupportedVolume);
        }

        Ok(Self {
            partition_lba,
            bytes_per_sector,
            sectors_per_cluster: spc,
            reserved_sectors: reserved,
            num_fats,
            fat_size,
            root_cluster: bs.root_cluster,
            root_dir_sectors,
            fat_start_sector,
            data_start_sector,
            bytes_per_cluster: spc * bytes_per_sector,
            total_clusters,
        })
    }

    /// One past the last valid data cluster
    pub fn cluster_end(&self) -> u32 {
        self.total_clusters + cluster_values::FIRST_DATA
    }

    /// Check if a cluster number addresses a data cluster of this volume
    pub fn is_data_cluster(&self, cluster: u32) -> bool {
        (cluster_values::FIRST_DATA..self.cluster_end()).contains(&cluster)
    }

    /// Get first sector of a cluster, `None` if the LBA does not fit
    pub fn cluster_to_sector(&self, cluster: u32) -> Option<u32> {
        cluster
            .checked_sub(cluster_values::FIRST_DATA)?
            .checked_mul(self.sectors_per_cluster)?
            .checked_add(self.data_start_sector)
    }

    /// FAT sector (primary copy) and byte offset holding a cluster's entry
    pub fn fat_entry_location(&self, cluster: u32) -> (u32, usize) {
        let offset = cluster * 4;
        let sector = self.fat_start_sector + offset / self.bytes_per_sector;
        (sector, (offset % self.bytes_per_sector) as usize)
    }

    /// Directory entries per cluster
    pub fn entries_per_cluster(&self) -> u32 {
        self.bytes_per_cluster / super::dir::DIR_ENTRY_SIZE as u32
    }
}

/// FSInfo structure (FAT32 only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsInfo {
    /// Free cluster count (0xFFFFFFFF if unknown)
    pub free_count: u32,
    /// Next free cluster hint (0xFFFFFFFF if unknown)
    pub next_free: u32,
}

impl FsInfo {
    /// Leading signature value
    pub const LEAD_SIG: u32 = 0x41615252;
    /// Structure signature value
    pub const STRUCT_SIG: u32 = 0x61417272;
    /// Trailing signature value
    pub const TRAIL_SIG: u32 = 0xAA550000;
    /// Value for an unknown count or hint
    pub const UNKNOWN: u32 = 0xFFFFFFFF;

    /// FSInfo with no free-space information
    pub const fn unknown() -> Self {
        Self {
            free_count: Self::UNKNOWN,
            next_free: Self::UNKNOWN,
        }
    }

    /// Encode into a full sector
    pub fn write_to(&self, sector: &mut [u8; SECTOR_SIZE]) {
        sector.fill(0);
        put32(sector, 0, Self::LEAD_SIG);
        put32(sector, 484, Self::STRUCT_SIG);
        put32(sector, 488, self.free_count);
        put32(sector, 492, self.next_free);
        put32(sector, 508, Self::TRAIL_SIG);
    }

    /// Decode a sector, if its signatures are valid
    pub fn parse(sector: &[u8]) -> Option<Self> {
        if sector.len() < SECTOR_SIZE
            || le32(sector, 0) != Self::LEAD_SIG
            || le32(sector, 484) != Self::STRUCT_SIG
            || le32(sector, 508) != Self::TRAIL_SIG
        {
            return None;
        }
        Some(Self {
            free_count: le32(sector, 488),
            next_free: le32(sector, 492),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_boot_sector() -> Fat32BootSector {
        let mut raw = [0u8; SECTOR_SIZE];
        raw[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        raw[11..13].copy_from_slice(&512u16.to_le_bytes());
        raw[13] = 4;
        raw[14..16].copy_from_slice(&32u16.to_le_bytes());
        raw[16] = 2;
        raw[32..36].copy_from_slice(&65536u32.to_le_bytes());
        raw[36..40].copy_from_slice(&128u32.to_le_bytes());
        raw[44..48].copy_from_slice(&2u32.to_le_bytes());
        raw[71..82].copy_from_slice(b"HOBBY      ");
        Fat32BootSector::parse(&raw).unwrap()
    }

    #[test]
    fn test_geometry_derivation() {
        let bs = sample_boot_sector();
        let geo = VolumeGeometry::from_boot_sector(&bs, 2048).unwrap();
        assert_eq!(geo.fat_start_sector, 2048 + 32);
        assert_eq!(geo.data_start_sector, 2048 + 32 + 2 * 128);
        assert_eq!(geo.bytes_per_cluster, 2048);
        assert_eq!(geo.root_dir_sectors, 0);
        assert_eq!(geo.total_clusters, (65536 - 32 - 256) / 4);
        assert_eq!(geo.cluster_to_sector(2), Some(geo.data_start_sector));
        assert_eq!(geo.cluster_to_sector(5), Some(geo.data_start_sector + 12));
        assert_eq!(geo.cluster_to_sector(1), None);
        assert_eq!(geo.fat_entry_location(130), (2048 + 32 + 1, 8));
        assert_eq!(bs.volume_label_str(), "HOBBY");
    }

    #[test]
    fn test_rejects_non_512_sectors() {
        let mut bs = sample_boot_sector();
        bs.bytes_per_sector = 4096;
        assert_eq!(
            VolumeGeometry::from_boot_sector(&bs, 0),
            Err(FsError::UnsupportedVolume)
        );
    }

    #[test]
    fn test_rejects_bad_cluster_size_and_empty_fat() {
        let mut bs = sample_boot_sector();
        bs.sectors_per_cluster = 3;
        assert!(VolumeGeometry::from_boot_sector(&bs, 0).is_err());

        let mut bs = sample_boot_sector();
        bs.fat_size_32 = 0;
        assert!(VolumeGeometry::from_boot_sector(&bs, 0).is_err());
    }

    #[test]
    fn test_cluster_count_capped_by_fat_size() {
        let mut bs = sample_boot_sector();
        bs.sectors_per_cluster = 1;
        bs.fat_size_32 = 1;
        let geo = VolumeGeometry::from_boot_sector(&bs, 0).unwrap();
        assert_eq!(geo.total_clusters, 126);
        assert!(geo.is_data_cluster(127));
        assert!(!geo.is_data_cluster(128));
    }

    #[test]
    fn test_rejects_volume_past_lba_limit() {
        let mut bs = sample_boot_sector();
        bs.sectors_per_cluster = 1;
        bs.fat_size_32 = 64;
        assert_eq!(
            VolumeGeometry::from_boot_sector(&bs, 0xFFFF_F000),
            Err(FsError::UnsupportedVolume)
        );
    }

    #[test]
    fn test_last_cluster_at_lba_limit() {
        let mut bs = sample_boot_sector();
        bs.sectors_per_cluster = 1;
        bs.fat_size_32 = 64;
        bs.total_sectors_32 = 0x1000;
        let geo = VolumeGeometry::from_boot_sector(&bs, 0xFFFF_F000).unwrap();
        let last = geo.cluster_end() - 1;
        assert_eq!(geo.cluster_to_sector(last), Some(u32::MAX));
        assert_eq!(geo.cluster_to_sector(last + 1), None);
    }

    #[test]
    fn test_boot_sector_encode_decode() {
        let bs = sample_boot_sector();
        let mut raw = [0u8; SECTOR_SIZE];
        bs.write_to(&mut raw);
        assert_eq!(raw[510..512], BOOT_SIGNATURE);
        assert_eq!(Fat32BootSector::parse(&raw).unwrap(), bs);
    }

    #[test]
    fn test_fsinfo_signatures() {
        let mut raw = [0u8; SECTOR_SIZE];
        FsInfo::unknown().write_to(&mut raw);
        assert_eq!(FsInfo::parse(&raw), Some(FsInfo::unknown()));
        raw[0] = 0;
        assert_eq!(FsInfo::parse(&raw), None);
    }
}
