//! Mounted FAT32 volume
//!
//! A [`Fat32Volume`] owns its block device, the geometry read at mount
//! time, the allocation cursor and the current-directory register. Every
//! operation takes `&mut self`; callers that share a volume put it behind
//! a lock (see [`crate::fs::mount`]).

use crate::fs::path::{DirectoryPath, MAX_PATH, MAX_PATH_DEPTH};
use crate::fs::FsResult;
use crate::io::{BlockDevice, SECTOR_SIZE};

use super::bpb::{cluster_values, Fat32BootSector, VolumeGeometry};

/// What `..` resolves to while walking a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentResolution {
    /// Follow the directory's on-disk `..` entry (0 means the root)
    FollowEntry,
    /// Always resolve to the root directory
    Root,
}

/// How names that do not fit 8.3 are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePolicy {
    /// Fail with `NameTooLong`
    Reject,
    /// Silently cut the base to 8 and the extension to 3 characters
    Truncate,
}

/// Mount-time options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountOptions {
    pub parent_resolution: ParentResolution,
    pub name_policy: NamePolicy,
    /// Replicate every FAT sector write to the other FAT copies
    pub mirror_fats: bool,
    /// Maximum components in a path
    pub max_path_depth: usize,
    /// Maximum bytes in a path or in the current-directory string
    pub max_path_len: usize,
}

impl MountOptions {
    pub const fn new() -> Self {
        Self {
            parent_resolution: ParentResolution::FollowEntry,
            name_policy: NamePolicy::Reject,
            mirror_fats: true,
            max_path_depth: MAX_PATH_DEPTH,
            max_path_len: MAX_PATH,
        }
    }

    pub const fn with_parent_resolution(mut self, parent_resolution: ParentResolution) -> Self {
        self.parent_resolution = parent_resolution;
        self
    }

    pub const fn with_name_policy(mut self, name_policy: NamePolicy) -> Self {
        self.name_policy = name_policy;
        self
    }

    pub const fn with_mirror_fats(mut self, mirror_fats: bool) -> Self {
        self.mirror_fats = mirror_fats;
        self
    }

    pub const fn with_path_limits(mut self, max_path_len: usize, max_path_depth: usize) -> Self {
        self.max_path_len = max_path_len;
        self.max_path_depth = max_path_depth;
        self
    }
}

impl Default for MountOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A mounted FAT32 volume
pub struct Fat32Volume<D> {
    pub(super) device: D,
    pub(super) boot: Fat32BootSector,
    pub(super) geometry: VolumeGeometry,
    pub(super) options: MountOptions,
    /// Allocation cursor: the next cluster `alloc_cluster` looks at
    pub(super) next_free: u32,
    pub(super) cwd_cluster: u32,
    pub(super) cwd_path: DirectoryPath,
}

impl<D: BlockDevice> Fat32Volume<D> {
    /// Mount the volume whose boot sector is at `partition_lba`
    pub fn mount(device: D, partition_lba: u32) -> FsResult<Self> {
        Self::mount_with(device, partition_lba, MountOptions::default())
    }

    /// Mount with explicit options
    pub fn mount_with(mut device: D, partition_lba: u32, options: MountOptions) -> FsResult<Self> {
        let mut sector = [0u8; SECTOR_SIZE];
        device.read_sectors(partition_lba, 1, &mut sector)?;

        let boot = Fat32BootSector::parse(&sector)?;
        let geometry = match VolumeGeometry::from_boot_sector(&boot, partition_lba) {
            Ok(geometry) => geometry,
            Err(e) => {
                log::warn!(
                    "[FAT32] Rejected volume at LBA {}: {} (bytes/sector={}, sectors/cluster={})",
                    partition_lba,
                    e,
                    boot.bytes_per_sector,
                    boot.sectors_per_cluster
                );
                return Err(e);
            }
        };

        log::info!(
            "[FAT32] Mounted volume '{}' serial={:08X} at LBA {}",
            boot.volume_label_str(),
            boot.volume_id,
            partition_lba
        );
        log::info!(
            "[FAT32]   {} clusters of {} bytes, {} FAT(s) of {} sectors, root cluster {}",
            geometry.total_clusters,
            geometry.bytes_per_cluster,
            geometry.num_fats,
            geometry.fat_size,
            geometry.root_cluster
        );

        Ok(Self {
            device,
            boot,
            geometry,
            options,
            next_free: cluster_values::FIRST_DATA,
            cwd_cluster: geometry.root_cluster,
            cwd_path: DirectoryPath::root(),
        })
    }

    /// Unmount, handing the device back
    pub fn into_device(self) -> D {
        log::info!("[FAT32] Unmounted volume '{}'", self.boot.volume_label_str());
        self.device
    }
}

impl<D> Fat32Volume<D> {
    /// The underlying block device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the underlying block device
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn boot_sector(&self) -> &Fat32BootSector {
        &self.boot
    }

    pub fn options(&self) -> &MountOptions {
        &self.options
    }

    /// Volume label from the boot sector, trailing spaces removed
    pub fn volume_label(&self) -> &str {
        self.boot.volume_label_str()
    }

    /// Volume serial number
    pub fn serial(&self) -> u32 {
        self.boot.volume_id
    }

    /// Root directory cluster
    pub fn root_cluster(&self) -> u32 {
        self.geometry.root_cluster
    }

    /// Current directory as a canonical absolute path
    pub fn current_directory(&self) -> &str {
        self.cwd_path.as_str()
    }

    /// First cluster of the current directory
    pub fn current_cluster(&self) -> u32 {
        self.cwd_cluster
    }
}
