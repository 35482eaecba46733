//! File Allocation Table access
//!
//! Each FAT entry is a little-endian u32 whose low 28 bits link a cluster
//! to the next one in its chain. The top 4 bits are reserved: they are
//! ignored on read and written back unchanged.
//!
//! The primary FAT is the source of truth. Every modified sector is copied
//! verbatim into the other FAT copies so they stay byte-identical.

use alloc::vec::Vec;

use crate::fs::{FsError, FsResult};
use crate::io::{BlockDevice, SECTOR_SIZE};

use super::bpb::cluster_values;
use super::volume::Fat32Volume;

/// FAT entries per sector
const ENTRIES_PER_SECTOR: u32 = (SECTOR_SIZE / 4) as u32;

fn entry_at(sector: &[u8; SECTOR_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes([
        sector[offset],
        sector[offset + 1],
        sector[offset + 2],
        sector[offset + 3],
    ])
}

impl<D: BlockDevice> Fat32Volume<D> {
    fn read_fat_sector(&mut self, sector: u32, buf: &mut [u8; SECTOR_SIZE]) -> FsResult<()> {
        self.device.read_sectors(sector, 1, buf)?;
        Ok(())
    }

    /// Read the FAT entry of `cluster`, masked to 28 bits
    pub fn get_entry(&mut self, cluster: u32) -> FsResult<u32> {
        if cluster >= self.geometry.cluster_end() {
            return Err(FsError::InvalidCluster);
        }
        let (sector, offset) = self.geometry.fat_entry_location(cluster);
        let mut buf = [0u8; SECTOR_SIZE];
        self.read_fat_sector(sector, &mut buf)?;
        Ok(entry_at(&buf, offset) & cluster_values::CLUSTER_MASK)
    }

    /// Write the FAT entry of `cluster` in every FAT copy
    pub fn set_entry(&mut self, cluster: u32, value: u32) -> FsResult<()> {
        if !self.geometry.is_data_cluster(cluster) {
            return Err(FsError::InvalidCluster);
        }
        let (sector, offset) = self.geometry.fat_entry_location(cluster);
        let mut buf = [0u8; SECTOR_SIZE];
        self.read_fat_sector(sector, &mut buf)?;

        let old = entry_at(&buf, offset);
        let new = (old & cluster_values::RESERVED_MASK) | (value & cluster_values::CLUSTER_MASK);
        buf[offset..offset + 4].copy_from_slice(&new.to_le_bytes());
        self.device.write_sectors(sector, 1, &buf)?;

        if self.options.mirror_fats {
            for copy in 1..self.geometry.num_fats {
                let mirror = sector + copy * self.geometry.fat_size;
                if let Err(status) = self.device.write_sectors(mirror, 1, &buf) {
                    log::warn!(
                        "[FAT32] FAT copy {} write failed at sector {}: {}",
                        copy,
                        mirror,
                        status
                    );
                    return Err(status.into());
                }
            }
        }

        log::trace!("[FAT32] FAT[{}] = {:#010X}", cluster, value & cluster_values::CLUSTER_MASK);
        Ok(())
    }

    /// Scan for a free cluster starting at the allocation cursor.
    ///
    /// Reads each FAT sector at most once per scan.
    fn find_free_cluster(&mut self) -> FsResult<Option<u32>> {
        let total = self.geometry.total_clusters;
        let first = cluster_values::FIRST_DATA;
        let start = if self.geometry.is_data_cluster(self.next_free) {
            self.next_free - first
        } else {
            0
        };

        let mut buf = [0u8; SECTOR_SIZE];
        let mut loaded: Option<u32> = None;
        for i in 0..total {
            let cluster = first + (start + i) % total;
            let (sector, offset) = self.geometry.fat_entry_location(cluster);
            if loaded != Some(sector) {
                self.read_fat_sector(sector, &mut buf)?;
                loaded = Some(sector);
            }
            if cluster_values::is_free(entry_at(&buf, offset)) {
                return Ok(Some(cluster));
            }
        }
        Ok(None)
    }

    /// Allocate one cluster and mark it end-of-chain.
    ///
    /// First fit from a rotating cursor; the cursor moves past the cluster
    /// handed out so the next search starts after it.
    pub fn alloc_cluster(&mut self) -> FsResult<u32> {
        let cluster = match self.find_free_cluster()? {
            Some(cluster) => cluster,
            None => {
                log::debug!("[FAT32] No free clusters");
                return Err(FsError::NoSpace);
            }
        };
        self.set_entry(cluster, cluster_values::EOC)?;

        self.next_free = if cluster + 1 >= self.geometry.cluster_end() {
            cluster_values::FIRST_DATA
        } else {
            cluster + 1
        };
        log::trace!("[FAT32] Allocated cluster {}", cluster);
        Ok(cluster)
    }

    /// Follow one link of a chain.
    ///
    /// Returns `None` at end-of-chain. A free, bad or out-of-range link is
    /// corruption and fails with `InvalidCluster`.
    pub fn next_cluster(&mut self, cluster: u32) -> FsResult<Option<u32>> {
        let value = self.get_entry(cluster)?;
        if cluster_values::is_eoc(value) {
            return Ok(None);
        }
        if cluster_values::is_bad(value) {
            log::warn!("[FAT32] Chain through bad cluster after {}", cluster);
            return Err(FsError::InvalidCluster);
        }
        if cluster_values::is_free(value) || !self.geometry.is_data_cluster(value) {
            log::warn!("[FAT32] Invalid link {:#X} from cluster {}", value, cluster);
            return Err(FsError::InvalidCluster);
        }
        Ok(Some(value))
    }

    /// Every cluster of the chain starting at `start`, in order.
    ///
    /// A chain longer than the volume has a loop and fails with
    /// `CorruptChain`.
    pub fn cluster_chain(&mut self, start: u32) -> FsResult<Vec<u32>> {
        if !self.geometry.is_data_cluster(start) {
            return Err(FsError::InvalidCluster);
        }
        let limit = self.geometry.total_clusters as usize;
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(cluster) = current {
            if chain.len() >= limit {
                log::warn!("[FAT32] Cluster chain from {} does not terminate", start);
                return Err(FsError::CorruptChain);
            }
            chain.push(cluster);
            current = self.next_cluster(cluster)?;
        }
        Ok(chain)
    }

    /// Release every cluster of the chain starting at `start`.
    ///
    /// The whole chain is walked before anything is freed, so a corrupt
    /// chain is reported without touching the FAT. Returns the number of
    /// clusters freed.
    pub fn free_chain(&mut self, start: u32) -> FsResult<u32> {
        let chain = self.cluster_chain(start)?;
        for &cluster in &chain {
            self.set_entry(cluster, cluster_values::FREE)?;
        }
        log::trace!("[FAT32] Freed {} cluster(s) from {}", chain.len(), start);
        Ok(chain.len() as u32)
    }

    /// Append a freshly allocated cluster after `last`
    pub fn extend_chain(&mut self, last: u32) -> FsResult<u32> {
        let cluster = self.alloc_cluster()?;
        if let Err(e) = self.set_entry(last, cluster) {
            self.set_entry(cluster, cluster_values::FREE)?;
            return Err(e);
        }
        Ok(cluster)
    }

    /// Count free clusters by scanning the primary FAT
    pub fn free_cluster_count(&mut self) -> FsResult<u32> {
        let end = self.geometry.cluster_end();
        let mut buf = [0u8; SECTOR_SIZE];
        let mut free = 0;
        let mut cluster = cluster_values::FIRST_DATA;
        while cluster < end {
            let (sector, _) = self.geometry.fat_entry_location(cluster);
            self.read_fat_sector(sector, &mut buf)?;
            // Entries from `cluster` to the end of this sector
            let in_sector = ENTRIES_PER_SECTOR - cluster % ENTRIES_PER_SECTOR;
            let last = (cluster + in_sector).min(end);
            for c in cluster..last {
                let offset = ((c % ENTRIES_PER_SECTOR) * 4) as usize;
                if cluster_values::is_free(entry_at(&buf, offset)) {
                    free += 1;
                }
            }
            cluster = last;
        }
        Ok(free)
    }
}
