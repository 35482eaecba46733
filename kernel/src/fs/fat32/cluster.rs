//! Cluster I/O
//!
//! Whole-cluster transfers: one multi-sector device call per cluster.

use alloc::vec;
use alloc::vec::Vec;

use crate::fs::{FsError, FsResult};
use crate::io::{BlockDevice, BlockStatus};

use super::bpb::cluster_values;
use super::volume::Fat32Volume;

impl<D: BlockDevice> Fat32Volume<D> {
    /// First LBA of a data cluster
    pub fn cluster_lba(&self, cluster: u32) -> FsResult<u32> {
        if cluster < cluster_values::FIRST_DATA
            || cluster >= cluster_values::EOC_MIN
            || !self.geometry.is_data_cluster(cluster)
        {
            return Err(FsError::InvalidCluster);
        }
        self.geometry
            .cluster_to_sector(cluster)
            .ok_or(FsError::InvalidCluster)
    }

    /// A zeroed scratch buffer of one cluster
    pub fn cluster_buffer(&self) -> Vec<u8> {
        vec![0u8; self.geometry.bytes_per_cluster as usize]
    }

    fn check_cluster_len(&self, len: usize) -> FsResult<()> {
        if len != self.geometry.bytes_per_cluster as usize {
            return Err(BlockStatus::InvalidParameter.into());
        }
        Ok(())
    }

    /// Read a whole cluster into `buf` (exactly `bytes_per_cluster` long)
    pub fn read_cluster(&mut self, cluster: u32, buf: &mut [u8]) -> FsResult<()> {
        let lba = self.cluster_lba(cluster)?;
        self.check_cluster_len(buf.len())?;
        self.device
            .read_sectors(lba, self.geometry.sectors_per_cluster, buf)?;
        Ok(())
    }

    /// Write a whole cluster from `data` (exactly `bytes_per_cluster` long)
    pub fn write_cluster(&mut self, cluster: u32, data: &[u8]) -> FsResult<()> {
        let lba = self.cluster_lba(cluster)?;
        self.check_cluster_len(data.len())?;
        self.device
            .write_sectors(lba, self.geometry.sectors_per_cluster, data)?;
        Ok(())
    }

    /// Fill a cluster with zeros
    pub fn zero_cluster(&mut self, cluster: u32) -> FsResult<()> {
        let zeros = self.cluster_buffer();
        self.write_cluster(cluster, &zeros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::fat32::testing;

    #[test]
    fn test_invalid_clusters_rejected() {
        let mut vol = testing::mounted(testing::TEST_SECTORS, 2);
        let mut buf = vol.cluster_buffer();
        let end = vol.geometry().cluster_end();
        for cluster in [0, 1, end, cluster_values::EOC_MIN, cluster_values::EOC] {
            assert_eq!(
                vol.read_cluster(cluster, &mut buf),
                Err(FsError::InvalidCluster)
            );
            assert_eq!(vol.write_cluster(cluster, &buf), Err(FsError::InvalidCluster));
        }
    }

    #[test]
    fn test_one_transfer_per_cluster() {
        let mut vol = testing::mounted(testing::TEST_SECTORS, 4);
        assert_eq!(vol.cluster_buffer().len(), 2048);
        let data: Vec<u8> = (0..2048).map(|i| (i % 251) as u8).collect();

        let writes = vol.device().write_ops();
        vol.write_cluster(7, &data).unwrap();
        assert_eq!(vol.device().write_ops(), writes + 1);

        let reads = vol.device().read_ops();
        let mut back = vol.cluster_buffer();
        vol.read_cluster(7, &mut back).unwrap();
        assert_eq!(vol.device().read_ops(), reads + 1);
        assert_eq!(back, data);

        let lba = vol.cluster_lba(7).unwrap();
        assert_eq!(lba, vol.geometry().data_start_sector + 5 * 4);
        assert_eq!(vol.device().sector(lba + 1).unwrap(), &data[512..1024]);
    }

    #[test]
    fn test_wrong_buffer_length_rejected() {
        let mut vol = testing::test_volume();
        let mut short = [0u8; 100];
        assert_eq!(
            vol.read_cluster(5, &mut short),
            Err(FsError::IoFailure(BlockStatus::InvalidParameter))
        );
    }

    #[test]
    fn test_zero_cluster() {
        let mut vol = testing::test_volume();
        let ones = [0xFFu8; 512];
        vol.write_cluster(9, &ones).unwrap();
        vol.zero_cluster(9).unwrap();
        let mut back = vol.cluster_buffer();
        vol.read_cluster(9, &mut back).unwrap();
        assert!(back.iter().all(|&b| b == 0));
    }
}
