//! FAT32 file and directory operations
//!
//! Every path is resolved from the current directory unless it starts
//! with `/`. Names are 8.3 short names; see [`encode_name`].
//!
//! Operations are not journaled. A device failure part way through a
//! multi-cluster write can leave the chain extended but the entry's size
//! unchanged.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::ControlFlow;

use crate::fs::{FsError, FsResult};
use crate::io::BlockDevice;

use super::bpb::cluster_values;
use super::dir::{encode_name, DirEntry, DirListing, FileAttributes, FileInfo, SlotState};
use super::lookup::{DirHit, Target};
use super::volume::Fat32Volume;

impl<D: BlockDevice> Fat32Volume<D> {
    /// Resolve a path that must name a regular file
    fn resolve_file(&mut self, path: &str) -> FsResult<DirHit> {
        let hit = self.resolve_entry(path)?;
        if hit.entry.is_directory() {
            return Err(FsError::IsDirectory);
        }
        Ok(hit)
    }

    /// Copy the start of a file's data into `buf`
    fn read_entry(&mut self, entry: &DirEntry, buf: &mut [u8]) -> FsResult<usize> {
        let want = buf.len().min(entry.file_size as usize);
        if want == 0 {
            return Ok(0);
        }

        let mut cluster = entry.first_cluster();
        if cluster == 0 {
            log::warn!(
                "[FAT32] '{}' has size {} but no clusters",
                entry.display_name(),
                entry.file_size
            );
            return Err(FsError::CorruptChain);
        }

        let bytes_per_cluster = self.geometry.bytes_per_cluster as usize;
        let mut scratch = self.cluster_buffer();
        let mut copied = 0;
        loop {
            self.read_cluster(cluster, &mut scratch)?;
            let n = (want - copied).min(bytes_per_cluster);
            buf[copied..copied + n].copy_from_slice(&scratch[..n]);
            copied += n;
            if copied == want {
                return Ok(copied);
            }
            cluster = match self.next_cluster(cluster)? {
                Some(next) => next,
                None => {
                    log::warn!(
                        "[FAT32] '{}' chain ends after {} of {} bytes",
                        entry.display_name(),
                        copied,
                        want
                    );
                    return Err(FsError::CorruptChain);
                }
            };
        }
    }

    /// Read up to `buf.len()` bytes of a file into `buf`.
    ///
    /// Returns the number of bytes copied: the smaller of the file size and
    /// the buffer length.
    pub fn read_into(&mut self, path: &str, buf: &mut [u8]) -> FsResult<usize> {
        let hit = self.resolve_file(path)?;
        self.read_entry(&hit.entry, buf)
    }

    /// Read at most `max_size` bytes of a file
    pub fn read(&mut self, path: &str, max_size: usize) -> FsResult<Vec<u8>> {
        let hit = self.resolve_file(path)?;
        let len = max_size.min(hit.entry.file_size as usize);
        let mut data = vec![0u8; len];
        let copied = self.read_entry(&hit.entry, &mut data)?;
        data.truncate(copied);
        Ok(data)
    }

    /// Store `data` cluster by cluster, reusing `old_chain` and growing it.
    /// Clusters added to the chain are recorded in `grown`.
    fn write_chain(
        &mut self,
        entry: &mut DirEntry,
        data: &[u8],
        old_chain: &[u32],
        grown: &mut Vec<u32>,
    ) -> FsResult<()> {
        let bytes_per_cluster = self.geometry.bytes_per_cluster as usize;
        let mut scratch = self.cluster_buffer();
        let mut prev: Option<u32> = None;

        for (i, chunk) in data.chunks(bytes_per_cluster).enumerate() {
            let cluster = match (old_chain.get(i), prev) {
                (Some(&cluster), _) => cluster,
                (None, Some(last)) => {
                    let cluster = self.extend_chain(last)?;
                    grown.push(cluster);
                    cluster
                }
                (None, None) => {
                    let cluster = self.alloc_cluster()?;
                    grown.push(cluster);
                    entry.set_first_cluster(cluster);
                    cluster
                }
            };
            scratch[..chunk.len()].copy_from_slice(chunk);
            scratch[chunk.len()..].fill(0);
            self.write_cluster(cluster, &scratch)?;
            prev = Some(cluster);
        }
        Ok(())
    }

    /// Undo chain growth after a failed write
    fn release_grown(&mut self, old_chain: &[u32], grown: &[u32]) {
        if grown.is_empty() {
            return;
        }
        let relink = old_chain.last().map(|&last| (last, cluster_values::EOC));
        let release = grown.iter().map(|&cluster| (cluster, cluster_values::FREE));
        for (cluster, value) in relink.into_iter().chain(release) {
            if let Err(e) = self.set_entry(cluster, value) {
                log::warn!("[FAT32] Could not release cluster {} after failed write: {}", cluster, e);
                return;
            }
        }
    }

    /// Replace the contents of an existing file.
    ///
    /// The file must exist; nothing is created implicitly. The chain is
    /// reused from the start, grown one cluster at a time as needed, and
    /// any clusters past the new end are released. Bytes after the data in
    /// the last cluster are zeroed.
    pub fn write(&mut self, path: &str, data: &[u8]) -> FsResult<usize> {
        let size = u32::try_from(data.len()).map_err(|_| FsError::FileTooLarge)?;
        let hit = self.resolve_file(path)?;
        let mut entry = hit.entry;

        let bytes_per_cluster = self.geometry.bytes_per_cluster as usize;
        let needed = data.len().div_ceil(bytes_per_cluster);
        let first = entry.first_cluster();

        let old_chain = if first == 0 {
            Vec::new()
        } else {
            self.cluster_chain(first)?
        };

        if needed == 0 {
            if first != 0 {
                self.free_chain(first)?;
            }
            entry.set_first_cluster(0);
        } else {
            let mut grown = Vec::new();
            if let Err(e) = self.write_chain(&mut entry, data, &old_chain, &mut grown) {
                self.release_grown(&old_chain, &grown);
                return Err(e);
            }

            if old_chain.len() > needed {
                self.set_entry(old_chain[needed - 1], cluster_values::EOC)?;
                for &cluster in &old_chain[needed..] {
                    self.set_entry(cluster, cluster_values::FREE)?;
                }
            }
        }

        entry.file_size = size;
        entry.attributes |= FileAttributes::ARCHIVE;
        self.write_entry_at(hit.location, &entry)?;

        log::debug!(
            "[FAT32] Wrote {} bytes to '{}' cluster={} ({} cluster(s))",
            size,
            entry.display_name(),
            entry.first_cluster(),
            needed
        );
        Ok(data.len())
    }

    /// Create an empty file. No cluster is allocated until data is written.
    pub fn create(&mut self, path: &str) -> FsResult<()> {
        let (parent, name) = self.resolve_parent(path)?;
        let raw = encode_name(&name, self.options.name_policy)?;
        match self.find_raw(parent, &raw) {
            Ok(_) => return Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let location = self.find_free_slot(parent)?;
        let entry = DirEntry::new(raw, FileAttributes::ARCHIVE, 0);
        self.write_entry_at(location, &entry)?;

        log::debug!(
            "[FAT32] Created file '{}' in cluster {} entry={}",
            entry.display_name(),
            location.cluster,
            location.index
        );
        Ok(())
    }

    /// Delete a file and release its clusters
    pub fn delete(&mut self, path: &str) -> FsResult<()> {
        let hit = self.resolve_file(path)?;
        let first = hit.entry.first_cluster();
        let freed = if first != 0 { self.free_chain(first)? } else { 0 };
        self.mark_deleted(hit.location)?;

        log::debug!(
            "[FAT32] Deleted '{}' ({} cluster(s) freed)",
            hit.entry.display_name(),
            freed
        );
        Ok(())
    }

    /// Create a directory with its `.` and `..` entries
    pub fn mkdir(&mut self, path: &str) -> FsResult<()> {
        let (parent, name) = self.resolve_parent(path)?;
        let raw = encode_name(&name, self.options.name_policy)?;
        match self.find_raw(parent, &raw) {
            Ok(_) => return Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let location = self.find_free_slot(parent)?;
        let cluster = self.alloc_cluster()?;

        // `..` of a directory directly under the root is 0
        let parent_ref = if parent == self.geometry.root_cluster {
            0
        } else {
            parent
        };
        let mut buf = self.cluster_buffer();
        DirEntry::dot(cluster).write_to(&mut buf[0..32]);
        DirEntry::dotdot(parent_ref).write_to(&mut buf[32..64]);

        let entry = DirEntry::new(raw, FileAttributes::DIRECTORY, cluster);
        let written = self
            .write_cluster(cluster, &buf)
            .and_then(|_| self.write_entry_at(location, &entry));
        if let Err(e) = written {
            if let Err(undo) = self.set_entry(cluster, cluster_values::FREE) {
                log::warn!("[FAT32] Could not release cluster {} after failed mkdir: {}", cluster, undo);
            }
            return Err(e);
        }

        log::debug!(
            "[FAT32] Created directory '{}' cluster={} entry={}",
            entry.display_name(),
            cluster,
            location.index
        );
        Ok(())
    }

    /// Check that a directory holds nothing but `.` and `..`
    fn is_directory_empty(&mut self, cluster: u32) -> FsResult<bool> {
        let occupied = self.walk_directory(cluster, |_, state, raw| {
            if state == SlotState::Used && !DirEntry::parse(raw).is_dot() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        Ok(occupied.is_none())
    }

    /// Remove an empty directory
    pub fn rmdir(&mut self, path: &str) -> FsResult<()> {
        let hit = match self.resolve(path)? {
            Target::Entry(hit) => hit,
            Target::Directory(_) => return Err(FsError::Busy),
        };
        if !hit.entry.is_directory() {
            return Err(FsError::NotADirectory);
        }

        let cluster = hit.entry.first_cluster();
        if cluster == self.geometry.root_cluster || cluster == self.cwd_cluster {
            return Err(FsError::Busy);
        }
        if !self.is_directory_empty(cluster)? {
            return Err(FsError::DirectoryNotEmpty);
        }

        self.free_chain(cluster)?;
        self.mark_deleted(hit.location)?;

        log::debug!(
            "[FAT32] Removed directory '{}' cluster={}",
            hit.entry.display_name(),
            cluster
        );
        Ok(())
    }

    /// Rename an entry within its directory
    pub fn rename(&mut self, path: &str, new_name: &str) -> FsResult<()> {
        if new_name.contains(crate::fs::path::PATH_SEPARATOR) {
            return Err(FsError::InvalidName);
        }
        let hit = self.resolve_entry(path)?;
        let raw = encode_name(new_name, self.options.name_policy)?;
        if raw == hit.entry.name {
            return Ok(());
        }
        if hit.entry.is_dot() {
            return Err(FsError::InvalidName);
        }
        match self.find_raw(hit.parent, &raw) {
            Ok(_) => return Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let mut entry = hit.entry;
        entry.name = raw;
        self.write_entry_at(hit.location, &entry)?;

        let old_name = hit.entry.display_name();
        let new_display = entry.display_name();
        if entry.is_directory() && entry.first_cluster() == self.cwd_cluster {
            self.cwd_path.pop();
            self.cwd_path.push(&new_display);
        }

        log::debug!("[FAT32] Renamed '{}' to '{}'", old_name, new_display);
        Ok(())
    }

    /// List a directory (the current one when `path` is `None`).
    ///
    /// Returns at most `limit` entries. Deleted slots, long-name fragments
    /// and volume labels are skipped; `.` and `..` are listed.
    pub fn list(&mut self, path: Option<&str>, limit: usize) -> FsResult<DirListing> {
        let cluster = match path {
            Some(path) => self.navigate(path)?,
            None => self.cwd_cluster,
        };

        let mut listing = DirListing::default();
        self.walk_directory(cluster, |_, state, raw| {
            if state != SlotState::Used {
                return ControlFlow::Continue(());
            }
            let entry = DirEntry::parse(raw);
            if entry.is_volume_label() {
                return ControlFlow::Continue(());
            }
            if listing.entries.len() == limit {
                listing.truncated = true;
                return ControlFlow::Break(());
            }
            listing.entries.push(entry.info());
            ControlFlow::Continue(())
        })?;
        Ok(listing)
    }

    /// Check whether a path names a file or directory.
    ///
    /// A missing component is `Ok(false)`; I/O and corruption errors are
    /// still reported.
    pub fn exists(&mut self, path: &str) -> FsResult<bool> {
        match self.resolve(path) {
            Ok(_) => Ok(true),
            Err(FsError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Size in bytes (0 for directories)
    pub fn size_of(&mut self, path: &str) -> FsResult<u32> {
        match self.resolve(path)? {
            Target::Entry(hit) => Ok(hit.entry.file_size),
            Target::Directory(_) => Ok(0),
        }
    }

    /// Describe the entry a path names
    pub fn stat(&mut self, path: &str) -> FsResult<FileInfo> {
        match self.resolve(path)? {
            Target::Entry(hit) => Ok(hit.entry.info()),
            Target::Directory(cluster) => Ok(DirEntry::dot(cluster).info()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::fat32::testing;
    use crate::io::BlockStatus;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn test_roundtrip_sizes() {
        let mut vol = testing::test_volume();
        let bpc = vol.geometry().bytes_per_cluster as usize;
        for (i, len) in [0, 1, bpc, bpc + 1, 3 * bpc].into_iter().enumerate() {
            let name = alloc::format!("F{}.BIN", i);
            let data = pattern(len);
            vol.create(&name).unwrap();
            assert_eq!(vol.write(&name, &data).unwrap(), len);
            assert_eq!(vol.read(&name, len).unwrap(), data);
            assert_eq!(vol.size_of(&name).unwrap(), len as u32);
        }
    }

    #[test]
    fn test_read_limited_by_max_size() {
        let mut vol = testing::test_volume();
        let data = pattern(3 * 512);
        vol.create("big.dat").unwrap();
        vol.write("big.dat", &data).unwrap();

        assert_eq!(vol.read("big.dat", 700).unwrap(), &data[..700]);
        assert_eq!(vol.read("big.dat", 10_000).unwrap(), data);

        let mut buf = [0u8; 100];
        assert_eq!(vol.read_into("big.dat", &mut buf).unwrap(), 100);
        assert_eq!(&buf[..], &data[..100]);
    }

    #[test]
    fn test_write_requires_existing_file() {
        let mut vol = testing::test_volume();
        assert_eq!(vol.write("missing.txt", b"x"), Err(FsError::NotFound));
        assert!(!vol.exists("missing.txt").unwrap());
    }

    #[test]
    fn test_create_twice_already_exists() {
        let mut vol = testing::test_volume();
        vol.create("a.txt").unwrap();
        assert_eq!(vol.create("A.TXT"), Err(FsError::AlreadyExists));
        assert_eq!(vol.mkdir("a.txt"), Err(FsError::AlreadyExists));
        let info = vol.stat("a.txt").unwrap();
        assert_eq!(info.size, 0);
        assert_eq!(info.first_cluster, 0);
    }

    #[test]
    fn test_delete_frees_chain() {
        let mut vol = testing::test_volume();
        let free = vol.free_cluster_count().unwrap();
        vol.create("a.txt").unwrap();
        vol.write("a.txt", &pattern(5 * 512)).unwrap();
        let first = vol.stat("a.txt").unwrap().first_cluster;
        let chain = vol.cluster_chain(first).unwrap();
        assert_eq!(chain.len(), 5);

        vol.delete("a.txt").unwrap();
        assert!(!vol.exists("a.txt").unwrap());
        for cluster in chain {
            assert_eq!(vol.get_entry(cluster).unwrap(), 0);
        }
        assert_eq!(vol.free_cluster_count().unwrap(), free);
        assert_eq!(vol.delete("a.txt"), Err(FsError::NotFound));
    }

    #[test]
    fn test_shorter_write_frees_tail() {
        let mut vol = testing::test_volume();
        vol.create("a.txt").unwrap();
        vol.write("a.txt", &pattern(4 * 512)).unwrap();
        let first = vol.stat("a.txt").unwrap().first_cluster;
        let old = vol.cluster_chain(first).unwrap();

        vol.write("a.txt", b"short").unwrap();
        assert_eq!(vol.cluster_chain(first).unwrap(), [first]);
        for &cluster in &old[1..] {
            assert_eq!(vol.get_entry(cluster).unwrap(), 0);
        }
        assert_eq!(vol.read("a.txt", 100).unwrap(), b"short");

        // Tail of the cluster is zeroed on disk
        let mut raw = vol.cluster_buffer();
        vol.read_cluster(first, &mut raw).unwrap();
        assert!(raw[5..].iter().all(|&b| b == 0));

        vol.write("a.txt", &[]).unwrap();
        let info = vol.stat("a.txt").unwrap();
        assert_eq!((info.size, info.first_cluster), (0, 0));
        assert_eq!(vol.get_entry(first).unwrap(), 0);
    }

    #[test]
    fn test_write_sets_archive_and_rejects_directories() {
        let mut vol = testing::test_volume();
        vol.create("a.txt").unwrap();
        vol.write("a.txt", b"data").unwrap();
        assert!(vol.stat("a.txt").unwrap().attributes.contains(FileAttributes::ARCHIVE));

        vol.mkdir("dir").unwrap();
        assert_eq!(vol.write("dir", b"x"), Err(FsError::IsDirectory));
        assert_eq!(vol.read("dir", 10), Err(FsError::IsDirectory));
        assert_eq!(vol.delete("dir"), Err(FsError::IsDirectory));
        assert_eq!(vol.read("/", 10), Err(FsError::IsDirectory));
    }

    #[test]
    fn test_paths_resolve_from_current_directory() {
        let mut vol = testing::test_volume();
        vol.mkdir("docs").unwrap();
        vol.change_directory("docs").unwrap();
        vol.create("note.txt").unwrap();
        vol.write("note.txt", b"hi").unwrap();

        assert_eq!(vol.read("/docs/note.txt", 10).unwrap(), b"hi");
        assert!(!vol.exists("/note.txt").unwrap());

        vol.change_directory("/").unwrap();
        assert_eq!(vol.read("docs/note.txt", 10).unwrap(), b"hi");
        assert_eq!(vol.size_of("docs/note.txt").unwrap(), 2);
        assert!(vol.exists("docs").unwrap());
        assert!(!vol.exists("docs/note.txt/x").unwrap());
    }

    #[test]
    fn test_mkdir_dot_entries() {
        let mut vol = testing::test_volume();
        vol.mkdir("a").unwrap();
        vol.mkdir("a/b").unwrap();
        let a = vol.navigate("a").unwrap();
        let b = vol.navigate("a/b").unwrap();

        let listing = vol.list(Some("a"), 10).unwrap();
        let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, [".", "..", "B"]);
        assert_eq!(listing.entries[0].first_cluster, a);
        // Parent is the root
        assert_eq!(listing.entries[1].first_cluster, 0);

        let inner = vol.list(Some("a/b"), 10).unwrap();
        assert_eq!(inner.entries[0].first_cluster, b);
        assert_eq!(inner.entries[1].first_cluster, a);
        assert!(inner.entries.iter().all(|e| e.is_directory));
    }

    #[test]
    fn test_list_truncation() {
        let mut vol = testing::test_volume();
        for name in ["a", "b", "c"] {
            vol.create(name).unwrap();
        }

        let full = vol.list(None, 3).unwrap();
        assert_eq!(full.entries.len(), 3);
        assert!(!full.truncated);

        let cut = vol.list(None, 2).unwrap();
        assert_eq!(cut.entries.len(), 2);
        assert!(cut.truncated);

        let roomy = vol.list(Some("/"), 10).unwrap();
        assert_eq!(roomy.entries.len(), 3);
        assert!(!roomy.truncated);

        vol.delete("b").unwrap();
        let names: Vec<_> = vol
            .list(None, 10)
            .unwrap()
            .entries
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["A", "C"]);
    }

    #[test]
    fn test_list_skips_labels_and_long_name_slots() {
        let mut vol = testing::test_volume();
        let root = vol.root_cluster();
        let label = DirEntry::new(*b"SCRATCH    ", FileAttributes::VOLUME_ID, 0);
        let lfn = DirEntry::new(*b"GHOST   TXT", FileAttributes::LONG_NAME, 0);
        for slot_entry in [label, lfn] {
            let slot = vol.find_free_slot(root).unwrap();
            vol.write_entry_at(slot, &slot_entry).unwrap();
        }
        vol.create("a").unwrap();
        vol.create("b").unwrap();

        let full = vol.list(None, 2).unwrap();
        let names: Vec<_> = full.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert!(!full.truncated);

        let cut = vol.list(None, 1).unwrap();
        assert_eq!(cut.entries[0].name, "A");
        assert!(cut.truncated);
    }

    #[test]
    fn test_mkdir_failure_reports_write_error() {
        let mut vol = testing::test_volume();
        // Both FAT copies of the allocation succeed, the directory cluster does not
        vol.device_mut().fail_writes_after(2);
        assert_eq!(vol.mkdir("d"), Err(FsError::IoFailure(BlockStatus::IoError)));
        vol.device_mut().clear_faults();
        assert!(!vol.exists("d").unwrap());
    }

    #[test]
    fn test_rmdir() {
        let mut vol = testing::test_volume();
        vol.mkdir("d").unwrap();
        vol.create("d/f").unwrap();
        assert_eq!(vol.rmdir("d"), Err(FsError::DirectoryNotEmpty));
        assert_eq!(vol.rmdir("d/f"), Err(FsError::NotADirectory));
        assert_eq!(vol.rmdir("/"), Err(FsError::Busy));

        vol.change_directory("d").unwrap();
        assert_eq!(vol.rmdir("/d"), Err(FsError::Busy));
        vol.delete("f").unwrap();
        vol.change_directory("..").unwrap();

        let cluster = vol.navigate("d").unwrap();
        vol.rmdir("d").unwrap();
        assert!(!vol.exists("d").unwrap());
        assert_eq!(vol.get_entry(cluster).unwrap(), 0);
    }

    #[test]
    fn test_rename() {
        let mut vol = testing::test_volume();
        vol.create("old.txt").unwrap();
        vol.write("old.txt", b"payload").unwrap();
        vol.create("other.txt").unwrap();

        assert_eq!(vol.rename("old.txt", "other.txt"), Err(FsError::AlreadyExists));
        assert_eq!(vol.rename("old.txt", "a/b"), Err(FsError::InvalidName));
        vol.rename("old.txt", "new.txt").unwrap();
        assert!(!vol.exists("old.txt").unwrap());
        assert_eq!(vol.read("new.txt", 100).unwrap(), b"payload");

        vol.mkdir("dir").unwrap();
        vol.change_directory("dir").unwrap();
        vol.rename("/dir", "folder").unwrap();
        assert_eq!(vol.current_directory(), "/FOLDER");
    }

    #[test]
    fn test_contents_survive_remount() {
        let mut vol = testing::test_volume();
        vol.mkdir("keep").unwrap();
        vol.create("keep/data.bin").unwrap();
        let data = pattern(1300);
        vol.write("keep/data.bin", &data).unwrap();

        let disk = vol.into_device();
        let mut vol = Fat32Volume::mount(disk, 0).unwrap();
        assert_eq!(vol.read("/keep/data.bin", 2000).unwrap(), data);
        assert_eq!(vol.current_directory(), "/");
    }

    #[test]
    fn test_io_failure_is_reported() {
        let mut vol = testing::test_volume();
        vol.create("a.txt").unwrap();
        vol.device_mut().fail_writes_after(0);
        assert_eq!(
            vol.write("a.txt", b"data"),
            Err(FsError::IoFailure(BlockStatus::IoError))
        );
        vol.device_mut().fail_reads_after(0);
        assert_eq!(
            vol.read("a.txt", 10),
            Err(FsError::IoFailure(BlockStatus::IoError))
        );
    }

    #[test]
    fn test_write_no_space() {
        let mut vol = testing::mounted(64, 1);
        vol.create("fill").unwrap();
        let free = vol.free_cluster_count().unwrap() as usize;
        assert_eq!(
            vol.write("fill", &pattern((free + 1) * 512)),
            Err(FsError::NoSpace)
        );
        vol.write("fill", &pattern(free * 512)).unwrap();
        assert_eq!(vol.free_cluster_count().unwrap(), 0);
        assert_eq!(vol.mkdir("d"), Err(FsError::NoSpace));
    }

    #[test]
    fn test_short_chain_is_corrupt() {
        let mut vol = testing::test_volume();
        vol.create("a.txt").unwrap();
        vol.write("a.txt", &pattern(2 * 512)).unwrap();
        let first = vol.stat("a.txt").unwrap().first_cluster;
        vol.set_entry(first, cluster_values::EOC).unwrap();
        assert_eq!(vol.read("a.txt", 2 * 512), Err(FsError::CorruptChain));
    }
}
