//! Directory scanning and path resolution
//!
//! Directories are walked slot by slot across their whole cluster chain,
//! stopping at the first 0x00 slot. Paths resolve from the root when
//! absolute and from the current directory otherwise.

use alloc::string::String;
use core::ops::ControlFlow;

use crate::fs::path::{Component, DirectoryPath, ParsedPath};
use crate::fs::{FsError, FsResult};
use crate::io::BlockDevice;

use super::bpb::cluster_values;
use super::dir::{
    encode_name, entry_status, DirEntry, SlotState, DIR_ENTRY_SIZE, DOTDOT_NAME, SHORT_NAME_LEN,
};
use super::volume::{Fat32Volume, ParentResolution};

/// Position of a directory slot on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLocation {
    /// Directory cluster holding the slot
    pub cluster: u32,
    /// Slot index within that cluster
    pub index: u32,
}

impl EntryLocation {
    fn byte_range(&self) -> core::ops::Range<usize> {
        let start = self.index as usize * DIR_ENTRY_SIZE;
        start..start + DIR_ENTRY_SIZE
    }
}

/// A directory entry found by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirHit {
    pub entry: DirEntry,
    pub location: EntryLocation,
    /// First cluster of the directory holding the entry
    pub parent: u32,
}

/// What a path names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Target {
    /// A directory reached without naming its entry (`/`, `.`, `A/..`)
    Directory(u32),
    /// A named entry
    Entry(DirHit),
}

impl<D: BlockDevice> Fat32Volume<D> {
    /// Visit every slot of a directory up to and including the end marker.
    ///
    /// Returns the value the visitor broke with, if any.
    pub(super) fn walk_directory<T>(
        &mut self,
        dir_cluster: u32,
        mut visit: impl FnMut(EntryLocation, SlotState, &[u8]) -> ControlFlow<T>,
    ) -> FsResult<Option<T>> {
        let chain = self.cluster_chain(dir_cluster)?;
        let mut buf = self.cluster_buffer();
        let per_cluster = self.geometry.entries_per_cluster();

        for cluster in chain {
            self.read_cluster(cluster, &mut buf)?;
            for index in 0..per_cluster {
                let location = EntryLocation { cluster, index };
                let raw = &buf[location.byte_range()];
                let state = SlotState::classify(raw);
                if let ControlFlow::Break(value) = visit(location, state, raw) {
                    return Ok(Some(value));
                }
                if state == SlotState::End {
                    return Ok(None);
                }
            }
        }
        Ok(None)
    }

    /// Find an entry by its raw 8.3 name.
    ///
    /// Deleted slots, long-name fragments and volume labels never match.
    pub fn find_raw(&mut self, dir_cluster: u32, name: &[u8; SHORT_NAME_LEN]) -> FsResult<DirHit> {
        let found = self.walk_directory(dir_cluster, |location, state, raw| {
            if state != SlotState::Used {
                return ControlFlow::Continue(());
            }
            let entry = DirEntry::parse(raw);
            if entry.name == *name && !entry.is_volume_label() {
                ControlFlow::Break(DirHit {
                    entry,
                    location,
                    parent: dir_cluster,
                })
            } else {
                ControlFlow::Continue(())
            }
        })?;
        found.ok_or(FsError::NotFound)
    }

    /// Find an entry by display name in the directory at `dir_cluster`
    pub fn find(&mut self, dir_cluster: u32, name: &str) -> FsResult<DirHit> {
        let raw = encode_name(name, self.options.name_policy)?;
        self.find_raw(dir_cluster, &raw)
    }

    pub(super) fn parse(&self, path: &str) -> FsResult<ParsedPath> {
        ParsedPath::parse_with_limits(path, self.options.max_path_len, self.options.max_path_depth)
    }

    /// Cluster a directory entry points at; 0 in a `..` entry is the root
    fn directory_cluster(&self, entry: &DirEntry) -> FsResult<u32> {
        match entry.first_cluster() {
            0 if entry.name == DOTDOT_NAME => Ok(self.geometry.root_cluster),
            0 => Err(FsError::InvalidCluster),
            cluster => Ok(cluster),
        }
    }

    /// The parent of the directory at `cluster`
    fn parent_of(&mut self, cluster: u32) -> FsResult<u32> {
        let root = self.geometry.root_cluster;
        match self.options.parent_resolution {
            ParentResolution::Root => Ok(root),
            ParentResolution::FollowEntry if cluster == root => Ok(root),
            ParentResolution::FollowEntry => {
                let hit = self.find_raw(cluster, &DOTDOT_NAME)?;
                self.directory_cluster(&hit.entry)
            }
        }
    }

    /// Walk `components` as directories, tracking the canonical path
    fn walk_components(
        &mut self,
        is_absolute: bool,
        components: &[Component],
    ) -> FsResult<(u32, DirectoryPath)> {
        let (mut cluster, mut path) = if is_absolute {
            (self.geometry.root_cluster, DirectoryPath::root())
        } else {
            (self.cwd_cluster, self.cwd_path.clone())
        };

        for component in components {
            match component {
                Component::Current => {}
                Component::Parent => {
                    cluster = self.parent_of(cluster)?;
                    match self.options.parent_resolution {
                        ParentResolution::FollowEntry => path.pop(),
                        ParentResolution::Root => path.clear(),
                    }
                }
                Component::Name(name) => {
                    let hit = self.find(cluster, name)?;
                    if !hit.entry.is_directory() {
                        return Err(FsError::NotFound);
                    }
                    cluster = self.directory_cluster(&hit.entry)?;
                    path.push(&hit.entry.display_name());
                }
            }
        }

        if cluster == self.geometry.root_cluster {
            path.clear();
        }
        Ok((cluster, path))
    }

    /// Resolve a directory path to its first cluster
    pub fn navigate(&mut self, path: &str) -> FsResult<u32> {
        let parsed = self.parse(path)?;
        let (cluster, _) = self.walk_components(parsed.is_absolute, &parsed.components)?;
        Ok(cluster)
    }

    /// Make `path` the current directory
    pub fn change_directory(&mut self, path: &str) -> FsResult<()> {
        let parsed = self.parse(path)?;
        let (cluster, new_path) = self.walk_components(parsed.is_absolute, &parsed.components)?;
        if new_path.as_str().len() > self.options.max_path_len {
            return Err(FsError::PathTooLong);
        }

        log::debug!("[FAT32] cd {} (cluster {})", new_path.as_str(), cluster);
        self.cwd_cluster = cluster;
        self.cwd_path = new_path;
        Ok(())
    }

    /// Split a path into its containing directory and leaf name
    pub(super) fn resolve_parent(&mut self, path: &str) -> FsResult<(u32, String)> {
        let parsed = self.parse(path)?;
        let (parent, leaf) = parsed.split_last().ok_or(FsError::InvalidName)?;
        let name = leaf.name().ok_or(FsError::InvalidName)?;
        let (cluster, _) = self.walk_components(parsed.is_absolute, parent)?;
        Ok((cluster, String::from(name)))
    }

    /// Resolve a path to a directory or a named entry
    pub(super) fn resolve(&mut self, path: &str) -> FsResult<Target> {
        let parsed = self.parse(path)?;
        match parsed.split_last() {
            Some((parent, Component::Name(name))) => {
                let (cluster, _) = self.walk_components(parsed.is_absolute, parent)?;
                Ok(Target::Entry(self.find(cluster, name)?))
            }
            _ => {
                let (cluster, _) =
                    self.walk_components(parsed.is_absolute, &parsed.components)?;
                Ok(Target::Directory(cluster))
            }
        }
    }

    /// Resolve a path that must name an entry (not `/`, `.` or `..`)
    pub(super) fn resolve_entry(&mut self, path: &str) -> FsResult<DirHit> {
        match self.resolve(path)? {
            Target::Entry(hit) => Ok(hit),
            Target::Directory(_) => Err(FsError::IsDirectory),
        }
    }

    /// Find a slot for a new entry, growing the directory when it is full
    pub(super) fn find_free_slot(&mut self, dir_cluster: u32) -> FsResult<EntryLocation> {
        let mut last = dir_cluster;
        let found = self.walk_directory(dir_cluster, |location, state, _| {
            last = location.cluster;
            if state.is_free() {
                ControlFlow::Break(location)
            } else {
                ControlFlow::Continue(())
            }
        })?;
        if let Some(location) = found {
            return Ok(location);
        }

        // Every slot is in use: append a zeroed cluster
        let cluster = self.alloc_cluster()?;
        if let Err(e) = self.zero_cluster(cluster) {
            self.set_entry(cluster, cluster_values::FREE)?;
            return Err(e);
        }
        if let Err(e) = self.set_entry(last, cluster) {
            self.set_entry(cluster, cluster_values::FREE)?;
            return Err(e);
        }
        log::debug!(
            "[FAT32] Directory at cluster {} grown by cluster {}",
            dir_cluster,
            cluster
        );
        Ok(EntryLocation { cluster, index: 0 })
    }

    /// Store `entry` in the slot at `location`
    pub(super) fn write_entry_at(&mut self, location: EntryLocation, entry: &DirEntry) -> FsResult<()> {
        let mut buf = self.cluster_buffer();
        self.read_cluster(location.cluster, &mut buf)?;
        entry.write_to(&mut buf[location.byte_range()]);
        self.write_cluster(location.cluster, &buf)
    }

    /// Mark the slot at `location` deleted
    pub(super) fn mark_deleted(&mut self, location: EntryLocation) -> FsResult<()> {
        let mut buf = self.cluster_buffer();
        self.read_cluster(location.cluster, &mut buf)?;
        buf[location.byte_range().start] = entry_status::FREE;
        self.write_cluster(location.cluster, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::fat32::testing;
    use crate::fs::fat32::{FileAttributes, MountOptions, NamePolicy};

    #[test]
    fn test_mkdir_cd_and_back() {
        let mut vol = testing::test_volume();
        let root = vol.root_cluster();
        vol.mkdir("SUB").unwrap();
        vol.change_directory("SUB").unwrap();
        assert_eq!(vol.current_directory(), "/SUB");
        assert_ne!(vol.current_cluster(), root);

        vol.change_directory("..").unwrap();
        assert_eq!(vol.current_directory(), "/");
        assert_eq!(vol.current_cluster(), root);
    }

    #[test]
    fn test_parent_follows_dotdot_entry() {
        let mut vol = testing::test_volume();
        vol.mkdir("a").unwrap();
        vol.mkdir("a/b").unwrap();
        let a = vol.navigate("/A").unwrap();

        vol.change_directory("/a/b").unwrap();
        assert_eq!(vol.current_directory(), "/A/B");
        vol.change_directory("..").unwrap();
        assert_eq!(vol.current_directory(), "/A");
        assert_eq!(vol.current_cluster(), a);

        vol.change_directory("b/./../..").unwrap();
        assert_eq!(vol.current_directory(), "/");
    }

    #[test]
    fn test_legacy_parent_resolves_to_root() {
        let mut vol = testing::mounted_with(
            testing::TEST_SECTORS,
            1,
            MountOptions::new().with_parent_resolution(ParentResolution::Root),
        );
        vol.mkdir("a").unwrap();
        vol.mkdir("a/b").unwrap();
        vol.change_directory("a/b").unwrap();
        vol.change_directory("..").unwrap();
        assert_eq!(vol.current_directory(), "/");
        assert_eq!(vol.current_cluster(), vol.root_cluster());
    }

    #[test]
    fn test_cd_into_file_or_missing_is_not_found() {
        let mut vol = testing::test_volume();
        vol.create("file.txt").unwrap();
        assert_eq!(vol.change_directory("file.txt"), Err(FsError::NotFound));
        assert_eq!(vol.change_directory("nope"), Err(FsError::NotFound));
        assert_eq!(vol.current_directory(), "/");
    }

    #[test]
    fn test_navigate_absolute_ignores_cwd() {
        let mut vol = testing::test_volume();
        vol.mkdir("x").unwrap();
        vol.mkdir("x/y").unwrap();
        vol.change_directory("x").unwrap();
        let y = vol.navigate("y").unwrap();
        assert_eq!(vol.navigate("/x/y").unwrap(), y);
        assert_eq!(vol.navigate("/").unwrap(), vol.root_cluster());
        assert_eq!(vol.navigate("/y"), Err(FsError::NotFound));
    }

    #[test]
    fn test_find_skips_deleted_and_long_name_slots() {
        let mut vol = testing::test_volume();
        let root = vol.root_cluster();
        vol.create("gone.txt").unwrap();
        vol.delete("gone.txt").unwrap();
        assert_eq!(vol.find(root, "gone.txt"), Err(FsError::NotFound));

        // Long-name fragment whose bytes spell a short name
        let lfn = DirEntry::new(*b"FAKE    TXT", FileAttributes::LONG_NAME, 0);
        let slot = vol.find_free_slot(root).unwrap();
        vol.write_entry_at(slot, &lfn).unwrap();
        assert_eq!(vol.find(root, "fake.txt"), Err(FsError::NotFound));
    }

    #[test]
    fn test_find_stops_at_end_marker() {
        let mut vol = testing::test_volume();
        let root = vol.root_cluster();
        vol.create("a.txt").unwrap();
        vol.create("b.txt").unwrap();
        let hit = vol.find(root, "b.txt").unwrap();

        // Terminate the directory in front of B.TXT
        let mut buf = vol.cluster_buffer();
        vol.read_cluster(root, &mut buf).unwrap();
        buf[hit.location.byte_range().start] = 0;
        vol.write_cluster(root, &buf).unwrap();

        let later = EntryLocation {
            cluster: root,
            index: hit.location.index + 1,
        };
        let entry = DirEntry::new(*b"B       TXT", FileAttributes::ARCHIVE, 0);
        vol.write_entry_at(later, &entry).unwrap();
        assert_eq!(vol.find(root, "b.txt"), Err(FsError::NotFound));
    }

    #[test]
    fn test_free_slot_reuses_deleted() {
        let mut vol = testing::test_volume();
        let root = vol.root_cluster();
        vol.create("one").unwrap();
        vol.create("two").unwrap();
        let one = vol.find(root, "one").unwrap().location;
        vol.delete("one").unwrap();
        assert_eq!(vol.find_free_slot(root).unwrap(), one);
    }

    #[test]
    fn test_directory_grows_when_full() {
        let mut vol = testing::test_volume();
        let root = vol.root_cluster();
        let per_cluster = vol.geometry().entries_per_cluster();
        for i in 0..per_cluster {
            let name = alloc::format!("F{}", i);
            vol.create(&name).unwrap();
        }
        assert_eq!(vol.cluster_chain(root).unwrap().len(), 1);

        vol.create("extra").unwrap();
        let chain = vol.cluster_chain(root).unwrap();
        assert_eq!(chain.len(), 2);
        let hit = vol.find(root, "extra").unwrap();
        assert_eq!(hit.location, EntryLocation { cluster: chain[1], index: 0 });
        assert!(vol.find(root, "F0").is_ok());
    }

    #[test]
    fn test_path_limits_enforced() {
        let mut vol = testing::mounted_with(
            testing::TEST_SECTORS,
            1,
            MountOptions::new().with_path_limits(256, 2),
        );
        assert_eq!(vol.navigate("a/b/c"), Err(FsError::PathTooLong));
    }

    #[test]
    fn test_long_component_rejected_or_truncated() {
        let mut vol = testing::test_volume();
        assert_eq!(vol.mkdir("directory1"), Err(FsError::NameTooLong));

        let mut vol = testing::mounted_with(
            testing::TEST_SECTORS,
            1,
            MountOptions::new().with_name_policy(NamePolicy::Truncate),
        );
        vol.mkdir("directory1").unwrap();
        vol.change_directory("directory1").unwrap();
        assert_eq!(vol.current_directory(), "/DIRECTOR");
    }
}
