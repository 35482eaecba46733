//! Mounted volume slot
//!
//! The kernel mounts at most one FAT32 volume. It lives in a single slot
//! behind a spin lock, and every call below holds that lock for the whole
//! operation, so FAT updates, directory edits and the current directory
//! are never interleaved.
//!
//! The free functions mirror the volume methods for callers that do not
//! hold a volume of their own (shell commands, the ELF loader, the editor).

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use spin::Mutex;

use super::fat32::{DirListing, Fat32Volume, MountOptions};
use super::{FsError, FsResult};
use crate::io::BlockDevice;

/// Device type held by the mount slot
pub type MountedDevice = Box<dyn BlockDevice + Send>;

/// Volume type held by the mount slot
pub type MountedVolume = Fat32Volume<MountedDevice>;

static MOUNTED: Mutex<Option<MountedVolume>> = Mutex::new(None);

/// Mount `device` with default options
pub fn mount(device: MountedDevice, partition_lba: u32) -> FsResult<()> {
    mount_with(device, partition_lba, MountOptions::default())
}

/// Mount `device`; fails with `Busy` if a volume is already mounted
pub fn mount_with(device: MountedDevice, partition_lba: u32, options: MountOptions) -> FsResult<()> {
    let mut slot = MOUNTED.lock();
    if slot.is_some() {
        return Err(FsError::Busy);
    }
    *slot = Some(Fat32Volume::mount_with(device, partition_lba, options)?);
    Ok(())
}

/// Unmount, returning the device
pub fn unmount() -> FsResult<MountedDevice> {
    MOUNTED
        .lock()
        .take()
        .map(Fat32Volume::into_device)
        .ok_or(FsError::NotMounted)
}

pub fn is_mounted() -> bool {
    MOUNTED.lock().is_some()
}

/// Run `f` on the mounted volume with the mount lock held
pub fn with_volume<R>(f: impl FnOnce(&mut MountedVolume) -> FsResult<R>) -> FsResult<R> {
    let mut slot = MOUNTED.lock();
    let volume = slot.as_mut().ok_or(FsError::NotMounted)?;
    f(volume)
}

pub fn read(path: &str, max_size: usize) -> FsResult<Vec<u8>> {
    with_volume(|vol| vol.read(path, max_size))
}

pub fn write(path: &str, data: &[u8]) -> FsResult<usize> {
    with_volume(|vol| vol.write(path, data))
}

pub fn create(path: &str) -> FsResult<()> {
    with_volume(|vol| vol.create(path))
}

pub fn delete(path: &str) -> FsResult<()> {
    with_volume(|vol| vol.delete(path))
}

pub fn mkdir(path: &str) -> FsResult<()> {
    with_volume(|vol| vol.mkdir(path))
}

pub fn change_directory(path: &str) -> FsResult<()> {
    with_volume(|vol| vol.change_directory(path))
}

/// Copy of the current directory string
pub fn current_directory() -> FsResult<String> {
    with_volume(|vol| Ok(String::from(vol.current_directory())))
}

pub fn list(path: Option<&str>, limit: usize) -> FsResult<DirListing> {
    with_volume(|vol| vol.list(path, limit))
}

pub fn exists(path: &str) -> FsResult<bool> {
    with_volume(|vol| vol.exists(path))
}

pub fn size_of(path: &str) -> FsResult<u32> {
    with_volume(|vol| vol.size_of(path))
}
