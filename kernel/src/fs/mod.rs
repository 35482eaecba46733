//! File System Layer
//!
//! - `path` - Path parsing and the current-directory string
//! - `fat32` - FAT32 driver
//! - `mount` - The process-wide mount slot
//!
//! Every operation returns [`FsResult`]; callers (shell commands) turn an
//! [`FsError`] into a message and carry on.

pub mod fat32;
pub mod mount;
pub mod path;

use core::fmt;

use crate::io::BlockStatus;

pub use fat32::{DirListing, Fat32Volume, FileAttributes, FileInfo, MountOptions};

/// File system error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Block device read or write failed
    IoFailure(BlockStatus),
    /// Volume geometry this driver cannot handle (sector size != 512, ...)
    UnsupportedVolume,
    /// Cluster pointer outside the valid range, or a bad cluster
    InvalidCluster,
    /// Cluster chain longer than the volume (loop in the FAT)
    CorruptChain,
    /// Path or component absent
    NotFound,
    /// No free cluster, or no room for a directory entry
    NoSpace,
    /// Target name already present
    AlreadyExists,
    /// Name does not fit the 8.3 format
    NameTooLong,
    /// Name contains characters not allowed in 8.3 names
    InvalidName,
    /// Path exceeds the configured length or depth
    PathTooLong,
    /// Directory operation on a file
    NotADirectory,
    /// File operation on a directory
    IsDirectory,
    /// Directory still has entries
    DirectoryNotEmpty,
    /// Target is in use (root or current directory, or already mounted)
    Busy,
    /// Data larger than a FAT32 file can hold
    FileTooLarge,
    /// No volume mounted
    NotMounted,
}

impl FsError {
    /// Stable numeric status for shell consumers
    pub fn code(&self) -> i32 {
        match self {
            FsError::NotFound => -1,
            FsError::AlreadyExists => -3,
            FsError::NotADirectory => -4,
            FsError::IsDirectory => -5,
            FsError::DirectoryNotEmpty => -6,
            FsError::NoSpace => -11,
            FsError::IoFailure(_) => -13,
            FsError::UnsupportedVolume => -14,
            FsError::NotMounted => -15,
            FsError::NameTooLong => -17,
            FsError::InvalidName => -20,
            FsError::PathTooLong => -21,
            FsError::InvalidCluster => -22,
            FsError::CorruptChain => -23,
            FsError::Busy => -24,
            FsError::FileTooLarge => -25,
        }
    }
}

impl From<BlockStatus> for FsError {
    fn from(status: BlockStatus) -> Self {
        FsError::IoFailure(status)
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::IoFailure(status) => write!(f, "I/O failure: {}", status),
            FsError::UnsupportedVolume => f.write_str("unsupported volume"),
            FsError::InvalidCluster => f.write_str("invalid cluster"),
            FsError::CorruptChain => f.write_str("corrupt cluster chain"),
            FsError::NotFound => f.write_str("not found"),
            FsError::NoSpace => f.write_str("no space left on volume"),
            FsError::AlreadyExists => f.write_str("already exists"),
            FsError::NameTooLong => f.write_str("name too long for 8.3"),
            FsError::InvalidName => f.write_str("invalid name"),
            FsError::PathTooLong => f.write_str("path too long"),
            FsError::NotADirectory => f.write_str("not a directory"),
            FsError::IsDirectory => f.write_str("is a directory"),
            FsError::DirectoryNotEmpty => f.write_str("directory not empty"),
            FsError::Busy => f.write_str("resource busy"),
            FsError::FileTooLarge => f.write_str("file too large"),
            FsError::NotMounted => f.write_str("no volume mounted"),
        }
    }
}

/// Result type of every file system operation
pub type FsResult<T> = Result<T, FsError>;

/// Initialize the file system layer
pub fn init() {
    log::info!("[FS] File system layer initializing...");
    fat32::init();
    log::info!("[FS] File system layer initialized");
}
