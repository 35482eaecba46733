//! Hobby OS Storage Stack
//!
//! The kernel's storage subsystems, built as a library so the shell, the ELF
//! loader and the line editor can link against them.
//!
//! # Subsystems
//!
//! - **io** - Block device interface and the in-memory RAM disk
//! - **fs** - File system layer: path handling, the FAT32 driver, the mount slot
//!
//! # Data flow
//! ```text
//! shell / loader / editor
//!          │
//!          ▼
//!   fs::mount (mount-wide lock)
//!          │
//!          ▼
//!   fat32 file operations ──► path resolver ──► directory codec
//!          │                                        │
//!          ▼                                        ▼
//!   FAT accessor / cluster I/O ──────────────► io::block
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(clippy::new_without_default)]

extern crate alloc;

pub mod fs;
pub mod io;

/// Initialize the storage subsystems
pub fn init() {
    io::init();
    fs::init();
}
