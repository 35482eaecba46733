//! FAT32 Directory Entry Structures
//!
//! Directory entries are 32 bytes each and contain:
//! - File name (8.3 format, space-padded)
//! - Attributes
//! - Timestamps (carried through, never interpreted)
//! - First cluster (split into high and low halves)
//! - File size
//!
//! # Long File Names (LFN)
//! LFN entries are recognized so they can be skipped. They are never
//! decoded or written.

use alloc::string::String;
use alloc::vec::Vec;

use super::volume::NamePolicy;
use crate::fs::{FsError, FsResult};

/// Directory entry size
pub const DIR_ENTRY_SIZE: usize = 32;

/// Length of the raw 8.3 name field
pub const SHORT_NAME_LEN: usize = 11;

/// Base name length
const BASE_LEN: usize = 8;

/// Extension length
const EXT_LEN: usize = 3;

/// Raw name of the `.` entry
pub const DOT_NAME: [u8; SHORT_NAME_LEN] = *b".          ";

/// Raw name of the `..` entry
pub const DOTDOT_NAME: [u8; SHORT_NAME_LEN] = *b"..         ";

/// Special first byte values
pub mod entry_status {
    /// Entry is free
    pub const FREE: u8 = 0xE5;
    /// Entry is free and all following entries are free
    pub const FREE_LAST: u8 = 0x00;
    /// First byte was 0xE5, stored as 0x05
    pub const KANJI: u8 = 0x05;
    /// Dot entry (. or ..)
    pub const DOT: u8 = 0x2E;
}

/// Mask for LFN detection
const ATTR_LFN_MASK: u8 = 0x3F;

bitflags::bitflags! {
    /// Directory entry attribute byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
        /// Long file name entry marker
        const LONG_NAME = 0x0F;
    }
}

impl FileAttributes {
    /// Check if the raw attribute byte marks a long-name entry
    pub fn is_long_name(self) -> bool {
        self.bits() & ATTR_LFN_MASK == Self::LONG_NAME.bits()
    }
}

/// What a 32-byte directory slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// 0x00: this slot and every following one are free
    End,
    /// 0xE5: reusable
    Deleted,
    /// VFAT long-name fragment
    LongName,
    /// Short entry in use
    Used,
}

impl SlotState {
    /// Classify a raw slot
    pub fn classify(raw: &[u8]) -> Self {
        match raw[0] {
            entry_status::FREE_LAST => SlotState::End,
            entry_status::FREE => SlotState::Deleted,
            _ if raw[11] & ATTR_LFN_MASK == FileAttributes::LONG_NAME.bits() => {
                SlotState::LongName
            }
            _ => SlotState::Used,
        }
    }

    /// Check if a new entry may be written here
    pub fn is_free(self) -> bool {
        matches!(self, SlotState::End | SlotState::Deleted)
    }
}

/// Short directory entry (8.3 format)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// Name and extension, space-padded
    pub name: [u8; SHORT_NAME_LEN],
    /// File attributes
    pub attributes: FileAttributes,
    /// Reserved (used for lowercase flags in NT)
    pub nt_res: u8,
    /// Creation time (tenths of second)
    pub create_time_tenth: u8,
    /// Creation time
    pub create_time: u16,
    /// Creation date
    pub create_date: u16,
    /// Last access date
    pub access_date: u16,
    /// High 16 bits of first cluster
    pub cluster_hi: u16,
    /// Last modification time
    pub modify_time: u16,
    /// Last modification date
    pub modify_date: u16,
    /// Low 16 bits of first cluster
    pub cluster_lo: u16,
    /// File size in bytes
    pub file_size: u32,
}

impl DirEntry {
    /// Fresh entry with zeroed timestamps
    pub fn new(name: [u8; SHORT_NAME_LEN], attributes: FileAttributes, first_cluster: u32) -> Self {
        let mut entry = Self {
            name,
            attributes,
            nt_res: 0,
            create_time_tenth: 0,
            create_time: 0,
            create_date: 0,
            access_date: 0,
            cluster_hi: 0,
            modify_time: 0,
            modify_date: 0,
            cluster_lo: 0,
            file_size: 0,
        };
        entry.set_first_cluster(first_cluster);
        entry
    }

    /// The `.` entry of a directory starting at `cluster`
    pub fn dot(cluster: u32) -> Self {
        Self::new(DOT_NAME, FileAttributes::DIRECTORY, cluster)
    }

    /// The `..` entry; `parent` is 0 when the parent is the root
    pub fn dotdot(parent: u32) -> Self {
        Self::new(DOTDOT_NAME, FileAttributes::DIRECTORY, parent)
    }

    /// Decode a 32-byte slot
    pub fn parse(raw: &[u8]) -> Self {
        let le16 = |off: usize| u16::from_le_bytes([raw[off], raw[off + 1]]);
        let mut name = [0u8; SHORT_NAME_LEN];
        name.copy_from_slice(&raw[0..SHORT_NAME_LEN]);
        Self {
            name,
            attributes: FileAttributes::from_bits_retain(raw[11]),
            nt_res: raw[12],
            create_time_tenth: raw[13],
            create_time: le16(14),
            create_date: le16(16),
            access_date: le16(18),
            cluster_hi: le16(20),
            modify_time: le16(22),
            modify_date: le16(24),
            cluster_lo: le16(26),
            file_size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    /// Encode into a 32-byte slot
    pub fn write_to(&self, raw: &mut [u8]) {
        raw[0..SHORT_NAME_LEN].copy_from_slice(&self.name);
        raw[11] = self.attributes.bits();
        raw[12] = self.nt_res;
        raw[13] = self.create_time_tenth;
        raw[14..16].copy_from_slice(&self.create_time.to_le_bytes());
        raw[16..18].copy_from_slice(&self.create_date.to_le_bytes());
        raw[18..20].copy_from_slice(&self.access_date.to_le_bytes());
        raw[20..22].copy_from_slice(&self.cluster_hi.to_le_bytes());
        raw[22..24].copy_from_slice(&self.modify_time.to_le_bytes());
        raw[24..26].copy_from_slice(&self.modify_date.to_le_bytes());
        raw[26..28].copy_from_slice(&self.cluster_lo.to_le_bytes());
        raw[28..32].copy_from_slice(&self.file_size.to_le_bytes());
    }

    /// Check if this is a directory
    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }

    /// Check if this is a volume label
    pub fn is_volume_label(&self) -> bool {
        self.attributes.contains(FileAttributes::VOLUME_ID) && !self.attributes.is_long_name()
    }

    /// Check if this is a dot entry (. or ..)
    pub fn is_dot(&self) -> bool {
        self.name == DOT_NAME || self.name == DOTDOT_NAME
    }

    /// Get the first cluster number
    pub fn first_cluster(&self) -> u32 {
        ((self.cluster_hi as u32) << 16) | (self.cluster_lo as u32)
    }

    /// Set the first cluster number
    pub fn set_first_cluster(&mut self, cluster: u32) {
        self.cluster_hi = (cluster >> 16) as u16;
        self.cluster_lo = (cluster & 0xFFFF) as u16;
    }

    /// Display name (`NAME.EXT`)
    pub fn display_name(&self) -> String {
        decode_name(&self.name)
    }

    /// Caller-facing description
    pub fn info(&self) -> FileInfo {
        FileInfo {
            name: self.display_name(),
            size: self.file_size,
            first_cluster: self.first_cluster(),
            attributes: self.attributes,
            is_directory: self.is_directory(),
        }
    }
}

/// Information about one directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u32,
    pub first_cluster: u32,
    pub attributes: FileAttributes,
    pub is_directory: bool,
}

/// Result of listing a directory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirListing {
    /// At most `limit` entries, in on-disk order
    pub entries: Vec<FileInfo>,
    /// More listable entries exist beyond `limit`
    pub truncated: bool,
}

/// Characters never allowed in a short name
const INVALID_CHARS: &[u8] = b"\"*+,/:;<=>?[\\]|";

fn check_char(c: u8, allow_dot: bool) -> FsResult<u8> {
    if !c.is_ascii()
        || c.is_ascii_control()
        || c == b' '
        || (c == b'.' && !allow_dot)
        || INVALID_CHARS.contains(&c)
    {
        return Err(FsError::InvalidName);
    }
    Ok(c.to_ascii_uppercase())
}

/// Fit `part` into `field`, truncating or failing per `policy`
fn fill_field(
    field: &mut [u8],
    part: &[u8],
    policy: NamePolicy,
    allow_dot: bool,
) -> FsResult<()> {
    if part.len() > field.len() && policy == NamePolicy::Reject {
        return Err(FsError::NameTooLong);
    }
    for (slot, &c) in field.iter_mut().zip(part) {
        *slot = check_char(c, allow_dot)?;
    }
    Ok(())
}

/// Convert a display name (`hello.c`) into the raw 11-byte form (`HELLO   C  `).
///
/// The name is split at its first `.`. Letters are upper-cased and both
/// fields are padded with spaces. An over-long field is an error under
/// [`NamePolicy::Reject`] and is cut short under [`NamePolicy::Truncate`].
/// A second `.` is invalid under `Reject`; under `Truncate` it is kept as
/// part of the extension (`a.b.c` becomes `A       B.C`).
pub fn encode_name(name: &str, policy: NamePolicy) -> FsResult<[u8; SHORT_NAME_LEN]> {
    match name {
        "." => return Ok(DOT_NAME),
        ".." => return Ok(DOTDOT_NAME),
        _ => {}
    }

    let bytes = name.as_bytes();
    let (base, ext) = match bytes.iter().position(|&b| b == b'.') {
        Some(dot) => (&bytes[..dot], &bytes[dot + 1..]),
        None => (bytes, &[][..]),
    };
    if base.is_empty() {
        return Err(FsError::InvalidName);
    }

    let mut raw = [b' '; SHORT_NAME_LEN];
    fill_field(&mut raw[..BASE_LEN], base, policy, false)?;
    fill_field(
        &mut raw[BASE_LEN..],
        ext,
        policy,
        policy == NamePolicy::Truncate,
    )?;
    Ok(raw)
}

/// Convert a raw 11-byte name into its display form.
///
/// Trailing spaces are dropped from both fields and the `.` is only added
/// when the extension is not blank.
pub fn decode_name(raw: &[u8; SHORT_NAME_LEN]) -> String {
    let mut name = String::with_capacity(12);

    for (i, &b) in raw[..BASE_LEN].iter().enumerate() {
        if b == b' ' {
            break;
        }
        let b = if i == 0 && b == entry_status::KANJI {
            entry_status::FREE
        } else {
            b
        };
        name.push(char::from(b));
    }

    let ext = &raw[BASE_LEN..];
    if ext[0] != b' ' {
        name.push('.');
        for &b in ext.iter().take_while(|&&b| b != b' ') {
            name.push(char::from(b));
        }
    }
    name
}
