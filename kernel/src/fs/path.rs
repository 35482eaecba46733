//! File System Path Utilities
//!
//! Paths use `/` as the separator. A leading `/` makes a path absolute
//! (resolution starts at the volume root); anything else is resolved from the
//! current directory. Components are upper-cased on parse because FAT short
//! names are stored upper-case.
//!
//! `.` and `..` are kept as components: what `..` means depends on the
//! volume's parent-resolution policy, so it is decided while walking, not
//! while parsing.

use alloc::string::String;
use alloc::vec::Vec;

use super::{FsError, FsResult};

/// Maximum path length in bytes
pub const MAX_PATH: usize = 256;

/// Maximum number of components in a path
pub const MAX_PATH_DEPTH: usize = 16;

/// Path separator
pub const PATH_SEPARATOR: char = '/';

/// One path component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    /// `.`
    Current,
    /// `..`
    Parent,
    /// Any other name, upper-cased
    Name(String),
}

impl Component {
    fn from_part(s: &str) -> Self {
        match s {
            "." => Component::Current,
            ".." => Component::Parent,
            _ => Component::Name(s.to_ascii_uppercase()),
        }
    }

    /// The name, if this is a plain name component
    pub fn name(&self) -> Option<&str> {
        match self {
            Component::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// Parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// Whether path starts at the root
    pub is_absolute: bool,
    /// Path components, empty ones dropped
    pub components: Vec<Component>,
}

impl ParsedPath {
    /// Parse a path string with explicit limits
    pub fn parse_with_limits(path: &str, max_len: usize, max_depth: usize) -> FsResult<Self> {
        if path.len() > max_len {
            return Err(FsError::PathTooLong);
        }

        let is_absolute = path.starts_with(PATH_SEPARATOR);
        let mut components = Vec::new();

        for part in path.split(PATH_SEPARATOR) {
            if part.is_empty() {
                continue;
            }
            if components.len() >= max_depth {
                return Err(FsError::PathTooLong);
            }
            components.push(Component::from_part(part));
        }

        Ok(Self { is_absolute, components })
    }

    /// Parse a path string with the default limits
    pub fn parse(path: &str) -> FsResult<Self> {
        Self::parse_with_limits(path, MAX_PATH, MAX_PATH_DEPTH)
    }

    /// Check if this is a root path
    pub fn is_root(&self) -> bool {
        self.is_absolute && self.components.is_empty()
    }

    /// Get the last component
    pub fn file_name(&self) -> Option<&Component> {
        self.components.last()
    }

    /// Split into (parent components, last component)
    pub fn split_last(&self) -> Option<(&[Component], &Component)> {
        let (last, parent) = self.components.split_last()?;
        Some((parent, last))
    }
}

/// Parse a path into components with the default limits
pub fn parse_path(path: &str) -> FsResult<ParsedPath> {
    ParsedPath::parse(path)
}

/// A canonical absolute directory path (`/`, `/SUB`, `/SUB/INNER`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPath {
    components: Vec<String>,
    rendered: String,
}

impl DirectoryPath {
    /// The root path `/`
    pub fn root() -> Self {
        let mut rendered = String::new();
        rendered.push(PATH_SEPARATOR);
        Self {
            components: Vec::new(),
            rendered,
        }
    }

    /// Rendered path
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Number of components below the root
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Reset to `/`
    pub fn clear(&mut self) {
        *self = Self::root();
    }

    /// Descend into `name`
    pub fn push(&mut self, name: &str) {
        if !self.components.is_empty() {
            self.rendered.push(PATH_SEPARATOR);
        }
        self.rendered.push_str(name);
        self.components.push(String::from(name));
    }

    /// Go up one level; the root stays the root
    pub fn pop(&mut self) {
        if self.components.pop().is_some() {
            self.render();
        }
    }

    fn render(&mut self) {
        self.rendered.clear();
        self.rendered.push(PATH_SEPARATOR);
        for (i, comp) in self.components.iter().enumerate() {
            if i > 0 {
                self.rendered.push(PATH_SEPARATOR);
            }
            self.rendered.push_str(comp);
        }
    }
}

impl Default for DirectoryPath {
    fn default() -> Self {
        Self::root()
    }
}
