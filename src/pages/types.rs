//! Entry types returned by page node listings
//!
//! An [`EntryRecord`] is one directory entry with the full metadata a page
//! node reports. Its [`Display`](fmt::Display) impl renders the output line
//! format consumed by downstream tooling:
//!
//! ```text
//! {id}\t{name},{blkSize},{nblocks},{mode},{nlink},{size},{atime},{ctime},{mtime},
//!     {uid},{gid},{deleted},{controllerId},{immutable},{duInode},{versionCounter},
//!     {isVersioningEnabled},{isDir}
//! ```

use std::fmt;

/// Identifier of a folder (or any entry) in a vdisk: its inode number
pub type FolderId = u64;

/// Identifier of the vdisk root folder
pub const ROOT_FOLDER_ID: FolderId = 2;

/// A single entry returned by a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryRecord {
    /// Inode number
    pub inode: FolderId,

    /// Entry name (not full path); also the resume cursor for the next page
    pub name: String,

    /// Preferred block size
    pub blk_size: u64,

    /// Number of blocks allocated
    pub nblocks: u64,

    /// File mode (type + permissions)
    pub mode: u32,

    /// Number of hard links
    pub nlink: u64,

    /// Size in bytes
    pub size: u64,

    /// Last access time (Unix timestamp)
    pub atime: i64,

    /// Status change time (Unix timestamp)
    pub ctime: i64,

    /// Last modification time (Unix timestamp)
    pub mtime: i64,

    /// Owner user ID
    pub uid: u32,

    /// Owner group ID
    pub gid: u32,

    /// Entry is marked deleted but not yet reclaimed
    pub deleted: bool,

    /// Controller that owns the entry
    pub controller_id: u64,

    /// Entry is write-protected
    pub immutable: bool,

    /// Inode of the data unit backing this entry
    pub du_inode: u64,

    /// Version counter
    pub version_counter: u64,

    /// Versioning enabled on this entry
    pub versioning_enabled: bool,

    /// Entry is a directory
    pub is_dir: bool,
}

impl EntryRecord {
    /// Create a regular file entry with the given size
    pub fn file(inode: FolderId, name: impl Into<String>, size: u64) -> Self {
        Self {
            inode,
            name: name.into(),
            mode: 0o100644,
            nlink: 1,
            size,
            ..Self::default()
        }
    }

    /// Create a directory entry
    pub fn dir(inode: FolderId, name: impl Into<String>) -> Self {
        Self {
            inode,
            name: name.into(),
            mode: 0o040755,
            nlink: 2,
            is_dir: true,
            ..Self::default()
        }
    }
}

/// Booleans are rendered the way the existing output files spell them
fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Renders the output line
///
/// The name is written as-is. A name containing a tab, a comma or a newline
/// yields a line that cannot be split back into its fields; such names are
/// not escaped.
impl fmt::Display for EntryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.inode,
            self.name,
            self.blk_size,
            self.nblocks,
            self.mode,
            self.nlink,
            self.size,
            self.atime,
            self.ctime,
            self.mtime,
            self.uid,
            self.gid,
            flag(self.deleted),
            self.controller_id,
            flag(self.immutable),
            self.du_inode,
            self.version_counter,
            flag(self.versioning_enabled),
            flag(self.is_dir),
        )
    }
}
