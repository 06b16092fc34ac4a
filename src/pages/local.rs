//! Vdisk listing from a local mount
//!
//! [`LocalVdisk`] serves the listing call from a vdisk that is mounted on the
//! local machine (`<mount_root>/<vdisk_name>`). Folder identifiers are the
//! real inode numbers, so the output matches what a page node would report.
//!
//! A page node can list any folder by inode alone. A mount has no such
//! lookup, so every directory seen in a listing is recorded in a shared
//! inode -> path index before its inode is handed out. All page node clients
//! built on one `LocalVdisk` share that index, which lets a folder found by
//! one node's worker be listed by another's.
//!
//! Entry names are ordered and compared as raw bytes. A name that is not
//! valid UTF-8 is reported lossily; when such a name ends a page, its raw
//! form is kept so the next page resumes after the right entry.

use crate::error::{PagesError, PagesResult};
use crate::pages::types::{EntryRecord, FolderId};
use crate::pages::{PagesClient, DEFAULT_POOL_SIZE};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// A vdisk mounted on the local filesystem
#[derive(Debug)]
pub struct LocalVdisk {
    /// Mount point of the vdisk
    root: PathBuf,

    /// Inode of the mount point
    root_inode: FolderId,

    /// Known folders by inode
    folders: RwLock<HashMap<FolderId, PathBuf>>,

    /// Raw names behind lossy cursors, by folder and reported name
    raw_cursors: Mutex<HashMap<(FolderId, String), OsString>>,

    /// Entries per listing page
    page_size: usize,

    /// Advertised pool size
    pool_size: usize,
}

impl LocalVdisk {
    /// Open the vdisk mounted at `root`
    pub fn open(root: &Path, page_size: usize) -> PagesResult<Self> {
        let meta = fs::metadata(root).map_err(|e| PagesError::VdiskNotFound {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !meta.is_dir() {
            return Err(PagesError::VdiskNotFound {
                path: root.to_path_buf(),
                reason: "not a directory".into(),
            });
        }

        let root_inode = meta.ino();
        let mut folders = HashMap::new();
        folders.insert(root_inode, root.to_path_buf());

        debug!(root = %root.display(), inode = root_inode, "Opened local vdisk");

        Ok(Self {
            root: root.to_path_buf(),
            root_inode,
            folders: RwLock::new(folders),
            raw_cursors: Mutex::new(HashMap::new()),
            page_size: page_size.max(1),
            pool_size: DEFAULT_POOL_SIZE,
        })
    }

    /// Open `<mount_root>/<vdisk_name>`
    pub fn open_in(mount_root: &Path, vdisk_name: &str, page_size: usize) -> PagesResult<Self> {
        Self::open(&mount_root.join(vdisk_name), page_size)
    }

    /// Mount point of this vdisk
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of folders indexed so far
    pub fn known_folders(&self) -> usize {
        self.folders.read().len()
    }

    fn folder_path(&self, folder: FolderId) -> PagesResult<PathBuf> {
        self.folders
            .read()
            .get(&folder)
            .cloned()
            .ok_or(PagesError::FolderNotFound { folder })
    }

    fn resolve_cursor(&self, folder: FolderId, cursor: &str) -> OsString {
        self.raw_cursors
            .lock()
            .get(&(folder, cursor.to_string()))
            .cloned()
            .unwrap_or_else(|| OsString::from(cursor))
    }
}

/// Build a record from local metadata
///
/// Fields with no POSIX counterpart are left at zero / false.
fn entry_from_metadata(name: String, meta: &Metadata) -> EntryRecord {
    EntryRecord {
        inode: meta.ino(),
        name,
        blk_size: meta.blksize(),
        nblocks: meta.blocks(),
        mode: meta.mode(),
        nlink: meta.nlink(),
        size: meta.size(),
        atime: meta.atime(),
        ctime: meta.ctime(),
        mtime: meta.mtime(),
        uid: meta.uid(),
        gid: meta.gid(),
        is_dir: meta.is_dir(),
        ..EntryRecord::default()
    }
}

impl PagesClient for LocalVdisk {
    fn list_page(&self, folder: FolderId, cursor: &str) -> PagesResult<Vec<EntryRecord>> {
        let path = self.folder_path(folder)?;
        let list_err = |reason: String| PagesError::ListFailed {
            folder,
            cursor: cursor.to_string(),
            reason,
        };

        let after = self.resolve_cursor(folder, cursor);

        let mut names: Vec<OsString> = Vec::new();
        for dirent in fs::read_dir(&path).map_err(|e| list_err(e.to_string()))? {
            let dirent = dirent.map_err(|e| list_err(e.to_string()))?;
            let name = dirent.file_name();
            if name > after {
                names.push(name);
            }
        }
        names.sort_unstable();
        names.truncate(self.page_size);

        let mut page = Vec::with_capacity(names.len());
        let mut subdirs = Vec::new();
        for raw in &names {
            let child = path.join(raw);
            // symlink_metadata: a link to a directory is not a folder of this vdisk
            let meta = fs::symlink_metadata(&child).map_err(|e| list_err(e.to_string()))?;
            let entry = entry_from_metadata(raw.to_string_lossy().into_owned(), &meta);
            if entry.is_dir {
                subdirs.push((entry.inode, child));
            }
            page.push(entry);
        }

        if !subdirs.is_empty() {
            self.folders.write().extend(subdirs);
        }

        if let (Some(raw), Some(entry)) = (names.last(), page.last()) {
            if raw.to_str().is_none() {
                self.raw_cursors
                    .lock()
                    .insert((folder, entry.name.clone()), raw.clone());
            }
        }

        trace!(folder, cursor, entries = page.len(), "Listed page");
        Ok(page)
    }

    fn root_folder(&self) -> FolderId {
        self.root_inode
    }

    fn pool_size(&self) -> usize {
        self.pool_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_missing() {
        let dir = tempdir().unwrap();
        let result = LocalVdisk::open_in(dir.path(), "missing", 10);
        assert!(matches!(result, Err(PagesError::VdiskNotFound { .. })));
    }

    #[test]
    fn test_list_pages() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), b"hello").unwrap();
        fs::write(dir.path().join("a.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();

        let vdisk = LocalVdisk::open(dir.path(), 2).unwrap();
        let root = vdisk.root_folder();

        let first = vdisk.list_page(root, "").unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].name, "a.txt");
        assert_eq!(first[1].name, "b.txt");
        assert_eq!(first[1].size, 5);
        assert!(!first[1].is_dir);

        let second = vdisk.list_page(root, "b.txt").unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "c");
        assert!(second[0].is_dir);

        assert!(vdisk.list_page(root, "c").unwrap().is_empty());

        // the sub-folder is now listable by inode
        assert_eq!(vdisk.known_folders(), 2);
        assert!(vdisk.list_page(second[0].inode, "").unwrap().is_empty());
    }

    #[test]
    fn test_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        // Both names are reported as "bad\u{FFFD}"
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xfe")), b"xy").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff")), b"x").unwrap();
        fs::write(dir.path().join("ok.txt"), b"").unwrap();

        let vdisk = LocalVdisk::open(dir.path(), 1).unwrap();
        let root = vdisk.root_folder();

        let mut cursor = String::new();
        let mut seen = Vec::new();
        loop {
            let page = vdisk.list_page(root, &cursor).unwrap();
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.name.clone();
            seen.extend(page);
            assert!(seen.len() <= 3, "listing did not advance");
        }

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].name, "bad\u{FFFD}");
        assert_eq!(seen[0].size, 2);
        assert_eq!(seen[1].name, "bad\u{FFFD}");
        assert_eq!(seen[1].size, 1);
        assert_eq!(seen[2].name, "ok.txt");
    }

    #[test]
    fn test_unknown_folder() {
        let dir = tempdir().unwrap();
        let vdisk = LocalVdisk::open(dir.path(), 10).unwrap();
        assert!(matches!(
            vdisk.list_page(u64::MAX, ""),
            Err(PagesError::FolderNotFound { .. })
        ));
    }
}
