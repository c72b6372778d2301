//! Directory reading shared by the enumerator and the sizer.
//!
//! Listings are sorted by path so that a walk over an unchanged tree always
//! visits entries in the same order. Symbolic links are reported as
//! [`EntryType::Symlink`] and never entered unless the caller follows them,
//! in which case every directory is keyed by its physical identity and
//! entered at most once per walk.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::cancel::{CancelToken, Cancelled};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryType {
    File,
    Directory,
    Symlink,
    Other,
}

#[derive(Debug, Clone)]
pub(crate) struct DirEntryData {
    pub path: PathBuf,
    pub entry_type: EntryType,
    pub len: u64,
}

impl DirEntryData {
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }
}

#[derive(Debug, Default)]
pub(crate) struct DirListing {
    pub entries: Vec<DirEntryData>,
    /// Entries dropped because their metadata could not be read.
    pub skipped: usize,
}

/// Stat a single path under the given symlink policy.
pub(crate) fn inspect(path: &Path, follow_symlinks: bool) -> io::Result<(EntryType, u64)> {
    let mut meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() {
        if !follow_symlinks {
            return Ok((EntryType::Symlink, 0));
        }
        meta = fs::metadata(path)?;
    }

    let entry_type = if meta.is_dir() {
        EntryType::Directory
    } else if meta.is_file() {
        EntryType::File
    } else {
        EntryType::Other
    };
    Ok((entry_type, meta.len()))
}

/// Read all entries and their metadata from a directory in one call.
/// Unreadable entries are counted in `skipped`; only failing to open the
/// directory itself is an error. Cancellation is checked before each entry.
pub(crate) fn read_dir_batch(
    dir: &Path,
    follow_symlinks: bool,
    cancel: &CancelToken,
) -> Result<io::Result<DirListing>, Cancelled> {
    read_listing(dir, follow_symlinks, false, cancel)
}

/// Same as [`read_dir_batch`] but the first unreadable entry fails the
/// whole listing.
pub(crate) fn read_dir_strict(
    dir: &Path,
    follow_symlinks: bool,
    cancel: &CancelToken,
) -> Result<io::Result<Vec<DirEntryData>>, Cancelled> {
    Ok(read_listing(dir, follow_symlinks, true, cancel)?.map(|listing| listing.entries))
}

fn read_listing(
    dir: &Path,
    follow_symlinks: bool,
    strict: bool,
    cancel: &CancelToken,
) -> Result<io::Result<DirListing>, Cancelled> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) => return Ok(Err(e)),
    };
    let mut listing = DirListing::default();

    for entry_result in read_dir {
        // One stat per entry; a huge directory must not outlive a cancel.
        cancel.check()?;

        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) if strict => return Ok(Err(e)),
            Err(e) => {
                trace!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                listing.skipped += 1;
                continue;
            }
        };

        let path = entry.path();
        match inspect(&path, follow_symlinks) {
            Ok((entry_type, len)) => listing.entries.push(DirEntryData {
                path,
                entry_type,
                len,
            }),
            Err(e) if strict => return Ok(Err(e)),
            Err(e) => {
                trace!(path = %path.display(), error = %e, "skipping entry without metadata");
                listing.skipped += 1;
            }
        }
    }

    listing.entries.sort_unstable_by(|a, b| a.path.cmp(&b.path));
    Ok(Ok(listing))
}

#[cfg(unix)]
type DirId = (u64, u64);
#[cfg(not(unix))]
type DirId = PathBuf;

#[cfg(unix)]
fn dir_id(path: &Path) -> Option<DirId> {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).ok().map(|m| (m.dev(), m.ino()))
}

#[cfg(not(unix))]
fn dir_id(path: &Path) -> Option<DirId> {
    fs::canonicalize(path).ok()
}

/// Physical identities of the directories entered during one walk.
/// Disabled when links are not followed, since a plain tree has no cycles.
#[derive(Debug)]
pub(crate) struct VisitedDirs {
    enabled: bool,
    seen: HashSet<DirId>,
}

impl VisitedDirs {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            seen: HashSet::new(),
        }
    }

    /// Returns `false` when `path` resolves to a directory already entered.
    pub fn enter(&mut self, path: &Path) -> bool {
        if !self.enabled {
            return true;
        }
        match dir_id(path) {
            Some(id) => self.seen.insert(id),
            None => true,
        }
    }
}

/// Depth-first, pre-order walk below a directory whose listing the caller
/// already holds. Subdirectories that cannot be listed are skipped and
/// counted.
pub(crate) struct Walk<'a> {
    stack: Vec<PathBuf>,
    visited: &'a mut VisitedDirs,
    follow_symlinks: bool,
    cancel: &'a CancelToken,
    skipped: usize,
}

impl<'a> Walk<'a> {
    pub fn new(visited: &'a mut VisitedDirs, follow_symlinks: bool, cancel: &'a CancelToken) -> Self {
        Self {
            stack: Vec::new(),
            visited,
            follow_symlinks,
            cancel,
            skipped: 0,
        }
    }

    /// Queue the subdirectories of a listing so they come out in path order.
    pub fn descend(&mut self, entries: &[DirEntryData]) {
        self.stack
            .extend(entries.iter().rev().filter(|e| e.is_dir()).map(|e| e.path.clone()));
    }

    pub fn next_dir(&mut self) -> Result<Option<(PathBuf, DirListing)>, Cancelled> {
        while let Some(dir) = self.stack.pop() {
            self.cancel.check()?;

            if !self.visited.enter(&dir) {
                trace!(path = %dir.display(), "directory already visited");
                continue;
            }

            match read_dir_batch(&dir, self.follow_symlinks, self.cancel)? {
                Ok(listing) => {
                    self.skipped += listing.skipped;
                    return Ok(Some((dir, listing)));
                }
                Err(e) => {
                    trace!(path = %dir.display(), error = %e, "skipping unreadable directory");
                    self.skipped += 1;
                }
            }
        }
        Ok(None)
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("foldersize_walk_{}", name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create test dir");
        dir
    }

    #[test]
    fn test_listing_is_sorted() {
        let dir = make_test_dir("sorted");
        for name in ["c", "a", "b"] {
            fs::write(dir.join(name), name).unwrap();
        }
        fs::create_dir(dir.join("d")).unwrap();

        let cancel = CancelToken::new();
        let listing = read_dir_batch(&dir, false, &cancel).unwrap().unwrap();
        let names: Vec<_> = listing
            .entries
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert!(listing.entries[3].is_dir());
        assert_eq!(listing.skipped, 0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_walk_is_preorder() {
        let dir = make_test_dir("preorder");
        fs::create_dir_all(dir.join("a/x")).unwrap();
        fs::create_dir_all(dir.join("b")).unwrap();

        let cancel = CancelToken::new();
        let mut visited = VisitedDirs::new(false);
        let mut walk = Walk::new(&mut visited, false, &cancel);
        walk.descend(&read_dir_strict(&dir, false, &cancel).unwrap().unwrap());

        let mut order = Vec::new();
        while let Some((path, listing)) = walk.next_dir().unwrap() {
            walk.descend(&listing.entries);
            order.push(path.strip_prefix(&dir).unwrap().to_path_buf());
        }
        assert_eq!(
            order,
            vec![PathBuf::from("a"), PathBuf::from("a/x"), PathBuf::from("b")]
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_walk_observes_cancellation() {
        let dir = make_test_dir("cancel");
        fs::create_dir_all(dir.join("a")).unwrap();

        let entries = read_dir_strict(&dir, false, &CancelToken::new())
            .unwrap()
            .unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let mut visited = VisitedDirs::new(false);
        let mut walk = Walk::new(&mut visited, false, &cancel);
        walk.descend(&entries);
        assert_eq!(walk.next_dir().unwrap_err(), Cancelled);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_listing_stops_when_cancelled() {
        let dir = make_test_dir("listing_cancel");
        for i in 0..2_000 {
            fs::write(dir.join(format!("f{:05}", i)), b"x").unwrap();
        }

        // The directory opens fine; the flag is seen at the first entry.
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(read_dir_batch(&dir, false, &cancel).unwrap_err(), Cancelled);
        assert_eq!(read_dir_strict(&dir, true, &cancel).unwrap_err(), Cancelled);

        // An empty directory has no entry to check and lists normally.
        let empty = dir.join("f00000_empty");
        fs::create_dir(&empty).unwrap();
        let listing = read_dir_batch(&empty, false, &cancel).unwrap().unwrap();
        assert!(listing.entries.is_empty());

        // A missing directory is an io error, not a cancellation.
        assert!(read_dir_batch(&dir.join("missing"), false, &cancel)
            .unwrap()
            .is_err());

        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_policy() {
        let dir = make_test_dir("symlink");
        fs::write(dir.join("real.txt"), b"12345").unwrap();
        std::os::unix::fs::symlink(dir.join("real.txt"), dir.join("link.txt")).unwrap();

        let (ty, _) = inspect(&dir.join("link.txt"), false).unwrap();
        assert_eq!(ty, EntryType::Symlink);
        let (ty, len) = inspect(&dir.join("link.txt"), true).unwrap();
        assert_eq!(ty, EntryType::File);
        assert_eq!(len, 5);

        let mut visited = VisitedDirs::new(true);
        assert!(visited.enter(&dir));
        assert!(!visited.enter(&dir));

        let _ = fs::remove_dir_all(&dir);
    }
}
