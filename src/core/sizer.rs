//! Sizer: measures the logical byte size of a scan target.
//!
//! Files are a single stat. Folders are summed with two strategies:
//!
//! 1. **Primary walk.** The folder's own listing must be read in full; the
//!    subtree below it is walked leniently, skipping any directory or file
//!    that raises an error.
//! 2. **Entry scan.** When the primary listing fails, the folder is read
//!    entry by entry, skipping what cannot be read and sizing every
//!    subdirectory with this same two-strategy policy.
//!
//! If neither strategy can list the folder it measures as
//! [`FolderSize::Unreadable`] and contributes nothing.
//!
//! Sizes are logical (`metadata.len()`), not allocated blocks.

use std::io;
use std::path::Path;

use tracing::{debug, trace};

use crate::models::target::{EntryKind, ScanTarget};

use super::cancel::{CancelToken, Cancelled};
use super::walk::{inspect, read_dir_batch, read_dir_strict, EntryType, VisitedDirs, Walk};

/// Result of sizing one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderSize {
    /// Every entry below the folder was read.
    Complete(u64),
    /// Some entries were skipped; the sum covers the readable part only.
    Partial(u64),
    /// The folder could not be listed at all.
    Unreadable,
}

impl FolderSize {
    pub fn bytes(self) -> u64 {
        match self {
            FolderSize::Complete(n) | FolderSize::Partial(n) => n,
            FolderSize::Unreadable => 0,
        }
    }
}

/// What the pipeline records for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    Sized(u64),
    /// The target vanished or cannot be measured; it is left out of the results.
    Skipped,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Sizer {
    follow_symlinks: bool,
    cancel: CancelToken,
}

impl Sizer {
    pub fn new(follow_symlinks: bool, cancel: CancelToken) -> Self {
        Self {
            follow_symlinks,
            cancel,
        }
    }

    /// Byte size of `target`. Never fails: errors and cancellation yield 0.
    pub fn size(&self, target: &ScanTarget) -> u64 {
        match self.measure(target) {
            Measurement::Sized(n) => n,
            Measurement::Skipped | Measurement::Cancelled => 0,
        }
    }

    pub fn measure(&self, target: &ScanTarget) -> Measurement {
        if self.cancel.is_cancelled() {
            return Measurement::Cancelled;
        }

        match target.kind {
            EntryKind::File => self.measure_file(&target.path),
            EntryKind::Folder => match self.folder_size(&target.path) {
                Err(Cancelled) => Measurement::Cancelled,
                Ok(FolderSize::Unreadable) if std::fs::symlink_metadata(&target.path).is_err() => {
                    trace!(path = %target.path.display(), "folder vanished before sizing");
                    Measurement::Skipped
                }
                Ok(size) => Measurement::Sized(size.bytes()),
            },
        }
    }

    fn measure_file(&self, path: &Path) -> Measurement {
        match inspect(path, self.follow_symlinks) {
            Ok((EntryType::File, len)) => Measurement::Sized(len),
            Ok(_) => Measurement::Skipped,
            Err(e) => {
                trace!(path = %path.display(), error = %e, "file target not measurable");
                Measurement::Skipped
            }
        }
    }

    /// Recursive size of `dir`. Only cancellation interrupts the sum.
    pub fn folder_size(&self, dir: &Path) -> Result<FolderSize, Cancelled> {
        let mut visited = VisitedDirs::new(self.follow_symlinks);
        visited.enter(dir);
        self.folder_size_with(dir, &mut visited)
    }

    fn folder_size_with(&self, dir: &Path, visited: &mut VisitedDirs) -> Result<FolderSize, Cancelled> {
        self.cancel.check()?;

        let primary_error = match self.primary_walk(dir, visited)? {
            Ok(size) => return Ok(size),
            Err(e) => e,
        };
        debug!(path = %dir.display(), error = %primary_error, "primary walk failed, scanning entries");

        match self.entry_scan(dir, visited)? {
            Ok(size) => Ok(size),
            Err(e) => {
                debug!(path = %dir.display(), error = %e, "folder unreadable");
                Ok(FolderSize::Unreadable)
            }
        }
    }

    fn primary_walk(
        &self,
        dir: &Path,
        visited: &mut VisitedDirs,
    ) -> Result<io::Result<FolderSize>, Cancelled> {
        let entries = match read_dir_strict(dir, self.follow_symlinks, &self.cancel)? {
            Ok(entries) => entries,
            Err(e) => return Ok(Err(e)),
        };

        let mut total: u64 = entries.iter().filter(|e| e.is_file()).map(|e| e.len).sum();

        let mut walk = Walk::new(visited, self.follow_symlinks, &self.cancel);
        walk.descend(&entries);
        while let Some((_, listing)) = walk.next_dir()? {
            total += listing
                .entries
                .iter()
                .filter(|e| e.is_file())
                .map(|e| e.len)
                .sum::<u64>();
            walk.descend(&listing.entries);
        }

        if walk.skipped() == 0 {
            Ok(Ok(FolderSize::Complete(total)))
        } else {
            Ok(Ok(FolderSize::Partial(total)))
        }
    }

    fn entry_scan(
        &self,
        dir: &Path,
        visited: &mut VisitedDirs,
    ) -> Result<io::Result<FolderSize>, Cancelled> {
        let listing = match read_dir_batch(dir, self.follow_symlinks, &self.cancel)? {
            Ok(listing) => listing,
            Err(e) => return Ok(Err(e)),
        };

        let mut total: u64 = 0;
        for entry in &listing.entries {
            self.cancel.check()?;
            match entry.entry_type {
                EntryType::File => total += entry.len,
                EntryType::Directory => {
                    if visited.enter(&entry.path) {
                        total += self.folder_size_with(&entry.path, visited)?.bytes();
                    }
                }
                EntryType::Symlink | EntryType::Other => {}
            }
        }

        // Reaching this strategy means at least one entry of `dir` was lost.
        Ok(Ok(FolderSize::Partial(total)))
    }
}
