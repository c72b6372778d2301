//! Enumerator: turns a root directory into the list of scan targets.
//!
//! Folders and files are collected by two independent depth-first walks so
//! each kind is capped on its own. Unreadable subdirectories are left out
//! silently.
//!
//! If the root itself cannot be listed, the folder walk still yields the
//! root as its single target. This keeps a total traversal failure from
//! failing the scan: the sizer gets a chance to measure the root with its
//! own fallback strategy, and consumers still receive a result set.

use std::path::Path;

use tracing::debug;

use crate::config::settings::{Limits, ScanOptions};
use crate::models::target::ScanTarget;

use super::cancel::{CancelToken, Cancelled};
use super::walk::{read_dir_batch, VisitedDirs, Walk};

/// Enumerate targets below `root`: folders first, then files.
pub fn enumerate(
    root: &Path,
    options: ScanOptions,
    limits: Limits,
    follow_symlinks: bool,
    cancel: &CancelToken,
) -> Result<Vec<ScanTarget>, Cancelled> {
    let mut targets = Vec::new();

    if options.include_folders {
        targets.extend(enumerate_folders(root, limits.max_folders, follow_symlinks, cancel)?);
    }
    if options.include_files {
        targets.extend(enumerate_files(root, limits.max_files, follow_symlinks, cancel)?);
    }

    debug!(
        root = %root.display(),
        targets = targets.len(),
        "enumeration finished"
    );
    Ok(targets)
}

/// One folder target per directory visited, the root included.
pub fn enumerate_folders(
    root: &Path,
    cap: usize,
    follow_symlinks: bool,
    cancel: &CancelToken,
) -> Result<Vec<ScanTarget>, Cancelled> {
    cancel.check()?;
    if cap == 0 {
        return Ok(Vec::new());
    }

    let mut visited = VisitedDirs::new(follow_symlinks);
    visited.enter(root);

    let root_listing = match read_dir_batch(root, follow_symlinks, cancel)? {
        Ok(listing) => listing,
        Err(e) => {
            debug!(root = %root.display(), error = %e, "root unreadable, using it as the only folder target");
            return Ok(vec![ScanTarget::folder(root)]);
        }
    };

    let mut targets = vec![ScanTarget::folder(root)];
    let mut walk = Walk::new(&mut visited, follow_symlinks, cancel);
    walk.descend(&root_listing.entries);

    while targets.len() < cap {
        let Some((dir, listing)) = walk.next_dir()? else {
            break;
        };
        walk.descend(&listing.entries);
        targets.push(ScanTarget::folder(dir));
    }

    if targets.len() == cap {
        debug!(cap, "folder target cap reached");
    }
    Ok(targets)
}

/// One file target per regular file found below `root`.
pub fn enumerate_files(
    root: &Path,
    cap: usize,
    follow_symlinks: bool,
    cancel: &CancelToken,
) -> Result<Vec<ScanTarget>, Cancelled> {
    cancel.check()?;
    if cap == 0 {
        return Ok(Vec::new());
    }

    let mut visited = VisitedDirs::new(follow_symlinks);
    visited.enter(root);

    let root_listing = match read_dir_batch(root, follow_symlinks, cancel)? {
        Ok(listing) => listing,
        Err(e) => {
            debug!(root = %root.display(), error = %e, "root unreadable, no file targets");
            return Ok(Vec::new());
        }
    };

    let mut targets = Vec::new();
    let mut walk = Walk::new(&mut visited, follow_symlinks, cancel);
    let mut listing = root_listing;

    loop {
        for entry in listing.entries.iter().filter(|e| e.is_file()) {
            cancel.check()?;
            targets.push(ScanTarget::file(&entry.path));
            if targets.len() == cap {
                debug!(cap, "file target cap reached");
                return Ok(targets);
            }
        }
        walk.descend(&listing.entries);

        match walk.next_dir()? {
            Some((_, next)) => listing = next,
            None => break,
        }
    }

    Ok(targets)
}
