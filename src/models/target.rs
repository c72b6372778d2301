use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Folder,
    File,
}

impl EntryKind {
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Folder => "folder",
            EntryKind::File => "file",
        }
    }
}

/// A single filesystem entry selected for size measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl ScanTarget {
    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Folder,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
