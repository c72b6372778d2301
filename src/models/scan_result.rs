use std::path::{Path, PathBuf};

use compact_str::{format_compact, CompactString};
use serde::{Deserialize, Serialize};

use super::size::format_size;
use super::target::{EntryKind, ScanTarget};

/// One successfully sized target.
///
/// `path` is the unique key within a scan. `depth` counts path components
/// below the scan root, so the root itself sits at depth 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub kind: EntryKind,
    pub path: PathBuf,
    pub name: CompactString,
    pub size_bytes: u64,
    pub depth: usize,
}

impl ScanResult {
    pub fn new(root: &Path, target: ScanTarget, size_bytes: u64) -> Self {
        let depth = target
            .path
            .strip_prefix(root)
            .map(|rel| rel.components().count())
            .unwrap_or(0);
        let name = display_name(root, &target.path);

        Self {
            kind: target.kind,
            path: target.path,
            name,
            size_bytes,
            depth,
        }
    }

    pub fn is_root(&self) -> bool {
        self.kind == EntryKind::Folder && self.depth == 0
    }

    pub fn display_size(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Display name for a result. The scan root gets a synthesized label so it
/// stays recognisable next to its own children.
pub fn display_name(root: &Path, path: &Path) -> CompactString {
    let base = path
        .file_name()
        .map(|n| CompactString::from(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::from(path.to_string_lossy()));

    if path == root {
        format_compact!("{base} (root)")
    } else {
        base
    }
}

/// Terminal outcome of one scan invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Results sorted by `size_bytes` descending, ties in encounter order.
    Completed(Vec<ScanResult>),
    Cancelled,
    Failed(String),
}

impl ScanOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ScanOutcome::Completed(_))
    }

    pub fn into_results(self) -> Option<Vec<ScanResult>> {
        match self {
            ScanOutcome::Completed(results) => Some(results),
            _ => None,
        }
    }
}
