use serde::{Deserialize, Serialize};

/// Hard cap on folder targets enumerated per scan.
pub const MAX_FOLDER_TARGETS: usize = 10_000;
/// Hard cap on file targets enumerated per scan.
pub const MAX_FILE_TARGETS: usize = 50_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub max_folder_targets: usize,
    pub max_file_targets: usize,
    /// Resolve symbolic links. Directories reached through links are tracked
    /// by physical identity so a link cycle is entered at most once.
    ///
    /// File links are not deduplicated: each link to a file adds the size of
    /// its target, once per link, even when the target is also counted
    /// directly.
    pub follow_symlinks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_folder_targets: MAX_FOLDER_TARGETS,
            max_file_targets: MAX_FILE_TARGETS,
            follow_symlinks: false,
        }
    }
}

impl Settings {
    pub fn limits(&self) -> Limits {
        Limits {
            max_folders: self.max_folder_targets,
            max_files: self.max_file_targets,
        }
    }
}

/// Enumeration caps. Reaching a cap truncates, it is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_folders: usize,
    pub max_files: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Settings::default().limits()
    }
}

/// Per-scan selection of what gets measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    pub include_folders: bool,
    pub include_files: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::FOLDERS
    }
}

impl ScanOptions {
    pub const ALL: Self = Self {
        include_folders: true,
        include_files: true,
    };
    pub const FOLDERS: Self = Self {
        include_folders: true,
        include_files: false,
    };
    pub const FILES: Self = Self {
        include_folders: false,
        include_files: true,
    };
    pub const NONE: Self = Self {
        include_folders: false,
        include_files: false,
    };

    pub fn is_empty(&self) -> bool {
        !self.include_folders && !self.include_files
    }
}
