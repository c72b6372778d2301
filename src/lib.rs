//! Cancellable folder and file size scanner.
//!
//! A scan walks a directory subtree on a background worker, measures the
//! selected folders and files, streams progress events, and delivers the
//! results ranked by size. See [`core::scanner::Scanner`].

pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod models;

pub use crate::config::settings::{ScanOptions, Settings};
pub use crate::core::cancel::CancelToken;
pub use crate::core::events::{Event, ScanProgress};
pub use crate::core::scanner::{run_scan, ScanHandle, ScanState, Scanner};
pub use crate::error::ScanError;
pub use crate::models::scan_result::{ScanOutcome, ScanResult};
pub use crate::models::size::format_size;
pub use crate::models::target::{EntryKind, ScanTarget};
