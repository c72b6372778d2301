use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::core::analyzer::Analyzer;
use crate::models::scan_result::ScanResult;
use crate::models::target::EntryKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_path: PathBuf,
    pub generated_at: DateTime<Local>,
    pub total_size: u64,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub rank: usize,
    pub kind: EntryKind,
    pub name: CompactString,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub display_size: String,
    pub depth: usize,
    pub percentage: f64,
}

impl ScanReport {
    pub fn new(scan_path: &Path, results: &[ScanResult]) -> Self {
        let total_size = Analyzer::total_size(results);
        let entries = results
            .iter()
            .enumerate()
            .map(|(i, r)| ReportEntry {
                rank: i + 1,
                kind: r.kind,
                name: r.name.clone(),
                path: r.path.clone(),
                size_bytes: r.size_bytes,
                display_size: r.display_size(),
                depth: r.depth,
                percentage: Analyzer::percentage(r, total_size),
            })
            .collect();

        Self {
            scan_path: scan_path.to_path_buf(),
            generated_at: Local::now(),
            total_size,
            entries,
        }
    }
}

pub fn export_json(report: &ScanReport, output_path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(output_path, json)?;
    Ok(())
}
