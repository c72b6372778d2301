use crate::models::scan_result::ScanResult;
use crate::models::target::EntryKind;

pub struct Analyzer;

impl Analyzer {
    /// Largest first. `sort_by` is stable, so equal sizes keep encounter order.
    pub fn sort_by_size(results: &mut [ScanResult]) {
        results.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
    }

    pub fn is_sorted_by_size(results: &[ScanResult]) -> bool {
        results
            .windows(2)
            .all(|pair| pair[0].size_bytes >= pair[1].size_bytes)
    }

    pub fn summarize(results: &[ScanResult]) -> ScanSummary<'_> {
        let folder_count = results
            .iter()
            .filter(|r| r.kind == EntryKind::Folder)
            .count();

        ScanSummary {
            folder_count,
            file_count: results.len() - folder_count,
            total_size: Self::total_size(results),
            largest: results
                .iter()
                .reduce(|best, r| if r.size_bytes > best.size_bytes { r } else { best }),
        }
    }

    /// Sum over every result. Folders include their descendants, so nested
    /// entries are counted once per enclosing result.
    pub fn total_size(results: &[ScanResult]) -> u64 {
        results.iter().map(|r| r.size_bytes).sum()
    }

    pub fn percentage(result: &ScanResult, total_size: u64) -> f64 {
        if total_size == 0 {
            return 0.0;
        }
        (result.size_bytes as f64 / total_size as f64) * 100.0
    }

    pub fn top_n(results: &[ScanResult], n: usize) -> &[ScanResult] {
        &results[..n.min(results.len())]
    }
}

pub fn format_percentage(pct: f64) -> String {
    format!("{pct:.1}%")
}

#[derive(Debug, Clone, Copy)]
pub struct ScanSummary<'a> {
    pub folder_count: usize,
    pub file_count: usize,
    pub total_size: u64,
    pub largest: Option<&'a ScanResult>,
}
