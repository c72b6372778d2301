use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::config::settings::{ScanOptions, Settings};
use crate::core::analyzer::{format_percentage, Analyzer};
use crate::core::events::{Event, ScanProgress};
use crate::core::scanner::Scanner;
use crate::error::ScanError;
use crate::export::json::{export_json, ScanReport};
use crate::models::scan_result::{ScanOutcome, ScanResult};
use crate::models::size::format_size;

const PROGRESS_TEMPLATE: &str = "{elapsed_precise} [{bar:40.cyan/blue}] {pos}/{len} {percent:>3}% {wide_msg}";

/// Headless driver: runs one scan, draws a progress bar on stderr and the
/// ranked table on stdout. Ctrl-C cancels the scan cooperatively.
pub struct App {
    root: PathBuf,
    settings: Settings,
    options: ScanOptions,
    top: Option<usize>,
    export_path: Option<PathBuf>,
    quiet: bool,
}

impl App {
    pub fn new(root: PathBuf, settings: Settings, options: ScanOptions) -> Self {
        Self {
            root,
            settings,
            options,
            top: None,
            export_path: None,
            quiet: false,
        }
    }

    pub fn top(mut self, n: Option<usize>) -> Self {
        self.top = n;
        self
    }

    pub fn export_json(mut self, path: Option<PathBuf>) -> Self {
        self.export_path = path;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub async fn run(&self) -> anyhow::Result<ScanOutcome> {
        let scanner = Scanner::new(self.settings.clone());
        let mut handle = scanner.start_scan(&self.root, self.options)?;
        let root = handle.root().to_path_buf();
        let cancel = handle.cancel_token();

        let bar = progress_bar(self.quiet);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut listening = true;

        let outcome = loop {
            tokio::select! {
                signal = &mut ctrl_c, if listening => {
                    listening = false;
                    match signal {
                        Ok(()) => {
                            tracing::info!("Interrupt received, cancelling scan");
                            cancel.cancel();
                        }
                        Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
                    }
                }
                event = handle.next_event() => {
                    match event {
                        Some(Event::Progress(progress)) => update_progress(&bar, &progress),
                        Some(Event::Finished(outcome)) => break Some(outcome),
                        None => break None,
                    }
                }
            }
        };

        bar.finish_and_clear();
        // Join before reporting so no worker outlives the scan.
        handle.join().await?;

        let outcome = outcome.ok_or(ScanError::Disconnected)?;
        if let ScanOutcome::Completed(ref results) = outcome {
            self.print_results(&root, results)?;
            if let Some(ref path) = self.export_path {
                export_json(&ScanReport::new(&root, results), path)?;
                println!("Exported to: {}", path.display());
            }
        }
        Ok(outcome)
    }

    fn print_results(&self, root: &Path, results: &[ScanResult]) -> std::io::Result<()> {
        let summary = Analyzer::summarize(results);
        let shown = match self.top {
            Some(n) => Analyzer::top_n(results, n),
            None => results,
        };

        let mut out = std::io::stdout().lock();
        writeln!(out, "Path:        {}", root.display())?;
        writeln!(
            out,
            "Entries:     {} ({} folders, {} files)",
            results.len(),
            summary.folder_count,
            summary.file_count
        )?;
        writeln!(out, "Total size:  {}", format_size(summary.total_size))?;
        if let Some(largest) = summary.largest {
            writeln!(out, "Largest:     {} ({})", largest.name, largest.display_size())?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "{:>5}  {:<6}  {:>10}  {:>6}  PATH",
            "#", "KIND", "SIZE", "SHARE"
        )?;
        for (i, result) in shown.iter().enumerate() {
            writeln!(
                out,
                "{:>5}  {:<6}  {:>10}  {:>6}  {}",
                i + 1,
                result.kind.label(),
                result.display_size(),
                format_percentage(Analyzer::percentage(result, summary.total_size)),
                result.path.display()
            )?;
        }
        Ok(())
    }
}

/// Progress bar on stderr. Hidden entirely in quiet mode.
pub fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
    }
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    match ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        Ok(style) => bar.set_style(style.progress_chars("##-")),
        Err(e) => tracing::debug!("invalid progress template: {}", e),
    }
    bar
}

/// Mirror one progress event onto the bar.
pub fn update_progress(bar: &ProgressBar, progress: &ScanProgress) {
    bar.set_length(progress.total as u64);
    bar.set_position(progress.completed as u64);
    let name = progress
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| progress.path.display().to_string());
    bar.set_message(name);
}
