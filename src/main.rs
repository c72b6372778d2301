use std::path::PathBuf;

use clap::Parser;

use foldersize::app::App;
use foldersize::config::settings::{ScanOptions, Settings};
use foldersize::models::scan_result::ScanOutcome;

#[derive(Parser, Debug)]
#[command(name = "foldersize", version, about = "Rank folders and files by size")]
struct Cli {
    /// Path to scan (default: current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Measure individual files
    #[arg(short = 'f', long)]
    files: bool,

    /// Do not measure folders
    #[arg(long)]
    no_folders: bool,

    /// Follow symbolic links (cycles are detected)
    #[arg(long)]
    follow_symlinks: bool,

    /// Maximum number of folder targets
    #[arg(long)]
    max_folders: Option<usize>,

    /// Maximum number of file targets
    #[arg(long)]
    max_files: Option<usize>,

    /// Only print the N largest entries
    #[arg(short = 'n', long)]
    top: Option<usize>,

    /// Export the ranked results as JSON
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Suppress the progress line
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (logs to stderr)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::default();
    if let Some(n) = cli.max_folders {
        settings.max_folder_targets = n;
    }
    if let Some(n) = cli.max_files {
        settings.max_file_targets = n;
    }
    settings.follow_symlinks = cli.follow_symlinks;

    let options = ScanOptions {
        include_folders: !cli.no_folders,
        include_files: cli.files,
    };

    let app = App::new(cli.path, settings, options)
        .top(cli.top)
        .export_json(cli.export_json)
        .quiet(cli.quiet);

    match app.run().await? {
        ScanOutcome::Completed(_) => Ok(()),
        ScanOutcome::Cancelled => {
            eprintln!("Scan cancelled");
            Ok(())
        }
        ScanOutcome::Failed(message) => Err(anyhow::anyhow!("scan failed: {message}")),
    }
}
