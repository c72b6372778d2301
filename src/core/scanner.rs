use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::settings::{ScanOptions, Settings};
use crate::error::ScanError;
use crate::models::scan_result::{ScanOutcome, ScanResult};

use super::analyzer::Analyzer;
use super::cancel::CancelToken;
use super::enumerator::enumerate;
use super::events::{create_event_channel, Event, EventReceiver, ScanProgress};
use super::progress::ProgressTracker;
use super::sizer::{Measurement, Sizer};

/// Scanner lifecycle: `Idle -> Running -> Completed | Cancelled | Failed -> Idle`.
///
/// A terminal state returns to `Idle` once the caller joins the scan handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScanState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
    Failed = 4,
}

impl ScanState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ScanState::Running,
            2 => ScanState::Completed,
            3 => ScanState::Cancelled,
            4 => ScanState::Failed,
            _ => ScanState::Idle,
        }
    }

    fn of(outcome: &ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Completed(_) => ScanState::Completed,
            ScanOutcome::Cancelled => ScanState::Cancelled,
            ScanOutcome::Failed(_) => ScanState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanState::Completed | ScanState::Cancelled | ScanState::Failed
        )
    }
}

#[derive(Debug, Default)]
struct StateCell(AtomicU8);

impl StateCell {
    fn load(&self) -> ScanState {
        ScanState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: ScanState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Enter `Running` unless a scan is already running.
    fn try_begin(&self) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current == ScanState::Running as u8 {
                return false;
            }
            match self.0.compare_exchange(
                current,
                ScanState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Terminal back to `Idle`. A scan started in the meantime is left alone.
    fn settle(&self) {
        let current = self.load();
        if current.is_terminal() {
            let _ = self.0.compare_exchange(
                current as u8,
                ScanState::Idle as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    /// The worker died without reporting; nothing else can be running.
    fn abandon(&self) {
        let _ = self.0.compare_exchange(
            ScanState::Running as u8,
            ScanState::Failed as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Entry point for the UI layer. One scan at a time per scanner.
pub struct Scanner {
    settings: Arc<Settings>,
    state: Arc<StateCell>,
}

impl Scanner {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            state: Arc::new(StateCell::default()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> ScanState {
        self.state.load()
    }

    /// Validate `root` and start a scan on a dedicated blocking worker.
    ///
    /// An invalid root is rejected here, before any work begins. Must be
    /// called from within a Tokio runtime.
    pub fn start_scan(
        &self,
        root: impl AsRef<Path>,
        options: ScanOptions,
    ) -> Result<ScanHandle, ScanError> {
        let root = validate_root(root.as_ref())?;

        if !self.state.try_begin() {
            return Err(ScanError::AlreadyRunning);
        }

        let (event_tx, event_rx) = create_event_channel();
        let cancel = CancelToken::new();
        let progress = Arc::new(ProgressTracker::new());

        let worker = {
            let root = root.clone();
            let settings = Arc::clone(&self.settings);
            let cancel = cancel.clone();
            let progress = Arc::clone(&progress);
            let state = Arc::clone(&self.state);

            tokio::task::spawn_blocking(move || {
                info!(root = %root.display(), ?options, "scan started");

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_scan(&root, options, &settings, &cancel, &progress, |p| {
                        let _ = event_tx.send(Event::Progress(p));
                    })
                }))
                .unwrap_or_else(|payload| ScanOutcome::Failed(panic_message(payload.as_ref())));

                match &outcome {
                    ScanOutcome::Completed(results) => info!(
                        root = %root.display(),
                        results = results.len(),
                        elapsed_ms = progress.elapsed().as_millis() as u64,
                        "scan completed"
                    ),
                    ScanOutcome::Cancelled => info!(root = %root.display(), "scan cancelled"),
                    ScanOutcome::Failed(message) => warn!(root = %root.display(), %message, "scan failed"),
                }

                state.store(ScanState::of(&outcome));
                let _ = event_tx.send(Event::Finished(outcome));
            })
        };

        Ok(ScanHandle {
            root,
            events: event_rx,
            cancel,
            progress,
            state: Arc::clone(&self.state),
            worker,
        })
    }
}

fn validate_root(root: &Path) -> Result<PathBuf, ScanError> {
    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScanError::RootNotFound(root.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_dir() {
        return Err(ScanError::RootNotDirectory(root.to_path_buf()));
    }
    Ok(std::fs::canonicalize(root)?)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "scan worker panicked".to_string()
    }
}

/// Handle to one running scan.
///
/// Dropping the handle does not stop the worker; call [`ScanHandle::stop`]
/// or [`ScanHandle::join`] before treating the scanner as idle.
pub struct ScanHandle {
    root: PathBuf,
    events: EventReceiver,
    cancel: CancelToken,
    progress: Arc<ProgressTracker>,
    state: Arc<StateCell>,
    worker: JoinHandle<()>,
}

impl ScanHandle {
    /// Canonical root being scanned.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Request a cooperative stop. Returns immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    pub fn state(&self) -> ScanState {
        self.state.load()
    }

    pub async fn next_event(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Wait for the worker to terminate. No event is sent after this returns.
    pub async fn join(self) -> Result<(), ScanError> {
        let joined = self.worker.await;
        if joined.is_err() {
            self.state.abandon();
        }
        self.state.settle();
        joined.map_err(ScanError::from)
    }

    /// Cancel and wait for the worker to terminate.
    pub async fn stop(self) -> Result<(), ScanError> {
        self.cancel();
        self.join().await
    }

    pub async fn wait(self) -> Result<ScanOutcome, ScanError> {
        self.wait_with(|_| {}).await
    }

    /// Drain events until the terminal one, then join the worker.
    pub async fn wait_with(
        mut self,
        mut on_progress: impl FnMut(&ScanProgress),
    ) -> Result<ScanOutcome, ScanError> {
        let outcome = loop {
            match self.events.recv().await {
                Some(Event::Progress(p)) => on_progress(&p),
                Some(Event::Finished(outcome)) => break Some(outcome),
                None => break None,
            }
        };
        self.join().await?;
        outcome.ok_or(ScanError::Disconnected)
    }
}

/// The scan pipeline, run synchronously on the calling thread.
///
/// Enumerates targets, sizes each one in order, reports progress after every
/// attempt, and returns the results sorted by size. Skipped targets count
/// toward progress but produce no result. Once cancellation is observed no
/// further progress is reported and no results are returned.
pub fn run_scan(
    root: &Path,
    options: ScanOptions,
    settings: &Settings,
    cancel: &CancelToken,
    progress: &ProgressTracker,
    mut on_progress: impl FnMut(ScanProgress),
) -> ScanOutcome {
    let targets = match enumerate(
        root,
        options,
        settings.limits(),
        settings.follow_symlinks,
        cancel,
    ) {
        Ok(targets) => targets,
        Err(_) => return ScanOutcome::Cancelled,
    };

    let total = targets.len();
    progress.set_total(total);

    let sizer = Sizer::new(settings.follow_symlinks, cancel.clone());
    let mut results: Vec<ScanResult> = Vec::with_capacity(total);

    for (index, target) in targets.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return ScanOutcome::Cancelled;
        }

        let path = target.path.clone();
        match sizer.measure(&target) {
            Measurement::Sized(bytes) => {
                progress.record_sized(bytes);
                results.push(ScanResult::new(root, target, bytes));
            }
            Measurement::Skipped => progress.record_skipped(),
            Measurement::Cancelled => return ScanOutcome::Cancelled,
        }

        on_progress(ScanProgress {
            path,
            completed: index + 1,
            total,
        });
    }

    if cancel.is_cancelled() {
        return ScanOutcome::Cancelled;
    }

    Analyzer::sort_by_size(&mut results);
    ScanOutcome::Completed(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cell_single_flight() {
        let cell = StateCell::default();
        assert_eq!(cell.load(), ScanState::Idle);

        assert!(cell.try_begin());
        assert_eq!(cell.load(), ScanState::Running);
        assert!(!cell.try_begin());

        cell.store(ScanState::Cancelled);
        assert!(cell.load().is_terminal());

        cell.settle();
        assert_eq!(cell.load(), ScanState::Idle);
    }

    #[test]
    fn test_terminal_state_allows_restart() {
        let cell = StateCell::default();
        assert!(cell.try_begin());
        cell.store(ScanState::Completed);
        assert!(cell.try_begin());

        // settle must not clobber the new run
        cell.settle();
        assert_eq!(cell.load(), ScanState::Running);
    }

    #[test]
    fn test_abandon_marks_failed() {
        let cell = StateCell::default();
        assert!(cell.try_begin());
        cell.abandon();
        assert_eq!(cell.load(), ScanState::Failed);
    }

    #[test]
    fn test_start_scan_refuses_while_running() {
        let dir = std::env::temp_dir().join("foldersize_scanner_running");
        std::fs::create_dir_all(&dir).expect("create test dir");

        // Rejected before any worker is spawned, so no runtime is needed.
        let scanner = Scanner::new(Settings::default());
        scanner.state.store(ScanState::Running);
        assert!(matches!(
            scanner.start_scan(&dir, ScanOptions::ALL),
            Err(ScanError::AlreadyRunning)
        ));
        assert_eq!(scanner.state(), ScanState::Running);

        // An invalid root is reported first, whatever the state.
        assert!(matches!(
            scanner.start_scan(dir.join("nope"), ScanOptions::ALL),
            Err(ScanError::RootNotFound(_))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u32);
        assert_eq!(panic_message(payload.as_ref()), "scan worker panicked");
    }
}
