use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::models::scan_result::ScanOutcome;

use super::progress::percent;

/// Progress after one target was attempted, whether it was sized or skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    pub path: PathBuf,
    pub completed: usize,
    pub total: usize,
}

impl ScanProgress {
    pub fn percent(&self) -> usize {
        percent(self.completed, self.total)
    }
}

/// Per scan: zero or more `Progress` in enumeration order, then exactly one
/// `Finished`.
#[derive(Debug, Clone)]
pub enum Event {
    Progress(ScanProgress),
    Finished(ScanOutcome),
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
