use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::job::TaskStatus;

/// Shared best-effort cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the coordinator reports while a batch runs
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    BatchStarted { total: usize, workers: usize },
    TaskStarted { index: usize, source: PathBuf },
    TaskFinished {
        index: usize,
        source: PathBuf,
        status: TaskStatus,
    },
    BatchFinished { completed: usize, cancelled: bool },
}

/// Sending half handed to the coordinator; a dropped receiver is ignored
#[derive(Debug, Clone)]
pub struct ProgressSender(UnboundedSender<ProgressEvent>);

impl ProgressSender {
    pub fn send(&self, event: ProgressEvent) {
        let _ = self.0.send(event);
    }
}

/// Create a progress channel
pub fn channel() -> (ProgressSender, UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender(tx), rx)
}
