use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{BatchError, TaskError};

/// Smallest supported worker pool
pub const MIN_WORKERS: usize = 1;
/// Largest supported worker pool
pub const MAX_WORKERS: usize = 16;
/// Worker pool size when nothing else is configured
pub const DEFAULT_WORKERS: usize = 8;

/// Lifecycle of a single conversion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Converting,
    Succeeded,
    SucceededViaRetry,
    Failed,
}

impl TaskStatus {
    /// No further transition happens from a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::SucceededViaRetry | TaskStatus::Failed
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::SucceededViaRetry)
    }
}

/// One input document and the PDF it should become
#[derive(Debug)]
pub struct ConversionTask {
    pub id: String,
    /// Position of the source in the user's input order
    pub index: usize,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    status: TaskStatus,
    error: Option<TaskError>,
}

impl ConversionTask {
    pub fn new(index: usize, source_path: PathBuf, destination_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            index,
            source_path,
            destination_path,
            status: TaskStatus::Pending,
            error: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }

    /// File name shown in logs and reports
    pub fn display_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.to_string_lossy().into_owned())
    }

    pub fn start(&mut self) {
        if self.status == TaskStatus::Pending {
            self.status = TaskStatus::Converting;
        }
    }

    pub fn succeed(&mut self) {
        self.finish(TaskStatus::Succeeded, None);
    }

    pub fn succeed_via_retry(&mut self) {
        self.finish(TaskStatus::SucceededViaRetry, None);
    }

    pub fn fail(&mut self, error: TaskError) {
        self.finish(TaskStatus::Failed, Some(error));
    }

    fn finish(&mut self, status: TaskStatus, error: Option<TaskError>) {
        // Terminal tasks are frozen
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.error = error;
    }
}

/// A validated set of conversions plus the archive they end up in
#[derive(Debug)]
pub struct BatchJob {
    pub tasks: Vec<ConversionTask>,
    pub worker_limit: usize,
    pub password: Option<String>,
    pub archive_path: PathBuf,
    pub output_dir: PathBuf,
}

impl BatchJob {
    /// Validate the inputs and create one pending task per source
    pub fn new(
        sources: Vec<PathBuf>,
        worker_limit: usize,
        password: Option<String>,
        archive_path: PathBuf,
        output_dir: PathBuf,
    ) -> Result<Self, BatchError> {
        if sources.is_empty() {
            return Err(BatchError::EmptyInput);
        }

        if !(MIN_WORKERS..=MAX_WORKERS).contains(&worker_limit) {
            return Err(BatchError::InvalidWorkerLimit {
                got: worker_limit,
                min: MIN_WORKERS,
                max: MAX_WORKERS,
            });
        }

        if matches!(password.as_deref(), Some("")) {
            return Err(BatchError::EmptyPassword);
        }

        let names = pdf_file_names(&sources);
        let tasks = sources
            .into_iter()
            .zip(names)
            .enumerate()
            .map(|(index, (source, name))| {
                ConversionTask::new(index, source, output_dir.join(name))
            })
            .collect();

        Ok(Self {
            tasks,
            worker_limit,
            password,
            archive_path,
            output_dir,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Every task has reached a terminal status
    pub fn is_resolved(&self) -> bool {
        self.tasks.iter().all(|t| t.status().is_terminal())
    }

    /// PDFs of succeeded tasks, in input order
    pub fn successful_outputs(&self) -> Vec<PathBuf> {
        self.tasks
            .iter()
            .filter(|t| t.status().is_success())
            .map(|t| t.destination_path.clone())
            .collect()
    }
}

/// Flat PDF names for each source; colliding stems get " (2)", " (3)", ... in input order
pub fn pdf_file_names(sources: &[PathBuf]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();

    sources
        .iter()
        .map(|source| {
            let stem = stem_of(source);
            let key = stem.to_lowercase();
            let start = next_suffix.get(&key).copied().unwrap_or(1);
            let (n, name) = (start..)
                .map(|n| {
                    let name = if n == 1 {
                        format!("{stem}.pdf")
                    } else {
                        format!("{stem} ({n}).pdf")
                    };
                    (n, name)
                })
                .find(|(_, name)| used.insert(name.to_lowercase()))
                .unwrap_or_else(|| (start, format!("{stem}.pdf")));
            next_suffix.insert(key, n + 1);
            name
        })
        .collect()
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}
