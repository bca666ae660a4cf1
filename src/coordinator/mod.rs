use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::converter::Converter;
use crate::error::TaskError;
use crate::job::{BatchJob, ConversionTask};
use crate::progress::{CancelFlag, ProgressEvent, ProgressSender};
use crate::queue::TaskQueue;
use crate::retry::RetryPolicy;

/// What a finished batch run looked like
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub cancelled: bool,
}

/// Runs a batch through a bounded pool of workers sharing one task queue
pub struct Coordinator<P, A> {
    policy: Arc<RetryPolicy<P, A>>,
    cancel: CancelFlag,
    progress: Option<ProgressSender>,
}

impl<P: Converter, A: Converter> Coordinator<P, A> {
    pub fn new(primary: P, alternate: A, cancel: CancelFlag) -> Self {
        let policy = RetryPolicy::new(Arc::new(primary), Arc::new(alternate), cancel.clone());
        Self {
            policy: Arc::new(policy),
            cancel,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Convert every task of the batch; on return each task is terminal and in input order.
    ///
    /// Fails without dispatching anything when the output directory cannot be created.
    pub async fn run(&self, job: &mut BatchJob) -> std::io::Result<RunSummary> {
        let total = job.tasks.len();
        let workers = job.worker_limit.min(total).max(1);

        if let Err(e) = tokio::fs::create_dir_all(&job.output_dir).await {
            error!("Could not create output directory {:?}: {}", job.output_dir, e);
            return Err(e);
        }

        info!("Converting {} file(s) with {} worker(s)...", total, workers);
        if !self.policy.alternate().is_available() {
            warn!(
                "Alternate converter '{}' is not available; failed files will not be retried",
                self.policy.alternate().name()
            );
        }
        self.emit(ProgressEvent::BatchStarted { total, workers });

        // Kept so a task lost with a dead worker can still be resolved
        let manifest: HashMap<usize, (PathBuf, PathBuf)> = job
            .tasks
            .iter()
            .map(|t| (t.index, (t.source_path.clone(), t.destination_path.clone())))
            .collect();

        let queue = Arc::new(TaskQueue::new(std::mem::take(&mut job.tasks)));

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                queue: Arc::clone(&queue),
                policy: Arc::clone(&self.policy),
                cancel: self.cancel.clone(),
                progress: self.progress.clone(),
            };
            pool.spawn(worker.run());
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!("Worker terminated abnormally: {}", e);
            }
        }

        let cancelled = self.cancel.is_cancelled();

        for mut task in queue.drain_pending() {
            debug!("Task #{} never dispatched", task.index);
            task.fail(TaskError::Cancelled);
            self.emit_finished(&task);
            queue.complete(task);
        }

        let mut tasks = queue.take_completed();
        recover_lost_tasks(&mut tasks, &manifest);

        let completed = tasks.len();
        job.tasks = tasks;

        if cancelled {
            warn!("🛑 Batch cancelled; undispatched files were marked as failed");
        }
        self.emit(ProgressEvent::BatchFinished {
            completed,
            cancelled,
        });

        Ok(RunSummary { total, cancelled })
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress.send(event);
        }
    }

    fn emit_finished(&self, task: &ConversionTask) {
        self.emit(ProgressEvent::TaskFinished {
            index: task.index,
            source: task.source_path.clone(),
            status: task.status(),
        });
    }
}

/// A single pool member pulling tasks until the queue is empty or the batch is cancelled
struct Worker<P, A> {
    id: usize,
    queue: Arc<TaskQueue>,
    policy: Arc<RetryPolicy<P, A>>,
    cancel: CancelFlag,
    progress: Option<ProgressSender>,
}

impl<P: Converter, A: Converter> Worker<P, A> {
    async fn run(self) {
        debug!("Worker {} started", self.id);
        loop {
            if self.cancel.is_cancelled() {
                debug!("Worker {} stopping: batch cancelled", self.id);
                break;
            }

            let Some(mut task) = self.queue.claim() else {
                break;
            };

            info!("➡️ [worker {}] {}", self.id, task.display_name());
            if let Some(progress) = &self.progress {
                progress.send(ProgressEvent::TaskStarted {
                    index: task.index,
                    source: task.source_path.clone(),
                });
            }

            self.policy.execute(&mut task).await;

            if let Some(progress) = &self.progress {
                progress.send(ProgressEvent::TaskFinished {
                    index: task.index,
                    source: task.source_path.clone(),
                    status: task.status(),
                });
            }
            self.queue.complete(task);
        }
        debug!("Worker {} finished", self.id);
    }
}

/// Fail tasks that never came back from their worker.
///
/// Only reachable when panics unwind: release builds use `panic = "abort"`,
/// so a panicking worker ends the process there.
fn recover_lost_tasks(
    tasks: &mut Vec<ConversionTask>,
    manifest: &HashMap<usize, (PathBuf, PathBuf)>,
) {
    if tasks.len() == manifest.len() {
        return;
    }

    let mut lost: Vec<usize> = manifest
        .keys()
        .copied()
        .filter(|index| !tasks.iter().any(|t| t.index == *index))
        .collect();
    lost.sort_unstable();

    for index in lost {
        let (source, destination) = manifest[&index].clone();
        error!("Task #{} was lost with its worker: {:?}", index, source);
        let mut task = ConversionTask::new(index, source, destination);
        task.fail(TaskError::WorkerLost);
        tasks.push(task);
    }
    tasks.sort_by_key(|t| t.index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::fake::FakeConverter;
    use crate::job::TaskStatus;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn make_job(dir: &Path, names: &[&str], workers: usize) -> BatchJob {
        let sources = names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, "docx").unwrap();
                path
            })
            .collect();
        BatchJob::new(
            sources,
            workers,
            None,
            dir.join("out.zip"),
            dir.join("pdfs"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_totals_for_every_worker_limit() {
        let names: Vec<String> = (0..10).map(|i| format!("doc{i}.docx")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        for workers in 1..=16 {
            let temp_dir = TempDir::new().unwrap();
            let mut job = make_job(temp_dir.path(), &refs, workers);
            let coordinator = Coordinator::new(
                FakeConverter::failing_on(&["doc3.docx", "doc7.docx"]),
                FakeConverter::failing_on(&["doc7.docx"]),
                CancelFlag::new(),
            );

            let summary = coordinator.run(&mut job).await.unwrap();

            assert_eq!(summary.total, 10);
            assert!(job.is_resolved());
            let count = |s: TaskStatus| job.tasks.iter().filter(|t| t.status() == s).count();
            assert_eq!(count(TaskStatus::Succeeded), 8, "workers={workers}");
            assert_eq!(count(TaskStatus::SucceededViaRetry), 1);
            assert_eq!(count(TaskStatus::Failed), 1);
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let names: Vec<String> = (0..12).map(|i| format!("doc{i}.docx")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut job = make_job(temp_dir.path(), &refs, 3);

        let primary = FakeConverter::ok().with_delay(Duration::from_millis(20));
        let coordinator = Coordinator::new(primary, FakeConverter::ok(), CancelFlag::new());
        coordinator.run(&mut job).await.unwrap();

        let peak = coordinator.policy_primary_peak();
        assert!(peak <= 3, "peak concurrency {peak} exceeded the worker limit");
        assert!(job.tasks.iter().all(|t| t.status() == TaskStatus::Succeeded));
    }

    #[tokio::test]
    async fn test_tasks_returned_in_input_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut job = make_job(temp_dir.path(), &["c.docx", "a.docx", "b.docx"], 3);
        let coordinator = Coordinator::new(FakeConverter::ok(), FakeConverter::ok(), CancelFlag::new());

        coordinator.run(&mut job).await.unwrap();

        let order: Vec<usize> = job.tasks.iter().map(|t| t.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(job.tasks[0].destination_path, temp_dir.path().join("pdfs/c.pdf"));
    }

    #[tokio::test]
    async fn test_cancel_before_dispatch() {
        let temp_dir = TempDir::new().unwrap();
        let mut job = make_job(temp_dir.path(), &["a.docx", "b.docx"], 2);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let coordinator = Coordinator::new(FakeConverter::ok(), FakeConverter::ok(), cancel);
        let (tx, mut rx) = crate::progress::channel();
        let coordinator = coordinator.with_progress(tx);

        let summary = coordinator.run(&mut job).await.unwrap();

        assert!(summary.cancelled);
        assert!(job.is_resolved());
        assert!(job
            .tasks
            .iter()
            .all(|t| matches!(t.error(), Some(TaskError::Cancelled))));
        assert_eq!(coordinator.policy_primary_calls(), 0);

        let mut finished = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ProgressEvent::TaskFinished { .. }) {
                finished += 1;
            }
        }
        assert_eq!(finished, 2);
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_finishes_running_task() {
        let temp_dir = TempDir::new().unwrap();
        let mut job = make_job(temp_dir.path(), &["a.docx", "b.docx", "c.docx"], 1);
        let cancel = CancelFlag::new();
        let primary = FakeConverter::ok().with_delay(Duration::from_millis(100));
        let (tx, mut rx) = crate::progress::channel();
        let coordinator =
            Coordinator::new(primary, FakeConverter::ok(), cancel.clone()).with_progress(tx);

        let cancel_on_first_start = async {
            while let Some(event) = rx.recv().await {
                if matches!(event, ProgressEvent::TaskStarted { .. }) {
                    cancel.cancel();
                    break;
                }
            }
        };
        let (summary, ()) = tokio::join!(coordinator.run(&mut job), cancel_on_first_start);
        let summary = summary.unwrap();

        assert!(summary.cancelled);
        assert!(job.is_resolved());
        assert_eq!(job.tasks[0].status(), TaskStatus::Succeeded);
        for task in &job.tasks[1..] {
            assert_eq!(task.status(), TaskStatus::Failed);
            assert!(matches!(task.error(), Some(TaskError::Cancelled)));
        }
        assert_eq!(coordinator.policy_primary_calls(), 1);
    }

    #[tokio::test]
    async fn test_unusable_output_dir_fails_before_dispatch() {
        let temp_dir = TempDir::new().unwrap();
        let mut job = make_job(temp_dir.path(), &["a.docx"], 1);
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        job.output_dir = blocker.join("pdfs");
        let coordinator = Coordinator::new(FakeConverter::ok(), FakeConverter::ok(), CancelFlag::new());

        assert!(coordinator.run(&mut job).await.is_err());
        assert_eq!(coordinator.policy_primary_calls(), 0);
        assert_eq!(job.tasks[0].status(), TaskStatus::Pending);
    }

    #[test]
    fn test_recover_lost_tasks() {
        let mut manifest = HashMap::new();
        manifest.insert(0, (PathBuf::from("a.docx"), PathBuf::from("a.pdf")));
        manifest.insert(1, (PathBuf::from("b.docx"), PathBuf::from("b.pdf")));

        let mut done = ConversionTask::new(1, PathBuf::from("b.docx"), PathBuf::from("b.pdf"));
        done.succeed();
        let mut tasks = vec![done];

        recover_lost_tasks(&mut tasks, &manifest);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].index, 0);
        assert!(matches!(tasks[0].error(), Some(TaskError::WorkerLost)));
    }

    impl Coordinator<FakeConverter, FakeConverter> {
        fn policy_primary_peak(&self) -> usize {
            self.policy.primary().peak_concurrency()
        }

        fn policy_primary_calls(&self) -> usize {
            self.policy.primary().calls()
        }
    }
}
