use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::job::ConversionTask;

/// Shared pending/completed task lists for the worker pool
#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: Mutex<VecDeque<ConversionTask>>,
    completed: Mutex<Vec<ConversionTask>>,
}

impl TaskQueue {
    /// Create a queue holding the given tasks in dispatch order
    pub fn new(tasks: Vec<ConversionTask>) -> Self {
        Self {
            pending: Mutex::new(tasks.into()),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Take the next pending task; the caller owns it until it is completed
    pub fn claim(&self) -> Option<ConversionTask> {
        let mut task = lock(&self.pending).pop_front()?;
        task.start();
        debug!("Claimed task #{}: {}", task.index, task.display_name());
        Some(task)
    }

    /// Hand a resolved task back
    pub fn complete(&self, task: ConversionTask) {
        debug!(
            "Completed task #{} with status {:?}",
            task.index,
            task.status()
        );
        lock(&self.completed).push(task);
    }

    /// Remove every task that was never claimed
    pub fn drain_pending(&self) -> Vec<ConversionTask> {
        lock(&self.pending).drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn completed_count(&self) -> usize {
        lock(&self.completed).len()
    }

    /// Completed tasks restored to input order
    pub fn take_completed(&self) -> Vec<ConversionTask> {
        let mut tasks = std::mem::take(&mut *lock(&self.completed));
        tasks.sort_by_key(|t| t.index);
        tasks
    }
}

// A panicking worker must not wedge the rest of the pool
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::TaskStatus;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn tasks(n: usize) -> Vec<ConversionTask> {
        (0..n)
            .map(|i| {
                ConversionTask::new(
                    i,
                    PathBuf::from(format!("doc{i}.docx")),
                    PathBuf::from(format!("doc{i}.pdf")),
                )
            })
            .collect()
    }

    #[test]
    fn test_claim_in_order() {
        let queue = TaskQueue::new(tasks(3));
        let first = queue.claim().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.status(), TaskStatus::Converting);
        assert_eq!(queue.pending_count(), 2);
    }

    #[test]
    fn test_completed_restored_to_input_order() {
        let queue = TaskQueue::new(tasks(3));
        let a = queue.claim().unwrap();
        let b = queue.claim().unwrap();
        let c = queue.claim().unwrap();
        assert!(queue.claim().is_none());

        queue.complete(c);
        queue.complete(a);
        queue.complete(b);

        let order: Vec<usize> = queue.take_completed().iter().map(|t| t.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_no_task_claimed_twice() {
        let queue = Arc::new(TaskQueue::new(tasks(200)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(task) = queue.claim() {
                        seen.push(task.index);
                        queue.complete(task);
                    }
                    seen
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for index in handle.join().unwrap() {
                assert!(all.insert(index), "task {index} claimed twice");
            }
        }
        assert_eq!(all.len(), 200);
        assert_eq!(queue.completed_count(), 200);
    }

    #[test]
    fn test_drain_pending() {
        let queue = TaskQueue::new(tasks(4));
        let _claimed = queue.claim().unwrap();
        let drained = queue.drain_pending();
        assert_eq!(drained.len(), 3);
        assert!(drained.iter().all(|t| t.status() == TaskStatus::Pending));
        assert_eq!(queue.pending_count(), 0);
    }
}
