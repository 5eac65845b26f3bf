use crate::core_modules::mask::{MaskResult, mask_output_path, process_image};
use crate::core_modules::scanner::{ImageTask, WorkSet};
use crate::error::MaskError;
use futures::future::join_all;
use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// The per-image operation a worker runs.
pub type MaskFn = fn(&Path) -> MaskResult;

/// Number of workers for a batch: one per core, never more than there are
/// tasks, never fewer than one.
pub fn pool_size(cpu_cores: usize, task_count: usize) -> usize {
    cpu_cores.min(task_count).max(1)
}

/// Splits a work set into groups of tasks that write the same mask file.
///
/// Most groups hold a single task. Tasks in one group are sorted by path and
/// run one after another, so the mask left on disk is always the one from the
/// last path.
pub fn group_by_output(work_set: WorkSet) -> Vec<Vec<ImageTask>> {
    let mut groups: BTreeMap<PathBuf, Vec<ImageTask>> = BTreeMap::new();
    for task in work_set {
        let output = mask_output_path(task.path()).unwrap_or_else(|_| task.path().to_path_buf());
        groups.entry(output).or_default().push(task);
    }

    groups
        .into_values()
        .map(|mut group| {
            group.sort_by(|a, b| a.path().cmp(b.path()));
            group
        })
        .collect()
}

/// Tasks handed to one worker, run in order. One result per task.
pub struct MaskTask {
    pub image_tasks: Vec<ImageTask>,
    pub result_sender: oneshot::Sender<Vec<MaskResult>>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<MaskTask>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        Self::with_processor(worker_count, process_image)
    }

    pub fn with_processor(worker_count: usize, processor: MaskFn) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, task_receiver) = mpsc::unbounded_channel::<MaskTask>();

        // All workers pull from one queue, so an idle worker takes the next task.
        let shared_receiver = Arc::new(Mutex::new(task_receiver));

        let workers = (0..worker_count)
            .map(|worker_id| {
                let receiver = Arc::clone(&shared_receiver);

                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(task) = next else { break };

                        let mut results = Vec::with_capacity(task.image_tasks.len());
                        for image_task in task.image_tasks {
                            debug!(worker_id, "Dispatching {}", image_task.path().display());
                            results.push(Self::run_task(image_task, processor).await);
                        }

                        let _ = task.result_sender.send(results);
                    }
                })
            })
            .collect();

        Self {
            task_sender,
            workers,
        }
    }

    /// Runs one task on the blocking pool. A panic becomes a `Failure`.
    async fn run_task(image_task: ImageTask, processor: MaskFn) -> MaskResult {
        let path = image_task.into_path();
        let blocking_path = path.clone();

        match tokio::task::spawn_blocking(move || processor(&blocking_path)).await {
            Ok(result) => result,
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    join_error.to_string()
                };
                error!("Worker crashed while processing {}: {}", path.display(), message);

                MaskResult::Failure {
                    path: path.clone(),
                    reason: MaskError::WorkerPanicked { path, message },
                }
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Submits tasks to run in order on one worker and waits for their
    /// results. Always yields one result per task.
    pub async fn process_group(&self, image_tasks: Vec<ImageTask>) -> Vec<MaskResult> {
        let paths: Vec<PathBuf> = image_tasks.iter().map(|t| t.path().to_path_buf()).collect();
        let (result_sender, result_receiver) = oneshot::channel();

        let task = MaskTask {
            image_tasks,
            result_sender,
        };

        if self.task_sender.send(task).is_err() {
            return paths.into_iter().map(result_lost).collect();
        }

        result_receiver
            .await
            .unwrap_or_else(|_| paths.into_iter().map(result_lost).collect())
    }

    /// Submits one task and waits for its result.
    pub async fn process_image(&self, image_task: ImageTask) -> MaskResult {
        let path = image_task.path().to_path_buf();
        self.process_group(vec![image_task])
            .await
            .pop()
            .unwrap_or_else(|| result_lost(path))
    }

    /// Dispatches every group and returns once every task has answered.
    pub async fn process_groups(&self, groups: Vec<Vec<ImageTask>>) -> Vec<MaskResult> {
        join_all(groups.into_iter().map(|group| self.process_group(group)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Dispatches the whole work set and returns once every task has answered.
    pub async fn process_all(&self, work_set: WorkSet) -> Vec<MaskResult> {
        self.process_groups(group_by_output(work_set)).await
    }

    /// Closes the queue and waits for every worker to exit.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("Worker exited abnormally: {}", e);
            }
        }
    }
}

fn result_lost(path: PathBuf) -> MaskResult {
    error!("No result received for {}", path.display());
    MaskResult::Failure {
        path: path.clone(),
        reason: MaskError::ResultLost { path },
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
