use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::info;

use super::{Task, TaskOptions};

/// Hands tasks to a background worker.
#[async_trait]
pub trait TaskDistributor: Send + Sync {
    async fn distribute_task(&self, task: Task, opts: TaskOptions) -> Result<()>;
}

/// A task waiting in the queue.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub task: Task,
    pub opts: TaskOptions,
    pub enqueued_at: DateTime<Utc>,
}

/// In-process distributor backed by a bounded tokio channel.
/// Enqueueing fails once the receiving side has been dropped.
#[derive(Clone)]
pub struct QueueDistributor {
    tx: mpsc::Sender<Envelope>,
}

/// Receiving side of the task queue.
pub struct TaskReceiver {
    rx: mpsc::Receiver<Envelope>,
}

impl TaskReceiver {
    /// Wait for the next task; `None` once every distributor is dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Take a task if one is ready, without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

/// Create a distributor/receiver pair holding up to `buffer` pending tasks.
pub fn task_queue(buffer: usize) -> (QueueDistributor, TaskReceiver) {
    let (tx, rx) = mpsc::channel(buffer);
    (QueueDistributor { tx }, TaskReceiver { rx })
}

#[async_trait]
impl TaskDistributor for QueueDistributor {
    async fn distribute_task(&self, task: Task, opts: TaskOptions) -> Result<()> {
        let payload = serde_json::to_string(&task).context("Failed to marshal task payload")?;
        let name = task.name();
        let queue = opts.queue;

        self.tx
            .send(Envelope {
                task,
                opts,
                enqueued_at: Utc::now(),
            })
            .await
            .map_err(|_| anyhow::anyhow!("Failed to enqueue task: queue closed"))?;

        info!(task = name, ?queue, %payload, "task enqueued");
        Ok(())
    }
}
