use tracing::{debug, info, warn};

use super::{Envelope, Task, TaskReceiver};

/// Background worker draining the task queue.
///
/// Mail delivery lives outside this crate; the processor records each task
/// it would hand to the mail backend.
pub struct TaskProcessor {
    receiver: TaskReceiver,
}

impl TaskProcessor {
    pub fn new(receiver: TaskReceiver) -> Self {
        Self { receiver }
    }

    /// Process tasks until every distributor has been dropped.
    /// Returns the number of tasks processed.
    pub async fn run(mut self) -> usize {
        let mut processed = 0;
        while let Some(envelope) = self.receiver.recv().await {
            process(&envelope);
            processed += 1;
        }
        info!(processed, "task processor stopped");
        processed
    }
}

fn process(envelope: &Envelope) {
    let process_in = envelope.opts.process_in;
    debug!(
        task = envelope.task.name(),
        queue = ?envelope.opts.queue,
        max_retry = envelope.opts.max_retry,
        enqueued_at = %envelope.enqueued_at,
        "picked up task"
    );
    match &envelope.task {
        Task::AccountCreatedEmail {
            username,
            account_id,
            currency,
            ..
        } => {
            info!(task = envelope.task.name(), %username, %account_id, %currency, ?process_in, "processed task");
        }
        Task::BalanceAddedEmail {
            username,
            account_id,
            added_balance,
            new_balance,
            ..
        } => {
            info!(task = envelope.task.name(), %username, %account_id, added_balance, new_balance, ?process_in, "processed task");
        }
        Task::VerifyEmail { username, email } => {
            if !email.contains('@') {
                warn!(%username, %email, "skipping verify email to malformed address");
                return;
            }
            info!(task = envelope.task.name(), %username, %email, ?process_in, "processed task");
        }
    }
}
