//! Background persistence writer.
//!
//! Mutations update the in-memory stores synchronously and hand their writes to
//! a [`WriterHandle`]. A single task drains the queue in submission order, so a
//! later write for the same key always lands after an earlier one. Failed writes
//! are retried a bounded number of times and then dropped with an error log; the
//! in-memory state stays authoritative for the rest of the session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::{mpsc, oneshot};

use crate::quests::errors::QuestError;
use crate::quests::storage::ProgressBackend;
use crate::quests::types::{ObjectiveEntry, ProgressEntry};

/// One persistence operation, applied verbatim to a [`ProgressBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    SaveProgress(ProgressEntry),
    SaveProgressBatch(Vec<ProgressEntry>),
    /// Storage key (`id:<id>` or `name:<name>`)
    DeleteProgress(String),
    ClearProgress,
    SaveObjective(ObjectiveEntry),
    DeleteObjective(String),
    ClearObjectives,
}

impl WriteOp {
    fn apply(&self, backend: &dyn ProgressBackend) -> Result<(), QuestError> {
        match self {
            WriteOp::SaveProgress(entry) => backend.save_progress(entry),
            WriteOp::SaveProgressBatch(entries) => backend.save_progress_batch(entries),
            WriteOp::DeleteProgress(key) => backend.delete_progress(key),
            WriteOp::ClearProgress => backend.clear_all(),
            WriteOp::SaveObjective(entry) => backend.save_objective(entry),
            WriteOp::DeleteObjective(key) => backend.delete_objective(key),
            WriteOp::ClearObjectives => backend.clear_objectives(),
        }
    }
}

/// Anything that accepts writes for asynchronous persistence.
pub trait ProgressSink: Send + Sync {
    fn submit(&self, op: WriteOp);
}

/// Sink that only remembers what it was given. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    ops: Mutex<Vec<WriteOp>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<WriteOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<WriteOp> {
        self.ops
            .lock()
            .map(|mut ops| std::mem::take(&mut *ops))
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingSink {
    fn submit(&self, op: WriteOp) {
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op);
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub applied: u64,
    pub retries: u64,
    pub dropped: u64,
}

enum WriterCommand {
    Apply(WriteOp),
    Flush(oneshot::Sender<()>),
    Snapshot(oneshot::Sender<WriterStats>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::UnboundedSender<WriterCommand>,
}

impl WriterHandle {
    /// Wait until every write submitted before this call has been attempted.
    pub async fn flush(&self) -> Result<(), QuestError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(WriterCommand::Flush(tx))
            .map_err(|_| QuestError::Internal("persistence writer stopped".into()))?;
        rx.await
            .map_err(|_| QuestError::Internal("persistence writer dropped flush".into()))
    }

    pub async fn snapshot(&self) -> Option<WriterStats> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(WriterCommand::Snapshot(tx)).is_ok() {
            rx.await.ok()
        } else {
            None
        }
    }

    /// Drain outstanding writes, then stop the task.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(WriterCommand::Shutdown(tx));
        let _ = rx.await;
    }
}

impl ProgressSink for WriterHandle {
    fn submit(&self, op: WriteOp) {
        if self.tx.send(WriterCommand::Apply(op)).is_err() {
            error!("persistence writer stopped; dropping write");
        }
    }
}

/// Spawn the writer task on the current tokio runtime.
pub fn start_writer(backend: Arc<dyn ProgressBackend>, cfg: WriterConfig) -> WriterHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<WriterCommand>();
    let handle = WriterHandle { tx };

    tokio::spawn(async move {
        let mut stats = WriterStats::default();
        let mut shutdown_ack = None;
        let max_attempts = cfg.max_attempts.max(1);
        while let Some(cmd) = rx.recv().await {
            match cmd {
                WriterCommand::Apply(op) => {
                    apply_with_retry(&backend, op, max_attempts, &cfg, &mut stats).await;
                }
                WriterCommand::Flush(done) => {
                    let _ = done.send(());
                }
                WriterCommand::Snapshot(resp) => {
                    let _ = resp.send(stats);
                }
                WriterCommand::Shutdown(done) => {
                    shutdown_ack = Some(done);
                    break;
                }
            }
        }
        debug!(
            "persistence writer terminated (applied={} retries={} dropped={})",
            stats.applied, stats.retries, stats.dropped
        );
        // Release the store before acknowledging so it can be reopened right away.
        drop(backend);
        if let Some(done) = shutdown_ack {
            let _ = done.send(());
        }
    });

    handle
}

async fn apply_with_retry(
    backend: &Arc<dyn ProgressBackend>,
    op: WriteOp,
    max_attempts: u32,
    cfg: &WriterConfig,
    stats: &mut WriterStats,
) {
    for attempt in 1..=max_attempts {
        let backend = Arc::clone(backend);
        let pending = op.clone();
        let result = tokio::task::spawn_blocking(move || pending.apply(backend.as_ref()))
            .await
            .map_err(|e| QuestError::Internal(format!("write task panicked: {}", e)))
            .and_then(|r| r);
        match result {
            Ok(()) => {
                stats.applied += 1;
                return;
            }
            Err(e) if attempt < max_attempts => {
                stats.retries += 1;
                warn!(
                    "persist attempt {}/{} failed: {} (op={:?})",
                    attempt, max_attempts, e, op
                );
                tokio::time::sleep(Duration::from_millis(cfg.retry_backoff_ms * attempt as u64))
                    .await;
            }
            Err(e) => {
                stats.dropped += 1;
                error!(
                    "dropping write after {} attempts: {} (op={:?})",
                    max_attempts, e, op
                );
            }
        }
    }
}
