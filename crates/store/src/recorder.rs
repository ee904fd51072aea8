//! Background download counter.
//!
//! Download redirects must not wait on the database. Handlers call
//! [`DownloadRecorder::record`], which enqueues the id and returns; a single
//! worker task drains the queue and applies increments in order.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{Repository, StoreError};

/// Default bound of the increment queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

enum Command {
    Increment(String),
    Flush(oneshot::Sender<()>),
}

/// Sends that found the queue full and are still waiting for room.
#[derive(Default)]
struct Deferred {
    pending: AtomicUsize,
    drained: Notify,
}

impl Deferred {
    fn finish(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.drained.notified();
            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Handle to the download counter worker. Cheap to clone.
#[derive(Clone)]
pub struct DownloadRecorder {
    tx: mpsc::Sender<Command>,
    deferred: Arc<Deferred>,
}

impl DownloadRecorder {
    /// Starts the worker on the current runtime.
    ///
    /// The worker exits once every handle has been dropped and the queue is
    /// drained.
    pub fn spawn(repo: Arc<Repository>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(repo, rx));
        let recorder = Self {
            tx,
            deferred: Arc::default(),
        };
        (recorder, handle)
    }

    /// Enqueues one download of `id` without waiting for it to be applied.
    ///
    /// A full queue never drops the increment; the send is retried on a
    /// detached task instead.
    pub fn record(&self, id: &str) {
        match self.tx.try_send(Command::Increment(id.to_string())) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                tracing::debug!(id, "download queue full, deferring increment");
                let tx = self.tx.clone();
                let deferred = Arc::clone(&self.deferred);
                deferred.pending.fetch_add(1, Ordering::AcqRel);
                tokio::spawn(async move {
                    if tx.send(cmd).await.is_err() {
                        tracing::warn!("download recorder stopped, increment lost");
                    }
                    deferred.finish();
                });
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(id, "download recorder stopped, increment lost");
            }
        }
    }

    /// Waits until every increment recorded before this call is applied,
    /// including ones still waiting for room in the queue.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.deferred.wait_idle().await;
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(done_tx))
            .await
            .map_err(|_| StoreError::RecorderStopped)?;
        done_rx.await.map_err(|_| StoreError::RecorderStopped)
    }
}

async fn run_worker(repo: Arc<Repository>, mut rx: mpsc::Receiver<Command>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Increment(id) => {
                let repo = Arc::clone(&repo);
                let result =
                    tokio::task::spawn_blocking(move || repo.increment_download(&id).map_err(|e| (id, e)))
                        .await;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err((id, e))) => {
                        tracing::warn!(id = %id, error = %e, "failed to record download");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "download increment task failed");
                    }
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("download recorder stopped");
}
