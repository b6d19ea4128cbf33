//! Cancellable reindex progress polling

use crate::client::IndexingBackend;
use crate::indexing::ReindexProgress;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Latest observation published by the poller
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// Started, no progress received yet
    Pending,
    Progress(ReindexProgress),
    /// Server reported `completed` or `failed`
    Finished(ReindexProgress),
    /// A progress request failed; polling ended
    Errored(String),
    /// `stop` was called
    Stopped,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollState::Finished(_) | PollState::Errored(_) | PollState::Stopped
        )
    }

    pub fn progress(&self) -> Option<&ReindexProgress> {
        match self {
            PollState::Progress(progress) | PollState::Finished(progress) => Some(progress),
            _ => None,
        }
    }
}

/// Polls `/index/progress` on a fixed interval until the reindex reaches a
/// terminal status, a poll fails, or `stop` is called.
///
/// The first request goes out one interval after `start`. Dropping the
/// poller aborts the task.
pub struct ReindexPoller {
    backend: Arc<dyn IndexingBackend>,
    interval: Duration,
    state_rx: watch::Receiver<PollState>,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl ReindexPoller {
    pub fn new(backend: Arc<dyn IndexingBackend>, interval: Duration) -> Self {
        let (_, state_rx) = watch::channel(PollState::Pending);
        Self {
            backend,
            interval,
            state_rx,
            stop_tx: None,
            handle: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Begin polling. A poller that is already running is stopped first.
    pub async fn start(&mut self) {
        if self.is_running() {
            self.stop().await;
        }

        let (state_tx, state_rx) = watch::channel(PollState::Pending);
        let (stop_tx, stop_rx) = watch::channel(false);

        let backend = self.backend.clone();
        let interval = self.interval;
        self.handle = Some(tokio::spawn(async move {
            poll_worker(backend, interval, state_tx, stop_rx).await;
        }));
        self.state_rx = state_rx;
        self.stop_tx = Some(stop_tx);

        tracing::debug!("Reindex poller started ({:?} interval)", self.interval);
    }

    /// Stop polling and wait for the task to exit.
    ///
    /// A poller that already finished keeps its terminal state.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The worker may have exited already
            let _ = stop_tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// Wait until polling reaches a terminal state and return it.
    ///
    /// Returns the current state immediately if the poller was never started.
    pub async fn wait(&self) -> PollState {
        let mut rx = self.state_rx.clone();
        let outcome = rx.wait_for(PollState::is_terminal).await.map(|s| s.clone());
        match outcome {
            Ok(state) => state,
            Err(_) => rx.borrow().clone(),
        }
    }

    pub fn state(&self) -> PollState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for ReindexPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn poll_worker(
    backend: Arc<dyn IndexingBackend>,
    interval: Duration,
    state_tx: watch::Sender<PollState>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    let mut polls = 0u64;

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    tracing::debug!("Reindex poller stopped after {} polls", polls);
                    state_tx.send_replace(PollState::Stopped);
                    break;
                }
            }

            _ = ticker.tick() => {
                polls += 1;
                match backend.get_reindex_progress().await {
                    Ok(progress) if progress.is_terminal() => {
                        tracing::info!(
                            "Reindex {}: {}/{} processed, {} errors",
                            progress.status,
                            progress.processed,
                            progress.total,
                            progress.errors.len()
                        );
                        state_tx.send_replace(PollState::Finished(progress));
                        break;
                    }
                    Ok(progress) => {
                        tracing::debug!(
                            "Reindex progress {:.1}% ({}/{})",
                            progress.percentage,
                            progress.processed,
                            progress.total
                        );
                        state_tx.send_replace(PollState::Progress(progress));
                    }
                    Err(e) => {
                        tracing::error!("Progress polling error: {}", e);
                        state_tx.send_replace(PollState::Errored(e.to_string()));
                        break;
                    }
                }
            }
        }
    }
}
