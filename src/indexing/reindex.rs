use crate::client::{Acknowledgement, IndexingBackend};
use crate::error::{LensError, Result};
use crate::indexing::{
    PollState, ReindexParams, ReindexPoller, ReindexProgress, ReindexState, ReindexStatus,
};
use std::sync::Arc;
use std::time::Duration;

/// Where a reindex run stands from the caller's side
#[derive(Debug, Clone, PartialEq)]
pub enum ReindexPhase {
    Idle,
    Starting,
    Polling,
    Completed(ReindexProgress),
    Failed(String),
    Stopped,
}

impl ReindexPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, ReindexPhase::Starting | ReindexPhase::Polling)
    }
}

/// Starts a reindex and follows it to completion
pub struct ReindexSession {
    backend: Arc<dyn IndexingBackend>,
    poller: ReindexPoller,
    phase: ReindexPhase,
    status: Option<ReindexStatus>,
}

impl ReindexSession {
    pub fn new(backend: Arc<dyn IndexingBackend>, poll_interval: Duration) -> Self {
        Self {
            poller: ReindexPoller::new(backend.clone(), poll_interval),
            backend,
            phase: ReindexPhase::Idle,
            status: None,
        }
    }

    /// Request a reindex and begin polling its progress
    pub async fn start(&mut self, params: &ReindexParams) -> Result<ReindexStatus> {
        // A run that finished without anyone waiting on it no longer blocks a new one
        if self.phase == ReindexPhase::Polling {
            let state = self.poller.state();
            self.settle(state);
        }
        if self.phase.is_active() {
            return Err(LensError::Indexing(
                "a reindex is already in progress".to_string(),
            ));
        }

        self.phase = ReindexPhase::Starting;
        tracing::info!("Starting reindex");

        let status = match self.backend.start_reindex(params).await {
            Ok(status) => status,
            Err(e) => {
                self.phase = ReindexPhase::Failed(e.to_string());
                return Err(e);
            }
        };

        if !status.success || status.status == ReindexState::Failed {
            let message = status
                .message
                .clone()
                .unwrap_or_else(|| "Reindex failed".to_string());
            self.phase = ReindexPhase::Failed(message.clone());
            self.status = Some(status);
            return Err(LensError::Indexing(message));
        }

        self.status = Some(status.clone());
        self.phase = ReindexPhase::Polling;
        self.poller.start().await;

        Ok(status)
    }

    /// Block until polling ends and settle the phase
    pub async fn wait(&mut self) -> ReindexPhase {
        if self.phase == ReindexPhase::Polling {
            let state = self.poller.wait().await;
            self.settle(state);
        }
        self.phase.clone()
    }

    /// Stop following progress. The server-side reindex is not cancelled.
    pub async fn stop(&mut self) {
        self.poller.stop().await;
        if self.phase == ReindexPhase::Polling {
            let state = self.poller.state();
            self.settle(state);
        }
    }

    /// Clear the remote index and forget local status
    pub async fn clear_index(&mut self) -> Result<Acknowledgement> {
        let ack = self.backend.clear_index().await?;
        self.status = None;
        if !self.phase.is_active() {
            self.phase = ReindexPhase::Idle;
        }
        tracing::info!("Index cleared");
        Ok(ack)
    }

    pub async fn refresh_status(&mut self) -> Result<ReindexStatus> {
        let status = self.backend.get_index_status().await?;
        self.status = Some(status.clone());
        Ok(status)
    }

    pub fn phase(&self) -> &ReindexPhase {
        &self.phase
    }

    pub fn status(&self) -> Option<&ReindexStatus> {
        self.status.as_ref()
    }

    pub fn progress(&self) -> Option<ReindexProgress> {
        self.poller.state().progress().cloned()
    }

    pub fn poller(&self) -> &ReindexPoller {
        &self.poller
    }

    fn settle(&mut self, state: PollState) {
        self.phase = match state {
            PollState::Finished(progress) if progress.status == ReindexState::Failed => {
                ReindexPhase::Failed("Reindexing failed".to_string())
            }
            PollState::Finished(progress) => ReindexPhase::Completed(progress),
            PollState::Errored(message) => ReindexPhase::Failed(message),
            PollState::Stopped => ReindexPhase::Stopped,
            PollState::Pending | PollState::Progress(_) => return,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::BatchIndexParams;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts or refuses the reindex, then reports progress until `finish_after` polls
    struct FakeIndexer {
        accept: bool,
        finish_after: usize,
        final_state: ReindexState,
        polls: AtomicUsize,
        clears: AtomicUsize,
    }

    impl FakeIndexer {
        fn new(accept: bool, finish_after: usize, final_state: ReindexState) -> Self {
            Self {
                accept,
                finish_after,
                final_state,
                polls: AtomicUsize::new(0),
                clears: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IndexingBackend for FakeIndexer {
        async fn start_reindex(&self, _params: &ReindexParams) -> Result<ReindexStatus> {
            Ok(ReindexStatus {
                success: self.accept,
                status: if self.accept {
                    ReindexState::Running
                } else {
                    ReindexState::Failed
                },
                message: (!self.accept).then(|| "stack not configured".to_string()),
                index_stats: None,
                stack_api_key: Some("blt_stack".to_string()),
            })
        }

        async fn get_reindex_progress(&self) -> Result<ReindexProgress> {
            let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            let status = if poll >= self.finish_after {
                self.final_state
            } else {
                ReindexState::Running
            };
            Ok(ReindexProgress {
                status,
                processed: poll as u64,
                total: self.finish_after as u64,
                percentage: 100.0 * poll as f64 / self.finish_after as f64,
                current_content_type: Some("article".to_string()),
                errors: Vec::new(),
                duration: None,
            })
        }

        async fn get_index_status(&self) -> Result<ReindexStatus> {
            Ok(ReindexStatus {
                success: true,
                status: ReindexState::Idle,
                message: None,
                index_stats: None,
                stack_api_key: None,
            })
        }

        async fn clear_index(&self) -> Result<Acknowledgement> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            Ok(Acknowledgement {
                success: true,
                message: Some("cleared".to_string()),
            })
        }

        async fn batch_index(&self, _params: &BatchIndexParams) -> Result<Acknowledgement> {
            Err(LensError::Indexing("unused".to_string()))
        }
    }

    const TICK: Duration = Duration::from_millis(15);

    #[tokio::test]
    async fn test_runs_to_completion() {
        let backend = Arc::new(FakeIndexer::new(true, 3, ReindexState::Completed));
        let mut session = ReindexSession::new(backend, TICK);
        assert_eq!(session.phase(), &ReindexPhase::Idle);

        let status = session.start(&ReindexParams::default()).await.unwrap();
        assert_eq!(status.status, ReindexState::Running);
        assert_eq!(session.phase(), &ReindexPhase::Polling);

        let phase = session.wait().await;
        assert!(matches!(phase, ReindexPhase::Completed(ref p) if p.processed == 3));
        assert_eq!(session.progress().map(|p| p.processed), Some(3));
    }

    #[tokio::test]
    async fn test_server_failure_is_reported() {
        let backend = Arc::new(FakeIndexer::new(true, 2, ReindexState::Failed));
        let mut session = ReindexSession::new(backend, TICK);

        session.start(&ReindexParams::default()).await.unwrap();
        assert_eq!(
            session.wait().await,
            ReindexPhase::Failed("Reindexing failed".to_string())
        );
    }

    #[tokio::test]
    async fn test_refused_start_never_polls() {
        let backend = Arc::new(FakeIndexer::new(false, 1, ReindexState::Completed));
        let mut session = ReindexSession::new(backend.clone(), TICK);

        let err = session.start(&ReindexParams::default()).await.unwrap_err();
        assert!(err.to_string().contains("stack not configured"));
        assert!(matches!(session.phase(), ReindexPhase::Failed(_)));

        tokio::time::sleep(TICK * 3).await;
        assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_and_double_start() {
        let backend = Arc::new(FakeIndexer::new(true, 1000, ReindexState::Completed));
        let mut session = ReindexSession::new(backend, TICK);

        session.start(&ReindexParams::default()).await.unwrap();
        assert!(matches!(
            session.start(&ReindexParams::default()).await,
            Err(LensError::Indexing(_))
        ));

        tokio::time::sleep(TICK * 3).await;
        session.stop().await;
        assert_eq!(session.phase(), &ReindexPhase::Stopped);
        assert!(!session.poller().is_running());
    }

    #[tokio::test]
    async fn test_restart_after_unobserved_completion() {
        let backend = Arc::new(FakeIndexer::new(true, 1, ReindexState::Completed));
        let mut session = ReindexSession::new(backend.clone(), TICK);

        session.start(&ReindexParams::default()).await.unwrap();
        tokio::time::sleep(TICK * 4).await;
        assert!(!session.poller().is_running());

        session.start(&ReindexParams::default()).await.unwrap();
        assert_eq!(session.phase(), &ReindexPhase::Polling);

        let phase = session.wait().await;
        assert!(matches!(phase, ReindexPhase::Completed(_)));
        assert_eq!(backend.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_forgets_status() {
        let backend = Arc::new(FakeIndexer::new(true, 1, ReindexState::Completed));
        let mut session = ReindexSession::new(backend.clone(), TICK);

        session.refresh_status().await.unwrap();
        assert!(session.status().is_some());

        let ack = session.clear_index().await.unwrap();
        assert!(ack.success);
        assert!(session.status().is_none());
        assert_eq!(backend.clears.load(Ordering::SeqCst), 1);
    }
}
