//! Per-slot search state with "last request wins" sequencing

use crate::error::Result;
use crate::search::{SearchOrchestrator, SearchRequest, SearchResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Observable state of a search slot
#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    Searching {
        sequence: u64,
    },
    Success {
        sequence: u64,
        results: Vec<SearchResult>,
    },
    Failed {
        sequence: u64,
        message: String,
    },
}

/// What happened to one `search` call
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// This call was the latest; its results are now the session's results
    Completed(Vec<SearchResult>),
    /// A newer search or a clear started meanwhile; the answer was dropped
    Superseded { sequence: u64, latest: u64 },
}

/// A single search slot.
///
/// Every call gets a sequence number. Only the call holding the latest
/// number may write the outcome; older answers are discarded whether they
/// succeeded or failed. Network calls are never aborted.
pub struct SearchSession {
    id: Uuid,
    orchestrator: Arc<SearchOrchestrator>,
    sequence: AtomicU64,
    state: RwLock<SearchState>,
}

impl SearchSession {
    pub fn new(orchestrator: Arc<SearchOrchestrator>) -> Self {
        Self {
            id: Uuid::new_v4(),
            orchestrator,
            sequence: AtomicU64::new(0),
            state: RwLock::new(SearchState::Idle),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sequence number of the most recently issued search or clear
    pub fn latest_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Run a search in this slot.
    ///
    /// Errors are returned only when this call is still the latest; the
    /// session is then `Failed` with no results.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        // Allocate under the lock so state writes follow sequence order
        let sequence = {
            let mut state = self.state.write().await;
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            *state = SearchState::Searching { sequence };
            sequence
        };

        tracing::debug!("Session {} started search #{}", self.id, sequence);

        let outcome = self.orchestrator.search(request).await;

        let mut state = self.state.write().await;
        let latest = self.latest_sequence();
        if sequence != latest {
            tracing::warn!(
                "Session {} discarded stale response #{} (latest #{})",
                self.id,
                sequence,
                latest
            );
            return Ok(SearchOutcome::Superseded { sequence, latest });
        }

        match outcome {
            Ok(results) => {
                *state = SearchState::Success {
                    sequence,
                    results: results.clone(),
                };
                Ok(SearchOutcome::Completed(results))
            }
            Err(e) => {
                tracing::warn!("Session {} search #{} failed: {}", self.id, sequence, e);
                *state = SearchState::Failed {
                    sequence,
                    message: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Return to `Idle`. Any in-flight answer becomes stale.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        self.sequence.fetch_add(1, Ordering::SeqCst);
        *state = SearchState::Idle;
    }

    pub async fn state(&self) -> SearchState {
        self.state.read().await.clone()
    }

    /// Current results; empty unless the last search succeeded
    pub async fn results(&self) -> Vec<SearchResult> {
        match &*self.state.read().await {
            SearchState::Success { results, .. } => results.clone(),
            _ => Vec::new(),
        }
    }

    pub async fn is_loading(&self) -> bool {
        matches!(*self.state.read().await, SearchState::Searching { .. })
    }

    /// Error message of the last search, if it failed
    pub async fn error(&self) -> Option<String> {
        match &*self.state.read().await {
            SearchState::Failed { message, .. } => Some(message.clone()),
            _ => None,
        }
    }
}
