//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::agent::{ChartAgent, ContentAgent};
use crate::service::ProposalManager;
use crate::store::ProposalRepository;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Proposal, section and image operations
    pub manager: ProposalManager,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ProposalRepository>,
        content: Arc<dyn ContentAgent>,
        charts: Arc<dyn ChartAgent>,
    ) -> Self {
        Self {
            manager: ProposalManager::new(store, content, charts),
        }
    }
}

/// Type alias for shared application state
pub type SharedState = Arc<AppState>;
