use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::documents::DocumentLoader;
use crate::ranking::{Explainer, RankingOrchestrator};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub orchestrator: RankingOrchestrator,
    /// `Unavailable` when no LLM key is configured.
    pub explainer: Explainer,
    pub loader: DocumentLoader,
    /// Cancelled on shutdown; every request ranks under a child of it.
    pub shutdown: CancellationToken,
}
