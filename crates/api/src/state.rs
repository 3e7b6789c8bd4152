use std::sync::Arc;

use synthgate_core::admission::AdmissionGate;
use synthgate_core::capability::SubjectAnalyzer;
use synthgate_core::store::JobStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Task queue and result backend.
    pub jobs: Arc<dyn JobStore>,
    /// Accelerator admission lock.
    pub gate: AdmissionGate,
    /// Subject analyzer behind `/analyze`.
    pub analyzer: Arc<dyn SubjectAnalyzer>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Which store backend is wired in (`postgres` or `memory`), for `/health`.
    pub store_backend: &'static str,
}
