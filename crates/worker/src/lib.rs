//! Synthesis worker: engine residency, orchestrators, telemetry and the
//! claim loop. The binary in `main.rs` wires these to PostgreSQL; the API
//! embeds the same runner when started without a database.

pub mod config;
pub mod orchestrator;
pub mod residency;
pub mod retention;
pub mod runner;
pub mod telemetry;

use std::path::Path;
use std::sync::Arc;

use synthgate_pipeline::{HistogramEvaluator, MetadataAnalyzer, ReferenceEngineFactory};

pub use orchestrator::{JobError, Orchestrator};
pub use residency::{EngineCache, EngineError, EngineLease};
pub use runner::JobRunner;

/// Subject analyzer from `metadata_dir`, or the built-in default profile.
///
/// An unreadable directory is logged and falls back to the default.
pub fn load_analyzer(metadata_dir: Option<&Path>) -> MetadataAnalyzer {
    let Some(dir) = metadata_dir else {
        return MetadataAnalyzer::default();
    };
    match MetadataAnalyzer::from_dir(dir) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Metadata directory unreadable; using default profile");
            MetadataAnalyzer::default()
        }
    }
}

/// Orchestrator over the reference engines with a fresh engine cache.
pub fn reference_orchestrator(analyzer: Arc<MetadataAnalyzer>) -> Orchestrator {
    Orchestrator::new(
        Arc::new(EngineCache::new(Arc::new(ReferenceEngineFactory::new()))),
        analyzer,
        Arc::new(HistogramEvaluator::new()),
    )
}
