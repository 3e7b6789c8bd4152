//! Engine factory wiring the reference capabilities.

use synthgate_core::capability::{CapabilityError, Engine, EngineFactory};
use synthgate_core::job::JobKind;

use crate::animator::ReferenceAnimator;
use crate::generator::ReferenceGenerator;

#[derive(Debug, Default)]
pub struct ReferenceEngineFactory;

impl ReferenceEngineFactory {
    pub fn new() -> Self {
        Self
    }
}

impl EngineFactory for ReferenceEngineFactory {
    fn build(&self, kind: JobKind) -> Result<Engine, CapabilityError> {
        tracing::info!(%kind, "Building engine");
        Ok(match kind {
            JobKind::Static => Engine::Static(Box::new(ReferenceGenerator::new())),
            JobKind::Temporal => Engine::Temporal(Box::new(ReferenceAnimator::new())),
        })
    }

    fn reclaim(&self) {
        // Reference engines hold host memory only; dropping them is enough.
        tracing::debug!("Engine memory reclaimed");
    }
}
