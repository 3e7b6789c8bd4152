//! Engine residency cache.
//!
//! A worker process keeps at most one engine resident. [`EngineCache::ensure`]
//! hands out an [`EngineLease`] that holds the cache's critical section for
//! as long as the engine is in use, so no other thread can tear the engine
//! down or build a second one while a call is in flight.
//!
//! Switching kinds drops the resident engine, asks the factory to reclaim
//! device memory, and only then builds the replacement. A failed build
//! leaves the slot empty.

use std::sync::{Arc, Mutex, MutexGuard};

use synthgate_core::capability::{
    CapabilityError, Engine, EngineFactory, ImageGenerator, VideoAnimator,
};
use synthgate_core::job::JobKind;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Construction(#[from] CapabilityError),

    #[error("Resident engine is {actual}, expected {expected}")]
    KindMismatch { expected: JobKind, actual: JobKind },
}

/// Single-slot engine cache owned by one worker process.
pub struct EngineCache {
    factory: Arc<dyn EngineFactory>,
    slot: Mutex<Option<Engine>>,
}

impl EngineCache {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            slot: Mutex::new(None),
        }
    }

    /// Make an engine of `kind` resident and lease it.
    ///
    /// Blocks while another thread holds a lease.
    pub fn ensure(&self, kind: JobKind) -> Result<EngineLease<'_>, EngineError> {
        let mut slot = self.lock_slot();

        match slot.as_ref().map(Engine::kind) {
            Some(resident) if resident == kind => {
                tracing::debug!(%kind, "Engine cache hit");
                return Ok(EngineLease { slot });
            }
            Some(resident) => {
                tracing::info!(from = %resident, to = %kind, "Swapping resident engine");
                drop(slot.take());
                self.factory.reclaim();
            }
            None => {
                tracing::info!(%kind, "Cold engine start");
            }
        }

        let engine = self.factory.build(kind).inspect_err(|e| {
            tracing::error!(%kind, error = %e, "Engine construction failed");
        })?;
        *slot = Some(engine);
        Ok(EngineLease { slot })
    }

    /// Kind of the resident engine, if any.
    pub fn resident_kind(&self) -> Option<JobKind> {
        self.lock_slot().as_ref().map(Engine::kind)
    }

    /// A panic while leased may have left a half-used engine behind; it is
    /// discarded and memory reclaimed before the slot is reused.
    fn lock_slot(&self) -> MutexGuard<'_, Option<Engine>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Engine slot poisoned by a panic; discarding resident engine");
                let mut guard = poisoned.into_inner();
                drop(guard.take());
                self.factory.reclaim();
                self.slot.clear_poison();
                guard
            }
        }
    }
}

/// Exclusive access to the resident engine. Dropping it ends the critical
/// section.
pub struct EngineLease<'a> {
    slot: MutexGuard<'a, Option<Engine>>,
}

impl EngineLease<'_> {
    fn engine(&self) -> &Engine {
        // ensure() only hands out a lease after filling the slot.
        match self.slot.as_ref() {
            Some(engine) => engine,
            None => unreachable!("engine lease over an empty slot"),
        }
    }

    pub fn kind(&self) -> JobKind {
        self.engine().kind()
    }

    pub fn as_static(&self) -> Result<&dyn ImageGenerator, EngineError> {
        match self.engine() {
            Engine::Static(generator) => Ok(generator.as_ref()),
            other => Err(EngineError::KindMismatch {
                expected: JobKind::Static,
                actual: other.kind(),
            }),
        }
    }

    pub fn as_temporal(&self) -> Result<&dyn VideoAnimator, EngineError> {
        match self.engine() {
            Engine::Temporal(animator) => Ok(animator.as_ref()),
            other => Err(EngineError::KindMismatch {
                expected: JobKind::Temporal,
                actual: other.kind(),
            }),
        }
    }
}
