//! Admission gate guarding the single accelerator.
//!
//! One global lock key; the holder is the id of the job that owns the
//! hardware. The lock self-expires after its TTL so a crashed job cannot
//! block dispatch forever. Release is ownership-scoped; only the
//! administrative override deletes unconditionally.

use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::store::LockStore;
use crate::types::JobId;

/// Default lock key.
pub const DEFAULT_LOCK_KEY: &str = "synthgate:accelerator";

/// Default lock TTL: 15 minutes.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(900);

/// Admission gate over a [`LockStore`]. Cheap to clone.
#[derive(Clone)]
pub struct AdmissionGate {
    store: Arc<dyn LockStore>,
    key: Arc<str>,
    ttl: Duration,
}

impl AdmissionGate {
    pub fn new(store: Arc<dyn LockStore>, key: impl Into<Arc<str>>, ttl: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            ttl,
        }
    }

    /// Gate with the default key and TTL.
    pub fn with_defaults(store: Arc<dyn LockStore>) -> Self {
        Self::new(store, DEFAULT_LOCK_KEY, DEFAULT_LOCK_TTL)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Take the lock for `job_id`. `false` means the hardware is busy.
    pub async fn try_acquire(&self, job_id: JobId) -> Result<bool, StoreError> {
        let acquired = self
            .store
            .set_if_absent(&self.key, &job_id.to_string(), self.ttl)
            .await?;
        if acquired {
            tracing::debug!(%job_id, ttl_secs = self.ttl.as_secs(), "Accelerator lock acquired");
        } else {
            tracing::debug!(%job_id, "Accelerator lock busy");
        }
        Ok(acquired)
    }

    /// Release the lock if and only if `job_id` holds it.
    ///
    /// Returns `true` if a live lock owned by `job_id` was removed.
    pub async fn release(&self, job_id: JobId) -> Result<bool, StoreError> {
        let released = self
            .store
            .compare_and_delete(&self.key, &job_id.to_string())
            .await?;
        if released {
            tracing::info!(%job_id, "Accelerator lock released");
        }
        Ok(released)
    }

    pub async fn is_locked(&self) -> Result<bool, StoreError> {
        Ok(self.store.get(&self.key).await?.is_some())
    }

    /// Raw holder value of the live lock, if any.
    pub async fn holder(&self) -> Result<Option<String>, StoreError> {
        self.store.get(&self.key).await
    }

    /// Administrative override: delete the lock regardless of holder.
    pub async fn force_unlock(&self) -> Result<bool, StoreError> {
        let removed = self.store.delete(&self.key).await?;
        tracing::warn!(removed, "Accelerator lock force-released");
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLockStore;
    use crate::types::new_job_id;

    fn gate(ttl: Duration) -> AdmissionGate {
        AdmissionGate::new(Arc::new(MemoryLockStore::new()), "test-lock", ttl)
    }

    #[tokio::test]
    async fn second_acquire_is_rejected_while_held() {
        let gate = gate(DEFAULT_LOCK_TTL);
        let (a, b) = (new_job_id(), new_job_id());

        assert!(gate.try_acquire(a).await.unwrap());
        assert!(!gate.try_acquire(b).await.unwrap());
        assert_eq!(gate.holder().await.unwrap(), Some(a.to_string()));
    }

    #[tokio::test]
    async fn concurrent_acquires_admit_exactly_one() {
        let gate = gate(DEFAULT_LOCK_TTL);
        let mut handles = Vec::new();
        for _ in 0..32 {
            let gate = gate.clone();
            handles.push(tokio::spawn(
                async move { gate.try_acquire(new_job_id()).await },
            ));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn release_by_non_holder_is_a_no_op() {
        let gate = gate(DEFAULT_LOCK_TTL);
        let (owner, other) = (new_job_id(), new_job_id());
        gate.try_acquire(owner).await.unwrap();

        assert!(!gate.release(other).await.unwrap());
        assert!(gate.is_locked().await.unwrap());

        assert!(gate.release(owner).await.unwrap());
        assert!(!gate.is_locked().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_lock_can_be_taken_by_another_holder() {
        let ttl = Duration::from_secs(60);
        let gate = gate(ttl);
        let (first, second) = (new_job_id(), new_job_id());
        assert!(gate.try_acquire(first).await.unwrap());

        tokio::time::advance(ttl - Duration::from_millis(1)).await;
        assert!(!gate.try_acquire(second).await.unwrap());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(gate.try_acquire(second).await.unwrap());
        assert_eq!(gate.holder().await.unwrap(), Some(second.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn former_holder_cannot_release_after_reacquisition() {
        let ttl = Duration::from_secs(10);
        let gate = gate(ttl);
        let (slow, fresh) = (new_job_id(), new_job_id());
        gate.try_acquire(slow).await.unwrap();

        tokio::time::advance(ttl).await;
        assert!(gate.try_acquire(fresh).await.unwrap());

        assert!(!gate.release(slow).await.unwrap());
        assert_eq!(gate.holder().await.unwrap(), Some(fresh.to_string()));
    }

    #[tokio::test]
    async fn force_unlock_ignores_holder() {
        let gate = gate(DEFAULT_LOCK_TTL);
        gate.try_acquire(new_job_id()).await.unwrap();

        assert!(gate.force_unlock().await.unwrap());
        assert!(!gate.is_locked().await.unwrap());
        assert!(!gate.force_unlock().await.unwrap());
    }
}
