//! Single-owner advisory locks over resources.
//!
//! Locking is application-level exclusion: it prevents a second logical
//! edit from starting, not a storage-level write. Every mutating entry
//! point (including restore) calls `assert_unlocked` first.

use std::sync::Arc;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{LockState, VersionRecord};

/// Tracks the lock flag on resources and enforces it before mutations.
#[derive(Clone)]
pub struct LockManager {
    repo: Arc<Repository>,
}

impl LockManager {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Lock a resource for `user_id`.
    ///
    /// Also records a LOCK_BASELINE version capturing the resource's state
    /// at the moment of locking; the two writes are one storage
    /// transaction, so a failed baseline aborts the acquisition. Returns
    /// the baseline version.
    pub async fn acquire(
        &self,
        resource_id: &str,
        user_id: &str,
    ) -> Result<VersionRecord, AppError> {
        let baseline = self.repo.acquire_lock(resource_id, user_id).await?;
        tracing::info!(
            "Resource {} locked by {} (baseline version {})",
            resource_id,
            user_id,
            baseline.version
        );
        Ok(baseline)
    }

    /// Release a lock. Fails with FORBIDDEN unless `user_id` is the lock
    /// owner; elevated-role overrides are the calling authorization
    /// layer's decision, not this component's.
    pub async fn release(&self, resource_id: &str, user_id: &str) -> Result<(), AppError> {
        self.repo.release_lock(resource_id, user_id).await?;
        tracing::info!("Resource {} unlocked by {}", resource_id, user_id);
        Ok(())
    }

    /// Guard for mutating operations: fails with LOCKED if the resource is
    /// currently held.
    pub async fn assert_unlocked(&self, resource_id: &str) -> Result<(), AppError> {
        let state = self.repo.get_lock_state(resource_id).await?;
        if state.is_locked {
            return Err(AppError::Locked(format!(
                "Resource {} is locked by {}",
                resource_id,
                state.locked_by_id.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(())
    }

    /// Current lock state of a resource.
    pub async fn lock_state(&self, resource_id: &str) -> Result<LockState, AppError> {
        self.repo.get_lock_state(resource_id).await
    }
}
