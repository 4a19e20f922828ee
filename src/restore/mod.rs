//! Restore orchestration: lock guard, tenant check, append, cache bust.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::TtlCache;
use crate::db::Repository;
use crate::errors::AppError;
use crate::lock::LockManager;
use crate::models::{ResourceType, VersionRecord};
use crate::versioning::VersionStore;

/// Result of a restore: which version was restored from and the new head
/// version that now carries its content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub restored_from_version: i64,
    pub new_version: i64,
    pub record: VersionRecord,
}

/// Sequences a restore across the lock manager, version store, and cache.
#[derive(Clone)]
pub struct RestoreOrchestrator {
    repo: Arc<Repository>,
    locks: Arc<LockManager>,
    versions: Arc<VersionStore>,
    cache: Arc<TtlCache>,
}

impl RestoreOrchestrator {
    pub fn new(
        repo: Arc<Repository>,
        locks: Arc<LockManager>,
        versions: Arc<VersionStore>,
        cache: Arc<TtlCache>,
    ) -> Self {
        Self {
            repo,
            locks,
            versions,
            cache,
        }
    }

    /// Restore a resource to the snapshot of `version_id`.
    ///
    /// Fails fast with LOCKED while the resource is held. The version id
    /// must belong to the claimed (type, id, workspace) tuple; a version
    /// from another tenant or resource is NOT_FOUND, never restored.
    pub async fn restore(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        version_id: &str,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<RestoreOutcome, AppError> {
        self.locks.assert_unlocked(resource_id).await?;

        let target = self
            .repo
            .find_version_by_id(version_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Version {} not found", version_id)))?;
        if target.resource_type != resource_type
            || target.resource_id != resource_id
            || target.workspace_id != workspace_id
        {
            return Err(AppError::NotFound(format!(
                "Version {} not found",
                version_id
            )));
        }

        let record = self.versions.restore_version(version_id, user_id).await?;

        let prefix = format!("{}:{}", resource_type.cache_prefix(), workspace_id);
        self.cache.invalidate(&prefix);

        tracing::info!(
            "Restored {} {} from version {} as version {}",
            resource_type.as_str(),
            resource_id,
            target.version,
            record.version
        );

        Ok(RestoreOutcome {
            restored_from_version: target.version,
            new_version: record.version,
            record,
        })
    }
}
