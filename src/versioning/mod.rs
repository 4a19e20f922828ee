//! Version store: append-only history with bounded conflict retry.

use std::sync::Arc;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{NewVersion, ResourceType, VersionRecord};

/// Append and read version history for resources.
///
/// The repository makes each read-max + insert atomic; this layer retries
/// that sequence a bounded number of times when a concurrent writer wins
/// the race, then surfaces the conflict to the caller.
#[derive(Clone)]
pub struct VersionStore {
    repo: Arc<Repository>,
    retry_limit: u32,
}

impl VersionStore {
    pub fn new(repo: Arc<Repository>, retry_limit: u32) -> Self {
        Self {
            repo,
            retry_limit: retry_limit.max(1),
        }
    }

    /// Append the next version for a resource. Version numbers are
    /// allocated 1, 2, 3, ... per resource with no gaps; prior versions
    /// are never touched.
    pub async fn create_version(&self, new: &NewVersion) -> Result<VersionRecord, AppError> {
        let mut attempt = 0;
        loop {
            match self.repo.create_version(new).await {
                Err(AppError::Conflict { message, .. }) if attempt + 1 < self.retry_limit => {
                    attempt += 1;
                    tracing::warn!(
                        "Version insert collision for {} {} (attempt {}): {}",
                        new.resource_type.as_str(),
                        new.resource_id,
                        attempt,
                        message
                    );
                }
                Ok(record) => {
                    tracing::debug!(
                        "Created version {} for {} {} ({})",
                        record.version,
                        record.resource_type.as_str(),
                        record.resource_id,
                        record.change_type.as_str()
                    );
                    return Ok(record);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Roll a resource back to the snapshot of `version_id` by appending a
    /// new RESTORE version. History is never rewritten.
    pub async fn restore_version(
        &self,
        version_id: &str,
        user_id: &str,
    ) -> Result<VersionRecord, AppError> {
        let target = self
            .repo
            .find_version_by_id(version_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Version {} not found", version_id)))?;

        let mut attempt = 0;
        loop {
            match self.repo.restore_to_version(&target, user_id).await {
                Err(AppError::Conflict { message, .. }) if attempt + 1 < self.retry_limit => {
                    attempt += 1;
                    tracing::warn!(
                        "Restore insert collision for {} {} (attempt {}): {}",
                        target.resource_type.as_str(),
                        target.resource_id,
                        attempt,
                        message
                    );
                }
                other => return other,
            }
        }
    }

    /// List all versions of a resource, newest first.
    pub async fn list_versions(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Vec<VersionRecord>, AppError> {
        self.repo.list_versions(resource_type, resource_id).await
    }
}
