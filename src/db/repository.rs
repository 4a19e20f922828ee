//! Storage collaborator for resources, lock state, and version history.
//!
//! All SQL lives here. Compound operations that must be a single logical
//! step (lock acquisition with its baseline version, restore with its
//! appended version) run inside one transaction.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::diff::compute_diff;
use crate::errors::AppError;
use crate::models::{
    ChangeType, CreateResourceRequest, LockState, NewVersion, ResourceRecord, ResourceType,
    Snapshot, VersionRecord,
};
use crate::registry::ResourceRegistry;

/// Database repository for all storage operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    registry: Arc<ResourceRegistry>,
    /// Serializes write transactions between in-process tasks, so the
    /// read-max + insert sequence never interleaves. The unique constraint
    /// on version numbers backstops writers outside this process.
    write_guard: Arc<tokio::sync::Mutex<()>>,
}

impl Repository {
    pub fn new(pool: SqlitePool, registry: Arc<ResourceRegistry>) -> Self {
        Self {
            pool,
            registry,
            write_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    // ==================== RESOURCE OPERATIONS ====================

    /// Create a new resource, unlocked.
    pub async fn create_resource(
        &self,
        request: &CreateResourceRequest,
    ) -> Result<ResourceRecord, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let fields_json = serde_json::to_string(&request.fields)?;

        sqlx::query(
            "INSERT INTO resources (id, workspace_id, resource_type, fields, is_locked, created_at, updated_at) VALUES (?, ?, ?, ?, 0, ?, ?)"
        )
        .bind(&id)
        .bind(&request.workspace_id)
        .bind(request.resource_type.as_str())
        .bind(&fields_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(ResourceRecord {
            id,
            workspace_id: request.workspace_id.clone(),
            resource_type: request.resource_type,
            fields: request.fields.clone(),
            lock: LockState::default(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a resource by ID.
    pub async fn get_resource(&self, id: &str) -> Result<Option<ResourceRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, workspace_id, resource_type, fields, is_locked, locked_by_id, locked_at, created_at, updated_at FROM resources WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(resource_from_row).transpose()
    }

    /// Get the lock state of a resource.
    pub async fn get_lock_state(&self, resource_id: &str) -> Result<LockState, AppError> {
        let row = sqlx::query(
            "SELECT is_locked, locked_by_id, locked_at FROM resources WHERE id = ?",
        )
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", resource_id)))?;

        let is_locked: i32 = row.get("is_locked");
        Ok(LockState {
            is_locked: is_locked != 0,
            locked_by_id: row.get("locked_by_id"),
            locked_at: row.get("locked_at"),
        })
    }

    /// Apply a partial update to a live resource's domain fields.
    pub async fn update_resource_fields(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        fields: &Snapshot,
    ) -> Result<ResourceRecord, AppError> {
        let _write = self.write_guard.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut resource = fetch_resource(&mut tx, resource_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", resource_id)))?;
        if resource.resource_type != resource_type {
            return Err(AppError::NotFound(format!(
                "Resource {} is not a {}",
                resource_id,
                resource_type.as_str()
            )));
        }

        for (key, value) in fields {
            resource.fields.insert(key.clone(), value.clone());
        }
        let now = Utc::now().to_rfc3339();
        let fields_json = serde_json::to_string(&resource.fields)?;

        sqlx::query("UPDATE resources SET fields = ?, updated_at = ? WHERE id = ?")
            .bind(&fields_json)
            .bind(&now)
            .bind(resource_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        resource.updated_at = now;
        Ok(resource)
    }

    // ==================== VERSION OPERATIONS ====================

    /// Get the most recent version for a resource, if any.
    pub async fn find_latest_version(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Option<VersionRecord>, AppError> {
        let mut conn = self.pool.acquire().await?;
        latest_version_for(&mut conn, resource_type, resource_id).await
    }

    /// Get a version by ID.
    pub async fn find_version_by_id(&self, id: &str) -> Result<Option<VersionRecord>, AppError> {
        let row = sqlx::query(
            "SELECT id, resource_type, resource_id, version, snapshot, diff, change_type, change_note, label, created_by, workspace_id, created_at FROM resource_versions WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(version_from_row).transpose()
    }

    /// List all versions of a resource, newest first.
    pub async fn list_versions(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> Result<Vec<VersionRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, resource_type, resource_id, version, snapshot, diff, change_type, change_note, label, created_by, workspace_id, created_at FROM resource_versions WHERE resource_type = ? AND resource_id = ? ORDER BY version DESC"
        )
        .bind(resource_type.as_str())
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(version_from_row).collect()
    }

    /// Append the next version for a resource.
    ///
    /// The read-max + insert sequence runs in one transaction; a racing
    /// writer that slips in the same number trips the unique constraint
    /// and surfaces as a retryable `Conflict`.
    pub async fn create_version(&self, new: &NewVersion) -> Result<VersionRecord, AppError> {
        let _write = self.write_guard.lock().await;
        let mut tx = self.pool.begin().await?;

        let latest = latest_version_for(&mut tx, new.resource_type, &new.resource_id).await?;
        let now = Utc::now().to_rfc3339();
        let record = next_version_record(new, latest.as_ref(), &now);

        insert_version_row(&mut tx, &record).await?;
        tx.commit().await?;

        Ok(record)
    }

    // ==================== LOCK OPERATIONS ====================

    /// Lock a resource for `user_id` and capture its baseline version.
    ///
    /// Both writes happen in one transaction: a failed baseline insert
    /// aborts the acquisition, so a resource is never left locked without
    /// a recoverable pre-lock snapshot.
    pub async fn acquire_lock(
        &self,
        resource_id: &str,
        user_id: &str,
    ) -> Result<VersionRecord, AppError> {
        let _write = self.write_guard.lock().await;
        let mut tx = self.pool.begin().await?;

        let resource = fetch_resource(&mut tx, resource_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", resource_id)))?;
        if resource.lock.is_locked {
            return Err(AppError::Locked(format!(
                "Resource {} is locked by {}",
                resource_id,
                resource.lock.locked_by_id.as_deref().unwrap_or("unknown")
            )));
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE resources SET is_locked = 1, locked_by_id = ?, locked_at = ? WHERE id = ? AND is_locked = 0"
        )
        .bind(user_id)
        .bind(&now)
        .bind(resource_id)
        .execute(&mut *tx)
        .await?;

        let handler = self.registry.handler(resource.resource_type)?;
        let snapshot = handler.build_snapshot(&resource.fields);

        let latest = latest_version_for(&mut tx, resource.resource_type, resource_id).await?;
        let new = NewVersion {
            resource_type: resource.resource_type,
            resource_id: resource_id.to_string(),
            snapshot,
            change_type: ChangeType::LockBaseline,
            change_note: Some(format!("Locked by {}", user_id)),
            label: None,
            created_by: user_id.to_string(),
            workspace_id: resource.workspace_id.clone(),
        };
        let record = next_version_record(&new, latest.as_ref(), &now);

        insert_version_row(&mut tx, &record).await?;
        tx.commit().await?;

        Ok(record)
    }

    /// Release a lock held by `user_id`. Only the locking user may unlock.
    pub async fn release_lock(&self, resource_id: &str, user_id: &str) -> Result<(), AppError> {
        let _write = self.write_guard.lock().await;
        let mut tx = self.pool.begin().await?;

        let resource = fetch_resource(&mut tx, resource_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", resource_id)))?;
        if !resource.lock.is_locked {
            return Err(AppError::Validation(format!(
                "Resource {} is not locked",
                resource_id
            )));
        }
        if resource.lock.locked_by_id.as_deref() != Some(user_id) {
            return Err(AppError::Forbidden(
                "Only the locking user may unlock this resource".to_string(),
            ));
        }

        sqlx::query(
            "UPDATE resources SET is_locked = 0, locked_by_id = NULL, locked_at = NULL WHERE id = ?"
        )
        .bind(resource_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== RESTORE OPERATIONS ====================

    /// Apply a target version's snapshot to the live resource and append
    /// the matching RESTORE version, in one transaction.
    pub async fn restore_to_version(
        &self,
        target: &VersionRecord,
        user_id: &str,
    ) -> Result<VersionRecord, AppError> {
        let _write = self.write_guard.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut resource = fetch_resource(&mut tx, &target.resource_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Resource {} not found", target.resource_id))
            })?;
        if resource.resource_type != target.resource_type {
            return Err(AppError::NotFound(format!(
                "Version {} does not belong to resource {}",
                target.id, target.resource_id
            )));
        }

        // Storage-managed fields never travel back into the live row.
        let payload = self.registry.strip_managed(&target.snapshot);
        for (key, value) in &payload {
            resource.fields.insert(key.clone(), value.clone());
        }

        let now = Utc::now().to_rfc3339();
        let fields_json = serde_json::to_string(&resource.fields)?;
        sqlx::query("UPDATE resources SET fields = ?, updated_at = ? WHERE id = ?")
            .bind(&fields_json)
            .bind(&now)
            .bind(&target.resource_id)
            .execute(&mut *tx)
            .await?;

        let latest = latest_version_for(&mut tx, target.resource_type, &target.resource_id).await?;
        let new = NewVersion {
            resource_type: target.resource_type,
            resource_id: target.resource_id.clone(),
            snapshot: target.snapshot.clone(),
            change_type: ChangeType::Restore,
            change_note: Some(format!("Restored from version {}", target.version)),
            label: None,
            created_by: user_id.to_string(),
            workspace_id: target.workspace_id.clone(),
        };
        let record = next_version_record(&new, latest.as_ref(), &now);

        insert_version_row(&mut tx, &record).await?;
        tx.commit().await?;

        Ok(record)
    }
}

// Helper functions for row conversion and shared query fragments

async fn fetch_resource(
    conn: &mut sqlx::SqliteConnection,
    resource_id: &str,
) -> Result<Option<ResourceRecord>, AppError> {
    let row = sqlx::query(
        "SELECT id, workspace_id, resource_type, fields, is_locked, locked_by_id, locked_at, created_at, updated_at FROM resources WHERE id = ?"
    )
    .bind(resource_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(resource_from_row).transpose()
}

async fn latest_version_for(
    conn: &mut sqlx::SqliteConnection,
    resource_type: ResourceType,
    resource_id: &str,
) -> Result<Option<VersionRecord>, AppError> {
    let row = sqlx::query(
        "SELECT id, resource_type, resource_id, version, snapshot, diff, change_type, change_note, label, created_by, workspace_id, created_at FROM resource_versions WHERE resource_type = ? AND resource_id = ? ORDER BY version DESC LIMIT 1"
    )
    .bind(resource_type.as_str())
    .bind(resource_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(version_from_row).transpose()
}

async fn insert_version_row(
    conn: &mut sqlx::SqliteConnection,
    record: &VersionRecord,
) -> Result<(), AppError> {
    let snapshot_json = serde_json::to_string(&record.snapshot)?;
    let diff_json = record
        .diff
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let result = sqlx::query(
        "INSERT INTO resource_versions (id, resource_type, resource_id, version, snapshot, diff, change_type, change_note, label, created_by, workspace_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&record.id)
    .bind(record.resource_type.as_str())
    .bind(&record.resource_id)
    .bind(record.version)
    .bind(&snapshot_json)
    .bind(&diff_json)
    .bind(record.change_type.as_str())
    .bind(&record.change_note)
    .bind(&record.label)
    .bind(&record.created_by)
    .bind(&record.workspace_id)
    .bind(&record.created_at)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AppError::Conflict {
            message: format!(
                "Version {} already exists for {} {}",
                record.version,
                record.resource_type.as_str(),
                record.resource_id
            ),
            current_version: record.version,
        }),
        Err(err) => Err(err.into()),
    }
}

/// Build the next version record: number max+1 (or 1), diff against the
/// predecessor's snapshot (or none), default label `v{N}.0`.
fn next_version_record(
    new: &NewVersion,
    latest: Option<&VersionRecord>,
    now: &str,
) -> VersionRecord {
    let (version, diff) = match latest {
        Some(prev) => (
            prev.version + 1,
            compute_diff(Some(&prev.snapshot), Some(&new.snapshot)),
        ),
        None => (1, None),
    };

    VersionRecord {
        id: uuid::Uuid::new_v4().to_string(),
        resource_type: new.resource_type,
        resource_id: new.resource_id.clone(),
        version,
        snapshot: new.snapshot.clone(),
        diff,
        change_type: new.change_type,
        change_note: new.change_note.clone(),
        label: new
            .label
            .clone()
            .unwrap_or_else(|| format!("v{}.0", version)),
        created_by: new.created_by.clone(),
        workspace_id: new.workspace_id.clone(),
        created_at: now.to_string(),
    }
}

fn resource_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ResourceRecord, AppError> {
    let type_str: String = row.get("resource_type");
    let resource_type = ResourceType::from_str(&type_str).ok_or_else(|| {
        AppError::Internal(format!("Unknown resource type in storage: {}", type_str))
    })?;
    let fields_str: String = row.get("fields");
    let is_locked: i32 = row.get("is_locked");

    Ok(ResourceRecord {
        id: row.get("id"),
        workspace_id: row.get("workspace_id"),
        resource_type,
        fields: serde_json::from_str(&fields_str)?,
        lock: LockState {
            is_locked: is_locked != 0,
            locked_by_id: row.get("locked_by_id"),
            locked_at: row.get("locked_at"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn version_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<VersionRecord, AppError> {
    let type_str: String = row.get("resource_type");
    let resource_type = ResourceType::from_str(&type_str).ok_or_else(|| {
        AppError::Internal(format!("Unknown resource type in storage: {}", type_str))
    })?;
    let change_str: String = row.get("change_type");
    let change_type = ChangeType::from_str(&change_str).ok_or_else(|| {
        AppError::Internal(format!("Unknown change type in storage: {}", change_str))
    })?;
    let snapshot_str: String = row.get("snapshot");
    let diff_str: Option<String> = row.get("diff");

    Ok(VersionRecord {
        id: row.get("id"),
        resource_type,
        resource_id: row.get("resource_id"),
        version: row.get("version"),
        snapshot: serde_json::from_str(&snapshot_str)?,
        diff: diff_str.as_deref().map(serde_json::from_str).transpose()?,
        change_type,
        change_note: row.get("change_note"),
        label: row.get("label"),
        created_by: row.get("created_by"),
        workspace_id: row.get("workspace_id"),
        created_at: row.get("created_at"),
    })
}
