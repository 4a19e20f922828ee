//! Live resource models with embedded lock state.

use serde::{Deserialize, Serialize};

use super::{ResourceType, Snapshot};

/// Single-owner advisory lock state embedded in a resource record.
///
/// `locked_by_id` and `locked_at` are non-null exactly when `is_locked` is
/// true; the lock manager is the only writer of these fields.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub is_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_by_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<String>,
}

/// A live (current-state) resource row. Domain fields are an opaque JSON
/// map; which of them get versioned is decided by the resource registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub id: String,
    pub workspace_id: String,
    pub resource_type: ResourceType,
    pub fields: Snapshot,
    #[serde(flatten)]
    pub lock: LockState,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a new resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceRequest {
    pub workspace_id: String,
    pub resource_type: ResourceType,
    #[serde(default)]
    pub fields: Snapshot,
}
