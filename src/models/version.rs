//! Version history models.
//!
//! A version is an immutable record of a resource snapshot plus the
//! field-level diff against its predecessor. Sequences are per
//! (resourceType, resourceId), start at 1 and have no gaps.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The versioned state of a resource at one point in time: field name to
/// JSON value. Values are limited to what JSON can express (strings,
/// numbers, booleans, null, nested objects, arrays).
pub type Snapshot = serde_json::Map<String, Value>;

/// Field-level changes between two consecutive snapshots, keyed by field
/// name. Only changed fields appear.
pub type DiffMap = BTreeMap<String, FieldChange>;

/// Kind of domain entity a version belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Persona,
    BrandAsset,
    Product,
    Strategy,
    Styleguide,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Persona => "PERSONA",
            ResourceType::BrandAsset => "BRAND_ASSET",
            ResourceType::Product => "PRODUCT",
            ResourceType::Strategy => "STRATEGY",
            ResourceType::Styleguide => "STYLEGUIDE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PERSONA" => Some(ResourceType::Persona),
            "BRAND_ASSET" => Some(ResourceType::BrandAsset),
            "PRODUCT" => Some(ResourceType::Product),
            "STRATEGY" => Some(ResourceType::Strategy),
            "STYLEGUIDE" => Some(ResourceType::Styleguide),
            _ => None,
        }
    }

    /// Leading segment of cache keys derived from this resource type.
    /// Read caches are keyed `prefix:workspaceId:...`.
    pub fn cache_prefix(&self) -> &'static str {
        match self {
            ResourceType::Persona => "personas",
            ResourceType::BrandAsset => "brand-assets",
            ResourceType::Product => "products",
            ResourceType::Strategy => "strategies",
            ResourceType::Styleguide => "styleguides",
        }
    }
}

/// Why a version was written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// An explicit save by an editor.
    ManualSave,
    /// Snapshot captured at the moment a resource became locked, so the
    /// pre-lock state is always recoverable.
    LockBaseline,
    /// Written when a resource is rolled back to a prior snapshot.
    Restore,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::ManualSave => "MANUAL_SAVE",
            ChangeType::LockBaseline => "LOCK_BASELINE",
            ChangeType::Restore => "RESTORE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MANUAL_SAVE" => Some(ChangeType::ManualSave),
            "LOCK_BASELINE" => Some(ChangeType::LockBaseline),
            "RESTORE" => Some(ChangeType::Restore),
            _ => None,
        }
    }
}

/// One changed field: the value before and after.
///
/// `None` means the field was absent on that side, which is distinct from
/// the field holding a JSON null. `deserialize_present` keeps an explicit
/// null from collapsing into `None` on the way back in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub from: Option<Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub to: Option<Value>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// An immutable version record. Never edited or deleted after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub id: String,
    pub resource_type: ResourceType,
    pub resource_id: String,
    /// Strictly increasing per resource, starting at 1.
    pub version: i64,
    pub snapshot: Snapshot,
    /// Changes versus the immediately preceding version; `None` for
    /// version 1.
    pub diff: Option<DiffMap>,
    pub change_type: ChangeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_note: Option<String>,
    pub label: String,
    pub created_by: String,
    pub workspace_id: String,
    pub created_at: String,
}

/// Parameters for appending a new version.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub snapshot: Snapshot,
    pub change_type: ChangeType,
    pub change_note: Option<String>,
    /// Defaults to `v{version}.0` when not supplied.
    pub label: Option<String>,
    pub created_by: String,
    pub workspace_id: String,
}
