//! Per-resource-type snapshot policy.
//!
//! Which fields of a resource are versioned, and which storage-managed
//! fields must never travel back into a live row on restore, are
//! configuration per resource type. The registry keeps that out of the
//! version store so adding a resource type means registering a handler,
//! not growing a switch statement.

use std::collections::HashMap;

use crate::errors::AppError;
use crate::models::{ResourceType, Snapshot};

/// Fields owned by the storage layer. Stripped from a snapshot before it is
/// applied to a live resource during restore.
pub const MANAGED_FIELDS: &[&str] = &[
    "id",
    "workspaceId",
    "createdAt",
    "updatedAt",
    "version",
    "isLocked",
    "lockedById",
    "lockedAt",
];

/// Snapshot policy for one resource type.
#[derive(Debug, Clone)]
pub struct ResourceTypeHandler {
    /// Domain fields captured into version snapshots, in capture order.
    pub versioned_fields: &'static [&'static str],
}

impl ResourceTypeHandler {
    /// Project the versioned fields out of a live resource's field map.
    /// Fields the resource does not currently carry are omitted, not
    /// recorded as null.
    pub fn build_snapshot(&self, fields: &Snapshot) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for name in self.versioned_fields {
            if let Some(value) = fields.get(*name) {
                snapshot.insert((*name).to_string(), value.clone());
            }
        }
        snapshot
    }
}

/// Registered handlers, one per resource type.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    handlers: HashMap<ResourceType, ResourceTypeHandler>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, resource_type: ResourceType, handler: ResourceTypeHandler) {
        self.handlers.insert(resource_type, handler);
    }

    pub fn handler(&self, resource_type: ResourceType) -> Result<&ResourceTypeHandler, AppError> {
        self.handlers.get(&resource_type).ok_or_else(|| {
            AppError::Internal(format!(
                "No snapshot handler registered for resource type {}",
                resource_type.as_str()
            ))
        })
    }

    /// Remove storage-managed fields from a snapshot, producing a clean
    /// update payload for restore.
    pub fn strip_managed(&self, snapshot: &Snapshot) -> Snapshot {
        snapshot
            .iter()
            .filter(|(key, _)| !MANAGED_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(
            ResourceType::Persona,
            ResourceTypeHandler {
                versioned_fields: &[
                    "name",
                    "description",
                    "demographics",
                    "goals",
                    "painPoints",
                    "tone",
                ],
            },
        );
        registry.register(
            ResourceType::BrandAsset,
            ResourceTypeHandler {
                versioned_fields: &["name", "assetType", "url", "tags", "notes"],
            },
        );
        registry.register(
            ResourceType::Product,
            ResourceTypeHandler {
                versioned_fields: &["name", "description", "category", "price", "features"],
            },
        );
        registry.register(
            ResourceType::Strategy,
            ResourceTypeHandler {
                versioned_fields: &["title", "objective", "pillars", "channels", "timeline"],
            },
        );
        registry.register(
            ResourceType::Styleguide,
            ResourceTypeHandler {
                versioned_fields: &["title", "colors", "typography", "logoUsage", "voice"],
            },
        );
        registry
    }
}
