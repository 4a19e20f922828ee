//! BrandHub Versioning Core
//!
//! The resource versioning and lock coordination subsystem of the BrandHub
//! backend: collaborative editors exclusively lock a shared resource,
//! every save appends an immutable numbered version with a field-level
//! diff, and any prior snapshot can be restored by appending a new version
//! rather than rewriting history. A process-wide TTL cache with prefix
//! invalidation keeps read paths fast without serving stale responses past
//! a write.
//!
//! This crate is a library invoked in-process by request handlers; the
//! HTTP layer, authentication, and UI live elsewhere.

pub mod cache;
pub mod config;
pub mod db;
pub mod diff;
pub mod errors;
pub mod lock;
pub mod models;
pub mod registry;
pub mod restore;
pub mod versioning;


use std::sync::Arc;

use sqlx::SqlitePool;

use cache::TtlCache;
use config::Config;
use db::Repository;
use lock::LockManager;
use registry::ResourceRegistry;
use restore::RestoreOrchestrator;
use versioning::VersionStore;

/// The wired-up core, constructed once per process and shared by reference
/// across request handlers.
#[derive(Clone)]
pub struct VersioningCore {
    pub repo: Arc<Repository>,
    pub versions: Arc<VersionStore>,
    pub locks: Arc<LockManager>,
    pub restore: Arc<RestoreOrchestrator>,
    pub cache: Arc<TtlCache>,
}

impl VersioningCore {
    /// Wire the components over an existing pool.
    pub fn new(pool: SqlitePool, registry: ResourceRegistry, config: &Config) -> Self {
        let repo = Arc::new(Repository::new(pool, Arc::new(registry)));
        let cache = Arc::new(TtlCache::new());
        let versions = Arc::new(VersionStore::new(repo.clone(), config.version_retry_limit));
        let locks = Arc::new(LockManager::new(repo.clone()));
        let restore = Arc::new(RestoreOrchestrator::new(
            repo.clone(),
            locks.clone(),
            versions.clone(),
            cache.clone(),
        ));

        Self {
            repo,
            versions,
            locks,
            restore,
            cache,
        }
    }

    /// Open the database from `config` and wire the components with the
    /// default resource registry.
    pub async fn init(config: &Config) -> Result<Self, errors::AppError> {
        let pool = db::init_database(&config.db_path).await?;
        tracing::info!("Versioning core ready at {:?}", config.db_path);
        Ok(Self::new(pool, ResourceRegistry::default(), config))
    }
}
