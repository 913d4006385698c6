//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sqlx::PgPool;

use docvault_core::config::{AppConfig, StoreBackend};
use docvault_core::types::{DepartmentId, FolderId, ParentRef, UserId};
use docvault_database::{DatabasePool, HierarchyStore, MemoryStore, PgStore, SharedStore};
use docvault_entity::department::Department;
use docvault_entity::document::FileMetadata;
use docvault_entity::folder::Folder;
use docvault_service::{CreateDepartmentRequest, RequestContext, Services, VersionedDocument};

/// Test application context
pub struct TestApp {
    /// Every service, wired over `store`
    pub services: Services,
    /// The store, for direct inspection
    pub store: SharedStore,
    /// Database pool when running against PostgreSQL
    pub db_pool: Option<PgPool>,
    /// Application config
    pub config: AppConfig,
    /// Acting user
    pub ctx: RequestContext,
}

/// PostgreSQL URL for integration tests. The in-memory store is used when
/// it is unset.
pub fn test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty())
}

impl TestApp {
    /// Create a new test application over an empty store
    pub async fn new() -> Self {
        Self::with_config("").await
    }

    /// Create a test application from a TOML config snippet
    pub async fn with_config(toml: &str) -> Self {
        let mut config = AppConfig::from_toml_str(toml).expect("Failed to parse test config");
        let (store, db_pool): (SharedStore, Option<PgPool>) = match test_database_url() {
            Some(url) => {
                let pool = Self::isolated_database(&mut config, url).await;
                let db_pool = pool.pool().clone();
                (Arc::new(PgStore::new(pool)) as SharedStore, Some(db_pool))
            }
            None => {
                config.storage.backend = StoreBackend::Memory;
                (Arc::new(MemoryStore::new()) as SharedStore, None)
            }
        };
        let services = Services::new(store.clone(), &config);
        Self {
            services,
            store,
            db_pool,
            config,
            ctx: RequestContext::new(UserId::new()),
        }
    }

    /// Create a PostgreSQL test application, or `None` without a database
    pub async fn postgres(toml: &str) -> Option<Self> {
        if test_database_url().is_none() {
            eprintln!("DATABASE_URL is not set, skipping PostgreSQL test");
            return None;
        }
        Some(Self::with_config(toml).await)
    }

    /// The PostgreSQL pool; panics on the in-memory store
    pub fn pool(&self) -> PgPool {
        self.db_pool.clone().expect("not running against PostgreSQL")
    }

    /// Connect to a fresh schema so tests never see each other's rows
    async fn isolated_database(config: &mut AppConfig, url: String) -> DatabasePool {
        let schema = format!("docvault_test_{}", uuid::Uuid::new_v4().simple());
        let admin = PgPool::connect(&url)
            .await
            .expect("Failed to connect to test database");
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .expect("Failed to create test schema");
        admin.close().await;

        config.storage.backend = StoreBackend::Postgres;
        config.database.url = url;
        config.database.schema = Some(schema);
        config.database.max_connections = 8;
        config.database.min_connections = 0;

        let pool = DatabasePool::connect(&config.database)
            .await
            .expect("Failed to connect to test database");
        docvault_database::migration::run_migrations(pool.pool())
            .await
            .expect("Failed to run migrations");
        pool
    }

    /// Create a department
    pub async fn department(&self, name: &str) -> Department {
        self.services
            .departments
            .create(
                &self.ctx,
                CreateDepartmentRequest {
                    name: name.to_string(),
                    code: name.chars().take(3).collect(),
                },
            )
            .await
            .expect("Failed to create department")
            .value
    }

    /// Create a folder
    pub async fn folder(&self, parent: impl Into<ParentRef>, name: &str) -> Folder {
        self.services
            .lifecycle
            .create_folder(&self.ctx, parent.into(), name)
            .await
            .expect("Failed to create folder")
            .value
    }

    /// Create a document from an upload named `file_name`
    pub async fn document(&self, parent: impl Into<ParentRef>, file_name: &str) -> VersionedDocument {
        self.services
            .lifecycle
            .create_document(&self.ctx, parent.into(), &upload(file_name, "blob://v1"))
            .await
            .expect("Failed to create document")
            .value
    }

    /// Reload a folder
    pub async fn reload_folder(&self, id: FolderId) -> Folder {
        self.store
            .find_folder(id)
            .await
            .expect("store error")
            .expect("folder missing")
    }

    /// Every stored path in a department, sorted
    pub async fn paths(&self, department_id: DepartmentId) -> Vec<String> {
        let mut paths: Vec<String> = self
            .store
            .list_department_folders(department_id)
            .await
            .expect("store error")
            .into_iter()
            .map(|f| f.path)
            .chain(
                self.store
                    .list_department_documents(department_id)
                    .await
                    .expect("store error")
                    .into_iter()
                    .map(|d| d.path),
            )
            .collect();
        paths.sort();
        paths
    }

    /// Assert the integrity checker finds nothing wrong
    pub async fn assert_consistent(&self, department_id: DepartmentId) {
        let report = self
            .services
            .integrity
            .verify(department_id)
            .await
            .expect("verify failed");
        assert!(report.is_consistent(), "violations: {:?}", report.violations);
    }
}

/// Upload metadata for a finished upload
pub fn upload(original_name: &str, file_url: &str) -> FileMetadata {
    FileMetadata {
        original_name: original_name.to_string(),
        file_url: file_url.to_string(),
        size_bytes: file_url.len() as i64 * 100,
        mime_type: "application/octet-stream".to_string(),
        extension: None,
    }
}
