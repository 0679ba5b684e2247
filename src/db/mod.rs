use anyhow::Result;
use chrono::SecondsFormat;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::{AccessAction, UserId};

pub mod migrator;
pub mod repositories;

pub use repositories::access_log::{AccessLog, AccessLogFilter, NewAccessLog};
pub use repositories::geojson::{GeoJsonFile, GeoJsonSummary};
pub use repositories::role::{Role, RoleGrant};
pub use repositories::user::{User, UserChanges};

/// Fixed-width UTC timestamp; lexicographic order equals chronological order.
#[must_use]
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn role_repo(&self) -> repositories::role::RoleRepository {
        repositories::role::RoleRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn access_log_repo(&self) -> repositories::access_log::AccessLogRepository {
        repositories::access_log::AccessLogRepository::new(self.conn.clone())
    }

    /// The only way user-facing code reaches stored documents.
    #[must_use]
    pub fn geojson_for(&self, owner: UserId) -> repositories::geojson::ScopedGeoJsonRepository {
        repositories::geojson::ScopedGeoJsonRepository::new(self.conn.clone(), owner)
    }

    /// Unscoped document access for the administration panel.
    #[must_use]
    pub fn geojson_admin(&self) -> repositories::geojson::GeoJsonRepository {
        repositories::geojson::GeoJsonRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn find_user_for_login(&self, identifier: &str) -> Result<Option<(User, String)>> {
        self.user_repo().find_for_login(identifier).await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn role_names_for_user(&self, id: UserId) -> Result<Vec<String>> {
        self.role_repo().role_names_for_user(id).await
    }

    // ========== Audit ==========

    pub async fn append_access_log(&self, entry: NewAccessLog) -> Result<()> {
        self.access_log_repo().append(entry).await
    }

    pub async fn count_access_logs(&self) -> Result<u64> {
        self.access_log_repo().count().await
    }

    pub async fn count_access_logs_by_action(&self, action: AccessAction) -> Result<u64> {
        self.access_log_repo().count_by_action(action).await
    }
}
