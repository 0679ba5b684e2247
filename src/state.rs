use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccessLogger, AdminService, AuthService, SeaOrmAdminService, SeaOrmAuthService,
    SeaOrmSigService, SigService,
};

/// Everything a request handler may touch. Built once at startup.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub access_logger: AccessLogger,

    pub auth_service: Arc<dyn AuthService>,

    pub sig_service: Arc<dyn SigService>,

    pub admin_service: Arc<dyn AdminService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store))
    }

    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let auth_service: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
            config.audit.clone(),
        ));

        let sig_service: Arc<dyn SigService> =
            Arc::new(SeaOrmSigService::new(store.clone(), config.sig.clone()));

        let admin_service: Arc<dyn AdminService> = Arc::new(SeaOrmAdminService::new(
            store.clone(),
            config.security.clone(),
            config.sig.clone(),
        ));

        Self {
            access_logger: AccessLogger::new(store.clone()),
            config: Arc::new(config),
            store,
            auth_service,
            sig_service,
            admin_service,
        }
    }
}
