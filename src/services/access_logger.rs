//! Writes audit rows for security events.

use crate::db::{NewAccessLog, Store};
use crate::domain::{AccessAction, UserId};
use anyhow::Result;
use tracing::info;

/// Request details copied into an audit row.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub method: Option<String>,
    pub path: Option<String>,
    pub ip: Option<String>,
}

#[derive(Clone)]
pub struct AccessLogger {
    store: Store,
}

impl AccessLogger {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        action: AccessAction,
        user_id: Option<UserId>,
        credential: Option<&str>,
        meta: &RequestMeta,
    ) -> Result<()> {
        self.store
            .append_access_log(NewAccessLog {
                user_id,
                credential: credential.map(str::to_string),
                action,
                method: meta.method.clone(),
                path: meta.path.clone(),
                ip: meta.ip.clone(),
            })
            .await?;

        if action != AccessAction::Request {
            info!(
                event = "access_logged",
                action = %action,
                user_id = user_id.map(|id| id.value()),
                "Audit event recorded"
            );
        }
        Ok(())
    }
}
