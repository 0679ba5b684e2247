//! Append-only audit trail. There is intentionally no update or delete here.

use crate::db::now_timestamp;
use crate::domain::{AccessAction, UserId};
use crate::entities::{access_logs, prelude::*};
use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};

pub use crate::entities::access_logs::Model as AccessLog;

/// A row about to be appended.
#[derive(Debug, Clone)]
pub struct NewAccessLog {
    pub user_id: Option<UserId>,
    pub credential: Option<String>,
    pub action: AccessAction,
    pub method: Option<String>,
    pub path: Option<String>,
    pub ip: Option<String>,
}

impl NewAccessLog {
    #[must_use]
    pub const fn new(action: AccessAction) -> Self {
        Self {
            user_id: None,
            credential: None,
            action,
            method: None,
            path: None,
            ip: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessLogFilter {
    pub action: Option<AccessAction>,
    pub user_id: Option<UserId>,
}

pub struct AccessLogRepository {
    conn: DatabaseConnection,
}

impl AccessLogRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn append(&self, entry: NewAccessLog) -> Result<()> {
        let active_model = access_logs::ActiveModel {
            user_id: Set(entry.user_id.map(|id| id.value())),
            credential: Set(entry.credential),
            action: Set(entry.action.as_str().to_string()),
            method: Set(entry.method),
            path: Set(entry.path),
            ip: Set(entry.ip),
            created_at: Set(now_timestamp()),
            ..Default::default()
        };

        AccessLogs::insert(active_model).exec(&self.conn).await?;
        Ok(())
    }

    /// Newest first. `page` is 1-based.
    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        filter: &AccessLogFilter,
    ) -> Result<(Vec<AccessLog>, u64)> {
        let mut query = AccessLogs::find()
            .order_by_desc(access_logs::Column::CreatedAt)
            .order_by_desc(access_logs::Column::Id);

        if let Some(action) = filter.action {
            query = query.filter(access_logs::Column::Action.eq(action.as_str()));
        }

        if let Some(user_id) = filter.user_id {
            query = query.filter(access_logs::Column::UserId.eq(user_id.value()));
        }

        let paginator = query.paginate(&self.conn, page_size);
        let total_pages = paginator.num_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total_pages))
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(AccessLogs::find().count(&self.conn).await?)
    }

    pub async fn count_by_action(&self, action: AccessAction) -> Result<u64> {
        Ok(AccessLogs::find()
            .filter(access_logs::Column::Action.eq(action.as_str()))
            .count(&self.conn)
            .await?)
    }
}
