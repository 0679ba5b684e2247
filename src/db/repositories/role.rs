use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, SqlErr, TransactionTrait,
};
use sea_orm::sea_query::JoinType;

use crate::db::now_timestamp;
use crate::domain::UserId;
use crate::entities::{prelude::*, roles, user_roles};

pub use crate::entities::roles::Model as Role;
pub use crate::entities::user_roles::Model as RoleGrant;

pub struct RoleRepository {
    conn: DatabaseConnection,
}

impl RoleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Role>> {
        Roles::find()
            .order_by_asc(roles::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list roles")
    }

    pub async fn get(&self, id: i32) -> Result<Option<Role>> {
        Roles::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query role")
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Role>> {
        Roles::find()
            .filter(roles::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query role by name")
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Roles::find().count(&self.conn).await?)
    }

    /// Returns `None` when a role with the same name exists.
    pub async fn create(&self, name: &str, description: Option<String>) -> Result<Option<Role>> {
        let active_model = roles::ActiveModel {
            name: Set(name.trim().to_string()),
            description: Set(description),
            ..Default::default()
        };

        match active_model.insert(&self.conn).await {
            Ok(role) => Ok(Some(role)),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(None),
            Err(e) => Err(e).context("Failed to insert role"),
        }
    }

    pub async fn update(
        &self,
        id: i32,
        name: Option<String>,
        description: Option<Option<String>>,
    ) -> Result<Option<Role>> {
        let Some(role) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: roles::ActiveModel = role.into();
        if let Some(name) = name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = description {
            active.description = Set(description);
        }

        let role = active.update(&self.conn).await.context("Failed to update role")?;
        Ok(Some(role))
    }

    /// Removes the role and every grant of it.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        UserRoles::delete_many()
            .filter(user_roles::Column::RoleId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete role grants")?;

        let result = Roles::delete_by_id(id)
            .exec(&txn)
            .await
            .context("Failed to delete role")?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    /// Names of every role granted to the user.
    pub async fn role_names_for_user(&self, user_id: UserId) -> Result<Vec<String>> {
        let roles = Roles::find()
            .join(JoinType::InnerJoin, roles::Relation::UserRoles.def())
            .filter(user_roles::Column::UserId.eq(user_id.value()))
            .order_by_asc(roles::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to load roles for user")?;

        Ok(roles.into_iter().map(|r| r.name).collect())
    }

    pub async fn list_grants(&self, user_id: Option<UserId>) -> Result<Vec<RoleGrant>> {
        let mut query = UserRoles::find()
            .order_by_asc(user_roles::Column::UserId)
            .order_by_asc(user_roles::Column::RoleId);

        if let Some(user_id) = user_id {
            query = query.filter(user_roles::Column::UserId.eq(user_id.value()));
        }

        query.all(&self.conn).await.context("Failed to list role grants")
    }

    /// Returns `false` when the pair already exists.
    pub async fn grant(&self, user_id: UserId, role_id: i32) -> Result<bool> {
        let exists = UserRoles::find_by_id((user_id.value(), role_id))
            .one(&self.conn)
            .await
            .context("Failed to query role grant")?
            .is_some();
        if exists {
            return Ok(false);
        }

        let active_model = user_roles::ActiveModel {
            user_id: Set(user_id.value()),
            role_id: Set(role_id),
            assigned_at: Set(now_timestamp()),
        };

        match UserRoles::insert(active_model).exec(&self.conn).await {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(e) => Err(e).context("Failed to grant role"),
        }
    }

    pub async fn revoke(&self, user_id: UserId, role_id: i32) -> Result<bool> {
        let result = UserRoles::delete_by_id((user_id.value(), role_id))
            .exec(&self.conn)
            .await
            .context("Failed to revoke role")?;
        Ok(result.rows_affected > 0)
    }
}
