use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::sea_query::{Expr, Func, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::db::now_timestamp;
use crate::domain::{ADMIN_ROLE, UserId};
use crate::entities::{geojson_files, prelude::*, roles, user_roles, users};

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: UserId::new(model.id),
            name: model.name,
            email: model.email,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Partial update applied by the admin panel. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
    pub password: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        let user = Users::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Looks a login identifier up by email first, then by case-insensitive name.
    /// Returns the stored hash alongside the user for verification.
    pub async fn find_for_login(&self, identifier: &str) -> Result<Option<(User, String)>> {
        let identifier = identifier.trim().to_lowercase();

        let by_email = Users::find()
            .filter(users::Column::Email.eq(identifier.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email for login")?;

        let user = match by_email {
            Some(user) => Some(user),
            None => Users::find()
                .filter(Expr::expr(Func::lower(Expr::col(users::Column::Name))).eq(identifier))
                .order_by_asc(users::Column::Id)
                .one(&self.conn)
                .await
                .context("Failed to query user by name for login")?,
        };

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    /// Inserts a new user with a freshly hashed password.
    /// Returns `None` when the email is already registered.
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password: &str,
        active: bool,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        if self.get_by_email(&email).await?.is_some() {
            return Ok(None);
        }

        let password_hash = hash_password_blocking(password, security).await?;
        let now = now_timestamp();

        let active_model = users::ActiveModel {
            name: Set(name.trim().to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            active: Set(active),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active_model.insert(&self.conn).await {
            Ok(model) => Ok(Some(User::from(model))),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(None),
            Err(e) => Err(e).context("Failed to insert user"),
        }
    }

    pub async fn list(&self, search: Option<&str>, active: Option<bool>) -> Result<Vec<User>> {
        let mut query = Users::find().order_by_asc(users::Column::Id);

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(users::Column::Name.contains(term))
                    .add(users::Column::Email.contains(term.to_lowercase())),
            );
        }

        if let Some(active) = active {
            query = query.filter(users::Column::Active.eq(active));
        }

        let users = query
            .all(&self.conn)
            .await
            .context("Failed to list users")?;
        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Users::find().count(&self.conn).await?)
    }

    /// Applies the given changes; a password change re-hashes.
    /// Returns `None` when the user does not exist.
    pub async fn update(
        &self,
        id: UserId,
        changes: UserChanges,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        let Some(user) = Users::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(None);
        };

        let new_hash = match changes.password {
            Some(password) => Some(hash_password_blocking(&password, security).await?),
            None => None,
        };

        let mut active: users::ActiveModel = user.into();
        if let Some(name) = changes.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = changes.email {
            active.email = Set(email.trim().to_lowercase());
        }
        if let Some(flag) = changes.active {
            active.active = Set(flag);
        }
        if let Some(hash) = new_hash {
            active.password_hash = Set(hash);
        }
        active.updated_at = Set(now_timestamp());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;
        Ok(Some(User::from(model)))
    }

    /// Deletes a user together with everything it owns (files and role grants)
    /// in one transaction. Access log rows are left untouched.
    pub async fn delete_cascade(&self, id: UserId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        GeojsonFiles::delete_many()
            .filter(geojson_files::Column::UserId.eq(id.value()))
            .exec(&txn)
            .await
            .context("Failed to delete user files")?;

        UserRoles::delete_many()
            .filter(user_roles::Column::UserId.eq(id.value()))
            .exec(&txn)
            .await
            .context("Failed to delete user role grants")?;

        let result = Users::delete_by_id(id.value())
            .exec(&txn)
            .await
            .context("Failed to delete user")?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    /// Creates the superuser or resets an existing one (name, password,
    /// active flag) and makes sure it holds the admin role.
    pub async fn upsert_superuser(
        &self,
        name: &str,
        email: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<User> {
        let email = email.trim().to_lowercase();
        let password_hash = hash_password_blocking(password, security).await?;
        let now = now_timestamp();

        let txn = self.conn.begin().await?;

        let existing = Users::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(&txn)
            .await
            .context("Failed to query superuser")?;

        let model = if let Some(user) = existing {
            let mut active: users::ActiveModel = user.into();
            active.name = Set(name.trim().to_string());
            active.password_hash = Set(password_hash);
            active.active = Set(true);
            active.updated_at = Set(now.clone());
            active.update(&txn).await.context("Failed to reset superuser")?
        } else {
            users::ActiveModel {
                name: Set(name.trim().to_string()),
                email: Set(email),
                password_hash: Set(password_hash),
                active: Set(true),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .context("Failed to create superuser")?
        };

        let role = match Roles::find()
            .filter(roles::Column::Name.eq(ADMIN_ROLE))
            .one(&txn)
            .await?
        {
            Some(role) => role,
            None => roles::ActiveModel {
                name: Set(ADMIN_ROLE.to_string()),
                description: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .context("Failed to create admin role")?,
        };

        UserRoles::insert(user_roles::ActiveModel {
            user_id: Set(model.id),
            role_id: Set(role.id),
            assigned_at: Set(now),
        })
        .on_conflict(
            OnConflict::columns([user_roles::Column::UserId, user_roles::Column::RoleId])
                .do_nothing()
                .to_owned(),
        )
        .do_nothing()
        .exec(&txn)
        .await
        .context("Failed to grant admin role")?;

        txn.commit().await?;
        Ok(User::from(model))
    }
}

fn argon2_for(config: &SecurityConfig) -> Result<Argon2<'static>> {
    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None, // output length (use default)
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password using Argon2id with the configured params and a random salt.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = argon2_for(config)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored PHC string. The params embedded in the
/// hash are used, so hashes survive config changes.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Argon2 is CPU-intensive; keep it off the async workers.
pub async fn hash_password_blocking(password: &str, config: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let config = config.clone();
    task::spawn_blocking(move || hash_password(&password, &config))
        .await
        .context("Password hashing task panicked")?
}

pub async fn verify_password_blocking(password: &str, password_hash: String) -> Result<bool> {
    let password = password.to_string();
    task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .context("Password verification task panicked")?
}

/// Random alphanumeric password for bootstrap accounts.
#[must_use]
pub fn generate_password(length: usize) -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
