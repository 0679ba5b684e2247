//! `SeaORM` implementation of the `AdminService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::config::{SecurityConfig, SigConfig};
use crate::db::{
    AccessLogFilter, GeoJsonFile, GeoJsonSummary, Role, RoleGrant, Store, User, UserChanges,
};
use crate::domain::validation::{
    FILE_NAME_MAX_CHARS, check_email, check_name, check_password,
};
use crate::domain::{ADMIN_ROLE, CurrentUser, FieldErrors, FileId, UserId};
use crate::services::admin_service::{
    AccessLogPage, AdminCounts, AdminError, AdminService, NewUserInput, UserUpdateInput, UserView,
};

const MAX_PAGE_SIZE: u64 = 200;

pub struct SeaOrmAdminService {
    store: Store,
    security: SecurityConfig,
    sig: SigConfig,
}

impl SeaOrmAdminService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig, sig: SigConfig) -> Self {
        Self {
            store,
            security,
            sig,
        }
    }

    async fn view(&self, user: User) -> Result<UserView, AdminError> {
        let roles = self.store.role_names_for_user(user.id).await?;
        Ok(UserView::new(user, roles))
    }

    async fn ensure_user(&self, id: UserId) -> Result<(), AdminError> {
        if self.store.get_user(id).await?.is_none() {
            return Err(AdminError::NotFound(format!("User {id}")));
        }
        Ok(())
    }

    async fn ensure_role(&self, id: i32) -> Result<Role, AdminError> {
        self.store
            .role_repo()
            .get(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("Role {id}")))
    }

    fn check_document(&self, name: Option<&str>, content: Option<&str>) -> Result<(), AdminError> {
        let mut errors = FieldErrors::new();
        if let Some(name) = name {
            let len = name.trim().chars().count();
            if len == 0 || len > FILE_NAME_MAX_CHARS {
                errors.add(
                    "name",
                    format!("Name must be 1 to {FILE_NAME_MAX_CHARS} characters"),
                );
            }
        }
        if let Some(content) = content {
            if content.len() > self.sig.max_upload_bytes {
                errors.add("content", "Document exceeds the upload limit");
            } else if serde_json::from_str::<serde::de::IgnoredAny>(content).is_err() {
                errors.add("content", "Content is not valid JSON");
            }
        }
        Ok(errors.into_result()?)
    }
}

fn check_role_name(name: &str) -> Result<(), FieldErrors> {
    let len = name.trim().chars().count();
    if len == 0 || len > 64 {
        return Err(FieldErrors::single("name", "Role name must be 1 to 64 characters"));
    }
    Ok(())
}

#[async_trait]
impl AdminService for SeaOrmAdminService {
    async fn counts(&self) -> Result<AdminCounts, AdminError> {
        Ok(AdminCounts {
            users: self.store.count_users().await?,
            roles: self.store.role_repo().count().await?,
            geojson_files: self.store.geojson_admin().count().await?,
            access_logs: self.store.count_access_logs().await?,
        })
    }

    async fn list_users(
        &self,
        search: Option<&str>,
        active: Option<bool>,
    ) -> Result<Vec<UserView>, AdminError> {
        let users = self.store.user_repo().list(search, active).await?;
        let mut views = Vec::with_capacity(users.len());
        for user in users {
            views.push(self.view(user).await?);
        }
        Ok(views)
    }

    async fn get_user(&self, id: UserId) -> Result<UserView, AdminError> {
        let user = self
            .store
            .get_user(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("User {id}")))?;
        self.view(user).await
    }

    async fn create_user(&self, input: NewUserInput) -> Result<UserView, AdminError> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, &input.name);
        check_email(&mut errors, &input.email);
        check_password(&mut errors, &input.password, self.security.min_password_length);
        errors.into_result()?;

        let user = self
            .store
            .user_repo()
            .create(
                &input.name,
                &input.email,
                &input.password,
                input.active,
                &self.security,
            )
            .await?
            .ok_or_else(|| AdminError::Conflict("Email already registered".to_string()))?;

        info!(user_id = user.id.value(), "User created by admin");
        self.view(user).await
    }

    async fn update_user(
        &self,
        id: UserId,
        input: UserUpdateInput,
    ) -> Result<UserView, AdminError> {
        let password = input.password.filter(|p| !p.is_empty());

        let mut errors = FieldErrors::new();
        if let Some(name) = &input.name {
            check_name(&mut errors, name);
        }
        if let Some(email) = &input.email {
            check_email(&mut errors, email);
        }
        if let Some(password) = &password {
            check_password(&mut errors, password, self.security.min_password_length);
        }
        errors.into_result()?;

        if let Some(email) = &input.email
            && let Some(other) = self.store.user_repo().get_by_email(email).await?
            && other.id != id
        {
            return Err(AdminError::Conflict("Email already registered".to_string()));
        }

        let changes = UserChanges {
            name: input.name,
            email: input.email,
            active: input.active,
            password,
        };
        let user = self
            .store
            .user_repo()
            .update(id, changes, &self.security)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("User {id}")))?;

        info!(user_id = id.value(), "User updated by admin");
        self.view(user).await
    }

    async fn delete_user(&self, actor: &CurrentUser, id: UserId) -> Result<(), AdminError> {
        if actor.id == id {
            return Err(AdminError::Forbidden(
                "Administrators cannot delete their own account".to_string(),
            ));
        }
        if !self.store.user_repo().delete_cascade(id).await? {
            return Err(AdminError::NotFound(format!("User {id}")));
        }
        info!(user_id = id.value(), actor_id = actor.id.value(), "User deleted");
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, AdminError> {
        Ok(self.store.role_repo().list().await?)
    }

    async fn get_role(&self, id: i32) -> Result<Role, AdminError> {
        self.store
            .role_repo()
            .get(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("Role {id}")))
    }

    async fn create_role(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Role, AdminError> {
        check_role_name(name)?;
        let role = self
            .store
            .role_repo()
            .create(name, description)
            .await?
            .ok_or_else(|| AdminError::Conflict(format!("Role '{}' already exists", name.trim())))?;
        info!(role_id = role.id, role = %role.name, "Role created");
        Ok(role)
    }

    async fn update_role(
        &self,
        id: i32,
        name: Option<String>,
        description: Option<Option<String>>,
    ) -> Result<Role, AdminError> {
        let current = self.ensure_role(id).await?;
        if let Some(name) = &name {
            check_role_name(name)?;
            if current.name == ADMIN_ROLE && name.trim() != ADMIN_ROLE {
                return Err(AdminError::Forbidden(format!(
                    "The '{ADMIN_ROLE}' role cannot be renamed"
                )));
            }
            if let Some(other) = self.store.role_repo().get_by_name(name.trim()).await?
                && other.id != id
            {
                return Err(AdminError::Conflict(format!(
                    "Role '{}' already exists",
                    name.trim()
                )));
            }
        }
        self.store
            .role_repo()
            .update(id, name, description)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("Role {id}")))
    }

    async fn delete_role(&self, id: i32) -> Result<(), AdminError> {
        if self.ensure_role(id).await?.name == ADMIN_ROLE {
            return Err(AdminError::Forbidden(format!(
                "The '{ADMIN_ROLE}' role cannot be deleted"
            )));
        }
        if !self.store.role_repo().delete(id).await? {
            return Err(AdminError::NotFound(format!("Role {id}")));
        }
        info!(role_id = id, "Role deleted");
        Ok(())
    }

    async fn list_grants(&self, user_id: Option<UserId>) -> Result<Vec<RoleGrant>, AdminError> {
        Ok(self.store.role_repo().list_grants(user_id).await?)
    }

    async fn grant_role(&self, user_id: UserId, role_id: i32) -> Result<(), AdminError> {
        self.ensure_user(user_id).await?;
        self.ensure_role(role_id).await?;
        if !self.store.role_repo().grant(user_id, role_id).await? {
            return Err(AdminError::Conflict(
                "User already holds this role".to_string(),
            ));
        }
        info!(user_id = user_id.value(), role_id, "Role granted");
        Ok(())
    }

    async fn revoke_role(&self, user_id: UserId, role_id: i32) -> Result<(), AdminError> {
        if !self.store.role_repo().revoke(user_id, role_id).await? {
            return Err(AdminError::NotFound("Role grant".to_string()));
        }
        info!(user_id = user_id.value(), role_id, "Role revoked");
        Ok(())
    }

    async fn list_access_logs(
        &self,
        page: u64,
        page_size: u64,
        filter: AccessLogFilter,
    ) -> Result<AccessLogPage, AdminError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let (items, total_pages) = self
            .store
            .access_log_repo()
            .list(page, page_size, &filter)
            .await?;
        Ok(AccessLogPage {
            items,
            page,
            page_size,
            total_pages,
        })
    }

    async fn list_files(&self, owner: Option<UserId>) -> Result<Vec<GeoJsonSummary>, AdminError> {
        Ok(self.store.geojson_admin().list(owner).await?)
    }

    async fn get_file(&self, id: FileId) -> Result<GeoJsonFile, AdminError> {
        self.store
            .geojson_admin()
            .get(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("File {id}")))
    }

    async fn create_file(
        &self,
        owner: UserId,
        name: &str,
        content: String,
    ) -> Result<GeoJsonFile, AdminError> {
        self.check_document(Some(name), Some(&content))?;
        self.ensure_user(owner).await?;
        let file = self
            .store
            .geojson_admin()
            .insert(owner, name.trim(), content)
            .await?;
        info!(file_id = file.id.value(), owner_id = owner.value(), "File created by admin");
        Ok(file)
    }

    async fn update_file(
        &self,
        id: FileId,
        name: Option<String>,
        content: Option<String>,
    ) -> Result<GeoJsonFile, AdminError> {
        self.check_document(name.as_deref(), content.as_deref())?;
        let name = name.map(|n| n.trim().to_string());
        self.store
            .geojson_admin()
            .update(id, name, content)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("File {id}")))
    }

    async fn delete_file(&self, id: FileId) -> Result<(), AdminError> {
        if !self.store.geojson_admin().delete(id).await? {
            return Err(AdminError::NotFound(format!("File {id}")));
        }
        info!(file_id = id.value(), "File deleted by admin");
        Ok(())
    }
}
