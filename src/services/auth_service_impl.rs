//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::{AuditConfig, SecurityConfig};
use crate::db::repositories::user::{hash_password_blocking, verify_password_blocking};
use crate::db::{Store, User};
use crate::domain::validation::validate_registration;
use crate::domain::{AccessAction, CurrentUser, UserId};
use crate::services::auth_service::{AuthError, AuthService, RegisterInput};
use crate::services::{AccessLogger, RequestMeta};

/// Verified against when the identifier matches no account.
const UNMATCHED_PASSWORD: &str = "devgis-unmatched-identifier";

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    audit: AuditConfig,
    access_logger: AccessLogger,
    unmatched_hash: OnceCell<String>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig, audit: AuditConfig) -> Self {
        let access_logger = AccessLogger::new(store.clone());
        Self {
            store,
            security,
            audit,
            access_logger,
            unmatched_hash: OnceCell::new(),
        }
    }

    /// Hashed once with the configured params, so an unknown identifier costs
    /// the same Argon2 work as a known one.
    async fn unmatched_hash(&self) -> Result<String, AuthError> {
        let hash = self
            .unmatched_hash
            .get_or_try_init(|| hash_password_blocking(UNMATCHED_PASSWORD, &self.security))
            .await?;
        Ok(hash.clone())
    }

    async fn reject(&self, identifier: &str, meta: &RequestMeta) -> AuthError {
        if self.audit.log_failed_logins
            && let Err(e) = self
                .access_logger
                .record(AccessAction::LoginFailed, None, Some(identifier), meta)
                .await
        {
            return AuthError::from(e);
        }
        AuthError::InvalidCredentials
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, input: RegisterInput, meta: &RequestMeta) -> Result<User, AuthError> {
        validate_registration(
            &input.name,
            &input.email,
            &input.password,
            &input.confirm,
            self.security.min_password_length,
        )
        .map_err(AuthError::Validation)?;

        let user = self
            .store
            .user_repo()
            .create(&input.name, &input.email, &input.password, true, &self.security)
            .await?
            .ok_or(AuthError::DuplicateCredential)?;

        self.access_logger
            .record(AccessAction::Register, Some(user.id), Some(&user.email), meta)
            .await?;

        info!(user_id = user.id.value(), "User registered");
        Ok(user)
    }

    async fn login(
        &self,
        identifier: &str,
        password: &str,
        meta: &RequestMeta,
    ) -> Result<CurrentUser, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(self.reject(identifier, meta).await);
        }

        let found = self.store.find_user_for_login(identifier).await?;
        let password_hash = match &found {
            Some((_, hash)) => hash.clone(),
            None => self.unmatched_hash().await?,
        };
        let valid = verify_password_blocking(password, password_hash).await?;

        let Some((user, _)) = found else {
            warn!("Login rejected: unknown identifier");
            return Err(self.reject(identifier, meta).await);
        };
        if !valid || !user.active {
            warn!(user_id = user.id.value(), active = user.active, "Login rejected");
            return Err(self.reject(identifier, meta).await);
        }

        let roles = self.store.role_names_for_user(user.id).await?;
        Ok(CurrentUser {
            id: user.id,
            name: user.name,
            email: user.email,
            roles: roles.into_iter().collect(),
        })
    }

    async fn record_login(
        &self,
        user: &CurrentUser,
        identifier: &str,
        meta: &RequestMeta,
    ) -> Result<(), AuthError> {
        self.access_logger
            .record(AccessAction::Login, Some(user.id), Some(identifier.trim()), meta)
            .await?;
        info!(user_id = user.id.value(), "User logged in");
        Ok(())
    }

    async fn logout(&self, user: &CurrentUser, meta: &RequestMeta) -> Result<(), AuthError> {
        self.access_logger
            .record(AccessAction::Logout, Some(user.id), Some(&user.email), meta)
            .await?;
        info!(user_id = user.id.value(), "User logged out");
        Ok(())
    }

    async fn resolve(&self, user_id: UserId) -> Result<Option<CurrentUser>, AuthError> {
        let Some(user) = self.store.get_user(user_id).await? else {
            return Ok(None);
        };
        if !user.active {
            return Ok(None);
        }

        let roles = self.store.role_names_for_user(user.id).await?;
        Ok(Some(CurrentUser {
            id: user.id,
            name: user.name,
            email: user.email,
            roles: roles.into_iter().collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_store;

    fn service(store: Store) -> SeaOrmAuthService {
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        };
        SeaOrmAuthService::new(store, security, AuditConfig::default())
    }

    fn input(name: &str, email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login_by_email_or_name() {
        let store = temp_store().await;
        let auth = service(store.clone());
        let meta = RequestMeta::default();

        auth.register(input("Alice", "Alice@X.io", "pw1234"), &meta)
            .await
            .unwrap();

        let by_email = auth.login("alice@x.io", "pw1234", &meta).await.unwrap();
        let by_name = auth.login("ALICE", "pw1234", &meta).await.unwrap();
        assert_eq!(by_email.id, by_name.id);
        assert!(by_email.roles.is_empty());

        assert_eq!(store.count_access_logs_by_action(AccessAction::Register).await.unwrap(), 1);
        assert_eq!(store.count_access_logs_by_action(AccessAction::Login).await.unwrap(), 0);

        auth.record_login(&by_email, " alice@x.io ", &meta).await.unwrap();
        assert_eq!(store.count_access_logs_by_action(AccessAction::Login).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn wrong_password_and_inactive_look_the_same() {
        let store = temp_store().await;
        let auth = service(store.clone());
        let meta = RequestMeta::default();

        let user = auth
            .register(input("bob", "bob@x.io", "pw1234"), &meta)
            .await
            .unwrap();

        let wrong = auth.login("bob@x.io", "nope", &meta).await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));

        store
            .user_repo()
            .update(
                user.id,
                crate::db::UserChanges {
                    active: Some(false),
                    ..Default::default()
                },
                &SecurityConfig::default(),
            )
            .await
            .unwrap();

        let inactive = auth.login("bob@x.io", "pw1234", &meta).await.unwrap_err();
        assert_eq!(inactive.to_string(), wrong.to_string());
        assert!(auth.resolve(user.id).await.unwrap().is_none());
        assert_eq!(
            store.count_access_logs_by_action(AccessAction::LoginFailed).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn unknown_identifiers_are_verified_against_a_configured_hash() {
        let store = temp_store().await;
        let auth = service(store.clone());
        let meta = RequestMeta::default();

        auth.register(input("erin", "erin@x.io", "pw1234"), &meta)
            .await
            .unwrap();

        let known = auth.login("erin@x.io", "wrong-pw", &meta).await.unwrap_err();
        assert!(auth.unmatched_hash.get().is_none());

        let unknown = auth.login("ghost@x.io", "wrong-pw", &meta).await.unwrap_err();
        assert_eq!(unknown.to_string(), known.to_string());

        let hash = auth.unmatched_hash.get().expect("unknown identifier was verified");
        let parsed = argon2::password_hash::PasswordHash::new(hash).unwrap();
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        assert_eq!(parsed.params.get_decimal("m"), Some(1024));
        assert_eq!(parsed.params.get_decimal("t"), Some(1));

        assert_eq!(
            store.count_access_logs_by_action(AccessAction::LoginFailed).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let store = temp_store().await;
        let auth = service(store);
        let meta = RequestMeta::default();

        auth.register(input("carol", "carol@x.io", "first-pw"), &meta)
            .await
            .unwrap();
        let err = auth
            .register(input("carol2", "CAROL@x.io", "second-pw"), &meta)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateCredential));

        assert!(auth.login("carol@x.io", "first-pw", &meta).await.is_ok());
        assert!(auth.login("carol@x.io", "second-pw", &meta).await.is_err());
    }

    #[tokio::test]
    async fn invalid_registration_never_touches_the_database() {
        let store = temp_store().await;
        let auth = service(store.clone());

        let err = auth
            .register(
                RegisterInput {
                    confirm: "other".to_string(),
                    ..input("dan", "dan@x.io", "pw1234")
                },
                &RequestMeta::default(),
            )
            .await
            .unwrap_err();

        let AuthError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.get("confirm").is_some());
        assert_eq!(store.count_users().await.unwrap(), 0);
        assert_eq!(store.count_access_logs().await.unwrap(), 0);
    }
}
