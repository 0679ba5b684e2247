//! Create-user command handler

use tracing::info;

use super::GENERATED_PASSWORD_LEN;
use crate::config::Config;
use crate::db::Store;
use crate::db::repositories::user::generate_password;
use crate::domain::FieldErrors;
use crate::domain::validation::{check_email, check_name, check_password};

pub async fn cmd_create_user(
    config: &Config,
    name: &str,
    email: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let generated = password.is_none();
    let password = password.unwrap_or_else(|| generate_password(GENERATED_PASSWORD_LEN));

    let mut errors = FieldErrors::new();
    check_name(&mut errors, name);
    check_email(&mut errors, email);
    check_password(&mut errors, &password, config.security.min_password_length);
    if let Err(errors) = errors.into_result() {
        anyhow::bail!("Invalid user: {errors}");
    }

    let store = Store::new(&config.general.database_path).await?;
    let Some(user) = store
        .user_repo()
        .create(name, email, &password, true, &config.security)
        .await?
    else {
        anyhow::bail!("A user with email {email} already exists");
    };

    info!(user_id = user.id.value(), "User created");
    println!("Created {} <{}> (id {}).", user.name, user.email, user.id);
    if generated {
        println!("Generated password (shown once): {password}");
    }
    Ok(())
}
