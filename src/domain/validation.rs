//! Field-level input rules shared by registration, the admin panel and the CLI.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 120;
pub const EMAIL_MAX_CHARS: usize = 255;
pub const FILE_NAME_MAX_CHARS: usize = 255;

/// Validation messages keyed by form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Keeps the first message recorded for a field.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

pub fn check_name(errors: &mut FieldErrors, name: &str) {
    let len = name.trim().chars().count();
    if len < NAME_MIN_CHARS {
        errors.add("name", format!("Name must be at least {NAME_MIN_CHARS} characters"));
    } else if len > NAME_MAX_CHARS {
        errors.add("name", format!("Name must be at most {NAME_MAX_CHARS} characters"));
    }
}

pub fn check_email(errors: &mut FieldErrors, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        errors.add("email", "Email is required");
        return;
    }
    if email.chars().count() > EMAIL_MAX_CHARS {
        errors.add("email", format!("Email must be at most {EMAIL_MAX_CHARS} characters"));
        return;
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => errors.add("email", "Email address is not valid"),
    }
}

pub fn check_password(errors: &mut FieldErrors, password: &str, min_len: usize) {
    if password.chars().count() < min_len {
        errors.add(
            "password",
            format!("Password must be at least {min_len} characters"),
        );
    }
}

/// Registration form rules, including the confirmation match.
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirm: &str,
    min_password_len: usize,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_name(&mut errors, name);
    check_email(&mut errors, email);
    check_password(&mut errors, password, min_password_len);
    if password != confirm {
        errors.add("confirm", "Passwords do not match");
    }
    errors.into_result()
}

/// Strips any directory part a browser may send along with a filename.
#[must_use]
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.chars().take(FILE_NAME_MAX_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_reports_every_bad_field() {
        let errors = validate_registration("a", "nope", "123", "456", 6).unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
        assert_eq!(errors.get("confirm"), Some("Passwords do not match"));
    }

    #[test]
    fn registration_accepts_good_input() {
        assert!(validate_registration("alice", "alice@x.io", "secret1", "secret1", 6).is_ok());
    }

    #[test]
    fn email_needs_both_sides_of_the_at() {
        for bad in ["@x.io", "alice@", "", "   "] {
            let mut errors = FieldErrors::new();
            check_email(&mut errors, bad);
            assert!(errors.get("email").is_some(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.add("name", "first");
        errors.add("name", "second");
        assert_eq!(errors.get("name"), Some("first"));
        assert_eq!(errors.to_string(), "name: first");
    }

    #[test]
    fn file_names_lose_their_directories() {
        assert_eq!(sanitize_file_name("C:\\tmp\\parks.geojson").as_deref(), Some("parks.geojson"));
        assert_eq!(sanitize_file_name("../../etc/roads.json").as_deref(), Some("roads.json"));
        assert_eq!(sanitize_file_name("dir/"), None);
        assert_eq!(sanitize_file_name(".."), None);
    }
}
