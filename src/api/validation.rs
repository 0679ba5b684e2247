use axum::http::HeaderValue;

use super::ApiError;
use crate::domain::AccessAction;

pub const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 200;

/// Accepts only local redirect targets: `/path`, never `//host` or a scheme.
/// The target must also be usable as a `Location` header as-is.
#[must_use]
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    let plain = !next.chars().any(|c| c.is_control() || c.is_whitespace());

    if local && plain && HeaderValue::from_str(next).is_ok() {
        Some(next)
    } else {
        None
    }
}

pub fn validate_id(id: i32, what: &str) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {what} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

pub fn validate_page(page: Option<u64>, page_size: Option<u64>) -> Result<(u64, u64), ApiError> {
    let page = page.unwrap_or(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    if page == 0 {
        return Err(ApiError::validation("Page numbers start at 1"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::validation(format!(
            "Invalid page_size: {page_size}. Must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok((page, page_size))
}

pub fn parse_action(action: Option<&str>) -> Result<Option<AccessAction>, ApiError> {
    match action.map(str::trim).filter(|a| !a.is_empty()) {
        None => Ok(None),
        Some(raw) => AccessAction::parse(raw)
            .map(Some)
            .ok_or_else(|| ApiError::validation(format!("Unknown action: {raw}"))),
    }
}
