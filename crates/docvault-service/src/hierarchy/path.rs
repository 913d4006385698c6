//! Pure path and name helpers.

use docvault_core::error::AppError;
use docvault_core::result::AppResult;

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// The path of a node called `display_name` under a parent at `parent_path`.
///
/// Department paths are `/{name}`, so the same concatenation covers both
/// parent kinds.
pub fn child_path(parent_path: &str, display_name: &str) -> String {
    format!("{parent_path}{SEPARATOR}{display_name}")
}

/// Trim and check a folder or document name.
pub fn validate_name(raw: &str, max_length: usize) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name must not be empty"));
    }
    if name.contains(SEPARATOR) {
        return Err(AppError::validation(format!(
            "Name '{name}' must not contain '{SEPARATOR}'"
        )));
    }
    if name == "." || name == ".." {
        return Err(AppError::validation(format!("'{name}' is a reserved name")));
    }
    let length = name.chars().count();
    if length > max_length {
        return Err(AppError::validation(format!(
            "Name is {length} characters, the limit is {max_length}"
        )));
    }
    Ok(name.to_string())
}
