use atc_core::{CoreError, CoreResult};

/// Checks that a name is usable as a git branch name (and therefore as a
/// session name): non-empty, no leading `-` or `.`, no `..`, no spaces, and
/// every rune in `[A-Za-z0-9._/-]`.
pub fn validate_branch_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::Validation("name cannot be empty".to_owned()));
    }
    if name.starts_with('-') {
        return Err(CoreError::Validation(
            "name cannot start with '-'".to_owned(),
        ));
    }
    if name.starts_with('.') {
        return Err(CoreError::Validation(
            "name cannot start with '.'".to_owned(),
        ));
    }
    if name.contains("..") {
        return Err(CoreError::Validation(
            "name cannot contain '..'".to_owned(),
        ));
    }
    if name.contains(' ') {
        return Err(CoreError::Validation(
            "name cannot contain spaces".to_owned(),
        ));
    }
    if let Some(bad) = name.chars().find(|r| !is_valid_branch_char(*r)) {
        return Err(CoreError::Validation(format!(
            "name contains invalid character '{bad}'"
        )));
    }
    Ok(())
}

fn is_valid_branch_char(r: char) -> bool {
    r.is_ascii_alphanumeric() || matches!(r, '-' | '_' | '/' | '.')
}
