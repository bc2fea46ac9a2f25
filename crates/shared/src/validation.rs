//! Common validation utilities.

use validator::ValidationError;

/// Sentinel stored in `max_uses` for codes without a usage cap.
pub const UNLIMITED_USES: i32 = -1;

/// Validates that a usage cap is either unlimited (-1) or at least 1.
pub fn validate_max_uses(max_uses: i32) -> Result<(), ValidationError> {
    if max_uses == UNLIMITED_USES || max_uses >= 1 {
        Ok(())
    } else {
        let mut err = ValidationError::new("max_uses_range");
        err.message = Some("maxUses must be -1 (unlimited) or at least 1".into());
        Err(err)
    }
}

lazy_static::lazy_static! {
    static ref CODE_TEXT_REGEX: regex::Regex = regex::Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Validates a submitted join code before normalization.
///
/// Surrounding whitespace is tolerated; anything else outside
/// `[A-Za-z0-9_-]` is rejected.
pub fn validate_code_text(code: &str) -> Result<(), ValidationError> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("code_required");
        err.message = Some("Join code is required".into());
        return Err(err);
    }
    if !CODE_TEXT_REGEX.is_match(trimmed) {
        let mut err = ValidationError::new("code_format");
        err.message = Some("Join code may only contain letters, digits, '-' or '_'".into());
        return Err(err);
    }
    Ok(())
}

/// Trims and uppercases a user supplied code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
