//! Join code domain models.
//!
//! A join code lets a student enroll in a teacher's class. Codes carry an
//! optional usage cap (`-1` means unlimited) and an optional expiry, and can
//! be deactivated by the owning teacher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::UNLIMITED_USES;
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Length of generated join codes.
pub const JOIN_CODE_LENGTH: usize = 8;

/// Alphabet generated join codes are drawn from.
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Longest accepted expiry window, in days.
pub const MAX_EXPIRATION_DAYS: i32 = 3650;

/// A persisted join code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCode {
    pub id: Uuid,
    pub code: String,
    pub group_id: Uuid,
    pub max_uses: i32,
    pub current_uses: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl JoinCode {
    pub fn is_unlimited(&self) -> bool {
        self.max_uses == UNLIMITED_USES
    }
}

/// Values for inserting a new join code row.
#[derive(Debug, Clone)]
pub struct NewJoinCode {
    pub code: String,
    pub group_id: Uuid,
    pub max_uses: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

impl NewJoinCode {
    /// Row backfilled for a class that still uses its legacy code.
    pub fn legacy(code: impl Into<String>, group_id: Uuid, teacher_id: Uuid) -> Self {
        Self {
            code: code.into(),
            group_id,
            max_uses: UNLIMITED_USES,
            expires_at: None,
            created_by: teacher_id,
        }
    }
}

/// Why an existing code cannot be used right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    Deactivated,
    UsageLimitReached,
    Expired,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            InvalidReason::Deactivated => "This join code has been deactivated",
            InvalidReason::UsageLimitReached => "This join code has reached its usage limit",
            InvalidReason::Expired => "This join code has expired",
        };
        f.write_str(msg)
    }
}

/// Checks the code-level predicates in order: active, usage cap, expiry.
///
/// The first failing predicate wins. Membership is not checked here.
pub fn check_join_code_validity(code: &JoinCode, now: DateTime<Utc>) -> Result<(), InvalidReason> {
    if !code.is_active {
        return Err(InvalidReason::Deactivated);
    }
    if !code.is_unlimited() && code.current_uses >= code.max_uses {
        return Err(InvalidReason::UsageLimitReached);
    }
    if let Some(expires_at) = code.expires_at {
        if expires_at <= now {
            return Err(InvalidReason::Expired);
        }
    }
    Ok(())
}

/// Request to generate a join code for a class.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateJoinCodeRequest {
    pub group_id: Uuid,

    /// -1 for unlimited, otherwise at least 1.
    #[validate(custom(function = "shared::validation::validate_max_uses"))]
    pub max_uses: i32,

    /// Days until expiry; absent or null means the code never expires.
    #[serde(default)]
    #[validate(custom(function = "crate::models::join_code::validate_expiration_days"))]
    pub expiration_days: Option<i32>,
}

/// Validates an expiry window against `1..=MAX_EXPIRATION_DAYS`.
pub fn validate_expiration_days(days: i32) -> Result<(), ValidationError> {
    if (1..=MAX_EXPIRATION_DAYS).contains(&days) {
        Ok(())
    } else {
        let mut err = ValidationError::new("expiration_days_range");
        err.message = Some(
            format!("expirationDays must be between 1 and {}", MAX_EXPIRATION_DAYS).into(),
        );
        Err(err)
    }
}

/// Request carrying a code typed by a student.
///
/// A missing `code` field deserializes to an empty string so it is reported
/// as a validation failure rather than a body rejection.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinCodeRequest {
    #[serde(default)]
    #[validate(length(max = 64, message = "Join code is too long"))]
    #[validate(custom(function = "shared::validation::validate_code_text"))]
    pub code: String,
}

/// Join code as returned to the owning teacher.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCodeResponse {
    pub id: Uuid,
    pub code: String,
    pub group_id: Uuid,
    pub max_uses: i32,
    pub current_uses: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<JoinCode> for JoinCodeResponse {
    fn from(code: JoinCode) -> Self {
        Self {
            id: code.id,
            code: code.code,
            group_id: code.group_id,
            max_uses: code.max_uses,
            current_uses: code.current_uses,
            is_active: code.is_active,
            expires_at: code.expires_at,
            created_at: code.created_at,
        }
    }
}

/// Join code listing entry with its current usability.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCodeSummary {
    #[serde(flatten)]
    pub join_code: JoinCodeResponse,
    pub is_valid: bool,
}

impl JoinCodeSummary {
    pub fn at(code: JoinCode, now: DateTime<Utc>) -> Self {
        let is_valid = check_join_code_validity(&code, now).is_ok();
        Self {
            join_code: code.into(),
            is_valid,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJoinCodesResponse {
    pub data: Vec<JoinCodeSummary>,
}

/// Read-only preview of the class a code leads to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub group_id: Uuid,
    pub class_name: String,
    pub subject: Option<String>,
    pub teacher_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateJoinCodeResponse {
    pub class_info: ClassInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemJoinCodeResponse {
    pub success: bool,
    pub group_id: Uuid,
}

/// Generate a random join code of `length` characters from [`JOIN_CODE_ALPHABET`].
pub fn generate_join_code(length: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..JOIN_CODE_ALPHABET.len());
            JOIN_CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_code() -> JoinCode {
        JoinCode {
            id: Uuid::new_v4(),
            code: "AB12CD34".to_string(),
            group_id: Uuid::new_v4(),
            max_uses: 5,
            current_uses: 0,
            is_active: true,
            expires_at: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_join_code_format() {
        for _ in 0..200 {
            let code = generate_join_code(JOIN_CODE_LENGTH);
            assert_eq!(code.len(), 8);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()),
                "Invalid code: {}",
                code
            );
        }
    }

    #[test]
    fn test_generate_join_code_uniqueness() {
        let codes: Vec<String> = (0..100)
            .map(|_| generate_join_code(JOIN_CODE_LENGTH))
            .collect();
        let unique_codes: std::collections::HashSet<_> = codes.iter().collect();
        // 36^8 possibilities make duplicates vanishingly rare
        assert!(unique_codes.len() >= 99);
    }

    #[test]
    fn test_validity_ok() {
        let code = sample_code();
        assert_eq!(check_join_code_validity(&code, Utc::now()), Ok(()));
    }

    #[test]
    fn test_validity_deactivated_wins_over_everything() {
        let code = JoinCode {
            is_active: false,
            current_uses: 5,
            expires_at: Some(Utc::now() - Duration::days(1)),
            ..sample_code()
        };
        assert_eq!(
            check_join_code_validity(&code, Utc::now()),
            Err(InvalidReason::Deactivated)
        );
    }

    #[test]
    fn test_validity_usage_limit_wins_over_expiry() {
        let code = JoinCode {
            current_uses: 5,
            expires_at: Some(Utc::now() - Duration::days(1)),
            ..sample_code()
        };
        assert_eq!(
            check_join_code_validity(&code, Utc::now()),
            Err(InvalidReason::UsageLimitReached)
        );
    }

    #[test]
    fn test_validity_expired() {
        let now = Utc::now();
        let code = JoinCode {
            expires_at: Some(now - Duration::seconds(1)),
            ..sample_code()
        };
        assert_eq!(
            check_join_code_validity(&code, now),
            Err(InvalidReason::Expired)
        );

        let at_boundary = JoinCode {
            expires_at: Some(now),
            ..sample_code()
        };
        assert_eq!(
            check_join_code_validity(&at_boundary, now),
            Err(InvalidReason::Expired)
        );
    }

    #[test]
    fn test_validity_unlimited_ignores_counter() {
        let code = JoinCode {
            max_uses: UNLIMITED_USES,
            current_uses: 10_000,
            ..sample_code()
        };
        assert!(code.is_unlimited());
        assert_eq!(check_join_code_validity(&code, Utc::now()), Ok(()));
    }

    #[test]
    fn test_validate_expiration_days_bounds() {
        assert!(validate_expiration_days(1).is_ok());
        assert!(validate_expiration_days(MAX_EXPIRATION_DAYS).is_ok());
        assert!(validate_expiration_days(0).is_err());
        assert!(validate_expiration_days(MAX_EXPIRATION_DAYS + 1).is_err());

        let err = validate_expiration_days(-3).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            format!("expirationDays must be between 1 and {}", MAX_EXPIRATION_DAYS)
        );
    }

    #[test]
    fn test_legacy_new_join_code() {
        let group_id = Uuid::new_v4();
        let teacher_id = Uuid::new_v4();
        let row = NewJoinCode::legacy("MATH101", group_id, teacher_id);
        assert_eq!(row.max_uses, UNLIMITED_USES);
        assert!(row.expires_at.is_none());
        assert_eq!(row.created_by, teacher_id);
    }

    #[test]
    fn test_generate_request_validation() {
        let valid = GenerateJoinCodeRequest {
            group_id: Uuid::new_v4(),
            max_uses: -1,
            expiration_days: None,
        };
        assert!(valid.validate().is_ok());

        let capped = GenerateJoinCodeRequest {
            max_uses: 30,
            expiration_days: Some(7),
            ..valid.clone()
        };
        assert!(capped.validate().is_ok());

        let zero_uses = GenerateJoinCodeRequest {
            max_uses: 0,
            ..valid.clone()
        };
        assert!(zero_uses.validate().is_err());

        let zero_days = GenerateJoinCodeRequest {
            expiration_days: Some(0),
            ..valid.clone()
        };
        assert!(zero_days.validate().is_err());

        let too_long = GenerateJoinCodeRequest {
            expiration_days: Some(MAX_EXPIRATION_DAYS + 1),
            ..valid.clone()
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_generate_request_deserialization() {
        let json = r#"{"groupId":"00000000-0000-0000-0000-000000000001","maxUses":1,"expirationDays":null}"#;
        let request: GenerateJoinCodeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.max_uses, 1);
        assert!(request.expiration_days.is_none());
    }

    #[test]
    fn test_join_code_request_missing_code_fails_validation() {
        let request: JoinCodeRequest = serde_json::from_str("{}").unwrap();
        assert!(request.validate().is_err());

        let request: JoinCodeRequest = serde_json::from_str(r#"{"code":"ab12cd34"}"#).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_summary_flags_expired_code() {
        let code = JoinCode {
            expires_at: Some(Utc::now() - Duration::hours(1)),
            ..sample_code()
        };
        let summary = JoinCodeSummary::at(code, Utc::now());
        assert!(!summary.is_valid);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["code"], "AB12CD34");
    }

    #[test]
    fn test_invalid_reason_messages_are_distinct() {
        let messages = [
            InvalidReason::Deactivated.to_string(),
            InvalidReason::UsageLimitReached.to_string(),
            InvalidReason::Expired.to_string(),
        ];
        let unique: std::collections::HashSet<_> = messages.iter().collect();
        assert_eq!(unique.len(), 3);
    }
}
