//! Join code lifecycle: generation, preview and redemption.
//!
//! The service owns the business rules and talks to persistence only through
//! [`JoinCodeStore`]. Preview and redemption evaluate the same predicates
//! independently; nothing is shared between a preview and a later redeem.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::group::{Group, GroupMembership};
use crate::models::join_code::{
    check_join_code_validity, generate_join_code, ClassInfo, GenerateJoinCodeRequest,
    validate_expiration_days, InvalidReason, JoinCode, NewJoinCode, JOIN_CODE_LENGTH,
};
use crate::models::profile::Profile;
use shared::validation::{normalize_code, validate_max_uses};

/// Collision retries before giving up on generation.
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: u32 = 10;

/// Failure reported by a [`JoinCodeStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of inserting a membership row.
#[derive(Debug, Clone)]
pub enum MembershipInsert {
    Inserted(GroupMembership),
    /// The `(group_id, student_id)` pair already exists.
    AlreadyMember,
}

/// Data access needed by the join code service.
#[async_trait]
pub trait JoinCodeStore: Send + Sync {
    /// Cheap connectivity check for health probes.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_group(&self, group_id: Uuid) -> Result<Option<Group>, StoreError>;

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// True if any join code row (active or not) uses `code`, or a class
    /// still carries it as its legacy code (case-insensitive).
    async fn code_exists(&self, code: &str) -> Result<bool, StoreError>;

    /// Inserts a code with zero uses, active. A duplicate code is a
    /// [`StoreError::Conflict`].
    async fn insert_join_code(&self, new_code: NewJoinCode) -> Result<JoinCode, StoreError>;

    /// Looks up `code` (already normalized). When no join code exists but a
    /// class carries it as its legacy code, creates the unlimited, non-expiring
    /// join code for that class and returns it. Idempotent.
    async fn find_or_backfill_join_code(&self, code: &str)
        -> Result<Option<JoinCode>, StoreError>;

    async fn find_join_code(&self, id: Uuid) -> Result<Option<JoinCode>, StoreError>;

    async fn list_join_codes(&self, group_id: Uuid) -> Result<Vec<JoinCode>, StoreError>;

    /// Sets `is_active = false`. Returns false if the code does not exist.
    async fn deactivate_join_code(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn is_member(&self, group_id: Uuid, student_id: Uuid) -> Result<bool, StoreError>;

    async fn insert_membership(
        &self,
        group_id: Uuid,
        student_id: Uuid,
    ) -> Result<MembershipInsert, StoreError>;

    /// Atomically increments `current_uses` only while the code is unlimited
    /// or below its cap. Returns false when the increment was refused.
    async fn increment_usage(&self, join_code_id: Uuid) -> Result<bool, StoreError>;
}

/// Errors surfaced by join code operations.
#[derive(Debug, Error)]
pub enum JoinCodeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Only the teacher of this class can manage its join codes")]
    Forbidden,

    #[error("Class not found")]
    GroupNotFound,

    #[error("Join code not found")]
    CodeNotFound,

    #[error("This join code has been deactivated")]
    CodeDeactivated,

    #[error("This join code has reached its usage limit")]
    UsageLimitReached,

    #[error("This join code has expired")]
    CodeExpired,

    #[error("You are already a member of this class")]
    AlreadyMember,

    #[error("Could not generate a unique join code, please try again")]
    GenerationExhausted,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InvalidReason> for JoinCodeError {
    fn from(reason: InvalidReason) -> Self {
        match reason {
            InvalidReason::Deactivated => JoinCodeError::CodeDeactivated,
            InvalidReason::UsageLimitReached => JoinCodeError::UsageLimitReached,
            InvalidReason::Expired => JoinCodeError::CodeExpired,
        }
    }
}

/// Tunables for code generation.
#[derive(Debug, Clone)]
pub struct JoinCodeSettings {
    pub max_generation_attempts: u32,
}

impl Default for JoinCodeSettings {
    fn default() -> Self {
        Self {
            max_generation_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
        }
    }
}

/// Result of a successful redemption.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub group_id: Uuid,
    pub join_code_id: Uuid,
    /// False when the best-effort usage increment did not happen.
    pub usage_recorded: bool,
}

/// Join code business operations over a [`JoinCodeStore`].
#[derive(Clone)]
pub struct JoinCodeService {
    store: Arc<dyn JoinCodeStore>,
    settings: JoinCodeSettings,
}

impl JoinCodeService {
    pub fn new(store: Arc<dyn JoinCodeStore>, settings: JoinCodeSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<dyn JoinCodeStore> {
        &self.store
    }

    pub fn settings(&self) -> &JoinCodeSettings {
        &self.settings
    }

    /// Generate a join code for a class owned by `caller`.
    pub async fn generate(
        &self,
        caller: Uuid,
        request: &GenerateJoinCodeRequest,
    ) -> Result<JoinCode, JoinCodeError> {
        self.generate_with(caller, request, || generate_join_code(JOIN_CODE_LENGTH))
            .await
    }

    /// Same as [`generate`](Self::generate) with a caller supplied code source.
    pub async fn generate_with<F>(
        &self,
        caller: Uuid,
        request: &GenerateJoinCodeRequest,
        generator: F,
    ) -> Result<JoinCode, JoinCodeError>
    where
        F: Fn() -> String + Send + Sync,
    {
        if validate_max_uses(request.max_uses).is_err() {
            return Err(JoinCodeError::InvalidInput(
                "maxUses must be -1 (unlimited) or at least 1".to_string(),
            ));
        }
        if let Some(Err(err)) = request.expiration_days.map(validate_expiration_days) {
            let message = err
                .message
                .map(|m| m.to_string())
                .unwrap_or_else(|| "expirationDays is invalid".to_string());
            return Err(JoinCodeError::InvalidInput(message));
        }

        let group = self.owned_group(caller, request.group_id).await?;

        let expires_at = request
            .expiration_days
            .map(|days| Utc::now() + Duration::days(i64::from(days)));

        for attempt in 1..=self.settings.max_generation_attempts {
            let code = generator();
            if self.store.code_exists(&code).await? {
                warn!(attempt, group_id = %group.id, "Join code collision, retrying");
                continue;
            }

            let new_code = NewJoinCode {
                code,
                group_id: group.id,
                max_uses: request.max_uses,
                expires_at,
                created_by: caller,
            };

            match self.store.insert_join_code(new_code).await {
                Ok(join_code) => {
                    info!(
                        group_id = %group.id,
                        join_code_id = %join_code.id,
                        max_uses = join_code.max_uses,
                        teacher_id = %caller,
                        "Join code generated"
                    );
                    return Ok(join_code);
                }
                // Lost a race with another insert of the same code
                Err(StoreError::Conflict(_)) => {
                    warn!(attempt, group_id = %group.id, "Join code insert conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            group_id = %group.id,
            attempts = self.settings.max_generation_attempts,
            "Join code generation exhausted"
        );
        Err(JoinCodeError::GenerationExhausted)
    }

    /// Check a code for `student` without enrolling them.
    pub async fn preview(&self, student: Uuid, code: &str) -> Result<ClassInfo, JoinCodeError> {
        let join_code = self.resolve(code).await?;
        check_join_code_validity(&join_code, Utc::now())?;

        if self.store.is_member(join_code.group_id, student).await? {
            return Err(JoinCodeError::AlreadyMember);
        }

        let group = self
            .store
            .find_group(join_code.group_id)
            .await?
            .ok_or(JoinCodeError::GroupNotFound)?;
        let teacher = self.store.find_profile(group.teacher_id).await?;

        Ok(ClassInfo {
            group_id: group.id,
            class_name: group.name,
            subject: group.subject,
            teacher_name: Profile::name_or_default(teacher.as_ref()),
        })
    }

    /// Enroll `student` in the class behind `code`.
    ///
    /// The usage counter is bumped after the membership is committed and a
    /// failure there is logged, not returned.
    pub async fn redeem(&self, student: Uuid, code: &str) -> Result<Redemption, JoinCodeError> {
        let join_code = self.resolve(code).await?;
        check_join_code_validity(&join_code, Utc::now())?;

        match self
            .store
            .insert_membership(join_code.group_id, student)
            .await?
        {
            MembershipInsert::Inserted(membership) => {
                info!(
                    group_id = %membership.group_id,
                    student_id = %student,
                    join_code_id = %join_code.id,
                    "Student joined class"
                );
            }
            MembershipInsert::AlreadyMember => return Err(JoinCodeError::AlreadyMember),
        }

        let usage_recorded = match self.store.increment_usage(join_code.id).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(
                    join_code_id = %join_code.id,
                    max_uses = join_code.max_uses,
                    "Usage increment refused, code reached its cap concurrently"
                );
                false
            }
            Err(e) => {
                warn!(
                    join_code_id = %join_code.id,
                    error = %e,
                    "Failed to increment join code usage"
                );
                false
            }
        };

        Ok(Redemption {
            group_id: join_code.group_id,
            join_code_id: join_code.id,
            usage_recorded,
        })
    }

    /// All join codes of a class, for its teacher.
    pub async fn list_for_group(
        &self,
        caller: Uuid,
        group_id: Uuid,
    ) -> Result<Vec<JoinCode>, JoinCodeError> {
        self.owned_group(caller, group_id).await?;
        Ok(self.store.list_join_codes(group_id).await?)
    }

    /// Deactivate one of the class's join codes. Deactivating twice is fine.
    pub async fn deactivate(
        &self,
        caller: Uuid,
        group_id: Uuid,
        join_code_id: Uuid,
    ) -> Result<(), JoinCodeError> {
        self.owned_group(caller, group_id).await?;

        let join_code = self
            .store
            .find_join_code(join_code_id)
            .await?
            .filter(|c| c.group_id == group_id)
            .ok_or(JoinCodeError::CodeNotFound)?;

        if !self.store.deactivate_join_code(join_code.id).await? {
            return Err(JoinCodeError::CodeNotFound);
        }

        info!(
            group_id = %group_id,
            join_code_id = %join_code_id,
            teacher_id = %caller,
            "Join code deactivated"
        );
        Ok(())
    }

    async fn owned_group(&self, caller: Uuid, group_id: Uuid) -> Result<Group, JoinCodeError> {
        let group = self
            .store
            .find_group(group_id)
            .await?
            .ok_or(JoinCodeError::GroupNotFound)?;

        if !group.is_owned_by(caller) {
            return Err(JoinCodeError::Forbidden);
        }
        Ok(group)
    }

    async fn resolve(&self, code: &str) -> Result<JoinCode, JoinCodeError> {
        let normalized = normalize_code(code);
        if normalized.is_empty() {
            return Err(JoinCodeError::InvalidInput(
                "Join code is required".to_string(),
            ));
        }

        self.store
            .find_or_backfill_join_code(&normalized)
            .await?
            .ok_or(JoinCodeError::CodeNotFound)
    }
}
