//! PostgreSQL implementation of the join code store.

use async_trait::async_trait;
use domain::models::{Group, JoinCode, NewJoinCode, Profile};
use domain::services::{JoinCodeStore, MembershipInsert, StoreError};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::metrics::record_pool_metrics;
use crate::repositories::{
    GroupRepository, JoinCodeRepository, MembershipRepository, ProfileRepository,
};

/// PostgreSQL error code for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// [`JoinCodeStore`] backed by the repositories of this crate.
#[derive(Clone)]
pub struct PgJoinCodeStore {
    pool: PgPool,
    groups: GroupRepository,
    profiles: ProfileRepository,
    join_codes: JoinCodeRepository,
    memberships: MembershipRepository,
}

impl PgJoinCodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            groups: GroupRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            join_codes: JoinCodeRepository::new(pool.clone()),
            memberships: MembershipRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[async_trait]
impl JoinCodeStore for PgJoinCodeStore {
    async fn ping(&self) -> Result<(), StoreError> {
        record_pool_metrics(&self.pool);
        db::ping(&self.pool).await?;
        Ok(())
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        Ok(self.groups.find_by_id(group_id).await?.map(Into::into))
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.find_by_id(user_id).await?.map(Into::into))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.join_codes.code_exists(code).await?)
    }

    async fn insert_join_code(&self, new_code: NewJoinCode) -> Result<JoinCode, StoreError> {
        match self.join_codes.create(&new_code).await {
            Ok(entity) => Ok(entity.into()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(format!(
                "join code {} already exists",
                new_code.code
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_or_backfill_join_code(
        &self,
        code: &str,
    ) -> Result<Option<JoinCode>, StoreError> {
        if let Some(existing) = self.join_codes.find_by_code(code).await? {
            return Ok(Some(existing.into()));
        }

        let Some(group) = self.groups.find_by_legacy_code(code).await? else {
            return Ok(None);
        };

        let legacy = NewJoinCode::legacy(code, group.id, group.teacher_id);
        if self.join_codes.create_if_absent(&legacy).await? == 1 {
            info!(group_id = %group.id, "Backfilled join code from legacy class code");
        }

        // Re-read so a concurrent backfill of the same code resolves to one row
        Ok(self.join_codes.find_by_code(code).await?.map(Into::into))
    }

    async fn find_join_code(&self, id: Uuid) -> Result<Option<JoinCode>, StoreError> {
        Ok(self.join_codes.find_by_id(id).await?.map(Into::into))
    }

    async fn list_join_codes(&self, group_id: Uuid) -> Result<Vec<JoinCode>, StoreError> {
        let rows = self.join_codes.list_by_group(group_id).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn deactivate_join_code(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.join_codes.deactivate(id).await? > 0)
    }

    async fn is_member(&self, group_id: Uuid, student_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.memberships.is_member(group_id, student_id).await?)
    }

    async fn insert_membership(
        &self,
        group_id: Uuid,
        student_id: Uuid,
    ) -> Result<MembershipInsert, StoreError> {
        match self.memberships.insert(group_id, student_id).await {
            Ok(Some(entity)) => Ok(MembershipInsert::Inserted(entity.into())),
            Ok(None) => Ok(MembershipInsert::AlreadyMember),
            Err(e) if is_unique_violation(&e) => Ok(MembershipInsert::AlreadyMember),
            Err(e) => Err(e.into()),
        }
    }

    async fn increment_usage(&self, join_code_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.join_codes.increment_usage(join_code_id).await?)
    }
}
