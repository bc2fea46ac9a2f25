//! Membership repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupMembershipEntity, MembershipStatusDb};
use crate::metrics::QueryTimer;

/// Repository for class enrollments.
#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    /// Creates a new MembershipRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check whether the student is an active member of the group.
    pub async fn is_member(&self, group_id: Uuid, student_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("check_group_membership");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM group_members
                WHERE group_id = $1 AND student_id = $2 AND status = $3
            )
            "#,
        )
        .bind(group_id)
        .bind(student_id)
        .bind(MembershipStatusDb::Active)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Insert an active membership.
    ///
    /// Returns `None` when the student already belongs to the group.
    pub async fn insert(
        &self,
        group_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<GroupMembershipEntity>, sqlx::Error> {
        let timer = QueryTimer::new("insert_group_membership");
        let result = sqlx::query_as::<_, GroupMembershipEntity>(
            r#"
            INSERT INTO group_members (group_id, student_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id, student_id) DO NOTHING
            RETURNING id, group_id, student_id, status, joined_at
            "#,
        )
        .bind(group_id)
        .bind(student_id)
        .bind(MembershipStatusDb::Active)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Number of members in a group.
    pub async fn count_members(&self, group_id: Uuid) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_group_members");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM group_members WHERE group_id = $1
            "#,
        )
        .bind(group_id)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }
}
