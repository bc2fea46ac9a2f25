//! Join code repository for database operations.

use domain::models::NewJoinCode;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::JoinCodeEntity;
use crate::metrics::QueryTimer;

/// Repository for join code rows.
#[derive(Clone)]
pub struct JoinCodeRepository {
    pool: PgPool,
}

impl JoinCodeRepository {
    /// Creates a new JoinCodeRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a new join code with zero uses.
    pub async fn create(&self, new_code: &NewJoinCode) -> Result<JoinCodeEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_join_code");
        let result = sqlx::query_as::<_, JoinCodeEntity>(
            r#"
            INSERT INTO join_codes (code, group_id, max_uses, expires_at, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, code, group_id, max_uses, current_uses, is_active, expires_at, created_by, created_at
            "#,
        )
        .bind(&new_code.code)
        .bind(new_code.group_id)
        .bind(new_code.max_uses)
        .bind(new_code.expires_at)
        .bind(new_code.created_by)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Insert a join code unless one with the same code already exists.
    ///
    /// Returns the number of rows inserted (0 or 1).
    pub async fn create_if_absent(&self, new_code: &NewJoinCode) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("create_join_code_if_absent");
        let result = sqlx::query(
            r#"
            INSERT INTO join_codes (code, group_id, max_uses, expires_at, created_by)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(&new_code.code)
        .bind(new_code.group_id)
        .bind(new_code.max_uses)
        .bind(new_code.expires_at)
        .bind(new_code.created_by)
        .execute(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result?.rows_affected())
    }

    /// Find join code by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<JoinCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_join_code_by_id");
        let result = sqlx::query_as::<_, JoinCodeEntity>(
            r#"
            SELECT id, code, group_id, max_uses, current_uses, is_active, expires_at, created_by, created_at
            FROM join_codes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Find join code by its (normalized) code, active or not.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<JoinCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_join_code_by_code");
        let result = sqlx::query_as::<_, JoinCodeEntity>(
            r#"
            SELECT id, code, group_id, max_uses, current_uses, is_active, expires_at, created_by, created_at
            FROM join_codes
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// List all join codes of a group, newest first.
    pub async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<JoinCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_join_codes_by_group");
        let result = sqlx::query_as::<_, JoinCodeEntity>(
            r#"
            SELECT id, code, group_id, max_uses, current_uses, is_active, expires_at, created_by, created_at
            FROM join_codes
            WHERE group_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Deactivate a join code. Returns the number of rows matched.
    pub async fn deactivate(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_join_code");
        let result = sqlx::query(
            r#"
            UPDATE join_codes
            SET is_active = false
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result?.rows_affected())
    }

    /// Increment the use count while the code is unlimited or below its cap.
    ///
    /// Returns false when no row was updated.
    pub async fn increment_usage(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("increment_join_code_usage");
        let result = sqlx::query(
            r#"
            UPDATE join_codes
            SET current_uses = current_uses + 1
            WHERE id = $1 AND (max_uses = -1 OR current_uses < max_uses)
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        timer.finish(&result);
        Ok(result?.rows_affected() == 1)
    }

    /// Check if code is taken by a join code or by a class's legacy code.
    ///
    /// Legacy codes that were never backfilled still resolve to their class,
    /// so they count as taken.
    pub async fn code_exists(&self, code: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("check_join_code_exists");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM join_codes WHERE code = $1)
                OR EXISTS(SELECT 1 FROM groups WHERE upper(code) = upper($1))
            "#,
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    // JoinCodeRepository tests require a database connection and are covered by integration tests
}
