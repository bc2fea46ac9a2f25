//! Join code entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::JoinCode;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the join_codes table.
#[derive(Debug, Clone, FromRow)]
pub struct JoinCodeEntity {
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

impl From<JoinCodeEntity> for JoinCode {
    fn from(entity: JoinCodeEntity) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            group_id: entity.group_id,
            max_uses: entity.max_uses,
            current_uses: entity.current_uses,
            is_active: entity.is_active,
            expires_at: entity.expires_at,
            created_by: entity.created_by,
            created_at: entity.created_at,
        }
    }
}
