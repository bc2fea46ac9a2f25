//! Group entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Group, GroupMembership, MembershipStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for membership_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "membership_status", rename_all = "lowercase")]
pub enum MembershipStatusDb {
    Active,
}

impl From<MembershipStatusDb> for MembershipStatus {
    fn from(db_status: MembershipStatusDb) -> Self {
        match db_status {
            MembershipStatusDb::Active => MembershipStatus::Active,
        }
    }
}

impl From<MembershipStatus> for MembershipStatusDb {
    fn from(status: MembershipStatus) -> Self {
        match status {
            MembershipStatus::Active => MembershipStatusDb::Active,
        }
    }
}

/// Database row mapping for the groups table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub name: String,
    pub subject: Option<String>,
    pub teacher_id: Uuid,
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<GroupEntity> for Group {
    fn from(entity: GroupEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            subject: entity.subject,
            teacher_id: entity.teacher_id,
            code: entity.code,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the group_members table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMembershipEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub student_id: Uuid,
    pub status: MembershipStatusDb,
    pub joined_at: DateTime<Utc>,
}

impl From<GroupMembershipEntity> for GroupMembership {
    fn from(entity: GroupMembershipEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            student_id: entity.student_id,
            status: entity.status.into(),
            joined_at: entity.joined_at,
        }
    }
}
