//! Class (group) and membership domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A class owned by a single teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub subject: Option<String>,
    pub teacher_id: Uuid,
    /// Per-class code from before join codes existed.
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.teacher_id == user_id
    }
}

/// Status of a student's enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(MembershipStatus::Active),
            _ => Err(format!("Invalid membership status: {}", s)),
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A student's enrollment in a class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembership {
    pub id: Uuid,
    pub group_id: Uuid,
    pub student_id: Uuid,
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_status_roundtrip() {
        assert_eq!(MembershipStatus::Active.to_string(), "active");
        assert_eq!(
            "ACTIVE".parse::<MembershipStatus>().unwrap(),
            MembershipStatus::Active
        );
        assert!("left".parse::<MembershipStatus>().is_err());
    }

    #[test]
    fn test_group_ownership() {
        let teacher = Uuid::new_v4();
        let group = Group {
            id: Uuid::new_v4(),
            name: "Algebra I".to_string(),
            subject: Some("Math".to_string()),
            teacher_id: teacher,
            code: None,
            created_at: Utc::now(),
        };
        assert!(group.is_owned_by(teacher));
        assert!(!group.is_owned_by(Uuid::new_v4()));
    }
}
