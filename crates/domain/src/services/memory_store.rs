//! In-memory [`JoinCodeStore`] for development and testing.
//!
//! Mirrors the constraints the PostgreSQL schema enforces: unique codes,
//! unique `(group_id, student_id)` memberships and the capped usage counter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::join_code::{JoinCodeStore, MembershipInsert, StoreError};
use crate::models::group::{Group, GroupMembership, MembershipStatus};
use crate::models::join_code::{JoinCode, NewJoinCode};
use crate::models::profile::Profile;

#[derive(Debug, Default)]
struct Tables {
    groups: HashMap<Uuid, Group>,
    profiles: HashMap<Uuid, Profile>,
    join_codes: HashMap<Uuid, JoinCode>,
    memberships: Vec<GroupMembership>,
}

/// Join code store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryJoinCodeStore {
    tables: Mutex<Tables>,
    /// Makes `increment_usage` fail, to exercise the best-effort path.
    fail_increments: AtomicBool,
}

impl InMemoryJoinCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    pub fn add_group(&self, group: Group) -> Result<(), StoreError> {
        self.tables()?.groups.insert(group.id, group);
        Ok(())
    }

    pub fn add_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.tables()?.profiles.insert(profile.id, profile);
        Ok(())
    }

    /// Stores a fully specified row, bypassing the insert defaults.
    pub fn put_join_code(&self, join_code: JoinCode) -> Result<(), StoreError> {
        self.tables()?.join_codes.insert(join_code.id, join_code);
        Ok(())
    }

    pub fn join_code_by_code(&self, code: &str) -> Result<Option<JoinCode>, StoreError> {
        Ok(self
            .tables()?
            .join_codes
            .values()
            .find(|c| c.code == code)
            .cloned())
    }

    pub fn membership_count(&self, group_id: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .tables()?
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .count())
    }

    pub fn set_fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }

    fn insert_row(tables: &mut Tables, new_code: NewJoinCode) -> Result<JoinCode, StoreError> {
        if tables.join_codes.values().any(|c| c.code == new_code.code) {
            return Err(StoreError::Conflict(format!(
                "join code {} already exists",
                new_code.code
            )));
        }

        let join_code = JoinCode {
            id: Uuid::new_v4(),
            code: new_code.code,
            group_id: new_code.group_id,
            max_uses: new_code.max_uses,
            current_uses: 0,
            is_active: true,
            expires_at: new_code.expires_at,
            created_by: new_code.created_by,
            created_at: Utc::now(),
        };
        tables.join_codes.insert(join_code.id, join_code.clone());
        Ok(join_code)
    }
}

#[async_trait]
impl JoinCodeStore for InMemoryJoinCodeStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.tables().map(|_| ())
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        Ok(self.tables()?.groups.get(&group_id).cloned())
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables()?.profiles.get(&user_id).cloned())
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        let tables = self.tables()?;
        let legacy_taken = tables.groups.values().any(|g| {
            g.code
                .as_deref()
                .is_some_and(|legacy| legacy.eq_ignore_ascii_case(code))
        });
        Ok(legacy_taken || tables.join_codes.values().any(|c| c.code == code))
    }

    async fn insert_join_code(&self, new_code: NewJoinCode) -> Result<JoinCode, StoreError> {
        let mut tables = self.tables()?;
        Self::insert_row(&mut tables, new_code)
    }

    async fn find_or_backfill_join_code(
        &self,
        code: &str,
    ) -> Result<Option<JoinCode>, StoreError> {
        let mut tables = self.tables()?;

        if let Some(existing) = tables.join_codes.values().find(|c| c.code == code) {
            return Ok(Some(existing.clone()));
        }

        let legacy = tables
            .groups
            .values()
            .find(|g| {
                g.code
                    .as_deref()
                    .is_some_and(|legacy| legacy.eq_ignore_ascii_case(code))
            })
            .map(|g| (g.id, g.teacher_id));

        match legacy {
            Some((group_id, teacher_id)) => {
                let row = NewJoinCode::legacy(code, group_id, teacher_id);
                Self::insert_row(&mut tables, row).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn find_join_code(&self, id: Uuid) -> Result<Option<JoinCode>, StoreError> {
        Ok(self.tables()?.join_codes.get(&id).cloned())
    }

    async fn list_join_codes(&self, group_id: Uuid) -> Result<Vec<JoinCode>, StoreError> {
        let mut codes: Vec<JoinCode> = self
            .tables()?
            .join_codes
            .values()
            .filter(|c| c.group_id == group_id)
            .cloned()
            .collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn deactivate_join_code(&self, id: Uuid) -> Result<bool, StoreError> {
        match self.tables()?.join_codes.get_mut(&id) {
            Some(code) => {
                code.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn is_member(&self, group_id: Uuid, student_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables()?.memberships.iter().any(|m| {
            m.group_id == group_id
                && m.student_id == student_id
                && m.status == MembershipStatus::Active
        }))
    }

    async fn insert_membership(
        &self,
        group_id: Uuid,
        student_id: Uuid,
    ) -> Result<MembershipInsert, StoreError> {
        let mut tables = self.tables()?;

        if tables
            .memberships
            .iter()
            .any(|m| m.group_id == group_id && m.student_id == student_id)
        {
            return Ok(MembershipInsert::AlreadyMember);
        }

        let membership = GroupMembership {
            id: Uuid::new_v4(),
            group_id,
            student_id,
            status: MembershipStatus::Active,
            joined_at: Utc::now(),
        };
        tables.memberships.push(membership.clone());
        Ok(MembershipInsert::Inserted(membership))
    }

    async fn increment_usage(&self, join_code_id: Uuid) -> Result<bool, StoreError> {
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "simulated usage increment failure".to_string(),
            ));
        }

        let mut tables = self.tables()?;
        match tables.join_codes.get_mut(&join_code_id) {
            Some(code) if code.is_unlimited() || code.current_uses < code.max_uses => {
                code.current_uses += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
