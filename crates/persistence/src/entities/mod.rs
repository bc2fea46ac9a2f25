//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod group;
pub mod join_code;
pub mod profile;

pub use group::{GroupEntity, GroupMembershipEntity, MembershipStatusDb};
pub use join_code::JoinCodeEntity;
pub use profile::{ProfileEntity, UserRoleDb};
