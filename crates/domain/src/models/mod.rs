//! Domain models for the classroom backend.

pub mod group;
pub mod join_code;
pub mod profile;

pub use group::{Group, GroupMembership, MembershipStatus};
pub use join_code::{InvalidReason, JoinCode, NewJoinCode};
pub use profile::{Profile, UserRole};
