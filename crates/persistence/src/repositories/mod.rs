//! Repository implementations for database operations.

pub mod group;
pub mod join_code;
pub mod membership;
pub mod profile;

pub use group::GroupRepository;
pub use join_code::JoinCodeRepository;
pub use membership::MembershipRepository;
pub use profile::ProfileRepository;
