//! Domain services for the classroom backend.
//!
//! Services contain business logic that operates on domain models.

pub mod join_code;
pub mod memory_store;

pub use join_code::{
    JoinCodeError, JoinCodeService, JoinCodeSettings, JoinCodeStore, MembershipInsert,
    Redemption, StoreError, DEFAULT_MAX_GENERATION_ATTEMPTS,
};
pub use memory_store::InMemoryJoinCodeStore;
