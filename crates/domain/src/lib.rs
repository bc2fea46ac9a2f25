//! Domain layer for the classroom backend.
//!
//! This crate contains:
//! - Domain models (Group, Profile, JoinCode)
//! - The join code service and its data-access trait
//! - Domain error types

pub mod models;
pub mod services;
