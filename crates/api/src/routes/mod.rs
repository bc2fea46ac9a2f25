//! HTTP route handlers.

pub mod health;
pub mod join_codes;
