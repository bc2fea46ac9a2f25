//! Shared utilities and common types for the classroom backend.
//!
//! This crate provides common functionality used across all other crates:
//! - JWT validation for provider-issued access tokens
//! - Common validation logic for join-code requests

pub mod jwt;
pub mod validation;
