//! Test helpers module
//!
//! This module provides utilities and helpers for testing EventHub:
//! a mock email provider, a test context wired to the in-memory store, a
//! Postgres test database, and fixture builders.

#![allow(dead_code)]

pub mod database_helper;
pub mod email_mock;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use email_mock::*;
pub use test_context::*;
pub use test_data::*;
