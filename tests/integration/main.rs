//! HTTP integration tests against a real PostgreSQL database
//!
//! Each test gets a fresh database from `#[sqlx::test]`.
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

mod accounts;
mod catalog;
mod common;
mod loans;
