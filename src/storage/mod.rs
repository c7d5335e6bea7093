//! SQLite storage layer for Lifeline.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic batch writes
//! - Idempotent re-import keyed on `(source, sourceId)`
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod schema;
pub mod sqlite;

pub use sqlite::{ImportRun, SqliteStorage, UpsertStats};
