//! Lifeline - personal timeline importer
//!
//! This crate provides the core functionality for the `lifeline` CLI tool:
//! turning exported personal data (LinkedIn, Google Takeout, Facebook,
//! generic CSV, iCalendar) into one stream of canonical timeline events.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (TimelineEvent, Location, ImportReport)
//! - [`import`] - Parsers, date/geo resolution, classification, orchestration
//! - [`storage`] - SQLite database layer
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod import;
pub mod model;
pub mod storage;

pub use error::{Error, Result};
