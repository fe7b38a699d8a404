//! Configuration types for a comparison run.
//!
//! This module contains the configuration structures read from the JSON
//! configuration file:
//! - `DatabaseConfig`: connection settings for one side of the comparison
//! - `ComparisonConfig`: both sides, the table list and comparison tuning
//!
//! # Security
//! Passwords are held in zeroizing storage, are redacted from `Debug` and
//! `Display`, and are never serialized back out (reports embed the config).

mod comparison;
mod database;

pub use comparison::{ComparisonConfig, ContentStrategy};
pub use database::{DatabaseConfig, Password};
