#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database connection and queries for the address repair job.
//!
//! Uses `switchy_database` with raw parameterized SQL throughout. The
//! schema (`drives`, `charging_processes`, `positions`, `addresses`) is
//! owned by the telemetry system — this crate never creates or migrates
//! tables, it only reads candidates and writes address references.

pub mod db;
pub mod queries;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
