//! Schema handling for the column store planner.
//!
//! The planner consumes these types fully resolved.
//! It never infers types or looks anything up lazily.

pub mod error;
pub mod schema;
pub mod types;
