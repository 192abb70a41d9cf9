//! # Registrar Core
//!
//! Core types and utilities shared by every Registrar crate.
//!
//! - [`errors`]: the rule-violation taxonomy, storage errors and the
//!   [`AppError`] returned by every service operation
//! - [`serde`]: custom serde helpers for form-style payloads
//!
//! # Example
//!
//! ```ignore
//! use registrar_core::{AppError, RuleViolation};
//!
//! match EnrollmentService::enroll(&store, dto).await {
//!     Err(AppError::Rule(RuleViolation::CapacityExceeded { .. })) => { /* class is full */ }
//!     Err(other) => return Err(other),
//!     Ok(enrollment) => { /* ... */ }
//! }
//! ```

pub mod errors;
pub mod serde;

// Re-export commonly used types at crate root
pub use errors::{AppError, AppResult, RuleViolation, StoreError};
