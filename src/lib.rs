//! # Registrar
//!
//! Rules engine for academic enrollment and grading.
//!
//! Registrar keeps the academic calendar, classes, subjects and people of a
//! school, places students into classes for a year, and records grades and
//! attendance. Every operation enforces the school's rules before anything
//! is written: a class never holds more active students than its capacity,
//! a student has at most one enrollment per year, and grades are only
//! accepted for subjects actually taught to the student's class.
//!
//! ## Architecture
//!
//! ```text
//! crates/
//! ├── registrar-core/           # AppError, RuleViolation, StoreError
//! ├── registrar-config/         # database, transaction and logging settings
//! ├── registrar-models/         # entities, DTOs, typed ids
//! ├── registrar-db/             # Store trait, PostgreSQL and in-memory stores
//! └── registrar-observability/  # tracing subscriber setup
//! src/
//! ├── cli/                      # seeding and admin commands
//! ├── modules/                  # one service per domain area
//! ├── state.rs                  # AppState shared by every service
//! └── utils/                    # retry and constraint helpers
//! ```
//!
//! Each service is a unit struct with associated async functions taking
//! `&AppState`. Mutations run inside one store transaction and are retried
//! when the store reports a serialization failure.
//!
//! ## Example
//!
//! ```ignore
//! use registrar::modules::EnrollmentService;
//! use registrar::state::AppState;
//!
//! let state = AppState::in_memory();
//! let enrollment = EnrollmentService::enroll(&state, dto).await?;
//! ```

pub mod cli;
pub mod modules;
pub mod state;
pub mod utils;

pub use state::AppState;
