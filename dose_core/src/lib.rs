#![forbid(unsafe_code)]

//! Core domain model and business logic for dose adherence tracking.
//!
//! This crate provides:
//! - Domain types (rules, eras, ledger, regimen)
//! - Schedule policy resolution
//! - Ledger and start-date transitions
//! - Adherence analytics (streak, next dose, compliance, calendar sets)
//! - Persistence (state file, CSV export) and configuration
//!
//! The core never reads a clock: every analytic takes "today" from the caller.

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod policy;
pub mod ledger;
pub mod regimen;
pub mod analytics;
pub mod profile;
pub mod seed;
pub mod state;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use policy::is_dose_day;
pub use analytics::{summarize, AdherenceReport, Analytics, Compliance, DaySets, Summary};
pub use seed::{seed_history, SeedOutcome};
pub use state::TrackerState;
pub use export::export_day_statuses;
