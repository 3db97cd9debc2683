//! Core domain types for the dose adherence tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Scheduling rules and the era timeline they live in
//! - The dose ledger of taken days
//! - The regimen value that ties start date, policy and ledger together

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Schedule Types
// ============================================================================

/// Rule deciding which days of an era are dose days
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Every calendar day
    Daily,
    /// Monday through Friday
    WeekdaysOnly,
    /// Every `n`th day counted from `anchor`
    EveryNDays { n: u32, anchor: NaiveDate },
}

/// A span of the schedule during which one rule applies
///
/// An era runs from `effective_from` (inclusive) until the next era begins.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Era {
    pub effective_from: NaiveDate,
    pub rule: Rule,
}

/// Ordered, non-empty timeline of eras
///
/// Construct through [`SchedulePolicy::new`] so the ordering invariant holds;
/// deserialization goes through the same validation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<Era>", into = "Vec<Era>")]
pub struct SchedulePolicy {
    pub(crate) eras: Vec<Era>,
}

// ============================================================================
// Ledger Types
// ============================================================================

/// Recorded status of a dose day
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoseStatus {
    Taken,
}

/// Days marked as taken; a missing key means "not taken"
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DoseLedger {
    pub(crate) entries: BTreeMap<NaiveDate, DoseStatus>,
}

// ============================================================================
// Regimen
// ============================================================================

/// The tracked treatment: anchor date, schedule and ledger
///
/// Every mutation returns a new `Regimen`; the fields stay private so the
/// "no entry before the start date" invariant can't be bypassed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Regimen {
    pub(crate) start_date: NaiveDate,
    pub(crate) policy: SchedulePolicy,
    pub(crate) ledger: DoseLedger,
}

/// Optional user metadata stored next to the regimen
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub name: Option<String>,
    pub age: Option<u32>,
}

/// How a single calendar day should be presented
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// Not a dose day and nothing recorded
    NotScheduled,
    /// Recorded as taken
    Taken,
    /// Scheduled, not taken, strictly before today
    Missed,
    /// Scheduled, not taken, today or later
    Pending,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::NotScheduled => "not_scheduled",
            DayStatus::Taken => "taken",
            DayStatus::Missed => "missed",
            DayStatus::Pending => "pending",
        }
    }
}
