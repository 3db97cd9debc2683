//! Historical seeding for fixtures and imports.
//!
//! Builds a regimen where every dose day up to a cutoff is taken, except for
//! days explicitly forced absent.

use crate::{DoseLedger, Regimen, SchedulePolicy};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

/// Longest history `seed_history` will fill
pub const MAX_SEED_DAYS: i64 = 365 * 5;

/// Result of seeding
#[derive(Clone, Debug)]
pub struct SeedOutcome {
    pub regimen: Regimen,
    /// Force-absent days that were not dose days in range, so had no effect
    pub ineffective_absences: Vec<NaiveDate>,
}

/// Mark every dose day in `[start, through]` as taken, except `force_absent`
///
/// A force-absent day that isn't a scheduled dose day inside the range can't
/// change anything; it is reported back instead of being silently dropped.
pub fn seed_history(
    start: NaiveDate,
    through: NaiveDate,
    policy: SchedulePolicy,
    force_absent: &[NaiveDate],
) -> SeedOutcome {
    let empty = Regimen::new(start, policy);
    let absent: BTreeSet<NaiveDate> = force_absent.iter().copied().collect();

    let span = through.signed_duration_since(start).num_days();
    if span >= MAX_SEED_DAYS {
        tracing::warn!("Seed range of {} days capped at {}", span, MAX_SEED_DAYS);
    }
    let last = span.min(MAX_SEED_DAYS - 1);

    let ledger: DoseLedger = (0..=last)
        .map(|offset| start + Duration::days(offset))
        .filter(|day| empty.is_dose_day(*day) && !absent.contains(day))
        .collect();

    let ineffective_absences: Vec<NaiveDate> = absent
        .iter()
        .copied()
        .filter(|day| *day < start || *day > through || !empty.is_dose_day(*day))
        .collect();

    for day in &ineffective_absences {
        tracing::warn!("Force-absent day {} is not a scheduled dose day; ignored", day);
    }

    tracing::info!(
        "Seeded {} taken days from {} through {}",
        ledger.len(),
        start,
        through
    );

    SeedOutcome {
        regimen: Regimen::from_parts(start, empty.policy().clone(), ledger),
        ineffective_absences,
    }
}
