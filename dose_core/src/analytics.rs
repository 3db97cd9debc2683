//! Adherence analytics.
//!
//! Everything here is a read-only function of a regimen and a caller-supplied
//! "today". Every walk over the calendar is bounded so that a schedule which
//! never produces a dose day still terminates.

use crate::{DayStatus, Error, Regimen, Result};
use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Default forward/backward scan length (two years)
pub const DEFAULT_HORIZON_DAYS: u32 = 730;

/// Longest calendar window [`Analytics::day_sets`] will walk
pub const MAX_WINDOW_DAYS: i64 = 365 * 2;

/// Longest start-to-today span counted by [`Analytics::compliance_rate`]
pub const MAX_COMPLIANCE_DAYS: i64 = 365 * 50;

/// Compliance over `[start, today]`
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct Compliance {
    /// Percentage 0-100; `None` when nothing was scheduled yet
    pub rate: Option<u8>,
    pub scheduled_count: u32,
    pub taken_count: u32,
}

/// Calendar highlighting for a window of days
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct DaySets {
    pub taken: Vec<NaiveDate>,
    pub missed: Vec<NaiveDate>,
    pub scheduled_pending: Vec<NaiveDate>,
}

/// The scalar values shown in a summary panel
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AdherenceReport {
    pub today: NaiveDate,
    pub next_pending_dose: Option<NaiveDate>,
    pub current_streak: u32,
    pub compliance: Compliance,
    pub due_today: bool,
}

/// Outcome of summarising possibly-missing state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Summary {
    /// No regimen has been started
    NoRegimen,
    /// Today is not known yet
    Loading,
    Ready(AdherenceReport),
}

/// Read-side view of a regimen on a given day
#[derive(Clone, Copy, Debug)]
pub struct Analytics<'a> {
    regimen: &'a Regimen,
    today: NaiveDate,
    horizon_days: u32,
}

impl<'a> Analytics<'a> {
    pub fn new(regimen: &'a Regimen, today: NaiveDate) -> Self {
        Self {
            regimen,
            today,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }

    /// Like [`Analytics::new`] but refuses to guess when today is unknown
    pub fn for_today(regimen: &'a Regimen, today: Option<NaiveDate>) -> Result<Self> {
        today
            .map(|today| Self::new(regimen, today))
            .ok_or(Error::UnresolvedToday)
    }

    pub fn with_horizon(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn regimen(&self) -> &'a Regimen {
        self.regimen
    }

    fn is_pending(&self, day: NaiveDate) -> bool {
        self.regimen.is_dose_day(day) && !self.regimen.is_taken(day)
    }

    /// First untaken dose day from today onwards, within `horizon_days`
    ///
    /// `None` means everything in the horizon is already taken.
    pub fn next_pending_dose(&self, horizon_days: u32) -> Option<NaiveDate> {
        days_forward(self.today)
            .take(horizon_days as usize)
            .find(|day| self.is_pending(*day))
    }

    /// Consecutive taken dose days ending at the latest taken dose day
    ///
    /// Non-dose days are skipped. Counting stops at the first untaken dose
    /// day or at the start date.
    pub fn current_streak(&self) -> u32 {
        let start = self.regimen.start_date();
        let horizon = self.horizon_days as usize;

        let anchor = days_backward(self.today)
            .take(horizon)
            .take_while(|day| *day >= start)
            .find(|day| self.regimen.is_dose_day(*day) && self.regimen.is_taken(*day));

        let Some(anchor) = anchor else {
            return 0;
        };

        let mut streak = 0;
        for day in days_backward(anchor)
            .take(horizon)
            .take_while(|day| *day >= start)
        {
            if !self.regimen.is_dose_day(day) {
                continue;
            }
            if !self.regimen.is_taken(day) {
                break;
            }
            streak += 1;
        }
        streak
    }

    /// Percentage of dose days in `[start, today]` that were taken
    pub fn compliance_rate(&self) -> Compliance {
        let start = self.regimen.start_date();
        let span = self.today.signed_duration_since(start).num_days();

        let mut scheduled_count = 0u32;
        let mut taken_count = 0u32;

        if span >= 0 {
            if span >= MAX_COMPLIANCE_DAYS {
                tracing::warn!(
                    "Compliance span of {} days truncated to {}",
                    span,
                    MAX_COMPLIANCE_DAYS
                );
            }
            let count = span.min(MAX_COMPLIANCE_DAYS - 1) + 1;
            for day in days_forward(start).take(count as usize) {
                if self.regimen.is_dose_day(day) {
                    scheduled_count += 1;
                    if self.regimen.is_taken(day) {
                        taken_count += 1;
                    }
                }
            }
        }

        if scheduled_count > 0 {
            return Compliance {
                rate: Some(percent(taken_count, scheduled_count)),
                scheduled_count,
                taken_count,
            };
        }

        // Taken start day with nothing scheduled yet: report one of one.
        if self.today == start && self.regimen.is_taken(start) {
            return Compliance {
                rate: Some(100),
                scheduled_count: 1,
                taken_count: 1,
            };
        }

        Compliance {
            rate: None,
            scheduled_count: 0,
            taken_count: 0,
        }
    }

    /// Whether a dose is due today and not yet taken
    pub fn due_today(&self) -> bool {
        self.is_pending(self.today)
    }

    /// Presentation status of a single day
    pub fn classify(&self, day: NaiveDate) -> DayStatus {
        if self.regimen.is_taken(day) {
            DayStatus::Taken
        } else if !self.regimen.is_dose_day(day) {
            DayStatus::NotScheduled
        } else if day < self.today {
            DayStatus::Missed
        } else {
            DayStatus::Pending
        }
    }

    /// Taken, missed and pending days within `[from, to]`
    ///
    /// The window is capped at [`MAX_WINDOW_DAYS`] days after `from`.
    pub fn day_sets(&self, from: NaiveDate, to: NaiveDate) -> DaySets {
        let mut sets = DaySets::default();

        for day in window(from, to) {
            match self.classify(day) {
                DayStatus::Taken => sets.taken.push(day),
                DayStatus::Missed => sets.missed.push(day),
                DayStatus::Pending => sets.scheduled_pending.push(day),
                DayStatus::NotScheduled => {}
            }
        }
        sets
    }

    /// The default calendar window: `days_before` the start through `days_after` today
    pub fn default_window(&self, days_before: u32, days_after: u32) -> (NaiveDate, NaiveDate) {
        let start = self.regimen.start_date();
        (
            start
                .checked_sub_days(Days::new(u64::from(days_before)))
                .unwrap_or(NaiveDate::MIN),
            self.today
                .checked_add_days(Days::new(u64::from(days_after)))
                .unwrap_or(NaiveDate::MAX),
        )
    }

    pub fn report(&self) -> AdherenceReport {
        AdherenceReport {
            today: self.today,
            next_pending_dose: self.next_pending_dose(self.horizon_days),
            current_streak: self.current_streak(),
            compliance: self.compliance_rate(),
            due_today: self.due_today(),
        }
    }
}

/// Summarise whatever state is available
///
/// A missing regimen wins over a missing today, matching what a summary panel
/// shows before the user has started treatment.
pub fn summarize(regimen: Option<&Regimen>, today: Option<NaiveDate>, horizon_days: u32) -> Summary {
    let Some(regimen) = regimen else {
        return Summary::NoRegimen;
    };

    match Analytics::for_today(regimen, today) {
        Ok(analytics) => Summary::Ready(analytics.with_horizon(horizon_days).report()),
        Err(_) => Summary::Loading,
    }
}

/// Days in `[from, to]`, at most [`MAX_WINDOW_DAYS`] + 1 of them
pub(crate) fn window(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let span = to.signed_duration_since(from).num_days();
    if span > MAX_WINDOW_DAYS {
        tracing::warn!("Calendar window of {} days capped at {}", span, MAX_WINDOW_DAYS);
    }
    let count = (span.min(MAX_WINDOW_DAYS) + 1).max(0);
    days_forward(from).take(count as usize)
}

/// `day`, then each following day until the calendar runs out
fn days_forward(day: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(day), |d| d.succ_opt())
}

/// `day`, then each preceding day until the calendar runs out
fn days_backward(day: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(day), |d| d.pred_opt())
}

/// `round(taken / scheduled * 100)` with halves rounded up
fn percent(taken: u32, scheduled: u32) -> u8 {
    let taken = u64::from(taken);
    let scheduled = u64::from(scheduled);
    ((taken * 200 + scheduled) / (scheduled * 2)).min(100) as u8
}
