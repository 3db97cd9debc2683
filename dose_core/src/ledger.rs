//! Dose ledger and the marking transitions on a regimen.
//!
//! The ledger only stores "taken" entries. Marking goes through the regimen
//! because it has to be validated against the schedule.

use crate::{DoseLedger, DoseStatus, Error, Regimen, Result};
use chrono::NaiveDate;

impl DoseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_taken(&self, day: NaiveDate) -> bool {
        matches!(self.entries.get(&day), Some(DoseStatus::Taken))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Taken days in ascending order
    pub fn taken_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries
            .iter()
            .filter(|(_, status)| **status == DoseStatus::Taken)
            .map(|(day, _)| *day)
    }

    pub(crate) fn insert(&mut self, day: NaiveDate) {
        self.entries.insert(day, DoseStatus::Taken);
    }

    pub(crate) fn remove(&mut self, day: NaiveDate) -> bool {
        self.entries.remove(&day).is_some()
    }

    /// Drop every entry strictly before `day`, returning how many were removed
    pub(crate) fn prune_before(&mut self, day: NaiveDate) -> usize {
        let before = self.entries.len();
        self.entries = self.entries.split_off(&day);
        before - self.entries.len()
    }
}

impl FromIterator<NaiveDate> for DoseLedger {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        let mut ledger = DoseLedger::new();
        for day in iter {
            ledger.insert(day);
        }
        ledger
    }
}

impl Regimen {
    pub fn is_taken(&self, day: NaiveDate) -> bool {
        self.ledger.is_taken(day)
    }

    /// Whether `day` may be marked as taken
    ///
    /// Scheduled dose days are markable, and so is the start date whatever
    /// the rule says, since it records the act of starting treatment.
    pub fn can_mark(&self, day: NaiveDate) -> bool {
        day == self.start_date || self.is_dose_day(day)
    }

    /// Record `day` as taken
    ///
    /// Fails with [`Error::DateBeforeStart`] for days before the start date
    /// and [`Error::InvalidDoseDay`] for other unscheduled days. `self` is
    /// never modified; on success the updated regimen is returned.
    pub fn mark_taken(&self, day: NaiveDate) -> Result<Regimen> {
        if day < self.start_date {
            tracing::warn!("Rejected mark for {}: before start {}", day, self.start_date);
            return Err(Error::DateBeforeStart(day));
        }
        if !self.can_mark(day) {
            tracing::warn!("Rejected mark for {}: not a scheduled dose day", day);
            return Err(Error::InvalidDoseDay(day));
        }

        let mut next = self.clone();
        next.ledger.insert(day);
        tracing::debug!("Marked {} as taken", day);
        Ok(next)
    }

    /// Remove any entry for `day`; unmarking an absent day is a no-op
    pub fn unmark(&self, day: NaiveDate) -> Regimen {
        let mut next = self.clone();
        if next.ledger.remove(day) {
            tracing::debug!("Unmarked {}", day);
        }
        next
    }

    /// Unmark `day` if taken, otherwise try to mark it
    pub fn toggle(&self, day: NaiveDate) -> Result<Regimen> {
        if self.is_taken(day) {
            Ok(self.unmark(day))
        } else {
            self.mark_taken(day)
        }
    }
}
