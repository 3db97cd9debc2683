//! Regimen construction and the start-date edit transaction.

use crate::{DoseLedger, Regimen, Result, Rule, SchedulePolicy};
use chrono::NaiveDate;

impl Regimen {
    /// A regimen with an empty ledger
    ///
    /// The policy's first era is stretched back to `start_date` if needed so
    /// every day from the start onwards has a governing era.
    pub fn new(start_date: NaiveDate, policy: SchedulePolicy) -> Self {
        Self {
            start_date,
            policy: policy.extended_to(start_date),
            ledger: DoseLedger::new(),
        }
    }

    /// Start tracking: the first recorded dose is taken on `start_date`
    pub fn begin(start_date: NaiveDate, policy: SchedulePolicy) -> Self {
        let mut regimen = Self::new(start_date, policy);
        regimen.ledger.insert(start_date);
        tracing::info!("Started regimen on {}", start_date);
        regimen
    }

    /// Assemble a regimen from stored parts, dropping entries before the start
    pub(crate) fn from_parts(
        start_date: NaiveDate,
        policy: SchedulePolicy,
        mut ledger: DoseLedger,
    ) -> Self {
        let pruned = ledger.prune_before(start_date);
        if pruned > 0 {
            tracing::warn!(
                "Dropped {} ledger entries dated before start {}",
                pruned,
                start_date
            );
        }
        Self {
            start_date,
            policy: policy.extended_to(start_date),
            ledger,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    pub fn ledger(&self) -> &DoseLedger {
        &self.ledger
    }

    pub fn is_dose_day(&self, day: NaiveDate) -> bool {
        crate::policy::is_dose_day(day, self.start_date, &self.policy)
    }

    /// Move the treatment start to `new_date`
    ///
    /// Applies three changes as one transition: the start date is replaced,
    /// entries before `new_date` are dropped, and `new_date` is recorded as
    /// taken without consulting the schedule. The new value is built in full
    /// before it is returned, so callers never see a partial edit.
    pub fn set_start_date(&self, new_date: NaiveDate) -> Regimen {
        let mut ledger = self.ledger.clone();
        let pruned = ledger.prune_before(new_date);
        ledger.insert(new_date);

        tracing::info!(
            "Moved start date {} -> {} ({} entries pruned)",
            self.start_date,
            new_date,
            pruned
        );

        Regimen {
            start_date: new_date,
            policy: self.policy.extended_to(new_date),
            ledger,
        }
    }

    /// Switch the schedule to `rule` from `from` onwards, keeping history
    pub fn migrate_policy(&self, from: NaiveDate, rule: Rule) -> Result<Regimen> {
        let policy = self.policy.migrate(from, rule)?;
        Ok(Regimen {
            start_date: self.start_date,
            policy: policy.extended_to(self.start_date),
            ledger: self.ledger.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn daily_regimen_with_history(start: NaiveDate, days: i64) -> Regimen {
        let mut regimen = Regimen::begin(start, SchedulePolicy::single(start, Rule::Daily));
        for offset in 1..days {
            regimen = regimen.mark_taken(start + Duration::days(offset)).unwrap();
        }
        regimen
    }

    #[test]
    fn test_begin_marks_start() {
        let start = date("2025-03-28");
        let regimen = Regimen::begin(start, SchedulePolicy::single(start, Rule::Daily));

        assert_eq!(regimen.start_date(), start);
        assert!(regimen.is_taken(start));
        assert_eq!(regimen.ledger().len(), 1);
    }

    #[test]
    fn test_set_start_date_later_prunes_entries() {
        let start = date("2025-03-28");
        let regimen = daily_regimen_with_history(start, 10);
        let new_start = start + Duration::days(4);

        let moved = regimen.set_start_date(new_start);

        assert_eq!(moved.start_date(), new_start);
        assert!(moved.ledger().taken_days().all(|d| d >= new_start));
        assert!(moved.is_taken(new_start));
        assert_eq!(moved.ledger().len(), 6);
        // The original regimen is untouched
        assert_eq!(regimen.ledger().len(), 10);
    }

    #[test]
    fn test_set_start_date_earlier_forces_entry() {
        let start = date("2025-03-28");
        let regimen = Regimen::begin(start, SchedulePolicy::single(start, Rule::WeekdaysOnly));
        let new_start = date("2025-03-22"); // Saturday

        let moved = regimen.set_start_date(new_start);

        assert!(moved.is_taken(new_start));
        assert!(moved.is_taken(start));
        // Days between the new start and the old first era are now governed
        assert!(moved.is_dose_day(date("2025-03-24")));
    }

    #[test]
    fn test_set_start_date_on_unscheduled_day() {
        let start = date("2025-03-28");
        let regimen = Regimen::begin(
            start,
            SchedulePolicy::single(start, Rule::EveryNDays { n: 2, anchor: start }),
        );
        let new_start = start + Duration::days(3);
        assert!(!regimen.is_dose_day(new_start));

        let moved = regimen.set_start_date(new_start);
        assert!(moved.is_taken(new_start));
    }

    #[test]
    fn test_set_start_date_invariant_for_any_history() {
        let start = date("2025-01-01");
        let regimen = daily_regimen_with_history(start, 40);

        for offset in [-5, 0, 1, 17, 39, 60] {
            let new_start = start + Duration::days(offset);
            let moved = regimen.set_start_date(new_start);
            assert!(moved.ledger().taken_days().all(|d| d >= new_start));
            assert!(moved.is_taken(new_start), "offset {}", offset);
        }
    }

    #[test]
    fn test_from_parts_drops_stale_entries() {
        let start = date("2025-03-28");
        let ledger: DoseLedger = [date("2025-03-20"), start].into_iter().collect();

        let regimen =
            Regimen::from_parts(start, SchedulePolicy::single(start, Rule::Daily), ledger);
        assert_eq!(regimen.ledger().len(), 1);
        assert!(regimen.is_taken(start));
    }

    #[test]
    fn test_migrate_policy_keeps_ledger() {
        let start = date("2025-03-28");
        let regimen = daily_regimen_with_history(start, 5);
        let switch = start + Duration::days(5);

        let migrated = regimen
            .migrate_policy(switch, Rule::EveryNDays { n: 2, anchor: switch })
            .unwrap();

        assert_eq!(migrated.ledger(), regimen.ledger());
        assert!(migrated.is_dose_day(start + Duration::days(3)));
        assert!(!migrated.is_dose_day(switch + Duration::days(1)));
    }
}
