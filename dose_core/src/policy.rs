//! Schedule policy resolution.
//!
//! A policy is a timeline of eras. To classify a day we find the era with the
//! greatest `effective_from` at or before it and apply that era's rule. Days
//! before the treatment start are never dose days.

use crate::{Era, Error, Result, Rule, SchedulePolicy};
use chrono::{Datelike, NaiveDate, Weekday};

impl Rule {
    /// Whether this rule schedules a dose on `day`
    pub fn applies_to(&self, day: NaiveDate) -> bool {
        match *self {
            Rule::Daily => true,
            Rule::WeekdaysOnly => !matches!(day.weekday(), Weekday::Sat | Weekday::Sun),
            Rule::EveryNDays { n, anchor } => {
                if n == 0 {
                    return false;
                }
                let elapsed = day.signed_duration_since(anchor).num_days();
                elapsed >= 0 && elapsed % i64::from(n) == 0
            }
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Rule::EveryNDays { n: 0, .. } => Err(Error::InvalidPolicy(
                "every_n_days requires n >= 1".into(),
            )),
            _ => Ok(()),
        }
    }
}

impl SchedulePolicy {
    /// Build a policy from eras sorted by `effective_from`
    ///
    /// Rejects an empty list, duplicate or descending boundaries, and
    /// `EveryNDays` rules with `n == 0`.
    pub fn new(eras: Vec<Era>) -> Result<Self> {
        if eras.is_empty() {
            return Err(Error::InvalidPolicy("policy needs at least one era".into()));
        }

        for era in &eras {
            era.rule.validate()?;
        }

        if let Some(pair) = eras
            .windows(2)
            .find(|pair| pair[0].effective_from >= pair[1].effective_from)
        {
            return Err(Error::InvalidPolicy(format!(
                "era starting {} must come after era starting {}",
                pair[1].effective_from, pair[0].effective_from
            )));
        }

        Ok(Self { eras })
    }

    /// A single-era policy effective from `effective_from` onwards
    pub fn single(effective_from: NaiveDate, rule: Rule) -> Self {
        Self {
            eras: vec![Era {
                effective_from,
                rule,
            }],
        }
    }

    pub fn eras(&self) -> &[Era] {
        &self.eras
    }

    /// The era governing `day`, if any era has begun by then
    pub fn era_for(&self, day: NaiveDate) -> Option<&Era> {
        // First era whose boundary is after `day`; the one before it governs.
        let idx = self.eras.partition_point(|era| era.effective_from <= day);
        idx.checked_sub(1).map(|i| &self.eras[i])
    }

    /// Classify `day` for a regimen that started on `start_date`
    pub fn is_dose_day(&self, day: NaiveDate, start_date: NaiveDate) -> bool {
        is_dose_day(day, start_date, self)
    }

    /// Switch to `rule` from `from` onwards
    ///
    /// Eras starting before `from` are kept as-is, so every day before `from`
    /// keeps its classification. Eras at or after `from` are replaced.
    pub fn migrate(&self, from: NaiveDate, rule: Rule) -> Result<Self> {
        rule.validate()?;

        let mut eras: Vec<Era> = self
            .eras
            .iter()
            .copied()
            .filter(|era| era.effective_from < from)
            .collect();
        eras.push(Era {
            effective_from: from,
            rule,
        });

        tracing::debug!("Migrated schedule to {:?} from {}", rule, from);
        Self::new(eras)
    }

    /// Make sure the first era covers `start_date`
    ///
    /// Used when the start date moves earlier than the first boundary; only
    /// days that were previously unscheduled (before the first era) change.
    pub(crate) fn extended_to(&self, start_date: NaiveDate) -> Self {
        let mut eras = self.eras.clone();
        if let Some(first) = eras.first_mut() {
            if first.effective_from > start_date {
                first.effective_from = start_date;
            }
        }
        Self { eras }
    }
}

impl TryFrom<Vec<Era>> for SchedulePolicy {
    type Error = Error;

    fn try_from(eras: Vec<Era>) -> Result<Self> {
        Self::new(eras)
    }
}

impl From<SchedulePolicy> for Vec<Era> {
    fn from(policy: SchedulePolicy) -> Self {
        policy.eras
    }
}

/// Whether `day` is a scheduled dose day
///
/// Days before `start_date`, or before the first era begins, are never dose
/// days. A day equal to an era boundary belongs to the new era.
pub fn is_dose_day(day: NaiveDate, start_date: NaiveDate, policy: &SchedulePolicy) -> bool {
    if day < start_date {
        return false;
    }

    policy
        .era_for(day)
        .map(|era| era.rule.applies_to(day))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn every_other_day(anchor: NaiveDate) -> Rule {
        Rule::EveryNDays { n: 2, anchor }
    }

    #[test]
    fn test_daily_rule() {
        let start = date("2025-03-28");
        let policy = SchedulePolicy::single(start, Rule::Daily);

        for offset in 0..30 {
            assert!(is_dose_day(start + Duration::days(offset), start, &policy));
        }
    }

    #[test]
    fn test_weekdays_only_rule() {
        let start = date("2025-05-05"); // Monday
        let policy = SchedulePolicy::single(start, Rule::WeekdaysOnly);

        assert!(is_dose_day(date("2025-05-09"), start, &policy)); // Friday
        assert!(!is_dose_day(date("2025-05-10"), start, &policy)); // Saturday
        assert!(!is_dose_day(date("2025-05-11"), start, &policy)); // Sunday
        assert!(is_dose_day(date("2025-05-12"), start, &policy)); // Monday
    }

    #[test]
    fn test_every_other_day_rule() {
        let start = date("2025-03-28");
        let policy = SchedulePolicy::single(start, every_other_day(start));

        assert!(is_dose_day(start, start, &policy));
        assert!(!is_dose_day(start + Duration::days(1), start, &policy));
        assert!(is_dose_day(start + Duration::days(2), start, &policy));
        assert!(is_dose_day(start + Duration::days(4), start, &policy));
    }

    #[test]
    fn test_every_n_days_counts_whole_days_across_month_boundary() {
        let anchor = date("2025-01-30");
        let rule = Rule::EveryNDays { n: 3, anchor };

        assert!(rule.applies_to(date("2025-02-02")));
        assert!(!rule.applies_to(date("2025-02-03")));
        assert!(!rule.applies_to(date("2025-01-27"))); // before the anchor
    }

    #[test]
    fn test_days_before_start_are_never_dose_days() {
        let start = date("2025-03-28");
        let policies = [
            SchedulePolicy::single(date("2020-01-01"), Rule::Daily),
            SchedulePolicy::single(date("2020-01-01"), Rule::WeekdaysOnly),
            SchedulePolicy::single(date("2020-01-01"), every_other_day(date("2020-01-01"))),
        ];

        for policy in &policies {
            for offset in 1..60 {
                let day = start - Duration::days(offset);
                assert!(!is_dose_day(day, start, policy), "{} under {:?}", day, policy);
            }
        }
    }

    #[test]
    fn test_boundary_day_belongs_to_new_era() {
        let start = date("2025-03-28");
        let switch = date("2025-05-13");
        let policy = SchedulePolicy::new(vec![
            Era {
                effective_from: start,
                rule: Rule::Daily,
            },
            Era {
                effective_from: switch,
                rule: Rule::EveryNDays {
                    n: 2,
                    anchor: date("2025-05-14"),
                },
            },
        ])
        .unwrap();

        // Daily would schedule it, the new era does not.
        assert!(!is_dose_day(switch, start, &policy));
        assert!(is_dose_day(switch - Duration::days(1), start, &policy));
        assert!(is_dose_day(date("2025-05-14"), start, &policy));
    }

    #[test]
    fn test_era_for_selects_latest_started_era() {
        let policy = SchedulePolicy::new(vec![
            Era {
                effective_from: date("2025-01-01"),
                rule: Rule::Daily,
            },
            Era {
                effective_from: date("2025-02-01"),
                rule: Rule::WeekdaysOnly,
            },
        ])
        .unwrap();

        assert!(policy.era_for(date("2024-12-31")).is_none());
        assert_eq!(policy.era_for(date("2025-01-31")).unwrap().rule, Rule::Daily);
        assert_eq!(
            policy.era_for(date("2025-02-01")).unwrap().rule,
            Rule::WeekdaysOnly
        );
        assert_eq!(
            policy.era_for(date("2030-06-01")).unwrap().rule,
            Rule::WeekdaysOnly
        );
    }

    #[test]
    fn test_new_rejects_invalid_timelines() {
        assert!(matches!(
            SchedulePolicy::new(vec![]),
            Err(Error::InvalidPolicy(_))
        ));

        let unordered = vec![
            Era {
                effective_from: date("2025-02-01"),
                rule: Rule::Daily,
            },
            Era {
                effective_from: date("2025-01-01"),
                rule: Rule::Daily,
            },
        ];
        assert!(SchedulePolicy::new(unordered).is_err());

        let duplicate = vec![
            Era {
                effective_from: date("2025-01-01"),
                rule: Rule::Daily,
            },
            Era {
                effective_from: date("2025-01-01"),
                rule: Rule::WeekdaysOnly,
            },
        ];
        assert!(SchedulePolicy::new(duplicate).is_err());

        let zero = vec![Era {
            effective_from: date("2025-01-01"),
            rule: Rule::EveryNDays {
                n: 0,
                anchor: date("2025-01-01"),
            },
        }];
        assert!(SchedulePolicy::new(zero).is_err());
    }

    #[test]
    fn test_migrate_keeps_history() {
        let start = date("2025-03-28");
        let daily = SchedulePolicy::single(start, Rule::Daily);
        let switch = date("2025-05-13");

        let migrated = daily.migrate(switch, every_other_day(switch)).unwrap();

        let mut day = start;
        while day < switch {
            assert_eq!(
                is_dose_day(day, start, &daily),
                is_dose_day(day, start, &migrated),
                "history changed on {}",
                day
            );
            day += Duration::days(1);
        }
        assert!(is_dose_day(switch, start, &migrated));
        assert!(!is_dose_day(switch + Duration::days(1), start, &migrated));
    }

    #[test]
    fn test_migrate_replaces_later_eras() {
        let start = date("2025-01-01");
        let policy = SchedulePolicy::new(vec![
            Era {
                effective_from: start,
                rule: Rule::Daily,
            },
            Era {
                effective_from: date("2025-03-01"),
                rule: Rule::WeekdaysOnly,
            },
        ])
        .unwrap();

        let migrated = policy.migrate(date("2025-02-01"), Rule::Daily).unwrap();
        assert_eq!(migrated.eras().len(), 2);
        assert_eq!(migrated.eras()[1].effective_from, date("2025-02-01"));
        assert_eq!(migrated.eras()[1].rule, Rule::Daily);
    }

    #[test]
    fn test_moving_boundary_later_only_affects_days_between_boundaries() {
        let start = date("2025-01-01");
        let old_boundary = date("2025-02-10");
        let new_boundary = date("2025-02-20");
        let later_rule = Rule::WeekdaysOnly;

        let build = |boundary: NaiveDate| {
            SchedulePolicy::new(vec![
                Era {
                    effective_from: start,
                    rule: every_other_day(start),
                },
                Era {
                    effective_from: boundary,
                    rule: later_rule,
                },
            ])
            .unwrap()
        };
        let before = build(old_boundary);
        let after = build(new_boundary);

        let mut day = start;
        while day < date("2025-04-01") {
            if day < old_boundary || day >= new_boundary {
                assert_eq!(
                    is_dose_day(day, start, &before),
                    is_dose_day(day, start, &after),
                    "classification changed on {}",
                    day
                );
            }
            day += Duration::days(1);
        }
    }

    #[test]
    fn test_extended_to_covers_earlier_start() {
        let policy = SchedulePolicy::single(date("2025-03-28"), Rule::Daily);
        let earlier = date("2025-03-20");

        assert!(!is_dose_day(earlier, earlier, &policy));
        let extended = policy.extended_to(earlier);
        assert!(is_dose_day(earlier, earlier, &extended));
    }

    #[test]
    fn test_policy_json_roundtrip_validates() {
        let json = r#"[
            {"effective_from": "2025-03-28", "rule": {"type": "daily"}},
            {"effective_from": "2025-05-13", "rule": {"type": "every_n_days", "n": 2, "anchor": "2025-05-13"}}
        ]"#;
        let policy: SchedulePolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.eras().len(), 2);

        let encoded = serde_json::to_string(&policy).unwrap();
        let decoded: SchedulePolicy = serde_json::from_str(&encoded).unwrap();
        assert_eq!(policy, decoded);

        let bad = r#"[]"#;
        assert!(serde_json::from_str::<SchedulePolicy>(bad).is_err());
    }
}
