//! CSV export of per-day statuses.

use crate::analytics::{window, Analytics};
use crate::Result;
use chrono::NaiveDate;
use std::io::Write;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    scheduled: bool,
    status: &'static str,
}

/// Write one row per day in `[from, to]` and return the number of rows
///
/// The window is capped the same way as the calendar day sets.
pub fn export_day_statuses<W: Write>(
    analytics: &Analytics<'_>,
    from: NaiveDate,
    to: NaiveDate,
    writer: W,
) -> Result<usize> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    let mut count = 0;
    for day in window(from, to) {
        csv_writer.serialize(CsvRow {
            date: day.to_string(),
            scheduled: analytics.regimen().is_dose_day(day),
            status: analytics.classify(day).as_str(),
        })?;
        count += 1;
    }

    csv_writer.flush()?;
    tracing::info!("Exported {} day statuses ({} to {})", count, from, to);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Regimen, Rule, SchedulePolicy};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_export_rows() {
        let start = date("2025-03-28");
        let regimen = Regimen::begin(
            start,
            SchedulePolicy::single(start, Rule::EveryNDays { n: 2, anchor: start }),
        );
        let analytics = Analytics::new(&regimen, date("2025-03-31"));

        let mut buffer = Vec::new();
        let count = export_day_statuses(
            &analytics,
            date("2025-03-27"),
            date("2025-04-01"),
            &mut buffer,
        )
        .unwrap();

        assert_eq!(count, 6);
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "date,scheduled,status");
        assert_eq!(lines[1], "2025-03-27,false,not_scheduled");
        assert_eq!(lines[2], "2025-03-28,true,taken");
        assert_eq!(lines[3], "2025-03-29,false,not_scheduled");
        assert_eq!(lines[4], "2025-03-30,true,missed");
        assert_eq!(lines[5], "2025-03-31,false,not_scheduled");
        assert_eq!(lines[6], "2025-04-01,true,pending");
    }

    #[test]
    fn test_export_to_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("doses.csv");

        let start = date("2025-03-28");
        let regimen = Regimen::begin(start, SchedulePolicy::single(start, Rule::Daily));
        let analytics = Analytics::new(&regimen, start);

        let file = std::fs::File::create(&path).unwrap();
        let count = export_day_statuses(&analytics, start, start, file).unwrap();
        assert_eq!(count, 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("2025-03-28,true,taken"));
    }
}
