use crate::time::calendar;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::fmt;

/// One continuous-backup snapshot as seen during a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub do_not_delete: bool,
}

/// The calendar day whose snapshot is kept: last day of the month before the clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TargetDay(NaiveDate);

impl TargetDay {
    pub fn for_clock(now: DateTime<Utc>) -> Self {
        Self(calendar::last_day_of_previous_month(now))
    }

    pub fn for_date(as_of: NaiveDate) -> Self {
        Self(calendar::last_day_of_month_before(as_of))
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Midnight UTC at the start of the day.
    pub fn start(self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn contains(self, ts: DateTime<Utc>) -> bool {
        calendar::same_calendar_day(ts, self.start())
    }
}

impl fmt::Display for TargetDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    pub project_id: String,
    pub cluster_id: String,
}

impl ClusterRef {
    pub fn new(project_id: impl Into<String>, cluster_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            cluster_id: cluster_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn target_day_contains_whole_utc_day() {
        let target = TargetDay::for_date(NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());
        assert_eq!(target.date(), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert!(target.contains(Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap()));
        assert!(target.contains(Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap()));
        assert!(!target.contains(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()));
        assert_eq!(target.to_string(), "2024-03-31");
        assert_eq!(target.start(), Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap());
    }
}
