//! Attendance records.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use activity_console_core::ActivityRecordId;

/// Offset of Asia/Bangkok, which has no daylight saving.
const BANGKOK_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// The console's local time zone (UTC+7).
#[must_use]
pub fn bangkok() -> FixedOffset {
    FixedOffset::east_opt(BANGKOK_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// One student checking in to one activity.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub id: ActivityRecordId,
    pub activity_code: String,
    pub activity_name: String,
    /// Student number.
    pub student_id: String,
    pub student_name: String,
    /// Stored as written; may be a legacy label.
    pub department: String,
    pub major: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub checked_in_at: DateTime<Utc>,
}

/// A record about to be inserted.
#[derive(Debug, Clone)]
pub struct NewActivityRecord {
    pub activity_code: String,
    pub activity_name: String,
    pub student_id: String,
    pub student_name: String,
    pub department: String,
    pub major: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Query-string filters shared by the list and export endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordFilter {
    pub activity_code: Option<String>,
    pub department: Option<String>,
    /// First local day included.
    pub from: Option<NaiveDate>,
    /// Last local day included.
    pub to: Option<NaiveDate>,
    /// Matches student number or name.
    pub search: Option<String>,
}

impl RecordFilter {
    /// Convert the local date range into a half-open UTC range.
    #[must_use]
    pub fn utc_range(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let tz = bangkok();
        let start_of = |day: NaiveDate| {
            tz.from_local_datetime(&day.and_time(NaiveTime::MIN))
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        };
        let from = self.from.and_then(start_of);
        let to = self
            .to
            .and_then(|day| day.succ_opt())
            .and_then(start_of);
        (from, to)
    }

    /// Trimmed, non-empty search term.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Body of `POST /api/records/bulk-delete`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<ActivityRecordId>,
}

/// Outcome of a bulk delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeleteOutcome {
    pub deleted: usize,
    /// Missing or outside the caller's scope.
    pub skipped: usize,
    /// Not processed because the store failed partway through.
    pub failed: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_range_uses_bangkok_midnight() {
        let filter = RecordFilter {
            from: NaiveDate::from_ymd_opt(2024, 3, 1),
            to: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..RecordFilter::default()
        };
        let (from, to) = filter.utc_range();
        assert_eq!(
            from.unwrap().to_rfc3339(),
            "2024-02-29T17:00:00+00:00"
        );
        assert_eq!(to.unwrap().to_rfc3339(), "2024-03-01T17:00:00+00:00");
    }

    #[test]
    fn test_blank_search_ignored() {
        let filter = RecordFilter {
            search: Some("   ".to_string()),
            ..RecordFilter::default()
        };
        assert_eq!(filter.search_term(), None);
    }
}
