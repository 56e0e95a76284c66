//! Attendance CSV export.
//!
//! Output is UTF-8 with a byte-order mark so spreadsheet tools detect the
//! encoding, CRLF line endings, and RFC 4180 quoting. Dates use the Thai
//! Buddhist calendar and all times are shown in Bangkok time.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::models::{ActivityRecord, bangkok};

/// UTF-8 byte-order mark.
pub const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column headings, in output order.
pub const HEADER: [&str; 9] = [
    "วันที่",
    "เวลา",
    "รหัสนักศึกษา",
    "ชื่อ-นามสกุล",
    "คณะ",
    "สาขา",
    "รหัสกิจกรรม",
    "ชื่อกิจกรรม",
    "สถานที่",
];

/// Years between the Gregorian and Thai Buddhist calendars.
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV buffer error: {0}")]
    Buffer(String),
}

/// `d/m/yyyy` in the Buddhist era, Bangkok local date.
#[must_use]
pub fn thai_date(at: DateTime<Utc>) -> String {
    let local = at.with_timezone(&bangkok());
    format!(
        "{}/{}/{}",
        local.day(),
        local.month(),
        local.year() + BUDDHIST_ERA_OFFSET
    )
}

/// `HH:MM:SS`, Bangkok local time.
#[must_use]
pub fn thai_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&bangkok()).format("%H:%M:%S").to_string()
}

/// Download filename for an export produced on `day`.
#[must_use]
pub fn export_filename(day: NaiveDate) -> String {
    format!("attendance-{}.csv", day.format("%Y%m%d"))
}

/// Render records as CSV bytes (BOM + header + one line per record).
///
/// # Errors
///
/// Returns `ExportError` if the CSV writer fails.
pub fn records_to_csv(records: &[ActivityRecord]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::with_capacity(BOM.len() + 128 * (records.len() + 1));
    buffer.extend_from_slice(BOM);

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(buffer);

    writer.write_record(HEADER)?;
    for record in records {
        writer.write_record([
            thai_date(record.checked_in_at).as_str(),
            thai_time(record.checked_in_at).as_str(),
            record.student_id.as_str(),
            record.student_name.as_str(),
            record.department.as_str(),
            record.major.as_str(),
            record.activity_code.as_str(),
            record.activity_name.as_str(),
            record.location.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.error().to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use activity_console_core::ActivityRecordId;

    use super::*;

    fn record(id: i32, name: &str, location: &str, at: DateTime<Utc>) -> ActivityRecord {
        ActivityRecord {
            id: ActivityRecordId::new(id),
            activity_code: "AB12CD".to_string(),
            activity_name: "ปฐมนิเทศ".to_string(),
            student_id: format!("640000{id}"),
            student_name: name.to_string(),
            department: "engineering".to_string(),
            major: "Computer Engineering".to_string(),
            location: location.to_string(),
            latitude: None,
            longitude: None,
            checked_in_at: at,
        }
    }

    #[test]
    fn test_buddhist_date_in_bangkok() {
        // 2024-03-01 18:30 UTC is 2024-03-02 01:30 in Bangkok.
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 18, 30, 5).unwrap();
        assert_eq!(thai_date(at), "2/3/2567");
        assert_eq!(thai_time(at), "01:30:05");
    }

    #[test]
    fn test_filename() {
        let day = NaiveDate::from_ymd_opt(2024, 12, 5).unwrap();
        assert_eq!(export_filename(day), "attendance-20241205.csv");
    }

    #[test]
    fn test_two_rows_with_bom_header_and_quoting() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap();
        let rows = vec![
            record(1, "สมชาย ใจดี", "หอประชุม, ชั้น 2", at),
            record(2, "Jane \"JJ\" Doe", "Lab\nB", at),
        ];
        let bytes = records_to_csv(&rows).unwrap();
        assert!(bytes.starts_with(BOM));

        let text = String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap();
        let mut lines = text.split("\r\n");
        assert_eq!(
            lines.next().unwrap(),
            "วันที่,เวลา,รหัสนักศึกษา,ชื่อ-นามสกุล,คณะ,สาขา,รหัสกิจกรรม,ชื่อกิจกรรม,สถานที่"
        );
        assert_eq!(
            lines.next().unwrap(),
            "15/1/2567,09:00:00,6400001,สมชาย ใจดี,engineering,Computer Engineering,AB12CD,ปฐมนิเทศ,\"หอประชุม, ชั้น 2\""
        );
        assert_eq!(
            lines.next().unwrap(),
            "15/1/2567,09:00:00,6400002,\"Jane \"\"JJ\"\" Doe\",engineering,Computer Engineering,AB12CD,ปฐมนิเทศ,\"Lab\nB\""
        );
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let bytes = records_to_csv(&[]).unwrap();
        let text = String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap();
        assert_eq!(text.matches("\r\n").count(), 1);
    }
}
