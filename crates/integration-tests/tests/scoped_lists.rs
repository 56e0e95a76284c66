//! Department scope applied to paged list queries and item-by-item deletes.
//!
//! `RecordTable` serves rows the way the record and log repositories do:
//! newest first on `(timestamp, id)`, resuming strictly after a cursor, at
//! most `page_size` rows per query.

use std::cell::{Cell, RefCell};
use std::future::ready;

use chrono::{DateTime, Duration, Utc};

use activity_console_admin::models::{ActivityRecord, AdminLogEntry, BulkDeleteOutcome, LogFilter};
use activity_console_admin::services::bulk::{self, Lookup};
use activity_console_admin::services::export::{BOM, records_to_csv};
use activity_console_admin::services::{DepartmentScope, Paging};
use activity_console_core::{ActivityRecordId, AdminDepartment, AdminLogId, AdminRole};
use activity_console_integration_tests::{admin, fixed_time, record};

type Cursor = (DateTime<Utc>, ActivityRecordId);

struct RecordTable {
    rows: Vec<ActivityRecord>,
    queries: Cell<usize>,
}

impl RecordTable {
    fn new(mut rows: Vec<ActivityRecord>) -> Self {
        rows.sort_by(|a, b| (b.checked_in_at, b.id).cmp(&(a.checked_in_at, a.id)));
        Self {
            rows,
            queries: Cell::new(0),
        }
    }

    fn page(&self, after: Option<Cursor>, size: usize) -> Result<Vec<ActivityRecord>, String> {
        self.queries.set(self.queries.get() + 1);
        Ok(self
            .rows
            .iter()
            .filter(|r| after.is_none_or(|cursor| (r.checked_in_at, r.id) < cursor))
            .take(size)
            .cloned()
            .collect())
    }
}

/// `newer` engineering rows, all checked in after `older` science rows. Every
/// ten rows share a timestamp so the id tiebreak matters.
fn busy_engineering_table(newer: i32, older: i32) -> RecordTable {
    let base = fixed_time();
    let rows = (1..=older + newer)
        .map(|id| {
            let department = if id > older { "engineering" } else { "คณะวิทยาศาสตร์" };
            record(id, department, base + Duration::seconds(i64::from(id / 10)))
        })
        .collect();
    RecordTable::new(rows)
}

async fn collect(
    table: &RecordTable,
    scope: DepartmentScope,
    requested: Option<&str>,
    paging: Paging,
) -> Vec<ActivityRecord> {
    scope
        .collect_pages(
            requested,
            paging,
            |r: &ActivityRecord| r.department.as_str(),
            |r| (r.checked_in_at, r.id),
            |after, size| ready(table.page(after, size)),
        )
        .await
        .unwrap_or_else(|e| panic!("{e}"))
}

#[tokio::test]
async fn test_other_departments_cannot_crowd_out_a_scoped_list() {
    let table = busy_engineering_table(10_500, 40);
    let dean = admin(1, AdminRole::DepartmentAdmin, AdminDepartment::Science);

    let visible = collect(&table, DepartmentScope::of(&dean), None, Paging::up_to(10_000)).await;

    assert_eq!(visible.len(), 40);
    let ids: Vec<i32> = visible.iter().map(|r| r.id.as_i32()).collect();
    assert_eq!(ids, (1..=40).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn test_scoped_export_reads_past_the_newest_rows() {
    let table = busy_engineering_table(10_500, 40);
    let dean = admin(1, AdminRole::DepartmentAdmin, AdminDepartment::Science);

    let visible = collect(&table, DepartmentScope::of(&dean), None, Paging::all()).await;
    let bytes = records_to_csv(&visible).unwrap_or_else(|e| panic!("{e}"));
    let text = String::from_utf8(bytes.get(BOM.len()..).unwrap_or_default().to_vec())
        .unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(text.split("\r\n").filter(|l| !l.is_empty()).count(), 41);
    assert!(!text.contains("engineering"));
}

#[tokio::test]
async fn test_unrestricted_export_is_not_truncated() {
    let table = busy_engineering_table(11_000, 1_000);
    let root = admin(1, AdminRole::SuperAdmin, AdminDepartment::All);

    let everything = collect(&table, DepartmentScope::of(&root), None, Paging::all()).await;
    assert_eq!(everything.len(), 12_000);
    assert_eq!(table.queries.get(), 12_000 / Paging::DEFAULT_PAGE_SIZE + 1);

    let science = collect(
        &table,
        DepartmentScope::of(&root),
        Some("Faculty of Science"),
        Paging::all(),
    )
    .await;
    assert_eq!(science.len(), 1_000);
}

#[tokio::test]
async fn test_list_limit_counts_visible_rows() {
    let table = busy_engineering_table(3_000, 900);
    let root = admin(1, AdminRole::SuperAdmin, AdminDepartment::All);

    let limited = collect(&table, DepartmentScope::of(&root), Some("science"), Paging::up_to(250)).await;
    assert_eq!(limited.len(), 250);
    assert_eq!(limited.first().map(|r| r.id.as_i32()), Some(900));
}

fn log_entry(id: i32, department: &str, at: DateTime<Utc>) -> AdminLogEntry {
    AdminLogEntry {
        id: AdminLogId::new(id),
        actor_id: None,
        actor_email: "dean@uni.ac.th".to_owned(),
        action: "activity.update".to_owned(),
        target_type: "activity".to_owned(),
        target_id: Some(id.to_string()),
        department: department.to_owned(),
        details: serde_json::Value::Null,
        created_at: at,
    }
}

#[tokio::test]
async fn test_audit_log_limit_applies_after_scope() {
    let base = fixed_time();
    let mut entries: Vec<AdminLogEntry> = (1..=1_500)
        .map(|id| {
            let department = if id > 300 { "nursing" } else { "คณะเกษตรศาสตร์" };
            log_entry(id, department, base + Duration::seconds(i64::from(id)))
        })
        .collect();
    entries.reverse();

    let page = |after: Option<(DateTime<Utc>, AdminLogId)>, size: usize| {
        ready(Ok::<_, String>(
            entries
                .iter()
                .filter(|e| after.is_none_or(|cursor| (e.created_at, e.id) < cursor))
                .take(size)
                .cloned()
                .collect::<Vec<_>>(),
        ))
    };

    let viewer = admin(2, AdminRole::Viewer, AdminDepartment::Agriculture);
    let visible = DepartmentScope::of(&viewer)
        .collect_pages(
            None,
            Paging::up_to(LogFilter::default().limit()),
            |e: &AdminLogEntry| e.department.as_str(),
            |e| (e.created_at, e.id),
            page,
        )
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(visible.len(), LogFilter::DEFAULT_LIMIT);
    assert!(visible.iter().all(|e| e.department == "คณะเกษตรศาสตร์"));
    assert_eq!(visible.first().map(|e| e.id.as_i32()), Some(300));
}

#[tokio::test]
async fn test_bulk_delete_reports_work_done_before_a_store_failure() {
    let at = fixed_time();
    let table = RefCell::new(vec![
        record(1, "science", at),
        record(2, "engineering", at),
        record(3, "คณะวิทยาศาสตร์", at),
        record(4, "science", at),
        record(5, "science", at),
    ]);
    let dean = admin(1, AdminRole::DepartmentAdmin, AdminDepartment::Science);
    let scope = DepartmentScope::of(&dean);
    let ids: Vec<ActivityRecordId> = [1, 2, 9, 3, 4, 5].map(ActivityRecordId::new).to_vec();

    let run = bulk::delete_each(
        ids,
        |id| {
            let found = table.borrow().iter().find(|r| r.id == id).map(|r| r.department.clone());
            ready(Ok::<_, String>(match found {
                None => Lookup::Missing,
                Some(dept) if !scope.allows(&dept) => Lookup::OutOfScope,
                Some(_) => Lookup::Deletable,
            }))
        },
        |id| {
            if id == ActivityRecordId::new(4) {
                return ready(Err("connection reset by peer".to_owned()));
            }
            let mut rows = table.borrow_mut();
            let before = rows.len();
            rows.retain(|r| r.id != id);
            ready(Ok(rows.len() < before))
        },
    )
    .await;

    assert_eq!(
        run.outcome,
        BulkDeleteOutcome {
            deleted: 2,
            skipped: 2,
            failed: 2,
        }
    );
    assert_eq!(run.deleted_ids, vec![ActivityRecordId::new(1), ActivityRecordId::new(3)]);
    assert!(run.error.is_some());

    let remaining: Vec<i32> = table.borrow().iter().map(|r| r.id.as_i32()).collect();
    assert_eq!(remaining, vec![2, 4, 5]);
}
