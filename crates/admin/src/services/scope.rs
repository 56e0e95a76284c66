//! Department scoping for list queries and mutations.
//!
//! Every admin sees either one department or all of them. Lists are fetched
//! broadly and then filtered here, since stored department values may still
//! be legacy labels that only compare equal after normalisation. Queries that
//! stop at a row limit are read page by page through
//! [`DepartmentScope::collect_pages`], so the limit counts visible rows only.

use activity_console_core::{
    AdminDepartment, GuardDenial, GuardSubject, dept_equals, normalize_department,
};

/// How [`DepartmentScope::collect_pages`] reads a keyset-paginated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Rows requested from the database per query.
    pub page_size: usize,
    /// Stop once this many visible rows are collected; `None` reads to the end.
    pub want: Option<usize>,
}

impl Paging {
    pub const DEFAULT_PAGE_SIZE: usize = 500;

    /// Read until `want` visible rows are found.
    #[must_use]
    pub const fn up_to(want: usize) -> Self {
        Self {
            page_size: Self::DEFAULT_PAGE_SIZE,
            want: Some(want),
        }
    }

    /// Read every page.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            page_size: Self::DEFAULT_PAGE_SIZE,
            want: None,
        }
    }
}

/// The slice of data one admin may see and change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartmentScope {
    department: AdminDepartment,
}

impl DepartmentScope {
    /// Scope of the given admin.
    #[must_use]
    pub fn of<S: GuardSubject + ?Sized>(subject: &S) -> Self {
        Self {
            department: subject.department(),
        }
    }

    #[must_use]
    pub const fn department(&self) -> AdminDepartment {
        self.department
    }

    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        self.department.is_wildcard()
    }

    /// Returns true if a record tagged `record_department` is visible.
    #[must_use]
    pub fn allows(&self, record_department: &str) -> bool {
        dept_equals(record_department, self.department.key())
    }

    /// Whether an admin or invite assigned to `department` falls in this scope.
    ///
    /// Stricter than [`DepartmentScope::allows`]: a wildcard assignment is only
    /// visible to an unrestricted scope.
    #[must_use]
    pub fn covers(&self, department: AdminDepartment) -> bool {
        self.is_unrestricted() || (!department.is_wildcard() && department == self.department)
    }

    /// Keep only the items this scope can see, optionally narrowed further by
    /// a department filter from the request.
    pub fn filter<T, F>(&self, items: Vec<T>, requested: Option<&str>, department_of: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        let requested = requested
            .map(normalize_department)
            .filter(|d| !d.is_empty());
        items
            .into_iter()
            .filter(|item| {
                let dept = department_of(item);
                self.allows(dept)
                    && requested
                        .as_deref()
                        .is_none_or(|wanted| dept_equals(dept, wanted))
            })
            .collect()
    }

    /// Walk a query page by page, keeping the rows this scope can see.
    ///
    /// `fetch` gets the cursor of the last row of the previous page (`None`
    /// for the first page) and a page size, and must return rows in the
    /// cursor's order. Out-of-scope rows are read past, so a department admin
    /// gets `want` of their own rows even when other departments fill whole
    /// pages.
    ///
    /// # Errors
    ///
    /// Returns the first error from `fetch`.
    pub async fn collect_pages<T, C, E, D, K, F, Fut>(
        &self,
        requested: Option<&str>,
        paging: Paging,
        department_of: D,
        cursor_of: K,
        mut fetch: F,
    ) -> Result<Vec<T>, E>
    where
        D: Fn(&T) -> &str,
        K: Fn(&T) -> C,
        F: FnMut(Option<C>, usize) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<T>, E>>,
    {
        let page_size = paging.page_size.max(1);
        let mut kept = Vec::new();
        let mut cursor = None;

        loop {
            let page = fetch(cursor.take(), page_size).await?;
            let exhausted = page.len() < page_size;
            cursor = page.last().map(&cursor_of);
            kept.extend(self.filter(page, requested, &department_of));

            if let Some(want) = paging.want {
                if kept.len() >= want {
                    kept.truncate(want);
                    break;
                }
            }
            if exhausted || cursor.is_none() {
                break;
            }
        }
        Ok(kept)
    }

    /// Deny access to a record outside this scope.
    ///
    /// # Errors
    ///
    /// Returns `GuardDenial::DepartmentNotAllowed` when out of scope.
    pub fn ensure(&self, record_department: &str) -> Result<(), GuardDenial> {
        if self.allows(record_department) {
            Ok(())
        } else {
            Err(GuardDenial::DepartmentNotAllowed(self.department))
        }
    }

    /// Department to store on a new or edited record.
    ///
    /// Scoped admins always write into their own department. Unrestricted
    /// admins must name a department; `all` is not a valid record tag.
    ///
    /// # Errors
    ///
    /// Returns `ScopeWriteError::Denied` when a scoped admin asks for another
    /// department, and `MissingDepartment`, `WildcardReserved` or
    /// `UnknownDepartment` when an unrestricted admin names no usable one.
    pub fn resolve_for_write(&self, requested: Option<&str>) -> Result<String, ScopeWriteError> {
        let requested = requested.map(str::trim).filter(|r| !r.is_empty());

        if self.is_unrestricted() {
            let raw = requested.ok_or(ScopeWriteError::MissingDepartment)?;
            return match AdminDepartment::parse_lenient(raw) {
                Some(AdminDepartment::All) => Err(ScopeWriteError::WildcardReserved),
                Some(dept) => Ok(dept.key().to_owned()),
                None => Err(ScopeWriteError::UnknownDepartment(raw.to_owned())),
            };
        }

        if let Some(raw) = requested {
            let wildcard = AdminDepartment::parse_lenient(raw) == Some(AdminDepartment::All);
            if wildcard || !dept_equals(raw, self.department.key()) {
                return Err(ScopeWriteError::Denied(GuardDenial::DepartmentNotAllowed(
                    self.department,
                )));
            }
        }
        Ok(self.department.key().to_owned())
    }
}

/// Why a department could not be chosen for a write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeWriteError {
    #[error("a department is required")]
    MissingDepartment,
    #[error("the 'all' department cannot be assigned to a record")]
    WildcardReserved,
    #[error("unknown department: {0}")]
    UnknownDepartment(String),
    #[error(transparent)]
    Denied(GuardDenial),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use activity_console_core::{AdminPermission, AdminRole};

    use super::*;

    struct Subject(AdminDepartment);

    impl GuardSubject for Subject {
        fn role(&self) -> AdminRole {
            AdminRole::DepartmentAdmin
        }
        fn department(&self) -> AdminDepartment {
            self.0
        }
        fn permissions(&self) -> &[AdminPermission] {
            &[]
        }
    }

    #[test]
    fn test_scoped_filter_uses_normalised_equality() {
        let scope = DepartmentScope::of(&Subject(AdminDepartment::Engineering));
        let items = vec!["engineering", "คณะวิศวกรรมศาสตร์", "science", ""];
        let visible = scope.filter(items, None, |d| *d);
        assert_eq!(visible, vec!["engineering", "คณะวิศวกรรมศาสตร์"]);
    }

    #[test]
    fn test_unrestricted_filter_honours_request() {
        let scope = DepartmentScope::of(&Subject(AdminDepartment::All));
        let items = vec!["engineering", "science", "คณะวิทยาศาสตร์"];
        assert_eq!(scope.filter(items.clone(), None, |d| *d).len(), 3);
        assert_eq!(
            scope.filter(items, Some("Faculty of Science"), |d| *d),
            vec!["science", "คณะวิทยาศาสตร์"]
        );
    }

    /// Rows `(id, department)` served newest-first in pages, the way a
    /// keyset query over `ORDER BY id DESC` would.
    fn paged(
        rows: &[(i32, &'static str)],
        after: Option<i32>,
        size: usize,
    ) -> Result<Vec<(i32, &'static str)>, String> {
        Ok(rows
            .iter()
            .filter(|(id, _)| after.is_none_or(|a| *id < a))
            .take(size)
            .copied()
            .collect())
    }

    fn newest_first(engineering: i32, science: i32) -> Vec<(i32, &'static str)> {
        let total = engineering + science;
        (1..=total)
            .rev()
            .map(|id| (id, if id > science { "engineering" } else { "คณะวิทยาศาสตร์" }))
            .collect()
    }

    #[tokio::test]
    async fn test_pages_read_past_other_departments() {
        // 1200 newer engineering rows in front of 30 science rows.
        let rows = newest_first(1200, 30);
        let scope = DepartmentScope::of(&Subject(AdminDepartment::Science));

        let mut queries = 0;
        let visible = scope
            .collect_pages(
                None,
                Paging {
                    page_size: 500,
                    want: Some(20),
                },
                |r: &(i32, &'static str)| r.1,
                |r| r.0,
                |after, size| {
                    queries += 1;
                    std::future::ready(paged(&rows, after, size))
                },
            )
            .await
            .unwrap();

        assert_eq!(visible.len(), 20);
        assert!(visible.iter().all(|(_, dept)| *dept == "คณะวิทยาศาสตร์"));
        assert_eq!(visible.first().map(|r| r.0), Some(30));
        assert_eq!(queries, 3);
    }

    #[tokio::test]
    async fn test_reading_to_the_end_is_not_capped() {
        let rows = newest_first(7, 1205);
        let everything = DepartmentScope::of(&Subject(AdminDepartment::All));

        let all = everything
            .collect_pages(
                Some("science"),
                Paging::all(),
                |r: &(i32, &'static str)| r.1,
                |r| r.0,
                |after, size| std::future::ready(paged(&rows, after, size)),
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 1205);
    }

    #[tokio::test]
    async fn test_page_errors_propagate() {
        let scope = DepartmentScope::of(&Subject(AdminDepartment::Science));
        let result: Result<Vec<(i32, &'static str)>, String> = scope
            .collect_pages(
                None,
                Paging::up_to(10),
                |r: &(i32, &'static str)| r.1,
                |r| r.0,
                |_, _| std::future::ready(Err("connection reset".to_owned())),
            )
            .await;
        assert_eq!(result, Err("connection reset".to_owned()));
    }

    #[test]
    fn test_ensure_denies_other_department() {
        let scope = DepartmentScope::of(&Subject(AdminDepartment::Nursing));
        assert!(scope.ensure("คณะพยาบาลศาสตร์").is_ok());
        assert_eq!(
            scope.ensure("science"),
            Err(GuardDenial::DepartmentNotAllowed(AdminDepartment::Nursing))
        );
    }

    #[test]
    fn test_covers_hides_wildcard_from_scoped_admins() {
        let scoped = DepartmentScope::of(&Subject(AdminDepartment::Science));
        assert!(scoped.covers(AdminDepartment::Science));
        assert!(!scoped.covers(AdminDepartment::Nursing));
        assert!(!scoped.covers(AdminDepartment::All));

        let everything = DepartmentScope::of(&Subject(AdminDepartment::All));
        assert!(everything.covers(AdminDepartment::All));
        assert!(everything.covers(AdminDepartment::Nursing));
    }

    #[test]
    fn test_resolve_for_write() {
        let scoped = DepartmentScope::of(&Subject(AdminDepartment::Science));
        assert_eq!(scoped.resolve_for_write(None).as_deref(), Ok("science"));
        assert_eq!(scoped.resolve_for_write(Some("คณะวิทยาศาสตร์")).as_deref(), Ok("science"));
        assert!(matches!(
            scoped.resolve_for_write(Some("engineering")),
            Err(ScopeWriteError::Denied(_))
        ));
        assert!(matches!(
            scoped.resolve_for_write(Some("all")),
            Err(ScopeWriteError::Denied(_))
        ));

        let everything = DepartmentScope::of(&Subject(AdminDepartment::All));
        assert_eq!(
            everything.resolve_for_write(None),
            Err(ScopeWriteError::MissingDepartment)
        );
        assert_eq!(
            everything.resolve_for_write(Some("all")),
            Err(ScopeWriteError::WildcardReserved)
        );
        assert_eq!(everything.resolve_for_write(Some("it")).as_deref(), Ok("information_technology"));
    }
}
