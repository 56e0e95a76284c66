//! Item-by-item bulk deletes.
//!
//! Ids are handled in request order. Missing and out-of-scope ids are skipped.
//! A store error stops the run; the ids already deleted are still reported so
//! the caller can audit them, and the rest are counted as failed.

use std::future::Future;

use crate::models::BulkDeleteOutcome;

/// What the pre-delete lookup found for one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Missing,
    OutOfScope,
    Deletable,
}

/// Result of [`delete_each`].
#[derive(Debug)]
pub struct BulkDeleteRun<Id, E> {
    pub outcome: BulkDeleteOutcome,
    /// Ids removed before the run ended, in request order.
    pub deleted_ids: Vec<Id>,
    /// The store error that stopped the run early.
    pub error: Option<E>,
}

/// Look up, then delete, each id in turn.
///
/// `delete` returns false when the row vanished between lookup and delete;
/// that id counts as skipped.
pub async fn delete_each<Id, E, L, LFut, D, DFut>(
    ids: Vec<Id>,
    mut lookup: L,
    mut delete: D,
) -> BulkDeleteRun<Id, E>
where
    Id: Copy,
    L: FnMut(Id) -> LFut,
    LFut: Future<Output = Result<Lookup, E>>,
    D: FnMut(Id) -> DFut,
    DFut: Future<Output = Result<bool, E>>,
{
    let total = ids.len();
    let mut outcome = BulkDeleteOutcome::default();
    let mut deleted_ids = Vec::new();

    for (done, id) in ids.into_iter().enumerate() {
        let step = match lookup(id).await {
            Ok(Lookup::Deletable) => delete(id).await,
            Ok(Lookup::Missing | Lookup::OutOfScope) => Ok(false),
            Err(e) => Err(e),
        };
        match step {
            Ok(true) => {
                outcome.deleted += 1;
                deleted_ids.push(id);
            }
            Ok(false) => outcome.skipped += 1,
            Err(e) => {
                outcome.failed = total - done;
                return BulkDeleteRun {
                    outcome,
                    deleted_ids,
                    error: Some(e),
                };
            }
        }
    }

    BulkDeleteRun {
        outcome,
        deleted_ids,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::future::ready;

    use super::*;

    fn lookup_by_parity(id: i32) -> Result<Lookup, String> {
        Ok(match id {
            0 => Lookup::Missing,
            id if id % 2 == 0 => Lookup::OutOfScope,
            _ => Lookup::Deletable,
        })
    }

    #[tokio::test]
    async fn test_skips_missing_and_out_of_scope() {
        let run = delete_each(
            vec![1, 2, 0, 3, 5],
            |id| ready(lookup_by_parity(id)),
            |_| ready(Ok::<_, String>(true)),
        )
        .await;

        assert_eq!(
            run.outcome,
            BulkDeleteOutcome {
                deleted: 3,
                skipped: 2,
                failed: 0,
            }
        );
        assert_eq!(run.deleted_ids, vec![1, 3, 5]);
        assert!(run.error.is_none());
    }

    #[tokio::test]
    async fn test_store_error_keeps_completed_deletes() {
        let attempted = RefCell::new(Vec::new());
        let run = delete_each(
            vec![1, 3, 5, 7, 9],
            |id| ready(lookup_by_parity(id)),
            |id| {
                attempted.borrow_mut().push(id);
                ready(if id == 5 {
                    Err("connection reset".to_owned())
                } else {
                    Ok(true)
                })
            },
        )
        .await;

        assert_eq!(run.deleted_ids, vec![1, 3]);
        assert_eq!(
            run.outcome,
            BulkDeleteOutcome {
                deleted: 2,
                skipped: 0,
                failed: 3,
            }
        );
        assert_eq!(run.error.as_deref(), Some("connection reset"));
        assert_eq!(*attempted.borrow(), vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_lookup_error_stops_before_delete() {
        let run = delete_each(
            vec![1, 3],
            |id| {
                ready(if id == 1 {
                    Err("pool timed out".to_owned())
                } else {
                    lookup_by_parity(id)
                })
            },
            |_| ready(Ok::<_, String>(true)),
        )
        .await;

        assert!(run.deleted_ids.is_empty());
        assert_eq!(run.outcome.failed, 2);
        assert!(run.error.is_some());
    }

    #[tokio::test]
    async fn test_row_gone_before_delete_is_skipped() {
        let run = delete_each(
            vec![1],
            |id| ready(lookup_by_parity(id)),
            |_| ready(Ok::<_, String>(false)),
        )
        .await;
        assert_eq!(run.outcome.skipped, 1);
        assert_eq!(run.outcome.deleted, 0);
    }
}
