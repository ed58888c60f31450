use chrono::{DateTime, Utc};
use core_types::{PriceSchedule, ScheduleId, Scope};

use crate::error::{StoreError, StoreResult};

/// Mutations and reads valid inside one atomic transaction. The schedule
/// writer's close-check-insert sequence runs entirely against this handle so
/// partial application is structurally impossible.
pub trait ScheduleTx {
    /// The scope's schedule with no end instant, if any. The store upholds
    /// at most one.
    fn find_open(&mut self, scope: &Scope) -> StoreResult<Option<PriceSchedule>>;

    /// Any schedule in `scope`, other than `excluding`, whose half-open
    /// interval intersects `[from, to)` (`None` end = +inf).
    fn find_overlapping(
        &mut self,
        scope: &Scope,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
        excluding: Option<ScheduleId>,
    ) -> StoreResult<Option<PriceSchedule>>;

    fn insert(&mut self, record: &PriceSchedule) -> StoreResult<()>;

    /// Sets `effective_to` on an existing record; errors if the id is
    /// unknown.
    fn close(&mut self, id: ScheduleId, effective_to: DateTime<Utc>) -> StoreResult<()>;
}

/// Durable collection of price schedules with read queries and an atomic
/// unit-of-work primitive.
pub trait ScheduleStore: Send + Sync {
    /// Runs `work` under one transaction: commit on `Ok`, roll back on
    /// `Err`. Isolation is at least serializable per store instance; two
    /// same-scope writers cannot interleave.
    fn in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ScheduleTx) -> Result<T, E>,
        E: From<StoreError>;

    /// The schedule in `scope` whose interval contains `at`, preferring the
    /// greatest `effective_from` should more than one match. Read-only; runs
    /// outside any transaction.
    fn find_containing(&self, scope: &Scope, at: DateTime<Utc>) -> StoreResult<Option<PriceSchedule>>;

    /// Every schedule in `scope`, ordered by `effective_from`.
    fn list(&self, scope: &Scope) -> StoreResult<Vec<PriceSchedule>>;
}
