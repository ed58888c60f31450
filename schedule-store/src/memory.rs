use chrono::{DateTime, Utc};
use core_types::{PriceSchedule, ScheduleId, Scope};
use parking_lot::Mutex;

use crate::{
    error::{StoreError, StoreResult},
    store::{ScheduleStore, ScheduleTx},
};

/// In-memory schedule store. One mutex serializes transactions; a
/// transaction stages its mutations on a clone of the record set and swaps
/// it in on commit, so a failed unit of work leaves nothing behind.
#[derive(Default)]
pub struct MemoryScheduleStore {
    records: Mutex<Vec<PriceSchedule>>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemoryTx<'a> {
    staged: &'a mut Vec<PriceSchedule>,
}

impl ScheduleTx for MemoryTx<'_> {
    fn find_open(&mut self, scope: &Scope) -> StoreResult<Option<PriceSchedule>> {
        Ok(self
            .staged
            .iter()
            .find(|record| record.scope == *scope && record.is_open())
            .cloned())
    }

    fn find_overlapping(
        &mut self,
        scope: &Scope,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
        excluding: Option<ScheduleId>,
    ) -> StoreResult<Option<PriceSchedule>> {
        Ok(self
            .staged
            .iter()
            .filter(|record| record.scope == *scope)
            .filter(|record| excluding != Some(record.id))
            .find(|record| record.overlaps(from, to))
            .cloned())
    }

    fn insert(&mut self, record: &PriceSchedule) -> StoreResult<()> {
        self.staged.push(record.clone());
        Ok(())
    }

    fn close(&mut self, id: ScheduleId, effective_to: DateTime<Utc>) -> StoreResult<()> {
        let record = self
            .staged
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::MissingRecord { id })?;
        record.effective_to = Some(effective_to);
        Ok(())
    }
}

impl ScheduleStore for MemoryScheduleStore {
    fn in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ScheduleTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut guard = self.records.lock();
        let mut staged = guard.clone();
        let out = {
            let mut tx = MemoryTx {
                staged: &mut staged,
            };
            work(&mut tx)?
        };
        *guard = staged;
        Ok(out)
    }

    fn find_containing(&self, scope: &Scope, at: DateTime<Utc>) -> StoreResult<Option<PriceSchedule>> {
        let guard = self.records.lock();
        Ok(guard
            .iter()
            .filter(|record| record.scope == *scope && record.covers(at))
            .max_by_key(|record| record.effective_from)
            .cloned())
    }

    fn list(&self, scope: &Scope) -> StoreResult<Vec<PriceSchedule>> {
        let guard = self.records.lock();
        let mut records: Vec<_> = guard
            .iter()
            .filter(|record| record.scope == *scope)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.effective_from);
        Ok(records)
    }
}
