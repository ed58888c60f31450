use std::sync::Arc;

use chrono::{DateTime, Utc};
use core_types::{PriceSchedule, ScheduleId, Scope};
use rust_decimal::Decimal;
use schedule_store::{ScheduleStore, StoreResult};
use serde::{Deserialize, Serialize};

/// Price in effect for a device at an instant. `schedule_id` is `None` only
/// on the zero-price fallback, and is recorded with the dispense so every
/// settlement can be audited against the schedule it priced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub price_per_liter: Decimal,
    pub cost_per_liter: Decimal,
    pub currency: String,
    pub schedule_id: Option<ScheduleId>,
}

impl ResolvedPrice {
    fn from_schedule(schedule: &PriceSchedule) -> Self {
        Self {
            price_per_liter: schedule.selling_price_per_liter,
            cost_per_liter: schedule.cost_price_per_liter,
            currency: schedule.currency.clone(),
            schedule_id: Some(schedule.id),
        }
    }

    fn zero(currency: String) -> Self {
        Self {
            price_per_liter: Decimal::ZERO,
            cost_per_liter: Decimal::ZERO,
            currency,
            schedule_id: None,
        }
    }
}

/// Picks the single applicable schedule for a device and instant:
/// device scope first, then global, then the zero-price fallback — pricing
/// absence must never block a dispense. Read-only; tolerates store staleness.
pub struct ScheduleResolver<S> {
    store: Arc<S>,
    default_currency: String,
}

impl<S: ScheduleStore> ScheduleResolver<S> {
    pub fn new(store: Arc<S>, default_currency: impl Into<String>) -> Self {
        Self {
            store,
            default_currency: default_currency.into(),
        }
    }

    pub fn resolve(&self, device_id: &str, at: DateTime<Utc>) -> StoreResult<ResolvedPrice> {
        let device_scope = Scope::device(device_id);
        if let Some(schedule) = self.store.find_containing(&device_scope, at)? {
            return Ok(ResolvedPrice::from_schedule(&schedule));
        }
        if let Some(schedule) = self.store.find_containing(&Scope::Global, at)? {
            return Ok(ResolvedPrice::from_schedule(&schedule));
        }
        Ok(ResolvedPrice::zero(self.default_currency.clone()))
    }

    /// The price in effect right now.
    pub fn current_price(&self, device_id: &str) -> StoreResult<ResolvedPrice> {
        self.resolve(device_id, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use schedule_store::MemoryScheduleStore;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn empty_store_yields_zero_fallback() {
        let resolver = ScheduleResolver::new(Arc::new(MemoryScheduleStore::new()), "ZMW");
        let price = resolver.resolve("OIL-0001", ts(1000)).unwrap();
        assert_eq!(
            price,
            ResolvedPrice {
                price_per_liter: dec!(0),
                cost_per_liter: dec!(0),
                currency: "ZMW".to_string(),
                schedule_id: None,
            }
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let resolver = ScheduleResolver::new(Arc::new(MemoryScheduleStore::new()), "ZMW");
        let first = resolver.resolve("OIL-0001", ts(1000)).unwrap();
        let second = resolver.resolve("OIL-0001", ts(1000)).unwrap();
        assert_eq!(first, second);
    }
}
