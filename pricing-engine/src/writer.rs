use std::sync::Arc;

use chrono::{DateTime, Utc};
use core_types::{schedule_uid, PriceSchedule, ScheduleId, Scope};
use fleet_api::DeviceDirectory;
use log::info;
use rust_decimal::Decimal;
use schedule_store::{ScheduleStore, ScheduleTx};

use crate::error::{PricingError, PricingResult};

/// Request to open a new price regime for a scope.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub scope: Scope,
    pub selling_price_per_liter: Decimal,
    /// Defaults to zero.
    pub cost_price_per_liter: Option<Decimal>,
    /// Defaults to the configured currency.
    pub currency: Option<String>,
    /// Defaults to the current time.
    pub effective_from: Option<DateTime<Utc>>,
    pub created_by: String,
}

/// Adds price regimes while preserving the per-scope interval invariants:
/// no two schedules overlap, and at most one is open. The close-check-insert
/// sequence runs inside one store transaction, so concurrent same-scope
/// writers serialize on the store and the loser sees the winner's record.
pub struct ScheduleWriter<S> {
    store: Arc<S>,
    devices: Arc<dyn DeviceDirectory>,
    default_currency: String,
}

impl<S: ScheduleStore> ScheduleWriter<S> {
    pub fn new(
        store: Arc<S>,
        devices: Arc<dyn DeviceDirectory>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            devices,
            default_currency: default_currency.into(),
        }
    }

    pub fn create(&self, request: NewSchedule) -> PricingResult<PriceSchedule> {
        if request.selling_price_per_liter <= Decimal::ZERO {
            return Err(PricingError::Validation {
                field: "selling_price_per_liter",
                reason: "must be greater than zero",
            });
        }
        let cost_price = request.cost_price_per_liter.unwrap_or(Decimal::ZERO);
        if cost_price < Decimal::ZERO {
            return Err(PricingError::Validation {
                field: "cost_price_per_liter",
                reason: "must not be negative",
            });
        }
        let currency = match request.currency {
            Some(currency) if currency.is_empty() => {
                return Err(PricingError::Validation {
                    field: "currency",
                    reason: "must not be empty",
                });
            }
            Some(currency) => currency,
            None => self.default_currency.clone(),
        };
        if let Scope::Device(device_id) = &request.scope {
            if !self.devices.device_exists(device_id)? {
                return Err(PricingError::DeviceNotFound {
                    device_id: device_id.clone(),
                });
            }
        }

        let effective_from = request.effective_from.unwrap_or_else(Utc::now);
        let created_at = Utc::now();
        let record = PriceSchedule {
            id: schedule_uid(&request.scope, effective_from, created_at, &request.created_by),
            scope: request.scope,
            selling_price_per_liter: request.selling_price_per_liter,
            cost_price_per_liter: cost_price,
            currency,
            effective_from,
            effective_to: None,
            created_at,
            created_by: request.created_by,
        };

        let superseded: Option<ScheduleId> = self.store.in_transaction(|tx| {
            let mut superseded = None;
            if let Some(open) = tx.find_open(&record.scope)? {
                // Supersede only a strictly earlier regime. A backdated
                // request leaves the open schedule in place and is then
                // checked against every record, the open one included.
                if open.effective_from < record.effective_from {
                    tx.close(open.id, record.effective_from)?;
                    superseded = Some(open.id);
                }
            }
            if let Some(conflict) =
                tx.find_overlapping(&record.scope, record.effective_from, None, superseded)?
            {
                return Err(PricingError::Overlap {
                    conflicting_id: conflict.id,
                });
            }
            tx.insert(&record)?;
            Ok(superseded)
        })?;

        if let Some(closed) = superseded {
            info!(
                "[pricing] closed schedule {closed} for {} at {}",
                record.scope, record.effective_from
            );
        }
        info!(
            "[pricing] created schedule {} for {}: {} {}/L from {}",
            record.id,
            record.scope,
            record.selling_price_per_liter,
            record.currency,
            record.effective_from
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fleet_api::StaticDeviceDirectory;
    use rust_decimal_macros::dec;
    use schedule_store::MemoryScheduleStore;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn writer() -> ScheduleWriter<MemoryScheduleStore> {
        let directory = StaticDeviceDirectory::new(vec!["OIL-0001".to_string()]);
        ScheduleWriter::new(
            Arc::new(MemoryScheduleStore::new()),
            Arc::new(directory),
            "ZMW",
        )
    }

    fn request(scope: Scope, selling: Decimal, from: Option<i64>) -> NewSchedule {
        NewSchedule {
            scope,
            selling_price_per_liter: selling,
            cost_price_per_liter: None,
            currency: None,
            effective_from: from.map(ts),
            created_by: "owner-1".to_string(),
        }
    }

    #[test]
    fn rejects_non_positive_selling_price() {
        let writer = writer();
        for bad in [dec!(0), dec!(-1)] {
            let result = writer.create(request(Scope::Global, bad, Some(100)));
            assert!(matches!(
                result,
                Err(PricingError::Validation {
                    field: "selling_price_per_liter",
                    ..
                })
            ));
        }
    }

    #[test]
    fn rejects_negative_cost_price() {
        let writer = writer();
        let mut req = request(Scope::Global, dec!(25), Some(100));
        req.cost_price_per_liter = Some(dec!(-1));
        assert!(matches!(
            writer.create(req),
            Err(PricingError::Validation {
                field: "cost_price_per_liter",
                ..
            })
        ));
    }

    #[test]
    fn rejects_unknown_device_scope() {
        let writer = writer();
        let result = writer.create(request(Scope::device("OIL-9999"), dec!(25), Some(100)));
        assert!(matches!(result, Err(PricingError::DeviceNotFound { .. })));
    }

    #[test]
    fn applies_defaults() {
        let writer = writer();
        let record = writer
            .create(request(Scope::device("OIL-0001"), dec!(25), Some(100)))
            .expect("create");
        assert_eq!(record.currency, "ZMW");
        assert_eq!(record.cost_price_per_liter, dec!(0));
        assert!(record.is_open());
        assert_eq!(record.created_by, "owner-1");
    }

    #[test]
    fn rejects_empty_currency() {
        let writer = writer();
        let mut req = request(Scope::Global, dec!(25), Some(100));
        req.currency = Some(String::new());
        assert!(matches!(
            writer.create(req),
            Err(PricingError::Validation {
                field: "currency",
                ..
            })
        ));
    }

    #[test]
    fn equal_start_instant_is_a_conflict() {
        let writer = writer();
        writer
            .create(request(Scope::Global, dec!(25), Some(100)))
            .expect("first create");
        let result = writer.create(request(Scope::Global, dec!(30), Some(100)));
        assert!(matches!(result, Err(PricingError::Overlap { .. })));
    }
}
