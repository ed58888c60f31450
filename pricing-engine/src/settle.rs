use chrono::{DateTime, Utc};
use core_types::{DispenseTransaction, ScheduleId};
use rust_decimal::{Decimal, RoundingStrategy};
use schedule_store::ScheduleStore;
use serde::{Deserialize, Serialize};

use crate::{
    error::{PricingError, PricingResult},
    resolver::ScheduleResolver,
};

/// Monetary totals for a completed dispense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispenseTotals {
    pub total_cost: Decimal,
    pub total_profit: Decimal,
}

/// `total_cost = liters * price`, `total_profit = liters * (price - cost)`,
/// both rounded to 2 decimal places half-away-from-zero. The rounding mode
/// feeds financial reports and must stay consistent across the system.
pub fn dispense_totals(
    dispensed_liters: Decimal,
    price_per_liter: Decimal,
    cost_per_liter: Decimal,
) -> PricingResult<DispenseTotals> {
    if dispensed_liters < Decimal::ZERO {
        return Err(PricingError::Validation {
            field: "dispensed_liters",
            reason: "must not be negative",
        });
    }
    let round = |value: Decimal| value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Ok(DispenseTotals {
        total_cost: round(dispensed_liters * price_per_liter),
        total_profit: round(dispensed_liters * (price_per_liter - cost_per_liter)),
    })
}

/// Dispense record augmented with the price resolved at its start instant
/// and the derived totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledDispense {
    pub device_id: String,
    pub started_at: DateTime<Utc>,
    pub dispensed_liters: Decimal,
    pub price_per_liter: Decimal,
    pub cost_per_liter: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub currency: String,
    pub schedule_id: Option<ScheduleId>,
}

/// Settlement pipeline: resolve at the dispense's start instant, derive the
/// totals, and return the augmented record for the caller to persist.
pub fn settle_dispense<S: ScheduleStore>(
    resolver: &ScheduleResolver<S>,
    dispense: &DispenseTransaction,
) -> PricingResult<SettledDispense> {
    let price = resolver.resolve(&dispense.device_id, dispense.started_at)?;
    let totals = dispense_totals(
        dispense.dispensed_liters,
        price.price_per_liter,
        price.cost_per_liter,
    )?;
    Ok(SettledDispense {
        device_id: dispense.device_id.clone(),
        started_at: dispense.started_at,
        dispensed_liters: dispense.dispensed_liters,
        price_per_liter: price.price_per_liter,
        cost_per_liter: price.cost_per_liter,
        total_cost: totals.total_cost,
        total_profit: totals.total_profit,
        currency: price.currency,
        schedule_id: price.schedule_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn totals_round_half_away_from_zero() {
        let totals = dispense_totals(dec!(10), dec!(25.555), dec!(20.111)).unwrap();
        assert_eq!(totals.total_cost, dec!(255.55));
        assert_eq!(totals.total_profit, dec!(54.44));
    }

    #[test]
    fn midpoint_rounds_up() {
        let totals = dispense_totals(dec!(0.5), dec!(0.01), dec!(0)).unwrap();
        assert_eq!(totals.total_cost, dec!(0.01));
        assert_eq!(totals.total_profit, dec!(0.01));
    }

    #[test]
    fn zero_volume_is_fine() {
        let totals = dispense_totals(dec!(0), dec!(25), dec!(20)).unwrap();
        assert_eq!(totals.total_cost, dec!(0.00));
        assert_eq!(totals.total_profit, dec!(0.00));
    }

    #[test]
    fn negative_volume_is_rejected() {
        assert!(matches!(
            dispense_totals(dec!(-1), dec!(25), dec!(20)),
            Err(PricingError::Validation {
                field: "dispensed_liters",
                ..
            })
        ));
    }

    #[test]
    fn loss_making_profit_goes_negative() {
        let totals = dispense_totals(dec!(2), dec!(20), dec!(25)).unwrap();
        assert_eq!(totals.total_cost, dec!(40.00));
        assert_eq!(totals.total_profit, dec!(-10.00));
    }
}
