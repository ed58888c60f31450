// Copyright (c) James Kassemi, SC, US. All rights reserved.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::uid::ScheduleId;

/// Pricing domain a schedule applies to: one device, or the fleet-wide
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Device(String),
}

impl Scope {
    pub fn device(id: impl Into<String>) -> Self {
        Scope::Device(id.into())
    }

    /// Stable text key (`global` / `device:<id>`), used for storage columns
    /// and log lines.
    pub fn key(&self) -> String {
        match self {
            Scope::Global => "global".to_string(),
            Scope::Device(id) => format!("device:{id}"),
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        if key == "global" {
            return Some(Scope::Global);
        }
        key.strip_prefix("device:")
            .filter(|id| !id.is_empty())
            .map(|id| Scope::Device(id.to_string()))
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// Price-per-liter regime effective over a half-open interval
/// `[effective_from, effective_to)`; an absent `effective_to` means the
/// schedule is open (still in effect going forward).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSchedule {
    pub id: ScheduleId,
    pub scope: Scope,
    pub selling_price_per_liter: Decimal,
    pub cost_price_per_liter: Decimal,
    pub currency: String,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl PriceSchedule {
    pub fn is_open(&self) -> bool {
        self.effective_to.is_none()
    }

    /// Half-open containment: `effective_from <= at`, and `at` before the
    /// end when one exists.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.effective_from <= at && self.effective_to.map_or(true, |end| at < end)
    }

    /// Half-open intersection against `[from, to)`; `None` end means +inf on
    /// either side.
    pub fn overlaps(&self, from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> bool {
        let starts_before_other_end = match to {
            Some(end) => self.effective_from < end,
            None => true,
        };
        let other_starts_before_end = match self.effective_to {
            Some(end) => from < end,
            None => true,
        };
        starts_before_other_end && other_starts_before_end
    }
}

/// Completed dispense as reported by a device, prior to settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispenseTransaction {
    pub device_id: String,
    pub started_at: DateTime<Utc>,
    pub dispensed_liters: Decimal,
}
