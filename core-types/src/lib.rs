// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Shared domain types and configuration for the fleet pricing system.

pub mod config;
pub mod types;
pub mod uid;

pub use config::{AppConfig, PricingConfig, StoreConfig};
pub use types::{DispenseTransaction, PriceSchedule, Scope};
pub use uid::{schedule_uid, ScheduleId, UID_LEN};
