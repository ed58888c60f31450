//! Time-scoped price resolution for the device fleet.
//!
//! The crate exposes:
//! - [`ScheduleWriter`]: opens a new price regime for a scope, atomically
//!   superseding the current one and rejecting overlapping intervals.
//! - [`ScheduleResolver`]: the single applicable price for a device and
//!   instant, device scope over global, zero fallback when nothing applies.
//! - [`dispense_totals`] / [`settle_dispense`]: financial settlement for a
//!   completed dispense.

pub mod error;
pub mod resolver;
pub mod settle;
pub mod writer;

pub use error::{PricingError, PricingResult};
pub use resolver::{ResolvedPrice, ScheduleResolver};
pub use settle::{dispense_totals, settle_dispense, DispenseTotals, SettledDispense};
pub use writer::{NewSchedule, ScheduleWriter};
