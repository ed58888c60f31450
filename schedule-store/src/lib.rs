//! Durable storage for price schedules.
//!
//! The crate exposes:
//! - [`ScheduleStore`] / [`ScheduleTx`]: the store contract and its atomic
//!   unit-of-work handle.
//! - [`MemoryScheduleStore`]: mutex-serialized in-memory store.
//! - [`SqliteScheduleStore`]: SQLite-backed store with IMMEDIATE
//!   transactions.

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryScheduleStore;
pub use sqlite::SqliteScheduleStore;
pub use store::{ScheduleStore, ScheduleTx};
