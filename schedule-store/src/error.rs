use core_types::ScheduleId;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure modes of the backing store. All variants are retryable by the
/// caller; the transaction contract guarantees nothing half-applied.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store failure: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("schedule {id} not found")]
    MissingRecord { id: ScheduleId },
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn backend(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend {
            source: Box::new(source),
        }
    }
}
