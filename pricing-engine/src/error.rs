use core_types::ScheduleId;
use fleet_api::ApiError;
use schedule_store::StoreError;
use thiserror::Error;

pub type PricingResult<T> = std::result::Result<T, PricingError>;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },
    #[error("schedule {conflicting_id} already covers part of the requested period")]
    Overlap { conflicting_id: ScheduleId },
    #[error("device {device_id} is not registered")]
    DeviceNotFound { device_id: String },
    #[error("device directory error: {0}")]
    Directory(#[from] ApiError),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl PricingError {
    /// Status the request handlers map each failure to.
    pub fn http_status(&self) -> u16 {
        match self {
            PricingError::Validation { .. } => 400,
            PricingError::DeviceNotFound { .. } => 404,
            PricingError::Overlap { .. } => 409,
            PricingError::Directory(_) | PricingError::Storage(_) => 500,
        }
    }
}
