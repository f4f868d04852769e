use thiserror::Error;

use super::step::StepKey;
use crate::api::ApiError;

/// Failures reading or writing the persisted progress record
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access progress record: {0}")]
    Io(#[from] std::io::Error),

    #[error("progress record is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("progress record version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("an organization must be selected before creating an event")]
    MissingOrganization,

    #[error("no event is being created")]
    NoActiveEvent,

    #[error("cannot complete {step} before {blocking}")]
    StepOutOfOrder { step: StepKey, blocking: StepKey },

    #[error("every step must be complete before publishing")]
    NotReadyToPublish,

    #[error("request was cancelled")]
    Cancelled,

    #[error("event {event_id} is no longer available; wizard progress was cleared")]
    StaleEvent { event_id: i64, source: ApiError },

    #[error("event {event_id} was published but its wizard progress could not be removed")]
    PublishedNotCleared {
        event_id: i64,
        source: StorageError,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl WizardError {
    /// Errors raised before any request is sent
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            WizardError::MissingOrganization
                | WizardError::NoActiveEvent
                | WizardError::StepOutOfOrder { .. }
                | WizardError::NotReadyToPublish
        )
    }

    /// The API failure behind this error, if a request failed
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            WizardError::Api(source) | WizardError::StaleEvent { source, .. } => Some(source),
            _ => None,
        }
    }
}
