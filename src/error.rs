//! Error types for the scheduling core.

use thiserror::Error;

/// Failure to resolve a distance between two postcodes.
#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("distance provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed distance response: {0}")]
    Malformed(String),
    #[error("distance response did not contain a distance")]
    MissingDistance,
    #[error("unknown postcode {0:?}")]
    UnknownPostcode(String),
    #[error("empty postcode")]
    EmptyPostcode,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings unavailable: {0}")]
    Unavailable(String),
    #[error("settings payload could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Failure reported by a data-access collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("job {job_id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        job_id: String,
        expected: u64,
        found: u64,
    },
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ConflictError {
    #[error("failed to load scheduling data: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("failed to read job before assignment: {0}")]
    Read(#[source] StoreError),
    #[error("archiving previous engineer work failed: {0}")]
    Archive(#[source] StoreError),
    /// The job record was not updated. `archived` and `checklist_reset`
    /// report side effects that already took place.
    #[error("failed to update installation details: {source}")]
    UpdateFailed {
        #[source]
        source: StoreError,
        archived: bool,
        checklist_reset: bool,
    },
}
