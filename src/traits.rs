//! Seams to the collaborators this core consumes but does not own.
//!
//! Kept minimal: a backing application implements them over its own
//! storage and remote services.

use chrono::{DateTime, NaiveDate, Utc};

use crate::assignment::{ActivityEntry, ArchiveRecord, JobUpdate};
use crate::distance::DistanceReading;
use crate::error::{DistanceError, SettingsError, StoreError};
use crate::model::{ClientId, Engineer, EngineerId, Job, JobId};
use crate::settings::SchedulingSettings;

/// Resolves a driving distance between two (already normalised) postcodes.
pub trait DistanceProvider: Send + Sync {
    fn measure(&self, origin: &str, destination: &str) -> Result<DistanceReading, DistanceError>;
}

/// Resolves a postcode to (lat, lng).
pub trait Geocoder: Send + Sync {
    fn locate(&self, postcode: &str) -> Result<(f64, f64), DistanceError>;
}

/// Reads the current scheduling policy.
pub trait SettingsSource {
    fn load(&self) -> Result<SchedulingSettings, SettingsError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Job records in scheduling context.
pub trait JobStore {
    fn job(&self, id: &JobId) -> Result<Job, StoreError>;

    /// All jobs held by an engineer on a date, in booking order.
    fn jobs_for_engineer_on(
        &self,
        engineer_id: &EngineerId,
        date: NaiveDate,
    ) -> Result<Vec<Job>, StoreError>;

    /// Dates the client has marked as unavailable.
    fn client_blocked_dates(&self, client_id: &ClientId) -> Result<Vec<NaiveDate>, StoreError>;

    /// Apply `update` only if the stored job is still at `expected_version`.
    fn update_job(
        &self,
        id: &JobId,
        expected_version: u64,
        update: &JobUpdate,
    ) -> Result<Job, StoreError>;
}

pub trait EngineerDirectory {
    fn engineer(&self, id: &EngineerId) -> Result<Engineer, StoreError>;
}

pub trait ChecklistStore {
    /// Mark every checklist row of a job incomplete. Returns rows touched.
    fn reset_checklist(&self, job_id: &JobId) -> Result<usize, StoreError>;
}

/// Durable storage of superseded engineer work.
pub trait WorkArchive {
    fn archive(&self, record: &ArchiveRecord) -> Result<(), StoreError>;
}

pub trait ActivityLog {
    fn record(&self, entry: &ActivityEntry) -> Result<(), StoreError>;
}

/// Number of jobs an engineer holds on a date.
pub trait WorkloadSource {
    fn job_count(&self, engineer_id: &EngineerId, date: NaiveDate) -> Result<usize, StoreError>;
}

impl<T: JobStore + ?Sized> WorkloadSource for T {
    fn job_count(&self, engineer_id: &EngineerId, date: NaiveDate) -> Result<usize, StoreError> {
        Ok(self.jobs_for_engineer_on(engineer_id, date)?.len())
    }
}
