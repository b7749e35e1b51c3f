//! Assignment writer and the engineer-work reset protocol.
//!
//! Changing a job's engineer or date invalidates whatever the previous
//! engineer recorded against it. When the job had a full prior assignment,
//! that work is archived first, then the checklist is reset, then the job is
//! updated (clearing the work fields) in one versioned write, and finally an
//! activity entry is recorded. There is no transaction across these steps:
//! a failed final update reports which earlier side effects already happened.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{AssignmentError, StoreError};
use crate::model::{EngineerId, EngineerWork, Job, JobId, JobStatus, TimeWindow};
use crate::traits::{ActivityLog, ChecklistStore, JobStore, WorkArchive};

pub const ENGINEER_STATUS_RESET: &str = "engineer_status_reset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    EngineerChanged,
    Rescheduled,
    AssignmentCleared,
}

impl ResetReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ResetReason::EngineerChanged => "engineer_changed",
            ResetReason::Rescheduled => "rescheduled",
            ResetReason::AssignmentCleared => "assignment_cleared",
        }
    }
}

/// Snapshot of superseded engineer work handed to the archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveRecord {
    pub job_id: JobId,
    pub engineer_id: EngineerId,
    pub previous_date: NaiveDate,
    pub reason: ResetReason,
    pub new_date: Option<NaiveDate>,
    pub work: EngineerWork,
}

/// Field values written to a job in a single versioned update.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub engineer_id: Option<EngineerId>,
    pub scheduled_date: Option<NaiveDate>,
    pub time_window: Option<TimeWindow>,
    pub duration_hours: f64,
    pub notes: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub status: JobStatus,
    /// Null the engineer-completed-work fields as part of this write.
    pub clear_work: bool,
}

impl JobUpdate {
    /// Apply this update to a job record, bumping its version.
    pub fn apply_to(&self, job: &mut Job) {
        job.engineer_id = self.engineer_id.clone();
        job.scheduled_date = self.scheduled_date;
        job.time_window = self.time_window;
        job.duration_hours = self.duration_hours;
        job.notes = self.notes.clone();
        job.address = self.address.clone();
        job.postcode = self.postcode.clone();
        job.status = self.status;
        if self.clear_work {
            job.work.clear_completed_work();
        }
        job.version += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResetDetails {
    pub reason: ResetReason,
    pub previous_engineer: Option<EngineerId>,
    pub new_engineer: Option<EngineerId>,
    pub previous_date: Option<NaiveDate>,
    pub new_date: Option<NaiveDate>,
    pub work_archived: bool,
    pub checklist_reset: bool,
    pub work_cleared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub job_id: JobId,
    pub activity_type: &'static str,
    pub description: String,
    pub details: ResetDetails,
}

/// Requested change to a job's assignment. Fields other than engineer and
/// date are left as they are unless set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentRequest {
    pub engineer_id: Option<EngineerId>,
    pub scheduled_date: Option<NaiveDate>,
    time_window: Option<Option<TimeWindow>>,
    duration_hours: Option<f64>,
    notes: Option<Option<String>>,
    address: Option<Option<String>>,
    postcode: Option<Option<String>>,
}

impl AssignmentRequest {
    pub fn new(engineer_id: Option<EngineerId>, scheduled_date: Option<NaiveDate>) -> Self {
        Self {
            engineer_id,
            scheduled_date,
            ..Self::default()
        }
    }

    /// Keep the job's current engineer and date.
    pub fn unchanged(job: &Job) -> Self {
        Self::new(job.engineer_id.clone(), job.scheduled_date)
    }

    pub fn time_window(mut self, window: Option<TimeWindow>) -> Self {
        self.time_window = Some(window);
        self
    }

    pub fn duration_hours(mut self, hours: f64) -> Self {
        self.duration_hours = Some(hours);
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn address(mut self, address: Option<String>, postcode: Option<String>) -> Self {
        self.address = Some(address);
        self.postcode = Some(postcode);
        self
    }

    fn to_update(&self, job: &Job, clear_work: bool) -> JobUpdate {
        JobUpdate {
            engineer_id: self.engineer_id.clone(),
            scheduled_date: self.scheduled_date,
            time_window: self.time_window.unwrap_or(job.time_window),
            duration_hours: self.duration_hours.unwrap_or(job.duration_hours),
            notes: self.notes.clone().unwrap_or_else(|| job.notes.clone()),
            address: self.address.clone().unwrap_or_else(|| job.address.clone()),
            postcode: self.postcode.clone().unwrap_or_else(|| job.postcode.clone()),
            status: job
                .status
                .after_assignment(self.engineer_id.as_ref(), self.scheduled_date),
            clear_work,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssignOptions {
    /// Stop before clearing anything when the archive write fails.
    pub abort_on_archive_failure: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentOutcome {
    pub job: Job,
    pub reset: Option<ResetReason>,
    pub archived: bool,
    pub checklist_reset: bool,
    pub work_cleared: bool,
    pub audit_logged: bool,
}

/// What an assignment change means for the job's existing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangePlan {
    pub engineer_changing: bool,
    pub date_changing: bool,
    pub needs_archival: bool,
    pub reason: Option<ResetReason>,
}

impl ChangePlan {
    pub fn for_change(
        job: &Job,
        engineer_id: Option<&EngineerId>,
        date: Option<NaiveDate>,
    ) -> Self {
        let engineer_changing = job.engineer_id.as_ref() != engineer_id;
        let date_changing = job.scheduled_date != date;
        let changing = engineer_changing || date_changing;
        let needs_archival = changing && job.is_fully_assigned();

        let reason = changing.then(|| {
            if engineer_id.is_none() && date.is_none() {
                ResetReason::AssignmentCleared
            } else if engineer_changing {
                ResetReason::EngineerChanged
            } else {
                ResetReason::Rescheduled
            }
        });

        Self {
            engineer_changing,
            date_changing,
            needs_archival,
            reason,
        }
    }

    pub fn is_changing(&self) -> bool {
        self.engineer_changing || self.date_changing
    }
}

pub struct AssignmentWriter<'a, J: ?Sized, C: ?Sized, A: ?Sized, L: ?Sized> {
    jobs: &'a J,
    checklist: &'a C,
    archive: &'a A,
    activity: &'a L,
    options: AssignOptions,
}

impl<'a, J, C, A, L> AssignmentWriter<'a, J, C, A, L>
where
    J: JobStore + ?Sized,
    C: ChecklistStore + ?Sized,
    A: WorkArchive + ?Sized,
    L: ActivityLog + ?Sized,
{
    pub fn new(jobs: &'a J, checklist: &'a C, archive: &'a A, activity: &'a L) -> Self {
        Self {
            jobs,
            checklist,
            archive,
            activity,
            options: AssignOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AssignOptions) -> Self {
        self.options = options;
        self
    }

    /// Set a job's engineer and date, resetting superseded engineer work.
    pub fn assign(
        &self,
        job_id: &JobId,
        engineer_id: Option<EngineerId>,
        scheduled_date: Option<NaiveDate>,
    ) -> Result<AssignmentOutcome, AssignmentError> {
        self.apply(job_id, AssignmentRequest::new(engineer_id, scheduled_date))
    }

    /// Remove a job's engineer and date.
    pub fn clear_assignment(&self, job_id: &JobId) -> Result<AssignmentOutcome, AssignmentError> {
        self.assign(job_id, None, None)
    }

    /// Apply an assignment request, including any other edited fields.
    pub fn apply(
        &self,
        job_id: &JobId,
        request: AssignmentRequest,
    ) -> Result<AssignmentOutcome, AssignmentError> {
        let job = self.jobs.job(job_id).map_err(AssignmentError::Read)?;
        let plan =
            ChangePlan::for_change(&job, request.engineer_id.as_ref(), request.scheduled_date);

        let archived = match plan.reason {
            Some(reason) if plan.needs_archival => {
                self.archive_work(&job, reason, request.scheduled_date)?
            }
            _ => false,
        };

        let checklist_reset = plan.needs_archival && self.reset_checklist(&job.id);

        let update = request.to_update(&job, plan.is_changing());
        let updated = match self.jobs.update_job(&job.id, job.version, &update) {
            Ok(updated) => updated,
            Err(source) => {
                error!(
                    job_id = %job.id,
                    archived,
                    checklist_reset,
                    error = %source,
                    "failed to update installation details"
                );
                return Err(AssignmentError::UpdateFailed {
                    source,
                    archived,
                    checklist_reset,
                });
            }
        };

        let mut outcome = AssignmentOutcome {
            job: updated,
            reset: plan.reason,
            archived,
            checklist_reset,
            work_cleared: plan.is_changing(),
            audit_logged: false,
        };

        if let Some(reason) = plan.reason {
            info!(
                job_id = %job.id,
                reason = reason.as_str(),
                previous_engineer = ?job.engineer_id,
                new_engineer = ?outcome.job.engineer_id,
                archived,
                "engineer work reset"
            );
            outcome.audit_logged = self.record_reset(&job, &outcome, reason);
        }

        Ok(outcome)
    }

    /// Returns whether the snapshot reached the archive.
    fn archive_work(
        &self,
        job: &Job,
        reason: ResetReason,
        new_date: Option<NaiveDate>,
    ) -> Result<bool, AssignmentError> {
        let (Some(engineer_id), Some(previous_date)) =
            (job.engineer_id.clone(), job.scheduled_date)
        else {
            return Ok(false);
        };
        let record = ArchiveRecord {
            job_id: job.id.clone(),
            engineer_id,
            previous_date,
            reason,
            new_date,
            work: job.work.clone(),
        };

        match self.archive.archive(&record) {
            Ok(()) => Ok(true),
            Err(err) if self.options.abort_on_archive_failure => {
                error!(
                    job_id = %job.id,
                    error = %err,
                    "archiving engineer work failed, aborting assignment"
                );
                Err(AssignmentError::Archive(err))
            }
            Err(err) => {
                warn!(job_id = %job.id, error = %err, "archiving engineer work failed, continuing");
                Ok(false)
            }
        }
    }

    fn reset_checklist(&self, job_id: &JobId) -> bool {
        match self.checklist.reset_checklist(job_id) {
            Ok(rows) => {
                info!(job_id = %job_id, rows, "checklist reset");
                true
            }
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "checklist reset failed, continuing");
                false
            }
        }
    }

    /// Best effort; a failed write is logged and otherwise ignored.
    fn record_reset(
        &self,
        previous: &Job,
        outcome: &AssignmentOutcome,
        reason: ResetReason,
    ) -> bool {
        let entry = ActivityEntry {
            job_id: previous.id.clone(),
            activity_type: ENGINEER_STATUS_RESET,
            description: describe_reset(previous, &outcome.job, reason, outcome.archived),
            details: ResetDetails {
                reason,
                previous_engineer: previous.engineer_id.clone(),
                new_engineer: outcome.job.engineer_id.clone(),
                previous_date: previous.scheduled_date,
                new_date: outcome.job.scheduled_date,
                work_archived: outcome.archived,
                checklist_reset: outcome.checklist_reset,
                work_cleared: outcome.work_cleared,
            },
        };

        match self.activity.record(&entry) {
            Ok(()) => true,
            Err(err) => {
                warn!(job_id = %previous.id, error = %err, "activity log write failed");
                false
            }
        }
    }
}

fn describe_reset(previous: &Job, updated: &Job, reason: ResetReason, archived: bool) -> String {
    let name = |engineer: &Option<EngineerId>| {
        engineer.clone().unwrap_or_else(|| "unassigned".to_string())
    };
    let day = |date: Option<NaiveDate>| {
        date.map_or_else(|| "unscheduled".to_string(), |d| d.to_string())
    };

    let change = match reason {
        ResetReason::EngineerChanged => format!(
            "Engineer changed from {} to {}",
            name(&previous.engineer_id),
            name(&updated.engineer_id)
        ),
        ResetReason::Rescheduled => format!(
            "Rescheduled from {} to {}",
            day(previous.scheduled_date),
            day(updated.scheduled_date)
        ),
        ResetReason::AssignmentCleared => format!(
            "Assignment cleared (was {} on {})",
            name(&previous.engineer_id),
            day(previous.scheduled_date)
        ),
    };

    if archived {
        format!("{change}; previous engineer work archived and reset")
    } else {
        format!("{change}; engineer work reset")
    }
}

/// Store-side helper: reject an update whose expected version is stale.
pub fn check_version(job: &Job, expected_version: u64) -> Result<(), StoreError> {
    if job.version == expected_version {
        Ok(())
    } else {
        Err(StoreError::VersionConflict {
            job_id: job.id.clone(),
            expected: expected_version,
            found: job.version,
        })
    }
}
