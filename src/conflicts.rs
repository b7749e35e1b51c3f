//! Scheduling conflict detection.
//!
//! Conflicts are advisory: they are reported to the operator with a severity
//! for emphasis and never block an assignment.

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::availability::{bookings_overlap, is_available_on, is_over_allocated, job_span, works_on};
use crate::distance::DistanceCache;
use crate::error::ConflictError;
use crate::model::{Engineer, Job, JobId};
use crate::recommend::estimated_travel_minutes;
use crate::settings::{SchedulingSettings, effective_settings};
use crate::traits::{DistanceProvider, EngineerDirectory, JobStore, SettingsSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictType {
    DoubleBooking,
    ClientBlocked,
    OutsideHours,
    TravelConflict,
    EngineerUnavailable,
    Overallocated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl ConflictType {
    pub fn severity(self) -> Severity {
        match self {
            ConflictType::DoubleBooking
            | ConflictType::ClientBlocked
            | ConflictType::EngineerUnavailable => Severity::High,
            ConflictType::OutsideHours | ConflictType::TravelConflict => Severity::Medium,
            ConflictType::Overallocated => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub kind: ConflictType,
    pub severity: Severity,
    pub message: String,
    /// The other job involved, for double-bookings and travel conflicts.
    pub related_job: Option<JobId>,
}

impl Conflict {
    fn new(kind: ConflictType, message: String) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message,
            related_job: None,
        }
    }

    fn with_job(mut self, job_id: &JobId) -> Self {
        self.related_job = Some(job_id.clone());
        self
    }
}

pub struct ConflictDetector<'a, J: ?Sized, E: ?Sized, S: ?Sized, P> {
    jobs: &'a J,
    engineers: &'a E,
    settings: &'a S,
    distances: &'a DistanceCache<P>,
}

impl<'a, J, E, S, P> ConflictDetector<'a, J, E, S, P>
where
    J: JobStore + ?Sized,
    E: EngineerDirectory + ?Sized,
    S: SettingsSource + ?Sized,
    P: DistanceProvider,
{
    pub fn new(
        jobs: &'a J,
        engineers: &'a E,
        settings: &'a S,
        distances: &'a DistanceCache<P>,
    ) -> Self {
        Self {
            jobs,
            engineers,
            settings,
            distances,
        }
    }

    /// All conflicts for the job's current engineer and date.
    pub fn detect_conflicts(&self, job_id: &JobId) -> Result<Vec<Conflict>, ConflictError> {
        let job = self.jobs.job(job_id)?;
        let settings = effective_settings(self.settings);
        let mut conflicts = Vec::new();

        let Some(date) = job.scheduled_date else {
            return Ok(conflicts);
        };

        if self.jobs.client_blocked_dates(&job.client_id)?.contains(&date) {
            conflicts.push(Conflict::new(
                ConflictType::ClientBlocked,
                format!("Client has marked {date} as unavailable"),
            ));
        }

        let Some(engineer_id) = job.engineer_id.as_ref() else {
            return Ok(conflicts);
        };
        let engineer = self.engineers.engineer(engineer_id)?;

        if !is_available_on(&engineer, date) {
            conflicts.push(Conflict::new(
                ConflictType::EngineerUnavailable,
                format!("{} is not available on {date}", engineer.name),
            ));
        }

        conflicts.extend(outside_hours(&job, &engineer, date, &settings));

        let others: Vec<Job> = self
            .jobs
            .jobs_for_engineer_on(engineer_id, date)?
            .into_iter()
            .filter(|other| other.id != job.id)
            .collect();

        for other in &others {
            if bookings_overlap(&job, other, &settings) {
                conflicts.push(
                    Conflict::new(
                        ConflictType::DoubleBooking,
                        format!("{} already has job {} booked on {date}", engineer.name, other.id),
                    )
                    .with_job(&other.id),
                );
            } else if let Some(conflict) = self.travel_conflict(&job, other, &settings) {
                conflicts.push(conflict);
            }
        }

        let held = others.len() + 1;
        if is_over_allocated(held, &settings) {
            conflicts.push(Conflict::new(
                ConflictType::Overallocated,
                format!(
                    "{} would have {held} jobs on {date} (maximum {})",
                    engineer.name, settings.max_jobs_per_day
                ),
            ));
        }

        debug!(job_id = %job.id, conflicts = conflicts.len(), "conflict check complete");
        Ok(conflicts)
    }

    /// Gap between two non-overlapping bookings too short for the drive between them.
    fn travel_conflict(
        &self,
        job: &Job,
        other: &Job,
        settings: &SchedulingSettings,
    ) -> Option<Conflict> {
        let (from, to) = match (job.destination(), other.destination()) {
            (Some(from), Some(to)) => (from, to),
            _ => return None,
        };

        let (job_start, job_end) = job_span(job, settings);
        let (other_start, other_end) = job_span(other, settings);
        let (first, second, first_end, second_start) = if job_start <= other_start {
            (job, other, job_end, other_start)
        } else {
            (other, job, other_end, job_start)
        };
        let gap_minutes = (second_start - first_end).num_minutes() as f64;

        let travel_minutes = match self.distances.lookup(from, to) {
            Ok(reading) => reading
                .minutes
                .unwrap_or_else(|| estimated_travel_minutes(reading.miles)),
            Err(err) => {
                warn!(
                    job_id = %job.id,
                    other_job = %other.id,
                    error = %err,
                    "travel check skipped, distance unavailable"
                );
                return None;
            }
        };

        (gap_minutes < travel_minutes).then(|| {
            Conflict::new(
                ConflictType::TravelConflict,
                format!(
                    "Only {gap_minutes:.0} minutes between job {} and job {}, \
                     travel needs about {travel_minutes:.0}",
                    first.id, second.id
                ),
            )
            .with_job(&other.id)
        })
    }
}

fn outside_hours(
    job: &Job,
    engineer: &Engineer,
    date: NaiveDate,
    settings: &SchedulingSettings,
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    if !works_on(engineer, date) {
        conflicts.push(Conflict::new(
            ConflictType::OutsideHours,
            format!("{} does not work on {}", engineer.name, date.weekday()),
        ));
        return conflicts;
    }

    let (start, end) = job_span(job, settings);
    if start < settings.working_hours_start || end > settings.working_hours_end {
        conflicts.push(Conflict::new(
            ConflictType::OutsideHours,
            format!(
                "Job runs {}-{}, outside working hours {}-{}",
                start.format("%H:%M"),
                end.format("%H:%M"),
                settings.working_hours_start.format("%H:%M"),
                settings.working_hours_end.format("%H:%M")
            ),
        ));
    }

    if let Some(day) = engineer.working_day(date.weekday()) {
        if start < day.start || end > day.end {
            conflicts.push(Conflict::new(
                ConflictType::OutsideHours,
                format!(
                    "Job runs {}-{}, outside {}'s hours {}-{}",
                    start.format("%H:%M"),
                    end.format("%H:%M"),
                    engineer.name,
                    day.start.format("%H:%M"),
                    day.end.format("%H:%M")
                ),
            ));
        }
    }

    conflicts
}
