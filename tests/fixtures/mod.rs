//! Test fixtures for install-scheduler.
//!
//! Provides:
//! - Real UK postcodes with coordinates
//! - Builders for jobs and engineers
//! - A distance provider that counts calls
//! - An in-memory store that records the order of writes

#![allow(dead_code)]

pub mod uk_postcodes;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use parking_lot::Mutex;

use install_scheduler::assignment::{ActivityEntry, ArchiveRecord, JobUpdate, check_version};
use install_scheduler::clock::FixedClock;
use install_scheduler::distance::{DistanceMethod, DistanceReading};
use install_scheduler::error::{DistanceError, StoreError};
use install_scheduler::model::{
    ChecklistItem, ClientId, Engineer, EngineerId, EngineerStatus, EngineerWork, Job, JobId,
    JobStatus, ServiceArea, TimeOff, TimeOffStatus, TimeWindow, WorkingDay,
};
use install_scheduler::traits::{
    ActivityLog, ChecklistStore, DistanceProvider, EngineerDirectory, JobStore, WorkArchive,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// Clock pinned to Monday 2025-01-06 09:00 UTC.
pub fn monday_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(at(2025, 1, 6, 9)))
}

// ============================================================================
// Builders
// ============================================================================

/// Builder for test jobs with sensible defaults.
#[derive(Clone, Debug)]
pub struct TestJob {
    job: Job,
}

impl TestJob {
    pub fn new(id: &str) -> Self {
        Self {
            job: Job {
                id: id.to_string(),
                client_id: "client-1".to_string(),
                postcode: Some("SW1A 1AA".to_string()),
                address: Some("1 Test Street".to_string()),
                duration_hours: 3.0,
                scheduled_date: None,
                engineer_id: None,
                time_window: None,
                status: JobStatus::AwaitingScheduling,
                notes: None,
                work: EngineerWork::default(),
                version: 1,
            },
        }
    }

    pub fn postcode(mut self, postcode: &str) -> Self {
        self.job.postcode = Some(postcode.to_string());
        self
    }

    pub fn no_postcode(mut self) -> Self {
        self.job.postcode = None;
        self
    }

    pub fn client(mut self, client_id: &str) -> Self {
        self.job.client_id = client_id.to_string();
        self
    }

    pub fn duration(mut self, hours: f64) -> Self {
        self.job.duration_hours = hours;
        self
    }

    pub fn desired(mut self, date: NaiveDate) -> Self {
        self.job.scheduled_date = Some(date);
        self
    }

    pub fn assigned(mut self, engineer_id: &str, date: NaiveDate) -> Self {
        self.job.engineer_id = Some(engineer_id.to_string());
        self.job.scheduled_date = Some(date);
        self.job.status = JobStatus::Scheduled;
        self
    }

    pub fn engineer_only(mut self, engineer_id: &str) -> Self {
        self.job.engineer_id = Some(engineer_id.to_string());
        self
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.job.time_window = Some(window);
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        self
    }

    pub fn signed_off(mut self, when: DateTime<Utc>) -> Self {
        self.job.work = EngineerWork {
            signed_off_at: Some(when),
            signature: Some("data:image/png;base64,AAAA".to_string()),
            notes: Some("Installed and tested".to_string()),
            status: Some(EngineerStatus::SignedOff),
            uploads: vec!["photos/meter.jpg".to_string()],
        };
        self.job.status = JobStatus::Completed;
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

/// Builder for test engineers with sensible defaults.
#[derive(Clone, Debug)]
pub struct TestEngineer {
    engineer: Engineer,
}

impl TestEngineer {
    pub fn new(id: &str, starting_postcode: &str) -> Self {
        Self {
            engineer: Engineer {
                id: id.to_string(),
                name: format!("Engineer {id}"),
                starting_postcode: starting_postcode.to_string(),
                is_available: true,
                region: None,
                working_hours: Vec::new(),
                time_off: Vec::new(),
                service_areas: Vec::new(),
            },
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.engineer.is_available = false;
        self
    }

    pub fn weekdays(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        for day in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
            self.engineer.working_hours.push(WorkingDay {
                day,
                start,
                end,
                is_available: true,
            });
        }
        self
    }

    pub fn day_off(mut self, day: Weekday) -> Self {
        self.engineer.working_hours.retain(|entry| entry.day != day);
        self
    }

    pub fn time_off(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.engineer.time_off.push(TimeOff {
            start,
            end,
            status: TimeOffStatus::Approved,
            reason: Some("annual leave".to_string()),
        });
        self
    }

    pub fn services(mut self, prefix: &str, max_travel_minutes: u32) -> Self {
        self.engineer.service_areas.push(ServiceArea {
            prefix: prefix.to_string(),
            max_travel_minutes,
        });
        self
    }

    pub fn build(self) -> Engineer {
        self.engineer
    }
}

// ============================================================================
// Distance provider
// ============================================================================

/// Fixed distance table that counts how often it is asked.
#[derive(Debug, Default)]
pub struct CountingProvider {
    table: HashMap<(String, String), f64>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, a: &str, b: &str, miles: f64) -> Self {
        self.table.insert((a.to_string(), b.to_string()), miles);
        self
    }

    /// Any lookup involving `postcode` fails as a malformed response.
    pub fn failing_for(mut self, postcode: &str) -> Self {
        self.failing.insert(postcode.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DistanceProvider for CountingProvider {
    fn measure(&self, origin: &str, destination: &str) -> Result<DistanceReading, DistanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(origin) || self.failing.contains(destination) {
            return Err(DistanceError::Malformed("upstream returned 502".to_string()));
        }
        let miles = self
            .table
            .get(&(origin.to_string(), destination.to_string()))
            .or_else(|| self.table.get(&(destination.to_string(), origin.to_string())))
            .copied()
            .ok_or(DistanceError::MissingDistance)?;
        Ok(DistanceReading {
            miles,
            minutes: None,
            method: DistanceMethod::Provider,
        })
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// A write observed by the store, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Archived {
        job_id: JobId,
        /// Sign-off stored on the job at the moment of archiving.
        signed_off_at_then: Option<DateTime<Utc>>,
    },
    ChecklistReset(JobId),
    JobUpdated {
        job_id: JobId,
        cleared_work: bool,
    },
    ActivityRecorded(JobId),
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    engineers: HashMap<EngineerId, Engineer>,
    checklist: Vec<ChecklistItem>,
    blocked: HashMap<ClientId, Vec<NaiveDate>>,
    archives: Vec<ArchiveRecord>,
    activity: Vec<ActivityEntry>,
    events: Vec<StoreEvent>,
    fail_archive: bool,
    fail_checklist: bool,
    fail_update: bool,
    fail_activity: bool,
    race_on_update: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(self, job: Job) -> Self {
        self.inner.lock().jobs.insert(job.id.clone(), job);
        self
    }

    pub fn with_engineer(self, engineer: Engineer) -> Self {
        self.inner.lock().engineers.insert(engineer.id.clone(), engineer);
        self
    }

    pub fn with_checklist(
        self,
        job_id: &str,
        labels: &[&str],
        completed_at: DateTime<Utc>,
    ) -> Self {
        {
            let mut inner = self.inner.lock();
            for (i, label) in labels.iter().enumerate() {
                inner.checklist.push(ChecklistItem {
                    id: format!("{job_id}-check-{i}"),
                    job_id: job_id.to_string(),
                    label: label.to_string(),
                    is_completed: true,
                    completed_at: Some(completed_at),
                });
            }
        }
        self
    }

    pub fn with_blocked_date(self, client_id: &str, date: NaiveDate) -> Self {
        self.inner
            .lock()
            .blocked
            .entry(client_id.to_string())
            .or_default()
            .push(date);
        self
    }

    pub fn failing_archive(self) -> Self {
        self.inner.lock().fail_archive = true;
        self
    }

    pub fn failing_checklist(self) -> Self {
        self.inner.lock().fail_checklist = true;
        self
    }

    pub fn failing_update(self) -> Self {
        self.inner.lock().fail_update = true;
        self
    }

    pub fn failing_activity(self) -> Self {
        self.inner.lock().fail_activity = true;
        self
    }

    /// Another writer commits to the job between every read and update.
    pub fn racing_writer(self) -> Self {
        self.inner.lock().race_on_update = true;
        self
    }

    pub fn stored_job(&self, job_id: &str) -> Job {
        self.inner.lock().jobs[job_id].clone()
    }

    pub fn checklist_for(&self, job_id: &str) -> Vec<ChecklistItem> {
        self.inner
            .lock()
            .checklist
            .iter()
            .filter(|item| item.job_id == job_id)
            .cloned()
            .collect()
    }

    pub fn archives(&self) -> Vec<ArchiveRecord> {
        self.inner.lock().archives.clone()
    }

    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.inner.lock().activity.clone()
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.inner.lock().events.clone()
    }
}

fn backend_down() -> StoreError {
    StoreError::Backend("connection reset".to_string())
}

impl JobStore for MemoryStore {
    fn job(&self, id: &JobId) -> Result<Job, StoreError> {
        self.inner
            .lock()
            .jobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "job",
                id: id.clone(),
            })
    }

    fn jobs_for_engineer_on(
        &self,
        engineer_id: &EngineerId,
        date: NaiveDate,
    ) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.lock();
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| {
                job.engineer_id.as_ref() == Some(engineer_id) && job.scheduled_date == Some(date)
            })
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(jobs)
    }

    fn client_blocked_dates(&self, client_id: &ClientId) -> Result<Vec<NaiveDate>, StoreError> {
        Ok(self.inner.lock().blocked.get(client_id).cloned().unwrap_or_default())
    }

    fn update_job(
        &self,
        id: &JobId,
        expected_version: u64,
        update: &JobUpdate,
    ) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_update {
            return Err(backend_down());
        }
        let race = inner.race_on_update;
        let job = inner.jobs.get_mut(id).ok_or_else(|| StoreError::NotFound {
            entity: "job",
            id: id.clone(),
        })?;
        if race {
            job.version += 1;
        }
        check_version(job, expected_version)?;
        update.apply_to(job);
        let updated = job.clone();
        inner.events.push(StoreEvent::JobUpdated {
            job_id: id.clone(),
            cleared_work: update.clear_work,
        });
        Ok(updated)
    }
}

impl EngineerDirectory for MemoryStore {
    fn engineer(&self, id: &EngineerId) -> Result<Engineer, StoreError> {
        self.inner
            .lock()
            .engineers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "engineer",
                id: id.clone(),
            })
    }
}

impl ChecklistStore for MemoryStore {
    fn reset_checklist(&self, job_id: &JobId) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_checklist {
            return Err(backend_down());
        }
        let mut touched = 0;
        for item in inner.checklist.iter_mut().filter(|item| &item.job_id == job_id) {
            item.is_completed = false;
            item.completed_at = None;
            touched += 1;
        }
        inner.events.push(StoreEvent::ChecklistReset(job_id.clone()));
        Ok(touched)
    }
}

impl WorkArchive for MemoryStore {
    fn archive(&self, record: &ArchiveRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_archive {
            return Err(backend_down());
        }
        let signed_off_at_then = inner
            .jobs
            .get(&record.job_id)
            .and_then(|job| job.work.signed_off_at);
        inner.archives.push(record.clone());
        inner.events.push(StoreEvent::Archived {
            job_id: record.job_id.clone(),
            signed_off_at_then,
        });
        Ok(())
    }
}

impl ActivityLog for MemoryStore {
    fn record(&self, entry: &ActivityEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_activity {
            return Err(backend_down());
        }
        inner.activity.push(entry.clone());
        inner.events.push(StoreEvent::ActivityRecorded(entry.job_id.clone()));
        Ok(())
    }
}
