//! Scheduling data model: jobs, engineers and the work an engineer records
//! against a job.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

pub type JobId = String;
pub type EngineerId = String;
pub type ClientId = String;

/// Part of the day a job is booked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Morning,
    Afternoon,
    AllDay,
}

/// Where a job sits in the payment, agreement, scheduling, completion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    AwaitingPayment,
    AwaitingAgreement,
    AwaitingScheduling,
    Scheduled,
    InProgress,
    AwaitingSignOff,
    Completed,
    Cancelled,
}

impl JobStatus {
    /// Status a job should carry once its engineer/date pair has been replaced.
    pub fn after_assignment(self, engineer: Option<&EngineerId>, date: Option<NaiveDate>) -> Self {
        match (self, engineer.is_some() && date.is_some()) {
            (JobStatus::AwaitingScheduling, true) => JobStatus::Scheduled,
            (JobStatus::Scheduled, false) => JobStatus::AwaitingScheduling,
            (status, _) => status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineerStatus {
    OnRoute,
    OnSite,
    WorkComplete,
    SignedOff,
}

/// Deliverables an engineer records once work has started on a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineerWork {
    pub signed_off_at: Option<DateTime<Utc>>,
    pub signature: Option<String>,
    pub notes: Option<String>,
    pub status: Option<EngineerStatus>,
    /// References to uploaded documentation (photos, certificates).
    #[serde(default)]
    pub uploads: Vec<String>,
}

impl EngineerWork {
    pub fn is_empty(&self) -> bool {
        self.signed_off_at.is_none()
            && self.signature.is_none()
            && self.notes.is_none()
            && self.status.is_none()
            && self.uploads.is_empty()
    }

    /// Null out the sign-off, signature, status and notes. Upload references
    /// live in the document store and are only snapshotted by the archive.
    pub fn clear_completed_work(&mut self) {
        self.signed_off_at = None;
        self.signature = None;
        self.notes = None;
        self.status = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub job_id: JobId,
    pub label: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An installation order in scheduling context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub client_id: ClientId,
    pub postcode: Option<String>,
    pub address: Option<String>,
    pub duration_hours: f64,
    pub scheduled_date: Option<NaiveDate>,
    pub engineer_id: Option<EngineerId>,
    pub time_window: Option<TimeWindow>,
    pub status: JobStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub work: EngineerWork,
    /// Incremented on every committed update.
    pub version: u64,
}

impl Job {
    /// Destination postcode if one is present and not blank.
    pub fn destination(&self) -> Option<&str> {
        self.postcode
            .as_deref()
            .map(str::trim)
            .filter(|postcode| !postcode.is_empty())
    }

    pub fn is_fully_assigned(&self) -> bool {
        self.engineer_id.is_some() && self.scheduled_date.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingDay {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub is_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOffStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOff {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub status: TimeOffStatus,
    pub reason: Option<String>,
}

impl TimeOff {
    /// Inclusive of both boundary dates.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Postcode area an engineer services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceArea {
    /// Outward-code prefix, e.g. "SW1" or "M".
    pub prefix: String,
    pub max_travel_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engineer {
    pub id: EngineerId,
    pub name: String,
    pub starting_postcode: String,
    pub is_available: bool,
    pub region: Option<String>,
    #[serde(default)]
    pub working_hours: Vec<WorkingDay>,
    #[serde(default)]
    pub time_off: Vec<TimeOff>,
    #[serde(default)]
    pub service_areas: Vec<ServiceArea>,
}

impl Engineer {
    pub fn working_day(&self, day: Weekday) -> Option<&WorkingDay> {
        self.working_hours.iter().find(|entry| entry.day == day)
    }

    /// First service area covering the given postcode's outward code.
    pub fn service_area_for(&self, postcode: &str) -> Option<&ServiceArea> {
        let outward = outward_code(postcode);
        self.service_areas
            .iter()
            .find(|area| area.covers_outward(&outward))
    }
}

impl ServiceArea {
    /// An area prefix ("M") covers whole districts ("M1", "M14") and a
    /// district prefix ("SW1") covers its sub-districts ("SW1A"), but a
    /// prefix never splits a run of letters or digits: "M" is not "ML1" and
    /// "SW1" is not "SW10".
    fn covers_outward(&self, outward: &str) -> bool {
        let prefix = self.prefix.trim().to_uppercase();
        let Some(rest) = outward.strip_prefix(prefix.as_str()) else {
            return false;
        };
        match (prefix.chars().last(), rest.chars().next()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(last), Some(next)) => last.is_ascii_digit() != next.is_ascii_digit(),
        }
    }
}

/// Outward half of a UK postcode, upper-cased: "sw1a 1aa" and "SW1A1AA" both
/// give "SW1A". The inward code is always three characters.
pub fn outward_code(postcode: &str) -> String {
    let compact: String = postcode
        .split_whitespace()
        .collect::<String>()
        .to_uppercase();
    let outward_len = compact.chars().count().saturating_sub(3);
    let mut parts = postcode.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(outward), Some(_)) => outward.to_uppercase(),
        _ if outward_len > 0 => compact.chars().take(outward_len).collect(),
        _ => compact,
    }
}
