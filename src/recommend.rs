//! Engineer recommendation engine.
//!
//! Distances for every candidate are resolved in parallel through the shared
//! [`DistanceCache`]; scoring and ranking are sequential and deterministic.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::availability::{is_available_on, works_on};
use crate::clock::SystemClock;
use crate::distance::DistanceCache;
use crate::error::DistanceError;
use crate::model::{Engineer, EngineerId, Job};
use crate::settings::{SchedulingSettings, effective_settings};
use crate::traits::{Clock, DistanceProvider, SettingsSource, WorkloadSource};

pub const BASE_SCORE: f64 = 100.0;
pub const SCORE_FLOOR: f64 = 10.0;
pub const PENALTY_PER_MILE: f64 = 0.5;
pub const MAX_DISTANCE_PENALTY: f64 = 30.0;
/// Average-speed approximation used when the provider reports no duration.
pub const MINUTES_PER_MILE: f64 = 2.0;

const VERY_CLOSE_MILES: f64 = 10.0;
const REASONABLE_MILES: f64 = 25.0;

#[derive(Debug, Clone)]
pub struct RecommendOptions {
    /// Days searched forward for the earliest feasible date.
    pub search_horizon_days: u32,
    /// Score deducted per job the engineer already holds on the earliest date.
    pub workload_penalty_per_job: f64,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            search_horizon_days: 60,
            workload_penalty_per_job: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineerSuggestion {
    pub engineer_id: EngineerId,
    pub engineer_name: String,
    pub distance_miles: f64,
    pub travel_minutes: f64,
    pub score: f64,
    pub reasons: Vec<String>,
    pub earliest_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    DistanceUnavailable(String),
    BeyondMaxDistance { miles: f64 },
}

/// A candidate left out of the ranking, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCandidate {
    pub engineer_id: EngineerId,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct Recommendations {
    pub suggestions: Vec<EngineerSuggestion>,
    /// Policy the ranking was computed under, for display alongside results.
    pub settings: SchedulingSettings,
    pub skipped: Vec<SkippedCandidate>,
    /// The job had no usable postcode, so nothing could be ranked.
    pub missing_destination: bool,
}

/// Score for a candidate at `miles`: base minus a capped distance penalty.
pub fn distance_score(miles: f64) -> f64 {
    BASE_SCORE - (miles * PENALTY_PER_MILE).min(MAX_DISTANCE_PENALTY)
}

pub fn clamp_score(raw: f64) -> f64 {
    raw.max(SCORE_FLOOR)
}

pub fn distance_reason(miles: f64) -> &'static str {
    if miles <= VERY_CLOSE_MILES {
        "very close location"
    } else if miles <= REASONABLE_MILES {
        "reasonable distance"
    } else {
        "longer travel required"
    }
}

pub fn estimated_travel_minutes(miles: f64) -> f64 {
    miles * MINUTES_PER_MILE
}

pub struct RecommendationEngine<'a, P, S: ?Sized, W: ?Sized> {
    cache: &'a DistanceCache<P>,
    settings: &'a S,
    workload: &'a W,
    clock: Arc<dyn Clock>,
    options: RecommendOptions,
}

impl<'a, P, S, W> RecommendationEngine<'a, P, S, W>
where
    P: DistanceProvider,
    S: SettingsSource + ?Sized,
    W: WorkloadSource + ?Sized,
{
    pub fn new(cache: &'a DistanceCache<P>, settings: &'a S, workload: &'a W) -> Self {
        Self {
            cache,
            settings,
            workload,
            clock: Arc::new(SystemClock),
            options: RecommendOptions::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: RecommendOptions) -> Self {
        self.options = options;
        self
    }

    /// Rank `candidates` for `job`, best first.
    pub fn recommend(&self, job: &Job, candidates: &[Engineer]) -> Recommendations {
        let settings = effective_settings(self.settings);

        let Some(destination) = job.destination() else {
            warn!(job_id = %job.id, "cannot recommend engineers without an installation postcode");
            return Recommendations {
                suggestions: Vec::new(),
                settings,
                skipped: Vec::new(),
                missing_destination: true,
            };
        };

        let cache = self.cache;
        let readings: Vec<_> = candidates
            .par_iter()
            .map(|engineer| cache.lookup(&engineer.starting_postcode, destination))
            .collect();

        let mut suggestions = Vec::with_capacity(candidates.len());
        let mut skipped = Vec::new();

        for (engineer, reading) in candidates.iter().zip(readings) {
            let reading = match reading {
                Ok(reading) => reading,
                Err(err) => {
                    warn!(
                        job_id = %job.id,
                        engineer_id = %engineer.id,
                        error = %err,
                        "skipping candidate, distance unavailable"
                    );
                    skipped.push(skip_for_error(engineer, &err));
                    continue;
                }
            };

            if reading.miles > settings.max_distance_miles {
                debug!(
                    engineer_id = %engineer.id,
                    miles = reading.miles,
                    "candidate beyond maximum distance"
                );
                skipped.push(SkippedCandidate {
                    engineer_id: engineer.id.clone(),
                    reason: SkipReason::BeyondMaxDistance { miles: reading.miles },
                });
                continue;
            }

            let travel_minutes = reading
                .minutes
                .unwrap_or_else(|| estimated_travel_minutes(reading.miles));
            suggestions.push(self.suggest(
                job,
                engineer,
                destination,
                reading.miles,
                travel_minutes,
                &settings,
            ));
        }

        // Stable: equal scores keep candidate order.
        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));

        info!(
            job_id = %job.id,
            candidates = candidates.len(),
            suggested = suggestions.len(),
            skipped = skipped.len(),
            "engineer recommendations computed"
        );

        Recommendations {
            suggestions,
            settings,
            skipped,
            missing_destination: false,
        }
    }

    fn suggest(
        &self,
        job: &Job,
        engineer: &Engineer,
        destination: &str,
        miles: f64,
        travel_minutes: f64,
        settings: &SchedulingSettings,
    ) -> EngineerSuggestion {
        let mut reasons = vec![distance_reason(miles).to_string()];

        if let Some(area) = engineer.service_area_for(destination) {
            reasons.push(format!("covers {}", area.prefix.trim().to_uppercase()));
            if travel_minutes > f64::from(area.max_travel_minutes) {
                reasons.push("exceeds area travel limit".to_string());
            }
        }

        let earliest = self.earliest_date(job, engineer, settings);
        let existing_jobs = match earliest {
            Some((date, count)) => {
                reasons.push(format!("available {}", date.format("%Y-%m-%d")));
                count
            }
            None => {
                reasons.push(format!(
                    "no availability in the next {} days",
                    self.options.search_horizon_days
                ));
                0
            }
        };

        let penalty = existing_jobs as f64 * self.options.workload_penalty_per_job;
        let raw = distance_score(miles) - penalty;
        let score = clamp_score(raw);
        debug!(engineer_id = %engineer.id, miles, travel_minutes, score, "scored candidate");

        EngineerSuggestion {
            engineer_id: engineer.id.clone(),
            engineer_name: engineer.name.clone(),
            distance_miles: miles,
            travel_minutes,
            score,
            reasons,
            earliest_date: earliest.map(|(date, _)| date),
        }
    }

    /// First date on or after the notice period (and the job's desired date)
    /// the engineer can take the job, with the jobs they already hold that day.
    fn earliest_date(
        &self,
        job: &Job,
        engineer: &Engineer,
        settings: &SchedulingSettings,
    ) -> Option<(NaiveDate, usize)> {
        let notice = self.clock.today() + Duration::days(settings.advance_notice_days());
        let start = job.scheduled_date.map_or(notice, |desired| desired.max(notice));

        (0..i64::from(self.options.search_horizon_days))
            .map(|offset| start + Duration::days(offset))
            .filter(|date| settings.permits_date(*date))
            .filter(|date| is_available_on(engineer, *date) && works_on(engineer, *date))
            .find_map(|date| {
                let held = match self.workload.job_count(&engineer.id, date) {
                    Ok(count) => count,
                    Err(err) => {
                        warn!(
                            engineer_id = %engineer.id,
                            %date,
                            error = %err,
                            "workload unreadable, skipping date"
                        );
                        return None;
                    }
                };
                let already_here = job.engineer_id.as_ref() == Some(&engineer.id)
                    && job.scheduled_date == Some(date);
                let held = if already_here { held.saturating_sub(1) } else { held };
                (held < settings.max_jobs_per_day as usize).then_some((date, held))
            })
    }
}

fn skip_for_error(engineer: &Engineer, err: &DistanceError) -> SkippedCandidate {
    SkippedCandidate {
        engineer_id: engineer.id.clone(),
        reason: SkipReason::DistanceUnavailable(err.to_string()),
    }
}
