//! Availability, working-hours and workload checks shared by the
//! recommendation engine and the conflict detector.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use crate::model::{Engineer, Job, TimeOffStatus, TimeWindow};
use crate::settings::SchedulingSettings;

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

/// Engineer is available if their flag is set and no approved time off
/// covers the date (both boundary dates included).
pub fn is_available_on(engineer: &Engineer, date: NaiveDate) -> bool {
    engineer.is_available
        && !engineer
            .time_off
            .iter()
            .any(|leave| leave.status == TimeOffStatus::Approved && leave.covers(date))
}

/// Whether the engineer's weekly table has them working that weekday.
/// An engineer with no table is treated as working every day.
pub fn works_on(engineer: &Engineer, date: NaiveDate) -> bool {
    if engineer.working_hours.is_empty() {
        return true;
    }
    engineer
        .working_day(date.weekday())
        .is_some_and(|day| day.is_available)
}

/// Start and end of a booking window on the global working-hours clock.
pub fn window_bounds(
    window: Option<TimeWindow>,
    settings: &SchedulingSettings,
) -> (NaiveTime, NaiveTime) {
    let start = settings.working_hours_start;
    let end = settings.working_hours_end;
    let midday = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
    match window {
        Some(TimeWindow::Morning) => (start, midday.max(start)),
        Some(TimeWindow::Afternoon) => (midday.min(end), end),
        Some(TimeWindow::AllDay) | None => (start, end),
    }
}

/// Start and end of a job's time on site: from its window start, for its duration.
/// Anything running past midnight ends at 23:59:59.
pub fn job_span(job: &Job, settings: &SchedulingSettings) -> (NaiveTime, NaiveTime) {
    let (start, _) = window_bounds(job.time_window, settings);
    let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(start);
    // NaN and negatives collapse to zero, anything longer than a day to a day.
    let minutes = (job.duration_hours.max(0.0) * 60.0).round().min(MINUTES_PER_DAY) as i64;
    let end = match Duration::try_minutes(minutes) {
        Some(length) => match start.overflowing_add_signed(length) {
            (end, 0) => end,
            _ => last,
        },
        None => last,
    };
    (start, end)
}

fn is_whole_day(window: Option<TimeWindow>) -> bool {
    matches!(window, Some(TimeWindow::AllDay) | None)
}

/// Whether two bookings on the same day occupy overlapping time. All-day and
/// unwindowed bookings overlap everything; otherwise the time on site decides.
pub fn bookings_overlap(a: &Job, b: &Job, settings: &SchedulingSettings) -> bool {
    if is_whole_day(a.time_window) || is_whole_day(b.time_window) {
        return true;
    }
    let (a_start, a_end) = job_span(a, settings);
    let (b_start, b_end) = job_span(b, settings);
    a_start < b_end && b_start < a_end
}

/// Whether the engineer already holds more jobs than policy allows.
pub fn is_over_allocated(job_count: usize, settings: &SchedulingSettings) -> bool {
    job_count > settings.max_jobs_per_day as usize
}
