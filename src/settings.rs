//! Scheduling policy.
//!
//! Settings are stored upstream as a loosely typed JSON blob. They are parsed
//! into [`SchedulingSettings`] with per-field defaults and validated before
//! use; anything unreadable falls back to [`SchedulingSettings::default`].

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SettingsError;
use crate::traits::SettingsSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingSettings {
    pub hours_advance_notice: u32,
    pub max_distance_miles: f64,
    pub max_jobs_per_day: u32,
    #[serde(with = "hhmm")]
    pub working_hours_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub working_hours_end: NaiveTime,
    pub allow_weekend_bookings: bool,
    pub allow_holiday_bookings: bool,
    pub require_client_confirmation: bool,
    pub holidays: Vec<NaiveDate>,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            hours_advance_notice: 48,
            max_distance_miles: 90.0,
            max_jobs_per_day: 3,
            working_hours_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            working_hours_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            allow_weekend_bookings: false,
            allow_holiday_bookings: false,
            require_client_confirmation: false,
            holidays: Vec::new(),
        }
    }
}

impl SchedulingSettings {
    /// Parse and validate a stored settings payload.
    pub fn from_json(payload: &str) -> Result<Self, SettingsError> {
        let settings: SchedulingSettings = serde_json::from_str(payload)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.max_distance_miles.is_finite() || self.max_distance_miles <= 0.0 {
            return Err(SettingsError::Invalid(format!(
                "max_distance_miles must be positive, got {}",
                self.max_distance_miles
            )));
        }
        if self.max_jobs_per_day == 0 {
            return Err(SettingsError::Invalid(
                "max_jobs_per_day must be at least 1".to_string(),
            ));
        }
        if self.working_hours_start >= self.working_hours_end {
            return Err(SettingsError::Invalid(format!(
                "working hours start {} is not before end {}",
                self.working_hours_start, self.working_hours_end
            )));
        }
        Ok(())
    }

    /// Whole days of notice implied by `hours_advance_notice`, rounded up.
    pub fn advance_notice_days(&self) -> i64 {
        i64::from(self.hours_advance_notice.div_ceil(24))
    }

    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Whether policy permits booking on this calendar date at all.
    pub fn permits_date(&self, date: NaiveDate) -> bool {
        (self.allow_weekend_bookings || !Self::is_weekend(date))
            && (self.allow_holiday_bookings || !self.is_holiday(date))
    }
}

/// Load settings from `source`, falling back to defaults on any failure.
pub fn effective_settings<S: SettingsSource + ?Sized>(source: &S) -> SchedulingSettings {
    match source.load().and_then(|settings| settings.validate().map(|_| settings)) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(error = %err, "scheduling settings unreadable, using defaults");
            SchedulingSettings::default()
        }
    }
}

/// Settings held as a raw JSON payload, as read from storage.
#[derive(Debug, Clone)]
pub struct JsonSettings {
    pub payload: String,
}

impl SettingsSource for JsonSettings {
    fn load(&self) -> Result<SchedulingSettings, SettingsError> {
        SchedulingSettings::from_json(&self.payload)
    }
}

/// Fixed in-memory settings.
impl SettingsSource for SchedulingSettings {
    fn load(&self) -> Result<SchedulingSettings, SettingsError> {
        Ok(self.clone())
    }
}

/// `HH:MM` or `HH:MM:SS` wall-clock times.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
            .map_err(|err| D::Error::custom(format!("invalid time {raw:?}: {err}")))
    }
}
