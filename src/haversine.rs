//! Haversine distance provider (fallback when the remote service is unavailable).
//!
//! Geocodes both postcodes and uses great-circle distance. Less accurate than
//! a driving distance (ignores roads) but needs no network.

use std::collections::HashMap;

use crate::distance::{DistanceMethod, DistanceReading, normalize_postcode};
use crate::error::DistanceError;
use crate::traits::{DistanceProvider, Geocoder};

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_MPH: f64 = 30.0;

/// Earth radius in miles.
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Postcode coordinates held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    points: HashMap<String, (f64, f64)>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, postcode: &str, lat: f64, lng: f64) -> Self {
        self.points.insert(normalize_postcode(postcode), (lat, lng));
        self
    }
}

impl Geocoder for StaticGeocoder {
    fn locate(&self, postcode: &str) -> Result<(f64, f64), DistanceError> {
        self.points
            .get(&normalize_postcode(postcode))
            .copied()
            .ok_or_else(|| DistanceError::UnknownPostcode(postcode.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct HaversineDistance<G> {
    geocoder: G,
    /// Assumed average driving speed in mph.
    pub speed_mph: f64,
}

impl<G: Geocoder> HaversineDistance<G> {
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder,
            speed_mph: DEFAULT_SPEED_MPH,
        }
    }

    pub fn with_speed(mut self, speed_mph: f64) -> Self {
        self.speed_mph = speed_mph;
        self
    }

    /// Great-circle distance between two points in miles.
    fn haversine_miles(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_MILES * c
    }

    fn miles_to_minutes(&self, miles: f64) -> f64 {
        miles / self.speed_mph * 60.0
    }
}

impl<G: Geocoder> DistanceProvider for HaversineDistance<G> {
    fn measure(&self, origin: &str, destination: &str) -> Result<DistanceReading, DistanceError> {
        let from = self.geocoder.locate(origin)?;
        let to = self.geocoder.locate(destination)?;
        let miles = Self::haversine_miles(from, to);

        Ok(DistanceReading {
            miles,
            minutes: Some(self.miles_to_minutes(miles)),
            method: DistanceMethod::Haversine,
        })
    }
}
