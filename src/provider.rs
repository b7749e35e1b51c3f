//! HTTP adapter for the remote distance-matrix service.
//!
//! Request: `{"origins": [postcode], "destinations": [postcode]}`.
//! Response: `{"distances": [[miles]], "durations": [[minutes]]}` where
//! `durations` is optional. A missing `distances[0][0]` is an error.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::distance::{DistanceMethod, DistanceReading};
use crate::error::DistanceError;
use crate::traits::DistanceProvider;

#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub path: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            path: "/distance-matrix".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpDistanceProvider {
    config: HttpProviderConfig,
    client: reqwest::blocking::Client,
}

impl HttpDistanceProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Serialize)]
struct MatrixRequest<'a> {
    origins: [&'a str; 1],
    destinations: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    distances: Option<Vec<Vec<Option<f64>>>>,
    durations: Option<Vec<Vec<Option<f64>>>>,
}

impl DistanceProvider for HttpDistanceProvider {
    fn measure(&self, origin: &str, destination: &str) -> Result<DistanceReading, DistanceError> {
        let mut request = self.client.post(self.url()).json(&MatrixRequest {
            origins: [origin],
            destinations: [destination],
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let body = request
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|err| {
                warn!(origin, destination, error = %err, "distance provider request failed");
                DistanceError::Http(err)
            })?;

        parse_matrix_response(&body)
    }
}

fn first_cell(matrix: &Option<Vec<Vec<Option<f64>>>>) -> Option<f64> {
    matrix
        .as_ref()
        .and_then(|rows| rows.first())
        .and_then(|row| row.first())
        .copied()
        .flatten()
}

/// Extract the single origin/destination cell from a provider payload.
pub fn parse_matrix_response(body: &str) -> Result<DistanceReading, DistanceError> {
    let response: MatrixResponse =
        serde_json::from_str(body).map_err(|err| DistanceError::Malformed(err.to_string()))?;

    let miles = first_cell(&response.distances).ok_or(DistanceError::MissingDistance)?;
    if !miles.is_finite() || miles < 0.0 {
        return Err(DistanceError::Malformed(format!("distance {miles} is not a valid mileage")));
    }

    let minutes =
        first_cell(&response.durations).filter(|minutes| minutes.is_finite() && *minutes >= 0.0);

    Ok(DistanceReading {
        miles,
        minutes,
        method: DistanceMethod::Provider,
    })
}
