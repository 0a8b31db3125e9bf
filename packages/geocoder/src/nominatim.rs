//! Nominatim / OpenStreetMap geocoder client.
//!
//! No API key. The public instance allows **1 request per second**, so the
//! provider waits out `rate_limit` between consecutive requests itself.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{Candidate, GeocodeError, GeocodingProvider};

const PROVIDER_NAME: &str = "Nominatim";

/// Free-form Nominatim search provider.
pub struct NominatimProvider {
    client: reqwest::Client,
    base_url: String,
    max_results: u32,
    rate_limit: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimProvider {
    /// Creates a client.
    ///
    /// Nominatim's usage policy requires an identifying `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        max_results: u32,
        rate_limit: Duration,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            max_results: max_results.max(1),
            rate_limit,
            last_request: Mutex::new(None),
        })
    }

    /// Sleeps until `rate_limit` has passed since the previous request.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.rate_limit;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait::async_trait]
impl GeocodingProvider for NominatimProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn geocode(&self, address: &str) -> Result<Vec<Candidate>, GeocodeError> {
        self.pace().await;

        let limit = self.max_results.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", address),
                ("format", "jsonv2"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        if !resp.status().is_success() {
            return Err(GeocodeError::Provider {
                provider: PROVIDER_NAME.to_string(),
                status: resp.status().to_string(),
                message: String::new(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses a Nominatim `jsonv2` search response.
fn parse_response(body: &serde_json::Value) -> Result<Vec<Candidate>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    results.iter().map(parse_place).collect()
}

fn parse_place(place: &serde_json::Value) -> Result<Candidate, GeocodeError> {
    let lat = place["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = place["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    Ok(Candidate {
        latitude: lat,
        longitude: lon,
        formatted_address: place["display_name"].as_str().map(String::from),
        place_id: place["place_id"].as_u64().map(|id| id.to_string()),
    })
}
