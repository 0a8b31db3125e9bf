//! Google Maps Geocoding API client.
//!
//! Requires an API key. Google answers most failures with HTTP 200 and a
//! `status` field, so the status string decides between "no match"
//! (`ZERO_RESULTS`) and a real error.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use std::time::Duration;

use serde::Deserialize;

use crate::{ApiKey, Candidate, GeocodeError, GeocodingProvider};

const PROVIDER_NAME: &str = "Google Maps";

/// Google Maps Geocoding API provider.
pub struct GoogleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
}

impl GoogleProvider {
    /// Creates a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::MissingCredential`] if no API key is given, or
    /// [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<ApiKey>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let api_key = api_key.ok_or_else(|| GeocodeError::MissingCredential {
            provider: PROVIDER_NAME.to_string(),
        })?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    formatted_address: Option<String>,
    place_id: Option<String>,
}

#[derive(Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[async_trait::async_trait]
impl GeocodingProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn geocode(&self, address: &str) -> Result<Vec<Candidate>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", self.api_key.expose())])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let status = resp.status();
        let body = resp.text().await?;
        match parse_response(&body) {
            Err(GeocodeError::Parse { .. }) if !status.is_success() => {
                Err(GeocodeError::Provider {
                    provider: PROVIDER_NAME.to_string(),
                    status: status.to_string(),
                    message: String::new(),
                })
            }
            other => other,
        }
    }
}

/// Parses a Geocoding API JSON body into candidates.
fn parse_response(body: &str) -> Result<Vec<Candidate>, GeocodeError> {
    let response: GeocodeResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse {
            message: format!("Invalid Google geocode response: {e}"),
        })?;

    let message = response.error_message.unwrap_or_default();

    match response.status.as_str() {
        "OK" => Ok(response
            .results
            .into_iter()
            .map(|result| Candidate {
                latitude: result.geometry.location.lat,
                longitude: result.geometry.location.lng,
                formatted_address: result.formatted_address,
                place_id: result.place_id,
            })
            .collect()),
        "ZERO_RESULTS" => Ok(Vec::new()),
        "REQUEST_DENIED" => Err(GeocodeError::Rejected { message }),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => Err(GeocodeError::RateLimited),
        status => Err(GeocodeError::Provider {
            provider: PROVIDER_NAME.to_string(),
            status: status.to_string(),
            message,
        }),
    }
}
