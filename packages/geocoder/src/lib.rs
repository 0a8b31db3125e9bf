#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding providers for the batch geocoder.
//!
//! Every provider implements [`GeocodingProvider`], which turns one
//! free-text address into a list of [`Candidate`] matches ordered by the
//! provider's own relevance ranking. An empty list means the address could
//! not be resolved and is **not** an error; everything else that goes wrong
//! (credentials, quota, transport, malformed responses) is a
//! [`GeocodeError`].
//!
//! Providers are described by TOML service definitions in `services/`
//! (see [`service_registry`]):
//!
//! 1. **Google Maps Geocoding API**: requires an API key, quota-limited
//!    per key.
//! 2. **Nominatim / OpenStreetMap**: free, 1 req/sec on the public
//!    instance.
//!
//! Also provides [`address`], which builds the one-line address text from
//! the wide location export.

pub mod address;
pub mod google;
pub mod nominatim;
pub mod retry;
pub mod service_registry;

use thiserror::Error;

/// Address sent by [`GeocodingProvider::probe`]. Any working provider
/// resolves it, so an error here means the provider itself is unusable.
pub const LIVENESS_PROBE_ADDRESS: &str = "San Francisco, CA";

/// A single match returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The canonical address the provider matched, if reported.
    pub formatted_address: Option<String>,
    /// Provider-specific place identifier, if reported.
    pub place_id: Option<String>,
}

impl Candidate {
    /// Creates a candidate carrying only coordinates.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            formatted_address: None,
            place_id: None,
        }
    }
}

/// A provider API key.
///
/// Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key, returning `None` if it is blank.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// Returns the raw key for use in a request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed (includes per-request timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit or quota exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The provider refused the request (typically a bad API key).
    #[error("Request rejected: {message}")]
    Rejected {
        /// Message returned by the provider.
        message: String,
    },

    /// The provider reported a failure status.
    #[error("{provider} returned status {status}: {message}")]
    Provider {
        /// Provider name.
        provider: String,
        /// Status string or HTTP status code.
        status: String,
        /// Message returned by the provider, if any.
        message: String,
    },

    /// The provider requires a credential that was not supplied.
    #[error("No API key configured for {provider}")]
    MissingCredential {
        /// Provider name.
        provider: String,
    },
}

impl GeocodeError {
    /// Whether retrying the same request later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Parse { .. }
            | Self::Rejected { .. }
            | Self::Provider { .. }
            | Self::MissingCredential { .. } => false,
        }
    }
}

/// An external geocoding capability.
#[async_trait::async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Human-readable provider name, used in logs and errors.
    fn name(&self) -> &str;

    /// Geocodes a single free-text address.
    ///
    /// Returns an empty list when the address cannot be resolved.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] for anything other than "no match".
    async fn geocode(&self, address: &str) -> Result<Vec<Candidate>, GeocodeError>;

    /// Checks that the provider accepts requests by geocoding
    /// [`LIVENESS_PROBE_ADDRESS`].
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the probe request fails.
    async fn probe(&self) -> Result<(), GeocodeError> {
        let candidates = self.geocode(LIVENESS_PROBE_ADDRESS).await?;
        log::debug!(
            "{} liveness probe returned {} candidate(s)",
            self.name(),
            candidates.len()
        );
        Ok(())
    }
}
