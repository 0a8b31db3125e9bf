//! Registry of geocoding service definitions.
//!
//! Each provider is described by a TOML file under `services/`. The
//! built-in definitions are embedded at compile time and exposed via
//! [`all_services`] and [`find_service`]; a custom definition (e.g. a
//! self-hosted Nominatim) can be read with [`load_service`].
//!
//! Credentials are never stored in a definition. A definition only names
//! the environment variable the binary should read the key from
//! ([`GeocodingService::api_key_env`]); the key itself is passed to
//! [`GeocodingService::build_provider`].

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::google::GoogleProvider;
use crate::nominatim::NominatimProvider;
use crate::{ApiKey, GeocodeError, GeocodingProvider};

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"google"`, `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Google Maps Geocoding API.
    Google {
        /// Endpoint URL (e.g., `"https://maps.googleapis.com/maps/api/geocode/json"`).
        base_url: String,
        /// Environment variable holding the API key.
        api_key_env: String,
    },
    /// Nominatim / `OpenStreetMap` geocoder.
    Nominatim {
        /// Search endpoint URL (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
        /// Minimum delay between requests in milliseconds.
        rate_limit_ms: u64,
        /// Maximum candidates requested per address.
        #[serde(default = "default_max_results")]
        max_results: u32,
        /// `User-Agent` sent with every request.
        user_agent: String,
    },
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_results() -> u32 {
    5
}

impl GeocodingService {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Google { base_url, .. } | ProviderConfig::Nominatim { base_url, .. } => {
                base_url
            }
        }
    }

    /// Name of the environment variable holding the API key, for providers
    /// that need one.
    #[must_use]
    pub fn api_key_env(&self) -> Option<&str> {
        match &self.provider {
            ProviderConfig::Google { api_key_env, .. } => Some(api_key_env),
            ProviderConfig::Nominatim { .. } => None,
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the provider described by this definition.
    ///
    /// `api_key` is ignored by providers that do not need one.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::MissingCredential`] if the provider needs a
    /// key and none was given, or [`GeocodeError::Http`] if the HTTP client
    /// cannot be built.
    pub fn build_provider(
        &self,
        api_key: Option<ApiKey>,
    ) -> Result<Box<dyn GeocodingProvider>, GeocodeError> {
        log::debug!("Building provider '{}' ({})", self.id, self.base_url());
        match &self.provider {
            ProviderConfig::Google { base_url, .. } => Ok(Box::new(GoogleProvider::new(
                base_url.clone(),
                api_key,
                self.timeout(),
            )?)),
            ProviderConfig::Nominatim {
                base_url,
                rate_limit_ms,
                max_results,
                user_agent,
            } => Ok(Box::new(NominatimProvider::new(
                base_url.clone(),
                user_agent,
                *max_results,
                Duration::from_millis(*rate_limit_ms),
                self.timeout(),
            )?)),
        }
    }
}

/// Errors from reading a service definition file.
#[derive(Debug, thiserror::Error)]
pub enum ServiceConfigError {
    /// The file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path of the definition file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not a valid service definition.
    #[error("Invalid service definition {path}: {source}")]
    Toml {
        /// Path of the definition file.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("google", include_str!("../services/google.toml")),
    ("nominatim", include_str!("../services/nominatim.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all built-in service definitions.
///
/// # Panics
///
/// Panics if any embedded TOML is malformed (the files are compiled in, so
/// the tests below catch this).
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding service '{name}': {e}"))
        })
        .collect()
}

/// Looks up a built-in service by id.
#[must_use]
pub fn find_service(id: &str) -> Option<GeocodingService> {
    all_services().into_iter().find(|s| s.id == id)
}

/// Reads a service definition from a TOML file.
///
/// # Errors
///
/// Returns [`ServiceConfigError`] if the file cannot be read or parsed.
pub fn load_service(path: &Path) -> Result<GeocodingService, ServiceConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ServiceConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    toml::de::from_str(&contents).map_err(|e| ServiceConfigError::Toml {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        let services = all_services();
        assert_eq!(services.len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let mut seen = BTreeSet::new();
        for svc in &all_services() {
            assert!(seen.insert(svc.id.clone()), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn all_services_have_required_fields() {
        for svc in &all_services() {
            assert!(!svc.id.is_empty(), "Service has empty id");
            assert!(!svc.name.is_empty(), "Service {} has empty name", svc.id);
            assert!(
                !svc.base_url().is_empty(),
                "Service {} has empty base_url",
                svc.id
            );
            assert!(svc.timeout_secs > 0, "Service {} has no timeout", svc.id);
        }
    }

    #[test]
    fn google_reads_key_from_environment_variable() {
        let google = find_service("google").unwrap();
        assert_eq!(google.api_key_env(), Some("GOOGLE_API_KEY"));
        assert!(find_service("nominatim").unwrap().api_key_env().is_none());
        assert!(find_service("census").is_none());
    }

    #[test]
    fn google_without_key_cannot_be_built() {
        let google = find_service("google").unwrap();
        assert!(matches!(
            google.build_provider(None),
            Err(GeocodeError::MissingCredential { .. })
        ));
    }

    #[test]
    fn nominatim_builds_without_key() {
        let nominatim = find_service("nominatim").unwrap();
        let provider = nominatim.build_provider(None).unwrap();
        assert_eq!(provider.name(), "Nominatim");
    }

    #[test]
    fn parses_custom_definition() {
        let svc: GeocodingService = toml::de::from_str(
            r#"
            id = "local"
            name = "Local Nominatim"

            [provider]
            type = "nominatim"
            base_url = "http://localhost:8080/search"
            rate_limit_ms = 0
            user_agent = "geobatch-test"
            "#,
        )
        .unwrap();
        assert_eq!(svc.timeout_secs, 30);
        assert!(matches!(
            svc.provider,
            ProviderConfig::Nominatim { max_results: 5, .. }
        ));
    }

    #[test]
    fn missing_definition_file_is_io_error() {
        let err = load_service(Path::new("/nonexistent/geobatch/service.toml")).unwrap_err();
        assert!(matches!(err, ServiceConfigError::Io { .. }));
    }
}
