//! Scripted provider and table helpers for engine tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use geobatch_batch_models::RawTable;
use geobatch_geocoder::{Candidate, GeocodeError, GeocodingProvider};

/// Builds a [`RawTable`] from string literals.
pub fn table(rows: &[&[&str]]) -> RawTable {
    RawTable::new(
        rows.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
            .collect(),
    )
}

/// Answers from a fixed script and records every address it was asked for.
#[derive(Default)]
pub struct StubProvider {
    responses: BTreeMap<String, Vec<Candidate>>,
    default: Vec<Candidate>,
    fail_on: Option<String>,
    probe_fails: bool,
    calls: Mutex<Vec<String>>,
    probes: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates returned for addresses without a scripted response.
    pub fn with_default(mut self, candidates: Vec<Candidate>) -> Self {
        self.default = candidates;
        self
    }

    pub fn with_response(mut self, address: &str, candidates: Vec<Candidate>) -> Self {
        self.responses.insert(address.to_string(), candidates);
        self
    }

    /// Makes `geocode` fail with a transport-style error for `address`.
    pub fn failing_on(mut self, address: &str) -> Self {
        self.fail_on = Some(address.to_string());
        self
    }

    pub fn with_failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    /// Addresses passed to `geocode`, in call order (probe excluded).
    pub fn batch_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GeocodingProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn geocode(&self, address: &str) -> Result<Vec<Candidate>, GeocodeError> {
        self.calls.lock().unwrap().push(address.to_string());
        if self.fail_on.as_deref() == Some(address) {
            return Err(GeocodeError::Provider {
                provider: "stub".to_string(),
                status: "UNKNOWN_ERROR".to_string(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(self
            .responses
            .get(address)
            .unwrap_or(&self.default)
            .clone())
    }

    async fn probe(&self) -> Result<(), GeocodeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.probe_fails {
            return Err(GeocodeError::Rejected {
                message: "The provided API key is invalid.".to_string(),
            });
        }
        Ok(())
    }
}
