#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch geocoding engine.
//!
//! Runs a table of addresses through a [`GeocodingProvider`] in four steps:
//!
//! 1. **Normalize**: wide location exports are reduced to
//!    `(identifier, address)` rows ([`geobatch_geocoder::address`]).
//! 2. **Adapt**: the table's column count decides its [`InputShape`] and
//!    the rows become an [`AddressBatch`] ([`schema`]).
//! 3. **Probe**: one liveness request, so bad credentials stop the run
//!    before any row is geocoded.
//! 4. **Geocode**: the selected [`RowRange`] is geocoded sequentially, in
//!    place ([`geocode`]).
//!
//! The finished batch is written back out with [`table::write_batch`].
//! Nothing is written on error. [`BatchError::Provider`] carries the failed
//! position, so the caller can narrow the range and re-run.
//!
//! [`InputShape`]: geobatch_batch_models::InputShape

pub mod geocode;
pub mod schema;
pub mod table;

#[cfg(test)]
pub(crate) mod test_support;

use geobatch_batch_models::progress::ProgressCallback;
use geobatch_batch_models::{AddressBatch, InvalidRangeError, RawInputRow, RawTable, RowRange};
use geobatch_geocoder::{GeocodeError, GeocodingProvider, address};
use thiserror::Error;

pub use geocode::GeocodeSummary;

/// Errors that abort a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The input does not have a recognized shape.
    #[error("Schema error: {message}")]
    Schema {
        /// What did not match.
        message: String,
    },

    /// The input has no data rows.
    #[error("Input contains no data rows")]
    EmptyInput,

    /// The provider rejected its credential or failed the liveness probe.
    #[error("Authentication with {provider} failed: {source}")]
    Authentication {
        /// Provider name.
        provider: String,
        /// Underlying provider error.
        source: GeocodeError,
    },

    /// The requested row range does not fit the batch.
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),

    /// The provider failed mid-batch. Positions before `position` keep the
    /// coordinates already written.
    #[error("Geocoding failed at position {position} (identifier '{identifier}'): {source}")]
    Provider {
        /// Batch position of the failed record.
        position: usize,
        /// Identifier of the failed record.
        identifier: String,
        /// Underlying provider error.
        source: GeocodeError,
    },

    /// Reading or writing a delimited file failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O failure outside the CSV layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The table handed to [`run_batch`].
#[derive(Debug, Clone)]
pub enum BatchInput {
    /// A two- or four-column table (identifier first).
    Canonical(RawTable),
    /// Rows of the wide location export, already deserialized by header
    /// name.
    Wide(Vec<RawInputRow>),
}

/// A completed run.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// The batch with coordinates filled in for the processed range.
    pub batch: AddressBatch,
    /// Per-outcome counts for the processed range.
    pub summary: GeocodeSummary,
}

/// Runs the whole pipeline: normalize, adapt, probe, geocode.
///
/// `has_header` applies to [`BatchInput::Canonical`] only; wide rows have
/// already consumed their header.
///
/// # Errors
///
/// * [`BatchError::EmptyInput`] / [`BatchError::Schema`] if the input cannot
///   be adapted.
/// * [`BatchError::InvalidRange`] if `range` does not fit the batch.
/// * [`BatchError::Authentication`] if the liveness probe fails.
/// * [`BatchError::Provider`] if the provider fails mid-batch.
pub async fn run_batch(
    input: BatchInput,
    has_header: bool,
    range: RowRange,
    provider: &dyn GeocodingProvider,
    progress: &dyn ProgressCallback,
) -> Result<BatchOutcome, BatchError> {
    let (table, has_header) = match input {
        BatchInput::Canonical(table) => (table, has_header),
        BatchInput::Wide(rows) => {
            log::info!("Normalizing {} wide row(s) into addresses", rows.len());
            (address::standardize(&rows), false)
        }
    };

    let mut batch = schema::adapt(table, has_header)?;
    let positions = range.resolve(batch.len())?;
    log::info!(
        "Loaded {} record(s) as {} input; processing positions {}..{}",
        batch.len(),
        batch.shape(),
        positions.start,
        positions.end
    );

    provider
        .probe()
        .await
        .map_err(|source| BatchError::Authentication {
            provider: provider.name().to_string(),
            source,
        })?;
    log::info!("{} accepted the liveness probe", provider.name());

    let summary = geocode::geocode_range(&mut batch, range, provider, progress).await?;

    Ok(BatchOutcome { batch, summary })
}
