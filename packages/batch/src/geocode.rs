//! Range-limited, sequential geocoding of a batch in place.
//!
//! For each position in the range, in ascending order:
//!
//! - blank address → `(0.0, 0.0)` without calling the provider
//! - provider returns no candidates → `(0.0, 0.0)`
//! - provider returns candidates → the first one wins
//! - provider returns an error → the run stops with
//!   [`BatchError::Provider`]
//!
//! Only one request is in flight at a time. Positions outside the range
//! are never touched, so an interrupted run can be resumed by passing a
//! range that starts at the failed position.

use geobatch_batch_models::progress::ProgressCallback;
use geobatch_batch_models::{AddressBatch, Coordinates, RowRange};
use geobatch_geocoder::GeocodingProvider;

use crate::BatchError;

/// Counts of what happened to each processed position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeocodeSummary {
    /// Positions visited.
    pub processed: u64,
    /// Positions resolved to the provider's first candidate.
    pub resolved: u64,
    /// Positions the provider returned no candidates for.
    pub unresolved: u64,
    /// Positions with a blank address (provider not called).
    pub skipped: u64,
}

impl GeocodeSummary {
    /// Positions that received the fallback coordinate.
    #[must_use]
    pub const fn fallback(&self) -> u64 {
        self.unresolved + self.skipped
    }
}

/// Geocodes positions `range` of `batch`, writing coordinates in place.
///
/// # Errors
///
/// * [`BatchError::InvalidRange`] if `range` does not fit the batch.
/// * [`BatchError::Provider`] on the first provider error. Positions
///   already processed keep their new coordinates.
pub async fn geocode_range(
    batch: &mut AddressBatch,
    range: RowRange,
    provider: &dyn GeocodingProvider,
    progress: &dyn ProgressCallback,
) -> Result<GeocodeSummary, BatchError> {
    let positions = range.resolve(batch.len())?;
    progress.set_total(positions.len() as u64);
    progress.set_message(format!("Geocoding with {}", provider.name()));

    let mut summary = GeocodeSummary::default();

    for position in positions {
        let record = &mut batch.records_mut()[position];

        let coordinates = if let Some(address) = record.geocodable_address() {
            log::debug!("[{position}] geocoding '{address}'");
            let candidates = provider
                .geocode(address)
                .await
                .map_err(|source| BatchError::Provider {
                    position,
                    identifier: record.identifier.clone(),
                    source,
                })?;
            if let Some(first) = candidates.first() {
                summary.resolved += 1;
                Coordinates::new(first.latitude, first.longitude)
            } else {
                log::debug!("[{position}] no match for '{address}'");
                summary.unresolved += 1;
                Coordinates::FALLBACK
            }
        } else {
            log::debug!("[{position}] blank address, using fallback coordinate");
            summary.skipped += 1;
            Coordinates::FALLBACK
        };

        record.coordinates = Some(coordinates);
        summary.processed += 1;
        progress.inc(1);
    }

    progress.finish(format!(
        "Geocoded {} record(s): {} resolved, {} fallback",
        summary.processed,
        summary.resolved,
        summary.fallback()
    ));
    log::info!(
        "Geocoding finished: {} processed, {} resolved, {} unresolved, {} blank",
        summary.processed,
        summary.resolved,
        summary.unresolved,
        summary.skipped
    );

    Ok(summary)
}
