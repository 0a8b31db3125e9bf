//! The `geocode` command: resolve the provider, load the input, run the
//! batch, write the output.

use std::error::Error;
use std::time::{Duration, Instant};

use geobatch_batch::{BatchError, BatchInput, run_batch, table};
use geobatch_batch_models::RowRange;
use geobatch_batch_models::progress::{NullProgress, ProgressCallback};
use geobatch_cli_utils::{GeocodeProgress, MultiProgress};
use geobatch_geocoder::retry::RetryingProvider;
use geobatch_geocoder::service_registry::{GeocodingService, find_service, load_service};
use geobatch_geocoder::{ApiKey, GeocodingProvider};

use crate::GeocodeArgs;

/// Runs one geocoding job described by `args`.
///
/// The provider (and its credential) is resolved before the input is read,
/// so a missing key fails without touching the input or output files.
pub async fn run(args: GeocodeArgs, multi: &MultiProgress) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();

    let service = resolve_service(&args)?;
    let provider = build_provider(&service, &args)?;

    let input = if args.wide {
        log::info!("Reading wide export {}", args.input.display());
        BatchInput::Wide(table::read_wide_rows_from_path(&args.input)?)
    } else {
        log::info!("Reading {}", args.input.display());
        BatchInput::Canonical(table::read_raw_table_from_path(&args.input)?)
    };

    let bar;
    let progress: &dyn ProgressCallback = if args.quiet {
        &NullProgress
    } else {
        bar = GeocodeProgress::new(multi, "Probing provider...");
        &bar
    };
    let outcome = match run_batch(
        input,
        args.header,
        row_range(&args),
        provider.as_ref(),
        progress,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.finish_and_clear();
            return Err(e.into());
        }
    };

    table::write_batch_to_path(&args.output, &outcome.batch, args.header)?;

    log::info!(
        "Wrote {} record(s) to {} ({} geocoded, {} resolved, {} fallback) in {:.1}s",
        outcome.batch.len(),
        args.output.display(),
        outcome.summary.processed,
        outcome.summary.resolved,
        outcome.summary.fallback(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Batch position a failed run stopped at, if it failed mid-batch.
pub fn failed_position(error: &(dyn Error + 'static)) -> Option<usize> {
    match error.downcast_ref::<BatchError>()? {
        BatchError::Provider { position, .. } => Some(*position),
        _ => None,
    }
}

fn row_range(args: &GeocodeArgs) -> RowRange {
    args.limit
        .map_or_else(|| RowRange::new(args.start, args.end), RowRange::limit)
}

fn resolve_service(args: &GeocodeArgs) -> Result<GeocodingService, Box<dyn Error>> {
    if let Some(path) = &args.service_file {
        let service = load_service(path)?;
        log::info!("Using provider '{}' from {}", service.id, path.display());
        return Ok(service);
    }
    find_service(&args.provider).ok_or_else(|| {
        format!(
            "Unknown provider: {} (see `geobatch providers`)",
            args.provider
        )
        .into()
    })
}

/// Builds the provider, reading its key from `--api-key` or the
/// environment variable named by the service definition.
///
/// A missing key is reported as [`BatchError::Authentication`].
fn build_provider(
    service: &GeocodingService,
    args: &GeocodeArgs,
) -> Result<Box<dyn GeocodingProvider>, BatchError> {
    let api_key = args
        .api_key
        .clone()
        .or_else(|| service.api_key_env().and_then(|var| std::env::var(var).ok()))
        .and_then(ApiKey::new);

    let provider = service
        .build_provider(api_key)
        .map_err(|source| BatchError::Authentication {
            provider: service.name.clone(),
            source,
        })?;

    if args.max_retries == 0 {
        return Ok(provider);
    }

    log::info!(
        "Retrying transient failures up to {} time(s)",
        args.max_retries
    );
    Ok(Box::new(RetryingProvider::new(
        provider,
        args.max_retries,
        Duration::from_millis(args.retry_delay_ms),
    )))
}
