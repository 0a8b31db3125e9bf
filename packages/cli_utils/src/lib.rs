#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `geobatch` binary.
//!
//! [`GeocodeProgress`] draws the geocoding loop's [`ProgressCallback`]
//! updates as an `indicatif` bar. [`init_logger`] sends `log` output
//! through the same [`MultiProgress`], so log lines are printed above the
//! bar instead of through it.

use std::time::Duration;

use geobatch_batch_models::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const SPINNER_TEMPLATE: &str = "{spinner:.yellow} {msg} [{elapsed}]";
const BAR_TEMPLATE: &str =
    "  {msg} {wide_bar:.yellow/dim} {pos}/{len} rows, {per_sec} [{eta} left]";

/// Progress of one geocoding run.
///
/// Spins while the input is read and the provider probed; becomes a bar
/// over the selected rows once [`ProgressCallback::set_total`] is called.
pub struct GeocodeProgress {
    bar: ProgressBar,
    rows_style: ProgressStyle,
}

impl GeocodeProgress {
    /// Adds a spinner showing `message` to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let rows_style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        Self { bar, rows_style }
    }
}

impl ProgressCallback for GeocodeProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_style(self.rows_style.clone());
        self.bar.set_length(total);
        self.bar.reset();
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }

    fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Installs `pretty_env_logger` behind `indicatif-log-bridge`.
///
/// `geobatch*` crates log at `info` unless `RUST_LOG` says otherwise;
/// `verbose` lowers that default to `debug` (one line per provider call).
/// Returns the [`MultiProgress`] every progress bar must be added to.
#[must_use]
pub fn init_logger(verbose: bool) -> MultiProgress {
    let multi = MultiProgress::new();

    let default_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_module("geobatch", default_level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let logger = builder.build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already installed when called twice

    log::set_max_level(level);

    multi
}
