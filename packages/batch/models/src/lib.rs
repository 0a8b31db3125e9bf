#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical address batch types shared by the geocoding pipeline.
//!
//! Every input shape, whether a bare `(id, address)` table, a table that
//! already carries coordinates, or the wide location export, is reduced to
//! an [`AddressBatch`] of [`AddressRecord`]s before any provider is called.
//! Missing values are normalized into `Option` at the input boundary (see
//! [`non_empty`]) so the rest of the pipeline never sees empty strings or
//! `null` markers.

pub mod progress;

use std::ops::Range;

use serde::{Deserialize, Deserializer};
use strum_macros::Display;

/// Literal cell value that source exports use for a missing field.
pub const NULL_MARKER: &str = "null";

/// Normalizes an optional cell value into a single "absent" representation.
///
/// Trims surrounding whitespace; blank strings and the [`NULL_MARKER`]
/// become `None`.
#[must_use]
pub fn non_empty(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NULL_MARKER) {
        return None;
    }
    if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Written for records whose address is absent or could not be resolved.
    pub const FALLBACK: Self = Self::new(0.0, 0.0);

    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One row of the canonical batch.
///
/// Latitude and longitude live in a single [`Coordinates`] so they are
/// always set or unset together.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressRecord {
    /// Stable key copied from the source row.
    pub identifier: String,
    /// Free-text address, `None` when the source cell was blank.
    pub address_text: Option<String>,
    /// Coordinates, `None` until geocoded (or when absent from the input).
    pub coordinates: Option<Coordinates>,
}

impl AddressRecord {
    /// Creates a record without coordinates.
    #[must_use]
    pub fn new(identifier: impl Into<String>, address_text: Option<String>) -> Self {
        Self {
            identifier: identifier.into(),
            address_text: non_empty(address_text),
            coordinates: None,
        }
    }

    /// Attaches pre-existing coordinates (e.g. from a partially geocoded file).
    #[must_use]
    pub const fn with_coordinates(mut self, coordinates: Option<Coordinates>) -> Self {
        self.coordinates = coordinates;
        self
    }

    /// Returns the address text if it is worth sending to a provider.
    #[must_use]
    pub fn geocodable_address(&self) -> Option<&str> {
        self.address_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty() && !text.eq_ignore_ascii_case(NULL_MARKER))
    }

    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }
}

/// The recognized layouts of a canonical input table.
///
/// The leading column is always the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum InputShape {
    /// `identifier, address`
    TwoColumn,
    /// `identifier, address, latitude, longitude`
    FourColumn,
}

impl InputShape {
    /// Total number of columns, identifier included.
    #[must_use]
    pub const fn column_count(self) -> usize {
        match self {
            Self::TwoColumn => 2,
            Self::FourColumn => 4,
        }
    }

    /// Resolves a shape from a total column count.
    #[must_use]
    pub const fn from_column_count(count: usize) -> Option<Self> {
        match count {
            2 => Some(Self::TwoColumn),
            4 => Some(Self::FourColumn),
            _ => None,
        }
    }
}

/// Ordered, position-addressed sequence of [`AddressRecord`]s.
///
/// Positions are 0-based and follow input row order; they are what
/// [`RowRange`] refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressBatch {
    shape: InputShape,
    header: Option<Vec<String>>,
    records: Vec<AddressRecord>,
}

impl AddressBatch {
    /// Creates a batch from already-adapted records.
    #[must_use]
    pub const fn new(
        shape: InputShape,
        header: Option<Vec<String>>,
        records: Vec<AddressRecord>,
    ) -> Self {
        Self {
            shape,
            header,
            records,
        }
    }

    /// Shape of the table this batch was loaded from.
    #[must_use]
    pub const fn shape(&self) -> InputShape {
        self.shape
    }

    /// Header row of the source table, if it had one.
    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    #[must_use]
    pub fn records(&self) -> &[AddressRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [AddressRecord] {
        &mut self.records
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A contiguous `[start, end)` selection of batch positions.
///
/// An open `end` means "through the last record". Used both for limiting a
/// run and for resuming after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowRange {
    /// First position to process.
    pub start: usize,
    /// One past the last position to process.
    pub end: Option<usize>,
}

impl RowRange {
    /// Selects every record.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            start: 0,
            end: None,
        }
    }

    /// Selects the first `limit` records.
    #[must_use]
    pub const fn limit(limit: usize) -> Self {
        Self {
            start: 0,
            end: Some(limit),
        }
    }

    #[must_use]
    pub const fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// Resolves against a batch of `len` records, clamping `end` to `len`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRangeError`] if `start` lies past the resolved end,
    /// or past the batch when the end is open.
    pub fn resolve(self, len: usize) -> Result<Range<usize>, InvalidRangeError> {
        let end = self.end.map_or(len, |end| end.min(len));
        let start_past_open_end = self.end.is_none() && self.start > len;
        if self.start > end || start_past_open_end {
            return Err(InvalidRangeError {
                start: self.start,
                end: self.end,
                len,
            });
        }
        Ok(self.start..end)
    }
}

/// Error returned when a [`RowRange`] cannot be applied to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRangeError {
    /// Requested start position.
    pub start: usize,
    /// Requested end position, if any.
    pub end: Option<usize>,
    /// Number of records in the batch.
    pub len: usize,
}

impl std::fmt::Display for InvalidRangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(
                f,
                "invalid row range {}..{end} for a batch of {} records",
                self.start, self.len
            ),
            None => write!(
                f,
                "invalid row range {}.. for a batch of {} records",
                self.start, self.len
            ),
        }
    }
}

impl std::error::Error for InvalidRangeError {}

/// A delimited table as read from disk: rows of string cells, no header
/// interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
}

impl RawTable {
    #[must_use]
    pub const fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    /// Width of the widest row (zero for an empty table).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of the wide location export.
///
/// Only the identifier and the five address components feed the
/// normalizer; the remaining columns are carried so the export
/// deserializes without `flexible` tricks. Every field goes through
/// [`non_empty`] on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawInputRow {
    /// Location key (`DIM_LOC_ID`).
    #[serde(rename = "DIM_LOC_ID", deserialize_with = "blank_as_none")]
    pub location_id: Option<String>,
    #[serde(rename = "SRC_KY", deserialize_with = "blank_as_none")]
    pub source_key: Option<String>,
    #[serde(rename = "LOC_NO", deserialize_with = "blank_as_none")]
    pub location_number: Option<String>,
    #[serde(rename = "LOC_NM", deserialize_with = "blank_as_none")]
    pub location_name: Option<String>,
    #[serde(rename = "TIV_RC", deserialize_with = "blank_as_none")]
    pub total_insured_value: Option<String>,
    /// State or province.
    #[serde(rename = "State", deserialize_with = "blank_as_none")]
    pub state: Option<String>,
    #[serde(rename = "County", deserialize_with = "blank_as_none")]
    pub county: Option<String>,
    /// Street line.
    #[serde(rename = "Address Line 1", deserialize_with = "blank_as_none")]
    pub street: Option<String>,
    /// Postal code, possibly with a `-` suffix.
    #[serde(rename = "POSTAL_CD", deserialize_with = "blank_as_none")]
    pub postal_code: Option<String>,
    /// City name.
    #[serde(rename = "CTY_NM", deserialize_with = "blank_as_none")]
    pub city: Option<String>,
    #[serde(rename = "ISO_CNTRY_CD", deserialize_with = "blank_as_none")]
    pub country_code: Option<String>,
    /// Country name.
    #[serde(rename = "ISO_CNTRY_NM", deserialize_with = "blank_as_none")]
    pub country: Option<String>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(non_empty)
}
