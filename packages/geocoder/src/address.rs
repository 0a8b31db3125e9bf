//! One-line address construction from the wide location export.
//!
//! The export splits an address over separate street, city, state, postal
//! code and country columns, any of which may be blank:
//! - Full: `"1495 E 27th Ave, Vancouver, BC V5N-2W6, Canada"`
//! - Partial: `"Springfield, IL"`
//! - Country only: `"Canada"`
//!
//! Components are joined in a fixed order, and separators are only emitted
//! between components that are actually present, so the result never
//! starts or ends with stray punctuation.

use geobatch_batch_models::{RawInputRow, RawTable};

/// Separator placed before city, state and country.
const COMPONENT_SEPARATOR: &str = ", ";

/// Separator placed before the postal code.
const POSTAL_SEPARATOR: &str = " ";

/// Accumulates address components, inserting separators only between
/// non-empty parts.
#[derive(Default)]
struct AddressText {
    text: String,
}

impl AddressText {
    fn push(&mut self, separator: &str, component: Option<&str>) {
        let Some(component) = component.map(str::trim).filter(|c| !c.is_empty()) else {
            return;
        };
        if !self.text.is_empty() {
            self.text.push_str(separator);
        }
        self.text.push_str(component);
    }

    fn finish(self) -> String {
        self.text
    }
}

/// Drops any suffix after the first hyphen (`"12345-6789"` → `"12345"`).
#[must_use]
pub fn truncate_postal_code(code: &str) -> &str {
    code.split('-').next().unwrap_or_default().trim()
}

/// Joins address components into a single free-text address.
///
/// Order is street, city, state, postal code, country. Missing or blank
/// components contribute nothing; an all-blank input yields `""`.
#[must_use]
pub fn build_one_line_address(
    street: Option<&str>,
    city: Option<&str>,
    state: Option<&str>,
    postal_code: Option<&str>,
    country: Option<&str>,
) -> String {
    let mut address = AddressText::default();
    address.push(COMPONENT_SEPARATOR, street);
    address.push(COMPONENT_SEPARATOR, city);
    address.push(COMPONENT_SEPARATOR, state);
    address.push(POSTAL_SEPARATOR, postal_code.map(truncate_postal_code));
    address.push(COMPONENT_SEPARATOR, country);
    address.finish()
}

/// Reduces a wide export row to `(identifier, address_text)`.
///
/// The identifier is the location key, passed through unchanged (empty if
/// the row has none).
#[must_use]
pub fn normalize(row: &RawInputRow) -> (String, String) {
    let address = build_one_line_address(
        row.street.as_deref(),
        row.city.as_deref(),
        row.state.as_deref(),
        row.postal_code.as_deref(),
        row.country.as_deref(),
    );
    (row.location_id.clone().unwrap_or_default(), address)
}

/// Normalizes every wide row into a two-column `(identifier, address)`
/// table, in input order and without a header row.
#[must_use]
pub fn standardize(rows: &[RawInputRow]) -> RawTable {
    let rows = rows
        .iter()
        .map(|row| {
            let (identifier, address) = normalize(row);
            vec![identifier, address]
        })
        .collect();
    RawTable::new(rows)
}
