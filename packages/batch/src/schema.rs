//! Input shape detection and conversion to the canonical batch.
//!
//! A canonical input table has its identifier in the first column and
//! comes in exactly two layouts, told apart by column count alone:
//!
//! | columns | shape                      | coordinates              |
//! |---------|----------------------------|--------------------------|
//! | 2       | [`InputShape::TwoColumn`]  | unset for every record   |
//! | 4       | [`InputShape::FourColumn`] | kept where both are set  |
//!
//! Anything else is a [`BatchError::Schema`].

use geobatch_batch_models::{AddressBatch, AddressRecord, Coordinates, InputShape, RawTable};

use crate::BatchError;

const LATITUDE_COLUMN: usize = 2;
const LONGITUDE_COLUMN: usize = 3;

/// Resolves the input shape from the table's total column count.
///
/// # Errors
///
/// Returns [`BatchError::Schema`] unless the count is 2 or 4.
pub fn detect_shape(column_count: usize) -> Result<InputShape, BatchError> {
    InputShape::from_column_count(column_count).ok_or_else(|| BatchError::Schema {
        message: format!(
            "expected {} columns (identifier, address) or {} columns \
             (identifier, address, latitude, longitude), found {column_count}",
            InputShape::TwoColumn.column_count(),
            InputShape::FourColumn.column_count(),
        ),
    })
}

/// Converts a raw table into an [`AddressBatch`].
///
/// With `has_header` the first row is kept as the batch header instead of
/// being read as data. Rows shorter than the table are padded with blank
/// cells.
///
/// # Errors
///
/// * [`BatchError::EmptyInput`] if there are no data rows.
/// * [`BatchError::Schema`] if the column count is not recognized, or a
///   four-column row has a coordinate that is not a number.
pub fn adapt(table: RawTable, has_header: bool) -> Result<AddressBatch, BatchError> {
    let column_count = table.column_count();
    let mut rows = table.into_rows().into_iter();
    let header = if has_header { rows.next() } else { None };
    let rows: Vec<Vec<String>> = rows.collect();

    if rows.is_empty() {
        return Err(BatchError::EmptyInput);
    }

    let shape = detect_shape(column_count)?;
    if shape == InputShape::TwoColumn {
        log::info!("No latitude/longitude columns found, adding them");
    }

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(position, row)| adapt_row(shape, position, row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AddressBatch::new(shape, header, records))
}

fn adapt_row(
    shape: InputShape,
    position: usize,
    row: Vec<String>,
) -> Result<AddressRecord, BatchError> {
    let mut cells = row.into_iter();
    let identifier = cells.next().unwrap_or_default();
    let address = cells.next();
    let record = AddressRecord::new(identifier, address);

    match shape {
        InputShape::TwoColumn => Ok(record),
        InputShape::FourColumn => {
            let latitude = parse_coordinate(cells.next(), position, LATITUDE_COLUMN)?;
            let longitude = parse_coordinate(cells.next(), position, LONGITUDE_COLUMN)?;
            let coordinates = match (latitude, longitude) {
                (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
                (None, None) => None,
                _ => {
                    log::warn!(
                        "Row {position} ('{}') has only one of latitude/longitude; \
                         treating it as not geocoded",
                        record.identifier
                    );
                    None
                }
            };
            Ok(record.with_coordinates(coordinates))
        }
    }
}

fn parse_coordinate(
    cell: Option<String>,
    position: usize,
    column: usize,
) -> Result<Option<f64>, BatchError> {
    let Some(value) = geobatch_batch_models::non_empty(cell) else {
        return Ok(None);
    };
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| BatchError::Schema {
            message: format!(
                "row {position}, column {column}: '{value}' is not a coordinate"
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::table;

    #[test]
    fn two_column_input_has_no_coordinates() {
        let batch = adapt(table(&[&["1", "1 Main St"], &["2", ""]]), false).unwrap();
        assert_eq!(batch.shape(), InputShape::TwoColumn);
        assert_eq!(batch.len(), 2);
        assert!(batch.records().iter().all(|r| r.coordinates.is_none()));
        assert_eq!(batch.records()[0].address_text.as_deref(), Some("1 Main St"));
        assert_eq!(batch.records()[1].address_text, None);
    }

    #[test]
    fn four_column_input_keeps_existing_coordinates() {
        let batch = adapt(
            table(&[
                &["1", "1 Main St", "49.2", "-123.1"],
                &["2", "2 Main St", "", ""],
            ]),
            false,
        )
        .unwrap();
        assert_eq!(batch.shape(), InputShape::FourColumn);
        assert_eq!(
            batch.records()[0].coordinates,
            Some(Coordinates::new(49.2, -123.1))
        );
        assert_eq!(batch.records()[1].coordinates, None);
    }

    #[test]
    fn half_filled_coordinates_are_dropped() {
        let batch = adapt(table(&[&["1", "1 Main St", "49.2", ""]]), false).unwrap();
        assert_eq!(batch.records()[0].coordinates, None);
    }

    #[test]
    fn non_numeric_coordinate_is_schema_error() {
        let err = adapt(table(&[&["1", "1 Main St", "north", "-123.1"]]), false).unwrap_err();
        match err {
            BatchError::Schema { message } => assert!(message.contains("north")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn three_and_five_columns_are_rejected() {
        for row in [
            &["1", "1 Main St", "49.2"][..],
            &["1", "1 Main St", "49.2", "-123.1", "extra"][..],
        ] {
            assert!(matches!(
                adapt(table(&[row]), false),
                Err(BatchError::Schema { .. })
            ));
        }
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(
            adapt(RawTable::default(), false),
            Err(BatchError::EmptyInput)
        ));
        assert!(matches!(
            adapt(RawTable::default(), true),
            Err(BatchError::EmptyInput)
        ));
    }

    #[test]
    fn header_only_table_is_rejected() {
        assert!(matches!(
            adapt(table(&[&["Index", "Address"]]), true),
            Err(BatchError::EmptyInput)
        ));
    }

    #[test]
    fn header_is_kept_but_not_read_as_data() {
        let batch = adapt(
            table(&[&["DIM_LOC_ID", "Address"], &["1", "1 Main St"]]),
            true,
        )
        .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch.header(),
            Some(&["DIM_LOC_ID".to_string(), "Address".to_string()][..])
        );
        assert_eq!(batch.records()[0].identifier, "1");
    }

    #[test]
    fn header_flag_does_not_change_shape_dispatch() {
        let rows: &[&[&str]] = &[&["1", "a", "1.0", "2.0"], &["2", "b", "3.0", "4.0"]];
        let with_header = adapt(table(rows), true).unwrap();
        let without_header = adapt(table(rows), false).unwrap();
        assert_eq!(with_header.shape(), InputShape::FourColumn);
        assert_eq!(without_header.shape(), InputShape::FourColumn);
        assert_eq!(with_header.len(), 1);
        assert_eq!(without_header.len(), 2);
    }

    #[test]
    fn short_rows_are_padded() {
        let batch = adapt(table(&[&["1", "1 Main St"], &["2"]]), false).unwrap();
        assert_eq!(batch.records()[1].identifier, "2");
        assert_eq!(batch.records()[1].address_text, None);
    }

    #[test]
    fn detect_shape_reports_column_count() {
        match detect_shape(3) {
            Err(BatchError::Schema { message }) => {
                assert!(message.contains("expected 2 columns"));
                assert!(message.contains("or 4 columns"));
                assert!(message.contains("found 3"));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
