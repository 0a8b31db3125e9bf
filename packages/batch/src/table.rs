//! Delimited-file reading and writing.
//!
//! Canonical tables are read without header interpretation (the caller's
//! `--header` flag decides what the first row is) and with `flexible`
//! rows, so the column count check in [`crate::schema`] sees the real
//! width of the file. Wide exports are always read by header name.

use std::io::{Read, Write};
use std::path::Path;

use geobatch_batch_models::{AddressBatch, RawInputRow, RawTable};

use crate::BatchError;

const DEFAULT_IDENTIFIER_HEADER: &str = "Index";
const DEFAULT_ADDRESS_HEADER: &str = "Address";
const LATITUDE_HEADER: &str = "Latitude";
const LONGITUDE_HEADER: &str = "Longitude";

/// Reads a canonical table from any reader.
///
/// # Errors
///
/// Returns [`BatchError::Csv`] if the data is not valid CSV.
pub fn read_raw_table(reader: impl Read) -> Result<RawTable, BatchError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let rows = csv_reader
        .records()
        .map(|record| Ok(record?.iter().map(String::from).collect()))
        .collect::<Result<Vec<Vec<String>>, BatchError>>()?;

    Ok(RawTable::new(rows))
}

/// Reads a canonical table from a file.
///
/// # Errors
///
/// Returns [`BatchError::Io`] if the file cannot be opened, or
/// [`BatchError::Csv`] if it is not valid CSV.
pub fn read_raw_table_from_path(path: &Path) -> Result<RawTable, BatchError> {
    let file = std::fs::File::open(path)?;
    read_raw_table(file)
}

/// Reads rows of the wide location export from any reader.
///
/// Columns are matched by header name; unknown columns are ignored and
/// missing ones are treated as blank.
///
/// # Errors
///
/// Returns [`BatchError::Csv`] if a row cannot be read.
pub fn read_wide_rows(reader: impl Read) -> Result<Vec<RawInputRow>, BatchError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    Ok(csv_reader
        .deserialize::<RawInputRow>()
        .collect::<Result<Vec<_>, _>>()?)
}

/// Reads rows of the wide location export from a file.
///
/// # Errors
///
/// Returns [`BatchError::Io`] if the file cannot be opened, or
/// [`BatchError::Csv`] if a row cannot be read.
pub fn read_wide_rows_from_path(path: &Path) -> Result<Vec<RawInputRow>, BatchError> {
    let file = std::fs::File::open(path)?;
    read_wide_rows(file)
}

/// Header row for the output table.
///
/// Reuses the input's identifier and address column names when it had a
/// header.
fn output_header(batch: &AddressBatch) -> [String; 4] {
    let input = batch.header().unwrap_or_default();
    let name = |column: usize, default: &str| {
        input
            .get(column)
            .filter(|name| !name.trim().is_empty())
            .map_or_else(|| default.to_string(), Clone::clone)
    };
    [
        name(0, DEFAULT_IDENTIFIER_HEADER),
        name(1, DEFAULT_ADDRESS_HEADER),
        LATITUDE_HEADER.to_string(),
        LONGITUDE_HEADER.to_string(),
    ]
}

/// Writes the batch as `identifier, address, latitude, longitude`.
///
/// Rows are written in position order. Unset coordinates (positions outside
/// the processed range of a two-column input) are written as blank cells.
///
/// # Errors
///
/// Returns [`BatchError::Csv`] or [`BatchError::Io`] if writing fails.
pub fn write_batch(
    writer: impl Write,
    batch: &AddressBatch,
    write_header: bool,
) -> Result<(), BatchError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    if write_header {
        csv_writer.write_record(output_header(batch))?;
    }

    for record in batch.records() {
        let latitude = record.latitude().map(|v| v.to_string()).unwrap_or_default();
        let longitude = record.longitude().map(|v| v.to_string()).unwrap_or_default();
        csv_writer.write_record([
            record.identifier.as_str(),
            record.address_text.as_deref().unwrap_or_default(),
            latitude.as_str(),
            longitude.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes the batch to a file, replacing it if it exists.
///
/// # Errors
///
/// Returns [`BatchError::Io`] if the file cannot be created, or
/// [`BatchError::Csv`] if writing fails.
pub fn write_batch_to_path(
    path: &Path,
    batch: &AddressBatch,
    write_header: bool,
) -> Result<(), BatchError> {
    let file = std::fs::File::create(path)?;
    write_batch(std::io::BufWriter::new(file), batch, write_header)
}

#[cfg(test)]
mod tests {
    use geobatch_batch_models::{AddressRecord, Coordinates, InputShape};

    use super::*;
    use crate::schema;

    fn written(batch: &AddressBatch, header: bool) -> String {
        let mut out = Vec::new();
        write_batch(&mut out, batch, header).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn reads_rows_of_any_width() {
        let table = read_raw_table("1,1 Main St\n2,\"2 Main St, Springfield\",1.0,2.0\n".as_bytes())
            .unwrap();
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.rows()[1][1], "2 Main St, Springfield");
    }

    #[test]
    fn empty_file_reads_as_empty_table() {
        let table = read_raw_table("".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert!(matches!(
            schema::adapt(table, false),
            Err(BatchError::EmptyInput)
        ));
    }

    #[test]
    fn reads_wide_export_by_header_name() {
        let data = "\
DIM_LOC_ID,SRC_KY,LOC_NO,LOC_NM,TIV_RC,State,County,Address Line 1,POSTAL_CD,CTY_NM,ISO_CNTRY_CD,ISO_CNTRY_NM
1001,7,1,HQ,100,IL,Sangamon,1 Main St,62701-1234,Springfield,US,United States
1002,7,2,Depot,50,,,,,,,
";
        let rows = read_wide_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].street.as_deref(), Some("1 Main St"));
        assert_eq!(rows[0].postal_code.as_deref(), Some("62701-1234"));
        assert_eq!(rows[1].location_id.as_deref(), Some("1002"));
        assert_eq!(rows[1].city, None);
    }

    #[test]
    fn writes_unset_coordinates_as_blank_cells() {
        let batch = AddressBatch::new(
            InputShape::TwoColumn,
            None,
            vec![
                AddressRecord::new("1", Some("1 Main St".to_string()))
                    .with_coordinates(Some(Coordinates::new(49.2, -123.1))),
                AddressRecord::new("2", None).with_coordinates(Some(Coordinates::FALLBACK)),
                AddressRecord::new("3", Some("3 Main St".to_string())),
            ],
        );
        assert_eq!(
            written(&batch, false),
            "1,1 Main St,49.2,-123.1\n2,,0,0\n3,3 Main St,,\n"
        );
    }

    #[test]
    fn header_mirrors_input_names() {
        let batch = schema::adapt(
            read_raw_table("DIM_LOC_ID,Address\n1,1 Main St\n".as_bytes()).unwrap(),
            true,
        )
        .unwrap();
        assert_eq!(
            written(&batch, true),
            "DIM_LOC_ID,Address,Latitude,Longitude\n1,1 Main St,,\n"
        );
    }

    #[test]
    fn header_defaults_without_input_header() {
        let batch = AddressBatch::new(
            InputShape::TwoColumn,
            None,
            vec![AddressRecord::new("1", None)],
        );
        assert_eq!(
            written(&batch, true),
            "Index,Address,Latitude,Longitude\n1,,,\n"
        );
    }

    #[test]
    fn output_reads_back_as_four_column_input() {
        let batch = AddressBatch::new(
            InputShape::TwoColumn,
            None,
            vec![
                AddressRecord::new("1", Some("1 Main St, Springfield".to_string()))
                    .with_coordinates(Some(Coordinates::new(39.8, -89.6))),
                AddressRecord::new("2", Some("2 Main St".to_string())),
            ],
        );
        let text = written(&batch, false);
        let reread = schema::adapt(read_raw_table(text.as_bytes()).unwrap(), false).unwrap();
        assert_eq!(reread.shape(), InputShape::FourColumn);
        assert_eq!(reread.records(), batch.records());
    }
}
