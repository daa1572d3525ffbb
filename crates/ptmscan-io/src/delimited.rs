//! CSV and TSV tables, optionally gzip-compressed

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use ptmscan_core::Record;

use crate::{Columns, Error};

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize, Error> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| Error::MissingColumn {
            path: path.into(),
            column: name.into(),
        })
}

/// Parse a delimited table from any reader. Empty annotation fields are
/// treated as missing annotations.
pub fn parse<R: Read>(
    reader: R,
    delimiter: u8,
    columns: &Columns,
    path: &Path,
) -> Result<Vec<Record>, Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let annotation_ix = column_index(&headers, &columns.annotation, path)?;
    let external_id_ix = column_index(&headers, &columns.external_id, path)?;

    let mut records = Vec::new();
    for (record_index, row) in rdr.records().enumerate() {
        let row = row?;
        // Rows are length-checked against the header by the csv reader
        let annotation = row.get(annotation_ix).filter(|s| !s.is_empty());
        records.push(Record {
            record_index,
            external_id: row.get(external_id_ix).unwrap_or_default().into(),
            annotation: annotation.map(String::from),
        });
    }
    Ok(records)
}

pub fn read_records(
    path: &Path,
    delimiter: u8,
    gzip: bool,
    columns: &Columns,
) -> Result<Vec<Record>, Error> {
    let file = BufReader::new(File::open(path)?);
    match gzip {
        true => parse(MultiGzDecoder::new(file), delimiter, columns, path),
        false => parse(file, delimiter, columns, path),
    }
}
